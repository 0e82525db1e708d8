pub mod executor;
pub mod queue;
pub mod renderer;

pub use executor::JobExecutor;
pub use queue::{JobMessage, JobQueue};
pub use renderer::{ProgressReporter, SimulatedRenderer, TrackRenderer};
