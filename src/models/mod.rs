//! Wire types shared by the service handlers and the HTTP client.

pub mod job;
pub mod job_config;
pub mod user;
pub mod voice;

pub use job::{
    CreateJobRequest, Job, JobStatusResponse, MessageResponse, RenameJobRequest, StorageInfo,
};
pub use job_config::{BinauralPreset, ConfigError, JobConfig, LowpassFilter, VoiceSettings};
pub use user::{
    CaptureReferralRequest, CheckoutSessionRequest, CheckoutSessionResponse,
    ConfirmPaymentRequest, ConfirmPaymentResponse, ReferralSummary, SyncUserRequest,
    UserResponse,
};
pub use voice::{CreateCustomVoiceRequest, CustomVoiceResponse, VoiceResponse};
