pub mod checkout;
pub mod ledger;
pub mod storage;

pub use checkout::{CheckoutService, CheckoutSession, NewCheckout};
pub use ledger::{LedgerService, PaymentRecord};
pub use storage::StorageService;
