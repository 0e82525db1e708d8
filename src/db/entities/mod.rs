pub mod custom_voices;
pub mod jobs;
pub mod payments;
pub mod referral_signups;
pub mod users;

pub use custom_voices::Entity as CustomVoice;
pub use jobs::Entity as Job;
pub use payments::Entity as Payment;
pub use referral_signups::Entity as ReferralSignup;
pub use users::Entity as User;
