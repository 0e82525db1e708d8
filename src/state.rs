use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::Config;
use crate::jobs::JobQueue;
use crate::services::{CheckoutService, LedgerService, StorageService};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<Config>,
    pub job_queue: JobQueue,
    pub storage: StorageService,
    pub checkout: CheckoutService,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: Config, job_queue: JobQueue) -> Self {
        let storage = StorageService::new(&config.storage_path);
        let checkout = CheckoutService::new(&config.stripe_api_base, &config.stripe_secret_key);

        Self {
            db,
            config: Arc::new(config),
            job_queue,
            storage,
            checkout,
        }
    }

    pub fn ledger(&self) -> LedgerService {
        LedgerService::new(self.db.clone())
    }
}
