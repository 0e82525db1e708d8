use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;

const DEFAULT_STORAGE_LIMIT_BYTES: i64 = 1024 * 1024 * 1024; // 1 GiB

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub storage_path: String,
    pub user_storage_limit_bytes: i64,
    pub file_retention_days: i64,
    pub dev_unlimited_credits: bool,
    pub admin_emails: Vec<String>,
    pub frontend_url: String,
    pub app_base_url: String,
    pub stripe_secret_key: String,
    pub stripe_api_base: String,
    /// Price id -> credits granted.
    pub stripe_price_map: HashMap<String, i32>,
    pub render_step_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            storage_path: env::var("STORAGE_PATH")
                .unwrap_or_else(|_| "./generated_files".to_string()),
            user_storage_limit_bytes: match env::var("USER_STORAGE_LIMIT_BYTES") {
                Ok(v) => v
                    .parse()
                    .context("USER_STORAGE_LIMIT_BYTES must be an integer")?,
                Err(_) => DEFAULT_STORAGE_LIMIT_BYTES,
            },
            file_retention_days: env::var("FILE_RETENTION_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .context("FILE_RETENTION_DAYS must be an integer")?,
            dev_unlimited_credits: env::var("DEV_UNLIMITED_CREDITS")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            admin_emails: env::var("ADMIN_EMAILS")
                .map(|v| parse_list(&v))
                .unwrap_or_default(),
            app_base_url: env::var("APP_BASE_URL").unwrap_or_else(|_| frontend_url.clone()),
            frontend_url,
            stripe_secret_key: env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
            stripe_api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            stripe_price_map: match env::var("STRIPE_PRICE_MAP") {
                Ok(v) => serde_json::from_str(&v)
                    .context("STRIPE_PRICE_MAP must be a JSON object of price id to credits")?,
                Err(_) => HashMap::new(),
            },
            render_step_ms: env::var("RENDER_STEP_MS")
                .unwrap_or_else(|_| "1500".to_string())
                .parse()
                .context("RENDER_STEP_MS must be an integer")?,
        })
    }

    pub fn is_admin(&self, email: &str) -> bool {
        self.admin_emails
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(email))
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
