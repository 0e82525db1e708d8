use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{AppError, Result};

const API_TIMEOUT: Duration = Duration::from_secs(30);

/// Hosted checkout provider (Stripe's Checkout Sessions API).
#[derive(Clone)]
pub struct CheckoutService {
    client: Client,
    api_base: String,
    secret_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
    pub payment_status: Option<String>,
    pub payment_intent: Option<String>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }

    pub fn metadata_user_id(&self) -> Option<Uuid> {
        self.metadata
            .get("user_id")
            .and_then(|v| Uuid::parse_str(v).ok())
    }

    pub fn metadata_credits(&self) -> i32 {
        self.metadata
            .get("credits")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }
}

/// Parameters for a one-off credit pack purchase.
#[derive(Debug, Clone)]
pub struct NewCheckout<'a> {
    pub price_id: &'a str,
    pub user_id: Uuid,
    pub user_email: &'a str,
    pub credits: i32,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: ProviderError,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    message: Option<String>,
}

impl CheckoutService {
    pub fn new(api_base: impl Into<String>, secret_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(API_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_base: api_base.into(),
            secret_key: secret_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base.trim_end_matches('/'), path)
    }

    /// Create a payment-mode checkout session
    pub async fn create_session(&self, checkout: NewCheckout<'_>) -> Result<CheckoutSession> {
        let params = [
            ("mode", "payment".to_string()),
            ("payment_method_types[0]", "card".to_string()),
            ("line_items[0][price]", checkout.price_id.to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("customer_email", checkout.user_email.to_string()),
            ("metadata[user_email]", checkout.user_email.to_string()),
            ("metadata[user_id]", checkout.user_id.to_string()),
            ("metadata[credits]", checkout.credits.to_string()),
            ("success_url", checkout.success_url),
            ("cancel_url", checkout.cancel_url),
        ];

        let response = self
            .client
            .post(self.url("/v1/checkout/sessions"))
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await?;

        Self::parse_session(response, "create").await
    }

    /// Fetch a checkout session by id
    pub async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession> {
        let response = self
            .client
            .get(self.url(&format!(
                "/v1/checkout/sessions/{}",
                urlencoding::encode(session_id)
            )))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        Self::parse_session(response, "retrieve").await
    }

    async fn parse_session(response: reqwest::Response, action: &str) -> Result<CheckoutSession> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            let message = serde_json::from_str::<ProviderErrorBody>(&error_text)
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or(error_text);
            return Err(AppError::ExternalApi(format!(
                "Checkout {} error ({}): {}",
                action, status, message
            )));
        }

        Ok(response.json().await?)
    }
}
