//! Typed client for the job lifecycle API.
//!
//! Every request carries the signed-in user's email in the `X-User-Email`
//! header. Non-2xx responses become [`ClientError::Api`] with the server's
//! `detail` message when one is present.

use reqwest::{Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    CaptureReferralRequest, CheckoutSessionRequest, CheckoutSessionResponse,
    ConfirmPaymentRequest, ConfirmPaymentResponse, CreateCustomVoiceRequest, CreateJobRequest,
    CustomVoiceResponse, Job, JobConfig, JobStatusResponse, MessageResponse, ReferralSummary,
    RenameJobRequest, StorageInfo, SyncUserRequest, UserResponse, VoiceResponse,
};

const API_TIMEOUT: Duration = Duration::from_secs(30);
const USER_EMAIL_HEADER: &str = "X-User-Email";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message}")]
    Api { status: u16, message: String },
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    user_email: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(API_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_email: None,
        }
    }

    pub fn with_user_email(mut self, email: impl Into<String>) -> Self {
        self.user_email = Some(email.into());
        self
    }

    pub fn set_user_email(&mut self, email: Option<String>) {
        self.user_email = email;
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));

        match &self.user_email {
            Some(email) => builder.header(USER_EMAIL_HEADER, email),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = Self::check(builder.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let detail = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.detail);

        Err(ClientError::Api {
            status,
            message: detail.unwrap_or_else(|| format!("API error: {}", status)),
        })
    }

    // User endpoints

    pub async fn get_me(&self) -> Result<UserResponse> {
        self.send(self.request(Method::GET, "/api/users/me")).await
    }

    pub async fn sync_user(&self, user: &SyncUserRequest) -> Result<UserResponse> {
        self.send(self.request(Method::POST, "/api/users/sync").json(user))
            .await
    }

    // Job endpoints

    pub async fn create_job(&self, config: &JobConfig) -> Result<Job> {
        let body = CreateJobRequest {
            config: config.clone(),
        };
        self.send(self.request(Method::POST, "/api/jobs").json(&body))
            .await
    }

    pub async fn list_jobs(&self, limit: u64, offset: u64) -> Result<Vec<Job>> {
        self.send(
            self.request(Method::GET, "/api/jobs")
                .query(&[("limit", limit), ("offset", offset)]),
        )
        .await
    }

    pub async fn get_job(&self, id: Uuid) -> Result<Job> {
        self.send(self.request(Method::GET, &format!("/api/jobs/{}", id)))
            .await
    }

    pub async fn get_job_status(&self, id: Uuid) -> Result<JobStatusResponse> {
        self.send(self.request(Method::GET, &format!("/api/jobs/{}/status", id)))
            .await
    }

    pub async fn rename_job(&self, id: Uuid, title: Option<&str>) -> Result<Job> {
        let body = RenameJobRequest {
            title: title.map(str::to_string),
        };
        self.send(
            self.request(Method::PATCH, &format!("/api/jobs/{}", id))
                .json(&body),
        )
        .await
    }

    pub async fn delete_job(&self, id: Uuid) -> Result<()> {
        let _: MessageResponse = self
            .send(self.request(Method::DELETE, &format!("/api/jobs/{}", id)))
            .await?;
        Ok(())
    }

    pub async fn archive_job(&self, id: Uuid) -> Result<Job> {
        self.send(self.request(Method::POST, &format!("/api/jobs/{}/archive", id)))
            .await
    }

    pub async fn regenerate_job(&self, id: Uuid) -> Result<Job> {
        self.send(self.request(Method::POST, &format!("/api/jobs/{}/regenerate", id)))
            .await
    }

    pub async fn get_storage_info(&self) -> Result<StorageInfo> {
        self.send(self.request(Method::GET, "/api/jobs/storage")).await
    }

    // File endpoints

    pub fn download_url(&self, id: Uuid) -> String {
        format!("{}/api/files/{}", self.base_url, id)
    }

    pub async fn download_file(&self, id: Uuid) -> Result<Vec<u8>> {
        let response = self
            .request(Method::GET, &format!("/api/files/{}", id))
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    // Voice endpoints

    pub async fn list_voices(&self) -> Result<Vec<VoiceResponse>> {
        self.send(self.request(Method::GET, "/api/voices")).await
    }

    pub async fn list_custom_voices(&self) -> Result<Vec<CustomVoiceResponse>> {
        self.send(self.request(Method::GET, "/api/custom-voices")).await
    }

    pub async fn create_custom_voice(
        &self,
        name: &str,
        voice_id: &str,
        preview_url: Option<&str>,
    ) -> Result<CustomVoiceResponse> {
        let body = CreateCustomVoiceRequest {
            name: name.to_string(),
            voice_id: voice_id.to_string(),
            preview_url: preview_url.map(str::to_string),
        };
        self.send(self.request(Method::POST, "/api/custom-voices").json(&body))
            .await
    }

    pub async fn delete_custom_voice(&self, id: Uuid) -> Result<()> {
        let _: MessageResponse = self
            .send(self.request(Method::DELETE, &format!("/api/custom-voices/{}", id)))
            .await?;
        Ok(())
    }

    // Payment and referral endpoints

    pub async fn create_checkout_session(&self, price_id: &str) -> Result<String> {
        let body = CheckoutSessionRequest {
            price_id: price_id.to_string(),
        };
        let session: CheckoutSessionResponse = self
            .send(
                self.request(Method::POST, "/api/payments/create-checkout-session")
                    .json(&body),
            )
            .await?;
        Ok(session.checkout_url)
    }

    pub async fn confirm_payment(&self, session_id: &str) -> Result<ConfirmPaymentResponse> {
        let body = ConfirmPaymentRequest {
            session_id: session_id.to_string(),
        };
        self.send(
            self.request(Method::POST, "/api/payments/confirm")
                .json(&body),
        )
        .await
    }

    pub async fn capture_referral(&self, referral_code: &str) -> Result<String> {
        let body = CaptureReferralRequest {
            referral_code: referral_code.to_string(),
        };
        let response: MessageResponse = self
            .send(self.request(Method::POST, "/api/referrals").json(&body))
            .await?;
        Ok(response.message)
    }

    pub async fn referral_summary(&self) -> Result<ReferralSummary> {
        self.send(self.request(Method::GET, "/api/referrals/me")).await
    }

    pub async fn health(&self) -> Result<bool> {
        let body: serde_json::Value = self.send(self.request(Method::GET, "/health")).await?;
        Ok(body == json!({ "status": "healthy" }))
    }
}
