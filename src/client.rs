use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::BookingError;
use crate::models::common::AppointmentRequest;
use crate::models::session::{TokenResponse, UserProfile};
use crate::models::slot::{AvailableSlotsResponse, SlotTarget};

/// Operations the booking lifecycle needs from the portal backend.
#[async_trait]
pub trait PortalApi: Send + Sync {
    async fn available_slots(
        &self,
        doctor_id: i64,
        date: NaiveDate,
    ) -> Result<AvailableSlotsResponse, BookingError>;

    async fn reserve_slot(&self, user_id: i64, target: &SlotTarget)
        -> Result<Value, BookingError>;

    async fn confirm_slot(&self, user_id: i64, target: &SlotTarget)
        -> Result<Value, BookingError>;

    async fn cancel_slot(&self, user_id: i64, target: &SlotTarget) -> Result<Value, BookingError>;

    async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, BookingError>;

    async fn current_user(&self, access_token: &str) -> Result<UserProfile, BookingError>;
}

/// Client for the telehealth portal REST backend
#[derive(Clone)]
pub struct PortalClient {
    client: Client,
    endpoint: String,
}

impl PortalClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, BookingError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    /// Probe the backend; any HTTP answer counts as reachable.
    pub async fn ping(&self) -> bool {
        match self.client.get(self.url("/")).send().await {
            Ok(res) => {
                debug!("Backend ping answered with status: {}", res.status());
                true
            }
            Err(err) => {
                debug!("Backend ping failed: {}", err);
                false
            }
        }
    }

    async fn mutate(
        &self,
        path: &str,
        user_id: i64,
        target: &SlotTarget,
    ) -> Result<Value, BookingError> {
        let body = AppointmentRequest {
            doctor_id: target.doctor_id,
            appointment_date: target.appointment_at,
        };

        info!(
            "POST {} for user {} on doctor {} at {}",
            path,
            user_id,
            target.doctor_id,
            target.appointment_param()
        );

        let res = self
            .client
            .post(self.url(path))
            .query(&[("user_id", user_id)])
            .json(&body)
            .send()
            .await?;

        read_json(res).await
    }
}

#[async_trait]
impl PortalApi for PortalClient {
    async fn available_slots(
        &self,
        doctor_id: i64,
        date: NaiveDate,
    ) -> Result<AvailableSlotsResponse, BookingError> {
        let app_date = date.format("%Y-%m-%d").to_string();
        info!("Loading slots for doctor {} on {}", doctor_id, app_date);

        let res = self
            .client
            .get(self.url("/available_appointment"))
            .query(&[("doctor_id", doctor_id.to_string()), ("app_date", app_date)])
            .send()
            .await?;

        read_json(res).await
    }

    async fn reserve_slot(
        &self,
        user_id: i64,
        target: &SlotTarget,
    ) -> Result<Value, BookingError> {
        self.mutate("/reserve_slot", user_id, target).await
    }

    async fn confirm_slot(
        &self,
        user_id: i64,
        target: &SlotTarget,
    ) -> Result<Value, BookingError> {
        self.mutate("/confirm_slot", user_id, target).await
    }

    async fn cancel_slot(&self, user_id: i64, target: &SlotTarget) -> Result<Value, BookingError> {
        let slot_time = target.appointment_param();
        info!(
            "POST /cancel_slot for user {} on doctor {} at {}",
            user_id, target.doctor_id, slot_time
        );

        let res = self
            .client
            .post(self.url("/cancel_slot"))
            .query(&[
                ("doctor_id", target.doctor_id.to_string()),
                ("slot_time", slot_time),
                ("user_id", user_id.to_string()),
            ])
            .send()
            .await?;

        read_json(res).await
    }

    async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, BookingError> {
        info!("Requesting access token for {}", email);

        let res = self
            .client
            .post(self.url("/token"))
            .form(&[("username", email), ("password", password)])
            .send()
            .await?;

        if res.status() == StatusCode::BAD_REQUEST {
            // The backend answers bad credentials with 400
            let detail = error_detail(res).await;
            return Err(BookingError::Unauthorized(
                detail.unwrap_or_else(|| "Invalid email or password".to_string()),
            ));
        }

        read_json(res).await
    }

    async fn current_user(&self, access_token: &str) -> Result<UserProfile, BookingError> {
        let res = self
            .client
            .get(self.url("/user/me"))
            .bearer_auth(access_token)
            .send()
            .await?;

        read_json(res).await
    }
}

// Decode a successful body or classify the failure
async fn read_json<T: DeserializeOwned>(res: Response) -> Result<T, BookingError> {
    let status = res.status();
    debug!("Response received with status: {}", status);

    if status.is_success() {
        return res
            .json::<T>()
            .await
            .map_err(|e| BookingError::MalformedResponse(e.to_string()));
    }

    let detail = error_detail(res)
        .await
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    warn!("Backend rejected request with {}: {}", status, detail);

    Err(match status {
        StatusCode::CONFLICT => BookingError::Conflict(detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BookingError::Unauthorized(detail),
        _ => BookingError::Network(detail),
    })
}

// Pull `detail` out of an error body; it is either a string or a list of `{msg}`
async fn error_detail(res: Response) -> Option<String> {
    let body = res.json::<Value>().await.ok()?;
    match body.get("detail")? {
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => items
            .first()
            .and_then(|item| item.get("msg"))
            .and_then(Value::as_str)
            .map(str::to_string),
        other => Some(other.to_string()),
    }
}
