//! Client side of the pump API.

use std::time::Duration;

use async_trait::async_trait;
use ptp_common::{Address, NewPump, Pump};
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_API_URL: &str = "http://localhost:5001/api";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("rejected by pump API: {0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("pump API unreachable: {0}")]
    Connection(String),

    #[error("pump API error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("invalid response from pump API: {0}")]
    InvalidResponse(String),
}

/// Remote pump collection.
#[async_trait]
pub trait PumpDirectory: Send + Sync {
    /// All pumps, newest first.
    async fn list(&self) -> Result<Vec<Pump>, DirectoryError>;

    async fn create(&self, pump: &NewPump) -> Result<Pump, DirectoryError>;

    /// Idempotent: an existing participant yields the unchanged pump.
    async fn add_participant(&self, pump_id: Uuid, participant: Address) -> Result<Pump, DirectoryError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePumpBody<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    creator: Address,
    required_eth: String,
}

#[derive(Serialize)]
struct AddParticipantBody {
    participant: Address,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// [`PumpDirectory`] over the backend's JSON API.
#[derive(Clone, Debug)]
pub struct HttpPumpDirectory {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpPumpDirectory {
    /// `base_url` is the API root, e.g. `http://localhost:5001/api`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, DirectoryError> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DirectoryError::Connection(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, DirectoryError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| DirectoryError::InvalidResponse(e.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);
        Err(match status {
            StatusCode::BAD_REQUEST => DirectoryError::Validation(message),
            StatusCode::NOT_FOUND => DirectoryError::NotFound(message),
            other => DirectoryError::Server {
                status: other.as_u16(),
                message,
            },
        })
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, url: &str, body: &B) -> Result<T, DirectoryError> {
        let response = self
            .http_client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| DirectoryError::Connection(e.to_string()))?;
        Self::read(response).await
    }
}

#[async_trait]
impl PumpDirectory for HttpPumpDirectory {
    async fn list(&self) -> Result<Vec<Pump>, DirectoryError> {
        let url = format!("{}/pumps", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| DirectoryError::Connection(e.to_string()))?;
        Self::read(response).await
    }

    async fn create(&self, pump: &NewPump) -> Result<Pump, DirectoryError> {
        let url = format!("{}/pumps", self.base_url);
        let body = CreatePumpBody {
            name: &pump.name,
            description: pump.description.as_deref(),
            creator: pump.creator,
            required_eth: pump.required_eth.to_string(),
        };
        let created: Pump = self.post(&url, &body).await?;
        debug!(pump_id = %created.id, "pump created");
        Ok(created)
    }

    async fn add_participant(&self, pump_id: Uuid, participant: Address) -> Result<Pump, DirectoryError> {
        let url = format!("{}/pumps/{}/participants", self.base_url, pump_id);
        self.post(&url, &AddParticipantBody { participant }).await
    }
}
