use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Classification of a single observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultStatus {
    Ok,
    ClientError,
    ServerError,
    /// The probe never received a status code
    Error,
}

impl ResultStatus {
    /// Classify an HTTP status code.
    ///
    /// 2xx is `Ok`, anything from 500 up is `ServerError`, and everything else
    /// (4xx, but also 1xx and 3xx) is `ClientError`.
    pub fn from_status_code(code: u16) -> Self {
        match code {
            200..=299 => ResultStatus::Ok,
            500.. => ResultStatus::ServerError,
            _ => ResultStatus::ClientError,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultStatus::Ok => "OK",
            ResultStatus::ClientError => "CLIENT_ERROR",
            ResultStatus::ServerError => "SERVER_ERROR",
            ResultStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ResultStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OK" => Ok(ResultStatus::Ok),
            "CLIENT_ERROR" => Ok(ResultStatus::ClientError),
            "SERVER_ERROR" => Ok(ResultStatus::ServerError),
            "ERROR" => Ok(ResultStatus::Error),
            other => Err(format!("unknown result status: {other}")),
        }
    }
}

/// One timestamped observation of a target's health
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub id: String,
    pub target_id: String,
    pub status: ResultStatus,
    /// Raw HTTP status code, 0 when no response was received
    pub status_code: u16,
    pub response_time: Duration,
    pub checked_at: DateTime<Utc>,
    pub error: Option<String>,
}

impl CheckResult {
    pub fn new(
        id: impl Into<String>,
        target_id: impl Into<String>,
        status: ResultStatus,
        status_code: u16,
        response_time: Duration,
    ) -> Self {
        Self {
            id: id.into(),
            target_id: target_id.into(),
            status,
            status_code,
            response_time,
            checked_at: Utc::now(),
            error: None,
        }
    }

    /// Attach error detail to the result
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Alerting treats only an exact 200 as healthy, while classification
    /// accepts the whole 2xx range as `Ok`.
    pub fn is_healthy(&self) -> bool {
        self.status_code == 200
    }
}
