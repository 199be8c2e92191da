use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::result::ResultStatus;

/// Notification that a target went unhealthy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub target_id: String,
    /// Classification of the result that opened the alert
    pub alert_type: ResultStatus,
    pub message: String,
    pub created_at: DateTime<Utc>,
    /// Set iff `is_resolved`
    pub resolved_at: Option<DateTime<Utc>>,
    pub is_resolved: bool,
}

impl Alert {
    pub fn new(
        id: impl Into<String>,
        target_id: impl Into<String>,
        alert_type: ResultStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            target_id: target_id.into(),
            alert_type,
            message: message.into(),
            created_at: Utc::now(),
            resolved_at: None,
            is_resolved: false,
        }
    }

    /// Mark the alert resolved now.
    ///
    /// Calling this on an already resolved alert overwrites `resolved_at`.
    pub fn resolve(&mut self) {
        self.resolved_at = Some(Utc::now());
        self.is_resolved = true;
    }
}
