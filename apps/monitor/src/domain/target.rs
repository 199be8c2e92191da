use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};

/// A monitored HTTP endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub url: String,
    pub name: String,
    /// How often the scheduler checks this target
    pub interval: Duration,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Target {
    /// Create a new, active target
    pub fn new(
        id: impl Into<String>,
        url: impl Into<String>,
        name: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            name: name.into(),
            interval,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.url.is_empty() && !self.interval.is_zero()
    }

    /// Stricter check used when an operator creates or edits a target: on top
    /// of `is_valid`, the URL must parse as http(s).
    pub fn validate(&self) -> Result<()> {
        if !self.is_valid() {
            return Err(Error::Validation(format!(
                "target {} needs a non-empty url and an interval above zero",
                self.id
            )));
        }

        let url = Url::parse(&self.url)
            .map_err(|e| Error::Validation(format!("invalid url {}: {}", self.url, e)))?;

        match url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(Error::Validation(format!("unsupported scheme: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_target() {
        let target = Target::new("target-1", "https://example.com", "My API", Duration::from_secs(30));

        assert_eq!(target.id, "target-1");
        assert_eq!(target.url, "https://example.com");
        assert_eq!(target.name, "My API");
        assert_eq!(target.interval, Duration::from_secs(30));
        assert!(target.is_active);
    }

    #[test]
    fn test_is_valid() {
        let ok = Duration::from_secs(30);
        let zero = Duration::ZERO;

        assert!(Target::new("t", "https://example.com", "n", ok).is_valid());
        assert!(!Target::new("t", "", "n", ok).is_valid());
        assert!(!Target::new("t", "https://example.com", "n", zero).is_valid());
        assert!(!Target::new("t", "", "n", zero).is_valid());
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        let interval = Duration::from_secs(30);

        assert!(Target::new("t", "https://example.com/health", "n", interval).validate().is_ok());
        assert!(matches!(
            Target::new("t", "not a url", "n", interval).validate(),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            Target::new("t", "ftp://example.com", "n", interval).validate(),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            Target::new("t", "", "n", interval).validate(),
            Err(Error::Validation(_))
        ));
    }
}
