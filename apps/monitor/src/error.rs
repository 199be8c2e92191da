use thiserror::Error;

/// Errors produced by the monitor core and its collaborators
#[derive(Debug, Error)]
pub enum Error {
    /// An exact lookup found nothing. Callers decide whether this is fatal;
    /// "no previous result" for a target is the common recoverable case.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// The probe could not complete (refused, DNS, deadline, cancelled)
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage failure: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::Error),
}

impl Error {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { entity, id: id.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<libsql::Error> for Error {
    fn from(err: libsql::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<deadpool::managed::PoolError<libsql::Error>> for Error {
    fn from(err: deadpool::managed::PoolError<libsql::Error>) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Transport(format!("deadline exceeded: {err}"))
        } else if err.is_connect() {
            Self::Transport(format!("connection failed: {err}"))
        } else {
            Self::Transport(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
