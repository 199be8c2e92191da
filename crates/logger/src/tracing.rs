use std::env::var;

use tracing::{level_filters::LevelFilter, warn};
use tracing_subscriber::{Layer, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format, selected with `RUST_LOG_FORMAT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Compact,
}

impl LogFormat {
    fn from_env() -> Self {
        match var("RUST_LOG_FORMAT") {
            Ok(value) => Self::parse(&value),
            Err(std::env::VarError::NotPresent) => Self::default(),
            Err(error) => {
                warn!("Failed to read RUST_LOG_FORMAT, falling back to default: {error}");
                Self::default()
            }
        }
    }

    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") { Self::Json } else { Self::Compact }
    }
}

/// Initialize tracing at INFO unless `RUST_LOG` says otherwise
pub fn init() {
    init_with_level(LevelFilter::INFO);
}

/// Initialize tracing with `level` as the default directive.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_with_level(level: LevelFilter) {
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    let log_layer = match LogFormat::from_env() {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().with_filter(env_filter).boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .without_time()
            .with_filter(env_filter)
            .boxed(),
    };

    let _ = tracing_subscriber::registry().with(log_layer).try_init();
}
