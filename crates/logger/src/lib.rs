//! Shared tracing setup for Uppe binaries.

mod tracing;

pub use self::tracing::{LogFormat, init, init_with_level};
