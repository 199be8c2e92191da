//! Entity model: monitored targets, check results and alerts.
//!
//! Results and alerts reference their target only by id.

pub mod alert;
pub mod result;
pub mod target;

pub use alert::Alert;
pub use result::{CheckResult, ResultStatus};
pub use target::Target;
