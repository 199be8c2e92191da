pub mod memory;

pub use memory::{MemoryAlertRepository, MemoryResultRepository, MemoryTargetRepository};
