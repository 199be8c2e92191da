use uuid::Uuid;

/// Source of unique, time-sortable record ids
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// UUIDv7 ids; lexical order follows creation time
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::now_v7().to_string()
    }
}
