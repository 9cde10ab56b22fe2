use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Source of identifiers for newly created transactions.
pub trait IdGenerator: Send + Sync {
    /// Returns an identifier that has never been returned before.
    fn new_id(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn new_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic `prefix-1`, `prefix-2`, ... identifiers.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn new_id(&self) -> String {
        let value = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn uuid_ids_are_unique() {
        let ids = UuidGenerator;
        let seen: HashSet<_> = (0..64).map(|_| ids.new_id()).collect();
        assert_eq!(seen.len(), 64);
    }

    #[test]
    fn sequential_ids_count_up() {
        let ids = SequentialIds::new("gen");
        assert_eq!(ids.new_id(), "gen-1");
        assert_eq!(ids.new_id(), "gen-2");
    }
}
