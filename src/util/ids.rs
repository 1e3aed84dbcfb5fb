//! Process-wide identity generation

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic integer identity source for users and sessions.
///
/// Seeded at a fixed start value and never reset while the process runs, so an
/// id is never reused even after its owner disconnects. Shared by `Arc` with
/// whatever creates identities rather than living as ambient state.
#[derive(Debug)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    /// First id handed out. Low values are left free for well-known ids.
    pub const FIRST_ID: u64 = 100;

    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(Self::FIRST_ID),
        }
    }

    /// Hand out the next id.
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_fixed_seed() {
        let ids = IdGenerator::new();
        assert_eq!(ids.next_id(), IdGenerator::FIRST_ID);
    }

    #[test]
    fn ids_are_monotonic_and_unique() {
        let ids = IdGenerator::new();
        let a = ids.next_id();
        let b = ids.next_id();
        let c = ids.next_id();
        assert!(a < b && b < c);
    }
}
