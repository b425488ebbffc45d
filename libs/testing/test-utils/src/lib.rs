//! Test fixtures for the users workspace.
//!
//! - [`TestDatabase`] (feature `postgres`, default): migrated Postgres container
//! - [`TestRedis`] (feature `redis`): Redis container for the token store
//! - [`TestDataBuilder`]: per-test deterministic usernames, emails and ids
//! - [`assertions`]: small helpers with readable failure messages
//!
//! Container-backed tests are marked `#[ignore = "requires Docker"]` and run
//! with `cargo test -- --ignored`.
//!
//! ```rust,no_run
//! use test_utils::{TestDataBuilder, TestDatabase};
//!
//! # async fn example() {
//! let db = TestDatabase::new().await;
//! let builder = TestDataBuilder::from_test_name("restore_conflict");
//!
//! let username = builder.username("alice");
//! let email = builder.email("alice");
//! # }
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

#[cfg(feature = "postgres")]
mod postgres;

#[cfg(feature = "redis")]
mod redis;

#[cfg(feature = "postgres")]
pub use postgres::TestDatabase;

#[cfg(feature = "redis")]
pub use redis::TestRedis;

/// Usernames are `{base}_{suffix}` with the suffix kept below this bound
const SUFFIX_BOUND: u64 = 1_000_000_000;

/// Fixture values derived from a seed, so one test always sees the same data
/// and two tests never collide on a unique column.
#[derive(Debug, Clone, Copy)]
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Seed from the test's name
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let a = TestDataBuilder::from_test_name("login_by_email");
    /// let b = TestDataBuilder::from_test_name("login_by_email");
    /// assert_eq!(a.username("alice"), b.username("alice"));
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Stable id for records created outside the user repository
    pub fn user_id(&self) -> Uuid {
        let half = self.seed.to_le_bytes();
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&half);
        bytes[8..].copy_from_slice(&half);
        Uuid::from_bytes(bytes)
    }

    /// Username that fits the 3..=50 character rule
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::new(7);
    /// assert_eq!(builder.username("alice"), "alice_7");
    /// ```
    pub fn username(&self, base: &str) -> String {
        format!("{base}_{}", self.seed % SUFFIX_BOUND)
    }

    pub fn email(&self, base: &str) -> String {
        format!("{}@example.com", self.username(base))
    }
}

pub mod assertions {
    use uuid::Uuid;

    pub fn assert_uuid_eq(actual: Uuid, expected: Uuid, context: &str) {
        assert_eq!(actual, expected, "{context}: expected {expected}, got {actual}");
    }

    /// Unwrap with the context in the panic message
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{context}: expected Some, got None"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_data() {
        let a = TestDataBuilder::new(42);
        let b = TestDataBuilder::new(42);

        assert_eq!(a.user_id(), b.user_id());
        assert_eq!(a.email("alice"), b.email("alice"));
    }

    #[test]
    fn test_different_names_do_not_collide() {
        let a = TestDataBuilder::from_test_name("test1");
        let b = TestDataBuilder::from_test_name("test2");

        assert_ne!(a.user_id(), b.user_id());
        assert_ne!(a.username("alice"), b.username("alice"));
    }

    #[test]
    fn test_email_builds_on_username() {
        let builder = TestDataBuilder::new(3);
        assert_eq!(builder.email("bob"), "bob_3@example.com");
    }

    #[test]
    fn test_username_fits_length_rule() {
        let username = TestDataBuilder::new(u64::MAX).username("a_rather_long_base");
        assert!(username.len() <= 50);
    }
}
