//! User directory interface.
//!
//! A collaborator of the shim, not part of it: the embedding service looks
//! users up and updates login bookkeeping before requests are admitted. The
//! trait mirrors the persistence operations the surrounding system performs;
//! [`MemoryUserDirectory`] is the in-process implementation used for
//! embedding and tests.

pub mod memory;

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use memory::MemoryUserDirectory;

/// Failed logins tolerated before an account is locked out.
pub const MAX_LOGIN_ATTEMPTS: u32 = 10;

/// Page size applied when a listing does not specify `take`.
pub const DEFAULT_TAKE: usize = 1000;

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Admin,
    Client,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Active,
    LockedOut,
    Disabled,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub login: String,
    pub password_hash: String,
    pub password_salt: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub login_attempts: u32,
    /// Networks this user may act on. Admins implicitly have access to all.
    pub network_ids: HashSet<String>,
}

/// Listing filter. All predicate fields are conjunctive; `login_pattern`
/// (SQL-LIKE `%` wildcards) takes precedence over exact `login`.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub login: Option<String>,
    pub login_pattern: Option<String>,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub sort_field: Option<SortField>,
    pub sort_desc: bool,
    pub skip: Option<usize>,
    pub take: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Login,
}

/// Directory operation failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("user {id} not found")]
    NotFound { id: u64 },
}

// ---------------------------------------------------------------------------
// UserDirectory trait
// ---------------------------------------------------------------------------

/// Persistence operations keyed by user identifiers.
///
/// All methods are safe for concurrent use. Mutating operations returning
/// `bool` report whether a matching row existed, mirroring
/// update-count-style persistence APIs.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: u64) -> Result<Option<User>, StoreError>;

    async fn find_by_login(&self, login: &str) -> Result<Option<User>, StoreError>;

    async fn list(&self, filter: &UserFilter) -> Result<Vec<User>, StoreError>;

    /// Replaces the stored user with `id`. Returns `false` when no such user
    /// exists; the `id` field of `user` is ignored in favor of the key.
    async fn update(&self, id: u64, user: User) -> Result<bool, StoreError>;

    async fn delete(&self, id: u64) -> Result<bool, StoreError>;

    /// Records a failed login. Reaching [`MAX_LOGIN_ATTEMPTS`] locks the
    /// account out. Returns the updated user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the user does not exist.
    async fn increment_login_attempts(&self, id: u64) -> Result<User, StoreError>;

    /// Completes a successful login: resets the attempt counter. Returns
    /// `None` (and leaves the user untouched) unless the account is active.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the user does not exist.
    async fn finalize_login(&self, id: u64) -> Result<Option<User>, StoreError>;

    /// Whether the user may act on `network_id`. Admins always may.
    async fn has_access_to_network(
        &self,
        user_id: u64,
        network_id: &str,
    ) -> Result<bool, StoreError>;
}
