//! In-memory user directory over a concurrent map.

use async_trait::async_trait;
use dashmap::DashMap;

use super::{
    SortField, StoreError, User, UserDirectory, UserFilter, UserRole, UserStatus, DEFAULT_TAKE,
    MAX_LOGIN_ATTEMPTS,
};

/// `DashMap`-backed [`UserDirectory`]. Suitable for embedding and tests;
/// a durable deployment swaps in a database-backed implementation behind
/// the same trait.
#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    users: DashMap<u64, User>,
}

impl MemoryUserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a user, replacing any existing entry with the same id.
    pub fn insert(&self, user: User) {
        self.users.insert(user.id, user);
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// SQL-LIKE matching with `%` wildcards only (the original queries never use
/// `_`). Segments between wildcards must appear in order; anchoring follows
/// whether the pattern starts/ends with `%`.
fn like_match(pattern: &str, value: &str) -> bool {
    let segments: Vec<&str> = pattern.split('%').collect();
    let Some((first, rest)) = segments.split_first() else {
        return value.is_empty();
    };

    if !value.starts_with(first) {
        return false;
    }
    let mut remainder = &value[first.len()..];

    let Some((last, middle)) = rest.split_last() else {
        // No wildcard at all: exact match.
        return remainder.is_empty();
    };

    for segment in middle {
        match remainder.find(segment) {
            Some(pos) => remainder = &remainder[pos + segment.len()..],
            None => return false,
        }
    }

    remainder.ends_with(last)
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_id(&self, id: u64) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(&id).map(|entry| entry.clone()))
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.login == login)
            .map(|entry| entry.clone()))
    }

    async fn list(&self, filter: &UserFilter) -> Result<Vec<User>, StoreError> {
        let mut matches: Vec<User> = self
            .users
            .iter()
            .filter(|entry| {
                let user = entry.value();
                let login_ok = if let Some(pattern) = &filter.login_pattern {
                    like_match(pattern, &user.login)
                } else if let Some(login) = &filter.login {
                    &user.login == login
                } else {
                    true
                };
                login_ok
                    && filter.role.is_none_or(|role| user.role == role)
                    && filter.status.is_none_or(|status| user.status == status)
            })
            .map(|entry| entry.clone())
            .collect();

        match filter.sort_field {
            Some(SortField::Id) | None => matches.sort_by_key(|user| user.id),
            Some(SortField::Login) => matches.sort_by(|a, b| a.login.cmp(&b.login)),
        }
        if filter.sort_desc {
            matches.reverse();
        }

        let skip = filter.skip.unwrap_or(0);
        let take = filter.take.unwrap_or(DEFAULT_TAKE);
        Ok(matches.into_iter().skip(skip).take(take).collect())
    }

    async fn update(&self, id: u64, mut user: User) -> Result<bool, StoreError> {
        match self.users.get_mut(&id) {
            Some(mut entry) => {
                user.id = id;
                *entry = user;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: u64) -> Result<bool, StoreError> {
        Ok(self.users.remove(&id).is_some())
    }

    async fn increment_login_attempts(&self, id: u64) -> Result<User, StoreError> {
        let mut entry = self
            .users
            .get_mut(&id)
            .ok_or(StoreError::NotFound { id })?;
        entry.login_attempts += 1;
        if entry.login_attempts >= MAX_LOGIN_ATTEMPTS {
            entry.status = UserStatus::LockedOut;
        }
        Ok(entry.clone())
    }

    async fn finalize_login(&self, id: u64) -> Result<Option<User>, StoreError> {
        let mut entry = self
            .users
            .get_mut(&id)
            .ok_or(StoreError::NotFound { id })?;
        if entry.status != UserStatus::Active {
            return Ok(None);
        }
        entry.login_attempts = 0;
        Ok(Some(entry.clone()))
    }

    async fn has_access_to_network(
        &self,
        user_id: u64,
        network_id: &str,
    ) -> Result<bool, StoreError> {
        let Some(user) = self.users.get(&user_id) else {
            return Ok(false);
        };
        Ok(user.role == UserRole::Admin || user.network_ids.contains(network_id))
    }
}
