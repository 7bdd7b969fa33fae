//! Port abstraction for the identity subsystem boundary.
//!
//! Users are owned elsewhere; this port is the read-only window the core uses
//! to resolve ids into presentable users and to power the friend search.

use async_trait::async_trait;

use crate::domain::{User, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by user directory adapters.
    pub enum UserDirectoryError {
        /// Directory connection could not be established.
        Connection { message: String } => "user directory connection failed: {message}",
        /// Lookup failed during execution.
        Query { message: String } => "user directory query failed: {message}",
    }
}

/// Read-only lookup into the identity subsystem.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fetch a single user by id.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserDirectoryError>;

    /// Fetch users for the given ids, preserving input order.
    ///
    /// Unknown ids are silently dropped; callers that need to distinguish a
    /// missing user use [`Self::find_by_id`].
    async fn find_by_ids(&self, ids: &[UserId]) -> Result<Vec<User>, UserDirectoryError>;

    /// Case-insensitive substring search over usernames and full names.
    async fn search(&self, term: &str, limit: i64) -> Result<Vec<User>, UserDirectoryError>;
}
