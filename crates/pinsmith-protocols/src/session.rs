//! Session store abstraction.

use async_trait::async_trait;

use crate::error::SessionError;
use crate::types::SessionStatus;

/// Key-value store of opaque session artifacts, keyed by user id.
///
/// The artifact is the serialized authenticated browser state captured at
/// login and restored on every publish. The store treats it as a blob:
/// the persistence mechanism (filesystem, database, object store) is
/// swappable without touching the publishing engine.
///
/// The store is the single writer per user. Concurrent logins for the
/// same user are not coordinated; the last writer wins.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// True iff an artifact is present and readable for the user.
    async fn exists(&self, user_id: &str) -> Result<bool, SessionError>;

    /// Load the artifact, failing with [`SessionError::NotFound`] if absent.
    async fn load(&self, user_id: &str) -> Result<Vec<u8>, SessionError>;

    /// Fully overwrite the prior artifact. The write is atomic from the
    /// caller's perspective: a failure mid-save never leaves a partial
    /// file that a later load would accept.
    async fn save(&self, user_id: &str, blob: &[u8]) -> Result<(), SessionError>;

    /// Presence plus the artifact's last-modified timestamp.
    async fn status(&self, user_id: &str) -> Result<SessionStatus, SessionError>;
}
