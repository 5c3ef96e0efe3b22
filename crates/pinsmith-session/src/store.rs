//! Filesystem-backed session store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use pinsmith_protocols::error::SessionError;
use pinsmith_protocols::session::SessionStore;
use pinsmith_protocols::types::SessionStatus;

/// Stores one artifact per user as `<base_dir>/<user_id>.json`.
pub struct FileSessionStore {
    base_dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Artifact location for a user. The id is validated before any path
    /// is formed, so traversal sequences are unrepresentable.
    fn artifact_path(&self, user_id: &str) -> Result<PathBuf, SessionError> {
        validate_user_id(user_id)?;
        Ok(self.base_dir.join(format!("{user_id}.json")))
    }

    #[cfg(unix)]
    async fn restrict_permissions(path: &Path, mode: u32) -> std::io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await
    }

    #[cfg(not(unix))]
    async fn restrict_permissions(_path: &Path, _mode: u32) -> std::io::Result<()> {
        Ok(())
    }
}

/// User ids are opaque keys: ASCII alphanumerics plus `-`, `_` and `.`,
/// no leading dot, bounded length. Anything else could reach outside the
/// base directory or collide with temp siblings.
fn validate_user_id(user_id: &str) -> Result<(), SessionError> {
    let valid = !user_id.is_empty()
        && user_id.len() <= 128
        && !user_id.starts_with('.')
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(SessionError::InvalidUserId(user_id.to_string()))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn exists(&self, user_id: &str) -> Result<bool, SessionError> {
        let path = self.artifact_path(user_id)?;
        Ok(fs::metadata(&path).await.is_ok())
    }

    async fn load(&self, user_id: &str) -> Result<Vec<u8>, SessionError> {
        let path = self.artifact_path(user_id)?;
        match fs::read(&path).await {
            Ok(blob) => Ok(blob),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SessionError::NotFound(user_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, user_id: &str, blob: &[u8]) -> Result<(), SessionError> {
        let path = self.artifact_path(user_id)?;

        fs::create_dir_all(&self.base_dir).await?;
        if let Err(e) = Self::restrict_permissions(&self.base_dir, 0o700).await {
            warn!(error = %e, "failed to restrict session directory permissions");
        }

        // Write to a unique sibling, then rename over the prior artifact.
        let temp_path = self
            .base_dir
            .join(format!(".{user_id}.{}.tmp", Uuid::new_v4()));

        let write_result = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(blob).await?;
            file.sync_all().await?;
            Ok::<_, std::io::Error>(())
        }
        .await;

        if let Err(e) = write_result {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Err(e) = Self::restrict_permissions(&temp_path, 0o600).await {
            warn!(error = %e, "failed to restrict session artifact permissions");
        }

        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        debug!(user_id, path = %path.display(), "session artifact saved");
        Ok(())
    }

    async fn status(&self, user_id: &str) -> Result<SessionStatus, SessionError> {
        let path = self.artifact_path(user_id)?;
        match fs::metadata(&path).await {
            Ok(meta) => {
                let last_modified = meta.modified().ok().map(DateTime::<Utc>::from);
                Ok(SessionStatus {
                    active: true,
                    last_modified,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SessionStatus::absent()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, FileSessionStore) {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn test_save_and_load_roundtrip() {
        let (_dir, store) = store();
        store.save("user-1", b"{\"cookies\":[]}").await.unwrap();
        let blob = store.load("user-1").await.unwrap();
        assert_eq!(blob, b"{\"cookies\":[]}");
    }

    #[tokio::test]
    async fn test_save_overwrites_prior_artifact() {
        let (_dir, store) = store();
        store.save("user-1", b"first").await.unwrap();
        store.save("user-1", b"second").await.unwrap();
        assert_eq!(store.load("user-1").await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_load_missing_artifact() {
        let (_dir, store) = store();
        let err = store.load("user-1").await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound(ref id) if id == "user-1"));
    }

    #[tokio::test]
    async fn test_exists() {
        let (_dir, store) = store();
        assert!(!store.exists("user-1").await.unwrap());
        store.save("user-1", b"x").await.unwrap();
        assert!(store.exists("user-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_traversal_ids() {
        let (_dir, store) = store();
        for id in ["../evil", "a/b", "", "..", ".hidden", "a\\b", "id with space"] {
            let err = store.save(id, b"x").await.unwrap_err();
            assert!(
                matches!(err, SessionError::InvalidUserId(_)),
                "id {id:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_no_temp_siblings_left_after_save() {
        let (dir, store) = store();
        store.save("user-1", b"x").await.unwrap();
        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names, vec!["user-1.json".to_string()]);
    }

    #[tokio::test]
    async fn test_status_reports_modification_time() {
        let (_dir, store) = store();
        assert_eq!(store.status("user-1").await.unwrap(), SessionStatus::absent());

        store.save("user-1", b"x").await.unwrap();
        let status = store.status("user-1").await.unwrap();
        assert!(status.active);
        assert!(status.last_modified.is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_artifact_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, store) = store();
        store.save("user-1", b"secret").await.unwrap();
        let meta = std::fs::metadata(dir.path().join("user-1.json")).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }
}
