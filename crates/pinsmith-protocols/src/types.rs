//! Core data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single pin to publish.
///
/// The title and target board name are required; everything else is
/// optional. `image_ref` may be an absolute local path or an http(s) URL —
/// its absence is a valid state and the pin is published without an image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinRequest {
    /// Pin title shown on the target site.
    pub title: String,
    /// Optional pin description.
    #[serde(default)]
    pub description: Option<String>,
    /// Local path or remote URL of the pin image.
    #[serde(default)]
    pub image_ref: Option<String>,
    /// Desired board name. Resolved against the user's existing boards at
    /// publish time.
    pub board: String,
    /// Optional scheduling timestamp. Recorded with the pin; enforcement
    /// belongs to the calling layer.
    #[serde(default)]
    pub scheduled_time: Option<DateTime<Utc>>,
}

impl PinRequest {
    /// Check the request invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("pin title must not be empty".to_string());
        }
        if self.board.trim().is_empty() {
            return Err("board name must not be empty".to_string());
        }
        Ok(())
    }
}

/// Plaintext-ready login credentials for the target site.
///
/// Decryption of stored secrets happens before this type is constructed;
/// the engine never handles encrypted material.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Outcome of board resolution. Exactly one is produced per publish
/// attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchDecision {
    /// File the pin into an existing board, named with the casing scraped
    /// from the target site.
    Reuse(String),
    /// Create a new board with the requested name.
    Create(String),
}

impl MatchDecision {
    /// Board name the pin will be filed into.
    pub fn board_name(&self) -> &str {
        match self {
            MatchDecision::Reuse(name) | MatchDecision::Create(name) => name,
        }
    }
}

/// Liveness summary of a stored session artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    /// Whether an artifact is present on disk. Presence does not imply
    /// the target site still accepts it.
    pub active: bool,
    /// Last-modified timestamp of the artifact, if present.
    pub last_modified: Option<DateTime<Utc>>,
}

impl SessionStatus {
    /// Status for a user with no stored artifact.
    pub fn absent() -> Self {
        Self {
            active: false,
            last_modified: None,
        }
    }
}
