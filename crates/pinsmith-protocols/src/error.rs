//! Error taxonomy shared across the workspace.
//!
//! Stage-local, recoverable conditions (media staging, semantic matching)
//! have their own error types and are absorbed by the engine with a logged
//! fallback. Everything else propagates as a login or publish failure
//! carrying the stage it happened in.

use std::fmt;

use thiserror::Error;

/// Stages of the login flow, carried on login errors for attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStage {
    OpeningBrowser,
    AwaitingCredentialsForm,
    Submitting,
    AwaitingRedirectHome,
    PersistingSession,
}

impl fmt::Display for LoginStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoginStage::OpeningBrowser => "opening-browser",
            LoginStage::AwaitingCredentialsForm => "awaiting-credentials-form",
            LoginStage::Submitting => "submitting",
            LoginStage::AwaitingRedirectHome => "awaiting-redirect-home",
            LoginStage::PersistingSession => "persisting-session",
        };
        f.write_str(name)
    }
}

/// Stages of the publish flow, carried on publish errors for attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStage {
    RestoringSession,
    VerifyingSession,
    OpeningComposer,
    StagingMedia,
    FillingFields,
    ResolvingBoard,
    CreatingBoard,
    SelectingBoard,
    Submitting,
}

impl fmt::Display for PublishStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PublishStage::RestoringSession => "restoring-session",
            PublishStage::VerifyingSession => "verifying-session",
            PublishStage::OpeningComposer => "opening-composer",
            PublishStage::StagingMedia => "staging-media",
            PublishStage::FillingFields => "filling-fields",
            PublishStage::ResolvingBoard => "resolving-board",
            PublishStage::CreatingBoard => "creating-board",
            PublishStage::SelectingBoard => "selecting-board",
            PublishStage::Submitting => "submitting",
        };
        f.write_str(name)
    }
}

/// Session store errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The user id cannot be used as a storage key.
    #[error("user id {0:?} is not a valid session key")]
    InvalidUserId(String),

    /// No artifact is stored for the user.
    #[error("no session artifact for user {0}; login required")]
    NotFound(String),

    /// An artifact is present but cannot be deserialized.
    #[error("session artifact for user {user_id} is corrupt: {reason}")]
    Corrupt { user_id: String, reason: String },

    /// Underlying filesystem failure.
    #[error("session storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Login flow errors.
#[derive(Debug, Error)]
pub enum LoginError {
    /// The browser could not be launched or connected to.
    #[error("failed to open browser: {0}")]
    Browser(String),

    /// A page interaction failed.
    #[error("login failed at {stage}: {message}")]
    FormInteraction { stage: LoginStage, message: String },

    /// A bounded wait expired.
    #[error("login timed out at {stage}: {message}")]
    Timeout { stage: LoginStage, message: String },

    /// The target site rejected the supplied credentials.
    #[error("credentials rejected by the target site")]
    CredentialsRejected,

    /// Persisting the captured session failed.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Publish flow errors.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The pin request violates its invariants.
    #[error("invalid pin request: {0}")]
    InvalidRequest(String),

    /// No stored session for the user; nothing was navigated.
    #[error("no session artifact for user {0}; login required")]
    SessionNotFound(String),

    /// An artifact was present but the target site redirected to login.
    #[error("stored session rejected by the target site; login required")]
    SessionExpired,

    /// Session store failure other than absence.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The browser could not be launched or connected to.
    #[error("failed to open browser: {0}")]
    Browser(String),

    /// The candidate board list could not be obtained.
    #[error("board resolution failed: {0}")]
    BoardResolution(String),

    /// A page interaction failed after locator fallbacks were exhausted.
    #[error("publish failed at {stage}: {message}")]
    FormInteraction { stage: PublishStage, message: String },

    /// Page navigation or content load failed.
    #[error("navigation failed at {stage}: {message}")]
    Navigation { stage: PublishStage, message: String },

    /// A bounded wait expired.
    #[error("publish timed out at {stage}: {message}")]
    Timeout { stage: PublishStage, message: String },
}

/// Semantic board-matching capability errors.
///
/// Always recoverable: the resolver logs and falls through to creating
/// the requested board.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("matcher request failed: {0}")]
    Network(String),

    #[error("matcher API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("matcher returned an empty response")]
    EmptyResponse,
}

/// Media staging errors.
///
/// Always recoverable: the engine logs and publishes without an image.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("image not found at {0}")]
    NotFound(String),

    #[error("image download failed: {0}")]
    Download(String),

    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to write resized image: {0}")]
    Encode(String),

    #[error("media I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_stage_display() {
        assert_eq!(PublishStage::VerifyingSession.to_string(), "verifying-session");
        assert_eq!(PublishStage::CreatingBoard.to_string(), "creating-board");
    }

    #[test]
    fn test_login_stage_display() {
        assert_eq!(
            LoginStage::AwaitingRedirectHome.to_string(),
            "awaiting-redirect-home"
        );
    }

    #[test]
    fn test_publish_error_carries_stage() {
        let err = PublishError::FormInteraction {
            stage: PublishStage::FillingFields,
            message: "element not found".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("filling-fields"));
        assert!(display.contains("element not found"));
    }

    #[test]
    fn test_session_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = SessionError::from(io);
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_publish_error_from_session_error() {
        let err: PublishError = SessionError::InvalidUserId("../etc".to_string()).into();
        assert!(err.to_string().contains("not a valid session key"));
    }

    #[test]
    fn test_match_error_display() {
        let err = MatchError::Api {
            status: 429,
            message: "quota exceeded".to_string(),
        };
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("quota exceeded"));
    }
}
