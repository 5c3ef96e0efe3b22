//! Shared protocol types for pinsmith.
//!
//! Defines the data model (pin requests, credentials, board match
//! decisions, session status), the error taxonomy, and the traits that
//! decouple the publishing engine from its collaborators: the session
//! store and the semantic board-matching capability.

pub mod error;
pub mod matcher;
pub mod session;
pub mod types;

pub use error::{
    LoginError, LoginStage, MatchError, MediaError, PublishError, PublishStage, SessionError,
};
pub use matcher::{BoardMatcher, NoSemanticMatch};
pub use session::SessionStore;
pub use types::{Credentials, MatchDecision, PinRequest, SessionStatus};
