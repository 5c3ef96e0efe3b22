//! Chrome automation over the Chrome DevTools Protocol.
//!
//! Drives a headless Chrome the publishing engine launches per
//! invocation:
//!
//! ```text
//! ┌─────────────────┐    WebSocket     ┌──────────────────┐
//! │ pinsmith engine │ ◄──────────────► │ headless Chrome  │
//! │  (this crate)   │       CDP        │ (ephemeral       │
//! └─────────────────┘                  │  profile)        │
//!                                      └──────────────────┘
//! ```
//!
//! [`Launcher`] starts Chrome with a throwaway profile and an ephemeral
//! debugging port; [`CdpClient`] owns the WebSocket and browser-level
//! calls (page creation, cookie capture/restore); [`PageSession`] drives
//! a single page (navigation, selector waits, form fill, clicks, file
//! inputs).
//!
//! The captured cookie set ([`StorageState`]) is the session artifact the
//! rest of the system persists and restores — sensitive bearer material,
//! opaque to everything but this crate.

mod client;
mod error;
mod launcher;
mod page;
mod protocol;

pub use client::CdpClient;
pub use error::CdpError;
pub use launcher::{Browser, LaunchOptions};
pub use page::PageSession;
pub use protocol::{Cookie, StorageState};
