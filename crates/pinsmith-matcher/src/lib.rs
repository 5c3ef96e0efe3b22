//! Gemini-backed semantic board matching.
//!
//! Implements the [`BoardMatcher`] capability against the Gemini
//! `generateContent` API. The model is asked to pick one board from the
//! candidate list or answer `null`; whatever comes back is still treated
//! as untrusted by the resolver, which only accepts list members.
//!
//! [`BoardMatcher`]: pinsmith_protocols::matcher::BoardMatcher

mod client;
mod matcher;
mod types;

pub use client::GeminiClient;
pub use matcher::GeminiBoardMatcher;
