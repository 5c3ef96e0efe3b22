//! Pin publishing engine.
//!
//! Orchestrates the full login and pin-creation flows against the target
//! site: restores or establishes an authenticated browser session, fills
//! the composer form, resolves the target board against the boards the
//! user already has (exact match, then AI-semantic match, then create),
//! and submits — with per-stage timeouts, locator fallbacks, and
//! guaranteed browser teardown on every path.

mod board;
mod engine;
mod selectors;

pub use board::BoardResolver;
pub use engine::{EngineConfig, PublishEngine};
