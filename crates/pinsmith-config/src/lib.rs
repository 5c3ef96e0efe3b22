//! Configuration for pinsmith.
//!
//! TOML schema with per-section defaults, a loader with `${ENV_VAR}`
//! expansion, and a validator run once at startup.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{
    BrowserConfig, Config, MatcherConfig, MediaConfig, PinterestConfig, SessionConfig,
};
