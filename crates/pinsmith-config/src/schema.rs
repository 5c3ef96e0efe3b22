//! Configuration schema.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pinterest: PinterestConfig,
    pub browser: BrowserConfig,
    pub session: SessionConfig,
    pub media: MediaConfig,
    pub matcher: MatcherConfig,
}

/// Target-site endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PinterestConfig {
    /// Site origin, without a trailing slash.
    pub base_url: String,
    pub login_path: String,
    pub composer_path: String,
}

impl Default for PinterestConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.pinterest.com".to_string(),
            login_path: "/login/".to_string(),
            composer_path: "/pin-builder/".to_string(),
        }
    }
}

impl PinterestConfig {
    pub fn home_url(&self) -> String {
        format!("{}/", self.base_url.trim_end_matches('/'))
    }

    pub fn login_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.login_path)
    }

    pub fn composer_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.composer_path)
    }
}

/// Browser launch and wait-policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Explicit Chrome/Chromium executable. Well-known platform paths are
    /// probed when unset.
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    /// Bound on page navigation and content load.
    pub navigation_timeout_secs: u64,
    /// Bound on form-field waits and the default locator fallback.
    pub selector_timeout_secs: u64,
    /// Short per-locator probe used when trying alternative locators.
    pub probe_timeout_millis: u64,
    /// Settle pause after navigation-heavy steps.
    pub settle_millis: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            navigation_timeout_secs: 60,
            selector_timeout_secs: 30,
            probe_timeout_millis: 2000,
            settle_millis: 3000,
        }
    }
}

impl BrowserConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn selector_timeout(&self) -> Duration {
        Duration::from_secs(self.selector_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_millis)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_millis)
    }
}

/// Session artifact storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Artifact directory. Tilde-expanded.
    pub dir: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dir: "~/.pinsmith/sessions".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn resolved_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.dir).to_string())
    }
}

/// Media staging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Minimum acceptable image width; narrower downloads are resized up
    /// to exactly this width.
    pub min_width: u32,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self { min_width: 1000 }
    }
}

/// Semantic board-matcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Gemini API key. Semantic matching is disabled when unset.
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_urls() {
        let config = Config::default();
        assert_eq!(config.pinterest.home_url(), "https://www.pinterest.com/");
        assert_eq!(
            config.pinterest.login_url(),
            "https://www.pinterest.com/login/"
        );
        assert_eq!(
            config.pinterest.composer_url(),
            "https://www.pinterest.com/pin-builder/"
        );
    }

    #[test]
    fn test_trailing_slash_base_url() {
        let pinterest = PinterestConfig {
            base_url: "https://www.pinterest.com/".to_string(),
            ..Default::default()
        };
        assert_eq!(pinterest.login_url(), "https://www.pinterest.com/login/");
    }

    #[test]
    fn test_default_browser_durations() {
        let browser = BrowserConfig::default();
        assert_eq!(browser.navigation_timeout(), Duration::from_secs(60));
        assert_eq!(browser.selector_timeout(), Duration::from_secs(30));
        assert_eq!(browser.probe_timeout(), Duration::from_millis(2000));
        assert_eq!(browser.settle(), Duration::from_millis(3000));
        assert!(browser.headless);
    }

    #[test]
    fn test_default_media_min_width() {
        assert_eq!(MediaConfig::default().min_width, 1000);
    }

    #[test]
    fn test_session_dir_tilde_expansion() {
        let session = SessionConfig::default();
        let dir = session.resolved_dir();
        assert!(!dir.to_string_lossy().starts_with('~'));
        assert!(dir.to_string_lossy().ends_with(".pinsmith/sessions"));
    }

    #[test]
    fn test_matcher_disabled_by_default() {
        assert!(MatcherConfig::default().api_key.is_none());
    }
}
