//! Configuration validation.

use url::Url;

use crate::error::ConfigError;
use crate::schema::Config;

/// Validate a parsed configuration.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let base = Url::parse(&config.pinterest.base_url).map_err(|e| ConfigError::InvalidValue {
        field: "pinterest.base_url".to_string(),
        message: e.to_string(),
    })?;
    if !matches!(base.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue {
            field: "pinterest.base_url".to_string(),
            message: format!("unsupported scheme {:?}", base.scheme()),
        });
    }

    if config.media.min_width == 0 {
        return Err(ConfigError::InvalidValue {
            field: "media.min_width".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }

    if config.browser.navigation_timeout_secs == 0 || config.browser.selector_timeout_secs == 0 {
        return Err(ConfigError::InvalidValue {
            field: "browser".to_string(),
            message: "timeouts must be greater than zero".to_string(),
        });
    }

    if config.matcher.model.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "matcher.model".to_string(),
            message: "must not be empty".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let mut config = Config::default();
        config.pinterest.base_url = "not a url".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let mut config = Config::default();
        config.pinterest.base_url = "file:///etc".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_zero_min_width() {
        let mut config = Config::default();
        config.media.min_width = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_zero_timeouts() {
        let mut config = Config::default();
        config.browser.selector_timeout_secs = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_empty_model() {
        let mut config = Config::default();
        config.matcher.model = " ".to_string();
        assert!(validate(&config).is_err());
    }
}
