use std::env;

const DEFAULT_LEAK_LANG: &str = "ru";
const DEFAULT_LEAK_LIMIT: u32 = 300;
const LEAK_LIMIT_RANGE: std::ops::RangeInclusive<u32> = 100..=10_000;
const DEFAULT_TESSERACT: &str = "tesseract";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("SLEUTH_LEAK_LIMIT must be an integer between 100 and 10000, got '{0}'")]
    InvalidLeakLimit(String),
}

/// Settings for the leak-search source. Built once, never mutated.
#[derive(Clone)]
pub struct LeakConfig {
    pub token: Option<String>,
    pub lang: String,
    pub limit: u32,
}

impl std::fmt::Debug for LeakConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeakConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("lang", &self.lang)
            .field("limit", &self.limit)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub leak: LeakConfig,
    /// OCR engine executable.
    pub tesseract: String,
}

impl Config {
    /// Configuration via environment variables:
    /// - `SLEUTH_LEAK_TOKEN`: leak-search API token (optional; the source reports itself unconfigured without it)
    /// - `SLEUTH_LEAK_LANG`: result language (default `ru`)
    /// - `SLEUTH_LEAK_LIMIT`: max records per search (default 300)
    /// - `SLEUTH_TESSERACT`: path to the tesseract binary (default `tesseract` on `PATH`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let limit = match var("SLEUTH_LEAK_LIMIT") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| LEAK_LIMIT_RANGE.contains(n))
                .ok_or(ConfigError::InvalidLeakLimit(raw))?,
            None => DEFAULT_LEAK_LIMIT,
        };

        Ok(Self {
            leak: LeakConfig {
                token: var("SLEUTH_LEAK_TOKEN"),
                lang: var("SLEUTH_LEAK_LANG").unwrap_or_else(|| DEFAULT_LEAK_LANG.to_string()),
                limit,
            },
            tesseract: var("SLEUTH_TESSERACT").unwrap_or_else(|| DEFAULT_TESSERACT.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.leak.token, None);
        assert_eq!(config.leak.lang, "ru");
        assert_eq!(config.leak.limit, 300);
        assert_eq!(config.tesseract, "tesseract");
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = config_from(&[("SLEUTH_LEAK_TOKEN", "  "), ("SLEUTH_LEAK_LANG", "")]).unwrap();
        assert_eq!(config.leak.token, None);
        assert_eq!(config.leak.lang, "ru");
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("SLEUTH_LEAK_TOKEN", " abc "),
            ("SLEUTH_LEAK_LANG", "en"),
            ("SLEUTH_LEAK_LIMIT", "1000"),
            ("SLEUTH_TESSERACT", "/usr/local/bin/tesseract"),
        ])
        .unwrap();
        assert_eq!(config.leak.token.as_deref(), Some("abc"));
        assert_eq!(config.leak.lang, "en");
        assert_eq!(config.leak.limit, 1000);
        assert_eq!(config.tesseract, "/usr/local/bin/tesseract");
    }

    #[test]
    fn rejects_out_of_range_limit() {
        for raw in ["50", "20000", "lots"] {
            let err = config_from(&[("SLEUTH_LEAK_LIMIT", raw)]).unwrap_err();
            assert!(err.to_string().contains(raw));
        }
    }

    #[test]
    fn debug_redacts_token() {
        let config = config_from(&[("SLEUTH_LEAK_TOKEN", "hunter2")]).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("REDACTED"));
    }
}
