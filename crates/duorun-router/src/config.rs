//! Router configuration.

use std::path::PathBuf;
use std::time::Duration;

use duorun_core::CoreError;

/// Router configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RouterConfig {
    /// Path to the JSON capability catalog.
    pub catalog_path: Option<PathBuf>,

    /// Default timeout for the primary stage.
    pub primary_timeout: Duration,

    /// Default timeout for the secondary stage.
    pub secondary_timeout: Duration,

    /// Weight of current load in selection scores (0 disables).
    pub load_penalty: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            primary_timeout: Duration::from_secs(120),
            secondary_timeout: Duration::from_secs(120),
            load_penalty: 0.0,
        }
    }
}

impl RouterConfig {
    /// Defaults overlaid with `DUORUN_*` environment variables.
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let mut config = Self::default();

        if let Some(path) = lookup("DUORUN_CATALOG") {
            config.catalog_path = Some(PathBuf::from(path));
        }
        if let Some(secs) = lookup("DUORUN_PRIMARY_TIMEOUT_SECS") {
            config.primary_timeout = parse_secs("DUORUN_PRIMARY_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = lookup("DUORUN_SECONDARY_TIMEOUT_SECS") {
            config.secondary_timeout = parse_secs("DUORUN_SECONDARY_TIMEOUT_SECS", &secs)?;
        }
        if let Some(penalty) = lookup("DUORUN_LOAD_PENALTY") {
            config.load_penalty = penalty
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|p| p.is_finite() && *p >= 0.0)
                .ok_or_else(|| {
                    CoreError::InvalidInput(format!(
                        "DUORUN_LOAD_PENALTY must be a non-negative number, got '{penalty}'"
                    ))
                })?;
        }

        Ok(config)
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration, CoreError> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .ok_or_else(|| {
            CoreError::InvalidInput(format!(
                "{key} must be a positive number of seconds, got '{value}'"
            ))
        })
}
