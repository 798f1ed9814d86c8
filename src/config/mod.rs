//! Process-wide configuration, read once from the environment.

use std::env;

/// Runtime configuration sourced from environment variables (spec §6).
#[derive(Debug, Clone)]
pub struct Config {
    pub subscription_id: Option<String>,
    pub workspace_id: Option<String>,
    pub inventory_strict_mode: bool,
    pub cache_max_entries: usize,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            subscription_id: None,
            workspace_id: None,
            inventory_strict_mode: true,
            cache_max_entries: 500,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Read configuration from the environment, falling back to defaults
    /// for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            subscription_id: env::var("SUBSCRIPTION_ID").ok().filter(|s| !s.is_empty()),
            workspace_id: env::var("LOG_ANALYTICS_WORKSPACE_ID")
                .ok()
                .filter(|s| !s.is_empty()),
            inventory_strict_mode: env::var("INVENTORY_STRICT_MODE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.inventory_strict_mode),
            cache_max_entries: env::var("CACHE_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_max_entries),
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }

    /// Normalize a raw subscription GUID or partial ARM id into
    /// `/subscriptions/{id}`. Accepts an already-normalized scope unchanged.
    pub fn normalize_subscription_scope(raw: &str) -> String {
        if raw.starts_with("/subscriptions/") {
            raw.to_string()
        } else if let Some(rest) = raw.strip_prefix("subscriptions/") {
            format!("/subscriptions/{rest}")
        } else {
            format!("/subscriptions/{raw}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let c = Config::default();
        assert!(c.inventory_strict_mode);
        assert_eq!(c.cache_max_entries, 500);
    }

    #[test]
    fn normalizes_raw_guid() {
        assert_eq!(
            Config::normalize_subscription_scope("abc-123"),
            "/subscriptions/abc-123"
        );
        assert_eq!(
            Config::normalize_subscription_scope("subscriptions/abc-123"),
            "/subscriptions/abc-123"
        );
        assert_eq!(
            Config::normalize_subscription_scope("/subscriptions/abc-123"),
            "/subscriptions/abc-123"
        );
    }
}
