use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConductorError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConductorConfig {
    pub concurrency: ConcurrencyConfig,
    pub stats: StatsConfig,
    pub collection: CollectionConfig,
    pub notification: NotificationConfig,
}

impl ConductorConfig {
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join("conductor.toml");
        let config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        self.validate()?;
        let content =
            toml::to_string_pretty(self).map_err(|e| ConductorError::Config(e.to_string()))?;
        std::fs::write(dir.join("conductor.toml"), content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.stats.web_search_cost_per_call < 0.0 {
            return Err(ConductorError::Config(
                "stats.web_search_cost_per_call must be >= 0".to_string(),
            ));
        }
        if self.collection.group_name_max_len == 0 {
            return Err(ConductorError::Config(
                "collection.group_name_max_len must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Limits for backend-bound work. `max_concurrent_requests` is the global
/// per-user ceiling; each mission gets half of it (minimum 3). A value of 0
/// or below means "unconfigured" and falls back to 10 per mission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    pub max_concurrent_requests: i64,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Flat cost attributed to one web search call.
    pub web_search_cost_per_call: f64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            web_search_cost_per_call: 0.005,
        }
    }
}

/// Naming rules for auto-created document collections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    pub group_name_prefix: String,
    pub group_name_max_len: usize,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            group_name_prefix: "R: ".to_string(),
            group_name_max_len: 45,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConductorConfig::default();
        assert_eq!(config.concurrency.max_concurrent_requests, 10);
        assert!(config.notification.enabled);
        assert_eq!(config.collection.group_name_prefix, "R: ");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ConductorConfig::default();
        config.concurrency.max_concurrent_requests = 4;
        config.save(dir.path()).unwrap();

        let loaded = ConductorConfig::load(dir.path()).unwrap();
        assert_eq!(loaded.concurrency.max_concurrent_requests, 4);
    }

    #[test]
    fn test_invalid_cost_rejected() {
        let mut config = ConductorConfig::default();
        config.stats.web_search_cost_per_call = -1.0;
        assert!(config.validate().is_err());
    }
}
