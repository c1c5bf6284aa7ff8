use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use tracing::Level;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// "trace" | "debug" | "info" | "warn" | "error"
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ObservabilityConfig {
    pub fn level(&self) -> Result<Level, ConfigError> {
        self.log_level.trim().parse::<Level>().map_err(|_| {
            ConfigError::Validation(format!("unknown log level: {}", self.log_level))
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.level().map(|_| ())
    }
}
