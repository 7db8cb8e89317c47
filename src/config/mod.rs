use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub pipeline: PipelineConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Deepest nested pipeline run allowed (observers re-entering the pipeline)
    pub max_recursion_depth: usize,
    /// Per-observer execution limit
    pub observer_timeout_ms: u64,
    /// Install the structural JSON Schema validator among the built-in observers
    pub enable_schema_validation: bool,
    pub debug_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_audit_logging: bool,
}

impl PipelineConfig {
    pub fn observer_timeout(&self) -> Duration {
        Duration::from_millis(self.observer_timeout_ms)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::development()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        AppConfig::development().pipeline
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Pipeline overrides
        if let Ok(v) = env::var("PIPELINE_MAX_RECURSION_DEPTH") {
            self.pipeline.max_recursion_depth = v.parse().unwrap_or(self.pipeline.max_recursion_depth);
        }
        if let Ok(v) = env::var("PIPELINE_OBSERVER_TIMEOUT_MS") {
            self.pipeline.observer_timeout_ms = v.parse().unwrap_or(self.pipeline.observer_timeout_ms);
        }
        if let Ok(v) = env::var("PIPELINE_ENABLE_SCHEMA_VALIDATION") {
            self.pipeline.enable_schema_validation = v.parse().unwrap_or(self.pipeline.enable_schema_validation);
        }
        if let Ok(v) = env::var("PIPELINE_DEBUG_LOGGING") {
            self.pipeline.debug_logging = v.parse().unwrap_or(self.pipeline.debug_logging);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_AUDIT_LOGGING") {
            self.security.enable_audit_logging = v.parse().unwrap_or(self.security.enable_audit_logging);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            pipeline: PipelineConfig {
                max_recursion_depth: 3,
                observer_timeout_ms: 5_000,
                enable_schema_validation: true,
                debug_logging: true,
            },
            security: SecurityConfig {
                enable_audit_logging: false,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            pipeline: PipelineConfig {
                max_recursion_depth: 3,
                observer_timeout_ms: 5_000,
                enable_schema_validation: true,
                debug_logging: false,
            },
            security: SecurityConfig {
                enable_audit_logging: true,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            pipeline: PipelineConfig {
                max_recursion_depth: 3,
                observer_timeout_ms: 2_000,
                enable_schema_validation: true,
                debug_logging: false,
            },
            security: SecurityConfig {
                enable_audit_logging: true,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

// Helper macro for environment checks
#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.pipeline.max_recursion_depth, 3);
        assert!(config.pipeline.enable_schema_validation);
        assert!(!config.security.enable_audit_logging);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(!config.pipeline.debug_logging);
        assert!(config.security.enable_audit_logging);
        assert_eq!(config.pipeline.observer_timeout(), Duration::from_secs(2));
    }
}
