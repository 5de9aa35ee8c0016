use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::EngineError;
use crate::workflows::interview::{EngineConfig, EngineSnapshot};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for a host embedding the engine.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub rules: RulesConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );
        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let path = env::var("INTERVIEW_RULES_PATH").ok().map(PathBuf::from);

        if let Some(path) = &path {
            if !path.is_file() {
                return Err(ConfigError::MissingRulesFile { path: path.clone() });
            }
        }

        Ok(Self {
            environment,
            rules: RulesConfig { path },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

/// Where the evaluation rubric comes from.
#[derive(Debug, Clone)]
pub struct RulesConfig {
    /// Rules file in JSON form; absent means the built-in standard rubric.
    pub path: Option<PathBuf>,
}

impl RulesConfig {
    pub fn snapshot(&self) -> Result<EngineSnapshot, EngineError> {
        match &self.path {
            Some(path) => load_snapshot_from_path(path),
            None => EngineSnapshot::load(EngineConfig::standard()).map_err(EngineError::from),
        }
    }
}

/// Read, parse, and compile a rules file. Any failure blocks startup.
pub fn load_snapshot_from_path(path: &Path) -> Result<EngineSnapshot, EngineError> {
    let raw = fs::read_to_string(path)?;
    let config: EngineConfig = serde_json::from_str(&raw)?;
    let snapshot = EngineSnapshot::load(config)?;
    Ok(snapshot)
}

/// Tracing and log level controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingRulesFile { path: PathBuf },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRulesFile { path } => {
                write!(
                    f,
                    "INTERVIEW_RULES_PATH points to a missing file: {}",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}
