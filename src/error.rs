use std::fmt;

use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::interview::{ConfigurationError, EvaluationError};

/// Crate-level error for hosts embedding the engine.
#[derive(Debug)]
pub enum EngineError {
    Settings(ConfigError),
    Telemetry(TelemetryError),
    Configuration(ConfigurationError),
    Evaluation(EvaluationError),
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Settings(err) => write!(f, "settings error: {}", err),
            EngineError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            EngineError::Configuration(err) => write!(f, "configuration error: {}", err),
            EngineError::Evaluation(err) => write!(f, "evaluation error: {}", err),
            EngineError::Io(err) => write!(f, "io error: {}", err),
            EngineError::Json(err) => write!(f, "json error: {}", err),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Settings(err) => Some(err),
            EngineError::Telemetry(err) => Some(err),
            EngineError::Configuration(err) => Some(err),
            EngineError::Evaluation(err) => Some(err),
            EngineError::Io(err) => Some(err),
            EngineError::Json(err) => Some(err),
        }
    }
}

impl From<ConfigError> for EngineError {
    fn from(value: ConfigError) -> Self {
        Self::Settings(value)
    }
}

impl From<TelemetryError> for EngineError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<ConfigurationError> for EngineError {
    fn from(value: ConfigurationError) -> Self {
        Self::Configuration(value)
    }
}

impl From<EvaluationError> for EngineError {
    fn from(value: EvaluationError) -> Self {
        Self::Evaluation(value)
    }
}

impl From<std::io::Error> for EngineError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}
