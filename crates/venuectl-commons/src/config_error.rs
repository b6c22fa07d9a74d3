use std::fmt;
use std::io;

#[derive(Debug)]
pub enum ConfigError {
    Read { path: String, source: io::Error },
    InvalidJson { path: String, source: serde_json::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read config file '{path}': {source}")
            }
            ConfigError::InvalidJson { path, source } => {
                write!(f, "invalid JSON in config file '{path}': {source}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::InvalidJson { source, .. } => Some(source),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
