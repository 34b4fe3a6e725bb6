use thiserror::Error;

/// Errors raised by the shared core helpers.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Path is not absolute: {0}")]
    NotAbsolute(String),

    #[error("Invalid node name: {0:?}")]
    InvalidName(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
