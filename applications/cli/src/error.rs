/// CLI error types
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Audio file error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Unsupported audio file: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Core(#[from] lumen_core::CoreError),
}
