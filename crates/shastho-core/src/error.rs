use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShasthoError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Live session error: {0}")]
    Live(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Triage error: {0}")]
    Triage(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ShasthoError>;
