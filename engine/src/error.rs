use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Unknown similarity name or an invalid model parameter.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Operation not allowed in the current build/serve phase.
    #[error("index state error: {0}")]
    IndexState(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<bincode::Error> for EngineError {
    fn from(e: bincode::Error) -> Self {
        EngineError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
