use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipeforgeError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{operation} failed: {message}")]
    ExternalOperation { operation: String, message: String },

    #[error("Polling failed: {0}")]
    Poll(String),

    #[error("Artifacts not found: {0}")]
    ArtifactNotFound(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipeforgeError {
    pub fn external(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalOperation {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipeforgeError>;
