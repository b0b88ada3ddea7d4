use thiserror::Error;

#[derive(Error, Debug)]
pub enum TournamentError {
    #[error("{0}")]
    State(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl TournamentError {
    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }

    pub fn not_found(label: impl Into<String>) -> Self {
        Self::NotFound(label.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::State(_) => "state_error",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation_error",
            Self::Conflict(_) => "conflict",
            Self::Io(_) => "io_error",
            Self::Serde(_) => "serialization_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, TournamentError>;
