use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid engine state: expected {expected}, found {actual}")]
    InvalidState { expected: String, actual: String },

    #[error("Transient operation failure: {0}")]
    Transient(String),
}

pub type Result<T> = std::result::Result<T, SimError>;
