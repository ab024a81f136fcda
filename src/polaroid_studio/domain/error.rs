use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Unknown filter: {0}")]
    UnknownFilter(String),
}
