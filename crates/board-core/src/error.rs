use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid square: {0:?}")]
    InvalidSquare(String),

    #[error("Invalid move token: {0:?}")]
    InvalidMove(String),
}
