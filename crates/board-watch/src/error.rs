//! Watcher error types

use shakmaty::Color;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Board not found")]
    BoardNotFound,

    #[error("Waiting for opponent ({} to move)", side(.0))]
    NotOnMove(Color),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Analysis superseded")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures of a single engine session. Each one ends that analysis only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Analysis timed out")]
    Timeout,

    #[error("Failed to spawn engine: {0}")]
    Spawn(String),

    #[error("Engine I/O error: {0}")]
    Io(String),

    #[error("Engine closed its output")]
    Closed,

    #[error("Engine reported no move")]
    NoMove,

    #[error("Engine returned an invalid move: {0}")]
    BadMove(String),
}

pub fn color_name(color: Color) -> &'static str {
    match color {
        Color::White => "White",
        Color::Black => "Black",
    }
}

fn side(color: &Color) -> &'static str {
    color_name(*color)
}
