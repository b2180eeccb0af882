//! Board model shared by the watcher: squares, the 8×8 grid, the position
//! string sent to the engine, and engine move tokens.

pub mod board;
pub mod error;
pub mod square;
pub mod uci;

pub use board::{Board, Position};
pub use error::CoreError;
pub use shakmaty::{Color, Piece, Role};
pub use square::Square;
pub use uci::Move;
