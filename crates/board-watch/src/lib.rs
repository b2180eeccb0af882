//! Live board watcher: rebuilds the position from host-page DOM snapshots,
//! asks a UCI engine for the best move and publishes an arrow overlay.

pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod extract;
pub mod host;
pub mod observe;
pub mod orientation;
pub mod overlay;
pub mod profile;
pub mod session;
pub mod turn;

pub use board_core;
