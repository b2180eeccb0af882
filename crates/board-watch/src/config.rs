//! Watcher configuration from environment variables

use std::env;
use std::time::Duration;

use shakmaty::Color;
use tracing::info;

use crate::error::WatchError;

#[derive(Clone, Debug)]
pub struct WatchConfig {
    /// Path to the UCI engine binary
    pub stockfish_path: String,

    /// Search depth passed to `go depth`
    pub search_depth: u32,

    /// Deadline for one analysis, from session start to `bestmove`
    pub engine_timeout: Duration,

    /// Quiet period after the last board mutation before analysing
    pub debounce: Duration,

    /// Color the user plays; also the side to move in extracted positions
    pub tracked_color: Color,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            stockfish_path: "/usr/local/bin/stockfish".to_string(),
            search_depth: 15,
            engine_timeout: Duration::from_millis(10_000),
            debounce: Duration::from_millis(500),
            tracked_color: Color::White,
        }
    }
}

impl WatchConfig {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self, WatchError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup. Unparseable numbers fall back
    /// to defaults; an unknown tracked color is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, WatchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let stockfish_path = lookup("STOCKFISH_PATH").unwrap_or(defaults.stockfish_path);

        let search_depth = lookup("SEARCH_DEPTH")
            .and_then(|v| v.parse().ok())
            .filter(|d: &u32| *d > 0)
            .unwrap_or(defaults.search_depth);

        let engine_timeout = lookup("ENGINE_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .filter(|ms: &u64| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.engine_timeout);

        let debounce = lookup("DEBOUNCE_MS")
            .and_then(|v| v.parse().ok())
            .filter(|ms: &u64| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.debounce);

        let tracked_color = match lookup("TRACKED_COLOR") {
            None => defaults.tracked_color,
            Some(v) => parse_color(&v)
                .ok_or_else(|| WatchError::Config(format!("TRACKED_COLOR must be w or b, got {v:?}")))?,
        };

        info!(
            stockfish_path = %stockfish_path,
            search_depth,
            timeout_ms = engine_timeout.as_millis() as u64,
            debounce_ms = debounce.as_millis() as u64,
            "Config loaded"
        );

        Ok(Self {
            stockfish_path,
            search_depth,
            engine_timeout,
            debounce,
            tracked_color,
        })
    }
}

fn parse_color(value: &str) -> Option<Color> {
    match value.trim().to_ascii_lowercase().as_str() {
        "w" | "white" => Some(Color::White),
        "b" | "black" => Some(Color::Black),
        _ => None,
    }
}
