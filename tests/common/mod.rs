#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use board_watch::dom::ElementSpec;
use board_watch::engine::{EngineSession, EngineSpawner};
use board_watch::error::EngineError;
use tokio::io::{duplex, split, AsyncBufReadExt, AsyncWriteExt, BufReader};

pub const BOARD_PX: f64 = 400.0;

/// One piece node in chess.com markup: `piece wp square-52`.
pub fn piece(code: &str, square: &str) -> ElementSpec {
    let bytes = square.as_bytes();
    let file = bytes[0] - b'a' + 1;
    let rank = bytes[1] - b'0';
    ElementSpec::new("div").with_classes(&format!("piece {code} square-{file}{rank}"))
}

/// Starting position as `(code, square)` pairs.
pub fn start_pieces() -> Vec<(String, String)> {
    let mut out = Vec::new();
    for (i, role) in "rnbqkbnr".chars().enumerate() {
        let file = (b'a' + i as u8) as char;
        out.push((format!("w{role}"), format!("{file}1")));
        out.push(("wp".to_string(), format!("{file}2")));
        out.push(("bp".to_string(), format!("{file}7")));
        out.push((format!("b{role}"), format!("{file}8")));
    }
    out
}

/// Board root with a 400×400 layout box at the page origin.
pub fn board(pieces: &[(String, String)], classes: &str) -> ElementSpec {
    ElementSpec::new("chess-board")
        .with_id("board-single")
        .with_classes(classes)
        .with_rect(0.0, 0.0, BOARD_PX, BOARD_PX)
        .with_children(pieces.iter().map(|(code, sq)| piece(code, sq)))
}

/// Player panel with a clock; `running` marks the clock active.
pub fn player(color: &str, running: bool) -> ElementSpec {
    let clock = if running {
        "clock-component clock-player-turn"
    } else {
        "clock-component"
    };
    ElementSpec::new("div")
        .with_classes(&format!("player-component {color}"))
        .with_child(ElementSpec::new("div").with_classes(clock))
}

pub fn page(board: ElementSpec, players: Vec<ElementSpec>) -> ElementSpec {
    ElementSpec::new("body").with_child(board).with_children(players)
}

/// Move the piece on `from` to `to` in a `(code, square)` list.
pub fn play(pieces: &[(String, String)], from: &str, to: &str) -> Vec<(String, String)> {
    pieces
        .iter()
        .filter(|(_, sq)| sq != to)
        .map(|(code, sq)| {
            if sq == from {
                (code.clone(), to.to_string())
            } else {
                (code.clone(), sq.clone())
            }
        })
        .collect()
}

/// How the fake engine answers one session.
#[derive(Clone, Debug)]
pub struct Script {
    pub delay: Duration,
    /// `None` never answers `go`.
    pub best: Option<&'static str>,
}

impl Script {
    pub fn answer(best: &'static str, delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            best: Some(best),
        }
    }

    pub fn silent() -> Self {
        Self {
            delay: Duration::ZERO,
            best: None,
        }
    }
}

/// In-process UCI engine that plays back one [`Script`] per session.
pub struct ScriptedEngine {
    scripts: Mutex<VecDeque<Script>>,
    pub spawns: Arc<AtomicUsize>,
    pub releases: Arc<AtomicUsize>,
}

impl ScriptedEngine {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            spawns: Arc::new(AtomicUsize::new(0)),
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl EngineSpawner for ScriptedEngine {
    fn spawn(&self) -> Result<EngineSession, EngineError> {
        self.spawns.fetch_add(1, Ordering::SeqCst);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Script::answer("e2e4", 0));

        let (client, server) = duplex(4096);
        let (reader, writer) = split(client);
        let (engine_in, mut engine_out) = split(server);

        tokio::spawn(async move {
            let mut lines = BufReader::new(engine_in).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line == "uci" {
                    let _ = engine_out.write_all(b"uciok\n").await;
                } else if line.starts_with("go") {
                    let Some(best) = script.best else { continue };
                    tokio::time::sleep(script.delay).await;
                    let reply = format!("info depth 15 score cp 20 pv {best}\nbestmove {best}\n");
                    let _ = engine_out.write_all(reply.as_bytes()).await;
                }
            }
        });

        let releases = Arc::clone(&self.releases);
        Ok(EngineSession::new(writer, BufReader::new(reader), move || {
            releases.fetch_add(1, Ordering::SeqCst);
        }))
    }
}
