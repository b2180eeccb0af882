//! Line-delimited JSON bridge to the page-side shim.
//!
//! Inbound lines are [`HostEvent`]s (snapshots and panel commands); outbound
//! lines are [`UiEvent`]s for the panel and the overlay.

use std::io::Write;

use serde::{Deserialize, Serialize};
use shakmaty::Color;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::dom::ElementSpec;
use crate::engine::BestMove;
use crate::error::WatchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "w", alias = "white")]
    White,
    #[serde(rename = "b", alias = "black")]
    Black,
}

impl From<Side> for Color {
    fn from(side: Side) -> Self {
        match side {
            Side::White => Color::White,
            Side::Black => Color::Black,
        }
    }
}

impl From<Color> for Side {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Side::White,
            Color::Black => Side::Black,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    /// Full page snapshot rooted at `root`.
    Snapshot { root: ElementSpec },
    ToggleAuto,
    FlipSide,
    /// "Analyze now for color C".
    Analyze { color: Side },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiEvent {
    Status {
        text: String,
    },
    BestMove {
        #[serde(rename = "move")]
        mv: Option<String>,
        score: Option<String>,
    },
    TurnBadge {
        color: Option<Side>,
    },
    Overlay {
        svg: Option<String>,
    },
    /// Reply to [`HostEvent::Analyze`].
    Analysis {
        #[serde(rename = "move", skip_serializing_if = "Option::is_none")]
        mv: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        score: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

/// UI command surface. Implementors only need [`UiSink::emit`].
pub trait UiSink {
    fn emit(&mut self, event: UiEvent);

    fn on_status(&mut self, text: &str) {
        self.emit(UiEvent::Status {
            text: text.to_string(),
        });
    }

    fn on_best_move(&mut self, best: Option<&BestMove>) {
        self.emit(UiEvent::BestMove {
            mv: best.map(|b| b.mv.to_string()),
            score: best.and_then(|b| b.score).map(|s| s.to_string()),
        });
    }

    fn on_turn_badge(&mut self, color: Option<Color>) {
        self.emit(UiEvent::TurnBadge {
            color: color.map(Side::from),
        });
    }

    fn on_overlay(&mut self, svg: Option<String>) {
        self.emit(UiEvent::Overlay { svg });
    }

    fn on_analysis(&mut self, reply: &Result<BestMove, WatchError>) {
        self.emit(match reply {
            Ok(best) => UiEvent::Analysis {
                mv: Some(best.mv.to_string()),
                score: best.score.map(|s| s.to_string()),
                error: None,
            },
            Err(e) => UiEvent::Analysis {
                mv: None,
                score: None,
                error: Some(e.to_string()),
            },
        });
    }
}

impl UiSink for Vec<UiEvent> {
    fn emit(&mut self, event: UiEvent) {
        self.push(event);
    }
}

/// Writes each event as one JSON line.
pub struct JsonLinesUi<W> {
    out: W,
}

impl<W: Write> JsonLinesUi<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> UiSink for JsonLinesUi<W> {
    fn emit(&mut self, event: UiEvent) {
        let written = serde_json::to_writer(&mut self.out, &event)
            .map_err(WatchError::from)
            .and_then(|()| {
                self.out.write_all(b"\n")?;
                self.out.flush()?;
                Ok(())
            });
        if let Err(e) = written {
            warn!(error = %e, "Failed to write UI event");
        }
    }
}

/// Forward parsed host events until the input ends. Malformed lines,
/// including ones that are not UTF-8, are logged and skipped.
pub async fn read_events<R>(mut input: R, events: mpsc::UnboundedSender<HostEvent>) -> Result<(), WatchError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let Ok(line) = std::str::from_utf8(&buf) else {
            warn!(len = buf.len(), "Skipping non-UTF-8 host event");
            continue;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<HostEvent>(line) {
            Ok(event) => {
                if events.send(event).is_err() {
                    break;
                }
            }
            Err(e) => warn!(error = %e, "Skipping malformed host event"),
        }
    }
    debug!("Host input closed");
    Ok(())
}
