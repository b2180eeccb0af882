//! Session state and the controller that sequences one analysis cycle.
//!
//! The controller runs a single cooperative loop over host events, debounce
//! triggers and engine completions. Only the engine call leaves the loop; its
//! result is applied only if no newer cycle has started meanwhile.

use std::sync::Arc;

use shakmaty::Color;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::WatchConfig;
use crate::dom::Document;
use crate::engine::{BestMove, EngineClient, EngineSpawner};
use crate::error::{color_name, EngineError, WatchError};
use crate::extract;
use crate::host::{HostEvent, UiSink};
use crate::observe::{MutationHub, ObservationLoop};
use crate::overlay::{self, OverlayLayer};
use crate::profile::HostProfile;
use crate::turn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub tracked_color: Color,
    pub auto_analysis: bool,
    /// Sequence number of the most recently started cycle.
    pub active_seq: u64,
}

impl Session {
    pub fn new(tracked_color: Color) -> Self {
        Self {
            tracked_color,
            auto_analysis: false,
            active_seq: 0,
        }
    }

    /// Start a new cycle, superseding any earlier one.
    fn next_seq(&mut self) -> u64 {
        self.active_seq += 1;
        self.active_seq
    }
}

struct Completion {
    seq: u64,
    result: Result<BestMove, EngineError>,
    reply: bool,
}

pub struct SessionController<S, U> {
    session: Session,
    config: WatchConfig,
    profile: HostProfile,
    engine: Arc<EngineClient<S>>,
    ui: U,
    document: Option<Document>,
    mutations: MutationHub,
    observer: ObservationLoop,
    overlay: OverlayLayer,
    triggers_tx: mpsc::UnboundedSender<()>,
    triggers_rx: mpsc::UnboundedReceiver<()>,
    done_tx: mpsc::UnboundedSender<Completion>,
    done_rx: mpsc::UnboundedReceiver<Completion>,
    in_flight: usize,
}

impl<S: EngineSpawner, U: UiSink> SessionController<S, U> {
    pub fn new(config: WatchConfig, profile: HostProfile, spawner: S, ui: U) -> Self {
        let (triggers_tx, triggers_rx) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        Self {
            session: Session::new(config.tracked_color),
            observer: ObservationLoop::new(config.debounce),
            config,
            profile,
            engine: Arc::new(EngineClient::new(spawner)),
            ui,
            document: None,
            mutations: MutationHub::default(),
            overlay: OverlayLayer::default(),
            triggers_tx,
            triggers_rx,
            done_tx,
            done_rx,
            in_flight: 0,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn overlay(&self) -> &OverlayLayer {
        &self.overlay
    }

    pub fn is_observing(&self) -> bool {
        self.observer.is_observing()
    }

    pub fn into_ui(self) -> U {
        self.ui
    }

    /// Drive the session until host input closes and in-flight analyses
    /// have settled, then tear down.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<HostEvent>) -> Self {
        self.ui.on_status("Ready");
        let mut input_open = true;

        loop {
            if !input_open && self.in_flight == 0 {
                break;
            }
            tokio::select! {
                event = events.recv(), if input_open => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        info!(in_flight = self.in_flight, "Host page gone");
                        input_open = false;
                        self.observer.stop();
                    }
                },
                Some(()) = self.triggers_rx.recv() => {
                    if self.session.auto_analysis {
                        self.start_cycle(false);
                    }
                }
                Some(done) = self.done_rx.recv() => self.apply(done),
            }
        }

        self.teardown();
        self
    }

    pub fn handle_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::Snapshot { root } => self.replace_document(Document::from_tree(root)),
            HostEvent::ToggleAuto => self.toggle_auto(),
            HostEvent::FlipSide => {
                self.session.tracked_color = !self.session.tracked_color;
                let text = format!("Playing as: {}", color_name(self.session.tracked_color));
                self.ui.on_status(&text);
                if self.session.auto_analysis {
                    self.start_cycle(false);
                }
            }
            HostEvent::Analyze { color } => {
                self.session.tracked_color = color.into();
                self.start_cycle(true);
            }
        }
    }

    /// Swap in a new snapshot; board-subtree changes notify observers.
    fn replace_document(&mut self, doc: Document) {
        let changed = match &self.document {
            None => true,
            Some(prev) => {
                match (self.profile.find_board(prev), self.profile.find_board(&doc)) {
                    (Some(a), Some(b)) => !prev.subtree_eq(a, &doc, b),
                    (None, None) => false,
                    _ => true,
                }
            }
        };
        self.document = Some(doc);
        if changed {
            let subscribers = self.mutations.notify();
            debug!(subscribers, "Board mutated");
        }
    }

    fn toggle_auto(&mut self) {
        self.session.auto_analysis = !self.session.auto_analysis;
        if self.session.auto_analysis {
            info!("Auto analysis on");
            let subscription = self.mutations.subscribe();
            self.observer.start(subscription, self.triggers_tx.clone());
            self.ui.on_status("Auto analysis on");
            self.start_cycle(false);
        } else {
            info!("Auto analysis off");
            self.observer.stop();
            // A trigger may already be queued from before the stop.
            while self.triggers_rx.try_recv().is_ok() {}
            // Whatever is in flight no longer belongs to a live cycle.
            self.session.next_seq();
            self.clear_overlay();
            self.ui.on_status("Auto analysis off");
        }
    }

    /// Extract, gate on turn, and dispatch the engine. Everything before the
    /// engine call is synchronous.
    fn start_cycle(&mut self, reply: bool) {
        let seq = self.session.next_seq();
        let tracked = self.session.tracked_color;
        self.ui.on_status("Extracting board...");

        let Some(doc) = self.document.as_ref() else {
            self.fail_early(WatchError::BoardNotFound, reply);
            return;
        };
        let extraction = match extract::extract(doc, &self.profile, tracked) {
            Ok(extraction) => extraction,
            Err(e) => {
                self.fail_early(e, reply);
                return;
            }
        };

        let on_move = turn::detect(doc, &self.profile);
        self.ui.on_turn_badge(on_move);
        if let Some(color) = on_move.filter(|c| *c != tracked) {
            debug!(seq, to_move = color_name(color), "Not our turn");
            self.clear_overlay();
            self.ui.on_best_move(None);
            self.ui.on_status("Waiting for opponent");
            if reply {
                self.ui.on_analysis(&Err(WatchError::NotOnMove(color)));
            }
            return;
        }

        let fen = extraction.fen();
        info!(seq, fen = %fen, skipped = extraction.skipped, "Analysing");
        self.ui.on_status("Calculating...");

        let engine = Arc::clone(&self.engine);
        let done = self.done_tx.clone();
        let depth = self.config.search_depth;
        let deadline = self.config.engine_timeout;
        self.in_flight += 1;
        tokio::spawn(async move {
            let result = engine.analyze(&fen, depth, deadline).await;
            let _ = done.send(Completion { seq, result, reply });
        });
    }

    fn fail_early(&mut self, error: WatchError, reply: bool) {
        warn!(error = %error, "Analysis not started");
        self.ui.on_status(&error.to_string());
        if reply {
            self.ui.on_analysis(&Err(error));
        }
    }

    /// Apply an engine result if it belongs to the latest cycle.
    fn apply(&mut self, done: Completion) {
        self.in_flight -= 1;
        if done.seq != self.session.active_seq {
            debug!(seq = done.seq, active = self.session.active_seq, "Discarding superseded analysis");
            if done.reply {
                self.ui.on_analysis(&Err(WatchError::Cancelled));
            }
            return;
        }

        match done.result {
            Ok(best) => {
                info!(seq = done.seq, best_move = %best.mv, "Best move");
                self.ui.on_best_move(Some(&best));
                self.draw(&best);
                self.ui.on_status("Complete");
                if done.reply {
                    self.ui.on_analysis(&Ok(best));
                }
            }
            Err(e) => {
                self.clear_overlay();
                self.ui.on_best_move(None);
                self.ui.on_status(&format!("Error: {e}"));
                if done.reply {
                    self.ui.on_analysis(&Err(e.into()));
                }
            }
        }
    }

    /// Draw against the current snapshot, not the one the cycle started with.
    fn draw(&mut self, best: &BestMove) {
        let drawn = self.document.as_ref().and_then(|doc| {
            let board = self.profile.find_board(doc)?;
            overlay::render(&mut self.overlay, &best.mv, doc, board, &self.profile).then_some(())
        });
        match drawn {
            Some(()) => self.ui.on_overlay(self.overlay.to_svg()),
            None => self.clear_overlay(),
        }
    }

    fn clear_overlay(&mut self) {
        if overlay::clear(&mut self.overlay) {
            self.ui.on_overlay(None);
        }
    }

    fn teardown(&mut self) {
        self.observer.stop();
        self.session.auto_analysis = false;
        self.clear_overlay();
        info!("Session closed");
    }
}
