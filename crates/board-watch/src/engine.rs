//! UCI engine client (async I/O).
//!
//! Every analysis runs in its own engine session which is released exactly
//! once, whichever way the analysis ends.

use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use board_core::Move;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::EngineError;

/// Engine score from the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    /// Positive: side to move mates in N. Negative: gets mated in N.
    Mate(i32),
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Centipawns(cp) => write!(f, "{:+.2}", *cp as f64 / 100.0),
            Self::Mate(m) if *m >= 0 => write!(f, "+M{m}"),
            Self::Mate(m) => write!(f, "-M{}", m.abs()),
        }
    }
}

impl Serialize for Score {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Result of one analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestMove {
    pub mv: Move,
    /// Last score reported before `bestmove`, if any
    pub score: Option<Score>,
}

type Release = Box<dyn FnOnce() + Send>;

/// One isolated engine instance: a command pipe, an output pipe and a
/// release hook that tears the instance down.
pub struct EngineSession {
    stdin: Box<dyn AsyncWrite + Send + Unpin>,
    stdout: Box<dyn AsyncBufRead + Send + Unpin>,
    release: Option<Release>,
}

impl EngineSession {
    pub fn new<W, R, F>(stdin: W, stdout: R, release: F) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
        R: AsyncBufRead + Send + Unpin + 'static,
        F: FnOnce() + Send + 'static,
    {
        Self {
            stdin: Box::new(stdin),
            stdout: Box::new(stdout),
            release: Some(Box::new(release)),
        }
    }

    /// Tear the instance down. Only the first call has an effect.
    pub fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }

    async fn send(&mut self, cmd: &str) -> Result<(), EngineError> {
        debug!(cmd, "Engine <");
        self.stdin
            .write_all(format!("{cmd}\n").as_bytes())
            .await
            .map_err(|e| EngineError::Io(format!("Failed to write to engine: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| EngineError::Io(format!("Failed to flush engine stdin: {e}")))?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String, EngineError> {
        let mut line = String::new();
        let n = self
            .stdout
            .read_line(&mut line)
            .await
            .map_err(|e| EngineError::Io(format!("Failed to read from engine: {e}")))?;
        if n == 0 {
            return Err(EngineError::Closed);
        }
        let trimmed = line.trim().to_string();
        debug!(line = %trimmed, "Engine >");
        Ok(trimmed)
    }

    async fn wait_for(&mut self, expected: &str) -> Result<(), EngineError> {
        loop {
            if self.read_line().await? == expected {
                return Ok(());
            }
        }
    }

    /// Handshake, set the position, search, and read up to the first
    /// `bestmove` line.
    async fn search(&mut self, fen: &str, depth: u32) -> Result<BestMove, EngineError> {
        self.send("uci").await?;
        self.wait_for("uciok").await?;
        self.send(&format!("position fen {fen}")).await?;
        self.send(&format!("go depth {depth}")).await?;

        let mut score = None;
        loop {
            let line = self.read_line().await?;
            let mut tokens = line.split_whitespace();
            match tokens.next() {
                Some("info") => {
                    if let Some(s) = parse_score(&line) {
                        score = Some(s);
                    }
                }
                Some("bestmove") => {
                    let token = tokens.next().ok_or(EngineError::NoMove)?;
                    if token == "(none)" {
                        return Err(EngineError::NoMove);
                    }
                    let mv = Move::parse(token)
                        .map_err(|_| EngineError::BadMove(token.to_string()))?;
                    return Ok(BestMove { mv, score });
                }
                _ => {}
            }
        }
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        self.release();
    }
}

/// Produces a fresh engine session per analysis.
pub trait EngineSpawner: Send + Sync + 'static {
    fn spawn(&self) -> Result<EngineSession, EngineError>;
}

/// Launches the engine binary as a child process.
#[derive(Debug, Clone)]
pub struct ProcessSpawner {
    path: String,
}

impl ProcessSpawner {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
        }
    }
}

impl EngineSpawner for ProcessSpawner {
    fn spawn(&self) -> Result<EngineSession, EngineError> {
        let mut child = Command::new(&self.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Spawn(format!("{}: {e}", self.path)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Spawn("engine stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Spawn("engine stdout unavailable".into()))?;

        let pid = child.id();
        Ok(EngineSession::new(stdin, BufReader::new(stdout), move || {
            let mut child = child;
            if let Err(e) = child.start_kill() {
                debug!(?pid, error = %e, "Engine already exited");
            }
        }))
    }
}

pub struct EngineClient<S> {
    spawner: S,
}

impl<S: EngineSpawner> EngineClient<S> {
    pub fn new(spawner: S) -> Self {
        Self { spawner }
    }

    /// Analyse one position in a fresh session. The deadline runs from the
    /// start of the call; on expiry the pending read is dropped, so a late
    /// `bestmove` can never be observed.
    pub async fn analyze(
        &self,
        fen: &str,
        depth: u32,
        deadline: Duration,
    ) -> Result<BestMove, EngineError> {
        let deadline_at = Instant::now() + deadline;
        let mut session = self.spawner.spawn()?;

        let outcome = tokio::time::timeout_at(deadline_at, session.search(fen, depth)).await;
        session.release();

        match outcome {
            Ok(Ok(best)) => {
                debug!(best_move = %best.mv, "Engine answered");
                Ok(best)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Engine session failed");
                Err(e)
            }
            Err(_) => {
                warn!(timeout_ms = deadline.as_millis() as u64, "Engine timed out");
                Err(EngineError::Timeout)
            }
        }
    }
}

/// Parse the score from an `info` line
fn parse_score(line: &str) -> Option<Score> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == "score" && i + 2 < parts.len() {
            let value = parts[i + 2].parse().ok()?;
            return match parts[i + 1] {
                "cp" => Some(Score::Centipawns(value)),
                "mate" => Some(Score::Mate(value)),
                _ => None,
            };
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::io::{duplex, split, AsyncBufReadExt, AsyncWriteExt, BufReader};

    const FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    /// Scripted engine: answers `uci` with `uciok` and `go` with `reply`
    /// after `delay`. `None` never answers the search.
    struct FakeSpawner {
        reply: Option<Vec<&'static str>>,
        delay: Duration,
        releases: Arc<AtomicUsize>,
        received: Arc<Mutex<Vec<String>>>,
    }

    impl FakeSpawner {
        fn new(reply: Option<Vec<&'static str>>, delay: Duration) -> Self {
            Self {
                reply,
                delay,
                releases: Arc::new(AtomicUsize::new(0)),
                received: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl EngineSpawner for FakeSpawner {
        fn spawn(&self) -> Result<EngineSession, EngineError> {
            let (client, server) = duplex(4096);
            let (reader, writer) = split(client);
            let (engine_in, mut engine_out) = split(server);
            let reply = self.reply.clone();
            let delay = self.delay;
            let received = Arc::clone(&self.received);

            tokio::spawn(async move {
                let mut lines = BufReader::new(engine_in).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    received.lock().unwrap().push(line.clone());
                    if line == "uci" {
                        let _ = engine_out.write_all(b"id name Fake\nuciok\n").await;
                    } else if line.starts_with("go") {
                        let Some(reply) = reply.clone() else { continue };
                        tokio::time::sleep(delay).await;
                        for l in reply {
                            let _ = engine_out.write_all(format!("{l}\n").as_bytes()).await;
                        }
                    }
                }
            });

            let releases = Arc::clone(&self.releases);
            Ok(EngineSession::new(writer, BufReader::new(reader), move || {
                releases.fetch_add(1, Ordering::SeqCst);
            }))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_best_move_with_ponder() {
        let spawner = FakeSpawner::new(
            Some(vec![
                "info depth 14 score cp 31 pv e2e4 e7e5",
                "bestmove e2e4 ponder e7e5",
            ]),
            Duration::from_millis(200),
        );
        let releases = Arc::clone(&spawner.releases);
        let received = Arc::clone(&spawner.received);
        let client = EngineClient::new(spawner);

        let best = client.analyze(FEN, 15, Duration::from_secs(10)).await.unwrap();
        assert_eq!(best.mv.to_string(), "e2e4");
        assert_eq!(best.mv.promotion, None);
        assert_eq!(best.score, Some(Score::Centipawns(31)));
        assert_eq!(releases.load(Ordering::SeqCst), 1);

        let sent = received.lock().unwrap().clone();
        assert_eq!(
            sent,
            vec![
                "uci".to_string(),
                format!("position fen {FEN}"),
                "go depth 15".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_promotion_and_mate_score() {
        let spawner = FakeSpawner::new(
            Some(vec!["info depth 5 score mate -2 pv a2a1q", "bestmove a2a1q"]),
            Duration::ZERO,
        );
        let best = EngineClient::new(spawner)
            .analyze(FEN, 5, Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(best.mv.promotion, Some(board_core::Role::Queen));
        assert_eq!(best.score, Some(Score::Mate(-2)));
        assert_eq!(best.score.unwrap().to_string(), "-M2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_releases_once() {
        let spawner = FakeSpawner::new(None, Duration::ZERO);
        let releases = Arc::clone(&spawner.releases);
        let client = EngineClient::new(spawner);

        let err = client.analyze(FEN, 15, Duration::from_secs(10)).await.unwrap_err();
        assert_eq!(err, EngineError::Timeout);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_answer_is_discarded() {
        let spawner = FakeSpawner::new(Some(vec!["bestmove d2d4"]), Duration::from_secs(11));
        let releases = Arc::clone(&spawner.releases);
        let client = EngineClient::new(spawner);

        let err = client.analyze(FEN, 15, Duration::from_secs(10)).await.unwrap_err();
        assert_eq!(err, EngineError::Timeout);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_move() {
        let spawner = FakeSpawner::new(Some(vec!["bestmove (none)"]), Duration::ZERO);
        let releases = Arc::clone(&spawner.releases);
        let err = EngineClient::new(spawner)
            .analyze(FEN, 15, Duration::from_secs(10))
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::NoMove);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_output_is_error() {
        struct DeadSpawner(Arc<AtomicUsize>);
        impl EngineSpawner for DeadSpawner {
            fn spawn(&self) -> Result<EngineSession, EngineError> {
                let releases = Arc::clone(&self.0);
                Ok(EngineSession::new(
                    tokio::io::sink(),
                    BufReader::new(tokio::io::empty()),
                    move || {
                        releases.fetch_add(1, Ordering::SeqCst);
                    },
                ))
            }
        }

        let releases = Arc::new(AtomicUsize::new(0));
        let err = EngineClient::new(DeadSpawner(Arc::clone(&releases)))
            .analyze(FEN, 15, Duration::from_secs(10))
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::Closed);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_parse_score() {
        let line = "info depth 20 seldepth 25 multipv 1 score cp 35 nodes 100000 pv e2e4";
        assert_eq!(parse_score(line), Some(Score::Centipawns(35)));
        assert_eq!(
            parse_score("info depth 20 score mate 3 nodes 100000 pv e2e4"),
            Some(Score::Mate(3))
        );
        assert_eq!(parse_score("info string NNUE enabled"), None);
        assert_eq!(Score::Centipawns(-120).to_string(), "-1.20");
    }
}
