//! Board mutation fan-out and the debounced observation loop.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Fan-out of board mutation notifications to live subscribers.
#[derive(Debug, Default)]
pub struct MutationHub {
    subscribers: Vec<mpsc::UnboundedSender<()>>,
}

impl MutationHub {
    pub fn subscribe(&mut self) -> MutationSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        MutationSubscription { rx }
    }

    /// Notify every subscriber, pruning those that went away.
    pub fn notify(&mut self) -> usize {
        self.subscribers.retain(|tx| tx.send(()).is_ok());
        self.subscribers.len()
    }
}

#[derive(Debug)]
pub struct MutationSubscription {
    rx: mpsc::UnboundedReceiver<()>,
}

impl MutationSubscription {
    /// Next notification; `None` once the hub is gone.
    pub async fn next(&mut self) -> Option<()> {
        self.rx.recv().await
    }
}

/// `Stopped` when no task is held, `Observing` otherwise.
pub struct ObservationLoop {
    debounce: Duration,
    task: Option<JoinHandle<()>>,
}

impl ObservationLoop {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            task: None,
        }
    }

    pub fn is_observing(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Start watching. A running watcher is torn down first, so there is never
    /// more than one subscription.
    pub fn start(&mut self, subscription: MutationSubscription, triggers: mpsc::UnboundedSender<()>) {
        self.stop();
        debug!(debounce_ms = self.debounce.as_millis() as u64, "Observation started");
        self.task = Some(tokio::spawn(watch(subscription, self.debounce, triggers)));
    }

    /// Stop watching and drop any pending debounce deadline. Idempotent.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Observation stopped");
        }
    }
}

impl Drop for ObservationLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Each notification re-arms a single deadline; expiry sends one trigger.
async fn watch(
    mut subscription: MutationSubscription,
    debounce: Duration,
    triggers: mpsc::UnboundedSender<()>,
) {
    let timer = tokio::time::sleep(debounce);
    tokio::pin!(timer);
    let mut armed = false;

    loop {
        tokio::select! {
            notified = subscription.next() => {
                if notified.is_none() {
                    break;
                }
                timer.as_mut().reset(Instant::now() + debounce);
                armed = true;
            }
            () = &mut timer, if armed => {
                armed = false;
                if triggers.send(()).is_err() {
                    break;
                }
            }
        }
    }
}
