use crate::api::PortalClient;
use crate::views::{LoadJob, Loaded};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Duration;

/// Messages for the event loop, from the stdin reader and from loaders.
#[derive(Debug)]
pub enum Inbound {
    Line(String),
    Loaded(Loaded),
    Closed,
}

/// Runs view loads on background threads after a debounce delay and posts
/// the results back to the event loop.
pub struct Loader {
    client: PortalClient,
    tx: Sender<Inbound>,
    debounce: Duration,
    skipped: Arc<AtomicU64>,
}

impl Loader {
    pub fn new(client: PortalClient, tx: Sender<Inbound>, debounce: Duration) -> Self {
        Loader {
            client,
            tx,
            debounce,
            skipped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Loads superseded before their delay elapses are never fetched.
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    pub fn schedule(&self, job: LoadJob) {
        let client = self.client.clone();
        let tx = self.tx.clone();
        let debounce = self.debounce;
        let skipped = self.skipped.clone();
        let kind = job.kind();
        let generation = job.ticket().generation();
        let spawned = std::thread::Builder::new()
            .name(format!("load-{kind}-{generation}"))
            .spawn(move || {
                if !debounce.is_zero() {
                    std::thread::sleep(debounce);
                }
                if !job.is_current() {
                    skipped.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(kind, generation, "load superseded before fetch");
                    return;
                }
                let loaded = job.run(&client);
                let _ = tx.send(Inbound::Loaded(loaded));
            });
        if let Err(e) = spawned {
            tracing::error!(kind, generation, "failed to spawn loader: {e}");
        }
    }

    pub fn schedule_opt(&self, job: Option<LoadJob>) -> bool {
        match job {
            Some(job) => {
                self.schedule(job);
                true
            }
            None => false,
        }
    }
}
