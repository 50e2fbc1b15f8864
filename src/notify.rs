use serde::Serialize;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub id: Uuid,
    pub level: Level,
    pub message: String,
}

/// Sink for user-facing notifications. Views receive one as
/// `Arc<dyn Notifier>`; the shell decides how to render them.
pub trait Notifier: Send + Sync {
    fn notify(&self, level: Level, message: String);

    fn success(&self, message: String) {
        self.notify(Level::Success, message)
    }

    fn error(&self, message: String) {
        self.notify(Level::Error, message)
    }
}

/// Queues notices until the event loop flushes them as `notify` events.
#[derive(Debug, Default)]
pub struct Outbox {
    queue: Mutex<Vec<Notice>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<Notice> {
        let mut q = self.queue.lock().unwrap_or_else(|p| p.into_inner());
        std::mem::take(&mut *q)
    }
}

impl Notifier for Outbox {
    fn notify(&self, level: Level, message: String) {
        tracing::debug!(?level, %message, "notice");
        let notice = Notice {
            id: Uuid::new_v4(),
            level,
            message,
        };
        self.queue
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(notice);
    }
}
