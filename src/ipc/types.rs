use crate::api::PortalClient;
use crate::config::Config;
use crate::ipc::loader::Loader;
use crate::notify::{Notifier, Outbox};
use crate::session::SessionHandle;
use crate::views::{AttendanceView, ScoreView};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Everything the event loop owns. Only the main thread touches it.
pub struct AppState {
    pub config: Config,
    pub session: SessionHandle,
    pub client: PortalClient,
    pub outbox: Arc<Outbox>,
    pub notifier: Arc<dyn Notifier>,
    pub scores: ScoreView,
    pub attendance: AttendanceView,
    pub loader: Loader,
    pub dropped_stale_loads: u64,
}

impl AppState {
    pub fn new(config: Config, client: PortalClient, loader: Loader) -> Self {
        let outbox = Arc::new(Outbox::new());
        AppState {
            config,
            session: client.session().clone(),
            client,
            notifier: outbox.clone(),
            outbox,
            scores: ScoreView::new(),
            attendance: AttendanceView::new(),
            loader,
            dropped_stale_loads: 0,
        }
    }

    /// Discards both views' drafts and invalidates their in-flight loads.
    pub fn reset_views(&mut self) {
        self.scores = ScoreView::new();
        self.attendance = AttendanceView::new();
    }
}
