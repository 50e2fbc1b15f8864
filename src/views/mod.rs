//! Per-view state the shell used to keep in its components. Each view owns
//! its drafts; loads triggered by filter changes run off-thread and are
//! applied only while their generation ticket is current.

pub mod attendance;
pub mod gate;
pub mod scores;

use crate::api::{ApiError, PortalClient};
use thiserror::Error;

pub use attendance::{AttendanceLoad, AttendanceLoaded, AttendanceView};
pub use gate::Ticket;
pub use scores::{ScoreView, ScoresLoad, ScoresLoaded};

#[derive(Debug, Error)]
pub enum ViewError {
    /// Rejected before any network call.
    #[error("{0}")]
    Validation(String),

    /// The edit is not allowed in the view's current state.
    #[error("{0}")]
    Locked(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ViewError {
    pub fn code(&self) -> &'static str {
        match self {
            ViewError::Validation(_) => "validation_failed",
            ViewError::Locked(_) => "locked",
            ViewError::Api(e) => e.code(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ViewError::Validation(msg.into())
    }
}

/// A deferred fetch, built by a view and executed by a loader thread.
#[derive(Debug, Clone)]
pub enum LoadJob {
    Scores(ScoresLoad),
    Attendance(AttendanceLoad),
}

#[derive(Debug)]
pub enum Loaded {
    Scores(ScoresLoaded),
    Attendance(AttendanceLoaded),
}

impl LoadJob {
    pub fn ticket(&self) -> &Ticket {
        match self {
            LoadJob::Scores(j) => &j.ticket,
            LoadJob::Attendance(j) => &j.ticket,
        }
    }

    pub fn is_current(&self) -> bool {
        self.ticket().is_current()
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LoadJob::Scores(_) => "scores",
            LoadJob::Attendance(_) => "attendance",
        }
    }

    pub fn run(self, client: &PortalClient) -> Loaded {
        match self {
            LoadJob::Scores(j) => Loaded::Scores(j.run(client)),
            LoadJob::Attendance(j) => Loaded::Attendance(j.run(client)),
        }
    }
}

impl Loaded {
    pub fn kind(&self) -> &'static str {
        match self {
            Loaded::Scores(_) => "scores",
            Loaded::Attendance(_) => "attendance",
        }
    }

    pub fn generation(&self) -> u64 {
        match self {
            Loaded::Scores(l) => l.ticket.generation(),
            Loaded::Attendance(l) => l.ticket.generation(),
        }
    }
}
