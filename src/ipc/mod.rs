mod error;
mod handlers;
mod loader;
mod router;
mod types;

pub use error::{err, event};
pub use loader::{Inbound, Loader};
pub use router::{apply_loaded, handle_request};
pub use types::{AppState, Request};
