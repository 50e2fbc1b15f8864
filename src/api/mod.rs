pub mod client;
pub mod envelope;
pub mod error;
#[cfg(test)]
pub mod fake;
pub mod transport;
pub mod types;

pub use client::PortalClient;
pub use error::ApiError;
pub use transport::HttpTransport;
