// Upstream report fetching with bounded retries

pub mod client;
pub mod error;
pub mod policy;
pub mod transport;
pub mod upstream;

pub use client::{ClientConfig, PageSpeedClient};
pub use error::{FetchError, Result};
pub use policy::{RetryPolicy, RetryProfile};
pub use transport::{ReqwestTransport, Transport, TransportError, TransportResponse};
pub use upstream::DEFAULT_ENDPOINT;
