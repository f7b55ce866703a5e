pub mod client;
pub mod http;
pub mod types;

pub use client::AdminClient;
pub use http::{HttpAdminClient, DEFAULT_REQUEST_TIMEOUT};
pub use types::{StatEntry, StatKind};
