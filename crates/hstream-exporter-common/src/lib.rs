pub mod addr;
pub mod error;

pub use addr::{ensure_http_scheme, host_of, normalize_endpoint};
pub use error::{ExporterError, Result};
