//! Scrapes operational statistics from every server of a cluster and mirrors
//! them as Prometheus metrics.
//!
//! [`ClusterCollector`] is registered into the exposition registry. On each
//! pull it fans out one task per known server; each task runs the
//! [`Scraper`] for that server and streams observations straight into the
//! registry's sink.

pub mod catalog;
pub mod collector;
pub mod error;
pub mod parser;
pub mod scraper;
pub mod stats;
pub mod targets;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::{MetricDefinition, MetricShape, NAMESPACE, StatSource, default_catalog};
pub use collector::ClusterCollector;
pub use error::{ParseError, ScrapeError};
pub use parser::{ResponseTable, StatsRecord, parse_response};
pub use scraper::{ScrapeCycle, ScrapeOutcome, Scraper, SummaryOptions};
pub use stats::ScrapeStats;
pub use targets::TargetSet;
