use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::trace;

use crate::types::{MetricDescriptor, Observation};

/// A data source that produces its samples on each exposition pull.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Descriptors of every metric family this collector may emit.
    fn describe(&self) -> Vec<MetricDescriptor>;

    /// Produces the current samples. Observations are pushed into `sink` as
    /// soon as they are ready; the call returns once nothing more will be sent.
    async fn collect(&self, sink: ObservationSink);
}

/// Cloneable, unordered write end for [`Observation`]s.
#[derive(Clone)]
pub struct ObservationSink {
    tx: mpsc::UnboundedSender<Observation>,
}

impl ObservationSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Observation>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Emits one observation. Returns `false` once the reader is gone.
    pub fn emit(&self, observation: Observation) -> bool {
        match self.tx.send(observation) {
            Ok(()) => true,
            Err(rejected) => {
                trace!(metric = %rejected.0.descriptor().name, "observation sink closed");
                false
            }
        }
    }
}
