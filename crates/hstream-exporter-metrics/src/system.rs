use std::{sync::Arc, time::Instant};

use hstream_exporter_common::error::Result;

use crate::{family::GaugeMetric, registry::MetricsRegistry};

/// Gauges describing the exporter process, refreshed before each render.
pub struct SystemMetrics {
    started: Instant,
    uptime: Arc<GaugeMetric>,
    resident_memory: Arc<GaugeMetric>,
    workers: Arc<GaugeMetric>,
}

impl SystemMetrics {
    pub fn register(registry: &MetricsRegistry, namespace: &str) -> Result<Self> {
        let gauge = |suffix: &str, help: &str| {
            registry.register_gauge(&format!("{namespace}_process_{suffix}"), help, &[])
        };

        Ok(Self {
            started: Instant::now(),
            uptime: gauge("uptime_seconds", "Seconds since the exporter started.")?,
            resident_memory: gauge("resident_memory_bytes", "Resident set size of the exporter.")?,
            workers: gauge("worker_threads", "Worker threads of the async runtime.")?,
        })
    }

    pub fn refresh(&self) {
        self.uptime
            .set(&[], clamp(self.started.elapsed().as_secs()));

        if let Some(bytes) = resident_memory_bytes() {
            self.resident_memory.set(&[], clamp(bytes));
        }

        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            self.workers
                .set(&[], clamp(runtime.metrics().num_workers() as u64));
        }
    }
}

fn clamp(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Reads `VmRSS` (reported in kB) from procfs.
#[cfg(target_os = "linux")]
fn resident_memory_bytes() -> Option<u64> {
    std::fs::read_to_string("/proc/self/status")
        .ok()?
        .lines()
        .find_map(|line| line.strip_prefix("VmRSS:"))
        .and_then(|rest| rest.trim().trim_end_matches("kB").trim().parse::<u64>().ok())
        .and_then(|kb| kb.checked_mul(1024))
}

#[cfg(not(target_os = "linux"))]
fn resident_memory_bytes() -> Option<u64> {
    None
}
