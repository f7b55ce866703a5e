//! The mutable set of servers scraped on each cycle.

use std::{
    sync::{Arc, RwLock},
    time::Duration,
};

use hstream_exporter_client::AdminClient;
use hstream_exporter_common::error::{ExporterError, Result};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Copy-on-write list of `host:port` server addresses.
///
/// Readers clone the current `Arc` and never hold the lock across I/O.
/// Writers build a fresh list and swap it in, so a snapshot taken before a
/// removal stays intact.
#[derive(Default)]
pub struct TargetSet {
    targets: RwLock<Arc<Vec<String>>>,
}

impl TargetSet {
    pub fn new(targets: Vec<String>) -> Self {
        Self {
            targets: RwLock::new(Arc::new(dedupe(targets))),
        }
    }

    /// Builds the set from the cluster's current membership. Only an
    /// unreachable cluster is an error; an empty list is accepted like any
    /// refresh and filled in by the next one.
    pub async fn discover(client: &dyn AdminClient) -> Result<Self> {
        let servers = client.get_server_info().await?;
        if servers.is_empty() {
            warn!("cluster reported no servers, waiting for the next refresh");
        }

        info!(servers = ?servers, "discovered cluster servers");
        Ok(Self::new(servers))
    }

    pub fn snapshot(&self) -> Arc<Vec<String>> {
        match self.targets.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(_) => Arc::new(Vec::new()),
        }
    }

    /// Drops `target` from rotation until the next membership refresh.
    pub fn remove(&self, target: &str) -> Result<bool> {
        let mut guard = self.write()?;
        if !guard.iter().any(|existing| existing == target) {
            return Ok(false);
        }

        let remaining = guard
            .iter()
            .filter(|existing| existing.as_str() != target)
            .cloned()
            .collect::<Vec<_>>();
        *guard = Arc::new(remaining);
        Ok(true)
    }

    /// Replaces the whole set with a freshly discovered list.
    pub fn replace(&self, targets: Vec<String>) -> Result<()> {
        *self.write()? = Arc::new(dedupe(targets));
        Ok(())
    }

    /// Re-reads the membership every `period`, keeping the current list when
    /// the cluster cannot be reached.
    pub fn spawn_refresh(
        self: &Arc<Self>,
        client: Arc<dyn AdminClient>,
        period: Duration,
    ) -> JoinHandle<()> {
        let targets = Arc::clone(self);
        info!(period = ?period, "starting server membership refresh");

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                targets.refresh_once(client.as_ref()).await;
            }
        })
    }

    pub async fn refresh_once(&self, client: &dyn AdminClient) {
        match client.get_server_info().await {
            Ok(servers) => {
                debug!(servers = ?servers, "refreshed cluster servers");
                if let Err(err) = self.replace(servers) {
                    error!(error = %err, "failed to replace server list");
                }
            }
            Err(err) => warn!(error = %err, "failed to refresh cluster servers"),
        }
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Arc<Vec<String>>>> {
        self.targets
            .write()
            .map_err(|_| ExporterError::InternalError("target set lock poisoned".to_string()))
    }
}

fn dedupe(mut targets: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    targets.retain(|target| seen.insert(target.clone()));
    targets
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hstream_exporter_client::AdminClient;

    use super::TargetSet;
    use crate::testing::ScriptedAdmin;

    #[test]
    fn removal_does_not_disturb_taken_snapshots() {
        let targets = TargetSet::new(vec!["a:1".to_string(), "b:1".to_string()]);
        let before = targets.snapshot();

        assert!(targets.remove("b:1").unwrap());
        assert!(!targets.remove("b:1").unwrap());

        assert_eq!(before.as_slice(), ["a:1", "b:1"]);
        assert_eq!(targets.snapshot().as_slice(), ["a:1"]);
    }

    #[test]
    fn duplicates_are_collapsed() {
        let targets = TargetSet::new(vec!["a:1".to_string(), "a:1".to_string()]);
        assert_eq!(targets.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn refresh_replaces_the_whole_list() {
        let admin = ScriptedAdmin::new().with_servers(&["a:1", "b:1", "c:1"]);
        let targets = TargetSet::discover(&admin).await.unwrap();
        targets.remove("b:1").unwrap();

        admin.set_servers(&["b:1", "d:1"]);
        targets.refresh_once(&admin).await;
        assert_eq!(targets.snapshot().as_slice(), ["b:1", "d:1"]);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_current_list() {
        let admin = ScriptedAdmin::new().with_servers(&["a:1"]);
        let targets = TargetSet::discover(&admin).await.unwrap();

        admin.fail_discovery();
        targets.refresh_once(&admin).await;
        assert_eq!(targets.snapshot().as_slice(), ["a:1"]);
    }

    #[tokio::test]
    async fn initial_discovery_failure_is_reported() {
        let admin = ScriptedAdmin::new();
        admin.fail_discovery();
        assert!(TargetSet::discover(&admin).await.is_err());
    }

    #[tokio::test]
    async fn empty_membership_is_accepted_at_startup_and_on_refresh() {
        let admin = ScriptedAdmin::new().with_servers(&[]);
        let targets = TargetSet::discover(&admin).await.unwrap();
        assert!(targets.snapshot().is_empty());

        admin.set_servers(&["a:1"]);
        targets.refresh_once(&admin).await;
        assert_eq!(targets.snapshot().as_slice(), ["a:1"]);

        admin.set_servers(&[]);
        targets.refresh_once(&admin).await;
        assert!(targets.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn background_refresh_picks_up_new_members() {
        let admin = Arc::new(ScriptedAdmin::new().with_servers(&["a:1"]));
        let targets = Arc::new(TargetSet::discover(admin.as_ref()).await.unwrap());

        admin.set_servers(&["a:1", "b:1"]);
        let client: Arc<dyn AdminClient> = admin.clone();
        let handle = targets.spawn_refresh(client, std::time::Duration::from_secs(30));

        tokio::time::sleep(std::time::Duration::from_secs(31)).await;
        assert_eq!(targets.snapshot().as_slice(), ["a:1", "b:1"]);
        handle.abort();
    }
}
