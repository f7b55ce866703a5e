//! In-memory [`AdminClient`] with per-server scripted answers.

use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use hstream_exporter_client::{AdminClient, StatEntry, StatKind};
use hstream_exporter_common::error::{ExporterError, Result};

type Scripted<T> = std::result::Result<T, String>;

#[derive(Default)]
pub(crate) struct ScriptedAdmin {
    servers: Mutex<Option<Vec<String>>>,
    stats: Mutex<HashMap<String, Scripted<Vec<StatEntry>>>>,
    commands: Mutex<Vec<(String, String, Scripted<String>)>>,
    stats_requests: Mutex<Vec<(String, Vec<StatKind>)>>,
    commands_sent: Mutex<Vec<(String, String)>>,
}

impl ScriptedAdmin {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_servers(self, servers: &[&str]) -> Self {
        self.set_servers(servers);
        self
    }

    pub(crate) fn set_servers(&self, servers: &[&str]) {
        *self.servers.lock().unwrap() = Some(servers.iter().map(|s| s.to_string()).collect());
    }

    pub(crate) fn fail_discovery(&self) {
        *self.servers.lock().unwrap() = None;
    }

    pub(crate) fn with_stats(self, target: &str, entries: Vec<StatEntry>) -> Self {
        self.stats
            .lock()
            .unwrap()
            .insert(target.to_string(), Ok(entries));
        self
    }

    pub(crate) fn with_stats_error(self, target: &str) -> Self {
        self.stats
            .lock()
            .unwrap()
            .insert(target.to_string(), Err("connection refused".to_string()));
        self
    }

    /// Answers any command sent to `target` that mentions `needle`.
    pub(crate) fn with_command(self, target: &str, needle: &str, response: &str) -> Self {
        self.commands.lock().unwrap().push((
            target.to_string(),
            needle.to_string(),
            Ok(response.to_string()),
        ));
        self
    }

    pub(crate) fn with_command_error(self, target: &str, needle: &str) -> Self {
        self.commands.lock().unwrap().push((
            target.to_string(),
            needle.to_string(),
            Err("deadline exceeded".to_string()),
        ));
        self
    }

    pub(crate) fn stats_requests(&self) -> Vec<(String, Vec<StatKind>)> {
        self.stats_requests.lock().unwrap().clone()
    }

    pub(crate) fn commands_sent(&self) -> Vec<(String, String)> {
        self.commands_sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl AdminClient for ScriptedAdmin {
    async fn get_server_info(&self) -> Result<Vec<String>> {
        self.servers
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ExporterError::Discovery("cluster unreachable".to_string()))
    }

    async fn get_stats(&self, target: &str, kinds: &[StatKind]) -> Result<Vec<StatEntry>> {
        self.stats_requests
            .lock()
            .unwrap()
            .push((target.to_string(), kinds.to_vec()));

        // Scripted entries are returned as-is, requested or not, so tests can
        // cover servers that answer with more than they were asked for.
        match self.stats.lock().unwrap().get(target) {
            Some(Ok(entries)) => Ok(entries.clone()),
            Some(Err(message)) => Err(ExporterError::transport(target, message)),
            None => Err(ExporterError::transport(target, "no scripted stats")),
        }
    }

    async fn admin_request(&self, target: &str, command: &str) -> Result<String> {
        self.commands_sent
            .lock()
            .unwrap()
            .push((target.to_string(), command.to_string()));

        let commands = self.commands.lock().unwrap();
        let scripted = commands
            .iter()
            .find(|(server, needle, _)| server == target && command.contains(needle.as_str()));
        match scripted {
            Some((_, _, Ok(response))) => Ok(response.clone()),
            Some((_, _, Err(message))) => Err(ExporterError::transport(target, message)),
            None => Err(ExporterError::transport(target, "no scripted command")),
        }
    }
}

/// A one-row summary response carrying the given quantile columns.
pub(crate) fn summary_response(columns: &[(&str, &str)]) -> String {
    let headers = columns.iter().map(|(h, _)| format!("\"{h}\"")).collect::<Vec<_>>();
    let values = columns.iter().map(|(_, v)| format!("\"{v}\"")).collect::<Vec<_>>();
    format!(
        r#"{{"type":"table","content":{{"headers":[{}],"rows":[[{}]]}}}}"#,
        headers.join(","),
        values.join(",")
    )
}
