//! Helpers for the `host:port` addresses the cluster reports for its servers.

/// Returns the host portion of a `host:port` server address.
///
/// Only the port is dropped. The host text is kept exactly as the cluster
/// reported it, and bracketed IPv6 literals keep their brackets.
pub fn host_of(target: &str) -> String {
    let target = target.trim();
    let target = target
        .split_once("://")
        .map_or(target, |(_, rest)| rest);

    if target.starts_with('[')
        && let Some(end) = target.find(']')
    {
        return target[..=end].to_string();
    }

    match target.rsplit_once(':') {
        Some((host, _)) => host.to_string(),
        None => target.to_string(),
    }
}

pub fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    match endpoint.strip_prefix("hstream://") {
        Some(rest) => format!("http://{rest}"),
        None => endpoint.to_string(),
    }
}

pub fn ensure_http_scheme(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("http://{endpoint}")
    }
}
