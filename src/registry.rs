//! Node Registry & Health (Component D).
//!
//! Tracks the set of storage nodes the coordinator knows about and answers
//! "which of them are alive right now". Grounded on `storage.py`'s
//! `storage_servers` list plus `helpers.py`'s `ping`/`request_space_available`,
//! which this reproduces over `reqwest` instead of Python `requests`.
//!
//! Liveness is checked fresh on every call rather than cached: the fleet is
//! small and the coordinator already makes one HTTP round trip to each node
//! on placement decisions, so a cache would trade a little latency for a
//! window where a dead node still gets handed a write.

use std::net::IpAddr;
use std::time::Duration;

use tokio::sync::RwLock;

/// Hostnames (or IPs) of every storage node that has ever registered via
/// `/connect/`, in registration order. Duplicates are ignored, matching
/// `add_storage_server`'s `if server not in self.storage_servers`.
pub struct NodeRegistry {
    nodes: RwLock<Vec<String>>,
    http: reqwest::Client,
    storage_node_port: u16,
}

impl NodeRegistry {
    pub fn new(storage_node_port: u16, request_timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .expect("reqwest client configuration is always valid");
        Self {
            nodes: RwLock::new(Vec::new()),
            http,
            storage_node_port,
        }
    }

    /// Register a node by address, if it isn't already known. Returns
    /// whether it was newly added.
    pub async fn register(&self, addr: IpAddr) -> bool {
        let host = addr.to_string();
        let mut nodes = self.nodes.write().await;
        if nodes.iter().any(|existing| existing == &host) {
            return false;
        }
        nodes.push(host);
        true
    }

    /// Every node the registry has ever seen, regardless of liveness.
    pub async fn all(&self) -> Vec<String> {
        self.nodes.read().await.clone()
    }

    /// Nodes currently responding to `/ping` with 200.
    pub async fn available(&self) -> Vec<String> {
        let nodes = self.all().await;
        let mut live = Vec::with_capacity(nodes.len());
        for node in nodes {
            if self.ping(&node).await {
                live.push(node);
            }
        }
        live
    }

    /// `GET http://{host}:{storage_node_port}/ping`, 200 means healthy.
    /// Any transport failure (timeout, connection refused, DNS) counts as
    /// unhealthy rather than propagating an error: a single unreachable
    /// node must never take down a placement decision.
    pub async fn ping(&self, host: &str) -> bool {
        let url = format!("http://{host}:{}/ping", self.storage_node_port);
        matches!(self.http.get(url).send().await, Ok(response) if response.status() == reqwest::StatusCode::OK)
    }

    /// `GET http://{host}:{storage_node_port}/info/space`, reading the
    /// `bytes_available` field. Any failure (unreachable node, malformed
    /// body, missing field) counts as zero bytes available.
    pub async fn space_available(&self, host: &str) -> u64 {
        let url = format!("http://{host}:{}/info/space", self.storage_node_port);
        let result: Result<SpaceResponse, _> = async {
            let response = self.http.get(url).send().await?;
            response.json::<SpaceResponse>().await
        }
        .await;
        result.map(|body| body.bytes_available).unwrap_or(0)
    }
}

#[derive(serde::Deserialize)]
struct SpaceResponse {
    bytes_available: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_deduplicates() {
        let registry = NodeRegistry::new(8090, Duration::from_secs(1));
        let addr: IpAddr = "127.0.0.1".parse().unwrap();
        assert!(registry.register(addr).await);
        assert!(!registry.register(addr).await);
        assert_eq!(registry.all().await, vec!["127.0.0.1".to_string()]);
    }

    #[tokio::test]
    async fn unreachable_node_pings_false_and_reports_no_space() {
        let registry = NodeRegistry::new(1, Duration::from_millis(50));
        assert!(!registry.ping("203.0.113.1").await);
        assert_eq!(registry.space_available("203.0.113.1").await, 0);
    }
}
