use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::{base_url, KvStore};
use crate::error::FetchError;

pub const DEFAULT_NODE: &str = "http://127.0.0.1:2379";

#[derive(Deserialize)]
struct RangeResponse {
    #[serde(default)]
    kvs: Vec<KeyValue>,
}

#[derive(Deserialize)]
struct KeyValue {
    #[serde(default)]
    value: String,
}

/// Reads keys through the etcd v3 JSON gateway, trying each node in order.
#[derive(Clone)]
pub struct EtcdStore {
    client: Client,
    nodes: Vec<String>,
}

impl EtcdStore {
    pub fn new(nodes: Vec<String>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .build()
            .map_err(|e| FetchError::HttpRequestFailed(e.to_string()))?;
        let nodes = if nodes.is_empty() {
            vec![DEFAULT_NODE.to_string()]
        } else {
            nodes.iter().map(|node| base_url(node)).collect()
        };
        Ok(Self { client, nodes })
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    async fn range(&self, node: &str, key: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .post(format!("{}/v3/kv/range", node))
            .json(&json!({ "key": STANDARD.encode(key) }))
            .send()
            .await
            .map_err(|e| FetchError::HttpRequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus {
                key: key.to_string(),
                status: response.status().as_u16(),
            });
        }

        let text_body = response
            .text()
            .await
            .map_err(|e| FetchError::ParseError(format!("Failed to read body: {}", e)))?;
        let parsed: RangeResponse = serde_json::from_str(&text_body)
            .map_err(|e| FetchError::ParseError(format!("JSON parse error: {}", e)))?;

        let kv = parsed
            .kvs
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::KeyNotFound(key.to_string()))?;
        STANDARD
            .decode(kv.value)
            .map_err(|e| FetchError::ParseError(format!("base64 decode error: {}", e)))
    }
}

#[async_trait]
impl KvStore for EtcdStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, FetchError> {
        for node in &self.nodes {
            debug!(%node, %key, "Fetching etcd key");
            match self.range(node, key).await {
                Ok(value) => return Ok(value),
                // A missing key is authoritative; other nodes hold the same data.
                Err(err @ FetchError::KeyNotFound(_)) => return Err(err),
                Err(err) => warn!(%node, %err, "etcd node failed, trying next"),
            }
        }
        Err(FetchError::AllNodesFailed(self.nodes.len()))
    }

    fn name(&self) -> &'static str {
        "etcd"
    }
}
