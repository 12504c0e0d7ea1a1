use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::{base_url, KvStore};
use crate::error::FetchError;

pub const DEFAULT_ADDRESS: &str = "127.0.0.1:8500";
pub const DEFAULT_DATACENTER: &str = "dc1";

/// Connection settings for a Consul agent.
#[derive(Debug, Clone)]
pub struct ConsulOptions {
    pub address: String,
    pub datacenter: String,
    pub namespace: String,
    pub partition: String,
    pub token: String,
}

impl Default for ConsulOptions {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            datacenter: DEFAULT_DATACENTER.to_string(),
            namespace: String::new(),
            partition: String::new(),
            token: String::new(),
        }
    }
}

/// Reads keys through Consul's HTTP KV endpoint.
#[derive(Clone)]
pub struct ConsulStore {
    client: Client,
    base_url: String,
    options: ConsulOptions,
}

impl ConsulStore {
    pub fn new(options: ConsulOptions) -> Result<Self, FetchError> {
        let client = Client::builder()
            .build()
            .map_err(|e| FetchError::HttpRequestFailed(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url(&options.address),
            options,
        })
    }

    fn query(&self) -> Vec<(&'static str, &str)> {
        let mut query = vec![("raw", "")];
        if !self.options.datacenter.is_empty() {
            query.push(("dc", self.options.datacenter.as_str()));
        }
        if !self.options.namespace.is_empty() {
            query.push(("ns", self.options.namespace.as_str()));
        }
        if !self.options.partition.is_empty() {
            query.push(("partition", self.options.partition.as_str()));
        }
        query
    }
}

#[async_trait]
impl KvStore for ConsulStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, FetchError> {
        let url = format!("{}/v1/kv/{}", self.base_url, key.trim_start_matches('/'));
        debug!(%url, "Fetching consul key");

        let mut request = self.client.get(&url).query(&self.query());
        if !self.options.token.is_empty() {
            request = request.header("X-Consul-Token", &self.options.token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::HttpRequestFailed(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(FetchError::KeyNotFound(key.to_string()));
        }
        if !response.status().is_success() {
            return Err(FetchError::HttpStatus {
                key: key.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::ParseError(format!("Failed to read body: {}", e)))?;
        Ok(body.to_vec())
    }

    fn name(&self) -> &'static str {
        "consul"
    }
}
