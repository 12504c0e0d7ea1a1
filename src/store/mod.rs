//! Key-value stores that configuration blobs are fetched from.

use async_trait::async_trait;
use tokio::time::{timeout, Duration};

use crate::error::FetchError;

pub mod consul;
pub mod etcd;
pub mod file;

pub use consul::{ConsulOptions, ConsulStore};
pub use etcd::EtcdStore;
pub use file::FileStore;

/// A read-only view of a key-value store.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetches the raw value stored under `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>, FetchError>;

    /// Short backend name used in logs.
    fn name(&self) -> &'static str;
}

/// Wraps a store lookup in a timeout.
pub async fn get_with_timeout(
    store: &dyn KvStore,
    key: &str,
    timeout_duration: Duration,
) -> Result<Vec<u8>, FetchError> {
    timeout(timeout_duration, store.get(key))
        .await
        .unwrap_or_else(|_| Err(FetchError::Timeout))
}

/// Prepends `http://` to bare `host:port` addresses.
pub(crate) fn base_url(address: &str) -> String {
    let address = address.trim_end_matches('/');
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowStore;

    #[async_trait]
    impl KvStore for SlowStore {
        async fn get(&self, _key: &str) -> Result<Vec<u8>, FetchError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    #[tokio::test]
    async fn lookup_times_out() {
        let result = get_with_timeout(&SlowStore, "k", Duration::from_millis(20)).await;
        assert!(matches!(result, Err(FetchError::Timeout)));
    }

    #[test]
    fn base_url_adds_scheme() {
        assert_eq!(base_url("127.0.0.1:8500"), "http://127.0.0.1:8500");
        assert_eq!(base_url("https://consul.local/"), "https://consul.local");
    }
}
