//! Fetches a configuration blob and decodes it into a document.

use std::path::PathBuf;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::time::Duration;
use tracing::{debug, error};

use crate::decoder::{ConfigDecoder, ConfigFormat, DefaultDecoder};
use crate::error::ReaderError;
use crate::metrics::FETCH_LATENCY;
use crate::store::{get_with_timeout, ConsulOptions, ConsulStore, EtcdStore, FileStore, KvStore};
use crate::template::{PathParams, PathTemplate};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const CONSUL_DEFAULT_PREFIX: &str = "KitexConfig";
pub const ETCD_DEFAULT_PREFIX: &str = "/KitexConfig";

/// A decodable configuration document.
pub trait Document: DeserializeOwned + Clone + Send + Sync + 'static {
    /// Key template used when none is configured.
    const DEFAULT_PATH_FORMAT: &'static str;
}

/// Where configuration blobs live.
#[derive(Debug, Clone)]
pub enum Backend {
    Consul(ConsulOptions),
    Etcd { nodes: Vec<String> },
    File { root: PathBuf },
}

impl Backend {
    pub fn default_prefix(&self) -> &'static str {
        match self {
            Backend::Consul(_) => CONSUL_DEFAULT_PREFIX,
            Backend::Etcd { .. } => ETCD_DEFAULT_PREFIX,
            Backend::File { .. } => "",
        }
    }

    fn connect(self) -> Result<Arc<dyn KvStore>, ReaderError> {
        Ok(match self {
            Backend::Consul(options) => Arc::new(
                ConsulStore::new(options).map_err(|e| ReaderError::Store(e.to_string()))?,
            ),
            Backend::Etcd { nodes } => {
                Arc::new(EtcdStore::new(nodes).map_err(|e| ReaderError::Store(e.to_string()))?)
            }
            Backend::File { root } => Arc::new(FileStore::new(root)),
        })
    }
}

/// Reader settings; every `None` falls back to the backend's default.
pub struct ReaderOptions<D> {
    pub prefix: Option<String>,
    pub path_format: Option<String>,
    pub timeout: Option<Duration>,
    pub format: ConfigFormat,
    pub decoder: Option<Arc<dyn ConfigDecoder<D>>>,
}

impl<D> Default for ReaderOptions<D> {
    fn default() -> Self {
        Self {
            prefix: None,
            path_format: None,
            timeout: None,
            format: ConfigFormat::Json,
            decoder: None,
        }
    }
}

/// Owns a store handle and the last successfully decoded document.
pub struct Reader<D> {
    store: Arc<dyn KvStore>,
    decoder: Arc<dyn ConfigDecoder<D>>,
    template: PathTemplate,
    prefix: String,
    timeout: Duration,
    format: ConfigFormat,
    key: Option<String>,
    config: Option<D>,
}

impl<D: Document> Reader<D> {
    pub fn new(backend: Backend, options: ReaderOptions<D>) -> Result<Self, ReaderError> {
        let prefix = backend.default_prefix();
        let store = backend.connect()?;
        Self::build(store, prefix, options)
    }

    pub fn consul(consul: ConsulOptions, options: ReaderOptions<D>) -> Result<Self, ReaderError> {
        Self::new(Backend::Consul(consul), options)
    }

    pub fn etcd(nodes: Vec<String>, options: ReaderOptions<D>) -> Result<Self, ReaderError> {
        Self::new(Backend::Etcd { nodes }, options)
    }

    pub fn file(root: impl Into<PathBuf>, options: ReaderOptions<D>) -> Result<Self, ReaderError> {
        Self::new(Backend::File { root: root.into() }, options)
    }

    /// Uses a caller-provided store; the prefix defaults to `KitexConfig`.
    pub fn with_store(store: Arc<dyn KvStore>, options: ReaderOptions<D>) -> Result<Self, ReaderError> {
        Self::build(store, CONSUL_DEFAULT_PREFIX, options)
    }

    fn build(
        store: Arc<dyn KvStore>,
        default_prefix: &str,
        options: ReaderOptions<D>,
    ) -> Result<Self, ReaderError> {
        let template =
            PathTemplate::parse(options.path_format.as_deref().unwrap_or(D::DEFAULT_PATH_FORMAT))?;
        Ok(Self {
            store,
            decoder: options.decoder.unwrap_or_else(|| Arc::new(DefaultDecoder)),
            template,
            prefix: options.prefix.unwrap_or_else(|| default_prefix.to_string()),
            timeout: options.timeout.unwrap_or(DEFAULT_TIMEOUT),
            format: options.format,
            key: None,
            config: None,
        })
    }
}

impl<D> Reader<D> {
    pub fn set_decoder(&mut self, decoder: Arc<dyn ConfigDecoder<D>>) {
        self.decoder = decoder;
    }

    /// Renders the key, fetches it and decodes the value.
    ///
    /// The document is decoded into a fresh value and only replaces the
    /// current one on success, so a failed read keeps the last good config.
    pub async fn read_to_config(&mut self, params: &PathParams) -> Result<(), ReaderError> {
        let key = format!("{}{}", self.prefix, self.template.render(params));
        debug!(store = self.store.name(), %key, "Reading config");

        let timer = FETCH_LATENCY.start_timer();
        let fetched = get_with_timeout(self.store.as_ref(), &key, self.timeout).await;
        timer.observe_duration();

        let data = match fetched {
            Ok(data) => data,
            Err(source) => {
                error!(store = self.store.name(), %key, err = %source, "Config get value failed");
                return Err(ReaderError::Fetch { key, source });
            }
        };

        let config = self
            .decoder
            .decode(&self.format, &data)
            .map_err(|source| ReaderError::Decode {
                key: key.clone(),
                source,
            })?;

        self.config = Some(config);
        self.key = Some(key);
        Ok(())
    }

    /// The last successfully decoded document.
    pub fn config(&self) -> Result<&D, ReaderError> {
        self.config.as_ref().ok_or(ReaderError::NotLoaded)
    }

    pub fn is_loaded(&self) -> bool {
        self.config.is_some()
    }

    /// The key of the last successful read.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn path_format(&self) -> &str {
        self.template.as_str()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn format(&self) -> &ConfigFormat {
        &self.format
    }
}
