//! Client loader: fetches the client document and turns it into suites.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use arc_swap::ArcSwapOption;
use indexmap::IndexMap;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::config::ClientConfig;
use super::option::{CallOption, ClientOption, StreamCallOption, StreamOption};
use super::translator::{
    builtin_call_option_map_translators, builtin_call_option_translators,
    builtin_stream_call_option_map_translators, builtin_stream_call_option_translators,
    builtin_stream_translators, builtin_translators,
};
use crate::decoder::{Extension, NoExtension};
use crate::error::{LoadError, TranslateError};
use crate::metrics::{LOADS_TOTAL, LOAD_FAILURES};
use crate::reader::Reader;
use crate::registry::{
    call_option_map_translator, call_option_translator, translator, CallOptionMapTranslator,
    CallOptionTranslator, Registry, Translator,
};
use crate::retry::ShouldResultRetry;
use crate::suite::{CallOptions, Suite};
use crate::template::PathParams;

pub type ClientSuite = Suite<ClientOption>;
pub type StreamSuite = Suite<StreamOption>;

type Doc<E> = ClientConfig<E>;

/// Everything produced by one successful load.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSnapshot {
    pub suite: ClientSuite,
    pub stream_suite: StreamSuite,
    pub call_options: CallOptions<CallOption>,
    pub stream_call_options: CallOptions<StreamCallOption>,
}

/// User translators, registered after the built-ins. A user translator
/// sharing a built-in's name replaces it in place.
pub struct ClientLoaderOptions<E = NoExtension> {
    pub translators: Vec<(String, Translator<Doc<E>, ClientOption>)>,
    pub stream_translators: Vec<(String, Translator<Doc<E>, StreamOption>)>,
    pub call_option_translators: Vec<(String, CallOptionTranslator<Doc<E>, CallOption>)>,
    pub call_option_map_translators: Vec<(String, CallOptionMapTranslator<Doc<E>, CallOption>)>,
    pub stream_call_option_translators:
        Vec<(String, CallOptionTranslator<Doc<E>, StreamCallOption>)>,
    pub stream_call_option_map_translators:
        Vec<(String, CallOptionMapTranslator<Doc<E>, StreamCallOption>)>,
    /// Installed into `FailureRetry` when configured, otherwise applied
    /// through the `specifiedResultRetry` translator.
    pub should_result_retry: Option<ShouldResultRetry>,
}

impl<E> Default for ClientLoaderOptions<E> {
    fn default() -> Self {
        Self {
            translators: Vec::new(),
            stream_translators: Vec::new(),
            call_option_translators: Vec::new(),
            call_option_map_translators: Vec::new(),
            stream_call_option_translators: Vec::new(),
            stream_call_option_map_translators: Vec::new(),
            should_result_retry: None,
        }
    }
}

struct Registries<E> {
    translators: Registry<Translator<Doc<E>, ClientOption>>,
    stream_translators: Registry<Translator<Doc<E>, StreamOption>>,
    call_option_maps: Registry<CallOptionMapTranslator<Doc<E>, CallOption>>,
    call_options: Registry<CallOptionTranslator<Doc<E>, CallOption>>,
    stream_call_option_maps: Registry<CallOptionMapTranslator<Doc<E>, StreamCallOption>>,
    stream_call_options: Registry<CallOptionTranslator<Doc<E>, StreamCallOption>>,
}

impl<E: Extension> Registries<E> {
    fn builtin() -> Self {
        Self {
            translators: builtin_translators(),
            stream_translators: builtin_stream_translators(),
            call_option_maps: builtin_call_option_map_translators(),
            call_options: builtin_call_option_translators(),
            stream_call_option_maps: builtin_stream_call_option_map_translators(),
            stream_call_options: builtin_stream_call_option_translators(),
        }
    }

    fn snapshot(&self, config: &Doc<E>) -> ClientSnapshot {
        // Map translators run first so a single call option with the same
        // name wins.
        let mut call_options = IndexMap::new();
        self.call_option_maps.collect_call_option_maps(config, &mut call_options);
        self.call_options.collect_call_options(config, &mut call_options);

        let mut stream_call_options = IndexMap::new();
        self.stream_call_option_maps
            .collect_call_option_maps(config, &mut stream_call_options);
        self.stream_call_options
            .collect_call_options(config, &mut stream_call_options);

        ClientSnapshot {
            suite: Suite::new(self.translators.translate(config)),
            stream_suite: Suite::new(self.stream_translators.translate(config)),
            call_options: CallOptions::new(call_options),
            stream_call_options: CallOptions::new(stream_call_options),
        }
    }
}

/// Loads a client document and keeps the latest option snapshot.
///
/// `load` may be called repeatedly; a failed load leaves the previous
/// snapshot in place.
pub struct ClientLoader<E = NoExtension> {
    reader: Mutex<Reader<Doc<E>>>,
    params: PathParams,
    registries: RwLock<Registries<E>>,
    should_result_retry: Option<ShouldResultRetry>,
    snapshot: ArcSwapOption<ClientSnapshot>,
}

impl<E: Extension> ClientLoader<E> {
    pub fn new(
        client_service_name: impl Into<String>,
        server_service_name: impl Into<String>,
        reader: Reader<Doc<E>>,
        options: ClientLoaderOptions<E>,
    ) -> Self {
        let mut registries = Registries::builtin();
        for (name, t) in options.translators {
            registries.translators.register(name, t);
        }
        for (name, t) in options.stream_translators {
            registries.stream_translators.register(name, t);
        }
        for (name, t) in options.call_option_map_translators {
            registries.call_option_maps.register(name, t);
        }
        for (name, t) in options.call_option_translators {
            registries.call_options.register(name, t);
        }
        for (name, t) in options.stream_call_option_map_translators {
            registries.stream_call_option_maps.register(name, t);
        }
        for (name, t) in options.stream_call_option_translators {
            registries.stream_call_options.register(name, t);
        }

        Self {
            reader: Mutex::new(reader),
            params: PathParams::client(client_service_name, server_service_name),
            registries: RwLock::new(registries),
            should_result_retry: options.should_result_retry,
            snapshot: ArcSwapOption::empty(),
        }
    }

    /// Fetches, decodes and translates the client document, then publishes
    /// the new snapshot.
    pub async fn load(&self) -> Result<(), LoadError> {
        LOADS_TOTAL.inc();

        // Held until the snapshot is stored so concurrent loads publish in order.
        let mut reader = self.reader.lock().await;
        if let Err(err) = reader.read_to_config(&self.params).await {
            LOAD_FAILURES.inc();
            warn!(
                client = %self.params.client_service_name,
                server = %self.params.server_service_name,
                %err,
                "Load failed, keeping previous options"
            );
            return Err(err.into());
        }

        let mut config = reader.config()?.clone();
        if let Some(predicate) = &self.should_result_retry {
            match config.failure_retry.as_mut() {
                Some(policy) => policy.should_result_retry = Some(predicate.clone()),
                None => config.should_result_retry = Some(predicate.clone()),
            }
        }

        let snapshot = self.read_registries().snapshot(&config);
        info!(
            key = reader.key().unwrap_or_default(),
            options = snapshot.suite.len(),
            stream_options = snapshot.stream_suite.len(),
            call_options = snapshot.call_options.len(),
            stream_call_options = snapshot.stream_call_options.len(),
            "Client options loaded"
        );
        self.snapshot.store(Some(Arc::new(snapshot)));
        Ok(())
    }

    /// The document of the last successful load.
    pub async fn config(&self) -> Result<Doc<E>, LoadError> {
        self.reader
            .lock()
            .await
            .config()
            .cloned()
            .map_err(|_| LoadError::NotLoaded)
    }

    pub fn register_translator<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(&Doc<E>) -> Result<Vec<ClientOption>, TranslateError> + Send + Sync + 'static,
    {
        self.write_registries().translators.register(name, translator(f));
    }

    pub fn deregister_translator(&self, name: &str) -> bool {
        self.write_registries().translators.deregister(name)
    }

    pub fn register_stream_translator<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(&Doc<E>) -> Result<Vec<StreamOption>, TranslateError> + Send + Sync + 'static,
    {
        self.write_registries()
            .stream_translators
            .register(name, translator(f));
    }

    pub fn deregister_stream_translator(&self, name: &str) -> bool {
        self.write_registries().stream_translators.deregister(name)
    }

    pub fn register_call_option_translator<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(&Doc<E>) -> Result<Option<CallOption>, TranslateError> + Send + Sync + 'static,
    {
        self.write_registries()
            .call_options
            .register(name, call_option_translator(f));
    }

    pub fn deregister_call_option_translator(&self, name: &str) -> bool {
        self.write_registries().call_options.deregister(name)
    }

    pub fn register_call_option_map_translator<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(&Doc<E>) -> Result<IndexMap<String, CallOption>, TranslateError>
            + Send
            + Sync
            + 'static,
    {
        self.write_registries()
            .call_option_maps
            .register(name, call_option_map_translator(f));
    }

    pub fn deregister_call_option_map_translator(&self, name: &str) -> bool {
        self.write_registries().call_option_maps.deregister(name)
    }

    pub fn register_stream_call_option_translator<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(&Doc<E>) -> Result<Option<StreamCallOption>, TranslateError>
            + Send
            + Sync
            + 'static,
    {
        self.write_registries()
            .stream_call_options
            .register(name, call_option_translator(f));
    }

    pub fn deregister_stream_call_option_translator(&self, name: &str) -> bool {
        self.write_registries().stream_call_options.deregister(name)
    }

    pub fn register_stream_call_option_map_translator<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(&Doc<E>) -> Result<IndexMap<String, StreamCallOption>, TranslateError>
            + Send
            + Sync
            + 'static,
    {
        self.write_registries()
            .stream_call_option_maps
            .register(name, call_option_map_translator(f));
    }

    pub fn deregister_stream_call_option_map_translator(&self, name: &str) -> bool {
        self.write_registries().stream_call_option_maps.deregister(name)
    }

    /// Names of the client translators in the order they run.
    pub fn translator_names(&self) -> Vec<String> {
        self.read_registries().translators.names()
    }
}

impl<E> ClientLoader<E> {
    pub fn snapshot(&self) -> Result<Arc<ClientSnapshot>, LoadError> {
        self.snapshot.load_full().ok_or(LoadError::NotLoaded)
    }

    pub fn suite(&self) -> Result<ClientSuite, LoadError> {
        Ok(self.snapshot()?.suite.clone())
    }

    pub fn stream_suite(&self) -> Result<StreamSuite, LoadError> {
        Ok(self.snapshot()?.stream_suite.clone())
    }

    pub fn call_options(&self) -> Result<CallOptions<CallOption>, LoadError> {
        Ok(self.snapshot()?.call_options.clone())
    }

    pub fn call_option(&self, name: &str) -> Result<Option<CallOption>, LoadError> {
        Ok(self.snapshot()?.call_options.get(name).cloned())
    }

    pub fn stream_call_options(&self) -> Result<CallOptions<StreamCallOption>, LoadError> {
        Ok(self.snapshot()?.stream_call_options.clone())
    }

    pub fn stream_call_option(&self, name: &str) -> Result<Option<StreamCallOption>, LoadError> {
        Ok(self.snapshot()?.stream_call_options.get(name).cloned())
    }

    fn read_registries(&self) -> RwLockReadGuard<'_, Registries<E>> {
        self.registries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_registries(&self) -> RwLockWriteGuard<'_, Registries<E>> {
        self.registries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::error::{FetchError, ReaderError};
    use crate::reader::ReaderOptions;
    use crate::store::KvStore;

    #[derive(Default)]
    struct MapStore {
        values: StdMutex<HashMap<String, Vec<u8>>>,
    }

    impl MapStore {
        fn put(&self, key: &str, value: &str) {
            self.values.lock().unwrap().insert(key.to_string(), value.as_bytes().to_vec());
        }

        fn remove(&self, key: &str) {
            self.values.lock().unwrap().remove(key);
        }
    }

    #[async_trait]
    impl KvStore for MapStore {
        async fn get(&self, key: &str) -> Result<Vec<u8>, FetchError> {
            self.values
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .ok_or_else(|| FetchError::KeyNotFound(key.to_string()))
        }

        fn name(&self) -> &'static str {
            "map"
        }
    }

    const KEY: &str = "KitexConfig/caller/echo";

    fn loader(store: Arc<MapStore>, options: ClientLoaderOptions) -> ClientLoader {
        let reader = Reader::with_store(store, ReaderOptions::default()).unwrap();
        ClientLoader::new("caller", "echo", reader, options)
    }

    #[tokio::test]
    async fn accessors_fail_before_first_load() {
        let loader = loader(Arc::new(MapStore::default()), ClientLoaderOptions::default());
        assert!(matches!(loader.suite(), Err(LoadError::NotLoaded)));
        assert!(matches!(loader.stream_suite(), Err(LoadError::NotLoaded)));
        assert!(matches!(loader.call_option("x"), Err(LoadError::NotLoaded)));
        assert!(matches!(loader.config().await, Err(LoadError::NotLoaded)));
    }

    #[tokio::test]
    async fn loads_client_and_call_options() {
        let store = Arc::new(MapStore::default());
        store.put(
            KEY,
            r#"{
                "HostPorts": ["127.0.0.1:8888"],
                "RPCTimeout": "2s",
                "CallOpt": {"HostPorts": {"primary": "10.0.0.1:80"}, "RPCTimeout": "1s"},
                "Stream": {"DestService": "echo"},
                "StreamCallOpt": {"CompressorName": "gzip"}
            }"#,
        );
        let loader = loader(store, ClientLoaderOptions::default());
        loader.load().await.unwrap();

        assert_eq!(
            loader.suite().unwrap().options(),
            vec![
                ClientOption::HostPorts(vec!["127.0.0.1:8888".into()]),
                ClientOption::RpcTimeout(Duration::from_secs(2)),
            ]
        );
        assert_eq!(
            loader.stream_suite().unwrap().options(),
            vec![StreamOption::DestService("echo".into())]
        );
        assert_eq!(
            loader.call_option("primary").unwrap(),
            Some(CallOption::HostPort("10.0.0.1:80".into()))
        );
        assert_eq!(
            loader.call_option("callOptionRPCTimeout").unwrap(),
            Some(CallOption::RpcTimeout(Duration::from_secs(1)))
        );
        assert_eq!(
            loader.stream_call_option("streamCallOptionGRPCCompressor").unwrap(),
            Some(StreamCallOption::GrpcCompressor("gzip".into()))
        );
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_snapshot() {
        let store = Arc::new(MapStore::default());
        store.put(KEY, r#"{"DestService": "echo"}"#);
        let loader = loader(store.clone(), ClientLoaderOptions::default());
        loader.load().await.unwrap();
        let before = loader.snapshot().unwrap();

        store.remove(KEY);
        let err = loader.load().await.unwrap_err();
        assert!(matches!(
            err,
            LoadError::Reader(ReaderError::Fetch { source: FetchError::KeyNotFound(_), .. })
        ));
        assert_eq!(loader.snapshot().unwrap(), before);
        assert_eq!(loader.config().await.unwrap().dest_service.as_deref(), Some("echo"));
    }

    #[tokio::test]
    async fn user_translator_replaces_builtin_in_place() {
        let store = Arc::new(MapStore::default());
        store.put(KEY, r#"{"DestService": "echo", "HostPorts": ["a:1"]}"#);

        let options = ClientLoaderOptions {
            translators: vec![(
                "hostPorts".to_string(),
                translator(|_: &ClientConfig| Ok(vec![ClientOption::HostPorts(vec!["b:2".into()])])),
            )],
            ..ClientLoaderOptions::default()
        };
        let loader = loader(store, options);
        assert_eq!(loader.translator_names().len(), 13);
        assert_eq!(loader.translator_names()[1], "hostPorts");

        loader.register_translator("custom", |config: &ClientConfig| {
            Ok(vec![ClientOption::Custom {
                name: "dest".into(),
                value: serde_json::json!(config.dest_service),
            }])
        });
        assert!(loader.deregister_translator("destService"));
        loader.load().await.unwrap();

        assert_eq!(
            loader.suite().unwrap().options(),
            vec![
                ClientOption::HostPorts(vec!["b:2".into()]),
                ClientOption::Custom {
                    name: "dest".into(),
                    value: serde_json::json!("echo"),
                },
            ]
        );
    }

    #[tokio::test]
    async fn predicate_goes_to_failure_policy_when_present() {
        let store = Arc::new(MapStore::default());
        store.put(KEY, r#"{"FailureRetry": {"StopPolicy": {"MaxRetryTimes": 2}}}"#);
        let predicate = ShouldResultRetry::on_error(|e| e.contains("busy"));
        let options = ClientLoaderOptions {
            should_result_retry: Some(predicate.clone()),
            ..ClientLoaderOptions::default()
        };
        let loader = loader(store.clone(), options);
        loader.load().await.unwrap();

        let suite = loader.suite().unwrap().options();
        assert_eq!(suite.len(), 1);
        match &suite[0] {
            ClientOption::FailureRetry(policy) => {
                assert_eq!(policy.should_result_retry.as_ref(), Some(&predicate));
            }
            other => panic!("unexpected option {:?}", other),
        }
        // The reader's copy is untouched.
        let config = loader.config().await.unwrap();
        assert!(config.failure_retry.unwrap().should_result_retry.is_none());

        store.put(KEY, "{}");
        loader.load().await.unwrap();
        assert_eq!(
            loader.suite().unwrap().options(),
            vec![ClientOption::SpecifiedResultRetry(predicate)]
        );
    }
}
