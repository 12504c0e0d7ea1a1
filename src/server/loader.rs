//! Server loader: fetches the server document and turns it into a suite.

use std::sync::{Arc, PoisonError, RwLock};

use arc_swap::ArcSwapOption;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::config::ServerConfig;
use super::option::ServerOption;
use super::translator::builtin_translators;
use crate::decoder::{Extension, NoExtension};
use crate::error::{LoadError, TranslateError};
use crate::metrics::{LOADS_TOTAL, LOAD_FAILURES};
use crate::reader::Reader;
use crate::registry::{translator, Registry, Translator};
use crate::suite::Suite;
use crate::template::PathParams;

pub type ServerSuite = Suite<ServerOption>;

pub struct ServerLoaderOptions<E = NoExtension> {
    /// Registered after the built-ins.
    pub translators: Vec<(String, Translator<ServerConfig<E>, ServerOption>)>,
}

impl<E> Default for ServerLoaderOptions<E> {
    fn default() -> Self {
        Self {
            translators: Vec::new(),
        }
    }
}

pub struct ServerLoader<E = NoExtension> {
    reader: Mutex<Reader<ServerConfig<E>>>,
    params: PathParams,
    translators: RwLock<Registry<Translator<ServerConfig<E>, ServerOption>>>,
    suite: ArcSwapOption<ServerSuite>,
}

impl<E: Extension> ServerLoader<E> {
    pub fn new(
        server_service_name: impl Into<String>,
        reader: Reader<ServerConfig<E>>,
        options: ServerLoaderOptions<E>,
    ) -> Self {
        let mut translators = builtin_translators();
        for (name, t) in options.translators {
            translators.register(name, t);
        }
        Self {
            reader: Mutex::new(reader),
            params: PathParams::server(server_service_name),
            translators: RwLock::new(translators),
            suite: ArcSwapOption::empty(),
        }
    }

    pub async fn load(&self) -> Result<(), LoadError> {
        LOADS_TOTAL.inc();

        let mut reader = self.reader.lock().await;
        if let Err(err) = reader.read_to_config(&self.params).await {
            LOAD_FAILURES.inc();
            warn!(server = %self.params.server_service_name, %err, "Load failed, keeping previous options");
            return Err(err.into());
        }

        let config = reader.config()?;
        let suite = Suite::new(
            self.translators
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .translate(config),
        );
        info!(
            key = reader.key().unwrap_or_default(),
            options = suite.len(),
            "Server options loaded"
        );
        self.suite.store(Some(Arc::new(suite)));
        Ok(())
    }

    pub async fn config(&self) -> Result<ServerConfig<E>, LoadError> {
        self.reader
            .lock()
            .await
            .config()
            .cloned()
            .map_err(|_| LoadError::NotLoaded)
    }

    pub fn register_translator<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(&ServerConfig<E>) -> Result<Vec<ServerOption>, TranslateError> + Send + Sync + 'static,
    {
        self.translators
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register(name, translator(f));
    }

    pub fn deregister_translator(&self, name: &str) -> bool {
        self.translators
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .deregister(name)
    }

    pub fn translator_names(&self) -> Vec<String> {
        self.translators
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .names()
    }
}

impl<E> ServerLoader<E> {
    pub fn suite(&self) -> Result<ServerSuite, LoadError> {
        self.suite
            .load_full()
            .map(|suite| suite.as_ref().clone())
            .ok_or(LoadError::NotLoaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::reader::ReaderOptions;
    use crate::store::FileStore;

    #[tokio::test]
    async fn loads_from_files() {
        let root = std::env::temp_dir().join(format!("optionloader-server-{}", std::process::id()));
        tokio::fs::create_dir_all(&root).await.unwrap();
        tokio::fs::write(
            root.join("echo"),
            r#"{"MuxTransport": true, "ReadWriteTimeout": "3s", "StatsLevel": 9}"#,
        )
        .await
        .unwrap();

        let reader = Reader::with_store(
            Arc::new(FileStore::new(root.clone())),
            ReaderOptions {
                prefix: Some(String::new()),
                ..ReaderOptions::default()
            },
        )
        .unwrap();
        let loader: ServerLoader = ServerLoader::new("echo", reader, ServerLoaderOptions::default());
        assert!(matches!(loader.suite(), Err(LoadError::NotLoaded)));

        loader.load().await.unwrap();
        assert_eq!(
            loader.suite().unwrap().options(),
            vec![
                ServerOption::MuxTransport,
                ServerOption::ReadWriteTimeout(Duration::from_secs(3)),
            ]
        );

        loader.register_translator("statsLevel", |_: &ServerConfig| Ok(vec![]));
        loader.register_translator("marker", |_: &ServerConfig| {
            Ok(vec![ServerOption::Custom {
                name: "marker".into(),
                value: serde_json::Value::Bool(true),
            }])
        });
        loader.load().await.unwrap();
        assert_eq!(loader.suite().unwrap().len(), 3);
        assert_eq!(loader.translator_names()[6], "statsLevel");

        tokio::fs::remove_file(root.join("echo")).await.unwrap();
        assert!(loader.load().await.is_err());
        assert_eq!(loader.suite().unwrap().len(), 3);

        tokio::fs::remove_dir_all(&root).await.ok();
    }
}
