//! Name-keyed, insertion-ordered translator registries.
//!
//! Iteration order is registration order, so the order of options in a suite
//! is deterministic. Re-registering a name replaces the translator but keeps
//! its original position.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{error, warn};

use crate::error::TranslateError;
use crate::metrics::TRANSLATOR_ERRORS;

/// Maps a config document to zero or more options.
pub type Translator<D, O> = Arc<dyn Fn(&D) -> Result<Vec<O>, TranslateError> + Send + Sync>;

/// Maps a config document to at most one option, stored under the
/// translator's own name.
pub type CallOptionTranslator<D, O> =
    Arc<dyn Fn(&D) -> Result<Option<O>, TranslateError> + Send + Sync>;

/// Maps a config document to a set of named options.
pub type CallOptionMapTranslator<D, O> =
    Arc<dyn Fn(&D) -> Result<IndexMap<String, O>, TranslateError> + Send + Sync>;

pub fn translator<D, O, F>(f: F) -> Translator<D, O>
where
    F: Fn(&D) -> Result<Vec<O>, TranslateError> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn call_option_translator<D, O, F>(f: F) -> CallOptionTranslator<D, O>
where
    F: Fn(&D) -> Result<Option<O>, TranslateError> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn call_option_map_translator<D, O, F>(f: F) -> CallOptionMapTranslator<D, O>
where
    F: Fn(&D) -> Result<IndexMap<String, O>, TranslateError> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Clone)]
pub struct Registry<T> {
    kind: &'static str,
    entries: IndexMap<String, T>,
}

impl<T> Registry<T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: IndexMap::new(),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Inserts or replaces `name`, returning the replaced entry.
    pub fn register(&mut self, name: impl Into<String>, translator: T) -> Option<T> {
        self.entries.insert(name.into(), translator)
    }

    pub fn deregister(&mut self, name: &str) -> bool {
        self.entries.shift_remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn report(&self, name: &str, err: &TranslateError) {
        TRANSLATOR_ERRORS.with_label_values(&[self.kind]).inc();
        error!(registry = self.kind, translator = %name, %err, "Translator failed, skipping its options");
    }
}

impl<D, O> Registry<Translator<D, O>> {
    /// Runs every translator in order and concatenates their options.
    /// A failing translator is logged and contributes nothing.
    pub fn translate(&self, config: &D) -> Vec<O> {
        let mut options = Vec::new();
        for (name, translator) in &self.entries {
            match translator(config) {
                Ok(opts) => options.extend(opts),
                Err(err) => self.report(name, &err),
            }
        }
        options
    }
}

impl<D, O> Registry<CallOptionTranslator<D, O>> {
    pub fn collect_call_options(&self, config: &D, out: &mut IndexMap<String, O>) {
        for (name, translator) in &self.entries {
            match translator(config) {
                Ok(Some(opt)) => insert_call_option(self.kind, out, name.clone(), opt),
                Ok(None) => {}
                Err(err) => self.report(name, &err),
            }
        }
    }
}

impl<D, O> Registry<CallOptionMapTranslator<D, O>> {
    pub fn collect_call_option_maps(&self, config: &D, out: &mut IndexMap<String, O>) {
        for (name, translator) in &self.entries {
            match translator(config) {
                Ok(opts) => {
                    for (opt_name, opt) in opts {
                        insert_call_option(self.kind, out, opt_name, opt);
                    }
                }
                Err(err) => self.report(name, &err),
            }
        }
    }
}

fn insert_call_option<O>(kind: &str, out: &mut IndexMap<String, O>, name: String, opt: O) {
    if out.contains_key(&name) {
        warn!(registry = kind, call_option = %name, "Call option name already used, overwriting");
    }
    out.insert(name, opt);
}
