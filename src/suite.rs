use indexmap::IndexMap;

/// An immutable, ordered bundle of option values produced by one load.
#[derive(Debug, Clone, PartialEq)]
pub struct Suite<O> {
    opts: Vec<O>,
}

impl<O: Clone> Suite<O> {
    pub fn new(opts: Vec<O>) -> Self {
        Self { opts }
    }

    /// Returns a copy of the options so callers cannot alter the suite.
    pub fn options(&self) -> Vec<O> {
        self.opts.clone()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, O> {
        self.opts.iter()
    }

    pub fn len(&self) -> usize {
        self.opts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opts.is_empty()
    }
}

impl<O> Default for Suite<O> {
    fn default() -> Self {
        Self { opts: Vec::new() }
    }
}

/// Named per-call options, looked up by the name they were registered under.
#[derive(Debug, Clone, PartialEq)]
pub struct CallOptions<O> {
    entries: IndexMap<String, O>,
}

impl<O> CallOptions<O> {
    pub fn new(entries: IndexMap<String, O>) -> Self {
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&O> {
        self.entries.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, O> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<O> Default for CallOptions<O> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}
