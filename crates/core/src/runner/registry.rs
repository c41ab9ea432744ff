use std::{collections::BTreeMap, fmt};

use crate::demo::{Control, Demo, DemoContext, DemoKind, DemoMetadata, DemoOptions};

/// Builds a fresh demo instance from merged options.
pub type DemoConstructor = Box<dyn Fn(&DemoContext) -> Box<dyn Demo>>;

/// Everything the runner needs to list and instantiate one demo.
pub struct DemoEntry {
    pub metadata: DemoMetadata,
    pub controls: Vec<Control>,
    pub defaults: DemoOptions,
    constructor: DemoConstructor,
}

impl DemoEntry {
    pub fn new(
        metadata: DemoMetadata,
        controls: Vec<Control>,
        defaults: DemoOptions,
        constructor: DemoConstructor,
    ) -> Self {
        Self {
            metadata,
            controls,
            defaults,
            constructor,
        }
    }

    /// Entry for a [`DemoKind`] implementation.
    pub fn of<D: DemoKind>() -> Self {
        Self::new(
            D::metadata(),
            D::controls(),
            D::default_options(),
            Box::new(|context: &DemoContext| -> Box<dyn Demo> { Box::new(D::create(context)) }),
        )
    }

    pub fn construct(&self, context: &DemoContext) -> Box<dyn Demo> {
        (self.constructor)(context)
    }
}

impl fmt::Debug for DemoEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DemoEntry")
            .field("metadata", &self.metadata)
            .field("controls", &self.controls.len())
            .field("defaults", &self.defaults)
            .finish()
    }
}

/// Id → demo table, ordered by id for stable listings.
#[derive(Debug, Default)]
pub struct DemoRegistry {
    entries: BTreeMap<String, DemoEntry>,
}

impl DemoRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `entry` under `id`, replacing any previous entry.
    pub fn register(&mut self, id: impl Into<String>, entry: DemoEntry) {
        let id = id.into();
        if self.entries.insert(id.clone(), entry).is_some() {
            tracing::debug!(%id, "replaced registered demo");
        }
    }

    pub fn register_kind<D: DemoKind>(&mut self, id: impl Into<String>) {
        self.register(id, DemoEntry::of::<D>());
    }

    /// Returns the entry registered under `id`.
    pub fn get(&self, id: &str) -> Option<&DemoEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DemoEntry)> {
        self.entries.iter().map(|(id, entry)| (id.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
