//! Lazily-built DL context
//!
//! [`DataLibrary`] owns the blob provider and every structure derived from
//! the shipped blobs. Each structure is built on first use, exactly once, and
//! shared read-only afterwards. A failed build is not cached: the next call
//! tries again.

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::datalib::component::{ComponentKind, ComponentRecord, ComponentTable};
use crate::datalib::delta::{DeltaPatcher, EntityDeltaSettings, EntityDeltaStore};
use crate::datalib::hash_lookup::HashLookupTable;
use crate::datalib::schema::TypeSchemaRegistry;
use crate::datalib::stream::ComponentIndexMap;
use crate::error::{Error, Result};
use crate::hash::{ResourceHash, TypeHash};
use crate::provider::BlobProvider;

/// Well-known blobs the library asks its provider for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLibraryOptions {
    /// Runtime type library
    pub type_library: ResourceHash,
    /// Entities stream holding every component table
    pub entities: ResourceHash,
    /// Entity delta store
    pub entity_deltas: ResourceHash,
    /// Hash lookup trees
    pub hash_lookup: ResourceHash,
}

impl Default for DataLibraryOptions {
    fn default() -> Self {
        Self {
            type_library: ResourceHash::from_name("generated/type_library"),
            entities: ResourceHash::from_name("generated/entities"),
            entity_deltas: ResourceHash::from_name("generated/entity_deltas"),
            hash_lookup: ResourceHash::from_name("generated/hash_lookup"),
        }
    }
}

impl DataLibraryOptions {
    pub fn with_type_library(mut self, id: ResourceHash) -> Self {
        self.type_library = id;
        self
    }

    pub fn with_entities(mut self, id: ResourceHash) -> Self {
        self.entities = id;
        self
    }

    pub fn with_entity_deltas(mut self, id: ResourceHash) -> Self {
        self.entity_deltas = id;
        self
    }

    pub fn with_hash_lookup(mut self, id: ResourceHash) -> Self {
        self.hash_lookup = id;
        self
    }
}

/// Counters for input the library tolerated instead of rejecting
#[derive(Debug, Default)]
pub struct Diagnostics {
    unknown_delta_indices: AtomicU64,
    unknown_entity_components: AtomicU64,
}

impl Diagnostics {
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            unknown_delta_indices: self.unknown_delta_indices.load(Ordering::Relaxed),
            unknown_entity_components: self.unknown_entity_components.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the tolerance counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticsSnapshot {
    /// Delta component settings whose index had no known type
    pub unknown_delta_indices: u64,
    /// Entity component indices missing from the component index map
    pub unknown_entity_components: u64,
}

/// Entry point for reading typed entity data out of DL blobs
///
/// # Example
///
/// ```rust,no_run
/// use datalib::{DataLibrary, MemoryBlobs};
///
/// # fn load(_: &str) -> Vec<u8> { Vec::new() }
/// let options = datalib::DataLibraryOptions::default();
/// let blobs = MemoryBlobs::new()
///     .with_blob(options.type_library, load("type_library"))
///     .with_blob(options.entities, load("entities"));
/// let library = DataLibrary::with_options(blobs, options);
///
/// let registry = library.type_registry()?;
/// println!("{} types", registry.len());
/// # Ok::<(), datalib::Error>(())
/// ```
pub struct DataLibrary {
    provider: Box<dyn BlobProvider>,
    options: DataLibraryOptions,

    registry: OnceCell<TypeSchemaRegistry>,
    entities: OnceCell<Vec<u8>>,
    index_map: OnceCell<ComponentIndexMap>,
    deltas: OnceCell<EntityDeltaStore>,
    hash_lookup: OnceCell<HashLookupTable>,
    /// Keyed by the whole kind so every distinct layout gets validated
    tables: DashMap<ComponentKind, Arc<OnceCell<Arc<ComponentTable>>>>,

    diagnostics: Diagnostics,
}

impl DataLibrary {
    pub fn new(provider: impl BlobProvider + 'static) -> Self {
        Self::with_options(provider, DataLibraryOptions::default())
    }

    pub fn with_options(
        provider: impl BlobProvider + 'static,
        options: DataLibraryOptions,
    ) -> Self {
        DataLibrary {
            provider: Box::new(provider),
            options,
            registry: OnceCell::new(),
            entities: OnceCell::new(),
            index_map: OnceCell::new(),
            deltas: OnceCell::new(),
            hash_lookup: OnceCell::new(),
            tables: DashMap::new(),
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn options(&self) -> &DataLibraryOptions {
        &self.options
    }

    /// The runtime type library
    pub fn type_registry(&self) -> Result<&TypeSchemaRegistry> {
        self.registry.get_or_try_init(|| {
            let data = self.provider.require(self.options.type_library)?;
            TypeSchemaRegistry::parse(&data)
        })
    }

    fn entities_blob(&self) -> Result<&[u8]> {
        self.entities
            .get_or_try_init(|| self.provider.require(self.options.entities))
            .map(Vec::as_slice)
    }

    /// Component index to table type, from the entities stream
    pub fn component_index_map(&self) -> Result<&ComponentIndexMap> {
        self.index_map
            .get_or_try_init(|| ComponentIndexMap::build(self.entities_blob()?))
    }

    /// Every entity's recorded overrides
    pub fn delta_store(&self) -> Result<&EntityDeltaStore> {
        self.deltas.get_or_try_init(|| {
            let data = self.provider.require(self.options.entity_deltas)?;
            EntityDeltaStore::parse(&data)
        })
    }

    /// Reverse map from add-path keys to resources
    pub fn hash_lookup(&self) -> Result<&HashLookupTable> {
        self.hash_lookup.get_or_try_init(|| {
            let data = self.provider.require(self.options.hash_lookup)?;
            HashLookupTable::parse(&data)
        })
    }

    /// Validated, decoded table of one component kind
    ///
    /// A layout mismatch fails this kind only; other kinds stay usable.
    pub fn component_table(&self, kind: &ComponentKind) -> Result<Arc<ComponentTable>> {
        let cell = Arc::clone(&self.tables.entry(*kind).or_default());
        let table = cell.get_or_try_init(|| {
            let table = kind.load_table(self.type_registry()?, self.entities_blob()?)?;
            tracing::debug!(
                "loaded {} table: {} rows, {} records of {} bytes",
                kind.name,
                table.entries().count(),
                table.record_count(),
                table.record_size()
            );
            Ok::<_, Error>(Arc::new(table))
        })?;
        Ok(Arc::clone(table))
    }

    /// Unpatched copy of `resource`'s record
    pub fn raw_component(&self, kind: &ComponentKind, resource: ResourceHash) -> Result<Vec<u8>> {
        let table = self.component_table(kind)?;
        table.resolve(resource).map(<[u8]>::to_vec)
    }

    /// Copy of `resource`'s record with its entity deltas applied
    pub fn patched_component(
        &self,
        kind: &ComponentKind,
        resource: ResourceHash,
    ) -> Result<Vec<u8>> {
        let raw = self.raw_component(kind, resource)?;
        let Some(settings) = self.delta_store()?.get(resource) else {
            return Ok(raw);
        };

        let patcher = DeltaPatcher::new(self.component_index_map()?);
        let (patched, report) = patcher.apply_with_report(kind.component, &raw, settings)?;
        if report.skipped_unknown_index > 0 {
            self.diagnostics
                .unknown_delta_indices
                .fetch_add(report.skipped_unknown_index as u64, Ordering::Relaxed);
        }
        tracing::trace!(
            "{} {}: {} deltas applied, {} for other components",
            kind.name,
            resource,
            report.applied,
            report.skipped_other_type
        );
        Ok(patched)
    }

    /// Resolve, patch and decode one component of `resource`
    pub fn component<T: ComponentRecord>(&self, resource: ResourceHash) -> Result<T> {
        let raw = self.patched_component(&T::KIND, resource)?;
        T::decode(&raw)
    }

    /// Recorded overrides of one entity
    pub fn entity_deltas(&self, resource: ResourceHash) -> Result<Option<&EntityDeltaSettings>> {
        Ok(self.delta_store()?.get(resource))
    }

    /// Table types of an entity's component indices, in list order
    ///
    /// Indices the component index map does not know are skipped and counted.
    pub fn entity_component_types(&self, indices: &[u32]) -> Result<Vec<TypeHash>> {
        let map = self.component_index_map()?;
        let mut types = Vec::with_capacity(indices.len());
        for &index in indices {
            match map.get(index) {
                Some(t) => types.push(t),
                None => {
                    tracing::warn!("skipping unknown component index {}", index);
                    self.diagnostics
                        .unknown_entity_components
                        .fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        Ok(types)
    }

    /// Resource behind an add-path key
    pub fn resolve_path(&self, key: u64) -> Result<Option<ResourceHash>> {
        Ok(self.hash_lookup()?.get(key))
    }

    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }
}
