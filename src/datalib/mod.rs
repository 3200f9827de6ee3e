//! DL binary container parsers
//!
//! DL is the engine's instance container format. Every blob is a run of
//! framed instances, each introduced by a 12-byte header:
//!
//! | Offset | Size | Field          |
//! |--------|------|----------------|
//! | 0      | 4    | magic `"LDLD"` |
//! | 4      | 4    | type hash      |
//! | 8      | 4    | payload size   |
//!
//! On top of that framing this module provides:
//! - the runtime type library ([`TypeSchemaRegistry`])
//! - per-type component tables ([`ComponentTable`])
//! - the component index map of the entities stream ([`ComponentIndexMap`])
//! - entity deltas and their patcher ([`EntityDeltaStore`], [`DeltaPatcher`])
//! - the add-path reverse map ([`HashLookupTable`])
//!
//! [`DataLibrary`] builds all of them lazily from a [`BlobProvider`](crate::BlobProvider).

mod component;
mod definitions;
mod delta;
mod hash_lookup;
mod header;
mod library;
mod schema;
mod stream;
mod types;

#[cfg(test)]
pub(crate) mod fixtures;

pub use component::{ComponentKind, ComponentRecord, ComponentTable};
pub use definitions::{
    ComponentDeltaSettingsRow, ComponentIndexEntry, DeltaRow, DlInstanceHeader, EntityDeltaMapEntry,
    EntityDeltaSettingsRow, SectionDescriptor, DL_MAGIC,
};
pub use delta::{
    parse_delta_store, ByteRangePatch, ComponentDeltaSettings, DeltaPatcher, EntityDeltaSettings,
    EntityDeltaStore, PatchReport, ENTITY_DELTA_STORE_TYPE, SECTION_COUNT,
};
pub use hash_lookup::{parse_hash_lookup, HashLookupTable, HASH_LOOKUP_SENTINEL};
pub use header::{locate_instance, InstanceFrame};
pub use library::{DataLibrary, DataLibraryOptions, Diagnostics, DiagnosticsSnapshot};
pub use schema::{Member, TypeSchema, TypeSchemaRegistry};
pub use stream::{
    build_component_index_map, ComponentIndexMap, InstanceStream, StreamItem, StreamState,
};
pub use types::{AtomKind, StorageKind};
