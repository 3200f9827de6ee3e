//! # datalib
//!
//! A Rust library for reading typed entity data out of DL binary containers.
//!
//! ## Overview
//!
//! Game data ships as a handful of DL blobs addressed by 64-bit resource
//! hashes. This library provides:
//!
//! - Parsing the runtime type library and checking compiled-in component
//!   layouts against it
//! - Locating framed instances and tokenizing the entities stream
//! - Resolving an entity's component record through the per-type tables
//! - Applying recorded entity deltas to a copy of that record
//! - Reverse-mapping add-path keys through the hash lookup blob
//!
//! Blobs are supplied by the caller through [`BlobProvider`]; the library never
//! opens archives or files itself.
//!
//! ## Example
//!
//! ```rust,no_run
//! use datalib::{ComponentKind, ComponentRecord, DataLibrary, MemoryBlobs, ResourceHash, TypeHash};
//!
//! struct Health {
//!     max: u32,
//! }
//!
//! impl ComponentRecord for Health {
//!     const KIND: ComponentKind = ComponentKind::new(
//!         "HealthComponent",
//!         TypeHash::from_name("HealthComponent"),
//!         TypeHash::from_name("HealthComponentIndexEntry"),
//!         TypeHash::from_name("HealthComponentData"),
//!         4,
//!     );
//!
//!     fn decode(raw: &[u8]) -> datalib::Result<Self> {
//!         Ok(Health { max: u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) })
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     let blobs = MemoryBlobs::new(); // filled by the archive reader
//!     let library = DataLibrary::new(blobs);
//!
//!     let health: Health = library.component(ResourceHash::from_name("entities/crate_small"))?;
//!     println!("max health {}", health.max);
//!     Ok(())
//! }
//! ```

pub mod datalib;
pub mod error;
pub mod hash;
pub mod lookup;
pub mod provider;
pub mod utils;

pub use datalib::{
    ComponentIndexMap, ComponentKind, ComponentRecord, ComponentTable, DataLibrary,
    DataLibraryOptions, DeltaPatcher, DiagnosticsSnapshot, EntityDeltaSettings, EntityDeltaStore,
    HashLookupTable, TypeSchema, TypeSchemaRegistry,
};
pub use error::{Error, Result};
pub use hash::{murmur64a, ResourceHash, ThinHash, TypeHash};
pub use lookup::{HashLookup, NoLookup, StringsLookup, ThinHashLookup};
pub use provider::{BlobProvider, MemoryBlobs};
