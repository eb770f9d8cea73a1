//! Binary table generation from the configuration repository.
//!
//! A [`Generator`] turns repository objects into one finished table. The
//! built-in generators share a two-phase [`LayoutEngine`]: every node is
//! sized and placed before any byte is written, so cross-node references
//! can be resolved to final offsets.
//!
//! # Design Rules
//!
//! 1. A build returns a complete table or an error, never a partial table.
//! 2. Node offsets are fixed before population starts and never change.
//! 3. A missing optional category means zero nodes; a missing required
//!    category fails the build.
//! 4. Builds read from a frozen snapshot, never a repository that can change
//!    mid-build.

pub mod duplicate;
pub mod error;
pub mod generator;
pub mod generators;
pub mod header;
pub mod layout;
pub mod manager;
pub mod objects;
pub mod registry;
pub mod table;
pub mod wire;

pub use duplicate::find_duplicate;
pub use error::{TableError, TableResult};
pub use generator::{Generator, CREATOR_ID_ARM, GENERATOR_REVISION};
pub use generators::{IortGenerator, MadtGenerator, McfgGenerator, SratGenerator};
pub use header::{AcpiHeader, ACPI_HEADER_LEN};
pub use layout::{
    boxed, Category, IndexEntry, LayoutEngine, LayoutLimits, LayoutNode, LayoutPlan,
    NodeCategory, NodeIndexer, PopulateContext,
};
pub use manager::TableManager;
pub use registry::GeneratorRegistry;
pub use table::AcpiTable;
