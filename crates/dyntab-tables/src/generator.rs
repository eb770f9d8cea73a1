use dyntab_repo::{AcpiTableInfo, ConfigRepository};
use dyntab_types::{GeneratorId, Revision, Signature};

use crate::error::{TableError, TableResult};
use crate::header::ACPI_HEADER_LEN;
use crate::table::AcpiTable;

/// Creator id reported by the built-in ARM generators.
pub const CREATOR_ID_ARM: u32 = u32::from_le_bytes(*b"ARMH");

/// Creator revision reported by the built-in generators.
pub const GENERATOR_REVISION: Revision = Revision::new(1, 0);

/// A table generator.
///
/// Every generator declares the one signature it produces and the range of
/// table revisions it can emit. `build` must reject requests outside that
/// range, gather its objects from the repository, and either return a
/// complete table or an error. A partial table is never returned.
pub trait Generator: Send + Sync {
    fn id(&self) -> GeneratorId;

    /// Short human-readable description.
    fn description(&self) -> &'static str;

    /// Signature of the produced table.
    fn signature(&self) -> Signature;

    /// Newest table revision this generator can emit.
    fn revision(&self) -> u8;

    /// Oldest table revision this generator can emit.
    fn min_revision(&self) -> u8;

    fn creator_id(&self) -> u32 {
        CREATOR_ID_ARM
    }

    fn creator_revision(&self) -> Revision {
        GENERATOR_REVISION
    }

    /// Build the table described by `request`.
    fn build(&self, request: &AcpiTableInfo, repo: &dyn ConfigRepository)
        -> TableResult<AcpiTable>;

    /// Release a table returned by [`build`](Self::build).
    fn free_resources(&self, table: AcpiTable) -> TableResult<()> {
        if table.len() < ACPI_HEADER_LEN {
            return Err(TableError::InvalidParameter(format!(
                "{}: table of {} bytes was not built by this generator",
                self.signature(),
                table.len()
            )));
        }
        if table.signature() != Some(self.signature()) {
            return Err(TableError::InvalidParameter(format!(
                "{}: cannot free a {:?} table",
                self.signature(),
                table.signature()
            )));
        }
        Ok(())
    }

    /// Validate generator id, signature, and requested revision.
    fn check_request(&self, request: &AcpiTableInfo) -> TableResult<()> {
        if request.generator_id != self.id() {
            return Err(TableError::InvalidParameter(format!(
                "request for generator {} sent to {}",
                request.generator_id,
                self.id()
            )));
        }
        if request.signature != self.signature() {
            return Err(TableError::InvalidParameter(format!(
                "request for {} sent to the {} generator",
                request.signature,
                self.signature()
            )));
        }
        if request.revision < self.min_revision() || request.revision > self.revision() {
            tracing::error!(
                "{}: requested table revision {} is not supported (minimum {}, maximum {})",
                self.signature(),
                request.revision,
                self.min_revision(),
                self.revision()
            );
            return Err(TableError::InvalidParameter(format!(
                "{} revision {} outside {}..={}",
                self.signature(),
                request.revision,
                self.min_revision(),
                self.revision()
            )));
        }
        Ok(())
    }
}
