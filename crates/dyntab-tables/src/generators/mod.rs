//! Built-in table generators.

mod iort;
mod madt;
mod mcfg;
mod srat;

pub use iort::IortGenerator;
pub use madt::MadtGenerator;
pub use mcfg::McfgGenerator;
pub use srat::SratGenerator;

use dyntab_repo::{AcpiTableInfo, ConfigRepository, ManagerInfo, RepositoryExt};

use crate::error::TableResult;
use crate::generator::Generator;
use crate::header::AcpiHeader;
use crate::layout::{LayoutEngine, LayoutPlan};
use crate::table::AcpiTable;
use crate::wire::WireWriter;

/// Run a layout engine and prepend the table header.
///
/// `write_fields` writes the table-specific header fields that follow the
/// 36-byte shared header; together they must fill `engine.header_len()`.
pub(crate) fn build_table(
    generator: &dyn Generator,
    engine: &LayoutEngine,
    request: &AcpiTableInfo,
    repo: &dyn ConfigRepository,
    write_fields: impl FnOnce(&mut WireWriter<'_>, &LayoutPlan) -> TableResult<()>,
) -> TableResult<AcpiTable> {
    generator.check_request(request)?;
    let info: ManagerInfo = repo.get_object()?;

    let plan = engine.plan(repo)?;
    let mut bytes = plan.populate(repo, request.revision)?;
    let header = AcpiHeader::for_request(generator, request, &info, bytes.len())?;

    let mut w = WireWriter::new(&mut bytes[..engine.header_len()]);
    header.write(&mut w)?;
    write_fields(&mut w, &plan)?;
    w.finish()?;

    tracing::info!(
        signature = %generator.signature(),
        revision = request.revision,
        nodes = plan.node_count(),
        len = bytes.len(),
        "built table"
    );
    Ok(AcpiTable::new(bytes))
}
