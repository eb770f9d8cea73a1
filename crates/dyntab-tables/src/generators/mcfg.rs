use dyntab_repo::{AcpiTableInfo, ConfigRepository};
use dyntab_types::{GeneratorId, Signature, StdAcpiTableId};

use crate::error::TableResult;
use crate::generator::Generator;
use crate::header::ACPI_HEADER_LEN;
use crate::layout::{boxed, Category, LayoutEngine, LayoutNode, PopulateContext};
use crate::objects::PciConfigSpaceInfo;
use crate::table::AcpiTable;
use crate::wire::WireWriter;

const MCFG_REVISION: u8 = 1;
const MCFG_HEADER_LEN: usize = ACPI_HEADER_LEN + 8;
const ALLOCATION_LEN: u64 = 16;

/// PCI Express memory-mapped configuration space table.
pub struct McfgGenerator {
    engine: LayoutEngine,
}

impl McfgGenerator {
    pub fn new() -> Self {
        let engine = LayoutEngine::new(MCFG_HEADER_LEN).category(
            Category::<PciConfigSpaceInfo>::new("PCI configuration space", |info| {
                boxed(ConfigSpace(info))
            })
            .required(),
        );
        Self { engine }
    }
}

impl Default for McfgGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for McfgGenerator {
    fn id(&self) -> GeneratorId {
        GeneratorId::std_acpi(StdAcpiTableId::Mcfg)
    }

    fn description(&self) -> &'static str {
        "ACPI.STD.MCFG.GENERATOR"
    }

    fn signature(&self) -> Signature {
        Signature::from_bytes(*b"MCFG")
    }

    fn revision(&self) -> u8 {
        MCFG_REVISION
    }

    fn min_revision(&self) -> u8 {
        MCFG_REVISION
    }

    fn build(
        &self,
        request: &AcpiTableInfo,
        repo: &dyn ConfigRepository,
    ) -> TableResult<AcpiTable> {
        super::build_table(self, &self.engine, request, repo, |w, _| w.reserved(8))
    }
}

/// Configuration space base address allocation structure.
#[derive(Debug)]
struct ConfigSpace(PciConfigSpaceInfo);

impl LayoutNode for ConfigSpace {
    fn size(&self) -> TableResult<u64> {
        Ok(ALLOCATION_LEN)
    }

    fn populate(&self, out: &mut [u8], _cx: &PopulateContext<'_>) -> TableResult<()> {
        let info = &self.0;
        let mut w = WireWriter::new(out);
        w.u64(info.base_address)?;
        w.u16(info.pci_segment_group_number)?;
        w.u8(info.start_bus_number)?;
        w.u8(info.end_bus_number)?;
        w.reserved(4)?;
        w.finish()
    }
}
