use dyntab_repo::{AcpiTableInfo, CmObject, ConfigRepository, RepositoryExt};
use dyntab_types::{GeneratorId, Signature, StdAcpiTableId};

use crate::error::{TableError, TableResult};
use crate::generator::Generator;
use crate::header::ACPI_HEADER_LEN;
use crate::layout::{boxed, Category, LayoutEngine, LayoutNode, PopulateContext};
use crate::objects::{
    DeviceHandleAcpi, DeviceHandlePci, GenericInitiatorAffinityInfo, GicCInfo, GicItsInfo,
    MemoryAffinityInfo, DEVICE_HANDLE_TYPE_ACPI, DEVICE_HANDLE_TYPE_PCI,
};
use crate::table::AcpiTable;
use crate::wire::WireWriter;

const SRAT_REVISION: u8 = 3;
const SRAT_HEADER_LEN: usize = ACPI_HEADER_LEN + 12;

const MEMORY_AFFINITY_TYPE: u8 = 1;
const GICC_AFFINITY_TYPE: u8 = 3;
const ITS_AFFINITY_TYPE: u8 = 4;
const GENERIC_INITIATOR_TYPE: u8 = 5;

const MEMORY_AFFINITY_LEN: u8 = 40;
const GICC_AFFINITY_LEN: u8 = 18;
const ITS_AFFINITY_LEN: u8 = 12;
const GENERIC_INITIATOR_LEN: u8 = 32;

/// System resource affinity table.
pub struct SratGenerator {
    engine: LayoutEngine,
}

impl SratGenerator {
    pub fn new() -> Self {
        let engine = LayoutEngine::new(SRAT_HEADER_LEN)
            .category(
                Category::<GicCInfo>::new("GICC affinity", |info| boxed(GiccAffinity(info)))
                    .required(),
            )
            .category(Category::<GicItsInfo>::new("GIC ITS affinity", |info| {
                boxed(ItsAffinity(info))
            }))
            .category(Category::<MemoryAffinityInfo>::new(
                "memory affinity",
                |info| boxed(MemoryAffinity(info)),
            ))
            .category(Category::<GenericInitiatorAffinityInfo>::new(
                "generic initiator affinity",
                |info| boxed(GenericInitiator(info)),
            ));
        Self { engine }
    }
}

impl Default for SratGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for SratGenerator {
    fn id(&self) -> GeneratorId {
        GeneratorId::std_acpi(StdAcpiTableId::Srat)
    }

    fn description(&self) -> &'static str {
        "ACPI.STD.SRAT.GENERATOR"
    }

    fn signature(&self) -> Signature {
        Signature::from_bytes(*b"SRAT")
    }

    fn revision(&self) -> u8 {
        SRAT_REVISION
    }

    fn min_revision(&self) -> u8 {
        SRAT_REVISION
    }

    fn build(
        &self,
        request: &AcpiTableInfo,
        repo: &dyn ConfigRepository,
    ) -> TableResult<AcpiTable> {
        super::build_table(self, &self.engine, request, repo, |w, _| {
            // Reserved1 must be 1 for backward compatibility.
            w.u32(1)?;
            w.reserved(8)
        })
    }
}

#[derive(Debug)]
struct GiccAffinity(GicCInfo);

impl LayoutNode for GiccAffinity {
    fn size(&self) -> TableResult<u64> {
        Ok(u64::from(GICC_AFFINITY_LEN))
    }

    fn populate(&self, out: &mut [u8], _cx: &PopulateContext<'_>) -> TableResult<()> {
        let info = &self.0;
        let mut w = WireWriter::new(out);
        w.u8(GICC_AFFINITY_TYPE)?;
        w.u8(GICC_AFFINITY_LEN)?;
        w.u32(info.proximity_domain)?;
        w.u32(info.acpi_processor_uid)?;
        w.u32(info.affinity_flags)?;
        w.u32(info.clock_domain)?;
        w.finish()
    }
}

#[derive(Debug)]
struct ItsAffinity(GicItsInfo);

impl LayoutNode for ItsAffinity {
    fn size(&self) -> TableResult<u64> {
        Ok(u64::from(ITS_AFFINITY_LEN))
    }

    fn populate(&self, out: &mut [u8], _cx: &PopulateContext<'_>) -> TableResult<()> {
        let mut w = WireWriter::new(out);
        w.u8(ITS_AFFINITY_TYPE)?;
        w.u8(ITS_AFFINITY_LEN)?;
        w.u32(self.0.proximity_domain)?;
        w.reserved(2)?;
        w.u32(self.0.gic_its_id)?;
        w.finish()
    }
}

#[derive(Debug)]
struct MemoryAffinity(MemoryAffinityInfo);

impl LayoutNode for MemoryAffinity {
    fn size(&self) -> TableResult<u64> {
        Ok(u64::from(MEMORY_AFFINITY_LEN))
    }

    fn populate(&self, out: &mut [u8], _cx: &PopulateContext<'_>) -> TableResult<()> {
        let info = &self.0;
        let mut w = WireWriter::new(out);
        w.u8(MEMORY_AFFINITY_TYPE)?;
        w.u8(MEMORY_AFFINITY_LEN)?;
        w.u32(info.proximity_domain)?;
        w.reserved(2)?;
        w.u32(info.base_address as u32)?;
        w.u32((info.base_address >> 32) as u32)?;
        w.u32(info.length as u32)?;
        w.u32((info.length >> 32) as u32)?;
        w.reserved(4)?;
        w.u32(info.flags)?;
        w.reserved(8)?;
        w.finish()
    }
}

#[derive(Debug)]
struct GenericInitiator(GenericInitiatorAffinityInfo);

impl GenericInitiator {
    /// The 16-byte device handle.
    fn write_handle(&self, w: &mut WireWriter<'_>, repo: &dyn ConfigRepository) -> TableResult<()> {
        let info = &self.0;
        if info.device_handle_token.is_null() {
            tracing::error!("SRAT: generic initiator has no device handle token");
            return Err(TableError::InvalidParameter(
                "generic initiator device handle token is null".into(),
            ));
        }
        match info.device_handle_type {
            DEVICE_HANDLE_TYPE_ACPI => {
                let handle = first_handle::<DeviceHandleAcpi>(repo, info)?;
                w.u64(handle.hid)?;
                w.u32(handle.uid)?;
                w.reserved(4)
            }
            DEVICE_HANDLE_TYPE_PCI => {
                let handle = first_handle::<DeviceHandlePci>(repo, info)?;
                w.u16(handle.segment_number)?;
                w.u16(handle.bdf())?;
                w.reserved(12)
            }
            other => {
                tracing::error!(handle_type = other, "SRAT: invalid device handle type");
                Err(TableError::InvalidParameter(format!(
                    "device handle type {other}"
                )))
            }
        }
    }
}

fn first_handle<T: CmObject>(
    repo: &dyn ConfigRepository,
    info: &GenericInitiatorAffinityInfo,
) -> TableResult<T> {
    let handles: Vec<T> = repo.get_list(info.device_handle_token)?;
    if handles.len() > 1 {
        tracing::warn!(
            token = ?info.device_handle_token,
            count = handles.len(),
            "SRAT: expected one device handle, using the first"
        );
    }
    handles.into_iter().next().ok_or_else(|| {
        TableError::NotFound(format!("device handle {:?}", info.device_handle_token))
    })
}

impl LayoutNode for GenericInitiator {
    fn size(&self) -> TableResult<u64> {
        Ok(u64::from(GENERIC_INITIATOR_LEN))
    }

    fn populate(&self, out: &mut [u8], cx: &PopulateContext<'_>) -> TableResult<()> {
        let mut w = WireWriter::new(out);
        w.u8(GENERIC_INITIATOR_TYPE)?;
        w.u8(GENERIC_INITIATOR_LEN)?;
        w.reserved(1)?;
        w.u8(self.0.device_handle_type)?;
        w.u32(self.0.proximity_domain)?;
        self.write_handle(&mut w, cx.repo)?;
        w.u32(self.0.flags)?;
        w.reserved(4)?;
        w.finish()
    }
}
