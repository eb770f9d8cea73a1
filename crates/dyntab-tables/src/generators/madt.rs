use dyntab_repo::{AcpiTableInfo, ConfigRepository};
use dyntab_types::{GeneratorId, Signature, StdAcpiTableId};

use crate::duplicate::find_duplicate;
use crate::error::{TableError, TableResult};
use crate::generator::Generator;
use crate::header::ACPI_HEADER_LEN;
use crate::layout::{boxed, Category, LayoutEngine, LayoutNode, PopulateContext};
use crate::objects::{GicCInfo, GicDInfo, GicItsInfo, GicMsiFrameInfo, GicRedistributorInfo};
use crate::table::AcpiTable;
use crate::wire::WireWriter;

const MADT_MIN_REVISION: u8 = 4;
const MADT_REVISION: u8 = 5;
const MADT_HEADER_LEN: usize = ACPI_HEADER_LEN + 8;

const GICC_TYPE: u8 = 0x0b;
const GICD_TYPE: u8 = 0x0c;
const MSI_FRAME_TYPE: u8 = 0x0d;
const GICR_TYPE: u8 = 0x0e;
const ITS_TYPE: u8 = 0x0f;

const GICC_LEN: u8 = 80;
const GICD_LEN: u8 = 24;
const MSI_FRAME_LEN: u8 = 24;
const GICR_LEN: u8 = 16;
const ITS_LEN: u8 = 20;

/// Multiple APIC description table for GIC based systems.
///
/// Interrupt controller structures are emitted in the order GICC, GICD,
/// MSI frames, redistributors, ITS.
pub struct MadtGenerator {
    engine: LayoutEngine,
}

impl MadtGenerator {
    pub fn new() -> Self {
        let engine = LayoutEngine::new(MADT_HEADER_LEN)
            .category(
                Category::<GicCInfo>::new("GICC", |info| boxed(Gicc(info)))
                    .required()
                    .with_check(unique_processor_uids),
            )
            .category(
                Category::<GicDInfo>::new("GICD", |info| boxed(Gicd(info)))
                    .required()
                    .singleton(),
            )
            .category(Category::<GicMsiFrameInfo>::new("GIC MSI frame", |info| {
                boxed(MsiFrame(info))
            }))
            .category(Category::<GicRedistributorInfo>::new(
                "GIC redistributor",
                |info| boxed(Gicr(info)),
            ))
            .category(Category::<GicItsInfo>::new("GIC ITS", |info| {
                boxed(Its(info))
            }));
        Self { engine }
    }
}

impl Default for MadtGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for MadtGenerator {
    fn id(&self) -> GeneratorId {
        GeneratorId::std_acpi(StdAcpiTableId::Madt)
    }

    fn description(&self) -> &'static str {
        "ACPI.STD.MADT.GENERATOR"
    }

    fn signature(&self) -> Signature {
        Signature::from_bytes(*b"APIC")
    }

    fn revision(&self) -> u8 {
        MADT_REVISION
    }

    fn min_revision(&self) -> u8 {
        MADT_MIN_REVISION
    }

    fn build(
        &self,
        request: &AcpiTableInfo,
        repo: &dyn ConfigRepository,
    ) -> TableResult<AcpiTable> {
        super::build_table(self, &self.engine, request, repo, |w, _| {
            // Local interrupt controller address and flags are zero on GIC.
            w.u32(0)?;
            w.u32(0)
        })
    }
}

fn unique_processor_uids(gicc: &[GicCInfo]) -> TableResult<()> {
    match find_duplicate(gicc, |a, b| a.acpi_processor_uid == b.acpi_processor_uid) {
        Some((first, second)) => {
            let uid = gicc[first].acpi_processor_uid;
            tracing::error!(
                uid,
                first,
                second,
                "MADT: duplicate ACPI processor UID in GIC CPU interface info"
            );
            Err(TableError::InvalidParameter(format!(
                "GICC {first} and {second} share ACPI processor UID {uid:#x}"
            )))
        }
        None => Ok(()),
    }
}

/// Type, length and a reserved halfword.
fn structure_header(w: &mut WireWriter<'_>, kind: u8, len: u8) -> TableResult<()> {
    w.u8(kind)?;
    w.u8(len)?;
    w.reserved(2)
}

#[derive(Debug)]
struct Gicc(GicCInfo);

impl LayoutNode for Gicc {
    fn size(&self) -> TableResult<u64> {
        Ok(u64::from(GICC_LEN))
    }

    fn populate(&self, out: &mut [u8], cx: &PopulateContext<'_>) -> TableResult<()> {
        let info = &self.0;
        let mut w = WireWriter::new(out);
        structure_header(&mut w, GICC_TYPE, GICC_LEN)?;
        w.u32(info.cpu_interface_number)?;
        w.u32(info.acpi_processor_uid)?;
        w.u32(info.flags)?;
        w.u32(info.parking_protocol_version)?;
        w.u32(info.performance_interrupt_gsiv)?;
        w.u64(info.parked_address)?;
        w.u64(info.physical_base_address)?;
        w.u64(info.gicv)?;
        w.u64(info.gich)?;
        w.u32(info.vgic_maintenance_interrupt)?;
        w.u64(info.gicr_base_address)?;
        w.u64(info.mpidr)?;
        w.u8(info.processor_power_efficiency_class)?;
        w.reserved(1)?;
        // Reserved before revision 5.
        let spe = if cx.revision > MADT_MIN_REVISION {
            info.spe_overflow_interrupt
        } else {
            0
        };
        w.u16(spe)?;
        w.finish()
    }
}

#[derive(Debug)]
struct Gicd(GicDInfo);

impl LayoutNode for Gicd {
    fn size(&self) -> TableResult<u64> {
        Ok(u64::from(GICD_LEN))
    }

    fn populate(&self, out: &mut [u8], _cx: &PopulateContext<'_>) -> TableResult<()> {
        let mut w = WireWriter::new(out);
        structure_header(&mut w, GICD_TYPE, GICD_LEN)?;
        // GIC id
        w.u32(0)?;
        w.u64(self.0.physical_base_address)?;
        // System vector base
        w.u32(0)?;
        w.u8(self.0.gic_version)?;
        w.reserved(3)?;
        w.finish()
    }
}

#[derive(Debug)]
struct MsiFrame(GicMsiFrameInfo);

impl LayoutNode for MsiFrame {
    fn size(&self) -> TableResult<u64> {
        Ok(u64::from(MSI_FRAME_LEN))
    }

    fn populate(&self, out: &mut [u8], _cx: &PopulateContext<'_>) -> TableResult<()> {
        let info = &self.0;
        let mut w = WireWriter::new(out);
        structure_header(&mut w, MSI_FRAME_TYPE, MSI_FRAME_LEN)?;
        w.u32(info.gic_msi_frame_id)?;
        w.u64(info.physical_base_address)?;
        w.u32(info.flags)?;
        w.u16(info.spi_count)?;
        w.u16(info.spi_base)?;
        w.finish()
    }
}

#[derive(Debug)]
struct Gicr(GicRedistributorInfo);

impl LayoutNode for Gicr {
    fn size(&self) -> TableResult<u64> {
        Ok(u64::from(GICR_LEN))
    }

    fn populate(&self, out: &mut [u8], _cx: &PopulateContext<'_>) -> TableResult<()> {
        let mut w = WireWriter::new(out);
        structure_header(&mut w, GICR_TYPE, GICR_LEN)?;
        w.u64(self.0.discovery_range_base_address)?;
        w.u32(self.0.discovery_range_length)?;
        w.finish()
    }
}

#[derive(Debug)]
struct Its(GicItsInfo);

impl LayoutNode for Its {
    fn size(&self) -> TableResult<u64> {
        Ok(u64::from(ITS_LEN))
    }

    fn populate(&self, out: &mut [u8], _cx: &PopulateContext<'_>) -> TableResult<()> {
        let mut w = WireWriter::new(out);
        structure_header(&mut w, ITS_TYPE, ITS_LEN)?;
        w.u32(self.0.gic_its_id)?;
        w.u64(self.0.physical_base_address)?;
        w.reserved(4)?;
        w.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::testing::{make_repo, make_request};
    use crate::wire::{read_u16, read_u32, read_u64};
    use dyntab_repo::{InMemoryRepository, RepositoryExt};
    use dyntab_types::Token;

    fn make_gicc(uid: u32) -> GicCInfo {
        GicCInfo {
            cpu_interface_number: uid,
            acpi_processor_uid: uid,
            flags: 1,
            performance_interrupt_gsiv: 23,
            physical_base_address: 0x2c00_0000,
            vgic_maintenance_interrupt: 25,
            mpidr: u64::from(uid) << 8,
            spe_overflow_interrupt: 0x15,
            ..Default::default()
        }
    }

    fn make_gic_repo(uids: &[u32]) -> InMemoryRepository {
        let repo = make_repo();
        let gicc: Vec<GicCInfo> = uids.iter().map(|&uid| make_gicc(uid)).collect();
        repo.add_objects(Token::NULL, &gicc).unwrap();
        repo.add_object(
            Token::NULL,
            &GicDInfo {
                physical_base_address: 0x2f00_0000,
                gic_version: 3,
            },
        )
        .unwrap();
        repo
    }

    // -----------------------------------------------------------------------
    // Layout
    // -----------------------------------------------------------------------

    #[test]
    fn gicc_then_gicd() {
        let generator = MadtGenerator::new();
        let repo = make_gic_repo(&[0, 1]);
        let table = generator.build(&make_request(&generator, 5), &repo).unwrap();
        let bytes = table.as_bytes();

        assert_eq!(bytes.len(), 44 + 2 * 80 + 24);
        assert_eq!(&bytes[0..4], b"APIC");
        assert_eq!(read_u64(bytes, 36), Some(0));

        assert_eq!(bytes[44], GICC_TYPE);
        assert_eq!(bytes[45], 80);
        assert_eq!(read_u32(bytes, 48), Some(0));
        assert_eq!(read_u32(bytes, 52), Some(0));
        assert_eq!(read_u64(bytes, 44 + 68), Some(0));
        assert_eq!(read_u16(bytes, 44 + 78), Some(0x15));
        assert_eq!(read_u32(bytes, 124 + 8), Some(1));

        let gicd = 44 + 160;
        assert_eq!(bytes[gicd], GICD_TYPE);
        assert_eq!(bytes[gicd + 1], 24);
        assert_eq!(read_u64(bytes, gicd + 8), Some(0x2f00_0000));
        assert_eq!(bytes[gicd + 20], 3);
    }

    #[test]
    fn revision_4_leaves_spe_interrupt_zero() {
        let generator = MadtGenerator::new();
        let repo = make_gic_repo(&[7]);
        let table = generator.build(&make_request(&generator, 4), &repo).unwrap();
        assert_eq!(table.as_bytes()[8], 4);
        assert_eq!(read_u16(table.as_bytes(), 44 + 78), Some(0));
    }

    #[test]
    fn optional_structures_follow_in_order() {
        let generator = MadtGenerator::new();
        let repo = make_gic_repo(&[0]);
        repo.add_object(
            Token::NULL,
            &GicMsiFrameInfo {
                gic_msi_frame_id: 2,
                physical_base_address: 0x3000_0000,
                flags: 1,
                spi_count: 64,
                spi_base: 96,
            },
        )
        .unwrap();
        repo.add_object(
            Token::NULL,
            &GicRedistributorInfo {
                discovery_range_base_address: 0x2f10_0000,
                discovery_range_length: 0x10_0000,
            },
        )
        .unwrap();
        repo.add_object(
            Token::NULL,
            &GicItsInfo {
                gic_its_id: 9,
                physical_base_address: 0x2f02_0000,
                proximity_domain: 0,
            },
        )
        .unwrap();

        let table = generator.build(&make_request(&generator, 5), &repo).unwrap();
        let bytes = table.as_bytes();
        let msi = 44 + 80 + 24;
        let gicr = msi + 24;
        let its = gicr + 16;
        assert_eq!(bytes.len(), its + 20);
        assert_eq!(bytes[msi], MSI_FRAME_TYPE);
        assert_eq!(read_u16(bytes, msi + 20), Some(64));
        assert_eq!(read_u16(bytes, msi + 22), Some(96));
        assert_eq!(bytes[gicr], GICR_TYPE);
        assert_eq!(read_u32(bytes, gicr + 12), Some(0x10_0000));
        assert_eq!(bytes[its], ITS_TYPE);
        assert_eq!(read_u32(bytes, its + 4), Some(9));
        assert_eq!(read_u64(bytes, its + 8), Some(0x2f02_0000));
    }

    // -----------------------------------------------------------------------
    // Rejections
    // -----------------------------------------------------------------------

    #[test]
    fn duplicate_processor_uid() {
        let generator = MadtGenerator::new();
        let repo = make_gic_repo(&[0, 1, 0]);
        let err = generator.build(&make_request(&generator, 5), &repo).unwrap_err();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn gicc_is_required() {
        let generator = MadtGenerator::new();
        let repo = make_repo();
        repo.add_object(Token::NULL, &GicDInfo::default()).unwrap();
        let err = generator.build(&make_request(&generator, 5), &repo).unwrap_err();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn exactly_one_gicd() {
        let generator = MadtGenerator::new();
        let repo = make_repo();
        repo.add_object(Token::NULL, &make_gicc(0)).unwrap();
        let err = generator.build(&make_request(&generator, 5), &repo).unwrap_err();
        assert!(err.is_invalid_parameter());

        let repo = make_gic_repo(&[0]);
        repo.add_object(Token::NULL, &GicDInfo::default()).unwrap();
        let err = generator.build(&make_request(&generator, 5), &repo).unwrap_err();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn revision_range() {
        let generator = MadtGenerator::new();
        let repo = make_gic_repo(&[0]);
        for revision in [3, 6] {
            let err = generator
                .build(&make_request(&generator, revision), &repo)
                .unwrap_err();
            assert!(err.is_invalid_parameter());
        }
    }
}
