//! IO remapping table.
//!
//! Nodes are laid out ITS groups first, then named components, root
//! complexes, SMMUv1/v2, SMMUv3 and PMCG nodes. ID mappings and PMCG node
//! references carry the table offset of the node they point at, resolved
//! from tokens once every node has been placed.

use dyntab_repo::{AcpiTableInfo, CmObject, ConfigRepository, RepositoryExt};
use dyntab_types::{GeneratorId, Signature, StdAcpiTableId, Token};

use crate::error::{TableError, TableResult};
use crate::generator::Generator;
use crate::header::ACPI_HEADER_LEN;
use crate::layout::{boxed, Category, LayoutEngine, LayoutNode, PopulateContext};
use crate::objects::{
    IdMapping, ItsGroupNode, ItsIdentifier, NamedComponentNode, PmcgNode, RootComplexNode,
    SmmuInterrupt, SmmuV1SmmuV2Node, SmmuV3Node,
};
use crate::table::AcpiTable;
use crate::wire::WireWriter;

const IORT_REVISION: u8 = 0;
const IORT_HEADER_LEN: usize = ACPI_HEADER_LEN + 12;

const NODE_HEADER_LEN: u64 = 16;
const ID_MAPPING_LEN: u64 = 20;
const SMMU_INTERRUPT_LEN: u64 = 8;

const ITS_GROUP_LEN: u64 = NODE_HEADER_LEN + 4;
const NAMED_COMPONENT_LEN: u64 = NODE_HEADER_LEN + 13;
const ROOT_COMPLEX_LEN: u64 = NODE_HEADER_LEN + 20;
const SMMU_V1V2_LEN: u64 = NODE_HEADER_LEN + 60;
const SMMU_V3_LEN: u64 = NODE_HEADER_LEN + 52;
const PMCG_LEN: u64 = NODE_HEADER_LEN + 24;

/// Offset of the non-secure global interrupt pair in an SMMUv1/v2 node.
const SMMU_V1V2_GLOBAL_INTERRUPTS: u32 = 60;

const SMMU_V3_PROXIMITY_DOMAIN_VALID: u32 = 1 << 3;

#[derive(Clone, Copy, Debug)]
#[repr(u8)]
enum NodeType {
    ItsGroup = 0,
    NamedComponent = 1,
    RootComplex = 2,
    SmmuV1V2 = 3,
    SmmuV3 = 4,
    Pmcg = 5,
}

impl NodeType {
    /// Node structure revision emitted for this type.
    fn revision(self) -> u8 {
        match self {
            Self::ItsGroup | Self::SmmuV1V2 => 0,
            Self::RootComplex | Self::Pmcg => 1,
            Self::NamedComponent | Self::SmmuV3 => 2,
        }
    }
}

pub struct IortGenerator {
    engine: LayoutEngine,
}

impl IortGenerator {
    pub fn new() -> Self {
        let engine = LayoutEngine::new(IORT_HEADER_LEN)
            .category(Category::<ItsGroupNode>::new("ITS group", |node| {
                boxed(ItsGroup(node))
            }))
            .category(Category::<NamedComponentNode>::new(
                "named component",
                |node| boxed(NamedComponent(node)),
            ))
            .category(Category::<RootComplexNode>::new("root complex", |node| {
                boxed(RootComplex(node))
            }))
            .category(Category::<SmmuV1SmmuV2Node>::new("SMMUv1/v2", |node| {
                boxed(SmmuV1V2(node))
            }))
            .category(Category::<SmmuV3Node>::new("SMMUv3", |node| {
                boxed(SmmuV3(node))
            }))
            .category(Category::<PmcgNode>::new("PMCG", |node| boxed(Pmcg(node))));
        Self { engine }
    }
}

impl Default for IortGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for IortGenerator {
    fn id(&self) -> GeneratorId {
        GeneratorId::std_acpi(StdAcpiTableId::Iort)
    }

    fn description(&self) -> &'static str {
        "ACPI.STD.IORT.GENERATOR"
    }

    fn signature(&self) -> Signature {
        Signature::from_bytes(*b"IORT")
    }

    fn revision(&self) -> u8 {
        IORT_REVISION
    }

    fn min_revision(&self) -> u8 {
        IORT_REVISION
    }

    fn build(
        &self,
        request: &AcpiTableInfo,
        repo: &dyn ConfigRepository,
    ) -> TableResult<AcpiTable> {
        super::build_table(self, &self.engine, request, repo, |w, plan| {
            let nodes = u32::try_from(plan.node_count())
                .map_err(|_| TableError::InvalidParameter("too many IORT nodes".into()))?;
            w.u32(nodes)?;
            w.u32(IORT_HEADER_LEN as u32)?;
            w.reserved(4)
        })
    }
}

// ---------------------------------------------------------------------------
// Shared pieces
// ---------------------------------------------------------------------------

fn node_header(
    w: &mut WireWriter<'_>,
    kind: NodeType,
    len: usize,
    id_mapping_count: u32,
    id_reference: u64,
) -> TableResult<()> {
    let len = u16::try_from(len)
        .map_err(|_| TableError::InvalidParameter(format!("{kind:?} node of {len} bytes")))?;
    w.u8(kind as u8)?;
    w.u16(len)?;
    w.u8(kind.revision())?;
    w.reserved(4)?;
    w.u32(id_mapping_count)?;
    w.u32(id_reference as u32)
}

/// Fetch `count` records stored under `token`. Fewer is `NotFound`; extra
/// records are ignored.
fn fetch_array<T: CmObject>(
    cx: &PopulateContext<'_>,
    token: Token,
    count: u32,
    what: &str,
) -> TableResult<Vec<T>> {
    let mut items: Vec<T> = cx.repo.get_list(token)?;
    if items.len() < count as usize {
        tracing::error!(
            token = ?token,
            expected = count,
            found = items.len(),
            "IORT: not enough {what}"
        );
        return Err(TableError::NotFound(format!(
            "{count} {what} under {token:?}, found {}",
            items.len()
        )));
    }
    items.truncate(count as usize);
    Ok(items)
}

/// Write the ID mapping array, or leave it zeroed when the node declares
/// mappings without a token.
fn write_id_mappings(
    w: &mut WireWriter<'_>,
    cx: &PopulateContext<'_>,
    count: u32,
    token: Token,
) -> TableResult<()> {
    if count == 0 || token.is_null() {
        return w.reserved((u64::from(count) * ID_MAPPING_LEN) as usize);
    }
    for mapping in fetch_array::<IdMapping>(cx, token, count, "ID mappings")? {
        w.u32(mapping.input_base)?;
        w.u32(mapping.num_ids)?;
        w.u32(mapping.output_base)?;
        w.u32(cx.resolve(mapping.output_reference_token)?)?;
        w.u32(mapping.flags)?;
    }
    Ok(())
}

fn write_smmu_interrupts(
    w: &mut WireWriter<'_>,
    cx: &PopulateContext<'_>,
    count: u32,
    token: Token,
) -> TableResult<()> {
    if count == 0 {
        return Ok(());
    }
    for irq in fetch_array::<SmmuInterrupt>(cx, token, count, "SMMU interrupts")? {
        w.u32(irq.interrupt)?;
        w.u32(irq.flags)?;
    }
    Ok(())
}

fn mappings_len(count: u32) -> u64 {
    u64::from(count) * ID_MAPPING_LEN
}

/// Name bytes plus terminator, padded to four.
fn padded_name_len(name: &str) -> u64 {
    (name.len() as u64 + 1 + 3) & !3
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct ItsGroup(ItsGroupNode);

impl LayoutNode for ItsGroup {
    fn token(&self) -> Token {
        self.0.token
    }

    fn size(&self) -> TableResult<u64> {
        Ok(ITS_GROUP_LEN + 4 * u64::from(self.0.its_id_count))
    }

    fn populate(&self, out: &mut [u8], cx: &PopulateContext<'_>) -> TableResult<()> {
        let node = &self.0;
        let len = out.len();
        let mut w = WireWriter::new(out);
        node_header(&mut w, NodeType::ItsGroup, len, 0, 0)?;
        w.u32(node.its_id_count)?;
        if node.its_id_count > 0 {
            let ids: Vec<ItsIdentifier> =
                fetch_array(cx, node.its_id_token, node.its_id_count, "ITS identifiers")?;
            for id in ids {
                w.u32(id.its_id)?;
            }
        }
        w.finish()
    }
}

#[derive(Debug)]
struct NamedComponent(NamedComponentNode);

impl NamedComponent {
    fn id_reference(&self) -> u64 {
        NAMED_COMPONENT_LEN + padded_name_len(&self.0.object_name)
    }
}

impl LayoutNode for NamedComponent {
    fn token(&self) -> Token {
        self.0.token
    }

    fn size(&self) -> TableResult<u64> {
        Ok(self.id_reference() + mappings_len(self.0.id_mapping_count))
    }

    fn populate(&self, out: &mut [u8], cx: &PopulateContext<'_>) -> TableResult<()> {
        let node = &self.0;
        let len = out.len();
        let id_reference = self.id_reference();
        let mut w = WireWriter::new(out);
        node_header(
            &mut w,
            NodeType::NamedComponent,
            len,
            node.id_mapping_count,
            id_reference,
        )?;
        w.u32(node.flags)?;
        w.u32(node.cache_coherent)?;
        w.u8(node.allocation_hints)?;
        w.reserved(2)?;
        w.u8(node.memory_access_flags)?;
        w.u8(node.address_size_limit)?;
        w.bytes(node.object_name.as_bytes())?;
        w.seek(id_reference as usize)?;
        write_id_mappings(&mut w, cx, node.id_mapping_count, node.id_mapping_token)?;
        w.finish()
    }
}

#[derive(Debug)]
struct RootComplex(RootComplexNode);

impl LayoutNode for RootComplex {
    fn token(&self) -> Token {
        self.0.token
    }

    fn size(&self) -> TableResult<u64> {
        Ok(ROOT_COMPLEX_LEN + mappings_len(self.0.id_mapping_count))
    }

    fn populate(&self, out: &mut [u8], cx: &PopulateContext<'_>) -> TableResult<()> {
        let node = &self.0;
        let len = out.len();
        let mut w = WireWriter::new(out);
        node_header(
            &mut w,
            NodeType::RootComplex,
            len,
            node.id_mapping_count,
            ROOT_COMPLEX_LEN,
        )?;
        w.u32(node.cache_coherent)?;
        w.u8(node.allocation_hints)?;
        w.reserved(2)?;
        w.u8(node.memory_access_flags)?;
        w.u32(node.ats_attribute)?;
        w.u32(node.pci_segment_number)?;
        w.u8(node.memory_address_size)?;
        w.reserved(3)?;
        write_id_mappings(&mut w, cx, node.id_mapping_count, node.id_mapping_token)?;
        w.finish()
    }
}

#[derive(Debug)]
struct SmmuV1V2(SmmuV1SmmuV2Node);

impl SmmuV1V2 {
    fn pmu_interrupts_at(&self) -> u64 {
        SMMU_V1V2_LEN + SMMU_INTERRUPT_LEN * u64::from(self.0.context_interrupt_count)
    }

    fn id_reference(&self) -> u64 {
        self.pmu_interrupts_at() + SMMU_INTERRUPT_LEN * u64::from(self.0.pmu_interrupt_count)
    }
}

impl LayoutNode for SmmuV1V2 {
    fn token(&self) -> Token {
        self.0.token
    }

    fn size(&self) -> TableResult<u64> {
        Ok(self.id_reference() + mappings_len(self.0.id_mapping_count))
    }

    fn populate(&self, out: &mut [u8], cx: &PopulateContext<'_>) -> TableResult<()> {
        let node = &self.0;
        let len = out.len();
        let mut w = WireWriter::new(out);
        node_header(
            &mut w,
            NodeType::SmmuV1V2,
            len,
            node.id_mapping_count,
            self.id_reference(),
        )?;
        w.u64(node.base_address)?;
        w.u64(node.span)?;
        w.u32(node.model)?;
        w.u32(node.flags)?;
        w.u32(SMMU_V1V2_GLOBAL_INTERRUPTS)?;
        w.u32(node.context_interrupt_count)?;
        w.u32(SMMU_V1V2_LEN as u32)?;
        w.u32(node.pmu_interrupt_count)?;
        w.u32(self.pmu_interrupts_at() as u32)?;
        w.u32(node.nsg_irpt)?;
        w.u32(node.nsg_irpt_flags)?;
        w.u32(node.nsg_cfg_irpt)?;
        w.u32(node.nsg_cfg_irpt_flags)?;
        write_smmu_interrupts(
            &mut w,
            cx,
            node.context_interrupt_count,
            node.context_interrupt_token,
        )?;
        if node.pmu_interrupt_token.is_null() {
            w.reserved((SMMU_INTERRUPT_LEN * u64::from(node.pmu_interrupt_count)) as usize)?;
        } else {
            write_smmu_interrupts(&mut w, cx, node.pmu_interrupt_count, node.pmu_interrupt_token)?;
        }
        write_id_mappings(&mut w, cx, node.id_mapping_count, node.id_mapping_token)?;
        w.finish()
    }
}

#[derive(Debug)]
struct SmmuV3(SmmuV3Node);

impl LayoutNode for SmmuV3 {
    fn token(&self) -> Token {
        self.0.token
    }

    fn size(&self) -> TableResult<u64> {
        Ok(SMMU_V3_LEN + mappings_len(self.0.id_mapping_count))
    }

    fn populate(&self, out: &mut [u8], cx: &PopulateContext<'_>) -> TableResult<()> {
        let node = &self.0;
        let len = out.len();
        let mut w = WireWriter::new(out);
        node_header(&mut w, NodeType::SmmuV3, len, node.id_mapping_count, SMMU_V3_LEN)?;
        w.u64(node.base_address)?;
        w.u32(node.flags)?;
        w.reserved(4)?;
        w.u64(node.vatos_address)?;
        w.u32(node.model)?;
        w.u32(node.event_interrupt)?;
        w.u32(node.pri_interrupt)?;
        w.u32(node.gerr_interrupt)?;
        w.u32(node.sync_interrupt)?;
        let proximity_domain = if node.flags & SMMU_V3_PROXIMITY_DOMAIN_VALID != 0 {
            node.proximity_domain
        } else {
            0
        };
        w.u32(proximity_domain)?;
        // Ignored when every control interrupt is wired.
        let all_wired = [
            node.event_interrupt,
            node.pri_interrupt,
            node.gerr_interrupt,
            node.sync_interrupt,
        ]
        .iter()
        .all(|&irq| irq != 0);
        w.u32(if all_wired { 0 } else { node.device_id_mapping_index })?;
        write_id_mappings(&mut w, cx, node.id_mapping_count, node.id_mapping_token)?;
        w.finish()
    }
}

#[derive(Debug)]
struct Pmcg(PmcgNode);

impl LayoutNode for Pmcg {
    fn token(&self) -> Token {
        self.0.token
    }

    fn size(&self) -> TableResult<u64> {
        Ok(PMCG_LEN + mappings_len(self.0.id_mapping_count))
    }

    fn populate(&self, out: &mut [u8], cx: &PopulateContext<'_>) -> TableResult<()> {
        let node = &self.0;
        let len = out.len();
        let mut w = WireWriter::new(out);
        node_header(&mut w, NodeType::Pmcg, len, node.id_mapping_count, PMCG_LEN)?;
        w.u64(node.base_address)?;
        w.u32(node.overflow_interrupt)?;
        w.u32(cx.resolve(node.reference_token)?)?;
        w.u64(node.page1_base_address)?;
        write_id_mappings(&mut w, cx, node.id_mapping_count, node.id_mapping_token)?;
        w.finish()
    }
}
