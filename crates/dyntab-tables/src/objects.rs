//! ARM namespace configuration records consumed by the built-in generators.
//!
//! Every record is a [`CmObject`]: stored in the repository under its ARM
//! object id and encoded with bincode. Fields named `*_token` reference other
//! records (or, for IORT, other nodes) by [`Token`]. Records without token
//! fields default every missing field, so platform files may omit zeros.

use serde::{Deserialize, Serialize};

use dyntab_repo::CmObject;
use dyntab_types::{ArmObject, ObjectId, Token};

macro_rules! arm_object {
    ($ty:ty, $object:ident) => {
        impl CmObject for $ty {
            const OBJECT_ID: ObjectId = ObjectId::arm(ArmObject::$object);
        }
    };
}

// ---------------------------------------------------------------------------
// GIC
// ---------------------------------------------------------------------------

/// One GIC CPU interface. Feeds both the MADT GICC structure and the SRAT
/// GICC affinity structure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GicCInfo {
    pub cpu_interface_number: u32,
    /// Must be unique across all CPU interfaces.
    pub acpi_processor_uid: u32,
    pub flags: u32,
    pub parking_protocol_version: u32,
    pub performance_interrupt_gsiv: u32,
    pub parked_address: u64,
    pub physical_base_address: u64,
    pub gicv: u64,
    pub gich: u64,
    pub vgic_maintenance_interrupt: u32,
    pub gicr_base_address: u64,
    pub mpidr: u64,
    pub processor_power_efficiency_class: u8,
    /// Only emitted for MADT revision 5 and later.
    pub spe_overflow_interrupt: u16,
    pub proximity_domain: u32,
    pub clock_domain: u32,
    pub affinity_flags: u32,
}
arm_object!(GicCInfo, GicCInfo);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GicDInfo {
    pub physical_base_address: u64,
    pub gic_version: u8,
}
arm_object!(GicDInfo, GicDInfo);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GicMsiFrameInfo {
    pub gic_msi_frame_id: u32,
    pub physical_base_address: u64,
    pub flags: u32,
    pub spi_count: u16,
    pub spi_base: u16,
}
arm_object!(GicMsiFrameInfo, GicMsiFrameInfo);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GicRedistributorInfo {
    pub discovery_range_base_address: u64,
    pub discovery_range_length: u32,
}
arm_object!(GicRedistributorInfo, GicRedistributorInfo);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GicItsInfo {
    pub gic_its_id: u32,
    pub physical_base_address: u64,
    pub proximity_domain: u32,
}
arm_object!(GicItsInfo, GicItsInfo);

// ---------------------------------------------------------------------------
// PCI
// ---------------------------------------------------------------------------

/// One ECAM region.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PciConfigSpaceInfo {
    pub base_address: u64,
    pub pci_segment_group_number: u16,
    pub start_bus_number: u8,
    pub end_bus_number: u8,
}
arm_object!(PciConfigSpaceInfo, PciConfigSpaceInfo);

// ---------------------------------------------------------------------------
// IORT nodes
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItsGroupNode {
    pub token: Token,
    pub its_id_count: u32,
    /// Token of the `ItsIdentifier` list.
    pub its_id_token: Token,
}
arm_object!(ItsGroupNode, ItsGroup);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedComponentNode {
    pub token: Token,
    pub id_mapping_count: u32,
    pub id_mapping_token: Token,
    pub flags: u32,
    pub cache_coherent: u32,
    pub allocation_hints: u8,
    pub memory_access_flags: u8,
    pub address_size_limit: u8,
    /// Device object path, e.g. `\_SB.DMA0`.
    pub object_name: String,
}
arm_object!(NamedComponentNode, NamedComponent);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootComplexNode {
    pub token: Token,
    pub id_mapping_count: u32,
    pub id_mapping_token: Token,
    pub cache_coherent: u32,
    pub allocation_hints: u8,
    pub memory_access_flags: u8,
    pub ats_attribute: u32,
    pub pci_segment_number: u32,
    pub memory_address_size: u8,
}
arm_object!(RootComplexNode, RootComplex);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmmuV1SmmuV2Node {
    pub token: Token,
    pub id_mapping_count: u32,
    pub id_mapping_token: Token,
    pub base_address: u64,
    pub span: u64,
    pub model: u32,
    pub flags: u32,
    pub context_interrupt_count: u32,
    pub context_interrupt_token: Token,
    pub pmu_interrupt_count: u32,
    pub pmu_interrupt_token: Token,
    pub nsg_irpt: u32,
    pub nsg_irpt_flags: u32,
    pub nsg_cfg_irpt: u32,
    pub nsg_cfg_irpt_flags: u32,
}
arm_object!(SmmuV1SmmuV2Node, SmmuV1SmmuV2);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmmuV3Node {
    pub token: Token,
    pub id_mapping_count: u32,
    pub id_mapping_token: Token,
    pub base_address: u64,
    pub flags: u32,
    pub vatos_address: u64,
    pub model: u32,
    pub event_interrupt: u32,
    pub pri_interrupt: u32,
    pub gerr_interrupt: u32,
    pub sync_interrupt: u32,
    /// Only emitted when the proximity domain valid flag is set.
    pub proximity_domain: u32,
    pub device_id_mapping_index: u32,
}
arm_object!(SmmuV3Node, SmmuV3);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PmcgNode {
    pub token: Token,
    pub id_mapping_count: u32,
    pub id_mapping_token: Token,
    pub base_address: u64,
    pub overflow_interrupt: u32,
    pub page1_base_address: u64,
    /// Token of the node this PMCG monitors.
    pub reference_token: Token,
}
arm_object!(PmcgNode, Pmcg);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItsIdentifier {
    pub its_id: u32,
}
arm_object!(ItsIdentifier, GicItsIdentifierArray);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdMapping {
    pub input_base: u32,
    pub num_ids: u32,
    pub output_base: u32,
    /// Token of the node the ids map to.
    pub output_reference_token: Token,
    pub flags: u32,
}
arm_object!(IdMapping, IdMappingArray);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmmuInterrupt {
    pub interrupt: u32,
    pub flags: u32,
}
arm_object!(SmmuInterrupt, SmmuInterruptArray);

// ---------------------------------------------------------------------------
// Affinity
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryAffinityInfo {
    pub proximity_domain: u32,
    pub base_address: u64,
    pub length: u64,
    pub flags: u32,
}
arm_object!(MemoryAffinityInfo, MemoryAffinityInfo);

/// Device handle kinds of a generic initiator.
pub const DEVICE_HANDLE_TYPE_ACPI: u8 = 0;
pub const DEVICE_HANDLE_TYPE_PCI: u8 = 1;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericInitiatorAffinityInfo {
    pub proximity_domain: u32,
    pub flags: u32,
    /// [`DEVICE_HANDLE_TYPE_ACPI`] or [`DEVICE_HANDLE_TYPE_PCI`].
    pub device_handle_type: u8,
    /// Token of a `DeviceHandleAcpi` or `DeviceHandlePci` record.
    pub device_handle_token: Token,
}
arm_object!(GenericInitiatorAffinityInfo, GenericInitiatorAffinityInfo);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceHandleAcpi {
    pub hid: u64,
    pub uid: u32,
}
arm_object!(DeviceHandleAcpi, DeviceHandleAcpi);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceHandlePci {
    pub segment_number: u16,
    pub bus_number: u8,
    pub device_number: u8,
    pub function_number: u8,
}
arm_object!(DeviceHandlePci, DeviceHandlePci);

impl DeviceHandlePci {
    /// Bus, device, and function packed as in the PCI routing id.
    pub fn bdf(&self) -> u16 {
        (u16::from(self.bus_number) << 8)
            | (u16::from(self.device_number & 0x1f) << 3)
            | u16::from(self.function_number & 0x7)
    }
}
