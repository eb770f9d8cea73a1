use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

const NAMESPACE_SHIFT: u32 = 28;
const INDEX_MASK: u32 = (1 << NAMESPACE_SHIFT) - 1;

/// Namespace encoded in bits [31:28] of an [`ObjectId`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Namespace {
    /// Architecture-independent objects (manager info, table lists).
    Standard,
    /// ARM architecture objects.
    Arm,
    /// Platform/vendor specific objects.
    Oem,
}

impl Namespace {
    /// The 4-bit namespace value.
    pub const fn bits(self) -> u32 {
        match self {
            Self::Standard => 0x0,
            Self::Arm => 0x1,
            Self::Oem => 0x8,
        }
    }

    /// Decode a 4-bit namespace value.
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0x0 => Some(Self::Standard),
            0x1 => Some(Self::Arm),
            0x8 => Some(Self::Oem),
            _ => None,
        }
    }
}

/// Identifies the *type* of a configuration object.
///
/// Many repository entries may share one `ObjectId`; instances of the same
/// type are told apart by their [`Token`](crate::Token).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(u32);

impl ObjectId {
    /// Build an id from a namespace and an index within it.
    pub const fn new(namespace: Namespace, index: u32) -> Self {
        Self((namespace.bits() << NAMESPACE_SHIFT) | (index & INDEX_MASK))
    }

    /// Wrap a raw 32-bit id.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Id of a standard-namespace object.
    pub const fn std(object: StdObject) -> Self {
        Self::new(Namespace::Standard, object as u32)
    }

    /// Id of an ARM-namespace object.
    pub const fn arm(object: ArmObject) -> Self {
        Self::new(Namespace::Arm, object as u32)
    }

    /// Id of an OEM-namespace object.
    pub const fn oem(index: u32) -> Self {
        Self::new(Namespace::Oem, index)
    }

    /// The raw 32-bit value.
    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// Object index within its namespace.
    pub const fn index(&self) -> u32 {
        self.0 & INDEX_MASK
    }

    /// Decode the namespace bits.
    pub fn namespace(&self) -> Result<Namespace, TypeError> {
        Namespace::from_bits(self.0 >> NAMESPACE_SHIFT).ok_or(TypeError::UnknownNamespace(self.0))
    }

    /// Human-readable name of the object type.
    pub fn name(&self) -> &'static str {
        match self.namespace() {
            Ok(Namespace::Standard) => StdObject::from_index(self.index())
                .map(StdObject::name)
                .unwrap_or("Unknown"),
            Ok(Namespace::Arm) => ArmObject::from_index(self.index())
                .map(ArmObject::name)
                .unwrap_or("Unknown"),
            Ok(Namespace::Oem) => "OEM Object",
            Err(_) => "Unknown",
        }
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId(0x{:08x})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl From<StdObject> for ObjectId {
    fn from(object: StdObject) -> Self {
        Self::std(object)
    }
}

impl From<ArmObject> for ObjectId {
    fn from(object: ArmObject) -> Self {
        Self::arm(object)
    }
}

// ---------------------------------------------------------------------------
// Standard namespace
// ---------------------------------------------------------------------------

/// Objects in the standard namespace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum StdObject {
    CfgMgrInfo = 0,
    AcpiTableList = 1,
    SmbiosTableList = 2,
}

impl StdObject {
    /// Every standard object, in index order.
    pub const ALL: [StdObject; 3] = [Self::CfgMgrInfo, Self::AcpiTableList, Self::SmbiosTableList];

    pub fn from_index(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::CfgMgrInfo => "CfgMgrInfo",
            Self::AcpiTableList => "AcpiTableList",
            Self::SmbiosTableList => "SmbiosTableList",
        }
    }
}

// ---------------------------------------------------------------------------
// ARM namespace
// ---------------------------------------------------------------------------

/// Objects in the ARM namespace. Discriminants are the object indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ArmObject {
    Reserved = 0,
    BootArchInfo,
    CpuInfo,
    PowerManagementProfileInfo,
    GicCInfo,
    GicDInfo,
    GicMsiFrameInfo,
    GicRedistributorInfo,
    GicItsInfo,
    SerialConsolePortInfo,
    SerialDebugPortInfo,
    GenericTimerInfo,
    PlatformGtBlockInfo,
    GtBlockTimerFrameInfo,
    PlatformGenericWatchdogInfo,
    PciConfigSpaceInfo,
    HypervisorVendorIdentity,
    FixedFeatureFlags,
    ItsGroup,
    NamedComponent,
    RootComplex,
    SmmuV1SmmuV2,
    SmmuV3,
    Pmcg,
    GicItsIdentifierArray,
    IdMappingArray,
    SmmuInterruptArray,
    ProcHierarchyInfo,
    CacheInfo,
    ProcNodeIdInfo,
    CmRef,
    MemoryAffinityInfo,
    DeviceHandleAcpi,
    DeviceHandlePci,
    GenericInitiatorAffinityInfo,
}

impl ArmObject {
    /// Every ARM object, in index order.
    pub const ALL: [ArmObject; 35] = [
        Self::Reserved,
        Self::BootArchInfo,
        Self::CpuInfo,
        Self::PowerManagementProfileInfo,
        Self::GicCInfo,
        Self::GicDInfo,
        Self::GicMsiFrameInfo,
        Self::GicRedistributorInfo,
        Self::GicItsInfo,
        Self::SerialConsolePortInfo,
        Self::SerialDebugPortInfo,
        Self::GenericTimerInfo,
        Self::PlatformGtBlockInfo,
        Self::GtBlockTimerFrameInfo,
        Self::PlatformGenericWatchdogInfo,
        Self::PciConfigSpaceInfo,
        Self::HypervisorVendorIdentity,
        Self::FixedFeatureFlags,
        Self::ItsGroup,
        Self::NamedComponent,
        Self::RootComplex,
        Self::SmmuV1SmmuV2,
        Self::SmmuV3,
        Self::Pmcg,
        Self::GicItsIdentifierArray,
        Self::IdMappingArray,
        Self::SmmuInterruptArray,
        Self::ProcHierarchyInfo,
        Self::CacheInfo,
        Self::ProcNodeIdInfo,
        Self::CmRef,
        Self::MemoryAffinityInfo,
        Self::DeviceHandleAcpi,
        Self::DeviceHandlePci,
        Self::GenericInitiatorAffinityInfo,
    ];

    pub fn from_index(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Reserved => "Reserved",
            Self::BootArchInfo => "Boot Architecture Info",
            Self::CpuInfo => "CPU Info",
            Self::PowerManagementProfileInfo => "Power Management Profile Info",
            Self::GicCInfo => "GIC CPU Interface Info",
            Self::GicDInfo => "GIC Distributor Info",
            Self::GicMsiFrameInfo => "GIC MSI Frame Info",
            Self::GicRedistributorInfo => "GIC Redistributor Info",
            Self::GicItsInfo => "GIC ITS Info",
            Self::SerialConsolePortInfo => "Serial Console Port Info",
            Self::SerialDebugPortInfo => "Serial Debug Port Info",
            Self::GenericTimerInfo => "Generic Timer Info",
            Self::PlatformGtBlockInfo => "Platform GT Block Info",
            Self::GtBlockTimerFrameInfo => "Generic Timer Block Frame Info",
            Self::PlatformGenericWatchdogInfo => "Platform Generic Watchdog",
            Self::PciConfigSpaceInfo => "PCI Configuration Space Info",
            Self::HypervisorVendorIdentity => "Hypervisor Vendor Id",
            Self::FixedFeatureFlags => "Fixed feature flags for FADT",
            Self::ItsGroup => "ITS Group",
            Self::NamedComponent => "Named Component",
            Self::RootComplex => "Root Complex",
            Self::SmmuV1SmmuV2 => "SMMUv1 or SMMUv2",
            Self::SmmuV3 => "SMMUv3",
            Self::Pmcg => "PMCG",
            Self::GicItsIdentifierArray => "GIC ITS Identifier Array",
            Self::IdMappingArray => "ID Mapping Array",
            Self::SmmuInterruptArray => "SMMU Interrupt Array",
            Self::ProcHierarchyInfo => "Processor Hierarchy Info",
            Self::CacheInfo => "Cache Info",
            Self::ProcNodeIdInfo => "Processor Node ID Info",
            Self::CmRef => "CM Object Reference",
            Self::MemoryAffinityInfo => "Memory Affinity Info",
            Self::DeviceHandleAcpi => "Device Handle Acpi",
            Self::DeviceHandlePci => "Device Handle Pci",
            Self::GenericInitiatorAffinityInfo => "Generic Initiator Affinity",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arm_ids_carry_namespace_bits() {
        let id = ObjectId::arm(ArmObject::GicCInfo);
        assert_eq!(id.raw(), 0x1000_0004);
        assert_eq!(id.namespace().unwrap(), Namespace::Arm);
        assert_eq!(id.index(), 4);
    }

    #[test]
    fn std_ids_live_in_namespace_zero() {
        let id = ObjectId::std(StdObject::AcpiTableList);
        assert_eq!(id.raw(), 1);
        assert_eq!(id.namespace().unwrap(), Namespace::Standard);
        assert_eq!(id.name(), "AcpiTableList");
    }

    #[test]
    fn arm_index_order_matches_names() {
        for (i, obj) in ArmObject::ALL.iter().enumerate() {
            assert_eq!(*obj as u32, i as u32);
            assert_eq!(ArmObject::from_index(i as u32), Some(*obj));
        }
        assert_eq!(ObjectId::arm(ArmObject::IdMappingArray).name(), "ID Mapping Array");
        assert_eq!(
            ObjectId::arm(ArmObject::GenericInitiatorAffinityInfo).name(),
            "Generic Initiator Affinity"
        );
    }

    #[test]
    fn unknown_and_oem_names() {
        assert_eq!(ObjectId::new(Namespace::Arm, 999).name(), "Unknown");
        assert_eq!(ObjectId::oem(3).name(), "OEM Object");
        assert_eq!(ObjectId::from_raw(0x3000_0000).name(), "Unknown");
        assert!(ObjectId::from_raw(0x3000_0000).namespace().is_err());
    }

    #[test]
    fn display_is_hex() {
        assert_eq!(ObjectId::arm(ArmObject::Pmcg).to_string(), "0x10000017");
        assert_eq!(format!("{:?}", ObjectId::from_raw(2)), "ObjectId(0x00000002)");
    }
}
