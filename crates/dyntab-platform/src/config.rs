use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use dyntab_repo::{AcpiTableInfo, ManagerInfo};
use dyntab_tables::objects::{
    GicCInfo, GicDInfo, GicItsInfo, GicMsiFrameInfo, GicRedistributorInfo, MemoryAffinityInfo,
    PciConfigSpaceInfo, SmmuInterrupt,
};
use dyntab_types::{GeneratorId, Revision, Signature};

use crate::error::{PlatformError, PlatformResult};

// ---------------------------------------------------------------------------
// Manager and table list
// ---------------------------------------------------------------------------

/// The `[manager]` section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Up to six ASCII characters, space padded.
    pub oem_id: String,
    /// `major.minor`.
    pub revision: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            oem_id: "ARMLTD".into(),
            revision: "1.1".into(),
        }
    }
}

impl ManagerConfig {
    pub fn to_info(&self) -> PlatformResult<ManagerInfo> {
        if !self.oem_id.is_ascii() || self.oem_id.len() > 6 {
            return Err(PlatformError::Invalid(format!(
                "OEM id {:?} must be at most 6 ASCII characters",
                self.oem_id
            )));
        }
        let mut oem_id = [b' '; 6];
        oem_id[..self.oem_id.len()].copy_from_slice(self.oem_id.as_bytes());
        let revision = self
            .revision
            .parse::<Revision>()
            .map_err(|e| PlatformError::Invalid(e.to_string()))?;
        Ok(ManagerInfo { revision, oem_id })
    }
}

/// One `[[tables]]` entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    pub signature: Signature,
    pub revision: u8,
    /// Generator name such as `"iort"`, `oem:<n>`, or a raw `0x` id.
    pub generator: GeneratorId,
    #[serde(default)]
    pub oem_table_id: u64,
    #[serde(default)]
    pub oem_revision: u32,
}

impl TableConfig {
    pub fn to_info(&self) -> AcpiTableInfo {
        AcpiTableInfo {
            signature: self.signature,
            revision: self.revision,
            generator_id: self.generator,
            oem_table_id: self.oem_table_id,
            oem_revision: self.oem_revision,
        }
    }
}

// ---------------------------------------------------------------------------
// IORT nodes
// ---------------------------------------------------------------------------

/// An ID mapping whose output node is named rather than tokenized.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdMappingConfig {
    pub input_base: u32,
    pub num_ids: u32,
    pub output_base: u32,
    /// Name of the node the ids map to.
    pub output: String,
    pub flags: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItsGroupConfig {
    pub name: String,
    pub its_ids: Vec<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamedComponentConfig {
    pub name: String,
    /// Device object path, e.g. `\_SB.DMA0`.
    pub object_name: String,
    pub flags: u32,
    pub cache_coherent: u32,
    pub allocation_hints: u8,
    pub memory_access_flags: u8,
    pub address_size_limit: u8,
    pub id_mappings: Vec<IdMappingConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootComplexConfig {
    pub name: String,
    pub cache_coherent: u32,
    pub allocation_hints: u8,
    pub memory_access_flags: u8,
    pub ats_attribute: u32,
    pub pci_segment_number: u32,
    pub memory_address_size: u8,
    pub id_mappings: Vec<IdMappingConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmmuV1V2Config {
    pub name: String,
    pub base_address: u64,
    pub span: u64,
    pub model: u32,
    pub flags: u32,
    pub context_interrupts: Vec<SmmuInterrupt>,
    pub pmu_interrupts: Vec<SmmuInterrupt>,
    pub nsg_irpt: u32,
    pub nsg_irpt_flags: u32,
    pub nsg_cfg_irpt: u32,
    pub nsg_cfg_irpt_flags: u32,
    pub id_mappings: Vec<IdMappingConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmmuV3Config {
    pub name: String,
    pub base_address: u64,
    pub flags: u32,
    pub vatos_address: u64,
    pub model: u32,
    pub event_interrupt: u32,
    pub pri_interrupt: u32,
    pub gerr_interrupt: u32,
    pub sync_interrupt: u32,
    pub proximity_domain: u32,
    pub device_id_mapping_index: u32,
    pub id_mappings: Vec<IdMappingConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PmcgConfig {
    pub name: String,
    pub base_address: u64,
    pub overflow_interrupt: u32,
    pub page1_base_address: u64,
    /// Name of the monitored node.
    pub reference: String,
    pub id_mappings: Vec<IdMappingConfig>,
}

// ---------------------------------------------------------------------------
// Affinity
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DeviceHandleConfig {
    Acpi {
        hid: u64,
        uid: u32,
    },
    Pci {
        #[serde(default)]
        segment: u16,
        bus: u8,
        device: u8,
        function: u8,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericInitiatorConfig {
    pub proximity_domain: u32,
    #[serde(default)]
    pub flags: u32,
    pub device: DeviceHandleConfig,
}

// ---------------------------------------------------------------------------
// PlatformConfig
// ---------------------------------------------------------------------------

/// A whole platform description.
///
/// Every array is optional. IORT nodes carry a `name`; ID mappings and PMCG
/// references point at other nodes by that name, and each name becomes a
/// fresh token when the description is applied to a manager.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub manager: ManagerConfig,
    pub tables: Vec<TableConfig>,

    pub gicc: Vec<GicCInfo>,
    pub gicd: Vec<GicDInfo>,
    pub gic_msi_frames: Vec<GicMsiFrameInfo>,
    pub gic_redistributors: Vec<GicRedistributorInfo>,
    pub gic_its: Vec<GicItsInfo>,
    pub pci_config_spaces: Vec<PciConfigSpaceInfo>,

    pub its_groups: Vec<ItsGroupConfig>,
    pub named_components: Vec<NamedComponentConfig>,
    pub root_complexes: Vec<RootComplexConfig>,
    pub smmu_v1v2: Vec<SmmuV1V2Config>,
    pub smmu_v3: Vec<SmmuV3Config>,
    pub pmcgs: Vec<PmcgConfig>,

    pub memory_affinity: Vec<MemoryAffinityInfo>,
    pub generic_initiators: Vec<GenericInitiatorConfig>,
}

impl PlatformConfig {
    /// Parse and validate a description held in memory.
    pub fn from_toml_str(content: &str) -> PlatformResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a description from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> PlatformResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "loading platform description");
        Self::from_toml_str(&content)
    }

    /// Names of every IORT node, in declaration order.
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.its_groups
            .iter()
            .map(|n| n.name.as_str())
            .chain(self.named_components.iter().map(|n| n.name.as_str()))
            .chain(self.root_complexes.iter().map(|n| n.name.as_str()))
            .chain(self.smmu_v1v2.iter().map(|n| n.name.as_str()))
            .chain(self.smmu_v3.iter().map(|n| n.name.as_str()))
            .chain(self.pmcgs.iter().map(|n| n.name.as_str()))
    }

    fn id_mappings(&self) -> impl Iterator<Item = &IdMappingConfig> {
        self.named_components
            .iter()
            .flat_map(|n| &n.id_mappings)
            .chain(self.root_complexes.iter().flat_map(|n| &n.id_mappings))
            .chain(self.smmu_v1v2.iter().flat_map(|n| &n.id_mappings))
            .chain(self.smmu_v3.iter().flat_map(|n| &n.id_mappings))
            .chain(self.pmcgs.iter().flat_map(|n| &n.id_mappings))
    }

    /// Check the manager section, node names, and every cross-reference.
    pub fn validate(&self) -> PlatformResult<()> {
        self.manager.to_info()?;

        let mut names = HashSet::new();
        for name in self.node_names() {
            if name.is_empty() {
                return Err(PlatformError::Invalid("IORT node without a name".into()));
            }
            if !names.insert(name) {
                return Err(PlatformError::DuplicateName(name.to_string()));
            }
        }

        let references = self
            .id_mappings()
            .map(|m| m.output.as_str())
            .chain(self.pmcgs.iter().map(|p| p.reference.as_str()));
        for reference in references {
            if !names.contains(reference) {
                return Err(PlatformError::UnknownReference(reference.to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dyntab_types::StdAcpiTableId;
    use std::io::Write;

    const SAMPLE: &str = r#"
        [manager]
        oem_id = "ACME"
        revision = "1.1"

        [[tables]]
        signature = "IORT"
        revision = 0
        generator = "iort"

        [[tables]]
        signature = "MCFG"
        revision = 1
        generator = "mcfg"
        oem_table_id = 0x1234

        [[gicc]]
        cpu_interface_number = 0
        acpi_processor_uid = 0
        mpidr = 0x80000000

        [[its_groups]]
        name = "its0"
        its_ids = [0]

        [[root_complexes]]
        name = "rc0"
        cache_coherent = 1

        [[root_complexes.id_mappings]]
        num_ids = 0xffff
        output = "its0"

        [[generic_initiators]]
        proximity_domain = 1
        device = { type = "pci", bus = 1, device = 0, function = 0 }
    "#;

    #[test]
    fn parses_sample() {
        let config = PlatformConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.tables.len(), 2);
        assert_eq!(
            config.tables[1].generator,
            GeneratorId::std_acpi(StdAcpiTableId::Mcfg)
        );
        assert_eq!(config.tables[1].oem_table_id, 0x1234);
        assert_eq!(config.gicc[0].mpidr, 0x8000_0000);
        assert_eq!(config.root_complexes[0].id_mappings[0].output, "its0");
        assert_eq!(
            config.generic_initiators[0].device,
            DeviceHandleConfig::Pci {
                segment: 0,
                bus: 1,
                device: 0,
                function: 0
            }
        );
    }

    #[test]
    fn empty_document_is_valid() {
        let config = PlatformConfig::from_toml_str("").unwrap();
        assert_eq!(config, PlatformConfig::default());
    }

    #[test]
    fn oem_id_is_space_padded() {
        let info = ManagerConfig {
            oem_id: "ACME".into(),
            revision: "1.0".into(),
        }
        .to_info()
        .unwrap();
        assert_eq!(&info.oem_id, b"ACME  ");
        assert_eq!(info.revision, Revision::new(1, 0));
    }

    #[test]
    fn long_oem_id_rejected() {
        let manager = ManagerConfig {
            oem_id: "TOOLONGID".into(),
            ..Default::default()
        };
        assert!(matches!(manager.to_info(), Err(PlatformError::Invalid(_))));
    }

    #[test]
    fn bad_revision_rejected() {
        let err = PlatformConfig::from_toml_str("[manager]\nrevision = \"one\"\n").unwrap_err();
        assert!(matches!(err, PlatformError::Invalid(_)));
    }

    #[test]
    fn unknown_generator_is_a_parse_error() {
        let toml = "[[tables]]\nsignature = \"XXXX\"\nrevision = 1\ngenerator = \"nope\"\n";
        let err = PlatformConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, PlatformError::Parse(_)));
    }

    #[test]
    fn unknown_reference_rejected() {
        let toml = r#"
            [[pmcgs]]
            name = "pmcg0"
            reference = "smmu9"
        "#;
        let err = PlatformConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, PlatformError::UnknownReference(name) if name == "smmu9"));
    }

    #[test]
    fn duplicate_names_rejected_across_kinds() {
        let toml = r#"
            [[its_groups]]
            name = "n0"
            [[smmu_v3]]
            name = "n0"
        "#;
        let err = PlatformConfig::from_toml_str(toml).unwrap_err();
        assert!(matches!(err, PlatformError::DuplicateName(name) if name == "n0"));
    }

    #[test]
    fn unnamed_node_rejected() {
        let err = PlatformConfig::from_toml_str("[[its_groups]]\nits_ids = [1]\n").unwrap_err();
        assert!(matches!(err, PlatformError::Invalid(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = PlatformConfig::load(file.path()).unwrap();
        assert_eq!(config.its_groups[0].its_ids, vec![0]);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PlatformConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, PlatformError::Io(_)));
    }
}
