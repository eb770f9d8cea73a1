use std::collections::HashMap;

use dyntab_repo::{
    AcpiTableInfo, CmObject, ConfigRepository, ConfigurationManager, ManagerInfo, RepoError,
    RepositoryExt,
};
use dyntab_tables::objects::{
    DeviceHandleAcpi, DeviceHandlePci, GenericInitiatorAffinityInfo, IdMapping, ItsGroupNode,
    ItsIdentifier, NamedComponentNode, PmcgNode, RootComplexNode, SmmuV1SmmuV2Node, SmmuV3Node,
    DEVICE_HANDLE_TYPE_ACPI, DEVICE_HANDLE_TYPE_PCI,
};
use dyntab_types::Token;

use crate::config::{DeviceHandleConfig, IdMappingConfig, PlatformConfig};
use crate::error::{PlatformError, PlatformResult};

/// Tokens issued while applying one description.
struct Tokens<'a> {
    manager: &'a ConfigurationManager,
    nodes: HashMap<&'a str, Token>,
}

impl<'a> Tokens<'a> {
    fn new(manager: &'a ConfigurationManager, config: &'a PlatformConfig) -> Self {
        let nodes = config
            .node_names()
            .map(|name| (name, manager.new_token()))
            .collect();
        Self { manager, nodes }
    }

    fn node(&self, name: &str) -> PlatformResult<Token> {
        self.nodes
            .get(name)
            .copied()
            .ok_or_else(|| PlatformError::UnknownReference(name.to_string()))
    }

    /// Store `items` under a fresh token; an empty list stays untokenized.
    fn array<T: CmObject>(&self, items: &[T]) -> PlatformResult<(u32, Token)> {
        if items.is_empty() {
            return Ok((0, Token::NULL));
        }
        let token = self.manager.new_token();
        self.manager.repository().add_objects(token, items)?;
        Ok((items.len() as u32, token))
    }

    fn id_mappings(&self, mappings: &[IdMappingConfig]) -> PlatformResult<(u32, Token)> {
        let records = mappings
            .iter()
            .map(|m| {
                Ok(IdMapping {
                    input_base: m.input_base,
                    num_ids: m.num_ids,
                    output_base: m.output_base,
                    output_reference_token: self.node(&m.output)?,
                    flags: m.flags,
                })
            })
            .collect::<PlatformResult<Vec<_>>>()?;
        self.array(&records)
    }
}

impl PlatformConfig {
    /// Write the whole description into an installed manager's repository.
    ///
    /// Fails with [`RepoError::Unsupported`] before installation, so a
    /// ready-callback built on this is retried on the next install.
    pub fn populate(&self, manager: &ConfigurationManager) -> PlatformResult<()> {
        if !manager.is_installed() {
            return Err(RepoError::Unsupported.into());
        }
        self.validate()?;

        let repo = manager.repository();
        let info = self.manager.to_info()?;
        repo.set(
            ManagerInfo::OBJECT_ID,
            Token::NULL,
            Some(ManagerInfo::encode_all(&[info], Token::NULL)?),
        )?;

        let tables: Vec<AcpiTableInfo> = self.tables.iter().map(|t| t.to_info()).collect();
        repo.add_objects(Token::NULL, &tables)?;

        repo.add_objects(Token::NULL, &self.gicc)?;
        repo.add_objects(Token::NULL, &self.gicd)?;
        repo.add_objects(Token::NULL, &self.gic_msi_frames)?;
        repo.add_objects(Token::NULL, &self.gic_redistributors)?;
        repo.add_objects(Token::NULL, &self.gic_its)?;
        repo.add_objects(Token::NULL, &self.pci_config_spaces)?;
        repo.add_objects(Token::NULL, &self.memory_affinity)?;

        let tokens = Tokens::new(manager, self);
        self.populate_iort(&tokens)?;
        self.populate_initiators(&tokens)?;

        tracing::info!(
            tables = self.tables.len(),
            nodes = tokens.nodes.len(),
            "platform description applied"
        );
        Ok(())
    }

    /// Defer [`populate`](Self::populate) until the manager is installed.
    pub fn register(self, manager: &ConfigurationManager) {
        manager.register_on_ready(Box::new(move |m: &ConfigurationManager| {
            self.populate(m).map_err(RepoError::from)
        }));
    }

    fn populate_iort(&self, tokens: &Tokens<'_>) -> PlatformResult<()> {
        let repo = tokens.manager.repository();

        for group in &self.its_groups {
            let token = tokens.node(&group.name)?;
            let ids: Vec<ItsIdentifier> = group
                .its_ids
                .iter()
                .map(|&its_id| ItsIdentifier { its_id })
                .collect();
            let (its_id_count, its_id_token) = tokens.array(&ids)?;
            let node = ItsGroupNode {
                token,
                its_id_count,
                its_id_token,
            };
            repo.add_object(token, &node)?;
        }

        for nc in &self.named_components {
            let token = tokens.node(&nc.name)?;
            let (id_mapping_count, id_mapping_token) = tokens.id_mappings(&nc.id_mappings)?;
            let node = NamedComponentNode {
                token,
                id_mapping_count,
                id_mapping_token,
                flags: nc.flags,
                cache_coherent: nc.cache_coherent,
                allocation_hints: nc.allocation_hints,
                memory_access_flags: nc.memory_access_flags,
                address_size_limit: nc.address_size_limit,
                object_name: nc.object_name.clone(),
            };
            repo.add_object(token, &node)?;
        }

        for rc in &self.root_complexes {
            let token = tokens.node(&rc.name)?;
            let (id_mapping_count, id_mapping_token) = tokens.id_mappings(&rc.id_mappings)?;
            let node = RootComplexNode {
                token,
                id_mapping_count,
                id_mapping_token,
                cache_coherent: rc.cache_coherent,
                allocation_hints: rc.allocation_hints,
                memory_access_flags: rc.memory_access_flags,
                ats_attribute: rc.ats_attribute,
                pci_segment_number: rc.pci_segment_number,
                memory_address_size: rc.memory_address_size,
            };
            repo.add_object(token, &node)?;
        }

        for smmu in &self.smmu_v1v2 {
            let token = tokens.node(&smmu.name)?;
            let (id_mapping_count, id_mapping_token) = tokens.id_mappings(&smmu.id_mappings)?;
            let (context_interrupt_count, context_interrupt_token) =
                tokens.array(&smmu.context_interrupts)?;
            let (pmu_interrupt_count, pmu_interrupt_token) = tokens.array(&smmu.pmu_interrupts)?;
            let node = SmmuV1SmmuV2Node {
                token,
                id_mapping_count,
                id_mapping_token,
                base_address: smmu.base_address,
                span: smmu.span,
                model: smmu.model,
                flags: smmu.flags,
                context_interrupt_count,
                context_interrupt_token,
                pmu_interrupt_count,
                pmu_interrupt_token,
                nsg_irpt: smmu.nsg_irpt,
                nsg_irpt_flags: smmu.nsg_irpt_flags,
                nsg_cfg_irpt: smmu.nsg_cfg_irpt,
                nsg_cfg_irpt_flags: smmu.nsg_cfg_irpt_flags,
            };
            repo.add_object(token, &node)?;
        }

        for smmu in &self.smmu_v3 {
            let token = tokens.node(&smmu.name)?;
            let (id_mapping_count, id_mapping_token) = tokens.id_mappings(&smmu.id_mappings)?;
            let node = SmmuV3Node {
                token,
                id_mapping_count,
                id_mapping_token,
                base_address: smmu.base_address,
                flags: smmu.flags,
                vatos_address: smmu.vatos_address,
                model: smmu.model,
                event_interrupt: smmu.event_interrupt,
                pri_interrupt: smmu.pri_interrupt,
                gerr_interrupt: smmu.gerr_interrupt,
                sync_interrupt: smmu.sync_interrupt,
                proximity_domain: smmu.proximity_domain,
                device_id_mapping_index: smmu.device_id_mapping_index,
            };
            repo.add_object(token, &node)?;
        }

        for pmcg in &self.pmcgs {
            let token = tokens.node(&pmcg.name)?;
            let (id_mapping_count, id_mapping_token) = tokens.id_mappings(&pmcg.id_mappings)?;
            let node = PmcgNode {
                token,
                id_mapping_count,
                id_mapping_token,
                base_address: pmcg.base_address,
                overflow_interrupt: pmcg.overflow_interrupt,
                page1_base_address: pmcg.page1_base_address,
                reference_token: tokens.node(&pmcg.reference)?,
            };
            repo.add_object(token, &node)?;
        }
        Ok(())
    }

    fn populate_initiators(&self, tokens: &Tokens<'_>) -> PlatformResult<()> {
        let repo = tokens.manager.repository();
        for gi in &self.generic_initiators {
            let device_handle_token = tokens.manager.new_token();
            let device_handle_type = match gi.device {
                DeviceHandleConfig::Acpi { hid, uid } => {
                    repo.add_object(device_handle_token, &DeviceHandleAcpi { hid, uid })?;
                    DEVICE_HANDLE_TYPE_ACPI
                }
                DeviceHandleConfig::Pci {
                    segment,
                    bus,
                    device,
                    function,
                } => {
                    let handle = DeviceHandlePci {
                        segment_number: segment,
                        bus_number: bus,
                        device_number: device,
                        function_number: function,
                    };
                    repo.add_object(device_handle_token, &handle)?;
                    DEVICE_HANDLE_TYPE_PCI
                }
            };
            let info = GenericInitiatorAffinityInfo {
                proximity_domain: gi.proximity_domain,
                flags: gi.flags,
                device_handle_type,
                device_handle_token,
            };
            repo.add_object(Token::NULL, &info)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dyntab_tables::objects::{GicCInfo, PciConfigSpaceInfo};
    use dyntab_tables::TableManager;
    use dyntab_types::{ArmObject, ObjectId, Signature};

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    const PLATFORM: &str = r#"
        [manager]
        oem_id = "ACME"

        [[tables]]
        signature = "IORT"
        revision = 0
        generator = "iort"

        [[tables]]
        signature = "MCFG"
        revision = 1
        generator = "mcfg"

        [[pci_config_spaces]]
        base_address = 0x40000000
        end_bus_number = 0xff

        [[its_groups]]
        name = "its0"
        its_ids = [0, 1]

        [[smmu_v3]]
        name = "smmu0"
        base_address = 0x2b400000

        [[smmu_v3.id_mappings]]
        num_ids = 0xffff
        output = "its0"

        [[root_complexes]]
        name = "rc0"

        [[root_complexes.id_mappings]]
        num_ids = 0xffff
        output = "smmu0"

        [[pmcgs]]
        name = "pmcg0"
        reference = "smmu0"

        [[generic_initiators]]
        proximity_domain = 2
        device = { type = "acpi", hid = 0x1234, uid = 7 }
    "#;

    fn make_installed() -> ConfigurationManager {
        let manager = ConfigurationManager::new();
        manager.install().unwrap();
        manager
    }

    // -----------------------------------------------------------------------
    // populate
    // -----------------------------------------------------------------------

    #[test]
    fn populate_writes_manager_info_and_tables() {
        let manager = make_installed();
        let config = PlatformConfig::from_toml_str(PLATFORM).unwrap();
        config.populate(&manager).unwrap();

        let repo = manager.repository();
        let info: ManagerInfo = repo.get_object().unwrap();
        assert_eq!(&info.oem_id, b"ACME  ");
        let tables: Vec<AcpiTableInfo> = repo.get_list(Token::NULL).unwrap();
        assert_eq!(tables.len(), 2);
        let spaces: Vec<PciConfigSpaceInfo> = repo.get_list(Token::NULL).unwrap();
        assert_eq!(spaces[0].base_address, 0x4000_0000);
    }

    #[test]
    fn references_resolve_to_node_tokens() {
        let manager = make_installed();
        PlatformConfig::from_toml_str(PLATFORM)
            .unwrap()
            .populate(&manager)
            .unwrap();
        let repo = manager.repository();

        let smmus: Vec<SmmuV3Node> = repo.get_list(Token::NULL).unwrap();
        let pmcgs: Vec<PmcgNode> = repo.get_list(Token::NULL).unwrap();
        assert_eq!(pmcgs[0].reference_token, smmus[0].token);

        let rcs: Vec<RootComplexNode> = repo.get_list(Token::NULL).unwrap();
        let mappings: Vec<IdMapping> = repo.get_list(rcs[0].id_mapping_token).unwrap();
        assert_eq!(mappings[0].output_reference_token, smmus[0].token);

        let groups: Vec<ItsGroupNode> = repo.get_list(Token::NULL).unwrap();
        assert_eq!(groups[0].its_id_count, 2);
        let ids: Vec<ItsIdentifier> = repo.get_list(groups[0].its_id_token).unwrap();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn node_without_mappings_has_null_token() {
        let manager = make_installed();
        PlatformConfig::from_toml_str(PLATFORM)
            .unwrap()
            .populate(&manager)
            .unwrap();
        let pmcgs: Vec<PmcgNode> = manager.repository().get_list(Token::NULL).unwrap();
        assert_eq!(pmcgs[0].id_mapping_count, 0);
        assert!(pmcgs[0].id_mapping_token.is_null());
    }

    #[test]
    fn generic_initiator_gets_device_handle() {
        let manager = make_installed();
        PlatformConfig::from_toml_str(PLATFORM)
            .unwrap()
            .populate(&manager)
            .unwrap();
        let repo = manager.repository();
        let gi: GenericInitiatorAffinityInfo = repo.get_object().unwrap();
        assert_eq!(gi.device_handle_type, DEVICE_HANDLE_TYPE_ACPI);
        let handle: Vec<DeviceHandleAcpi> = repo.get_list(gi.device_handle_token).unwrap();
        assert_eq!(handle, vec![DeviceHandleAcpi { hid: 0x1234, uid: 7 }]);
    }

    #[test]
    fn populate_before_install_is_unsupported() {
        let manager = ConfigurationManager::new();
        let err = PlatformConfig::default().populate(&manager).unwrap_err();
        assert!(matches!(
            err,
            PlatformError::Repository(RepoError::Unsupported)
        ));
    }

    #[test]
    fn populated_platform_builds_tables() {
        let manager = make_installed();
        PlatformConfig::from_toml_str(PLATFORM)
            .unwrap()
            .populate(&manager)
            .unwrap();
        let tables = TableManager::default().build_installed(&manager).unwrap();
        let signatures: Vec<Signature> = tables.iter().filter_map(|t| t.signature()).collect();
        assert!(signatures.contains(&Signature::from_bytes(*b"IORT")));
        assert!(signatures.contains(&Signature::from_bytes(*b"MCFG")));
        assert!(tables.iter().all(|t| t.is_checksum_valid()));
    }

    #[test]
    fn demo_platform_builds_every_table() {
        let manager = make_installed();
        PlatformConfig::from_toml_str(include_str!("../../../demos/platform.toml"))
            .unwrap()
            .populate(&manager)
            .unwrap();
        let tables = TableManager::default().build_installed(&manager).unwrap();
        assert_eq!(tables.len(), 4);
        assert!(tables.iter().all(|t| t.is_checksum_valid()));
    }

    // -----------------------------------------------------------------------
    // register
    // -----------------------------------------------------------------------

    #[test]
    fn register_defers_until_install() {
        let manager = ConfigurationManager::new();
        let config = PlatformConfig {
            gicc: vec![GicCInfo::default()],
            ..Default::default()
        };
        config.register(&manager);
        assert_eq!(manager.pending_callbacks(), 1);
        assert_eq!(
            manager
                .repository()
                .count_only(ObjectId::arm(ArmObject::GicCInfo))
                .unwrap(),
            0
        );

        assert_eq!(manager.install().unwrap(), 1);
        assert_eq!(manager.pending_callbacks(), 0);
        assert_eq!(
            manager
                .repository()
                .count_only(ObjectId::arm(ArmObject::GicCInfo))
                .unwrap(),
            1
        );
    }

    #[test]
    fn register_after_install_runs_at_once() {
        let manager = make_installed();
        PlatformConfig::from_toml_str(PLATFORM)
            .unwrap()
            .register(&manager);
        let info: ManagerInfo = manager.repository().get_object().unwrap();
        assert_eq!(&info.oem_id, b"ACME  ");
    }
}
