use serde::{Deserialize, Serialize};

use dyntab_types::{GeneratorId, ObjectId, Revision, Signature, StdObject};

use crate::codec::CmObject;

/// Singleton describing the platform's configuration manager.
///
/// Supplies the OEM id and default OEM revision for every table header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerInfo {
    pub revision: Revision,
    pub oem_id: [u8; 6],
}

impl Default for ManagerInfo {
    fn default() -> Self {
        Self {
            revision: Revision::new(1, 1),
            oem_id: [0; 6],
        }
    }
}

impl CmObject for ManagerInfo {
    const OBJECT_ID: ObjectId = ObjectId::std(StdObject::CfgMgrInfo);
}

/// One entry of the list of tables the platform wants built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcpiTableInfo {
    pub signature: Signature,
    /// Requested table revision.
    pub revision: u8,
    pub generator_id: GeneratorId,
    /// Zero selects the derived default.
    pub oem_table_id: u64,
    /// Zero selects the manager revision.
    pub oem_revision: u32,
}

impl AcpiTableInfo {
    pub fn new(signature: Signature, revision: u8, generator_id: GeneratorId) -> Self {
        Self {
            signature,
            revision,
            generator_id,
            oem_table_id: 0,
            oem_revision: 0,
        }
    }
}

impl CmObject for AcpiTableInfo {
    const OBJECT_ID: ObjectId = ObjectId::std(StdObject::AcpiTableList);
}

#[cfg(test)]
mod tests {
    use super::*;
    use dyntab_types::{StdAcpiTableId, Token};

    #[test]
    fn manager_info_defaults_to_revision_1_1() {
        let info = ManagerInfo::default();
        assert_eq!(info.revision, Revision::new(1, 1));
        assert_eq!(info.oem_id, [0; 6]);
    }

    #[test]
    fn table_info_survives_the_codec() {
        let info = AcpiTableInfo::new(
            Signature::from_bytes(*b"IORT"),
            0,
            GeneratorId::std_acpi(StdAcpiTableId::Iort),
        );
        let desc = AcpiTableInfo::encode_all(&[info.clone()], Token::NULL).unwrap();
        assert_eq!(AcpiTableInfo::decode_all(&desc).unwrap(), vec![info]);
    }
}
