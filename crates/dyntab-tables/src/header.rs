use dyntab_repo::{AcpiTableInfo, ManagerInfo};
use dyntab_types::Signature;

use crate::error::{TableError, TableResult};
use crate::generator::Generator;
use crate::wire::{read_u32, read_u64, WireWriter};

/// Length of the header shared by every ACPI table.
pub const ACPI_HEADER_LEN: usize = 36;

/// Byte offset of the checksum field.
pub const CHECKSUM_OFFSET: usize = 9;

/// The 36-byte description header at the start of every table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcpiHeader {
    pub signature: Signature,
    pub length: u32,
    pub revision: u8,
    pub checksum: u8,
    pub oem_id: [u8; 6],
    pub oem_table_id: u64,
    pub oem_revision: u32,
    pub creator_id: u32,
    pub creator_revision: u32,
}

impl AcpiHeader {
    /// Header for a table of `length` bytes built by `generator`.
    ///
    /// The OEM id comes from the manager info. A zero OEM table id in the
    /// request defaults to the first four OEM id bytes in the low half and
    /// the signature in the high half; a zero OEM revision defaults to the
    /// manager revision. The checksum is left at zero.
    pub fn for_request(
        generator: &dyn Generator,
        request: &AcpiTableInfo,
        info: &ManagerInfo,
        length: usize,
    ) -> TableResult<Self> {
        if length < ACPI_HEADER_LEN {
            return Err(TableError::InvalidParameter(format!(
                "table length {length} is smaller than the {ACPI_HEADER_LEN}-byte header"
            )));
        }
        let length = u32::try_from(length).map_err(|_| {
            TableError::InvalidParameter(format!("table length {length} exceeds u32"))
        })?;

        let oem_table_id = if request.oem_table_id != 0 {
            request.oem_table_id
        } else {
            let low = u32::from_le_bytes([info.oem_id[0], info.oem_id[1], info.oem_id[2], info.oem_id[3]]);
            u64::from(low) | (u64::from(generator.signature().raw()) << 32)
        };
        let oem_revision = if request.oem_revision != 0 {
            request.oem_revision
        } else {
            info.revision.raw()
        };

        Ok(Self {
            signature: request.signature,
            length,
            revision: request.revision,
            checksum: 0,
            oem_id: info.oem_id,
            oem_table_id,
            oem_revision,
            creator_id: generator.creator_id(),
            creator_revision: generator.creator_revision().raw(),
        })
    }

    pub fn write(&self, w: &mut WireWriter<'_>) -> TableResult<()> {
        w.u32(self.signature.raw())?;
        w.u32(self.length)?;
        w.u8(self.revision)?;
        w.u8(self.checksum)?;
        w.bytes(&self.oem_id)?;
        w.u64(self.oem_table_id)?;
        w.u32(self.oem_revision)?;
        w.u32(self.creator_id)?;
        w.u32(self.creator_revision)
    }

    /// Decode the header at the start of `bytes`.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < ACPI_HEADER_LEN {
            return None;
        }
        let mut oem_id = [0u8; 6];
        oem_id.copy_from_slice(&bytes[10..16]);
        Some(Self {
            signature: Signature::from_raw(read_u32(bytes, 0)?),
            length: read_u32(bytes, 4)?,
            revision: bytes[8],
            checksum: bytes[CHECKSUM_OFFSET],
            oem_id,
            oem_table_id: read_u64(bytes, 16)?,
            oem_revision: read_u32(bytes, 24)?,
            creator_id: read_u32(bytes, 28)?,
            creator_revision: read_u32(bytes, 32)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::McfgGenerator;
    use dyntab_types::{GeneratorId, Revision, StdAcpiTableId};

    fn make_request() -> AcpiTableInfo {
        AcpiTableInfo::new(
            Signature::from_bytes(*b"MCFG"),
            1,
            GeneratorId::std_acpi(StdAcpiTableId::Mcfg),
        )
    }

    fn make_info() -> ManagerInfo {
        ManagerInfo {
            revision: Revision::new(1, 1),
            oem_id: *b"ARMLTD",
        }
    }

    #[test]
    fn defaults_derive_from_manager_info() {
        let header =
            AcpiHeader::for_request(&McfgGenerator::new(), &make_request(), &make_info(), 60).unwrap();
        assert_eq!(header.length, 60);
        assert_eq!(header.oem_id, *b"ARMLTD");
        assert_eq!(header.oem_revision, Revision::new(1, 1).raw());
        let expected = u64::from(u32::from_le_bytes(*b"ARML"))
            | (u64::from(u32::from_le_bytes(*b"MCFG")) << 32);
        assert_eq!(header.oem_table_id, expected);
        assert_eq!(header.creator_id, u32::from_le_bytes(*b"ARMH"));
        assert_eq!(header.creator_revision, Revision::new(1, 0).raw());
        assert_eq!(header.checksum, 0);
    }

    #[test]
    fn request_overrides_win() {
        let mut request = make_request();
        request.oem_table_id = 0x1234;
        request.oem_revision = 7;
        let header =
            AcpiHeader::for_request(&McfgGenerator::new(), &request, &make_info(), 44).unwrap();
        assert_eq!(header.oem_table_id, 0x1234);
        assert_eq!(header.oem_revision, 7);
    }

    #[test]
    fn rejects_length_below_header() {
        let err = AcpiHeader::for_request(&McfgGenerator::new(), &make_request(), &make_info(), 20)
            .unwrap_err();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn write_then_parse() {
        let header =
            AcpiHeader::for_request(&McfgGenerator::new(), &make_request(), &make_info(), 44).unwrap();
        let mut buf = [0u8; ACPI_HEADER_LEN];
        let mut w = WireWriter::new(&mut buf);
        header.write(&mut w).unwrap();
        w.finish().unwrap();
        assert_eq!(&buf[0..4], b"MCFG");
        assert_eq!(&buf[10..16], b"ARMLTD");
        assert_eq!(AcpiHeader::parse(&buf), Some(header));
    }
}
