use std::fmt;

use dyntab_types::Signature;

use crate::header::{AcpiHeader, ACPI_HEADER_LEN, CHECKSUM_OFFSET};
use crate::wire::read_u32;

/// A finished binary table: header followed by the table body.
#[derive(Clone, PartialEq, Eq)]
pub struct AcpiTable {
    bytes: Vec<u8>,
}

impl AcpiTable {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn signature(&self) -> Option<Signature> {
        read_u32(&self.bytes, 0).map(Signature::from_raw)
    }

    /// The length recorded in the header.
    pub fn length(&self) -> Option<u32> {
        read_u32(&self.bytes, 4)
    }

    pub fn checksum(&self) -> Option<u8> {
        self.bytes.get(CHECKSUM_OFFSET).copied()
    }

    pub fn header(&self) -> Option<AcpiHeader> {
        AcpiHeader::parse(&self.bytes)
    }

    /// Set the checksum byte so that all bytes sum to zero.
    pub fn finalize_checksum(&mut self) {
        if self.bytes.len() < ACPI_HEADER_LEN {
            return;
        }
        self.bytes[CHECKSUM_OFFSET] = 0;
        let sum = self.bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        self.bytes[CHECKSUM_OFFSET] = 0u8.wrapping_sub(sum);
    }

    pub fn is_checksum_valid(&self) -> bool {
        self.bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b)) == 0
    }
}

impl fmt::Debug for AcpiTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcpiTable")
            .field("signature", &self.signature())
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_table() -> AcpiTable {
        let mut bytes = vec![0u8; 40];
        bytes[0..4].copy_from_slice(b"TEST");
        bytes[4..8].copy_from_slice(&40u32.to_le_bytes());
        bytes[36] = 0x5a;
        bytes[39] = 0xff;
        AcpiTable::new(bytes)
    }

    #[test]
    fn checksum_makes_sum_zero() {
        let mut table = make_table();
        assert!(!table.is_checksum_valid());
        table.finalize_checksum();
        assert!(table.is_checksum_valid());
        let first = table.checksum();
        table.finalize_checksum();
        assert_eq!(table.checksum(), first);
        assert!(table.is_checksum_valid());
    }

    #[test]
    fn header_accessors() {
        let table = make_table();
        assert_eq!(table.signature().unwrap().to_string(), "TEST");
        assert_eq!(table.length(), Some(40));
        assert_eq!(table.len(), 40);
    }

    #[test]
    fn short_table_has_no_header() {
        let mut table = AcpiTable::new(vec![1, 2]);
        assert!(table.header().is_none());
        table.finalize_checksum();
        assert_eq!(table.as_bytes(), &[1, 2]);
    }
}
