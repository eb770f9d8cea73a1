//! Little-endian writer over a pre-sized, zeroed output slice.

use crate::error::{TableError, TableResult};

/// Sequential little-endian writer.
///
/// Writes never grow the buffer: the layout engine sizes every node up
/// front, so running past the end means a size function and its populate
/// function disagree.
pub struct WireWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> WireWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current write position.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn bytes(&mut self, data: &[u8]) -> TableResult<()> {
        let end = self.pos + data.len();
        if end > self.buf.len() {
            return Err(TableError::BadBufferSize(format!(
                "write of {} bytes at {} overruns {}-byte buffer",
                data.len(),
                self.pos,
                self.buf.len()
            )));
        }
        self.buf[self.pos..end].copy_from_slice(data);
        self.pos = end;
        Ok(())
    }

    pub fn u8(&mut self, v: u8) -> TableResult<()> {
        self.bytes(&[v])
    }

    pub fn u16(&mut self, v: u16) -> TableResult<()> {
        self.bytes(&v.to_le_bytes())
    }

    pub fn u32(&mut self, v: u32) -> TableResult<()> {
        self.bytes(&v.to_le_bytes())
    }

    pub fn u64(&mut self, v: u64) -> TableResult<()> {
        self.bytes(&v.to_le_bytes())
    }

    /// Skip reserved bytes, leaving them zero.
    pub fn reserved(&mut self, len: usize) -> TableResult<()> {
        if len > self.remaining() {
            return Err(TableError::BadBufferSize(format!(
                "skip of {len} bytes at {} overruns {}-byte buffer",
                self.pos,
                self.buf.len()
            )));
        }
        self.pos += len;
        Ok(())
    }

    /// Move to an absolute position within the buffer.
    pub fn seek(&mut self, pos: usize) -> TableResult<()> {
        if pos > self.buf.len() {
            return Err(TableError::BadBufferSize(format!(
                "seek to {pos} past {}-byte buffer",
                self.buf.len()
            )));
        }
        self.pos = pos;
        Ok(())
    }

    /// Fails unless every byte has been accounted for.
    pub fn finish(self) -> TableResult<()> {
        if self.pos != self.buf.len() {
            return Err(TableError::BadBufferSize(format!(
                "wrote {} of {} bytes",
                self.pos,
                self.buf.len()
            )));
        }
        Ok(())
    }
}

/// Read a little-endian `u16` at `offset`.
pub fn read_u16(buf: &[u8], offset: usize) -> Option<u16> {
    buf.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
}

/// Read a little-endian `u32` at `offset`.
pub fn read_u32(buf: &[u8], offset: usize) -> Option<u32> {
    buf.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Read a little-endian `u64` at `offset`.
pub fn read_u64(buf: &[u8], offset: usize) -> Option<u64> {
    let b = buf.get(offset..offset + 8)?;
    let mut arr = [0u8; 8];
    arr.copy_from_slice(b);
    Some(u64::from_le_bytes(arr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_little_endian() {
        let mut buf = [0u8; 15];
        let mut w = WireWriter::new(&mut buf);
        w.u8(0xaa).unwrap();
        w.u16(0x0102).unwrap();
        w.u32(0x0304_0506).unwrap();
        w.u64(0x0708_090a_0b0c_0d0e).unwrap();
        w.finish().unwrap();
        assert_eq!(buf[0], 0xaa);
        assert_eq!(read_u16(&buf, 1), Some(0x0102));
        assert_eq!(read_u32(&buf, 3), Some(0x0304_0506));
        assert_eq!(read_u64(&buf, 7), Some(0x0708_090a_0b0c_0d0e));
    }

    #[test]
    fn overrun_is_an_error() {
        let mut buf = [0u8; 3];
        let mut w = WireWriter::new(&mut buf);
        assert!(w.u16(1).is_ok());
        assert!(matches!(w.u16(2), Err(TableError::BadBufferSize(_))));
        assert!(w.reserved(2).is_err());
    }

    #[test]
    fn finish_requires_full_buffer() {
        let mut buf = [0u8; 4];
        let mut w = WireWriter::new(&mut buf);
        w.u16(1).unwrap();
        assert!(w.finish().is_err());
    }

    #[test]
    fn reserved_and_seek_leave_zeroes() {
        let mut buf = [0u8; 8];
        let mut w = WireWriter::new(&mut buf);
        w.reserved(4).unwrap();
        w.u8(9).unwrap();
        w.seek(7).unwrap();
        w.u8(1).unwrap();
        assert_eq!(buf, [0, 0, 0, 0, 9, 0, 0, 1]);
    }

    #[test]
    fn reads_out_of_range_are_none() {
        let buf = [0u8; 3];
        assert_eq!(read_u32(&buf, 0), None);
        assert_eq!(read_u16(&buf, 2), None);
    }
}
