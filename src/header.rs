//! Header module for the binvar container
//!
//! The header records everything a decoder needs to split the container into
//! its blocks without searching: the reference length, the byte length of the
//! variant block and the wire discipline of the indel records.

use std::io::{Read, Write};

use byteorder::{BigEndian, ByteOrder};

use crate::error::{HeaderError, Result};
use crate::policy::Discipline;

/// Current magic number: "BVAR" in ASCII (big-endian)
///
/// This is used to identify binvar containers and verify file integrity.
#[allow(clippy::unreadable_literal)]
const MAGIC: u32 = 0x42564152;

/// Current format version of the container layout
const FORMAT: u8 = 1;

/// Size of the header in bytes
pub const SIZE_HEADER: usize = 32;

/// Reserved bytes in the header
pub const RESERVED: [u8; 6] = [42; 6];

/// Header structure for binvar containers
///
/// | Offset | Size | Name       | Description                       |
/// | ------ | ---- | ---------- | --------------------------------- |
/// | 0      | 4    | magic      | Magic number (`BVAR`)             |
/// | 4      | 1    | format     | Format version (currently 1)      |
/// | 5      | 1    | discipline | Wire discipline code              |
/// | 6      | 8    | ref_len    | Number of reference symbols       |
/// | 14     | 8    | vlen       | Byte length of the variant block  |
/// | 22     | 4    | nrec       | Number of variant records         |
/// | 26     | 6    | reserved   | Reserved for future use           |
///
/// All integers are big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinvarHeader {
    /// Magic number to identify the file format
    pub magic: u32,

    /// Version of the container layout
    pub format: u8,

    /// Wire discipline of the indel records
    pub discipline: Discipline,

    /// Number of symbols in the reference sequence
    pub ref_len: u64,

    /// Byte length of the variant block
    pub vlen: u64,

    /// Number of variant records in the variant block
    pub nrec: u32,

    /// Reserve remaining bytes for future use
    pub reserved: [u8; 6],
}
impl BinvarHeader {
    #[must_use]
    pub fn new(discipline: Discipline, ref_len: u64, vlen: u64, nrec: u32) -> Self {
        Self {
            magic: MAGIC,
            format: FORMAT,
            discipline,
            ref_len,
            vlen,
            nrec,
            reserved: RESERVED,
        }
    }

    /// Parses a header from a fixed-size byte array
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The magic number is incorrect
    /// * The format version is unsupported
    /// * The discipline code is unknown
    pub fn from_bytes(buffer: &[u8; SIZE_HEADER]) -> Result<Self> {
        let magic = BigEndian::read_u32(&buffer[0..4]);
        if magic != MAGIC {
            return Err(HeaderError::InvalidMagicNumber(magic).into());
        }
        let format = buffer[4];
        if format != FORMAT {
            return Err(HeaderError::InvalidFormatVersion(format).into());
        }
        let discipline = Discipline::from_code(buffer[5])?;
        let ref_len = BigEndian::read_u64(&buffer[6..14]);
        let vlen = BigEndian::read_u64(&buffer[14..22]);
        let nrec = BigEndian::read_u32(&buffer[22..26]);
        let mut reserved = [0u8; 6];
        reserved.copy_from_slice(&buffer[26..32]);
        Ok(Self {
            magic,
            format,
            discipline,
            ref_len,
            vlen,
            nrec,
            reserved,
        })
    }

    /// Parses a header from the start of an arbitrarily sized buffer
    pub fn from_buffer(buffer: &[u8]) -> Result<Self> {
        let mut bytes = [0u8; SIZE_HEADER];
        if buffer.len() < SIZE_HEADER {
            return Err(HeaderError::InvalidSize(buffer.len(), SIZE_HEADER).into());
        }
        bytes.copy_from_slice(&buffer[..SIZE_HEADER]);
        Self::from_bytes(&bytes)
    }

    /// Serializes the header to its binary representation
    #[must_use]
    pub fn to_bytes(&self) -> [u8; SIZE_HEADER] {
        let mut buffer = [0u8; SIZE_HEADER];
        BigEndian::write_u32(&mut buffer[0..4], self.magic);
        buffer[4] = self.format;
        buffer[5] = self.discipline.code();
        BigEndian::write_u64(&mut buffer[6..14], self.ref_len);
        BigEndian::write_u64(&mut buffer[14..22], self.vlen);
        BigEndian::write_u32(&mut buffer[22..26], self.nrec);
        buffer[26..32].copy_from_slice(&self.reserved);
        buffer
    }

    /// Writes the header to a writer
    pub fn write_bytes<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.to_bytes())?;
        Ok(())
    }

    /// Reads exactly `SIZE_HEADER` bytes from a reader and parses them
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buffer = [0u8; SIZE_HEADER];
        reader.read_exact(&mut buffer)?;
        Self::from_bytes(&buffer)
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::error::Error;
    use std::io::Cursor;

    #[test]
    fn test_header_roundtrip() -> Result<()> {
        let header = BinvarHeader::new(Discipline::Fixed, 135_086_622, 1_234, 77);
        let mut buf = Vec::new();
        header.write_bytes(&mut buf)?;
        assert_eq!(buf.len(), SIZE_HEADER);
        assert_eq!(&buf[..4], b"BVAR");
        assert_eq!(BinvarHeader::from_reader(&mut Cursor::new(&buf))?, header);
        Ok(())
    }

    #[test]
    fn test_invalid_magic() {
        let mut bytes = BinvarHeader::new(Discipline::Compact, 1, 0, 0).to_bytes();
        bytes[0] = b'X';
        assert!(matches!(
            BinvarHeader::from_bytes(&bytes),
            Err(Error::HeaderError(HeaderError::InvalidMagicNumber(_)))
        ));
    }

    #[test]
    fn test_invalid_discipline() {
        let mut bytes = BinvarHeader::new(Discipline::Compact, 1, 0, 0).to_bytes();
        bytes[5] = 9;
        assert!(matches!(
            BinvarHeader::from_bytes(&bytes),
            Err(Error::HeaderError(HeaderError::InvalidDiscipline(9)))
        ));
    }

    #[test]
    fn test_short_buffer() {
        assert!(matches!(
            BinvarHeader::from_buffer(&[0u8; 10]),
            Err(Error::HeaderError(HeaderError::InvalidSize(10, SIZE_HEADER)))
        ));
    }
}
