//! Reference packer
//!
//! A reference sequence is stored as two blocks:
//!
//! 1. The reference block: `ceil(L*2/8)` bytes of 2-bit symbols, MSB-first.
//! 2. The mask block: `ceil(L/8)` bytes, one bit per position, MSB-first.
//!    A set bit marks a position whose symbol was outside `ACGT`; it is packed
//!    as `A` and restored as [`UNRESOLVED`].
//!
//! Both blocks zero-pad the unused low bits of their final byte.

use crate::base::{is_resolved, pack_symbols, unpack_symbols, UNRESOLVED};
use crate::error::{ReadError, Result};
use crate::utils::{mask_block_size, reference_block_size};

/// A reference sequence in its packed on-disk representation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackedReference {
    /// Number of symbols in the sequence
    len: usize,
    /// 2-bit packed symbols
    bases: Vec<u8>,
    /// 1-bit unresolved mask
    mask: Vec<u8>,
}
impl PackedReference {
    /// Packs a sequence into its reference and mask blocks
    #[must_use]
    pub fn pack(sequence: &[u8]) -> Self {
        let mut bases = Vec::new();
        pack_symbols(sequence, &mut bases);

        let mut mask = Vec::with_capacity(mask_block_size(sequence.len()));
        for chunk in sequence.chunks(8) {
            let mut byte = 0u8;
            for (i, &s) in chunk.iter().enumerate() {
                if !is_resolved(s) {
                    byte |= 0x80 >> i;
                }
            }
            mask.push(byte);
        }

        Self {
            len: sequence.len(),
            bases,
            mask,
        }
    }

    /// Rebuilds a packed reference from its two blocks and the declared length.
    ///
    /// The blocks are expected back to back at the start of `buffer`; any trailing
    /// bytes are ignored.
    pub fn from_buffer(buffer: &[u8], len: usize) -> Result<Self> {
        let rsize = reference_block_size(len);
        let msize = mask_block_size(len);
        let total = rsize.checked_add(msize).unwrap_or(usize::MAX);
        if buffer.len() < total {
            return Err(ReadError::TruncatedReference {
                expected: total,
                got: buffer.len(),
            }
            .into());
        }
        Ok(Self {
            len,
            bases: buffer[..rsize].to_vec(),
            mask: buffer[rsize..rsize + msize].to_vec(),
        })
    }

    /// Number of symbols in the reference
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The packed 2-bit reference block
    #[must_use]
    pub fn bases(&self) -> &[u8] {
        &self.bases
    }

    /// The packed 1-bit mask block
    #[must_use]
    pub fn mask(&self) -> &[u8] {
        &self.mask
    }

    /// Size in bytes of both blocks together
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.bases.len() + self.mask.len()
    }

    /// Returns true if the position was outside the alphabet at encode time
    #[inline]
    #[must_use]
    pub fn is_masked(&self, pos: usize) -> bool {
        (self.mask[pos / 8] >> (7 - (pos % 8))) & 1 == 1
    }

    /// Number of masked positions
    #[must_use]
    pub fn num_unresolved(&self) -> usize {
        (0..self.len).filter(|&i| self.is_masked(i)).count()
    }

    /// Unpacks the sequence into `out`, writing [`UNRESOLVED`] at masked positions.
    ///
    /// First clears the output buffer.
    pub fn unpack_into(&self, out: &mut Vec<u8>) {
        out.clear();
        unpack_symbols(&self.bases, self.len, out);
        for (i, symbol) in out.iter_mut().enumerate() {
            if self.is_masked(i) {
                *symbol = UNRESOLVED;
            }
        }
    }

    /// Unpacks the sequence into a newly allocated buffer
    #[must_use]
    pub fn unpack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        self.unpack_into(&mut out);
        out
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    #[test]
    fn test_acgtn_blocks() {
        let packed = PackedReference::pack(b"ACGTN");
        assert_eq!(packed.bases(), &[0x1B, 0x00]);
        assert_eq!(packed.mask(), &[0x08]);
        assert_eq!(packed.unpack(), b"ACGTN");
    }

    #[test]
    fn test_roundtrip_random() {
        let mut rng = SmallRng::seed_from_u64(42);
        for len in [0, 1, 3, 4, 7, 8, 9, 255, 1024, 1031] {
            let seq: Vec<u8> = (0..len)
                .map(|_| b"ACGT"[rng.random_range(0..4)])
                .collect();
            let packed = PackedReference::pack(&seq);
            assert_eq!(packed.bases().len(), reference_block_size(len));
            assert_eq!(packed.mask().len(), mask_block_size(len));
            assert_eq!(packed.num_unresolved(), 0);
            assert_eq!(packed.unpack(), seq);
        }
    }

    #[test]
    fn test_mask_does_not_keep_original_symbol() {
        let packed = PackedReference::pack(b"AcRYgTX");
        assert_eq!(packed.unpack(), b"ACNNGTN");
        assert_eq!(packed.num_unresolved(), 3);
    }

    #[test]
    fn test_from_buffer() -> Result<()> {
        let packed = PackedReference::pack(b"ACGTNNACGT");
        let mut buffer = packed.bases().to_vec();
        buffer.extend_from_slice(packed.mask());
        buffer.extend_from_slice(b"trailing");
        let parsed = PackedReference::from_buffer(&buffer, 10)?;
        assert_eq!(parsed, packed);
        Ok(())
    }

    #[test]
    fn test_from_buffer_truncated() {
        let packed = PackedReference::pack(b"ACGTNNACGT");
        let buffer = packed.bases().to_vec();
        assert!(PackedReference::from_buffer(&buffer, 10).is_err());
    }
}
