use crate::base::packed_len;
use crate::error::{HeaderError, Result};

/// Maximum number of symbols stored for an insertion; longer payloads are truncated
pub const MAX_INSERTION_LEN: usize = 64;

/// Size of the fixed insertion payload field under [`Discipline::Fixed`]
pub const FIXED_PAYLOAD_SIZE: usize = 16;

/// Wire discipline for insertion and deletion records
///
/// A container carries exactly one discipline, recorded in its header.
/// SNP records are identical under both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Discipline {
    /// 2-byte length fields and insertion payloads sized to `ceil(len*2/8)` bytes.
    ///
    /// Insertions containing symbols outside `ACGT` are kept (packed as `A`).
    #[default]
    Compact,
    /// 1-byte length fields and insertion payloads padded to a fixed 16 bytes.
    ///
    /// Insertions containing symbols outside `ACGT` are dropped.
    Fixed,
}
impl Discipline {
    /// Code stored in the container header
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Compact => 1,
            Self::Fixed => 2,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Self::Compact),
            2 => Ok(Self::Fixed),
            x => Err(HeaderError::InvalidDiscipline(x).into()),
        }
    }

    /// Width in bytes of the indel length field
    #[must_use]
    pub fn length_width(self) -> usize {
        match self {
            Self::Compact => 2,
            Self::Fixed => 1,
        }
    }

    /// Longest deletion that fits the length field
    #[must_use]
    pub fn max_deletion(self) -> usize {
        match self {
            Self::Compact => u16::MAX as usize,
            Self::Fixed => u8::MAX as usize,
        }
    }

    /// Size of the insertion payload field for `len` symbols
    #[must_use]
    pub fn insertion_payload_size(self, len: usize) -> usize {
        match self {
            Self::Compact => packed_len(len),
            Self::Fixed => FIXED_PAYLOAD_SIZE,
        }
    }

    /// Whether insertions with symbols outside `ACGT` are encoded
    #[must_use]
    pub fn accepts_unresolved_insertions(self) -> bool {
        matches!(self, Self::Compact)
    }
}

/// Policy for enumerating the alternate alleles of a multi-allelic site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlleleSelection {
    /// Encode the alleles named by the sample genotype.
    ///
    /// Falls back to every alternate when the row carries no genotype.
    #[default]
    Called,
    /// Encode every alternate allele of the site
    All,
}
impl AlleleSelection {
    /// Returns the 1-based alternate allele indices to encode
    ///
    /// # Arguments
    /// * `num_alts` - Number of alternate alleles at the site
    /// * `genotype` - The raw genotype string of the sample, if present
    #[must_use]
    pub fn select(self, num_alts: usize, genotype: Option<&str>) -> Vec<usize> {
        match (self, genotype) {
            (Self::Called, Some(gt)) => {
                let mut indices: Vec<usize> = gt
                    .split(['/', '|'])
                    .filter_map(|allele| allele.parse::<usize>().ok())
                    .filter(|&idx| idx > 0 && idx <= num_alts)
                    .collect();
                indices.sort_unstable();
                indices.dedup();
                indices
            }
            _ => (1..=num_alts).collect(),
        }
    }
}

#[cfg(test)]
mod testing {
    use super::*;

    #[test]
    fn test_discipline_codes() -> Result<()> {
        for d in [Discipline::Compact, Discipline::Fixed] {
            assert_eq!(Discipline::from_code(d.code())?, d);
        }
        assert!(Discipline::from_code(0).is_err());
        Ok(())
    }

    #[test]
    fn test_payload_sizes() {
        assert_eq!(Discipline::Compact.insertion_payload_size(5), 2);
        assert_eq!(Discipline::Compact.insertion_payload_size(64), 16);
        assert_eq!(Discipline::Fixed.insertion_payload_size(1), 16);
    }

    #[test]
    fn test_called_alleles() {
        let sel = AlleleSelection::Called;
        assert_eq!(sel.select(2, Some("0/1")), vec![1]);
        assert_eq!(sel.select(2, Some("2|1")), vec![1, 2]);
        assert_eq!(sel.select(2, Some("1/1")), vec![1]);
        assert!(sel.select(2, Some("0/0")).is_empty());
        assert!(sel.select(1, Some("./.")).is_empty());
        assert!(sel.select(1, Some("0/3")).is_empty());
        assert_eq!(sel.select(3, None), vec![1, 2, 3]);
    }

    #[test]
    fn test_all_alleles() {
        assert_eq!(AlleleSelection::All.select(2, Some("0/0")), vec![1, 2]);
    }
}
