//! Variant record codec
//!
//! Every record starts with a 1-byte tag and a 4-byte big-endian position:
//!
//! | Kind      | Tag    | Remaining fields                                        |
//! | --------- | ------ | ------------------------------------------------------- |
//! | SNP       | `0x00` | ref code (1), alt code (1)                              |
//! | Insertion | `0x01` | length (1 or 2), packed symbols (16 or `ceil(len*2/8)`) |
//! | Deletion  | `0x02` | length (1 or 2)                                         |
//!
//! Field widths for indels depend on the [`Discipline`] of the container.
//! Deletion records carry no symbols: deleted bases are recoverable from the
//! reference only.

use std::io::Write;

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

use crate::base::{decode_code, encode_symbol, is_resolved, pack_symbols, unpack_symbols};
use crate::error::Result;
use crate::policy::{Discipline, MAX_INSERTION_LEN};

pub const TAG_SNP: u8 = 0x00;
pub const TAG_INSERTION: u8 = 0x01;
pub const TAG_DELETION: u8 = 0x02;

/// Tag plus position
const SIZE_PREFIX: usize = 5;

/// Full size of an SNP record
pub const SIZE_SNP: usize = SIZE_PREFIX + 2;

/// The three record kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariantKind {
    Snp,
    Insertion,
    Deletion,
}
impl VariantKind {
    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            Self::Snp => TAG_SNP,
            Self::Insertion => TAG_INSERTION,
            Self::Deletion => TAG_DELETION,
        }
    }

    #[must_use]
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            TAG_SNP => Some(Self::Snp),
            TAG_INSERTION => Some(Self::Insertion),
            TAG_DELETION => Some(Self::Deletion),
            _ => None,
        }
    }
}

/// A single variant record
///
/// Positions are source coordinates. An SNP at `pos` replaces the symbol at
/// buffer index `pos - 1`; insertions and deletions take effect at buffer
/// index `pos` (the first symbol after the anchor base).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variant {
    Snp {
        pos: u32,
        reference: u8,
        alternate: u8,
    },
    Insertion {
        pos: u32,
        symbols: Vec<u8>,
    },
    Deletion {
        pos: u32,
        length: u16,
    },
}

/// Why a source allele produced no record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Reference and alternate alleles are equal
    Identical,
    /// Neither a substitution nor a prefix-anchored indel
    Complex,
    /// Single-symbol substitution towards a symbol outside `ACGT`
    InvalidSnpSymbol,
    /// Deletion longer than the discipline's length field
    DeletionTooLong,
    /// Insertion payload with a symbol outside `ACGT` under a discipline that rejects it
    UnresolvedInsertion,
    /// Position does not fit the 4-byte position field
    PositionOverflow,
}
impl SkipReason {
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::Identical => "alternate equals reference",
            Self::Complex => "complex or symbolic allele",
            Self::InvalidSnpSymbol => "substitution to a non-ACGT symbol",
            Self::DeletionTooLong => "deletion exceeds length field",
            Self::UnresolvedInsertion => "insertion contains a non-ACGT symbol",
            Self::PositionOverflow => "position exceeds 32 bits",
        }
    }
}

/// A record derived from a source allele
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub variant: Variant,
    /// The insertion payload was cut to [`MAX_INSERTION_LEN`] symbols
    pub truncated: bool,
}

/// Outcome of parsing one record from the front of a buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    /// A complete record and the number of bytes it occupied
    Record(Variant, usize),
    /// The buffer is empty
    Empty,
    /// The first byte is not a record tag
    UnknownTag(u8),
    /// The record is complete but one of its fields cannot be represented
    Invalid(&'static str),
    /// The buffer ends inside the record
    Truncated,
}

fn to_pos(pos: u64) -> std::result::Result<u32, SkipReason> {
    u32::try_from(pos).map_err(|_| SkipReason::PositionOverflow)
}

impl Variant {
    /// Derives a record from one `(pos, ref, alt)` source allele.
    ///
    /// Alleles are compared case-insensitively. Indels must be anchored: the
    /// shorter allele has to be a prefix of the longer one.
    pub fn classify(
        pos: u64,
        reference: &[u8],
        alternate: &[u8],
        discipline: Discipline,
    ) -> std::result::Result<Classification, SkipReason> {
        let reference = reference.to_ascii_uppercase();
        let alternate = alternate.to_ascii_uppercase();

        if reference.is_empty() || alternate.is_empty() {
            return Err(SkipReason::Complex);
        }
        if reference == alternate {
            return Err(SkipReason::Identical);
        }

        if reference.len() == 1 && alternate.len() == 1 {
            if !is_resolved(alternate[0]) {
                return Err(SkipReason::InvalidSnpSymbol);
            }
            return Ok(Classification {
                variant: Self::Snp {
                    pos: to_pos(pos)?,
                    reference: reference[0],
                    alternate: alternate[0],
                },
                truncated: false,
            });
        }

        if alternate.len() < reference.len() && reference.starts_with(&alternate) {
            let length = reference.len() - alternate.len();
            if length > discipline.max_deletion() {
                return Err(SkipReason::DeletionTooLong);
            }
            return Ok(Classification {
                variant: Self::Deletion {
                    pos: to_pos(pos + alternate.len() as u64 - 1)?,
                    length: length as u16,
                },
                truncated: false,
            });
        }

        if reference.len() < alternate.len() && alternate.starts_with(&reference) {
            let payload = &alternate[reference.len()..];
            if !discipline.accepts_unresolved_insertions()
                && !payload.iter().all(|&s| is_resolved(s))
            {
                return Err(SkipReason::UnresolvedInsertion);
            }
            let truncated = payload.len() > MAX_INSERTION_LEN;
            let symbols = payload[..payload.len().min(MAX_INSERTION_LEN)].to_vec();
            return Ok(Classification {
                variant: Self::Insertion {
                    pos: to_pos(pos + reference.len() as u64 - 1)?,
                    symbols,
                },
                truncated,
            });
        }

        Err(SkipReason::Complex)
    }

    #[must_use]
    pub fn pos(&self) -> u32 {
        match self {
            Self::Snp { pos, .. } | Self::Insertion { pos, .. } | Self::Deletion { pos, .. } => {
                *pos
            }
        }
    }

    #[must_use]
    pub fn kind(&self) -> VariantKind {
        match self {
            Self::Snp { .. } => VariantKind::Snp,
            Self::Insertion { .. } => VariantKind::Insertion,
            Self::Deletion { .. } => VariantKind::Deletion,
        }
    }

    /// Buffer index at which the record takes effect.
    ///
    /// `None` for an SNP at position 0, which addresses no symbol.
    #[must_use]
    pub fn edit_index(&self) -> Option<usize> {
        match self {
            Self::Snp { pos, .. } => (*pos as usize).checked_sub(1),
            Self::Insertion { pos, .. } | Self::Deletion { pos, .. } => Some(*pos as usize),
        }
    }

    /// Number of bytes the record occupies on the wire
    #[must_use]
    pub fn encoded_size(&self, discipline: Discipline) -> usize {
        match self {
            Self::Snp { .. } => SIZE_SNP,
            Self::Insertion { symbols, .. } => {
                SIZE_PREFIX
                    + discipline.length_width()
                    + discipline.insertion_payload_size(symbols.len())
            }
            Self::Deletion { .. } => SIZE_PREFIX + discipline.length_width(),
        }
    }

    fn write_length<W: Write>(
        writer: &mut W,
        length: usize,
        discipline: Discipline,
    ) -> Result<()> {
        match discipline {
            Discipline::Compact => writer.write_u16::<BigEndian>(length as u16)?,
            Discipline::Fixed => writer.write_u8(length as u8)?,
        }
        Ok(())
    }

    /// Writes the record under the given discipline
    pub fn write_bytes<W: Write>(&self, writer: &mut W, discipline: Discipline) -> Result<()> {
        writer.write_u8(self.kind().tag())?;
        writer.write_u32::<BigEndian>(self.pos())?;
        match self {
            Self::Snp {
                reference,
                alternate,
                ..
            } => {
                writer.write_u8(encode_symbol(*reference))?;
                writer.write_u8(encode_symbol(*alternate))?;
            }
            Self::Insertion { symbols, .. } => {
                Self::write_length(writer, symbols.len(), discipline)?;
                let size = discipline.insertion_payload_size(symbols.len());
                let mut payload = Vec::with_capacity(size);
                pack_symbols(symbols, &mut payload);
                payload.resize(size, 0);
                writer.write_all(&payload)?;
            }
            Self::Deletion { length, .. } => {
                Self::write_length(writer, *length as usize, discipline)?;
            }
        }
        Ok(())
    }

    /// Parses one record from the front of `buffer`
    #[must_use]
    pub fn parse(buffer: &[u8], discipline: Discipline) -> Parsed {
        let Some(&tag) = buffer.first() else {
            return Parsed::Empty;
        };
        let Some(kind) = VariantKind::from_tag(tag) else {
            return Parsed::UnknownTag(tag);
        };
        if buffer.len() < SIZE_PREFIX {
            return Parsed::Truncated;
        }
        let pos = BigEndian::read_u32(&buffer[1..SIZE_PREFIX]);

        if kind == VariantKind::Snp {
            if buffer.len() < SIZE_SNP {
                return Parsed::Truncated;
            }
            let (rcode, acode) = (buffer[5], buffer[6]);
            if rcode > 0b11 || acode > 0b11 {
                return Parsed::Invalid("nucleotide code out of range");
            }
            let variant = Self::Snp {
                pos,
                reference: decode_code(rcode),
                alternate: decode_code(acode),
            };
            return Parsed::Record(variant, SIZE_SNP);
        }

        let lwidth = discipline.length_width();
        if buffer.len() < SIZE_PREFIX + lwidth {
            return Parsed::Truncated;
        }
        let length = match discipline {
            Discipline::Compact => BigEndian::read_u16(&buffer[SIZE_PREFIX..]) as usize,
            Discipline::Fixed => buffer[SIZE_PREFIX] as usize,
        };
        if length == 0 {
            return Parsed::Invalid("zero-length indel");
        }
        let start = SIZE_PREFIX + lwidth;

        match kind {
            VariantKind::Deletion => Parsed::Record(
                Self::Deletion {
                    pos,
                    length: length as u16,
                },
                start,
            ),
            _ => {
                if discipline == Discipline::Fixed && length > MAX_INSERTION_LEN {
                    return Parsed::Invalid("insertion exceeds fixed payload");
                }
                let psize = discipline.insertion_payload_size(length);
                if buffer.len() < start + psize {
                    return Parsed::Truncated;
                }
                let mut symbols = Vec::with_capacity(length);
                unpack_symbols(&buffer[start..start + psize], length, &mut symbols);
                Parsed::Record(Self::Insertion { pos, symbols }, start + psize)
            }
        }
    }
}

#[cfg(test)]
mod testing {
    use super::*;

    fn classify(
        pos: u64,
        r: &str,
        a: &str,
        d: Discipline,
    ) -> std::result::Result<Variant, SkipReason> {
        Variant::classify(pos, r.as_bytes(), a.as_bytes(), d).map(|c| c.variant)
    }

    fn encode(variant: &Variant, d: Discipline) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        variant.write_bytes(&mut buf, d)?;
        assert_eq!(buf.len(), variant.encoded_size(d));
        Ok(buf)
    }

    #[test]
    fn test_snp_bytes() -> Result<()> {
        let v = classify(258, "a", "G", Discipline::Compact).unwrap();
        assert_eq!(
            v,
            Variant::Snp {
                pos: 258,
                reference: b'A',
                alternate: b'G'
            }
        );
        let bytes = encode(&v, Discipline::Compact)?;
        assert_eq!(bytes, vec![0x00, 0, 0, 1, 2, 0b00, 0b10]);
        assert_eq!(bytes, encode(&v, Discipline::Fixed)?);
        Ok(())
    }

    #[test]
    fn test_deletion_bytes() -> Result<()> {
        let v = classify(100, "ACGT", "A", Discipline::Compact).unwrap();
        assert_eq!(v, Variant::Deletion { pos: 100, length: 3 });
        assert_eq!(encode(&v, Discipline::Compact)?, vec![0x02, 0, 0, 0, 100, 0, 3]);
        assert_eq!(encode(&v, Discipline::Fixed)?, vec![0x02, 0, 0, 0, 100, 3]);
        Ok(())
    }

    #[test]
    fn test_insertion_bytes() -> Result<()> {
        let v = classify(7, "T", "TACGTC", Discipline::Compact).unwrap();
        assert_eq!(
            v,
            Variant::Insertion {
                pos: 7,
                symbols: b"ACGTC".to_vec()
            }
        );
        assert_eq!(
            encode(&v, Discipline::Compact)?,
            vec![0x01, 0, 0, 0, 7, 0, 5, 0x1B, 0b0100_0000]
        );
        let fixed = encode(&v, Discipline::Fixed)?;
        assert_eq!(fixed.len(), 1 + 4 + 1 + 16);
        assert_eq!(&fixed[5..8], &[5, 0x1B, 0b0100_0000]);
        assert!(fixed[8..].iter().all(|&b| b == 0));
        Ok(())
    }

    #[test]
    fn test_longer_anchor_shifts_position() {
        let del = classify(10, "ACGT", "AC", Discipline::Compact).unwrap();
        assert_eq!(del, Variant::Deletion { pos: 11, length: 2 });
        let ins = classify(10, "AC", "ACTT", Discipline::Compact).unwrap();
        assert_eq!(
            ins,
            Variant::Insertion {
                pos: 11,
                symbols: b"TT".to_vec()
            }
        );
    }

    #[test]
    fn test_insertion_length_cap() {
        let anchor = "A";
        let exact = format!("{anchor}{}", "C".repeat(64));
        let over = format!("{anchor}{}", "G".repeat(65));

        let c = Variant::classify(1, anchor.as_bytes(), exact.as_bytes(), Discipline::Fixed)
            .unwrap();
        assert!(!c.truncated);
        assert!(matches!(c.variant, Variant::Insertion { ref symbols, .. } if symbols.len() == 64));

        let c = Variant::classify(1, anchor.as_bytes(), over.as_bytes(), Discipline::Fixed)
            .unwrap();
        assert!(c.truncated);
        assert!(matches!(c.variant, Variant::Insertion { ref symbols, .. } if symbols.len() == 64));
    }

    #[test]
    fn test_skip_reasons() {
        let d = Discipline::Fixed;
        assert_eq!(classify(1, "A", "A", d), Err(SkipReason::Identical));
        assert_eq!(classify(1, "AC", "GT", d), Err(SkipReason::Complex));
        assert_eq!(classify(1, "A", "<DEL>", d), Err(SkipReason::Complex));
        assert_eq!(classify(1, "A", "*", d), Err(SkipReason::InvalidSnpSymbol));
        assert_eq!(classify(1, "A", "ANC", d), Err(SkipReason::UnresolvedInsertion));
        assert_eq!(
            classify(u64::from(u32::MAX) + 1, "A", "C", d),
            Err(SkipReason::PositionOverflow)
        );
        let long = format!("A{}", "T".repeat(256));
        assert_eq!(classify(1, &long, "A", d), Err(SkipReason::DeletionTooLong));
        assert!(classify(1, &long, "A", Discipline::Compact).is_ok());
    }

    #[test]
    fn test_unresolved_insertion_compact() -> Result<()> {
        let v = classify(3, "A", "ANC", Discipline::Compact).unwrap();
        let bytes = encode(&v, Discipline::Compact)?;
        let Parsed::Record(decoded, size) = Variant::parse(&bytes, Discipline::Compact) else {
            panic!("expected a record");
        };
        assert_eq!(size, bytes.len());
        assert_eq!(
            decoded,
            Variant::Insertion {
                pos: 3,
                symbols: b"AC".to_vec()
            }
        );
        Ok(())
    }

    #[test]
    fn test_parse_each_discipline() -> Result<()> {
        let variants = vec![
            Variant::Snp {
                pos: 9,
                reference: b'C',
                alternate: b'T',
            },
            Variant::Insertion {
                pos: 70_000,
                symbols: b"GATTACA".to_vec(),
            },
            Variant::Deletion { pos: 12, length: 200 },
        ];
        for d in [Discipline::Compact, Discipline::Fixed] {
            for v in &variants {
                let bytes = encode(v, d)?;
                assert_eq!(Variant::parse(&bytes, d), Parsed::Record(v.clone(), bytes.len()));
            }
        }
        Ok(())
    }

    #[test]
    fn test_parse_terminals() -> Result<()> {
        assert_eq!(Variant::parse(&[], Discipline::Compact), Parsed::Empty);
        assert_eq!(Variant::parse(b"META", Discipline::Compact), Parsed::UnknownTag(b'M'));

        let v = Variant::Insertion {
            pos: 1,
            symbols: b"ACGTACGT".to_vec(),
        };
        let bytes = encode(&v, Discipline::Compact)?;
        for cut in 1..bytes.len() {
            assert_eq!(Variant::parse(&bytes[..cut], Discipline::Compact), Parsed::Truncated);
        }

        let bad_code = [0x00, 0, 0, 0, 1, 0, 9];
        assert!(matches!(
            Variant::parse(&bad_code, Discipline::Compact),
            Parsed::Invalid(_)
        ));
        let zero_len = [0x02, 0, 0, 0, 1, 0];
        assert!(matches!(
            Variant::parse(&zero_len, Discipline::Fixed),
            Parsed::Invalid(_)
        ));
        Ok(())
    }

    #[test]
    fn test_edit_index() {
        let snp = Variant::Snp {
            pos: 2,
            reference: b'C',
            alternate: b'G',
        };
        assert_eq!(snp.edit_index(), Some(1));
        let snp0 = Variant::Snp {
            pos: 0,
            reference: b'C',
            alternate: b'G',
        };
        assert_eq!(snp0.edit_index(), None);
        assert_eq!(Variant::Deletion { pos: 4, length: 1 }.edit_index(), Some(4));
    }
}
