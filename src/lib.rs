//! # binvar
//!
//! A compact binary container for a reference genome together with one
//! individual's variant calls.
//!
//! The reference is stored 2 bits per symbol with a 1-bit mask marking
//! positions outside `ACGT`. Variants (SNPs, insertions, deletions) are
//! stored as tagged binary records, each paired with a 3-byte metadata
//! record holding allele frequency, read depth and genotype class.
//!
//! ```
//! use binvar::{ContainerReader, ContainerWriterBuilder, Restorer, SourceVariant};
//!
//! # fn main() -> binvar::Result<()> {
//! let mut writer = ContainerWriterBuilder::default().build(Vec::new());
//! writer.set_reference(b"ACGTN")?;
//! writer.push_source(&SourceVariant::new(2, b"C", &[b"G"]));
//! let bytes = writer.finish()?;
//!
//! let container = ContainerReader::new(bytes)?.decode()?;
//! let (sequence, _report) = container.restore(&Restorer::new());
//! assert_eq!(sequence, b"AGGTN");
//! # Ok(())
//! # }
//! ```

mod base;
mod error;
mod feed;
mod header;
mod policy;
mod reader;
mod record;
mod reference;
mod restore;
mod utils;
mod writer;

pub use base::{
    decode_code, encode_symbol, is_resolved, pack_symbols, unpack_symbols, UNRESOLVED,
};
pub use error::{Error, FeedError, HeaderError, ReadError, Result, WriteError};
pub use feed::{
    load_reference, read_reference, write_fasta, ReferenceSequence, SourceVariant, VcfReader,
    LINE_WIDTH,
};
pub use header::{BinvarHeader, SIZE_HEADER};
pub use policy::{AlleleSelection, Discipline, FIXED_PAYLOAD_SIZE, MAX_INSERTION_LEN};
pub use reader::{Container, ContainerReader, ContainerSummary, DecodeStatus, VariantParser};
pub use record::{
    Classification, Entry, Genotype, Metadata, Parsed, SkipReason, Variant, VariantKind,
    SIZE_METADATA, SIZE_SNP, TAG_DELETION, TAG_INSERTION, TAG_SNP,
};
pub use reference::PackedReference;
pub use restore::{RestoreReport, Restorer};
pub use utils::{expected_container_size, MARKER};
pub use writer::{ContainerWriter, ContainerWriterBuilder, EncodeStats, Encoder};

#[cfg(test)]
mod testing {

    use super::*;
    use rand::{rngs::SmallRng, Rng, SeedableRng};
    use std::io::{Cursor, Write};

    const VCF: &str = "##fileformat=VCFv4.2\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tSAMPLE\n\
1\t2\t.\tC\tG\t.\tPASS\tAF=0.5;DP=31\tGT\t0|1\n\
1\t5\t.\tA\tAGGT\t.\tPASS\tAF=0.25;DP=9\tGT\t1|1\n\
1\t9\t.\tACGT\tA\t.\tPASS\tAF=0.75;DP=400\tGT\t1/1\n\
1\t15\t.\tA\tA\t.\tPASS\t.\tGT\t0/1\n\
1\t16\t.\tT\tC,G\t.\tPASS\tAF=0.1,0.9;DP=12\tGT\t1/2\n\
1\t17\t.\tCG\tTT\t.\tPASS\t.\tGT\t1/1\n";

    const REFERENCE: &[u8] = b"ACGTACGTACGTACGTNNACGT";

    fn encode(discipline: Discipline, headless: bool) -> Result<Vec<u8>> {
        let mut writer = ContainerWriterBuilder::default()
            .discipline(discipline)
            .headless(headless)
            .build(Vec::new());
        writer.set_reference(REFERENCE)?;
        for row in VcfReader::new(Cursor::new(VCF)) {
            writer.push_source(&row?);
        }
        writer.finish()
    }

    fn random_sequence(rng: &mut SmallRng, len: usize) -> Vec<u8> {
        (0..len)
            .map(|_| b"ACGTN"[rng.random_range(0..5)])
            .collect()
    }

    #[test]
    fn test_reference_only_roundtrip() -> Result<()> {
        let mut rng = SmallRng::seed_from_u64(7);
        for len in [0, 1, 3, 4, 5, 8, 9, 1_000] {
            let sequence = random_sequence(&mut rng, len);
            let mut writer = ContainerWriterBuilder::default().build(Vec::new());
            writer.set_reference(&sequence)?;
            let bytes = writer.finish()?;
            assert_eq!(bytes.len(), expected_container_size(len, 0, 0, false));

            let container = ContainerReader::new(bytes)?.decode()?;
            assert!(container.variants.is_empty());
            let (restored, report) = container.restore(&Restorer::new());
            assert_eq!(restored, sequence);
            assert_eq!(report, RestoreReport::default());
        }
        Ok(())
    }

    #[test]
    fn test_mask_fidelity() -> Result<()> {
        let sequence = b"NACNGTRYN";
        let mut writer = ContainerWriterBuilder::default().build(Vec::new());
        writer.set_reference(sequence)?;
        let container = ContainerReader::new(writer.finish()?)?.decode()?;
        assert_eq!(container.sequence(), b"NACNGTNNN");
        assert_eq!(container.summary().unresolved, 5);
        Ok(())
    }

    #[test]
    fn test_encode_decode_restore() -> Result<()> {
        for discipline in [Discipline::Compact, Discipline::Fixed] {
            let bytes = encode(discipline, false)?;
            let container = ContainerReader::new(bytes)?.decode()?;
            assert_eq!(container.discipline, discipline);
            assert_eq!(container.status, DecodeStatus::Done);

            let summary = container.summary();
            assert_eq!(summary.snps, 3);
            assert_eq!(summary.insertions, 1);
            assert_eq!(summary.deletions, 1);
            assert_eq!(summary.metadata_records, 5);

            let (restored, report) = container.restore(&Restorer::new().verify_reference(true));
            assert_eq!(report.applied, 5);
            // both alleles at 16 edit the same symbol; the first listed is applied last
            assert_eq!(report.ref_mismatches, 1);
            assert_eq!(restored, b"AGGTAGGTCGTAACGCNNACGT");
        }
        Ok(())
    }

    #[test]
    fn test_metadata_pairing() -> Result<()> {
        let container = ContainerReader::new(encode(Discipline::Compact, false)?)?.decode()?;
        let entries: Vec<(u32, u8, u8)> = container
            .entries()
            .map(|(v, m)| {
                let m = m.copied().unwrap_or_default();
                (v.pos(), m.allele_frequency, m.depth)
            })
            .collect();
        assert_eq!(
            entries,
            vec![(2, 128, 31), (5, 64, 9), (9, 191, 255), (16, 26, 12), (16, 230, 12)]
        );
        Ok(())
    }

    #[test]
    fn test_idempotent_encode() -> Result<()> {
        assert_eq!(encode(Discipline::Compact, false)?, encode(Discipline::Compact, false)?);
        assert_eq!(encode(Discipline::Fixed, true)?, encode(Discipline::Fixed, true)?);
        Ok(())
    }

    #[test]
    fn test_headless_roundtrip() -> Result<()> {
        let headed = ContainerReader::new(encode(Discipline::Fixed, false)?)?.decode()?;
        let bytes = encode(Discipline::Fixed, true)?;
        let headless =
            ContainerReader::headless(bytes, REFERENCE.len(), Discipline::Fixed).decode()?;
        assert_eq!(headless.variants, headed.variants);
        assert_eq!(headless.metadata, headed.metadata);
        Ok(())
    }

    #[test]
    fn test_truncated_variant_block() -> Result<()> {
        // cut the headless container inside the last variant record, keep a valid trailer
        let bytes = encode(Discipline::Compact, true)?;
        let vstart = PackedReference::pack(REFERENCE).byte_size();
        let trailer = bytes.len() - SIZE_METADATA * 5 - 8;
        let mut cut = bytes[..trailer - 3].to_vec();
        cut.extend_from_slice(&bytes[trailer..]);
        assert!(trailer - 3 > vstart);

        let container =
            ContainerReader::headless(cut, REFERENCE.len(), Discipline::Compact).decode()?;
        assert_eq!(container.status, DecodeStatus::Truncated);
        assert_eq!(container.variants.len(), 4);
        assert_eq!(container.metadata.len(), 5);
        Ok(())
    }

    #[test]
    fn test_missing_trailer_is_error() -> Result<()> {
        let bytes = encode(Discipline::Compact, false)?;
        let cut = &bytes[..bytes.len() - SIZE_METADATA * 5 - 5];
        assert!(matches!(
            ContainerReader::new(cut)?.decode(),
            Err(Error::ReadError(ReadError::MissingTrailer(_)))
        ));
        Ok(())
    }

    #[test]
    fn test_mmap_reader() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(&encode(Discipline::Compact, false)?)?;
        file.flush()?;

        let reader = ContainerReader::from_path(file.path())?;
        assert_eq!(reader.ref_len(), REFERENCE.len());
        let container = reader.decode()?;
        assert_eq!(container.variants.len(), 5);
        assert_eq!(container.sequence(), REFERENCE);
        Ok(())
    }

    #[test]
    fn test_mmap_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ContainerReader::from_path(dir.path()).is_err());
    }
}
