//! Container writer module
//!
//! This module turns upstream variant rows into records and assembles the
//! final container. It includes:
//! - Allele enumeration and record classification ([`Encoder`])
//! - Buffering of composite `{variant, metadata}` entries
//! - A single ordered write of all blocks on [`ContainerWriter::finish`]

use std::collections::HashMap;
use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};
use tracing::{debug, info, warn};

use crate::base::is_resolved;
use crate::error::{Result, WriteError};
use crate::feed::SourceVariant;
use crate::header::BinvarHeader;
use crate::policy::{AlleleSelection, Discipline};
use crate::record::{Entry, SkipReason, Variant, VariantKind};
use crate::reference::PackedReference;
use crate::utils::MARKER;

/// Counters collected while encoding the variant feed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodeStats {
    /// Source rows seen
    pub rows: usize,
    /// Alleles enumerated across all rows
    pub alleles: usize,
    /// Records emitted, by kind
    pub snps: usize,
    pub insertions: usize,
    pub deletions: usize,
    /// Insertions cut to the maximum payload length
    pub truncated_insertions: usize,
    /// Alleles that produced no record, by reason
    pub skipped: HashMap<SkipReason, usize>,
}
impl EncodeStats {
    /// Total number of records emitted
    #[must_use]
    pub fn records(&self) -> usize {
        self.snps + self.insertions + self.deletions
    }

    /// Total number of alleles skipped
    #[must_use]
    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    fn count(&mut self, kind: VariantKind) {
        match kind {
            VariantKind::Snp => self.snps += 1,
            VariantKind::Insertion => self.insertions += 1,
            VariantKind::Deletion => self.deletions += 1,
        }
    }
}

/// Converts source rows into composite entries
///
/// One entry is produced per enumerated alternate allele that classifies as
/// an SNP, insertion or deletion. Each entry's metadata is taken from the same
/// row, so skipped alleles never leave metadata behind.
#[derive(Debug, Clone, Default)]
pub struct Encoder {
    discipline: Discipline,
    alleles: AlleleSelection,
    stats: EncodeStats,
}
impl Encoder {
    #[must_use]
    pub fn new(discipline: Discipline, alleles: AlleleSelection) -> Self {
        Self {
            discipline,
            alleles,
            stats: EncodeStats::default(),
        }
    }

    #[must_use]
    pub fn discipline(&self) -> Discipline {
        self.discipline
    }

    #[must_use]
    pub fn stats(&self) -> &EncodeStats {
        &self.stats
    }

    /// Encodes one source row, appending its entries to `out`.
    ///
    /// Returns the number of entries appended.
    pub fn encode(&mut self, source: &SourceVariant, out: &mut Vec<Entry>) -> usize {
        self.stats.rows += 1;
        let before = out.len();
        for allele in self
            .alleles
            .select(source.alternates.len(), source.genotype())
        {
            self.stats.alleles += 1;
            let alternate = &source.alternates[allele - 1];
            match Variant::classify(source.pos, &source.reference, alternate, self.discipline) {
                Ok(classified) => {
                    if classified.truncated {
                        self.stats.truncated_insertions += 1;
                        warn!(
                            "Truncated insertion at {} from {} symbols",
                            source.pos,
                            alternate.len() - source.reference.len()
                        );
                    }
                    if let Variant::Insertion { symbols, .. } = &classified.variant {
                        if !symbols.iter().all(|&s| is_resolved(s)) {
                            warn!("Insertion at {} has non-ACGT symbols, packed as A", source.pos);
                        }
                    }
                    self.stats.count(classified.variant.kind());
                    out.push(Entry::new(classified.variant, source.metadata_for(allele)));
                }
                Err(reason) => {
                    *self.stats.skipped.entry(reason).or_default() += 1;
                    if reason == SkipReason::UnresolvedInsertion {
                        warn!("Dropping insertion at {}: {}", source.pos, reason.describe());
                    } else {
                        debug!(
                            "Skipping allele {} at {}: {}",
                            allele,
                            source.pos,
                            reason.describe()
                        );
                    }
                }
            }
        }
        out.len() - before
    }
}

/// Builder for creating configured [`ContainerWriter`] instances
///
/// # Examples
///
/// ```
/// # use binvar::{ContainerWriterBuilder, Discipline, Result};
/// # fn main() -> Result<()> {
/// let mut writer = ContainerWriterBuilder::default()
///     .discipline(Discipline::Fixed)
///     .build(Vec::new());
/// writer.set_reference(b"ACGTN")?;
/// let bytes = writer.finish()?;
/// assert!(!bytes.is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ContainerWriterBuilder {
    discipline: Option<Discipline>,
    alleles: Option<AlleleSelection>,
    headless: Option<bool>,
}
impl ContainerWriterBuilder {
    #[must_use]
    pub fn discipline(mut self, discipline: Discipline) -> Self {
        self.discipline = Some(discipline);
        self
    }

    #[must_use]
    pub fn alleles(mut self, alleles: AlleleSelection) -> Self {
        self.alleles = Some(alleles);
        self
    }

    /// Omit the leading header and write the bare block layout
    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = Some(headless);
        self
    }

    pub fn build<W: Write>(self, inner: W) -> ContainerWriter<W> {
        ContainerWriter::new(
            inner,
            self.discipline.unwrap_or_default(),
            self.alleles.unwrap_or_default(),
            self.headless.unwrap_or(false),
        )
    }
}

/// Assembles a container from a reference sequence and a variant feed
///
/// Nothing reaches the underlying writer until [`ContainerWriter::finish`],
/// which writes every block in order.
///
/// # Type Parameters
///
/// * `W` - The underlying writer type that implements `Write`
pub struct ContainerWriter<W: Write> {
    /// The underlying writer for output
    inner: W,

    /// Encoder for converting source rows to entries
    encoder: Encoder,

    /// Packed reference and mask blocks
    reference: Option<PackedReference>,

    /// Entries with the source position they are ordered by
    pending: Vec<(u64, Entry)>,

    /// Reusable buffer for the entries of one source row
    ebuf: Vec<Entry>,

    /// Whether the header is omitted
    headless: bool,
}
impl<W: Write> ContainerWriter<W> {
    /// Creates a new writer. For a more convenient way to create one, use
    /// [`ContainerWriterBuilder`].
    pub fn new(inner: W, discipline: Discipline, alleles: AlleleSelection, headless: bool) -> Self {
        Self {
            inner,
            encoder: Encoder::new(discipline, alleles),
            reference: None,
            pending: Vec::new(),
            ebuf: Vec::new(),
            headless,
        }
    }

    /// Packs and stores the reference sequence
    pub fn set_reference(&mut self, sequence: &[u8]) -> Result<()> {
        if let Some(reference) = &self.reference {
            return Err(WriteError::ReferenceAlreadySet(reference.len()).into());
        }
        let packed = PackedReference::pack(sequence);
        debug!(
            "Packed reference of {} symbols ({} unresolved)",
            packed.len(),
            packed.num_unresolved()
        );
        self.reference = Some(packed);
        Ok(())
    }

    /// Encodes one source row and buffers its entries.
    ///
    /// Returns the number of records the row produced.
    pub fn push_source(&mut self, source: &SourceVariant) -> usize {
        self.ebuf.clear();
        let n = self.encoder.encode(source, &mut self.ebuf);
        self.pending
            .extend(self.ebuf.drain(..).map(|entry| (source.pos, entry)));
        n
    }

    /// Buffers an already classified entry.
    ///
    /// `source_pos` is the feed position the entry came from; it is the sort
    /// key shared with [`push_source`](Self::push_source), so an indel is
    /// ordered by its anchor and not by its record position.
    pub fn push_entry(&mut self, source_pos: u64, entry: Entry) {
        self.encoder.stats.count(entry.variant.kind());
        self.pending.push((source_pos, entry));
    }

    /// Number of entries buffered so far
    #[must_use]
    pub fn num_entries(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn stats(&self) -> &EncodeStats {
        self.encoder.stats()
    }

    #[must_use]
    pub fn is_headless(&self) -> bool {
        self.headless
    }

    /// Writes the container and returns the underlying writer
    ///
    /// Entries are stable-sorted by source position, so rows sharing a
    /// position keep their feed order.
    ///
    /// # Errors
    ///
    /// Returns an error if no reference was set, the metadata block overflows
    /// its length field, or writing fails.
    pub fn finish(mut self) -> Result<W> {
        let Some(reference) = self.reference.take() else {
            return Err(WriteError::MissingReference.into());
        };
        let discipline = self.encoder.discipline();

        self.pending.sort_by_key(|(pos, _)| *pos);
        let mut vblock = Vec::new();
        let mut mblock = Vec::new();
        for (_, entry) in &self.pending {
            entry.write_parts(&mut vblock, &mut mblock, discipline)?;
        }
        let mlen = u32::try_from(mblock.len())
            .map_err(|_| WriteError::MetadataOverflow(mblock.len()))?;
        let nrec = u32::try_from(self.pending.len())
            .map_err(|_| WriteError::MetadataOverflow(mblock.len()))?;

        if !self.headless {
            BinvarHeader::new(
                discipline,
                reference.len() as u64,
                vblock.len() as u64,
                nrec,
            )
            .write_bytes(&mut self.inner)?;
        }
        self.inner.write_all(reference.bases())?;
        self.inner.write_all(reference.mask())?;
        self.inner.write_all(&vblock)?;
        self.inner.write_all(MARKER)?;
        self.inner.write_u32::<BigEndian>(mlen)?;
        self.inner.write_all(&mblock)?;
        self.inner.flush()?;

        let stats = self.encoder.stats();
        info!(
            "Wrote {} records ({} SNPs, {} insertions, {} deletions), skipped {} alleles",
            nrec,
            stats.snps,
            stats.insertions,
            stats.deletions,
            stats.skipped_total()
        );
        Ok(self.inner)
    }
}
