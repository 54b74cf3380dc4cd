//! Container reader module
//!
//! Decodes a container back into its packed reference, variant records and
//! metadata records. Decoding is lenient about the variant block: parsing
//! stops at the first record that cannot be read and keeps everything
//! decoded up to that point (see [`DecodeStatus`]). A missing `META`
//! trailer is a hard error.

use std::fmt;
use std::fs::File;
use std::path::Path;

use byteorder::{BigEndian, ByteOrder};
use memchr::memmem;
use memmap2::Mmap;
use tracing::{debug, warn};

use crate::error::{ReadError, Result};
use crate::header::{BinvarHeader, SIZE_HEADER};
use crate::policy::Discipline;
use crate::record::{Genotype, Metadata, Parsed, Variant, VariantKind, SIZE_METADATA};
use crate::reference::PackedReference;
use crate::restore::{RestoreReport, Restorer};
use crate::utils::{MARKER, SIZE_TRAILER};

/// How parsing of the variant block ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStatus {
    /// The block was exhausted, or parsing stopped at an unreadable record
    Done,
    /// The block ended inside a record
    Truncated,
}
impl fmt::Display for DecodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done => write!(f, "done"),
            Self::Truncated => write!(f, "truncated"),
        }
    }
}

/// Iterates the records of a variant block
///
/// The parser is scanning until it yields `None`; [`VariantParser::status`]
/// then reports how the block ended.
pub struct VariantParser<'a> {
    block: &'a [u8],
    offset: usize,
    discipline: Discipline,
    status: Option<DecodeStatus>,
}
impl<'a> VariantParser<'a> {
    #[must_use]
    pub fn new(block: &'a [u8], discipline: Discipline) -> Self {
        Self {
            block,
            offset: 0,
            discipline,
            status: None,
        }
    }

    /// Terminal state, or `None` while still scanning
    #[must_use]
    pub fn status(&self) -> Option<DecodeStatus> {
        self.status
    }

    /// Number of bytes consumed by complete records
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}
impl Iterator for VariantParser<'_> {
    type Item = Variant;

    fn next(&mut self) -> Option<Self::Item> {
        if self.status.is_some() {
            return None;
        }
        match Variant::parse(&self.block[self.offset..], self.discipline) {
            Parsed::Record(variant, size) => {
                self.offset += size;
                return Some(variant);
            }
            Parsed::Empty => {
                self.status = Some(DecodeStatus::Done);
            }
            Parsed::UnknownTag(tag) => {
                warn!(
                    "Unknown record tag {:#04x} at byte {}, ending variant block",
                    tag, self.offset
                );
                self.status = Some(DecodeStatus::Done);
            }
            Parsed::Invalid(reason) => {
                warn!(
                    "Invalid record at byte {} ({}), ending variant block",
                    self.offset, reason
                );
                self.status = Some(DecodeStatus::Done);
            }
            Parsed::Truncated => {
                warn!(
                    "Variant record truncated at byte {} of {}",
                    self.offset,
                    self.block.len()
                );
                self.status = Some(DecodeStatus::Truncated);
            }
        }
        None
    }
}

/// How the reader learns the reference length and discipline
#[derive(Debug, Clone, Copy)]
enum Layout {
    Headed(BinvarHeader),
    Headless {
        ref_len: usize,
        discipline: Discipline,
    },
}

/// Finds the trailer of a headless container by marker search from the end.
///
/// Prefers the last marker whose declared length reaches exactly the end of
/// input, then the last marker with a complete length field.
fn locate_trailer(bytes: &[u8], from: usize) -> Result<(usize, usize)> {
    let mut fallback = None;
    for i in memmem::rfind_iter(&bytes[from..], MARKER) {
        let at = from + i;
        if at + SIZE_TRAILER > bytes.len() {
            continue;
        }
        let mlen = BigEndian::read_u32(&bytes[at + 4..at + SIZE_TRAILER]) as usize;
        if at + SIZE_TRAILER + mlen == bytes.len() {
            return Ok((at, mlen));
        }
        fallback.get_or_insert((at, mlen));
    }
    fallback.ok_or_else(|| ReadError::MissingTrailer(from).into())
}

/// Decoder over the bytes of a container
///
/// # Type Parameters
///
/// * `B` - Any byte source: a `Vec<u8>`, a slice or a memory map
pub struct ContainerReader<B: AsRef<[u8]>> {
    data: B,
    layout: Layout,
}
impl<B: AsRef<[u8]>> ContainerReader<B> {
    /// Opens a container that starts with a header
    pub fn new(data: B) -> Result<Self> {
        let header = BinvarHeader::from_buffer(data.as_ref())?;
        Ok(Self {
            data,
            layout: Layout::Headed(header),
        })
    }

    /// Opens a container without a header
    ///
    /// The reference length and discipline must be supplied out of band.
    pub fn headless(data: B, ref_len: usize, discipline: Discipline) -> Self {
        Self {
            data,
            layout: Layout::Headless {
                ref_len,
                discipline,
            },
        }
    }

    /// The header, if the container has one
    #[must_use]
    pub fn header(&self) -> Option<&BinvarHeader> {
        match &self.layout {
            Layout::Headed(header) => Some(header),
            Layout::Headless { .. } => None,
        }
    }

    #[must_use]
    pub fn discipline(&self) -> Discipline {
        match self.layout {
            Layout::Headed(header) => header.discipline,
            Layout::Headless { discipline, .. } => discipline,
        }
    }

    /// Number of reference symbols declared for this container
    #[must_use]
    pub fn ref_len(&self) -> usize {
        match self.layout {
            Layout::Headed(header) => usize::try_from(header.ref_len).unwrap_or(usize::MAX),
            Layout::Headless { ref_len, .. } => ref_len,
        }
    }

    /// Total size of the underlying bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.as_ref().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.as_ref().is_empty()
    }

    /// Decodes the full container
    pub fn decode(&self) -> Result<Container> {
        let bytes = self.data.as_ref();
        let discipline = self.discipline();
        let start = match self.layout {
            Layout::Headed(_) => SIZE_HEADER,
            Layout::Headless { .. } => 0,
        };

        let reference = PackedReference::from_buffer(&bytes[start..], self.ref_len())?;
        let vstart = start + reference.byte_size();

        let (vend, mlen) = match self.layout {
            Layout::Headed(header) => {
                let vend = vstart.saturating_add(header.vlen as usize);
                if vend.saturating_add(SIZE_TRAILER) > bytes.len()
                    || &bytes[vend..vend + MARKER.len()] != MARKER
                {
                    return Err(ReadError::MissingTrailer(vend).into());
                }
                let mlen = BigEndian::read_u32(&bytes[vend + 4..vend + SIZE_TRAILER]) as usize;
                (vend, mlen)
            }
            Layout::Headless { .. } => locate_trailer(bytes, vstart)?,
        };
        debug!(
            "Variant block spans bytes {}..{}, metadata declares {} bytes",
            vstart, vend, mlen
        );

        let mut parser = VariantParser::new(&bytes[vstart..vend], discipline);
        let variants: Vec<Variant> = parser.by_ref().collect();
        let status = parser.status().unwrap_or(DecodeStatus::Done);

        if let Layout::Headed(header) = self.layout {
            if variants.len() != header.nrec as usize {
                warn!(
                    "Header declares {} records, decoded {}",
                    header.nrec,
                    variants.len()
                );
            }
        }

        let mstart = vend + SIZE_TRAILER;
        let available = bytes.len() - mstart;
        let mblock = &bytes[mstart..mstart + mlen.min(available)];
        let metadata = Metadata::parse_block(mblock);
        let metadata_truncated = available < mlen || mlen % SIZE_METADATA != 0;
        if metadata_truncated {
            warn!(
                "Metadata block truncated: declared {} bytes, {} available",
                mlen, available
            );
        }
        if metadata.len() != variants.len() {
            warn!(
                "Decoded {} variant records but {} metadata records",
                variants.len(),
                metadata.len()
            );
        }

        Ok(Container {
            discipline,
            reference,
            variants,
            metadata,
            status,
            metadata_truncated,
        })
    }
}
impl ContainerReader<Mmap> {
    /// Memory-maps a container file that starts with a header
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(map_file(path)?)
    }

    /// Memory-maps a container file without a header
    pub fn from_path_headless<P: AsRef<Path>>(
        path: P,
        ref_len: usize,
        discipline: Discipline,
    ) -> Result<Self> {
        Ok(Self::headless(map_file(path)?, ref_len, discipline))
    }
}

fn map_file<P: AsRef<Path>>(path: P) -> Result<Mmap> {
    // Verify input file is a file before attempting to map
    let file = File::open(path)?;
    if !file.metadata()?.is_file() {
        return Err(ReadError::IncompatibleFile.into());
    }

    // Safety: the file is open and won't be modified while mapped
    let mmap = unsafe { Mmap::map(&file)? };
    Ok(mmap)
}

/// A decoded container
#[derive(Debug, Clone)]
pub struct Container {
    pub discipline: Discipline,
    pub reference: PackedReference,
    pub variants: Vec<Variant>,
    /// Metadata records, paired with `variants` by index
    pub metadata: Vec<Metadata>,
    pub status: DecodeStatus,
    /// The metadata block is shorter than declared or ends in a partial record
    pub metadata_truncated: bool,
}
impl Container {
    /// Pairs each variant record with its metadata record, if present
    pub fn entries(&self) -> impl Iterator<Item = (&Variant, Option<&Metadata>)> {
        self.variants
            .iter()
            .enumerate()
            .map(|(i, v)| (v, self.metadata.get(i)))
    }

    /// The unpacked reference, with unresolved positions restored as `N`
    #[must_use]
    pub fn sequence(&self) -> Vec<u8> {
        self.reference.unpack()
    }

    /// Applies the variant records to the reference
    #[must_use]
    pub fn restore(&self, restorer: &Restorer) -> (Vec<u8>, RestoreReport) {
        restorer.restore(self.sequence(), &self.variants)
    }

    #[must_use]
    pub fn summary(&self) -> ContainerSummary {
        let mut summary = ContainerSummary {
            discipline: self.discipline,
            ref_len: self.reference.len(),
            unresolved: self.reference.num_unresolved(),
            snps: 0,
            insertions: 0,
            deletions: 0,
            metadata_records: self.metadata.len(),
            hom_ref: 0,
            het: 0,
            hom_alt: 0,
            unknown: 0,
            status: self.status,
            metadata_truncated: self.metadata_truncated,
        };
        for variant in &self.variants {
            match variant.kind() {
                VariantKind::Snp => summary.snps += 1,
                VariantKind::Insertion => summary.insertions += 1,
                VariantKind::Deletion => summary.deletions += 1,
            }
        }
        for meta in &self.metadata {
            match meta.genotype {
                Genotype::HomRef => summary.hom_ref += 1,
                Genotype::Het => summary.het += 1,
                Genotype::HomAlt => summary.hom_alt += 1,
                Genotype::Unknown => summary.unknown += 1,
            }
        }
        summary
    }
}

/// Counts describing a decoded container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerSummary {
    pub discipline: Discipline,
    pub ref_len: usize,
    pub unresolved: usize,
    pub snps: usize,
    pub insertions: usize,
    pub deletions: usize,
    pub metadata_records: usize,
    pub hom_ref: usize,
    pub het: usize,
    pub hom_alt: usize,
    pub unknown: usize,
    pub status: DecodeStatus,
    pub metadata_truncated: bool,
}
impl ContainerSummary {
    #[must_use]
    pub fn records(&self) -> usize {
        self.snps + self.insertions + self.deletions
    }
}
impl fmt::Display for ContainerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "discipline\t{:?}", self.discipline)?;
        writeln!(f, "reference_length\t{}", self.ref_len)?;
        writeln!(f, "unresolved\t{}", self.unresolved)?;
        writeln!(f, "records\t{}", self.records())?;
        writeln!(f, "snps\t{}", self.snps)?;
        writeln!(f, "insertions\t{}", self.insertions)?;
        writeln!(f, "deletions\t{}", self.deletions)?;
        writeln!(f, "metadata_records\t{}", self.metadata_records)?;
        writeln!(
            f,
            "genotypes\thom_ref={} het={} hom_alt={} unknown={}",
            self.hom_ref, self.het, self.hom_alt, self.unknown
        )?;
        writeln!(f, "variant_block\t{}", self.status)?;
        write!(
            f,
            "metadata_block\t{}",
            if self.metadata_truncated {
                "truncated"
            } else {
                "complete"
            }
        )
    }
}
