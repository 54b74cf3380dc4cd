//! Minimal VCF row reader
//!
//! Only the columns the encoder consumes are interpreted: POS, REF, ALT, INFO,
//! FORMAT and the first sample column. Header lines are skipped. Rows that
//! cannot be interpreted are skipped and counted, never reported as errors.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::record::{encode_allele_frequency, encode_depth, Genotype, Metadata};

/// One row of the variant feed
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceVariant {
    /// 1-based position
    pub pos: u64,
    /// Reference allele
    pub reference: Vec<u8>,
    /// Alternate alleles (empty when ALT is `.`)
    pub alternates: Vec<Vec<u8>>,
    /// INFO key/value pairs; flags have an empty value
    pub info: Vec<(String, String)>,
    /// FORMAT tags
    pub format: Vec<String>,
    /// Values of the first sample column, parallel to `format`
    pub sample: Vec<String>,
}
impl SourceVariant {
    #[must_use]
    pub fn new(pos: u64, reference: &[u8], alternates: &[&[u8]]) -> Self {
        Self {
            pos,
            reference: reference.to_vec(),
            alternates: alternates.iter().map(|a| a.to_vec()).collect(),
            ..Default::default()
        }
    }

    /// Adds an INFO field
    #[must_use]
    pub fn with_info(mut self, key: &str, value: &str) -> Self {
        self.info.push((key.to_string(), value.to_string()));
        self
    }

    /// Adds a FORMAT tag and its sample value
    #[must_use]
    pub fn with_sample_field(mut self, tag: &str, value: &str) -> Self {
        self.format.push(tag.to_string());
        self.sample.push(value.to_string());
        self
    }

    /// Parses one tab-separated data row.
    ///
    /// Returns `None` for header lines and rows that cannot be interpreted.
    #[must_use]
    pub fn from_line(line: &str) -> Option<Self> {
        if line.starts_with('#') {
            return None;
        }
        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
        if fields.len() < 8 {
            return None;
        }
        let pos = fields[1].parse::<u64>().ok()?;
        let reference = fields[3].as_bytes().to_vec();
        let alternates = match fields[4] {
            "." | "" => Vec::new(),
            alt => alt.split(',').map(|a| a.as_bytes().to_vec()).collect(),
        };
        let info = match fields[7] {
            "." | "" => Vec::new(),
            info => info
                .split(';')
                .map(|kv| match kv.split_once('=') {
                    Some((k, v)) => (k.to_string(), v.to_string()),
                    None => (kv.to_string(), String::new()),
                })
                .collect(),
        };
        let format = fields
            .get(8)
            .map(|f| f.split(':').map(str::to_string).collect())
            .unwrap_or_default();
        let sample = fields
            .get(9)
            .map(|s| s.split(':').map(str::to_string).collect())
            .unwrap_or_default();

        Some(Self {
            pos,
            reference,
            alternates,
            info,
            format,
            sample,
        })
    }

    /// Returns the value of an INFO key
    #[must_use]
    pub fn info(&self, key: &str) -> Option<&str> {
        self.info
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the sample value for a FORMAT tag
    #[must_use]
    pub fn sample_field(&self, tag: &str) -> Option<&str> {
        let idx = self.format.iter().position(|t| t == tag)?;
        self.sample.get(idx).map(String::as_str)
    }

    /// The sample genotype string, if the row has one
    #[must_use]
    pub fn genotype(&self) -> Option<&str> {
        self.sample_field("GT")
    }

    /// Builds the metadata record for the 1-based alternate allele `allele`.
    ///
    /// A comma-separated AF list contributes the value belonging to `allele`.
    #[must_use]
    pub fn metadata_for(&self, allele: usize) -> Metadata {
        let af = self.info("AF").map_or(0, |af| {
            if af.contains(',') {
                af.split(',')
                    .nth(allele.saturating_sub(1))
                    .map_or(0, encode_allele_frequency)
            } else {
                encode_allele_frequency(af)
            }
        });
        Metadata::new(
            af,
            self.info("DP").map_or(0, encode_depth),
            self.genotype().map_or(Genotype::Unknown, Genotype::classify),
        )
    }
}

/// Reads [`SourceVariant`]s from VCF text
pub struct VcfReader<R: BufRead> {
    inner: R,
    line: Vec<u8>,
    /// Number of data rows skipped as malformed
    skipped: usize,
    /// Number of rows read (header lines excluded)
    rows: usize,
}
impl<R: BufRead> VcfReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: Vec::new(),
            skipped: 0,
            rows: 0,
        }
    }

    /// Number of data rows that were skipped as malformed
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Number of data rows seen so far
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Reads the next interpretable row
    ///
    /// # Returns
    ///
    /// * `Ok(Some(SourceVariant))` - The next row
    /// * `Ok(None)` - End of input
    /// * `Err(Error)` - If reading from the source fails
    pub fn next_variant(&mut self) -> Result<Option<SourceVariant>> {
        loop {
            self.line.clear();
            if self.inner.read_until(b'\n', &mut self.line)? == 0 {
                return Ok(None);
            }
            if self.line.starts_with(b"#") || self.line.trim_ascii().is_empty() {
                continue;
            }
            self.rows += 1;
            // rows that are not UTF-8 are malformed like any other
            let parsed = std::str::from_utf8(&self.line)
                .ok()
                .and_then(SourceVariant::from_line);
            if let Some(variant) = parsed {
                return Ok(Some(variant));
            }
            self.skipped += 1;
            debug!("Skipping malformed variant row {}", self.rows);
        }
    }
}
impl VcfReader<BufReader<Box<dyn Read>>> {
    /// Opens a (possibly compressed) VCF file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (handle, _comp) = niffler::from_path(path)?;
        Ok(Self::new(BufReader::new(handle)))
    }
}
impl<R: BufRead> Iterator for VcfReader<R> {
    type Item = Result<SourceVariant>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_variant().transpose()
    }
}
