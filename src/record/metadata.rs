//! Fixed-width metadata records
//!
//! Each variant record owns exactly one 3-byte metadata record:
//! `[allele_frequency, depth, genotype]`.

/// Size of one metadata record in bytes
pub const SIZE_METADATA: usize = 3;

/// Genotype class of the sample at a site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Genotype {
    /// `0/0`
    HomRef,
    /// `0/1` or `1/0`
    Het,
    /// Missing, malformed, or anything other than two alleles in `{0, 1}`
    #[default]
    Unknown,
    /// `1/1`
    HomAlt,
}
impl Genotype {
    /// Classifies a genotype string such as `0/1` or `1|1`
    #[must_use]
    pub fn classify(gt: &str) -> Self {
        let alleles: Vec<&str> = gt.split(['/', '|']).collect();
        match alleles.as_slice() {
            ["0", "0"] => Self::HomRef,
            ["1", "1"] => Self::HomAlt,
            ["0", "1"] | ["1", "0"] => Self::Het,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::HomRef => 0,
            Self::Het => 1,
            Self::Unknown => 2,
            Self::HomAlt => 3,
        }
    }

    /// Maps a stored code back to its class; unassigned codes read as [`Genotype::Unknown`]
    #[must_use]
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::HomRef,
            1 => Self::Het,
            3 => Self::HomAlt,
            _ => Self::Unknown,
        }
    }
}

/// Per-variant summary of population and call quality fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Metadata {
    /// Allele frequency linearly scaled from `[0, 1]` to `[0, 255]`
    pub allele_frequency: u8,
    /// Read depth clamped to `[0, 255]`
    pub depth: u8,
    pub genotype: Genotype,
}
impl Metadata {
    #[must_use]
    pub fn new(allele_frequency: u8, depth: u8, genotype: Genotype) -> Self {
        Self {
            allele_frequency,
            depth,
            genotype,
        }
    }

    /// Builds a record from raw text fields; unparseable numbers encode as 0
    #[must_use]
    pub fn from_fields(af: Option<&str>, depth: Option<&str>, genotype: Option<&str>) -> Self {
        Self {
            allele_frequency: af.map_or(0, encode_allele_frequency),
            depth: depth.map_or(0, encode_depth),
            genotype: genotype.map_or(Genotype::Unknown, Genotype::classify),
        }
    }

    /// Allele frequency as a fraction in `[0, 1]`
    #[must_use]
    pub fn frequency(&self) -> f64 {
        f64::from(self.allele_frequency) / 255.0
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; SIZE_METADATA] {
        [self.allele_frequency, self.depth, self.genotype.code()]
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; SIZE_METADATA]) -> Self {
        Self {
            allele_frequency: bytes[0],
            depth: bytes[1],
            genotype: Genotype::from_code(bytes[2]),
        }
    }

    /// Splits a metadata block into records, ignoring a trailing partial record
    #[must_use]
    pub fn parse_block(block: &[u8]) -> Vec<Self> {
        block
            .chunks_exact(SIZE_METADATA)
            .map(|c| Self::from_bytes([c[0], c[1], c[2]]))
            .collect()
    }
}

/// Scales an allele frequency string to a byte; returns 0 if it does not parse
#[allow(clippy::cast_sign_loss)]
#[must_use]
pub fn encode_allele_frequency(value: &str) -> u8 {
    match value.trim().parse::<f64>() {
        Ok(v) if !v.is_nan() => (v.clamp(0.0, 1.0) * 255.0).round() as u8,
        _ => 0,
    }
}

/// Clamps a depth string to a byte; returns 0 if it does not parse
#[allow(clippy::cast_sign_loss)]
#[must_use]
pub fn encode_depth(value: &str) -> u8 {
    value
        .trim()
        .parse::<i64>()
        .map_or(0, |v| v.clamp(0, i64::from(u8::MAX)) as u8)
}
