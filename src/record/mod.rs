//! Variant and metadata records

mod entry;
mod metadata;
mod variant;

pub use entry::Entry;
pub use metadata::{encode_allele_frequency, encode_depth, Genotype, Metadata, SIZE_METADATA};
pub use variant::{
    Classification, Parsed, SkipReason, Variant, VariantKind, SIZE_SNP, TAG_DELETION,
    TAG_INSERTION, TAG_SNP,
};
