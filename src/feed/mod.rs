//! Upstream feeds: variant calls in, reference sequence in, restored sequence out

mod fasta;
mod vcf;

pub use fasta::{load_reference, read_reference, write_fasta, ReferenceSequence, LINE_WIDTH};
pub use vcf::{SourceVariant, VcfReader};
