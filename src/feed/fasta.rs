use std::io::{Read, Write};
use std::path::Path;

use seq_io::fasta::{Reader, Record};

use crate::error::{FeedError, Result};

/// Default number of symbols per line of restored FASTA output
pub const LINE_WIDTH: usize = 60;

/// A named sequence from the sequence feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSequence {
    pub name: String,
    pub sequence: Vec<u8>,
}

/// Reads the first FASTA record, joining its lines and upper-casing the symbols
pub fn read_reference<R: Read>(reader: R) -> Result<ReferenceSequence> {
    let mut reader = Reader::new(reader);
    let Some(record) = reader.next() else {
        return Err(FeedError::EmptyReference.into());
    };
    let record = record?;
    let name = record.id()?.to_string();
    let mut sequence = record.full_seq().into_owned();
    sequence.make_ascii_uppercase();
    Ok(ReferenceSequence { name, sequence })
}

/// Opens a (possibly compressed) FASTA file and reads its first record
pub fn load_reference<P: AsRef<Path>>(path: P) -> Result<ReferenceSequence> {
    let (handle, _comp) = niffler::from_path(path)?;
    read_reference(handle)
}

/// Writes a sequence as FASTA: a `>name` line, then `width` symbols per line.
///
/// A width of 0 writes the sequence on a single line.
pub fn write_fasta<W: Write>(
    writer: &mut W,
    name: &str,
    sequence: &[u8],
    width: usize,
) -> Result<()> {
    writeln!(writer, ">{name}")?;
    let width = if width == 0 { sequence.len().max(1) } else { width };
    for line in sequence.chunks(width) {
        writer.write_all(line)?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}
