use std::io::Write;

use super::{Metadata, Variant};
use crate::error::Result;
use crate::policy::Discipline;

/// A variant record together with its metadata record
///
/// On the wire the two halves live in separate blocks and are paired by
/// index only. Both halves are always written from the same entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub variant: Variant,
    pub metadata: Metadata,
}
impl Entry {
    #[must_use]
    pub fn new(variant: Variant, metadata: Metadata) -> Self {
        Self { variant, metadata }
    }

    /// Appends the variant record to `vbuf` and the metadata record to `mbuf`
    pub fn write_parts<V: Write, M: Write>(
        &self,
        vbuf: &mut V,
        mbuf: &mut M,
        discipline: Discipline,
    ) -> Result<()> {
        self.variant.write_bytes(vbuf, discipline)?;
        mbuf.write_all(&self.metadata.to_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::record::Genotype;

    #[test]
    fn test_write_parts() -> Result<()> {
        let entry = Entry::new(
            Variant::Deletion { pos: 5, length: 2 },
            Metadata::new(10, 20, Genotype::Het),
        );
        let mut vbuf = Vec::new();
        let mut mbuf = Vec::new();
        entry.write_parts(&mut vbuf, &mut mbuf, Discipline::Fixed)?;
        assert_eq!(vbuf, vec![0x02, 0, 0, 0, 5, 2]);
        assert_eq!(mbuf, vec![10, 20, 1]);
        Ok(())
    }
}
