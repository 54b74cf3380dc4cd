//! Sequence restoration
//!
//! Applies decoded variant records to an unpacked reference. Records are
//! applied from the highest edit index down so that every record addresses
//! the original coordinate system.

use std::cmp::Reverse;

use tracing::{debug, warn};

use crate::record::{Variant, VariantKind};

/// Byte buffer with a movable gap at the edit cursor
///
/// Content is `buf[..gap_start] ++ buf[gap_end..]`. Moving the gap costs the
/// distance moved, so a descending sweep over the buffer is linear overall.
#[derive(Debug)]
struct GapBuffer {
    buf: Vec<u8>,
    gap_start: usize,
    gap_end: usize,
}
impl GapBuffer {
    fn new(content: Vec<u8>) -> Self {
        let len = content.len();
        Self {
            buf: content,
            gap_start: len,
            gap_end: len,
        }
    }

    fn len(&self) -> usize {
        self.buf.len() - (self.gap_end - self.gap_start)
    }

    fn gap(&self) -> usize {
        self.gap_end - self.gap_start
    }

    fn physical(&self, idx: usize) -> usize {
        if idx < self.gap_start {
            idx
        } else {
            idx + self.gap()
        }
    }

    fn get(&self, idx: usize) -> u8 {
        self.buf[self.physical(idx)]
    }

    fn set(&mut self, idx: usize, symbol: u8) {
        let p = self.physical(idx);
        self.buf[p] = symbol;
    }

    fn move_gap(&mut self, to: usize) {
        if to < self.gap_start {
            let n = self.gap_start - to;
            self.buf.copy_within(to..self.gap_start, self.gap_end - n);
            self.gap_start = to;
            self.gap_end -= n;
        } else if to > self.gap_start {
            let n = to - self.gap_start;
            self.buf
                .copy_within(self.gap_end..self.gap_end + n, self.gap_start);
            self.gap_start += n;
            self.gap_end += n;
        }
    }

    fn reserve_gap(&mut self, needed: usize) {
        if self.gap() >= needed {
            return;
        }
        let grow = needed.max(self.buf.len() / 2).max(64) - self.gap();
        let tail = self.buf.len() - self.gap_end;
        self.buf.resize(self.buf.len() + grow, 0);
        let new_end = self.buf.len() - tail;
        self.buf.copy_within(self.gap_end..self.gap_end + tail, new_end);
        self.gap_end = new_end;
    }

    /// Inserts `symbols` before index `at`
    fn insert(&mut self, at: usize, symbols: &[u8]) {
        self.move_gap(at);
        self.reserve_gap(symbols.len());
        self.buf[self.gap_start..self.gap_start + symbols.len()].copy_from_slice(symbols);
        self.gap_start += symbols.len();
    }

    /// Removes `len` symbols starting at index `at`
    fn delete(&mut self, at: usize, len: usize) {
        self.move_gap(at);
        self.gap_end += len;
    }

    fn into_vec(mut self) -> Vec<u8> {
        self.buf.drain(self.gap_start..self.gap_end);
        self.buf
    }
}

/// Counters collected while applying records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Records applied to the buffer
    pub applied: usize,
    /// Records whose edit index lies outside the buffer
    pub skipped: usize,
    /// Deletions cut short at the end of the buffer
    pub clamped: usize,
    /// SNPs whose reference symbol disagrees with the buffer
    pub ref_mismatches: usize,
}

/// Rank of a record kind among records sharing an edit index
fn tie_rank(kind: VariantKind) -> u8 {
    match kind {
        VariantKind::Snp => 0,
        VariantKind::Deletion => 1,
        VariantKind::Insertion => 2,
    }
}

/// Applies variant records to a reference sequence
#[derive(Debug, Clone, Copy, Default)]
pub struct Restorer {
    verify_reference: bool,
}
impl Restorer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare each SNP's reference symbol against the buffer before applying it
    #[must_use]
    pub fn verify_reference(mut self, verify: bool) -> Self {
        self.verify_reference = verify;
        self
    }

    /// Returns the order in which `variants` are applied, as indices into the slice
    ///
    /// Edit index descending; on ties SNP, then deletion, then insertion; within
    /// a kind the later-listed record first.
    #[must_use]
    pub fn application_order(variants: &[Variant]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..variants.len()).collect();
        order.sort_by_key(|&i| {
            let v = &variants[i];
            (
                Reverse(v.edit_index().map_or(0, |x| x + 1)),
                tie_rank(v.kind()),
                Reverse(i),
            )
        });
        order
    }

    /// Applies `variants` to `reference`, returning the edited sequence
    pub fn restore(&self, reference: Vec<u8>, variants: &[Variant]) -> (Vec<u8>, RestoreReport) {
        let mut report = RestoreReport::default();
        let mut buffer = GapBuffer::new(reference);

        for i in Self::application_order(variants) {
            let variant = &variants[i];
            let Some(idx) = variant.edit_index() else {
                debug!("Skipping record at position 0");
                report.skipped += 1;
                continue;
            };
            match variant {
                Variant::Snp {
                    reference,
                    alternate,
                    ..
                } => {
                    if idx >= buffer.len() {
                        debug!("Skipping SNP at {}: past end of sequence", variant.pos());
                        report.skipped += 1;
                        continue;
                    }
                    if self.verify_reference && buffer.get(idx) != *reference {
                        report.ref_mismatches += 1;
                        warn!(
                            "Reference mismatch at {}: record has {}, sequence has {}",
                            variant.pos(),
                            *reference as char,
                            buffer.get(idx) as char
                        );
                    }
                    buffer.set(idx, *alternate);
                }
                Variant::Insertion { symbols, .. } => {
                    if idx > buffer.len() {
                        debug!("Skipping insertion at {}: past end of sequence", variant.pos());
                        report.skipped += 1;
                        continue;
                    }
                    buffer.insert(idx, symbols);
                }
                Variant::Deletion { length, .. } => {
                    if idx >= buffer.len() {
                        debug!("Skipping deletion at {}: past end of sequence", variant.pos());
                        report.skipped += 1;
                        continue;
                    }
                    let available = buffer.len() - idx;
                    let length = *length as usize;
                    if length > available {
                        report.clamped += 1;
                    }
                    buffer.delete(idx, length.min(available));
                }
            }
            report.applied += 1;
        }

        (buffer.into_vec(), report)
    }
}
