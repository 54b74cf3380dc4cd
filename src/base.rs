//! Nucleotide symbol codec
//!
//! Maps the 4-symbol alphabet onto 2-bit codes and packs runs of symbols
//! 4 per byte, most-significant bits first:
//!
//! | Symbol | Code |
//! | ------ | ---- |
//! | A      | 00   |
//! | C      | 01   |
//! | G      | 10   |
//! | T      | 11   |
//!
//! Any other symbol encodes as `00`. Callers that need to tell such positions
//! apart from a real `A` must track them separately (see [`crate::PackedReference`]).

/// Placeholder symbol for positions that were outside the 4-symbol alphabet
pub const UNRESOLVED: u8 = b'N';

/// Number of symbols packed into a single byte
pub const SYMBOLS_PER_BYTE: usize = 4;

const DECODE_TABLE: [u8; 4] = [b'A', b'C', b'G', b'T'];

/// Encodes one symbol as a 2-bit code.
///
/// Lowercase symbols are accepted. Anything outside `ACGT` maps to `0b00`.
#[inline]
#[must_use]
pub fn encode_symbol(symbol: u8) -> u8 {
    match symbol {
        b'C' | b'c' => 0b01,
        b'G' | b'g' => 0b10,
        b'T' | b't' => 0b11,
        _ => 0b00,
    }
}

/// Decodes a 2-bit code back into its symbol.
///
/// Only the two low bits of `code` are considered.
#[inline]
#[must_use]
pub fn decode_code(code: u8) -> u8 {
    DECODE_TABLE[(code & 0b11) as usize]
}

/// Returns true if the symbol belongs to the 4-symbol alphabet
#[inline]
#[must_use]
pub fn is_resolved(symbol: u8) -> bool {
    matches!(
        symbol,
        b'A' | b'C' | b'G' | b'T' | b'a' | b'c' | b'g' | b't'
    )
}

/// Number of bytes needed to hold `n` packed symbols
#[inline]
#[must_use]
pub fn packed_len(n: usize) -> usize {
    n.div_ceil(4)
}

/// Packs symbols 4 per byte, MSB-first, appending to `out`.
///
/// The unused low bits of the final byte are zero.
pub fn pack_symbols(symbols: &[u8], out: &mut Vec<u8>) {
    out.reserve(packed_len(symbols.len()));
    for chunk in symbols.chunks(SYMBOLS_PER_BYTE) {
        let mut byte = 0u8;
        for (i, &s) in chunk.iter().enumerate() {
            byte |= encode_symbol(s) << (6 - 2 * i);
        }
        out.push(byte);
    }
}

/// Unpacks `n` symbols from an MSB-first packed buffer, appending to `out`.
///
/// The caller guarantees `packed.len() >= packed_len(n)`.
pub fn unpack_symbols(packed: &[u8], n: usize, out: &mut Vec<u8>) {
    out.reserve(n);
    for i in 0..n {
        let byte = packed[i / SYMBOLS_PER_BYTE];
        let shift = 6 - 2 * (i % SYMBOLS_PER_BYTE);
        out.push(decode_code(byte >> shift));
    }
}
