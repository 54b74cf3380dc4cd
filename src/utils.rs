//! Size arithmetic for the container blocks

use crate::header::SIZE_HEADER;
use crate::record::SIZE_METADATA;

/// Marker that opens the metadata trailer
pub const MARKER: &[u8; 4] = b"META";

/// Length of the trailer marker plus its 4-byte length field
pub const SIZE_TRAILER: usize = 8;

/// Calculates the size of the 2-bit reference block for `len` symbols
#[must_use]
pub fn reference_block_size(len: usize) -> usize {
    // four symbols per byte; ceil(len * 2 / 8) without overflowing on huge lengths
    len.div_ceil(4)
}

/// Calculates the size of the 1-bit mask block for `len` symbols
#[must_use]
pub fn mask_block_size(len: usize) -> usize {
    len.div_ceil(8)
}

/// Calculates the expected size in bytes of a complete container
///
/// # Arguments
///
/// * `ref_len` - Number of symbols in the reference
/// * `variant_block` - Byte length of the concatenated variant records
/// * `num_records` - Number of variant records (one metadata record each)
/// * `headless` - Whether the container omits the leading header
///
/// # Examples
///
/// ```
/// use binvar::expected_container_size;
///
/// // 5 symbols, one SNP record, no header
/// assert_eq!(expected_container_size(5, 7, 1, true), 2 + 1 + 7 + 8 + 3);
/// ```
#[must_use]
pub fn expected_container_size(
    ref_len: usize,
    variant_block: usize,
    num_records: usize,
    headless: bool,
) -> usize {
    let header = if headless { 0 } else { SIZE_HEADER };
    header
        + reference_block_size(ref_len)
        + mask_block_size(ref_len)
        + variant_block
        + SIZE_TRAILER
        + num_records * SIZE_METADATA
}
