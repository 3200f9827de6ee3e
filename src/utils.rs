//! General byte-level helpers shared by the DL parsers

use crate::error::{Error, Result};

/// Find the first byte-exact occurrence of `needle` in `haystack`
pub fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Borrow `len` bytes at `offset`, failing with `Truncated` if they are not all there
pub fn slice_at<'a>(data: &'a [u8], offset: usize, len: usize, what: &str) -> Result<&'a [u8]> {
    let end = offset.checked_add(len).ok_or_else(|| {
        Error::CorruptFormat(format!("{}: offset {} + length {} overflows", what, offset, len))
    })?;
    data.get(offset..end).ok_or_else(|| {
        Error::Truncated(format!(
            "{}: needs bytes {}..{} but only {} available",
            what,
            offset,
            end,
            data.len()
        ))
    })
}

/// Byte length of `count` records of `record_size` bytes
pub fn array_len(count: usize, record_size: usize, what: &str) -> Result<usize> {
    count
        .checked_mul(record_size)
        .ok_or_else(|| {
            Error::CorruptFormat(format!(
                "{}: {} x {} bytes overflows",
                what, count, record_size
            ))
        })
}
