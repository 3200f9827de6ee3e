//! Framed instance location
//!
//! Every DL instance sits behind a [`DlInstanceHeader`]. A named instance is
//! found by scanning the blob for the little-endian bytes of its type hash and
//! reading `{type_hash, payload_size}` from that point.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::datalib::definitions::DlInstanceHeader;
use crate::error::{Error, Result};
use crate::hash::TypeHash;
use crate::utils::{find_bytes, slice_at};

/// A located instance borrowed from its source blob
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceFrame<'a> {
    pub type_hash: TypeHash,
    pub payload_size: u32,
    pub payload: &'a [u8],
    /// Offset of the payload's first byte within the scanned blob
    pub payload_offset: usize,
}

impl<'a> InstanceFrame<'a> {
    /// Offset one past the payload's last byte
    pub fn end(&self) -> usize {
        self.payload_offset + self.payload.len()
    }
}

/// Find the first instance of `type_hash` in `blob`
///
/// Fails with `NotFound` if the marker never occurs and `Truncated` if the
/// declared payload runs past the end of the blob.
pub fn locate_instance(blob: &[u8], type_hash: TypeHash) -> Result<InstanceFrame<'_>> {
    let marker = type_hash.marker();
    let at = find_bytes(blob, &marker)
        .ok_or_else(|| Error::NotFound(format!("no instance of type {} in blob", type_hash)))?;

    let mut cursor = Cursor::new(&blob[at..]);
    let _type_hash = cursor.read_u32::<LittleEndian>()?;
    let payload_size = cursor.read_u32::<LittleEndian>().map_err(|_| {
        Error::Truncated(format!(
            "instance header of type {} cut short at offset {}",
            type_hash, at
        ))
    })?;

    let payload_offset = at + 8;
    let payload = slice_at(
        blob,
        payload_offset,
        payload_size as usize,
        &format!("payload of type {}", type_hash),
    )?;

    tracing::trace!(
        "located instance {} at offset {} ({} bytes)",
        type_hash,
        at,
        payload_size
    );

    Ok(InstanceFrame {
        type_hash,
        payload_size,
        payload,
        payload_offset,
    })
}

/// Read a full header (magic included) at the cursor and borrow its payload
pub(crate) fn read_frame<'a>(cursor: &mut Cursor<&'a [u8]>) -> Result<InstanceFrame<'a>> {
    let start = cursor.position() as usize;
    let header = DlInstanceHeader::read(cursor)?;
    if !header.has_magic() {
        return Err(Error::CorruptFormat(format!(
            "bad instance magic {:08x} at offset {}",
            header.magic, start
        )));
    }

    let blob: &'a [u8] = *cursor.get_ref();
    let payload_offset = start + DlInstanceHeader::RECORD_SIZE;
    let payload = slice_at(
        blob,
        payload_offset,
        header.payload_size as usize,
        &format!("payload of type {}", header.type_hash),
    )?;
    cursor.set_position((payload_offset + payload.len()) as u64);

    Ok(InstanceFrame {
        type_hash: header.type_hash,
        payload_size: header.payload_size,
        payload,
        payload_offset,
    })
}
