//! Instance stream tokenizer
//!
//! The entities blob is a run of framed instances with no count. Some frames
//! carry a leading `u32` component index, others do not, and the only way to
//! tell is to look past the end of the current frame: if the next four bytes
//! are the `"LDLD"` magic a bare frame follows, otherwise those bytes are the
//! index of an indexed frame.

use byteorder::{LittleEndian, ReadBytesExt};
use std::collections::HashMap;
use std::io::Cursor;

use crate::datalib::definitions::DL_MAGIC;
use crate::datalib::header::{read_frame, InstanceFrame};
use crate::error::{Error, Result};
use crate::hash::TypeHash;

/// What the tokenizer expects at the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// A frame header starts right here
    ExpectBareFrame,
    /// A `u32` index precedes the next frame header
    ExpectIndexedFrame,
    /// Clean end of input at a frame boundary
    Done,
}

impl StreamState {
    /// Decide the next state from the bytes after a frame
    ///
    /// `peek` is whatever is left of the next four bytes; an empty slice is a
    /// clean end of stream.
    pub fn after_frame(peek: &[u8]) -> Result<StreamState> {
        match peek.len() {
            0 => Ok(StreamState::Done),
            1..=3 => Err(Error::Truncated(format!(
                "{} stray bytes after last frame",
                peek.len()
            ))),
            _ => {
                let word = u32::from_le_bytes([peek[0], peek[1], peek[2], peek[3]]);
                if word == DL_MAGIC {
                    Ok(StreamState::ExpectBareFrame)
                } else {
                    Ok(StreamState::ExpectIndexedFrame)
                }
            }
        }
    }
}

/// One tokenized frame
#[derive(Debug, Clone, Copy)]
pub struct StreamItem<'a> {
    /// Leading component index, if the frame had one
    pub index: Option<u32>,
    pub frame: InstanceFrame<'a>,
}

/// Iterator over the frames of an instance stream
///
/// The first frame is always bare. Any read failure other than a clean end of
/// input is yielded once as an error and ends iteration.
pub struct InstanceStream<'a> {
    cursor: Cursor<&'a [u8]>,
    state: StreamState,
}

impl<'a> InstanceStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        let state = if data.is_empty() {
            StreamState::Done
        } else {
            StreamState::ExpectBareFrame
        };
        InstanceStream {
            cursor: Cursor::new(data),
            state,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    fn next_item(&mut self) -> Result<StreamItem<'a>> {
        let index = match self.state {
            StreamState::ExpectIndexedFrame => Some(self.cursor.read_u32::<LittleEndian>()?),
            _ => None,
        };
        let frame = read_frame(&mut self.cursor)?;

        let data: &'a [u8] = *self.cursor.get_ref();
        let end = frame.end();
        let peek = &data[end..data.len().min(end + 4)];
        self.state = StreamState::after_frame(peek)?;

        tracing::trace!(
            "frame {} at {} ({} bytes, index {:?}) -> {:?}",
            frame.type_hash,
            frame.payload_offset,
            frame.payload_size,
            index,
            self.state
        );
        Ok(StreamItem { index, frame })
    }
}

impl<'a> Iterator for InstanceStream<'a> {
    type Item = Result<StreamItem<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == StreamState::Done {
            return None;
        }
        let item = self.next_item();
        if item.is_err() {
            self.state = StreamState::Done;
        }
        Some(item)
    }
}

/// Component index to component table type, taken from an instance stream
#[derive(Debug, Clone, Default)]
pub struct ComponentIndexMap {
    types: HashMap<u32, TypeHash>,
}

impl ComponentIndexMap {
    /// Tokenize `data` and record the type of every indexed frame
    pub fn build(data: &[u8]) -> Result<Self> {
        let mut types = HashMap::new();
        let mut frames = 0usize;

        for item in InstanceStream::new(data) {
            let item = item?;
            frames += 1;
            if let Some(index) = item.index {
                if let Some(previous) = types.insert(index, item.frame.type_hash) {
                    tracing::warn!(
                        "component index {} remapped from {} to {}",
                        index,
                        previous,
                        item.frame.type_hash
                    );
                }
            }
        }

        tracing::debug!(
            "component index map: {} indexed of {} frames",
            types.len(),
            frames
        );
        Ok(ComponentIndexMap { types })
    }

    pub fn get(&self, index: u32) -> Option<TypeHash> {
        self.types.get(&index).copied()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, TypeHash)> + '_ {
        self.types.iter().map(|(&i, &t)| (i, t))
    }
}

impl FromIterator<(u32, TypeHash)> for ComponentIndexMap {
    fn from_iter<I: IntoIterator<Item = (u32, TypeHash)>>(iter: I) -> Self {
        ComponentIndexMap {
            types: iter.into_iter().collect(),
        }
    }
}

/// Build the component index map of an entities stream
pub fn build_component_index_map(data: &[u8]) -> Result<ComponentIndexMap> {
    ComponentIndexMap::build(data)
}
