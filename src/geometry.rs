//! Record geometry: how many whole records a byte region holds and where
//! each one starts.
use crate::error::{DbnError, Result};
use serde::{Deserialize, Serialize};

/// Length of the opaque metadata prefix of a DBN file.
pub const METADATA_LENGTH: usize = 200;
/// Width of an MBO or trade record.
pub const RECORD_WIDTH: usize = 48;

/// Fixed framing of a file: prefix length plus record width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub metadata_length: usize,
    pub record_width: usize,
}

impl Layout {
    /// 200-byte metadata prefix followed by 48-byte records.
    pub const DBN: Layout = Layout { metadata_length: METADATA_LENGTH, record_width: RECORD_WIDTH };
    /// Bare stream of 58-byte headered MBO records, no prefix.
    pub const HEADERED: Layout = Layout { metadata_length: 0, record_width: 58 };
}

impl Default for Layout {
    fn default() -> Self { Layout::DBN }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordGeometry {
    pub total_length: usize,
    pub metadata_length: usize,
    pub record_width: usize,
    pub record_count: usize,
}

impl RecordGeometry {
    /// Geometry of a region of `total_length` bytes framed by `layout`.
    ///
    /// `record_width` must be non-zero; `Layout` constants always are.
    pub fn new(total_length: usize, layout: Layout) -> Self {
        let record_count = total_length
            .saturating_sub(layout.metadata_length)
            .checked_div(layout.record_width)
            .unwrap_or(0);
        RecordGeometry {
            total_length,
            metadata_length: layout.metadata_length,
            record_width: layout.record_width,
            record_count,
        }
    }

    /// Geometry of an unloaded source.
    pub fn empty(layout: Layout) -> Self { Self::new(0, layout) }

    pub fn layout(&self) -> Layout {
        Layout { metadata_length: self.metadata_length, record_width: self.record_width }
    }

    /// Byte offset of record `index`. Not range checked.
    #[inline]
    pub fn offset_of(&self, index: usize) -> usize {
        self.metadata_length + index * self.record_width
    }

    /// Bytes after the last whole record.
    pub fn remainder(&self) -> usize {
        self.total_length.saturating_sub(self.metadata_length) - self.record_count * self.record_width
    }

    /// `Truncated` when the record area has a partial trailing record.
    pub fn check_exact(&self) -> Result<()> {
        match self.remainder() {
            0 => Ok(()),
            remainder => Err(DbnError::Truncated { remainder, record_width: self.record_width }),
        }
    }

    /// Validate `[start, start + count)` against `record_count`.
    pub fn check_range(&self, start: usize, count: usize) -> Result<()> {
        match start.checked_add(count) {
            Some(end) if end <= self.record_count => Ok(()),
            _ => Err(DbnError::OutOfRange { index: start, count, record_count: self.record_count }),
        }
    }
}
