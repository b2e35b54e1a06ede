//! Reader for fixed-geometry DBN market data files.
//!
//! A DBN file here is a 200-byte opaque metadata prefix followed by a run of
//! 48-byte little-endian records. This crate provides:
//!
//! - `source`: the file bytes, copied into memory or memory-mapped
//! - `geometry`: record count and offsets derived from the file length
//! - `record`: record types, their decoders and fixed-point price helpers
//! - `file`: [`DbnFile`], with direct span access, callback scans and
//!   batch iteration over the same loaded region
//! - `stats`: timing and throughput of a full pass
//!
//! The binaries in this repository (`src/main.rs` and `src/bin/dump.rs`)
//! time the access paths and print decoded records.
pub mod error;
pub mod file;
pub mod geometry;
pub mod record;
pub mod source;
pub mod stats;

pub use error::{DbnError, Result};
pub use file::{parse_file, read_all, DbnFile, RecordIter, DEFAULT_BATCH_SIZE};
pub use geometry::{Layout, RecordGeometry, METADATA_LENGTH, RECORD_WIDTH};
pub use record::{float_to_price, price_to_float, Action, DbnRecord, HeaderedMboMsg, MboMsg, RecordHeader, RType, Side, TradeMsg};
pub use source::{ByteSource, LoadMode};
pub use stats::{measure, ParseStats};
