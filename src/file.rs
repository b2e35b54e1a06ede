//! Access paths over a loaded DBN file.
//!
//! [`DbnFile`] owns the [`ByteSource`] and its [`RecordGeometry`] and offers
//! three independent ways to reach the records:
//!
//! - direct: [`DbnFile::record_span`] / [`DbnFile::batch_span`] return
//!   borrowed byte spans in O(1); [`DbnFile::record_at`] decodes one record
//! - callback: [`DbnFile::scan`] decodes every record in file order and hands
//!   each to a handler
//! - batch: [`DbnFile::for_each_batch`] decodes contiguous groups into owned
//!   `Vec`s
//!
//! Reads take `&self` and may run from several threads at once. Loading
//! takes `&mut self`, so the borrow checker serializes it against readers.
use crate::error::{DbnError, Result};
use crate::geometry::{Layout, RecordGeometry};
use crate::record::DbnRecord;
use crate::source::{ByteSource, LoadMode};
use crate::stats::{measure, ParseStats};
use std::marker::PhantomData;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Records per batch when the caller has no better figure.
pub const DEFAULT_BATCH_SIZE: usize = 524_288;

#[derive(Debug)]
pub struct DbnFile {
    path: PathBuf,
    source: ByteSource,
    geometry: RecordGeometry,
}

impl DbnFile {
    /// A reader for `path` using the standard 200-byte prefix and 48-byte
    /// records. Nothing is read until a `load_*` call or the first scan.
    pub fn new(path: impl Into<PathBuf>) -> Self { Self::with_layout(path, Layout::DBN) }

    pub fn with_layout(path: impl Into<PathBuf>, layout: Layout) -> Self {
        DbnFile { path: path.into(), source: ByteSource::Unloaded, geometry: RecordGeometry::empty(layout) }
    }

    /// Copy the whole file into memory, replacing any previous load.
    pub fn load_buffered(&mut self) -> Result<()> { self.load(LoadMode::Buffered) }

    /// Map the file read-only, replacing any previous load.
    pub fn load_mapped(&mut self) -> Result<()> { self.load(LoadMode::Mapped) }

    pub fn load(&mut self, mode: LoadMode) -> Result<()> {
        let layout = self.geometry.layout();
        // Release the previous region first so a failed reload never leaves
        // two mappings alive.
        self.source = ByteSource::Unloaded;
        self.geometry = RecordGeometry::empty(layout);

        let source = match mode {
            LoadMode::Buffered => ByteSource::read(&self.path)?,
            LoadMode::Mapped => ByteSource::map(&self.path)?,
        };
        let geometry = RecordGeometry::new(source.len(), layout);
        if let Err(e) = geometry.check_exact() {
            warn!(path = %self.path.display(), "{e}; trailing bytes ignored");
        }
        debug!(
            path = %self.path.display(),
            ?mode,
            total_length = geometry.total_length,
            record_count = geometry.record_count,
            "loaded"
        );
        self.source = source;
        self.geometry = geometry;
        Ok(())
    }

    fn ensure_loaded(&mut self) -> Result<()> {
        if self.is_loaded() { Ok(()) } else { self.load_buffered() }
    }

    pub fn path(&self) -> &Path { &self.path }
    pub fn is_loaded(&self) -> bool { self.source.mode().is_some() }
    pub fn load_mode(&self) -> Option<LoadMode> { self.source.mode() }
    pub fn geometry(&self) -> &RecordGeometry { &self.geometry }
    pub fn record_count(&self) -> usize { self.geometry.record_count }
    pub fn record_width(&self) -> usize { self.geometry.record_width }
    pub fn metadata_length(&self) -> usize { self.geometry.metadata_length }
    pub fn total_length(&self) -> usize { self.geometry.total_length }

    /// The whole loaded region, metadata prefix included.
    pub fn as_bytes(&self) -> &[u8] { self.source.as_bytes() }

    /// The raw bytes of record `index`.
    pub fn record_span(&self, index: usize) -> Result<&[u8]> { self.batch_span(index, 1) }

    /// The raw bytes of records `[start, start + count)`, contiguous.
    pub fn batch_span(&self, start: usize, count: usize) -> Result<&[u8]> {
        self.geometry.check_range(start, count)?;
        // An empty range on a region shorter than the prefix has no offset to
        // point at; clamp to the end of the region.
        let from = self.geometry.offset_of(start).min(self.source.len());
        Ok(&self.source.as_bytes()[from..from + count * self.geometry.record_width])
    }

    /// Decode record `index`.
    pub fn record_at<R: DbnRecord>(&self, index: usize) -> Result<R> {
        self.check_width::<R>()?;
        Ok(R::decode(self.record_span(index)?))
    }

    /// Decode records `[start, start + count)` into a new `Vec`.
    pub fn batch<R: DbnRecord>(&self, start: usize, count: usize) -> Result<Vec<R>> {
        self.check_width::<R>()?;
        let span = self.batch_span(start, count)?;
        Ok(span.chunks_exact(R::WIDTH).map(R::decode).collect())
    }

    /// Lazily decode every record in order. Requires a prior load.
    pub fn iter<R: DbnRecord>(&self) -> Result<RecordIter<'_, R>> {
        self.check_width::<R>()?;
        let start = self.geometry.offset_of(0).min(self.source.len());
        let end = self.geometry.offset_of(self.geometry.record_count).min(self.source.len());
        Ok(RecordIter { data: &self.source.as_bytes()[start..end], pos: 0, parsed: 0, _marker: PhantomData })
    }

    /// Visit every record in file order. Loads the file (buffered) first if
    /// nothing is loaded yet. Returns the number of records visited.
    ///
    /// The record reference is only valid for the duration of the call.
    pub fn scan<R, F>(&mut self, mut handler: F) -> Result<usize>
    where
        R: DbnRecord,
        F: FnMut(&R),
    {
        self.try_scan(|r: &R| {
            handler(r);
            Ok::<_, DbnError>(ControlFlow::Continue(()))
        })
    }

    /// Like [`scan`](Self::scan), but the handler can stop the pass with
    /// `ControlFlow::Break` or abort it with an error, which is returned as is.
    /// Returns the number of records handed to the handler.
    pub fn try_scan<R, E, F>(&mut self, mut handler: F) -> std::result::Result<usize, E>
    where
        R: DbnRecord,
        E: From<DbnError>,
        F: FnMut(&R) -> std::result::Result<ControlFlow<()>, E>,
    {
        self.ensure_loaded()?;
        self.check_width::<R>()?;
        let mut visited = 0;
        for record in self.iter::<R>()? {
            visited += 1;
            if handler(&record)?.is_break() {
                debug!(visited, "scan stopped by handler");
                break;
            }
        }
        Ok(visited)
    }

    /// Decode the file in consecutive groups of `batch_size` records and pass
    /// each group to `handler`. The last group may be short. Loads the file
    /// (buffered) first if nothing is loaded yet.
    pub fn for_each_batch<R, F>(&mut self, batch_size: usize, mut handler: F) -> Result<usize>
    where
        R: DbnRecord,
        F: FnMut(Vec<R>),
    {
        self.try_for_each_batch(batch_size, |batch: Vec<R>| {
            handler(batch);
            Ok::<_, DbnError>(ControlFlow::Continue(()))
        })
    }

    /// Fallible, stoppable [`for_each_batch`](Self::for_each_batch). Returns
    /// the number of records delivered.
    pub fn try_for_each_batch<R, E, F>(&mut self, batch_size: usize, mut handler: F) -> std::result::Result<usize, E>
    where
        R: DbnRecord,
        E: From<DbnError>,
        F: FnMut(Vec<R>) -> std::result::Result<ControlFlow<()>, E>,
    {
        if batch_size == 0 {
            return Err(DbnError::InvalidConfig("batch size must be at least 1".into()).into());
        }
        self.ensure_loaded()?;
        self.check_width::<R>()?;
        let total = self.record_count();
        let mut delivered = 0;
        let mut start = 0;
        while start < total {
            let count = batch_size.min(total - start);
            let batch = self.batch::<R>(start, count)?;
            delivered += count;
            start += count;
            if handler(batch)?.is_break() {
                debug!(delivered, "batch pass stopped by handler");
                break;
            }
        }
        Ok(delivered)
    }

    fn check_width<R: DbnRecord>(&self) -> Result<()> {
        if R::WIDTH == self.geometry.record_width {
            Ok(())
        } else {
            Err(DbnError::InvalidConfig(format!(
                "record type is {} bytes wide but the file layout uses {}-byte records",
                R::WIDTH,
                self.geometry.record_width
            )))
        }
    }
}

/// Sequential decoder over the record area of a loaded [`DbnFile`].
#[derive(Debug, Clone)]
pub struct RecordIter<'a, R> {
    data: &'a [u8],
    pos: usize,
    parsed: usize,
    _marker: PhantomData<R>,
}

impl<R: DbnRecord> RecordIter<'_, R> {
    pub fn has_next(&self) -> bool { self.pos + R::WIDTH <= self.data.len() }

    /// Records yielded so far.
    pub fn records_parsed(&self) -> usize { self.parsed }
}

impl<R: DbnRecord> Iterator for RecordIter<'_, R> {
    type Item = R;

    #[inline]
    fn next(&mut self) -> Option<R> {
        if !self.has_next() {
            return None;
        }
        let record = R::decode(&self.data[self.pos..self.pos + R::WIDTH]);
        self.pos += R::WIDTH;
        self.parsed += 1;
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = (self.data.len() - self.pos) / R::WIDTH;
        (n, Some(n))
    }
}

impl<R: DbnRecord> ExactSizeIterator for RecordIter<'_, R> {}

/// Load `path` (buffered, standard layout) and decode every record.
pub fn read_all<R: DbnRecord>(path: impl AsRef<Path>) -> Result<Vec<R>> {
    let mut file = DbnFile::new(path.as_ref());
    file.load_buffered()?;
    file.batch(0, file.record_count())
}

/// Load `path` (buffered, standard layout), run `handler` over every record
/// and report how long the load and pass took.
pub fn parse_file<R, F>(path: impl AsRef<Path>, handler: F) -> Result<ParseStats>
where
    R: DbnRecord,
    F: FnMut(&R),
{
    let mut file = DbnFile::new(path.as_ref());
    measure(R::WIDTH, || {
        file.load_buffered()?;
        file.scan(handler)
    })
}
