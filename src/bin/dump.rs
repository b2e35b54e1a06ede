use anyhow::{Context, Result};
use clap::Parser;
use dbn_reader::{DbnFile, MboMsg};
use std::ops::ControlFlow;
use std::path::PathBuf;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(about = "Print decoded MBO records from a DBN file")]
struct Args {
    /// Input file path to read
    #[arg(long, short = 'i', env = "DBN_FILE")]
    input: PathBuf,

    /// Index of the first record to print
    #[arg(long, default_value_t = 0)]
    start: usize,

    /// Number of records to print
    #[arg(long, env = "DBN_LIMIT", default_value_t = 20)]
    limit: usize,

    /// Memory-map the file instead of reading it
    #[arg(long, default_value_t = false)]
    mmap: bool,
}

fn format_ts(ns: u64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ns))
        .ok()
        .and_then(|t| t.format(&Rfc3339).ok())
        .unwrap_or_else(|| ns.to_string())
}

/// First index and number of records to print, clamped to the file.
fn shown_range(start: usize, limit: usize, record_count: usize) -> (usize, usize) {
    let start = start.min(record_count);
    (start, limit.min(record_count - start))
}

fn print_record(index: usize, r: &MboMsg) {
    let action = r.action().map(char::from).unwrap_or('?');
    let side = r.side().map(char::from).unwrap_or('?');
    println!(
        "#{index:<8} ts={} inst={} {action}{side} px={:.9} sz={} oid={} seq={} ch={} flags={:#04x}",
        format_ts(r.ts_event),
        r.instrument_id,
        r.price_f64(),
        r.size,
        r.order_id,
        r.sequence,
        r.channel_id,
        r.flags,
    );
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dbn_reader=info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut file = DbnFile::new(&args.input);
    let loaded = if args.mmap { file.load_mapped() } else { file.load_buffered() };
    loaded.with_context(|| format!("open {:?}", args.input))?;
    let (start, count) = shown_range(args.start, args.limit, file.record_count());

    if start == 0 {
        // Whole-file order; stop once `limit` records have been shown.
        let mut index = 0;
        file.try_scan(|r: &MboMsg| -> Result<ControlFlow<()>> {
            if index >= count {
                return Ok(ControlFlow::Break(()));
            }
            print_record(index, r);
            index += 1;
            Ok(ControlFlow::Continue(()))
        })?;
    } else {
        for (i, r) in file.batch::<MboMsg>(start, count)?.iter().enumerate() {
            print_record(start + i, r);
        }
    }
    eprintln!("{} records in file, {} shown.", file.record_count(), count);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_is_clamped_to_record_count() {
        assert_eq!(shown_range(0, 20, 100), (0, 20));
        assert_eq!(shown_range(95, 20, 100), (95, 5));
        assert_eq!(shown_range(100, 20, 100), (100, 0));
        assert_eq!(shown_range(500, 20, 100), (100, 0));
        assert_eq!(shown_range(3, 20, 0), (0, 0));
    }

    #[test]
    fn start_past_the_end_shows_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.dbn");
        let mut bytes = vec![0u8; 200];
        bytes.extend_from_slice(&[0u8; 48 * 3]);
        std::fs::write(&path, &bytes).unwrap();
        let mut file = DbnFile::new(&path);
        file.load_buffered().unwrap();
        let (start, count) = shown_range(10, 20, file.record_count());
        assert!(file.batch::<MboMsg>(start, count).unwrap().is_empty());
    }
}
