use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dbn_reader::{measure, DbnFile, LoadMode, MboMsg, ParseStats, DEFAULT_BATCH_SIZE};
use dotenvy::dotenv;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Buffered,
    Mapped,
}

impl From<Mode> for LoadMode {
    fn from(m: Mode) -> LoadMode {
        match m {
            Mode::Buffered => LoadMode::Buffered,
            Mode::Mapped => LoadMode::Mapped,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
enum Method {
    Direct,
    Callback,
    Batch,
    All,
}

#[derive(Debug, Parser)]
#[command(version, about = "Time the access paths over a DBN MBO file")]
struct Args {
    /// DBN file to read
    #[arg(env = "DBN_FILE")]
    input: PathBuf,

    /// How the file is brought into memory
    #[arg(long, env = "DBN_LOAD_MODE", value_enum, default_value_t = Mode::Mapped)]
    mode: Mode,

    /// Access path(s) to time
    #[arg(long, env = "DBN_METHOD", value_enum, default_value_t = Method::All)]
    method: Method,

    /// Records per batch for the batch method
    #[arg(long, env = "DBN_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,
}

/// Folded over each pass so the work is observable.
fn fold(acc: u64, r: &MboMsg) -> u64 { acc ^ r.ts_event ^ u64::from(r.instrument_id) }

fn report(name: &str, stats: &ParseStats, checksum: u64) {
    println!("[{name}] checksum {checksum:#x}");
    println!("{stats}");
}

fn main() -> Result<()> {
    let _ = dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dbn_reader=info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut file = DbnFile::new(&args.input);
    let t0 = Instant::now();
    file.load(args.mode.into()).with_context(|| format!("load {:?}", args.input))?;
    info!(
        records = file.record_count(),
        bytes = file.total_length(),
        load_secs = t0.elapsed().as_secs_f64(),
        mode = ?args.mode,
        "file loaded"
    );

    let width = file.record_width();
    let run = |m: Method| args.method == Method::All || args.method == m;

    if run(Method::Direct) {
        let mut checksum = 0u64;
        let stats = measure(width, || -> Result<usize> {
            for i in 0..file.record_count() {
                checksum = fold(checksum, &file.record_at::<MboMsg>(i)?);
            }
            Ok(file.record_count())
        })?;
        report("direct", &stats, checksum);
    }

    if run(Method::Callback) {
        let mut checksum = 0u64;
        let stats = measure(width, || file.scan(|r: &MboMsg| checksum = fold(checksum, r)))?;
        report("callback", &stats, checksum);
    }

    if run(Method::Batch) {
        let mut checksum = 0u64;
        let batch_size = args.batch_size;
        let stats = measure(width, || {
            file.for_each_batch(batch_size, |batch: Vec<MboMsg>| {
                checksum = batch.iter().fold(checksum, fold);
            })
        })
        .context("batch pass")?;
        report("batch", &stats, checksum);
    }

    Ok(())
}
