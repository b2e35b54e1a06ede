//! Timing of a single full pass over a file.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

const GIB: f64 = (1u64 << 30) as f64;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParseStats {
    pub total_records: u64,
    pub elapsed: Duration,
    pub records_per_second: f64,
    pub bytes_per_second: f64,
}

impl ParseStats {
    /// Derive rates from a record count and wall time. A zero duration
    /// yields zero rates.
    pub fn new(total_records: u64, record_width: usize, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        let (records_per_second, bytes_per_second) = if secs > 0.0 {
            let rate = total_records as f64 / secs;
            (rate, rate * record_width as f64)
        } else {
            (0.0, 0.0)
        };
        ParseStats { total_records, elapsed, records_per_second, bytes_per_second }
    }

    pub fn elapsed_seconds(&self) -> f64 { self.elapsed.as_secs_f64() }

    pub fn throughput_gbps(&self) -> f64 { self.bytes_per_second / GIB }
}

impl fmt::Display for ParseStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(70);
        writeln!(f, "{rule}")?;
        writeln!(f, "Parse Statistics")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Total records:  {}", self.total_records)?;
        writeln!(f, "Elapsed time:   {:.6} seconds", self.elapsed_seconds())?;
        writeln!(f, "Records/sec:    {:.0} rec/s", self.records_per_second)?;
        writeln!(f, "Throughput:     {:.2} GB/s", self.throughput_gbps())?;
        write!(f, "{rule}")
    }
}

/// Time `op`, which returns the number of records it processed.
pub fn measure<E, F>(record_width: usize, op: F) -> Result<ParseStats, E>
where
    F: FnOnce() -> Result<usize, E>,
{
    let start = Instant::now();
    let n = op()?;
    Ok(ParseStats::new(n as u64, record_width, start.elapsed()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rates_follow_count_and_time() {
        let s = ParseStats::new(1_000, 48, Duration::from_millis(500));
        assert!((s.records_per_second - 2_000.0).abs() < 1e-6);
        assert!((s.bytes_per_second - 96_000.0).abs() < 1e-6);
        assert!((s.elapsed_seconds() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn zero_elapsed_gives_zero_rates() {
        let s = ParseStats::new(10, 48, Duration::ZERO);
        assert_eq!(s.records_per_second, 0.0);
        assert_eq!(s.throughput_gbps(), 0.0);
    }

    #[test]
    fn measure_propagates_errors() {
        let ok: Result<ParseStats, String> = measure(48, || Ok(7));
        assert_eq!(ok.unwrap().total_records, 7);
        let err: Result<ParseStats, String> = measure(48, || Err("boom".to_string()));
        assert_eq!(err.unwrap_err(), "boom");
    }

    #[test]
    fn report_lists_every_figure() {
        let text = ParseStats::new(3, 48, Duration::from_secs(1)).to_string();
        assert!(text.contains("Total records:  3"));
        assert!(text.contains("Records/sec:    3 rec/s"));
        assert!(text.contains("GB/s"));
    }
}
