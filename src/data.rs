//! CSV loaders for historical bars and precomputed signal series.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use core_types::Bar;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct BarRow {
    timestamp: DateTime<Utc>,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
}

#[derive(Debug, Deserialize)]
struct SignalRow {
    signal: i8,
}

/// Loads a bar series from a CSV file with columns
/// `timestamp,open,high,low,close,volume`.
///
/// Timestamps must be strictly increasing; duplicates and out-of-order rows
/// are rejected rather than silently reordered.
pub fn load_bars(path: &Path) -> Result<Vec<Bar>> {
    let file =
        File::open(path).with_context(|| format!("failed to open bar file {}", path.display()))?;
    read_bars(file).with_context(|| format!("invalid bar data in {}", path.display()))
}

fn read_bars<R: Read>(reader: R) -> Result<Vec<Bar>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut bars: Vec<Bar> = Vec::new();

    for (i, row) in csv_reader.deserialize::<BarRow>().enumerate() {
        let row = row.with_context(|| format!("bad bar row {}", i + 1))?;
        let bar = Bar {
            timestamp: row.timestamp,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        };
        if let Some(previous) = bars.last() {
            if bar.timestamp <= previous.timestamp {
                bail!(
                    "bar row {} is not strictly after the previous bar ({} <= {})",
                    i + 1,
                    bar.timestamp,
                    previous.timestamp
                );
            }
        }
        bars.push(bar);
    }

    if bars.is_empty() {
        bail!("bar file contains no rows");
    }
    Ok(bars)
}

/// Loads a signal series from a CSV file with a single `signal` column of
/// values in {-1, 0, 1}.
pub fn load_signals(path: &Path) -> Result<Vec<i8>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open signal file {}", path.display()))?;
    read_signals(file).with_context(|| format!("invalid signal data in {}", path.display()))
}

fn read_signals<R: Read>(reader: R) -> Result<Vec<i8>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut signals = Vec::new();

    for (i, row) in csv_reader.deserialize::<SignalRow>().enumerate() {
        let row = row.with_context(|| format!("bad signal row {}", i + 1))?;
        if !(-1..=1).contains(&row.signal) {
            bail!("signal row {} has value {}, expected -1, 0 or 1", i + 1, row.signal);
        }
        signals.push(row.signal);
    }
    Ok(signals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const BARS: &str = "\
timestamp,open,high,low,close,volume
2024-01-01T00:00:00Z,100,105,99,104,10
2024-01-02T00:00:00Z,104,106,103,105,12
";

    #[test]
    fn bars_parse_in_order() {
        let bars = read_bars(BARS.as_bytes()).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, dec!(104));
        assert_eq!(bars[1].volume, dec!(12));
    }

    #[test]
    fn duplicate_timestamps_are_rejected() {
        let data = "\
timestamp,open,high,low,close,volume
2024-01-01T00:00:00Z,100,105,99,104,10
2024-01-01T00:00:00Z,104,106,103,105,12
";
        assert!(read_bars(data.as_bytes()).is_err());
    }

    #[test]
    fn out_of_order_bars_are_rejected() {
        let data = "\
timestamp,open,high,low,close,volume
2024-01-02T00:00:00Z,104,106,103,105,12
2024-01-01T00:00:00Z,100,105,99,104,10
";
        assert!(read_bars(data.as_bytes()).is_err());
    }

    #[test]
    fn empty_bar_files_are_rejected() {
        let data = "timestamp,open,high,low,close,volume\n";
        assert!(read_bars(data.as_bytes()).is_err());
    }

    #[test]
    fn signals_parse_and_validate() {
        let data = "signal\n1\n0\n-1\n";
        assert_eq!(read_signals(data.as_bytes()).unwrap(), vec![1, 0, -1]);

        let bad = "signal\n1\n2\n";
        assert!(read_signals(bad.as_bytes()).is_err());
    }
}
