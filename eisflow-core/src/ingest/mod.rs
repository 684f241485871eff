//! CSV ingestion stream for EIS measurement files
//!
//! Produces a sequential stream of [`Sample`]s from a measurement CSV.
//! Malformed or empty lines are diverted to a rejects log with the reason
//! and the raw line, and the stream continues; a bad line never terminates
//! ingestion. The read loop is iterative, so a file of nothing but bad
//! lines costs no stack depth.
//!
//! A header line is recognized on the first row (a `freq`-ish first column
//! or a non-numeric first field) and skipped without counting as a data
//! row.

pub mod discovery;

pub use discovery::{count_data_rows, discover_measurement_files, MeasurementFile};

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use thiserror_no_std::Error;

use crate::sample::Sample;
use crate::time::{SystemClock, TimeSource};

const REJECTS_HEADER: &str = "RowIndex,Reason,RawLine";

/// Ingestion failure. Data problems never surface here; they become
/// reject records and the stream continues.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Underlying I/O failure on the source or the rejects log.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Counters maintained by [`SampleStream`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StreamStats {
    /// Samples successfully parsed.
    pub accepted: usize,
    /// Lines diverted to the rejects log.
    pub rejected: usize,
    /// Total lines consumed, header included.
    pub lines: usize,
}

/// Sequential, restartable-per-file stream of measurement samples.
pub struct SampleStream<R: BufRead, W: Write> {
    reader: R,
    rejects: W,
    clock: Box<dyn TimeSource>,
    row_index: i64,
    header_checked: bool,
    stats: StreamStats,
}

impl SampleStream<BufReader<File>, BufWriter<File>> {
    /// Open a measurement CSV with a rejects log beside it.
    pub fn open(csv: &Path, rejects: &Path) -> Result<Self, IngestError> {
        if let Some(parent) = rejects.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::new(
            BufReader::new(File::open(csv)?),
            BufWriter::new(File::create(rejects)?),
        )
    }
}

impl<R: BufRead, W: Write> SampleStream<R, W> {
    /// Stream over `reader`, diverting rejects into `rejects`.
    pub fn new(reader: R, rejects: W) -> Result<Self, IngestError> {
        Self::with_clock(reader, rejects, Box::new(SystemClock))
    }

    /// Stream with an explicit time source for sample timestamps.
    pub fn with_clock(
        reader: R,
        mut rejects: W,
        clock: Box<dyn TimeSource>,
    ) -> Result<Self, IngestError> {
        writeln!(rejects, "{REJECTS_HEADER}")?;
        Ok(Self {
            reader,
            rejects,
            clock,
            row_index: 0,
            header_checked: false,
            stats: StreamStats::default(),
        })
    }

    /// Counters so far.
    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    /// Next accepted sample, or `None` at end of file.
    pub fn next_sample(&mut self) -> Result<Option<Sample>, IngestError> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                self.rejects.flush()?;
                return Ok(None);
            }
            self.stats.lines += 1;
            let trimmed = line.trim_end_matches(['\r', '\n']);

            if !self.header_checked {
                self.header_checked = true;
                if is_header_line(trimmed) {
                    log::debug!("skipped header: {trimmed}");
                    continue;
                }
            }

            self.row_index += 1;

            if trimmed.trim().is_empty() {
                self.divert("Empty line", trimmed)?;
                continue;
            }

            match Sample::parse_csv(trimmed, self.row_index, self.clock.now()) {
                Ok(sample) => {
                    self.stats.accepted += 1;
                    return Ok(Some(sample));
                }
                Err(error) => {
                    self.divert(&error.to_string(), trimmed)?;
                }
            }
        }
    }

    fn divert(&mut self, reason: &str, raw: &str) -> Result<(), IngestError> {
        self.stats.rejected += 1;
        writeln!(
            self.rejects,
            "{},{},\"{}\"",
            self.row_index,
            reason.replace(',', ";"),
            raw
        )?;
        Ok(())
    }
}

/// Whether a first line looks like a column header rather than data.
fn is_header_line(line: &str) -> bool {
    if line.trim().is_empty() {
        return false;
    }

    let mut fields = line.split([',', ';', '\t']);
    let first = match fields.next() {
        Some(first) => first.trim(),
        None => return false,
    };
    if fields.count() + 1 < crate::sample::MIN_CSV_FIELDS {
        return false;
    }

    if first.to_lowercase().contains("freq") {
        return true;
    }

    first.parse::<f64>().is_err()
}
