//! CSV status log
//!
//! Append-only CSV file of sampled readings. The column order and the
//! empty-string-for-unknown convention are part of the persisted contract:
//! `timestamp,current_temperature,target_temperature,output_value` with
//! ISO-8601 timestamps and values formatted to one decimal place.

use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use super::{StatusRecord, StatusSink};

const HEADER: &str = "timestamp,current_temperature,target_temperature,output_value";

/// Appender/reader for the status CSV file.
pub struct CsvStatusLog {
    path: PathBuf,
}

impl CsvStatusLog {
    /// Open the log at `path`, creating parent directories and writing the
    /// header if the file is missing or empty.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let needs_header = match std::fs::metadata(&path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };
        if needs_header {
            let mut writer = BufWriter::new(File::create(&path)?);
            writeln!(writer, "{HEADER}")?;
            writer.flush()?;
        }

        Ok(Self { path })
    }

    /// The log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the last `count` records (all of them when `count` is 0).
    ///
    /// Rows that fail to parse are skipped rather than failing the whole
    /// read; an empty field is a value that was unknown at sample time.
    pub fn read_last(&self, count: usize) -> io::Result<Vec<StatusRecord>> {
        let reader = BufReader::new(File::open(&self.path)?);
        let mut records = Vec::new();

        for line in reader.lines().skip(1) {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            match parse_row(&line) {
                Some(record) => records.push(record),
                None => warn!(row = %line, "skipping unparseable log row"),
            }
        }

        if count > 0 && records.len() > count {
            records.drain(..records.len() - count);
        }
        Ok(records)
    }
}

impl StatusSink for CsvStatusLog {
    fn append(&self, record: &StatusRecord) -> io::Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(
            file,
            "{},{},{},{}",
            record.timestamp.to_rfc3339(),
            format_field(record.current_temperature),
            format_field(record.target_temperature),
            format_field(record.output_value),
        )
    }
}

fn format_field(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.1}"),
        None => String::new(),
    }
}

fn parse_field(field: &str) -> Option<f64> {
    if field.is_empty() {
        return None;
    }
    field.parse().ok()
}

fn parse_row(line: &str) -> Option<StatusRecord> {
    let mut fields = line.split(',');
    let timestamp = DateTime::parse_from_rfc3339(fields.next()?)
        .ok()?
        .with_timezone(&Local);
    let current_temperature = parse_field(fields.next()?);
    let target_temperature = parse_field(fields.next()?);
    let output_value = parse_field(fields.next()?);
    Some(StatusRecord {
        timestamp,
        current_temperature,
        target_temperature,
        output_value,
    })
}
