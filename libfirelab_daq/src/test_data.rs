//! Reading of the per-test CSV files written by the acquisition program.
//!
//! Each file starts with a short preamble, followed by one row per sample:
//!
//! ```csv
//! Test Name,Test_12
//! Engineer,
//! Location,
//! Test Info,
//!
//!
//! Time,TC_A1,HF_1,O2_1,Event
//! 2023-05-04 13:01:59,21.4,0.0012,4.12,
//! 2023-05-04 13:02:00,21.5,0.0013,4.12,Ignition
//! ```
//!
//! Time is converted to whole seconds relative to the ignition event.
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::{PrimitiveDateTime, Time};

use super::error::TestDataError;

/// Number of lines before the column header
pub const PREAMBLE_LINES: usize = 6;
pub const TIME_COLUMN: &str = "Time";
pub const EVENT_COLUMN: &str = "Event";
pub const IGNITION_EVENT: &str = "Ignition";

/// The samples of a single test
#[derive(Debug, Clone, PartialEq)]
pub struct TestData {
    pub test_name: String,
    /// Seconds relative to the last ignition event
    pub time: Vec<i64>,
    pub events: Vec<Option<String>>,
    channel_names: Vec<String>,
    columns: Vec<Vec<Option<f64>>>,
}

/// Parse a timestamp into seconds. Full timestamps count from the unix epoch, bare
/// times of day from midnight
fn parse_timestamp(value: &str) -> Option<i64> {
    let datetime_format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let time_format = format_description!("[hour]:[minute]:[second]");
    let value = value.trim();
    if let Ok(datetime) = PrimitiveDateTime::parse(value, datetime_format) {
        return Some(datetime.assume_utc().unix_timestamp());
    }
    // Some exports carry fractional seconds; the time base is whole seconds
    let whole = value.split('.').next().unwrap_or(value);
    if let Ok(datetime) = PrimitiveDateTime::parse(whole, datetime_format) {
        return Some(datetime.assume_utc().unix_timestamp());
    }
    Time::parse(whole, time_format).ok().map(|t| {
        let (hh, mm, ss) = t.as_hms();
        3600 * hh as i64 + 60 * mm as i64 + ss as i64
    })
}

impl TestData {
    /// Read a test data file. The test name is taken from the preamble, falling back to the
    /// file name
    pub fn read(path: &Path) -> Result<Self, TestDataError> {
        let file = File::open(path)?;
        let fallback = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        Self::from_reader(file, path, &fallback)
    }

    /// Read test data from any reader. `source` is only used for error messages
    pub fn from_reader<R: Read>(
        reader: R,
        source: &Path,
        fallback_name: &str,
    ) -> Result<Self, TestDataError> {
        let mut reader = BufReader::new(reader);
        let mut test_name = String::from(fallback_name);
        let mut line = String::new();
        for idx in 0..PREAMBLE_LINES {
            line.clear();
            reader.read_line(&mut line)?;
            if idx == 0 {
                if let Some(("Test Name", name)) = line.trim().split_once(',') {
                    if !name.trim().is_empty() {
                        test_name = name.trim().to_string();
                    }
                }
            }
        }

        let csv_error = |e: csv::Error| TestDataError::Csv {
            path: PathBuf::from(source),
            source: e,
        };
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = rdr.headers().map_err(csv_error)?.clone();

        let time_idx = headers
            .iter()
            .position(|h| h == TIME_COLUMN)
            .ok_or(TestDataError::MissingColumn {
                path: source.to_path_buf(),
                column: TIME_COLUMN,
            })?;
        let event_idx = headers.iter().position(|h| h == EVENT_COLUMN);
        let channel_idxs: Vec<usize> = (0..headers.len())
            .filter(|idx| *idx != time_idx && Some(*idx) != event_idx)
            .filter(|idx| !headers[*idx].is_empty())
            .collect();

        let mut timestamps: Vec<i64> = Vec::new();
        let mut events: Vec<Option<String>> = Vec::new();
        let mut columns: Vec<Vec<Option<f64>>> = vec![Vec::new(); channel_idxs.len()];
        // Line number of the column header: the preamble plus one
        let line_offset = PREAMBLE_LINES as u64;

        for result in rdr.records() {
            let record = result.map_err(csv_error)?;
            let line = record.position().map(|p| p.line()).unwrap_or_default() + line_offset;
            let stamp = record.get(time_idx).unwrap_or_default();
            if stamp.is_empty() {
                // Trailing blank rows
                continue;
            }
            let seconds = parse_timestamp(stamp).ok_or_else(|| TestDataError::BadTimestamp {
                path: source.to_path_buf(),
                line,
                value: stamp.to_string(),
            })?;
            timestamps.push(seconds);

            events.push(
                event_idx
                    .and_then(|idx| record.get(idx))
                    .filter(|e| !e.is_empty())
                    .map(String::from),
            );

            for (column, idx) in columns.iter_mut().zip(channel_idxs.iter()) {
                let raw = record.get(*idx).unwrap_or_default();
                if raw.is_empty() {
                    column.push(None);
                    continue;
                }
                match raw.parse::<f64>() {
                    Ok(value) if value.is_nan() => column.push(None),
                    Ok(value) => column.push(Some(value)),
                    Err(_) => {
                        return Err(TestDataError::BadValue {
                            path: source.to_path_buf(),
                            line,
                            column: headers[*idx].to_string(),
                            value: raw.to_string(),
                        })
                    }
                }
            }
        }

        let ignition = timestamps
            .iter()
            .zip(events.iter())
            .filter(|(_, e)| e.as_deref() == Some(IGNITION_EVENT))
            .map(|(t, _)| *t)
            .last()
            .ok_or_else(|| TestDataError::NoIgnition(source.to_path_buf()))?;

        Ok(Self {
            test_name,
            time: timestamps.iter().map(|t| t - ignition).collect(),
            events,
            channel_names: channel_idxs.iter().map(|idx| headers[*idx].to_string()).collect(),
            columns,
        })
    }

    pub fn channel_names(&self) -> &[String] {
        &self.channel_names
    }

    /// Samples of a channel, aligned with `time`
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.channel_names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.columns[idx].as_slice())
    }

    /// The (time, event) pairs of the test
    pub fn event_times(&self) -> impl Iterator<Item = (i64, &str)> {
        self.time
            .iter()
            .zip(self.events.iter())
            .filter_map(|(t, e)| e.as_deref().map(|e| (*t, e)))
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}
