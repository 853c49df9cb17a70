//! Transaction loading and normalization using Polars

use std::cmp::Ordering;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use itertools::izip;
use polars::prelude::*;
use tracing::{debug, warn};

use crate::config::ColumnNames;
use crate::error::{AffinityError, Result};

/// Formats tried, in order, after RFC 3339 for naive timestamps
const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

/// Product identifier with a canonical total order.
///
/// Identifiers that parse as integers sort numerically ahead of all others,
/// which sort lexically. Equal numeric values fall back to the raw text, so
/// `"7"` and `"007"` stay distinct products.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductId {
    raw: String,
    numeric: Option<i64>,
}

impl ProductId {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let numeric = raw.parse().ok();
        Self { raw, numeric }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Ord for ProductId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric, other.numeric) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.raw.cmp(&other.raw)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.raw.cmp(&other.raw),
        }
    }
}

impl PartialOrd for ProductId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for ProductId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ProductId {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

/// Outcome of parsing a single time value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedTime {
    At(NaiveDateTime),
    Unknown,
}

impl ParsedTime {
    pub fn is_known(&self) -> bool {
        matches!(self, ParsedTime::At(_))
    }
}

/// Parse a timestamp, never failing. Offsets are normalized to UTC.
pub fn parse_time(raw: &str) -> ParsedTime {
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return ParsedTime::At(parsed.naive_utc());
    }
    if let Ok(parsed) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return ParsedTime::At(parsed.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return ParsedTime::At(parsed);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map_or(ParsedTime::Unknown, ParsedTime::At)
}

/// One input row before validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub invoice: Option<String>,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub time: Option<String>,
}

impl RawRow {
    pub fn new(invoice: &str, product_id: &str, product_name: &str) -> Self {
        Self {
            invoice: Some(invoice.to_string()),
            product_id: Some(product_id.to_string()),
            product_name: Some(product_name.to_string()),
            time: None,
        }
    }

    pub fn with_time(mut self, time: &str) -> Self {
        self.time = Some(time.to_string());
        self
    }
}

/// A validated line item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub invoice: String,
    pub product_id: ProductId,
    pub product_name: Option<String>,
    pub timestamp: ParsedTime,
}

/// How the time column fared across the whole input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeColumnStatus {
    /// Every present value parsed
    Parsed,
    /// Some present values did not parse and were left unknown
    Partial { unparsed: usize },
    /// Values were present but none parsed; all timestamps are unknown
    Failed,
    /// No time values at all
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeReport {
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub time_status: TimeColumnStatus,
}

/// Normalized records together with what normalization did to the input
#[derive(Debug, Clone)]
pub struct Normalized {
    pub records: Vec<TransactionRecord>,
    pub report: NormalizeReport,
}

/// Validate raw rows into transaction records.
///
/// Rows without an invoice or product id are dropped; a missing product name
/// is kept. Time values that fail to parse become [`ParsedTime::Unknown`].
pub fn normalize<I>(rows: I) -> Normalized
where
    I: IntoIterator<Item = RawRow>,
{
    let mut records = Vec::new();
    let mut rows_read = 0;
    let mut rows_dropped = 0;
    let mut time_values = 0;
    let mut time_parsed = 0;

    for row in rows {
        rows_read += 1;

        let (Some(invoice), Some(product_id)) = (clean(row.invoice), clean(row.product_id)) else {
            rows_dropped += 1;
            continue;
        };

        let timestamp = match clean(row.time) {
            Some(raw) => {
                time_values += 1;
                let parsed = parse_time(&raw);
                if parsed.is_known() {
                    time_parsed += 1;
                }
                parsed
            }
            None => ParsedTime::Unknown,
        };

        records.push(TransactionRecord {
            invoice,
            product_id: ProductId::new(product_id),
            product_name: clean(row.product_name),
            timestamp,
        });
    }

    let time_status = match (time_values, time_parsed) {
        (0, _) => TimeColumnStatus::Absent,
        (_, 0) => {
            warn!(
                values = time_values,
                "time column contains invalid or inconsistent formats, proceeding without timestamps"
            );
            TimeColumnStatus::Failed
        }
        (values, parsed) if values == parsed => TimeColumnStatus::Parsed,
        (values, parsed) => {
            debug!(unparsed = values - parsed, "some time values could not be parsed");
            TimeColumnStatus::Partial {
                unparsed: values - parsed,
            }
        }
    };

    debug!(rows_read, rows_dropped, "normalized transaction rows");

    Normalized {
        records,
        report: NormalizeReport {
            rows_read,
            rows_dropped,
            time_status,
        },
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read a transaction CSV with every column kept as text
pub fn load_transactions(file_path: impl AsRef<Path>) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(file_path.as_ref().to_path_buf()))?
        .finish()?;
    Ok(df)
}

/// Extract raw rows from a frame.
///
/// The invoice, product id and product name columns are required; the time
/// column is optional.
pub fn rows_from_frame(df: &DataFrame, columns: &ColumnNames) -> Result<Vec<RawRow>> {
    let invoices = required_column(df, &columns.invoice)?;
    let product_ids = required_column(df, &columns.product_id)?;
    let product_names = required_column(df, &columns.product_name)?;
    let times = match df.column(&columns.time) {
        Ok(series) => string_values(series)?,
        Err(_) => vec![None; df.height()],
    };

    let rows = izip!(invoices, product_ids, product_names, times)
        .map(|(invoice, product_id, product_name, time)| RawRow {
            invoice,
            product_id,
            product_name,
            time,
        })
        .collect();
    Ok(rows)
}

fn required_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df
        .column(name)
        .map_err(|_| AffinityError::MissingField(name.to_string()))?;
    string_values(series)
}

fn string_values(series: &Series) -> Result<Vec<Option<String>>> {
    let strings = series.cast(&DataType::String)?;
    let values = strings
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_owned))
        .collect();
    Ok(values)
}

/// Load a CSV file and normalize it into transaction records
pub fn load_records(file_path: impl AsRef<Path>, columns: &ColumnNames) -> Result<Normalized> {
    let df = load_transactions(file_path)?;
    let rows = rows_from_frame(&df, columns)?;
    Ok(normalize(rows))
}

/// Inclusive date range applied to records before counting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    since: Option<NaiveDate>,
    until: Option<NaiveDate>,
}

impl TimeWindow {
    pub fn new(since: Option<NaiveDate>, until: Option<NaiveDate>) -> Result<Self> {
        if let (Some(start), Some(end)) = (since, until) {
            if start > end {
                return Err(AffinityError::InvalidConfig(format!(
                    "window start {start} is after window end {end}"
                )));
            }
        }
        Ok(Self { since, until })
    }

    pub fn is_unbounded(&self) -> bool {
        self.since.is_none() && self.until.is_none()
    }

    /// Unknown timestamps fall outside any bounded window.
    pub fn contains(&self, timestamp: &ParsedTime) -> bool {
        if self.is_unbounded() {
            return true;
        }
        match timestamp {
            ParsedTime::Unknown => false,
            ParsedTime::At(at) => {
                let date = at.date();
                self.since.map_or(true, |start| date >= start)
                    && self.until.map_or(true, |end| date <= end)
            }
        }
    }
}

pub fn filter_by_window(
    records: Vec<TransactionRecord>,
    window: &TimeWindow,
) -> Vec<TransactionRecord> {
    if window.is_unbounded() {
        return records;
    }
    let before = records.len();
    let kept: Vec<_> = records
        .into_iter()
        .filter(|record| window.contains(&record.timestamp))
        .collect();
    debug!(before, after = kept.len(), "applied time window");
    kept
}
