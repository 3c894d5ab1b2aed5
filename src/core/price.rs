//! Price history abstractions and the adapter from raw provider tables

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

const DATE_MARKERS: [&str; 2] = ["日期", "date"];
const CLOSE_MARKERS: [&str; 2] = ["收盘", "close"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Daily closes for one instrument, strictly increasing by date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Builds a series from unordered points. Points sharing a date collapse
    /// to the one that appears last.
    pub fn from_points(points: impl IntoIterator<Item = PricePoint>) -> Self {
        let by_date: BTreeMap<NaiveDate, f64> =
            points.into_iter().map(|p| (p.date, p.close)).collect();
        Self {
            points: by_date
                .into_iter()
                .map(|(date, close)| PricePoint { date, close })
                .collect(),
        }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }
}

/// Tabular history as returned by a data source: named columns in source
/// order, one row of cells per observation.
#[derive(Debug, Clone, Default)]
pub struct RawHistory {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RawHistory {
    /// Builds a table from row objects keyed by column name. Columns are
    /// taken from the first record, in its key order.
    pub fn from_records(records: Vec<serde_json::Map<String, Value>>) -> Self {
        let columns: Vec<String> = records
            .first()
            .map(|r| r.keys().cloned().collect())
            .unwrap_or_default();
        let rows = records
            .into_iter()
            .map(|mut record| {
                columns
                    .iter()
                    .map(|c| record.remove(c).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum NormalizationError {
    #[error("no date column among {0:?}")]
    MissingDateColumn(Vec<String>),
    #[error("no close column among {0:?}")]
    MissingCloseColumn(Vec<String>),
    #[error("unparseable date in row {row}: {value}")]
    InvalidDate { row: usize, value: String },
    #[error("unparseable close in row {row}: {value}")]
    InvalidClose { row: usize, value: String },
    #[error("need at least {required} rows of history, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },
}

fn find_column(columns: &[String], markers: &[&str]) -> Option<usize> {
    columns.iter().position(|c| {
        let lower = c.to_lowercase();
        markers.iter().any(|m| lower.contains(m))
    })
}

fn parse_date(value: &Value) -> Option<NaiveDate> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    // Drop any time-of-day suffix such as "2024-01-02 00:00:00" or "2024-01-02T00:00:00".
    let day = text.split([' ', 'T']).next().unwrap_or_default();
    ["%Y-%m-%d", "%Y%m%d", "%Y/%m/%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(day, fmt).ok())
}

fn parse_close(value: &Value) -> Option<f64> {
    let close = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    (close.is_finite() && close > 0.0).then_some(close)
}

/// Turns a raw provider table into a canonical price series.
///
/// Column names vary between data source versions, so the date and close
/// columns are located by marker substrings rather than exact labels. The
/// result is sorted ascending with one point per date (last row wins) and must
/// hold at least `min_len` observations.
pub fn normalize_raw_history(
    raw: &RawHistory,
    min_len: usize,
) -> Result<PriceSeries, NormalizationError> {
    let date_idx = find_column(&raw.columns, &DATE_MARKERS)
        .ok_or_else(|| NormalizationError::MissingDateColumn(raw.columns.clone()))?;
    let close_idx = find_column(&raw.columns, &CLOSE_MARKERS)
        .ok_or_else(|| NormalizationError::MissingCloseColumn(raw.columns.clone()))?;

    let mut points = Vec::with_capacity(raw.rows.len());
    for (row, cells) in raw.rows.iter().enumerate() {
        let date_cell = cells.get(date_idx).unwrap_or(&Value::Null);
        let close_cell = cells.get(close_idx).unwrap_or(&Value::Null);
        let date = parse_date(date_cell).ok_or_else(|| NormalizationError::InvalidDate {
            row,
            value: date_cell.to_string(),
        })?;
        let close = parse_close(close_cell).ok_or_else(|| NormalizationError::InvalidClose {
            row,
            value: close_cell.to_string(),
        })?;
        points.push(PricePoint { date, close });
    }

    let series = PriceSeries::from_points(points);
    if series.len() < min_len {
        return Err(NormalizationError::InsufficientHistory {
            required: min_len,
            actual: series.len(),
        });
    }
    Ok(series)
}

#[async_trait]
pub trait PriceHistoryProvider: Send + Sync {
    async fn fetch_daily_history(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawHistory>;
}
