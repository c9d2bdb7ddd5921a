//! Time-series normalization and alignment.
//!
//! The storage layer hands the engine raw `{timestamp, value, price}` rows:
//! possibly unsorted, possibly duplicated, timestamps in epoch seconds or
//! milliseconds. [`Series::from_raw`] turns those into an immutable, strictly
//! increasing UTC series; the rest of this module covers frequency detection,
//! historical window slicing, and aligning two independent series onto a
//! common timestamp index.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{Error, Result};

/// Epoch timestamps above this are treated as milliseconds.
const MILLIS_THRESHOLD: i64 = 10_000_000_000;

/// Tolerance around the modal gap when classifying sampling frequency (±5%).
const GAP_TOLERANCE: f64 = 0.05;

const DAY_SECS: i64 = 86_400;
const HOUR_SECS: i64 = 3_600;

/// A raw input row as persisted by the storage layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RawPoint {
    /// Epoch timestamp in seconds or milliseconds.
    pub timestamp: i64,
    /// Indicator value channel.
    pub value: f64,
    /// Trading price channel.
    pub price: f64,
}

/// A normalized observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    /// UTC instant of the observation.
    pub timestamp: DateTime<Utc>,
    /// Indicator value channel.
    pub value: f64,
    /// Trading price channel.
    pub price: f64,
}

/// Detected sampling frequency of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    #[serde(rename = "1D")]
    Daily,
    #[serde(rename = "1H")]
    Hourly,
}

impl Frequency {
    /// Wire representation (`"1D"` / `"1H"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "1D",
            Frequency::Hourly => "1H",
        }
    }

    /// Number of bars in a year at this frequency, for annualization.
    pub fn periods_per_year(&self) -> f64 {
        match self {
            Frequency::Daily => 365.0,
            Frequency::Hourly => 365.0 * 24.0,
        }
    }
}

/// How two independent series are projected onto a common timestamp index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignMethod {
    /// Keep only timestamps present in both series.
    Intersection,
    /// Project the other series onto this one's index, carrying the most
    /// recent earlier observation forward. Base bars before the other
    /// series' first point are dropped.
    ForwardFill,
}

/// Historical window requested for a backtest, anchored to the most recent
/// observation in the series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HistoryWindow {
    /// The full series.
    All,
    /// The trailing `days` before (and including) the last observation.
    LastDays(i64),
    /// From January 1st of the last observation's year.
    YearToDate,
    /// An explicit inclusive date range.
    Range {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl HistoryWindow {
    /// Parse the wire period labels used by the dashboard
    /// (`"1w"`, `"1m"`, ..., `"10y"`, `"ytd"`, `"all"`).
    pub fn parse(label: &str) -> Option<Self> {
        let window = match label {
            "all" => HistoryWindow::All,
            "ytd" => HistoryWindow::YearToDate,
            "1w" => HistoryWindow::LastDays(7),
            "1m" => HistoryWindow::LastDays(30),
            "3m" => HistoryWindow::LastDays(90),
            "6m" => HistoryWindow::LastDays(180),
            "1y" => HistoryWindow::LastDays(365),
            "2y" => HistoryWindow::LastDays(2 * 365),
            "3y" => HistoryWindow::LastDays(3 * 365),
            "4y" => HistoryWindow::LastDays(4 * 365),
            "5y" => HistoryWindow::LastDays(5 * 365),
            "6y" => HistoryWindow::LastDays(6 * 365),
            "7y" => HistoryWindow::LastDays(7 * 365),
            "8y" => HistoryWindow::LastDays(8 * 365),
            "9y" => HistoryWindow::LastDays(9 * 365),
            "10y" => HistoryWindow::LastDays(10 * 365),
            _ => return None,
        };
        Some(window)
    }
}

/// An ordered time series: strictly increasing timestamps, no duplicates.
/// Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    points: Vec<TimeSeriesPoint>,
}

impl Series {
    /// Build a series from raw storage rows: normalize the epoch unit, sort
    /// ascending, and drop exact-duplicate timestamps keeping the first
    /// occurrence.
    pub fn from_raw(raw: Vec<RawPoint>) -> Result<Self> {
        // The unit is decided once per series from the first sample; mixed
        // units within one upload indicate a corrupt dataset, not a series
        // the engine should quietly repair.
        let millis = raw
            .first()
            .map(|p| p.timestamp.abs() > MILLIS_THRESHOLD)
            .unwrap_or(false);

        let mut points = Vec::with_capacity(raw.len());
        for p in &raw {
            let ts = if millis {
                DateTime::from_timestamp_millis(p.timestamp)
            } else {
                DateTime::from_timestamp(p.timestamp, 0)
            };
            let timestamp = ts.ok_or_else(|| {
                Error::NonMonotonicTimestamp(format!(
                    "timestamp {} is out of range",
                    p.timestamp
                ))
            })?;
            points.push(TimeSeriesPoint {
                timestamp,
                value: p.value,
                price: p.price,
            });
        }

        let before = points.len();
        // Stable sort + dedup keeps the first occurrence of each timestamp.
        points.sort_by_key(|p| p.timestamp);
        points.dedup_by_key(|p| p.timestamp);
        if points.len() < before {
            debug!(
                dropped = before - points.len(),
                "dropped duplicate timestamps"
            );
        }

        Self::from_points(points)
    }

    /// Build a series from already-normalized points, validating the ordering
    /// invariant.
    pub fn from_points(points: Vec<TimeSeriesPoint>) -> Result<Self> {
        if points.len() < 2 {
            return Err(Error::InsufficientData(format!(
                "{} point(s) remain after normalization, need at least 2",
                points.len()
            )));
        }
        for w in points.windows(2) {
            if w[1].timestamp <= w[0].timestamp {
                return Err(Error::NonMonotonicTimestamp(format!(
                    "{} does not advance past {}",
                    w[1].timestamp, w[0].timestamp
                )));
            }
        }
        Ok(Self { points })
    }

    /// Replace both channels, keeping the timestamp index. Lengths must match.
    pub(crate) fn with_channels(&self, values: Vec<f64>, prices: Vec<f64>) -> Series {
        debug_assert_eq!(values.len(), self.points.len());
        debug_assert_eq!(prices.len(), self.points.len());
        let points = self
            .points
            .iter()
            .zip(values.into_iter().zip(prices))
            .map(|(p, (value, price))| TimeSeriesPoint {
                timestamp: p.timestamp,
                value,
                price,
            })
            .collect();
        Series { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[TimeSeriesPoint] {
        &self.points
    }

    /// The indicator value channel as a contiguous vector.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// The trading price channel as a contiguous vector.
    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }

    /// Infer the sampling frequency from the modal gap between consecutive
    /// timestamps. The modal gap must land within ±5% of one day or one hour;
    /// anything else means the cadence is ambiguous and the series is
    /// rejected rather than guessed at.
    pub fn detect_frequency(&self) -> Result<Frequency> {
        let mut counts: HashMap<i64, usize> = HashMap::new();
        for w in self.points.windows(2) {
            let gap = (w[1].timestamp - w[0].timestamp).num_seconds();
            *counts.entry(gap).or_insert(0) += 1;
        }

        // Highest count wins; ties break toward the smaller gap so the
        // result never depends on map iteration order.
        let mut modal: Option<(i64, usize)> = None;
        for (&gap, &count) in &counts {
            modal = match modal {
                Some((g, c)) if count < c || (count == c && gap >= g) => Some((g, c)),
                _ => Some((gap, count)),
            };
        }
        let (gap, count) = modal.ok_or_else(|| {
            Error::InsufficientData("no consecutive gaps to infer frequency from".into())
        })?;

        let within = |target: i64| {
            (gap - target).abs() as f64 <= target as f64 * GAP_TOLERANCE
        };

        let freq = if within(DAY_SECS) {
            Frequency::Daily
        } else if within(HOUR_SECS) {
            Frequency::Hourly
        } else {
            return Err(Error::NonMonotonicTimestamp(format!(
                "modal gap of {gap}s (x{count}) matches neither daily nor hourly cadence"
            )));
        };

        debug!(gap, count, freq = freq.as_str(), "detected sampling frequency");
        Ok(freq)
    }

    /// Slice the series down to the requested historical window.
    pub fn slice_window(&self, window: &HistoryWindow) -> Result<Series> {
        let last = self.points[self.points.len() - 1].timestamp;
        let (start, end) = match window {
            HistoryWindow::All => return Ok(self.clone()),
            HistoryWindow::LastDays(days) => (last - Duration::days(*days), last),
            HistoryWindow::YearToDate => {
                let jan1 = NaiveDate::from_ymd_opt(last.year(), 1, 1)
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|dt| dt.and_utc())
                    .unwrap_or(self.points[0].timestamp);
                (jan1, last)
            }
            HistoryWindow::Range { start, end } => (*start, *end),
        };

        let points: Vec<_> = self
            .points
            .iter()
            .filter(|p| p.timestamp >= start && p.timestamp <= end)
            .copied()
            .collect();
        if points.len() < 2 {
            return Err(Error::InsufficientData(format!(
                "window {window:?} leaves {} point(s)",
                points.len()
            )));
        }
        Ok(Series { points })
    }

    /// Align this series with another onto a common timestamp index.
    ///
    /// Returns the two series re-indexed so that `left.points()[i]` and
    /// `right.points()[i]` share a timestamp for every `i`.
    pub fn align(&self, other: &Series, method: AlignMethod) -> Result<(Series, Series)> {
        let (left, right) = match method {
            AlignMethod::Intersection => {
                let mut left = Vec::new();
                let mut right = Vec::new();
                let (mut i, mut j) = (0, 0);
                while i < self.points.len() && j < other.points.len() {
                    let (a, b) = (self.points[i], other.points[j]);
                    match a.timestamp.cmp(&b.timestamp) {
                        std::cmp::Ordering::Less => i += 1,
                        std::cmp::Ordering::Greater => j += 1,
                        std::cmp::Ordering::Equal => {
                            left.push(a);
                            right.push(b);
                            i += 1;
                            j += 1;
                        }
                    }
                }
                (left, right)
            }
            AlignMethod::ForwardFill => {
                let mut left = Vec::new();
                let mut right = Vec::new();
                let mut j = 0usize;
                for &p in &self.points {
                    while j + 1 < other.points.len()
                        && other.points[j + 1].timestamp <= p.timestamp
                    {
                        j += 1;
                    }
                    // No earlier observation to carry forward yet.
                    if other.points[j].timestamp > p.timestamp {
                        continue;
                    }
                    left.push(p);
                    right.push(TimeSeriesPoint {
                        timestamp: p.timestamp,
                        ..other.points[j]
                    });
                }
                (left, right)
            }
        };

        if left.len() < 2 {
            return Err(Error::InsufficientData(format!(
                "alignment ({method:?}) leaves {} shared point(s)",
                left.len()
            )));
        }
        debug!(bars = left.len(), ?method, "aligned series");
        Ok((Series { points: left }, Series { points: right }))
    }
}
