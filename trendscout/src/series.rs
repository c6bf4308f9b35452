use crate::error::TrendsError;
use crate::region::RegionCode;
use crate::window::TimeWindow;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;

/// A single completed bucket of relative interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InterestPoint {
    /// Start of the bucket.
    pub timestamp: DateTime<Utc>,
    /// Relative interest in `0..=100`.
    pub score: u8,
}

impl InterestPoint {
    /// Create a point, clamping the score to 100.
    pub fn new(timestamp: DateTime<Utc>, score: u8) -> Self {
        Self {
            timestamp,
            score: score.min(100),
        }
    }
}

/// Interest over time for one keyword. Never contains the provisional trailing point.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct InterestSeries {
    /// The keyword as requested.
    pub keyword: String,
    /// Region of the query.
    pub region: RegionCode,
    /// Window of the query.
    pub window: TimeWindow,
    /// Points ordered by timestamp.
    pub points: Vec<InterestPoint>,
}

impl InterestSeries {
    /// Create an empty series.
    pub fn new(keyword: impl Into<String>, region: RegionCode, window: TimeWindow) -> Self {
        Self {
            keyword: keyword.into(),
            region,
            window,
            points: Vec::new(),
        }
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// No points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The scores in time order.
    pub fn scores(&self) -> impl Iterator<Item = u8> + '_ {
        self.points.iter().map(|p| p.score)
    }

    /// Highest score in the series.
    pub fn peak(&self) -> Option<u8> {
        self.scores().max()
    }

    /// Mean score.
    pub fn mean(&self) -> Option<f64> {
        if self.points.is_empty() {
            None
        } else {
            Some(self.scores().map(f64::from).sum::<f64>() / self.points.len() as f64)
        }
    }

    /// Latest completed score.
    pub fn latest(&self) -> Option<u8> {
        self.points.last().map(|p| p.score)
    }
}

/// A batch whose keywords are missing from the table.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BatchFailure {
    /// Keywords of the failed batch.
    pub keywords: Vec<String>,
    /// Why it failed.
    pub error: TrendsError,
}

/// How an aggregation run ended.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    #[strum(serialize = "complete")]
    /// Every batch was attempted.
    Complete,
    #[strum(serialize = "cancelled")]
    /// The caller cancelled before all batches ran.
    Cancelled,
    #[strum(serialize = "budget exceeded")]
    /// The wall-clock budget ran out before all batches ran.
    BudgetExceeded,
}

/// Keyword to series mapping built by one aggregation run.
///
/// Series from different batches share no common scale: the upstream normalizes
/// scores only within one joint request. Compare their shapes, not magnitudes.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrendTable {
    columns: IndexMap<String, InterestSeries>,
    /// Keyword groups in dispatch order, as they were sent upstream.
    pub batches: Vec<Vec<String>>,
    /// Keywords whose batch succeeded without data for them.
    pub no_data: Vec<String>,
    /// Batches that failed after the transport gave up.
    pub failures: Vec<BatchFailure>,
    /// How the run ended.
    pub status: RunStatus,
}

impl TrendTable {
    /// An empty, complete table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a series, replacing any previous series for the same keyword.
    pub fn insert(&mut self, series: InterestSeries) -> Option<InterestSeries> {
        self.columns.insert(series.keyword.clone(), series)
    }

    /// Merge a batch worth of series.
    pub fn merge(&mut self, series: impl IntoIterator<Item = InterestSeries>) {
        for s in series {
            self.insert(s);
        }
    }

    /// Series for a keyword.
    pub fn get(&self, keyword: &str) -> Option<&InterestSeries> {
        self.columns.get(keyword)
    }

    /// Has a column for the keyword.
    pub fn contains(&self, keyword: &str) -> bool {
        self.columns.contains_key(keyword)
    }

    /// Column names in insertion order.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    /// Columns in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &InterestSeries> {
        self.columns.values()
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// No columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Some batch failed.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// The run finished, nothing failed, and nothing had data.
    pub fn is_no_data(&self) -> bool {
        self.is_empty() && !self.has_failures() && self.status == RunStatus::Complete
    }

    /// Columns came from more than one upstream request, so their magnitudes differ in scale.
    pub fn spans_batches(&self) -> bool {
        self.batches
            .iter()
            .filter(|batch| batch.iter().any(|k| self.contains(k)))
            .count()
            > 1
    }

    /// Distinct timestamps across all columns, sorted.
    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        let mut stamps: Vec<_> = self
            .columns
            .values()
            .flat_map(|s| s.points.iter().map(|p| p.timestamp))
            .collect();
        stamps.sort_unstable();
        stamps.dedup();
        stamps
    }

    /// Row-wise view aligned on [`TrendTable::timestamps`], `None` where a column has no bucket.
    pub fn rows(&self) -> Vec<(DateTime<Utc>, Vec<Option<u8>>)> {
        self.timestamps()
            .into_iter()
            .map(|ts| {
                let cells = self
                    .columns
                    .values()
                    .map(|s| score_at(&s.points, ts))
                    .collect();
                (ts, cells)
            })
            .collect()
    }
}

/// Score of the bucket starting at `ts` in time ordered points.
fn score_at(points: &[InterestPoint], ts: DateTime<Utc>) -> Option<u8> {
    points
        .binary_search_by_key(&ts, |p| p.timestamp)
        .ok()
        .map(|i| points[i].score)
}
