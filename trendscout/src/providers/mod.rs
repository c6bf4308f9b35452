//! Upstream trend providers.
//!
//! A provider turns one validated batch into raw timeline rows. Retries,
//! pacing and merging live above it, so an implementation only has to speak
//! the upstream protocol.

/// Google Trends web API.
pub mod google;

pub use google::GoogleTrends;

use crate::acquisition::KeywordBatch;
use crate::client::Client;
use crate::error::TrendsError;
use crate::region::RegionCode;
use crate::window::TimeWindow;
use chrono::{DateTime, Utc};

/// Trait for interest-over-time providers.
pub trait TrendsProvider: Send + Sync {
    /// Query relative interest for the batch, normalized jointly across its keywords.
    ///
    /// An upstream that knows nothing about the keywords returns an empty
    /// timeline, not an error.
    fn interest_over_time(
        &self,
        batch: &KeywordBatch,
        region: &RegionCode,
        window: TimeWindow,
        client: &Client,
    ) -> impl std::future::Future<Output = Result<Timeline, TrendsError>> + Send;

    /// Provider name for logging/debugging.
    fn provider_name(&self) -> &'static str;

    /// Upstream requests issued per batch, used for time estimates.
    fn requests_per_batch(&self) -> u32 {
        1
    }
}

/// Raw rows for one batch, columns in the order of [`Timeline::keywords`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    /// Column names.
    pub keywords: Vec<String>,
    /// Rows in time order.
    pub rows: Vec<TimelineRow>,
}

impl Timeline {
    /// An empty timeline for the keywords.
    pub fn empty(keywords: Vec<String>) -> Self {
        Self {
            keywords,
            rows: Vec::new(),
        }
    }

    /// No rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One time bucket across all columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineRow {
    /// Start of the bucket.
    pub timestamp: DateTime<Utc>,
    /// Score per column.
    pub values: Vec<u8>,
    /// Whether the upstream had data per column.
    pub has_data: Vec<bool>,
    /// The bucket is still open and its values may change.
    pub is_partial: bool,
}

impl TimelineRow {
    /// Score for column `idx` when the upstream had data for it.
    pub fn value(&self, idx: usize) -> Option<u8> {
        let has_data = self.has_data.get(idx).copied().unwrap_or(true);
        if has_data {
            self.values.get(idx).copied()
        } else {
            None
        }
    }
}
