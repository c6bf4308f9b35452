//! One upstream query for at most [`MAX_BATCH_SIZE`] keywords.

use crate::client::{build_client, Client};
use crate::configuration::Configuration;
use crate::error::TrendsError;
use crate::providers::{GoogleTrends, Timeline, TrendsProvider};
use crate::region::RegionCode;
use crate::series::{BatchFailure, InterestPoint, InterestSeries};
use crate::window::TimeWindow;

/// Max keywords the upstream accepts in one comparison.
pub const MAX_BATCH_SIZE: usize = 5;

/// Between one and [`MAX_BATCH_SIZE`] trimmed, non-blank keywords.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeywordBatch {
    keywords: Vec<String>,
}

impl KeywordBatch {
    /// Validate and build a batch. Keywords are trimmed, order is kept.
    pub fn new(keywords: Vec<String>) -> Result<Self, TrendsError> {
        if keywords.is_empty() {
            return Err(TrendsError::invalid("batch is empty"));
        }
        if keywords.len() > MAX_BATCH_SIZE {
            return Err(TrendsError::invalid(format!(
                "batch has {} keywords, the limit is {}",
                keywords.len(),
                MAX_BATCH_SIZE
            )));
        }

        let mut trimmed = Vec::with_capacity(keywords.len());

        for keyword in keywords {
            let keyword = keyword.trim();
            if keyword.is_empty() {
                return Err(TrendsError::invalid("batch contains a blank keyword"));
            }
            trimmed.push(keyword.to_string());
        }

        Ok(Self { keywords: trimmed })
    }

    /// The keywords in request order.
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Number of keywords.
    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    /// Always false for a validated batch.
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Keywords joined for display.
    pub fn label(&self) -> String {
        self.keywords.join(", ")
    }
}

impl TryFrom<Vec<String>> for KeywordBatch {
    type Error = TrendsError;

    fn try_from(keywords: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(keywords)
    }
}

/// Result of one batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// At least one keyword had data. Keywords without data are absent.
    Series(Vec<InterestSeries>),
    /// The upstream answered but had nothing for any keyword.
    NoData,
    /// The batch could not be fetched.
    Failed(BatchFailure),
}

impl BatchOutcome {
    /// The batch produced series.
    pub fn is_series(&self) -> bool {
        matches!(self, Self::Series(_))
    }

    /// The batch failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// The batch had no data.
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData)
    }
}

/// Fetches single batches over the shared transport. Never panics and never
/// surfaces an `Err`: every problem becomes [`BatchOutcome::Failed`].
#[derive(Debug, Clone)]
pub struct AcquisitionClient<P: TrendsProvider = GoogleTrends> {
    provider: P,
    client: Client,
}

impl AcquisitionClient<GoogleTrends> {
    /// Google Trends over a transport built from the configuration.
    pub fn new(config: &Configuration) -> Result<Self, TrendsError> {
        Self::with_provider(GoogleTrends::from_config(config), config)
    }
}

impl<P: TrendsProvider> AcquisitionClient<P> {
    /// A custom provider over a transport built from the configuration.
    pub fn with_provider(provider: P, config: &Configuration) -> Result<Self, TrendsError> {
        Ok(Self::with_client(provider, build_client(config)?))
    }

    /// A custom provider over an existing transport.
    pub fn with_client(provider: P, client: Client) -> Self {
        Self { provider, client }
    }

    /// The provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Validate the keywords as a batch, then fetch it.
    pub async fn fetch(
        &self,
        keywords: Vec<String>,
        region: &RegionCode,
        window: TimeWindow,
    ) -> BatchOutcome {
        match KeywordBatch::new(keywords.clone()) {
            Ok(batch) => self.fetch_batch(&batch, region, window).await,
            Err(error) => {
                log::warn!("rejected batch {:?}: {}", keywords, error);
                BatchOutcome::Failed(BatchFailure { keywords, error })
            }
        }
    }

    /// Fetch interest over time for the batch, with the provisional point removed.
    pub async fn fetch_batch(
        &self,
        batch: &KeywordBatch,
        region: &RegionCode,
        window: TimeWindow,
    ) -> BatchOutcome {
        log::debug!(
            "{} fetching [{}] region={:?} window={}",
            self.provider.provider_name(),
            batch.label(),
            region.as_str(),
            window
        );

        match self
            .provider
            .interest_over_time(batch, region, window, &self.client)
            .await
        {
            Ok(timeline) => {
                let series = extract_series(timeline, region, window);
                if series.is_empty() {
                    BatchOutcome::NoData
                } else {
                    BatchOutcome::Series(series)
                }
            }
            Err(error) => {
                log::warn!("batch [{}] failed: {}", batch.label(), error);
                BatchOutcome::Failed(BatchFailure {
                    keywords: batch.keywords().to_vec(),
                    error,
                })
            }
        }
    }
}

/// One series per column with data, skipping partial rows.
pub fn extract_series(
    timeline: Timeline,
    region: &RegionCode,
    window: TimeWindow,
) -> Vec<InterestSeries> {
    let complete: Vec<_> = timeline.rows.iter().filter(|row| !row.is_partial).collect();

    timeline
        .keywords
        .into_iter()
        .enumerate()
        .filter_map(|(idx, keyword)| {
            let mut points: Vec<InterestPoint> = complete
                .iter()
                .filter_map(|row| row.value(idx).map(|v| InterestPoint::new(row.timestamp, v)))
                .collect();

            if points.is_empty() {
                return None;
            }

            points.sort_by_key(|p| p.timestamp);

            let mut series = InterestSeries::new(keyword, region.clone(), window);
            series.points = points;
            Some(series)
        })
        .collect()
}
