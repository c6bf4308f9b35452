//! Merge interest over time for any number of keywords.
//!
//! Keywords are deduplicated, grouped into batches the upstream accepts and
//! fetched one batch at a time with a randomized pause in between. A batch that
//! fails is recorded and skipped; the run keeps going until every batch ran,
//! the caller cancels or the time budget is spent. Whatever was merged by then
//! is returned.

use crate::acquisition::{AcquisitionClient, BatchOutcome, KeywordBatch};
use crate::configuration::Configuration;
use crate::error::TrendsError;
#[cfg(feature = "cache")]
use crate::features::cache::{build_cache, is_cacheable, CacheKey, TrendCache};
use crate::providers::{GoogleTrends, TrendsProvider};
use crate::region::RegionCode;
use crate::series::{BatchFailure, RunStatus, TrendTable};
use crate::utils::keywords::{batch_count, dedupe, partition};
use crate::utils::pacing::{PacingPolicy, Sleeper, TokioSleeper};
use crate::window::TimeWindow;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Observes batch dispatch. Purely informational.
pub trait ProgressSink: Send + Sync {
    /// Called before batch `index` (0 based) of `total` is dispatched.
    fn on_batch(&self, index: usize, total: usize, label: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(usize, usize, &str) + Send + Sync,
{
    fn on_batch(&self, index: usize, total: usize, label: &str) {
        self(index, total, label)
    }
}

/// Logs progress at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn on_batch(&self, index: usize, total: usize, label: &str) {
        log::info!("batch {}/{}: {}", index + 1, total, label);
    }
}

/// Ignores progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_batch(&self, _index: usize, _total: usize, _label: &str) {}
}

/// Why a run stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Cancelled,
    Deadline,
}

impl From<Interrupt> for RunStatus {
    fn from(interrupt: Interrupt) -> Self {
        match interrupt {
            Interrupt::Cancelled => RunStatus::Cancelled,
            Interrupt::Deadline => RunStatus::BudgetExceeded,
        }
    }
}

/// Run `fut` unless the token fires or the deadline passes first.
async fn guarded<F: Future>(
    fut: F,
    cancel: &CancellationToken,
    deadline: Option<Instant>,
) -> Result<F::Output, Interrupt> {
    let expired = async {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Interrupt::Cancelled),
        _ = expired => Err(Interrupt::Deadline),
        out = fut => Ok(out),
    }
}

/// Sequential, paced aggregation over an [`AcquisitionClient`].
///
/// Cloning shares the transport, randomness and cache.
pub struct TrendAggregator<P: TrendsProvider = GoogleTrends> {
    acquisition: Arc<AcquisitionClient<P>>,
    config: Configuration,
    sleeper: Arc<dyn Sleeper>,
    rng: Arc<Mutex<fastrand::Rng>>,
    #[cfg(feature = "cache")]
    cache: Option<TrendCache>,
}

impl<P: TrendsProvider> Clone for TrendAggregator<P> {
    fn clone(&self) -> Self {
        Self {
            acquisition: self.acquisition.clone(),
            config: self.config.clone(),
            sleeper: self.sleeper.clone(),
            rng: self.rng.clone(),
            #[cfg(feature = "cache")]
            cache: self.cache.clone(),
        }
    }
}

impl TrendAggregator<GoogleTrends> {
    /// Aggregate from Google Trends with the configuration.
    pub fn new(config: Configuration) -> Result<Self, TrendsError> {
        let acquisition = AcquisitionClient::new(&config)?;
        Ok(Self::with_acquisition(acquisition, config))
    }
}

impl<P: TrendsProvider> TrendAggregator<P> {
    /// Aggregate over an existing acquisition client.
    pub fn with_acquisition(acquisition: AcquisitionClient<P>, config: Configuration) -> Self {
        Self {
            acquisition: Arc::new(acquisition),
            rng: Arc::new(Mutex::new(config.rng())),
            sleeper: Arc::new(TokioSleeper),
            #[cfg(feature = "cache")]
            cache: if config.cache {
                Some(build_cache(&config))
            } else {
                None
            },
            config,
        }
    }

    /// Replace the pacing sleeper.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// The configuration.
    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    /// The acquisition client.
    pub fn acquisition(&self) -> &AcquisitionClient<P> {
        &self.acquisition
    }

    /// The batches `keywords` would be sent as.
    pub fn plan<I, S>(&self, keywords: I) -> Vec<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        partition(&dedupe(keywords), self.config.batch_strategy.batch_size())
    }

    /// Worst case wall-clock time for `n_keywords` distinct keywords: every request
    /// times out on every attempt with full backoff, and every pause is the longest.
    pub fn estimated_upper_bound(&self, n_keywords: usize) -> Duration {
        let batches = batch_count(n_keywords, self.config.batch_strategy.batch_size());

        if batches == 0 {
            return Duration::ZERO;
        }

        let attempts = u32::from(self.config.retry.retries()) + 1;
        let per_request = self
            .config
            .request_timeout
            .saturating_mul(attempts)
            .saturating_add(self.config.retry.max_total_delay());
        let per_batch =
            per_request.saturating_mul(self.acquisition.provider().requests_per_batch());
        let pauses = self
            .config
            .pacing
            .high
            .saturating_mul(u32::try_from(batches - 1).unwrap_or(u32::MAX));

        per_batch
            .saturating_mul(u32::try_from(batches).unwrap_or(u32::MAX))
            .saturating_add(pauses)
    }

    /// Fetch and merge with the configured pacing, no cancellation and no progress reporting.
    pub async fn fetch_merged<I, S>(
        &self,
        keywords: I,
        region: &RegionCode,
        window: TimeWindow,
    ) -> TrendTable
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.fetch_merged_with(
            keywords,
            region,
            window,
            self.config.pacing,
            &CancellationToken::new(),
            &NoProgress,
        )
        .await
    }

    /// Fetch and merge.
    ///
    /// Returns the partial table when `cancel` fires or the configured budget runs
    /// out; [`TrendTable::status`] tells which.
    pub async fn fetch_merged_with<I, S>(
        &self,
        keywords: I,
        region: &RegionCode,
        window: TimeWindow,
        pacing: PacingPolicy,
        cancel: &CancellationToken,
        progress: &dyn ProgressSink,
    ) -> TrendTable
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = dedupe(keywords);
        let mut table = TrendTable::new();

        if keywords.is_empty() {
            return table;
        }

        #[cfg(feature = "cache")]
        let cache_key = CacheKey::new(
            keywords.clone(),
            region,
            window,
            self.config.batch_strategy,
        );

        #[cfg(feature = "cache")]
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(&cache_key).await {
                log::info!("cache hit for {} keywords", keywords.len());
                return cached;
            }
        }

        let batches = partition(&keywords, self.config.batch_strategy.batch_size());
        let total = batches.len();
        let deadline = self.config.budget.map(|budget| Instant::now() + budget);

        log::info!(
            "fetching {} keywords in {} batches region={:?} window={}",
            keywords.len(),
            total,
            region.as_str(),
            window
        );

        table.batches = batches.clone();

        for (index, keywords) in batches.into_iter().enumerate() {
            if cancel.is_cancelled() {
                table.status = RunStatus::Cancelled;
                break;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                table.status = RunStatus::BudgetExceeded;
                break;
            }

            let batch = match KeywordBatch::new(keywords.clone()) {
                Ok(batch) => batch,
                Err(error) => {
                    table.failures.push(BatchFailure { keywords, error });
                    continue;
                }
            };

            progress.on_batch(index, total, &batch.label());

            match guarded(
                self.acquisition.fetch_batch(&batch, region, window),
                cancel,
                deadline,
            )
            .await
            {
                Ok(outcome) => record(&mut table, &batch, outcome),
                Err(interrupt) => {
                    log::warn!("batch [{}] abandoned: {:?}", batch.label(), interrupt);
                    table.status = interrupt.into();
                    break;
                }
            }

            if index + 1 < total {
                let delay = self.next_pause(&pacing);

                if let Err(interrupt) = guarded(self.sleeper.sleep(delay), cancel, deadline).await {
                    table.status = interrupt.into();
                    break;
                }
            }
        }

        log::info!(
            "merged {} series, {} without data, {} failed batches ({})",
            table.len(),
            table.no_data.len(),
            table.failures.len(),
            table.status
        );

        #[cfg(feature = "cache")]
        if let Some(cache) = &self.cache {
            if is_cacheable(&table) {
                cache.insert(cache_key, table.clone()).await;
            }
        }

        table
    }

    /// Drop every cached table.
    #[cfg(feature = "cache")]
    pub async fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
            cache.run_pending_tasks().await;
        }
    }

    fn next_pause(&self, pacing: &PacingPolicy) -> Duration {
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        pacing.sample(&mut rng)
    }
}

/// Merge one outcome into the table.
fn record(table: &mut TrendTable, batch: &KeywordBatch, outcome: BatchOutcome) {
    match outcome {
        BatchOutcome::Series(series) => {
            for keyword in batch.keywords() {
                if !series.iter().any(|s| &s.keyword == keyword) {
                    table.no_data.push(keyword.clone());
                }
            }
            log::debug!("batch [{}] merged {} series", batch.label(), series.len());
            table.merge(series);
        }
        BatchOutcome::NoData => {
            log::info!("batch [{}] returned no data", batch.label());
            table.no_data.extend(batch.keywords().iter().cloned());
        }
        BatchOutcome::Failed(failure) => {
            table.failures.push(failure);
        }
    }
}
