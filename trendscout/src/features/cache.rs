use crate::configuration::{BatchStrategy, Configuration};
use crate::region::RegionCode;
use crate::series::{RunStatus, TrendTable};
use crate::window::TimeWindow;

/// Identity of an aggregation request.
///
/// Keyword order is kept: it decides the grouping, and the upstream normalizes per group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Deduplicated keywords in request order.
    pub keywords: Vec<String>,
    /// Region of the request.
    pub region: RegionCode,
    /// Window of the request.
    pub window: TimeWindow,
    /// Grouping of the request.
    pub strategy: BatchStrategy,
}

impl CacheKey {
    /// Build a key from already deduplicated keywords.
    pub fn new(
        keywords: Vec<String>,
        region: &RegionCode,
        window: TimeWindow,
        strategy: BatchStrategy,
    ) -> Self {
        Self {
            keywords,
            region: region.clone(),
            window,
            strategy,
        }
    }
}

/// The merged table cache to use.
pub type TrendCache = moka::future::Cache<CacheKey, TrendTable>;

/// Build a cache sized and expired per the configuration.
pub fn build_cache(config: &Configuration) -> TrendCache {
    moka::future::Cache::builder()
        .max_capacity(config.cache_capacity)
        .time_to_live(config.cache_ttl)
        .build()
}

/// Only finished runs without failed batches are kept, so an outage is not replayed for a day.
pub fn is_cacheable(table: &TrendTable) -> bool {
    table.status == RunStatus::Complete && !table.has_failures()
}
