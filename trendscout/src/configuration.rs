use crate::acquisition::MAX_BATCH_SIZE;
use crate::utils::pacing::PacingPolicy;
use crate::utils::retry::{RetryPolicy, MAX_RETRIES};
use std::time::Duration;

/// Default language sent as `hl`.
pub const DEFAULT_LANGUAGE: &str = "en-US";
/// Default timezone offset in minutes sent as `tz`.
pub const DEFAULT_TZ: i32 = 360;

/// How deduplicated keywords are grouped into upstream calls.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    strum::EnumString,
    strum::Display,
    strum::AsRefStr,
)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStrategy {
    #[default]
    #[strum(serialize = "grouped")]
    /// Up to five keywords per call, normalized jointly by the upstream.
    Grouped,
    #[strum(serialize = "single")]
    /// One keyword per call. Every series is normalized to its own peak.
    Single,
}

impl BatchStrategy {
    /// Keywords per upstream call.
    pub fn batch_size(&self) -> usize {
        match self {
            Self::Grouped => MAX_BATCH_SIZE,
            Self::Single => 1,
        }
    }
}

/// Structure to configure the acquisition client and aggregator.
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Max time to wait for a single request, body included.
    pub request_timeout: Duration,
    /// Max time to establish a connection.
    pub connect_timeout: Duration,
    /// Max redirects followed per request.
    pub redirect_limit: usize,
    /// Transport retry and backoff.
    pub retry: RetryPolicy,
    /// Delay range between consecutive batches.
    pub pacing: PacingPolicy,
    /// Keyword grouping.
    pub batch_strategy: BatchStrategy,
    /// Wall-clock ceiling for one aggregation run.
    pub budget: Option<Duration>,
    /// Serve repeated requests from memory. Requires the `cache` feature.
    pub cache: bool,
    /// How long a cached table stays valid.
    pub cache_ttl: Duration,
    /// Max tables kept in the cache.
    pub cache_capacity: u64,
    /// User-Agent for requests. Defaults to the crate name and version.
    pub user_agent: Option<String>,
    /// Upstream base url override.
    pub api_url: Option<String>,
    /// Interface language, `hl`.
    pub language: String,
    /// Timezone offset in minutes, `tz`.
    pub tz: i32,
    /// Upstream category filter. 0 is all categories.
    pub category: u32,
    /// Seed for pacing and jitter randomness.
    pub seed: Option<u64>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(25),
            connect_timeout: Duration::from_secs(10),
            redirect_limit: 5,
            retry: RetryPolicy::default(),
            pacing: PacingPolicy::default(),
            batch_strategy: BatchStrategy::default(),
            budget: None,
            cache: cfg!(feature = "cache"),
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            cache_capacity: 256,
            user_agent: None,
            api_url: None,
            language: DEFAULT_LANGUAGE.into(),
            tz: DEFAULT_TZ,
            category: 0,
            seed: None,
        }
    }
}

impl Configuration {
    /// Represents configuration with the default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Max time to wait for a request. By default requests time out in 25s.
    pub fn with_request_timeout(&mut self, request_timeout: Duration) -> &mut Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Max time to connect. By default 10s.
    pub fn with_connect_timeout(&mut self, connect_timeout: Duration) -> &mut Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Max redirects to follow.
    pub fn with_redirect_limit(&mut self, redirect_limit: usize) -> &mut Self {
        self.redirect_limit = redirect_limit;
        self
    }

    /// Retries after the first attempt of a request, capped at [`MAX_RETRIES`].
    pub fn with_retry(&mut self, retry: u8) -> &mut Self {
        self.retry.max_retries = retry.min(MAX_RETRIES);
        self
    }

    /// Backoff base and cap for retries.
    pub fn with_backoff(&mut self, base: Duration, max: Duration) -> &mut Self {
        self.retry.base_delay = base;
        self.retry.max_delay = max.max(base);
        self
    }

    /// Replace the whole retry policy. The retry count is capped at [`MAX_RETRIES`].
    pub fn with_retry_policy(&mut self, retry: RetryPolicy) -> &mut Self {
        self.retry = RetryPolicy {
            max_retries: retry.max_retries.min(MAX_RETRIES),
            ..retry
        };
        self
    }

    /// Delay range between batches.
    pub fn with_pacing(&mut self, pacing: PacingPolicy) -> &mut Self {
        self.pacing = pacing;
        self
    }

    /// Keyword grouping.
    pub fn with_batch_strategy(&mut self, batch_strategy: BatchStrategy) -> &mut Self {
        self.batch_strategy = batch_strategy;
        self
    }

    /// Wall-clock ceiling for one run. Set to None to disable.
    pub fn with_budget(&mut self, budget: Option<Duration>) -> &mut Self {
        self.budget = budget;
        self
    }

    /// Toggle the result cache.
    pub fn with_cache(&mut self, cache: bool) -> &mut Self {
        self.cache = cache;
        self
    }

    /// Cache time to live.
    pub fn with_cache_ttl(&mut self, cache_ttl: Duration) -> &mut Self {
        self.cache_ttl = cache_ttl;
        self
    }

    /// Cache capacity in tables.
    pub fn with_cache_capacity(&mut self, cache_capacity: u64) -> &mut Self {
        self.cache_capacity = cache_capacity;
        self
    }

    /// Add user agent to request.
    pub fn with_user_agent(&mut self, user_agent: Option<&str>) -> &mut Self {
        self.user_agent = user_agent.map(|ua| ua.to_string());
        self
    }

    /// Upstream base url, for self hosted mirrors and tests.
    pub fn with_api_url(&mut self, api_url: Option<&str>) -> &mut Self {
        self.api_url = api_url.map(|url| url.trim_end_matches('/').to_string());
        self
    }

    /// Interface language.
    pub fn with_language(&mut self, language: &str) -> &mut Self {
        self.language = language.to_string();
        self
    }

    /// Timezone offset in minutes.
    pub fn with_tz(&mut self, tz: i32) -> &mut Self {
        self.tz = tz;
        self
    }

    /// Upstream category filter.
    pub fn with_category(&mut self, category: u32) -> &mut Self {
        self.category = category;
        self
    }

    /// Fix the randomness seed for reproducible pacing and jitter.
    pub fn with_seed(&mut self, seed: Option<u64>) -> &mut Self {
        self.seed = seed;
        self
    }

    /// A new random source, seeded when configured.
    pub(crate) fn rng(&self) -> fastrand::Rng {
        match self.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        }
    }

    /// The user agent to send.
    pub(crate) fn user_agent_or_default(&self) -> &str {
        self.user_agent
            .as_deref()
            .unwrap_or(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
    }
}
