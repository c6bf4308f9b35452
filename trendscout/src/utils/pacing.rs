use std::sync::Mutex;
use std::time::Duration;

/// Uniform delay range slept between consecutive upstream batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct PacingPolicy {
    /// Inclusive lower bound.
    pub low: Duration,
    /// Exclusive upper bound.
    pub high: Duration,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            low: Duration::from_secs(1),
            high: Duration::from_secs(2),
        }
    }
}

impl PacingPolicy {
    /// Create a policy, swapping the bounds if given in reverse.
    pub fn new(low: Duration, high: Duration) -> Self {
        if low <= high {
            Self { low, high }
        } else {
            Self {
                low: high,
                high: low,
            }
        }
    }

    /// Create a policy from millisecond bounds.
    pub fn from_millis(low: u64, high: u64) -> Self {
        Self::new(Duration::from_millis(low), Duration::from_millis(high))
    }

    /// No pacing.
    pub fn none() -> Self {
        Self {
            low: Duration::ZERO,
            high: Duration::ZERO,
        }
    }

    /// Is the policy a no-op.
    pub fn is_none(&self) -> bool {
        self.high.is_zero()
    }

    /// Draw a delay uniformly from `[low, high)`. A degenerate range returns `low`.
    pub fn sample(&self, rng: &mut fastrand::Rng) -> Duration {
        let span = self.high.saturating_sub(self.low).as_nanos().min(u64::MAX as u128) as u64;

        if span == 0 {
            self.low
        } else {
            self.low + Duration::from_nanos(rng.u64(0..span))
        }
    }
}

/// Sleeps between batches. Swapped out in tests to observe pacing without waiting.
#[async_trait::async_trait]
pub trait Sleeper: Send + Sync {
    /// Wait for the duration.
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait::async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await
    }
}

/// Records every requested delay and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// The delays requested so far.
    pub fn delays(&self) -> Vec<Duration> {
        match self.delays.lock() {
            Ok(delays) => delays.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of sleeps requested so far.
    pub fn count(&self) -> usize {
        self.delays().len()
    }
}

#[async_trait::async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        match self.delays.lock() {
            Ok(mut delays) => delays.push(duration),
            Err(poisoned) => poisoned.into_inner().push(duration),
        }
    }
}
