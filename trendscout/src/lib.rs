#![warn(missing_docs)]

//! Search-interest acquisition that survives a rate limited, unreliable upstream.
//!
//! Trendscout pulls "interest over time" series for any number of keywords
//! from Google Trends, which accepts at most five keywords per query and
//! blocks bursty clients.
//!
//! # How to use Trendscout
//!
//! - [`AcquisitionClient`] fetches one batch of up to five keywords. Retries,
//!   backoff and jitter happen in the transport; the result is always a
//!   [`BatchOutcome`], never an error.
//! - [`TrendAggregator`] takes any keyword list, batches it, paces the calls
//!   and merges everything into one [`TrendTable`]. Failed batches are
//!   recorded, not fatal.
//!
//! # Basic usage
//!
//! ```ignore
//! use trendscout::{Configuration, RegionCode, TimeWindow, TrendAggregator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), trendscout::TrendsError> {
//!     let aggregator = TrendAggregator::new(Configuration::new())?;
//!     let table = aggregator
//!         .fetch_merged(["Matcha", "Cold Plunge"], &RegionCode::parse("US")?, TimeWindow::default())
//!         .await;
//!
//!     for series in table.iter() {
//!         println!("{} peak {:?}", series.keyword, series.peak());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature flags
//!
//! - `cache`: Enabled by default. Keeps complete tables in memory for 24 hours.

pub extern crate chrono;
extern crate log;
pub extern crate tokio;
pub extern crate tokio_util;
#[macro_use]
extern crate lazy_static;

/// Fetch one batch.
pub mod acquisition;
/// Batch, pace and merge.
pub mod aggregator;
/// The HTTP transport.
pub mod client;
/// Configuration for the client and aggregator.
pub mod configuration;
/// Error types.
pub mod error;
/// Optional features.
pub mod features;
/// Upstream providers.
pub mod providers;
/// Region codes.
pub mod region;
/// Series and merged tables.
pub mod series;
/// Application utils.
pub mod utils;
/// Query time windows.
pub mod window;

pub use acquisition::{AcquisitionClient, BatchOutcome, KeywordBatch, MAX_BATCH_SIZE};
pub use aggregator::{LogProgress, NoProgress, ProgressSink, TrendAggregator};
pub use configuration::{BatchStrategy, Configuration};
pub use error::TrendsError;
pub use region::RegionCode;
pub use series::{BatchFailure, InterestPoint, InterestSeries, RunStatus, TrendTable};
pub use tokio_util::sync::CancellationToken;
pub use utils::pacing::PacingPolicy;
pub use window::TimeWindow;
