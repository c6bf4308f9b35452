/// Keyword normalization and batching.
pub mod keywords;
/// Inter-batch pacing.
pub mod pacing;
/// Transport retry policy and middleware.
pub mod retry;
