//! A bounded-memory streaming histogram with robust rank statistics.
//!
//! Use this crate to summarize a never-ending stream of durations (function
//! timings, latencies) in a few kilobytes and still answer rank queries about
//! it: trimedian, interquartile range, an outlier-insensitive standard
//! deviation, a signal-to-noise ratio, excess outlier counts and a sparkline.
//!
//! # Examples
//!
//! ```
//! use std::time::Instant;
//! use trimhist::Histogram;
//!
//! let mut perf = Histogram::new();
//! for _ in 0..1000 {
//!     let start = Instant::now();
//!     // do some work
//!     perf.add_duration(start.elapsed())?;
//! }
//!
//! let stats = perf.statistics()?;
//! println!("trimedian: {}ns, snr: {}, {}", stats.trimedian, stats.snr, stats.sparkline);
//! # Ok::<(), trimhist::Error>(())
//! ```
mod bucket;
#[macro_use]
mod histogram;
mod analysis;
mod sparkline;
mod statistics;
mod serde;

pub use bucket::Bucket;
pub use histogram::{Histogram, MAX_BUCKETS};
pub use analysis::{IQR_TO_STDDEV, MAX_SNR, SIX_SIGMA_TAIL};
pub use sparkline::DEFAULT_SPARKLINE_WIDTH;
pub use statistics::Statistics;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("bucket must hold at least one observation")]
    EmptyBucket,
    #[error("observation count overflow")]
    CountOverflow,
    #[error("histogram invariant violated: {}", .0)]
    Invariant(&'static str),
    #[error("bucket capacity {} is below the minimum of 2", .0)]
    InvalidCapacity(usize),
    #[error("Corrupt encoding: {}", .0)]
    CorruptEncoding(String),
}
