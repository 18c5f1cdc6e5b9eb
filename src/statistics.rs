use super::histogram::Ranked;
use super::sparkline::DEFAULT_SPARKLINE_WIDTH;
use super::{Error, Histogram};

use std::fmt;

/// A snapshot of the robust statistics of a [Histogram].
///
/// This is the record handed to whatever serializes profiling results; every
/// field is a plain integer, real or string.
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub min: u64,
    pub max: u64,
    pub count: u64,
    pub low_outliers: u64,
    pub high_outliers: u64,
    pub trimedian: u64,
    pub std_dev: f64,
    pub snr: u8,
    pub sparkline: String,
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{min:{},max:{},count:{},low_outliers:{},high_outliers:{},trimedian:{},std_dev:{},snr:{},sparkline:{}}}",
            self.min,
            self.max,
            self.count,
            self.low_outliers,
            self.high_outliers,
            self.trimedian,
            self.std_dev,
            self.snr,
            self.sparkline
        )
    }
}

impl Histogram {
    /// Gather every derived statistic in one pass over the compacted buckets.
    ///
    /// ```
    /// use trimhist::Histogram;
    ///
    /// let mut h = Histogram::new();
    /// for v in 1..=100 {
    ///     h.add_observation(v)?;
    /// }
    /// let stats = h.statistics()?;
    /// assert_eq!((stats.min, stats.max, stats.count), (1, 100, 100));
    /// # Ok::<(), trimhist::Error>(())
    /// ```
    pub fn statistics(&self) -> Result<Statistics, Error> {
        let buckets = self.compacted()?;
        let ranked = Ranked::new(&buckets, self.observations);
        let (low_outliers, high_outliers) = ranked.outliers()?;
        Ok(Statistics {
            min: ranked.min(),
            max: ranked.max(),
            count: self.observations,
            low_outliers,
            high_outliers,
            trimedian: ranked.trimedian()?,
            std_dev: ranked.stddev()?,
            snr: ranked.signal_to_noise()?,
            sparkline: ranked.sparkline(DEFAULT_SPARKLINE_WIDTH),
        })
    }
}
