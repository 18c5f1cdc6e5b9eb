use super::histogram::{round_div, Ranked};
use super::{Error, Histogram};

/// Divides an interquartile range into a standard deviation under a normal
/// distribution (2·√2·erfc⁻¹(0.5)).
pub const IQR_TO_STDDEV: f64 = 1.35623115191269;

/// Proportion of a normal distribution beyond six standard deviations, per side.
pub const SIX_SIGMA_TAIL: f64 = (1.0 - 0.999999998026825) / 2.0;

/// Highest value [Histogram::signal_to_noise] reports.
pub const MAX_SNR: u8 = 99;

impl Ranked<'_> {
    /// Ranks of the first and third quartile and the median, `n >= 4`.
    fn quartile_ranks(&self) -> (u64, u64, u64) {
        let q1 = round_div(self.observations, 4);
        let q2 = round_div(self.observations, 2);
        (q1, q2, q1 + q2)
    }

    pub(crate) fn trimedian(&self) -> Result<u64, Error> {
        match self.observations {
            0 => Ok(0),
            1 | 2 => self.by_rank(1),
            3 => self.by_rank(2),
            _ => {
                let (q1, q2, q3) = self.quartile_ranks();
                let sum = self.by_rank(q1)? as u128
                    + 2 * self.by_rank(q2)? as u128
                    + self.by_rank(q3)? as u128;
                Ok(((sum + 2) / 4) as u64)
            }
        }
    }

    pub(crate) fn interquartile_range(&self) -> Result<u64, Error> {
        match self.observations {
            0 | 1 => Ok(0),
            2 => Ok(self.by_rank(2)? - self.by_rank(1)?),
            3 => Ok(self.by_rank(3)? - self.by_rank(1)?),
            _ => {
                let (q1, _, q3) = self.quartile_ranks();
                Ok(self.by_rank(q3)?.saturating_sub(self.by_rank(q1)?))
            }
        }
    }

    pub(crate) fn stddev(&self) -> Result<f64, Error> {
        Ok(self.interquartile_range()? as f64 / IQR_TO_STDDEV)
    }

    pub(crate) fn signal_to_noise(&self) -> Result<u8, Error> {
        let trimedian = match self.trimedian()? {
            0 => 1.0,
            t => t as f64,
        };
        let stddev = self.stddev()?.max(1.0);
        let snr = 10.0 * ((trimedian * trimedian) / (stddev * stddev)).log10();
        Ok(snr.clamp(0.0, MAX_SNR as f64).round() as u8)
    }

    pub(crate) fn outliers(&self) -> Result<(u64, u64), Error> {
        if self.observations == 0 {
            return Ok((0, 0));
        }
        let expected = (self.observations as f64 * SIX_SIGMA_TAIL).round() as u64;
        let trimedian = self.trimedian()? as f64;
        let stddev = self.stddev()?;
        let excess = |found: u64| found.saturating_sub(expected);

        let low_threshold = trimedian - 6.0 * stddev;
        let low = if low_threshold > self.min() as f64 {
            excess(self.count_below(low_threshold))
        } else {
            0
        };
        let high_threshold = trimedian + 6.0 * stddev;
        let high = if high_threshold < self.max() as f64 {
            excess(self.count_above(high_threshold))
        } else {
            0
        };
        Ok((low, high))
    }

    /// Observations strictly below `threshold`.
    fn count_below(&self, threshold: f64) -> u64 {
        let mut found = 0u64;
        for bucket in self.buckets {
            if (bucket.max() as f64) < threshold {
                found += bucket.count() as u64;
            } else {
                found += (1..=bucket.count() as u64)
                    .take_while(|r| (bucket.rank(*r) as f64) < threshold)
                    .count() as u64;
                break;
            }
        }
        found
    }

    /// Observations strictly above `threshold`.
    fn count_above(&self, threshold: f64) -> u64 {
        let mut found = 0u64;
        for bucket in self.buckets.iter().rev() {
            if (bucket.min() as f64) > threshold {
                found += bucket.count() as u64;
            } else {
                found += (1..=bucket.count() as u64)
                    .rev()
                    .take_while(|r| (bucket.rank(*r) as f64) > threshold)
                    .count() as u64;
                break;
            }
        }
        found
    }
}

impl Histogram {
    /// Calculate the trimedian, `(Q1 + 2·Q2 + Q3) / 4`, rounded to the nearest
    /// integer.
    ///
    /// With fewer than four observations the quartiles are meaningless, so the
    /// lowest (one or two observations) or middle (three) observation is used.
    pub fn trimedian(&self) -> Result<u64, Error> {
        let buckets = self.compacted()?;
        Ranked::new(&buckets, self.observations).trimedian()
    }
    /// Calculate the distance between the first and third quartiles.
    ///
    /// With fewer than four observations this is the full range.
    pub fn interquartile_range(&self) -> Result<u64, Error> {
        let buckets = self.compacted()?;
        Ranked::new(&buckets, self.observations).interquartile_range()
    }
    /// Calculate a robust standard deviation from the interquartile range.
    ///
    /// This is not the sample standard deviation: it is the spread a normal
    /// distribution would need to produce the observed quartiles, and so it is
    /// insensitive to outliers.
    pub fn stddev(&self) -> Result<f64, Error> {
        let buckets = self.compacted()?;
        Ranked::new(&buckets, self.observations).stddev()
    }
    /// Calculate how much noise surrounds the trimedian, in decibels.
    ///
    /// `10·log10(trimedian² / stddev²)` clamped to `[0, 99]`; a zero trimedian
    /// and any stddev below one are treated as one.  `0` is mostly noise,
    /// `99` is practically none.
    pub fn signal_to_noise(&self) -> Result<u8, Error> {
        let buckets = self.compacted()?;
        Ranked::new(&buckets, self.observations).signal_to_noise()
    }
    /// Count the observations more than six standard deviations from the
    /// trimedian, as `(low, high)`.
    ///
    /// Only the excess over what a normal distribution would put beyond six
    /// sigma is reported, so `(0, 0)` means nothing statistically unusual.
    pub fn outliers(&self) -> Result<(u64, u64), Error> {
        let buckets = self.compacted()?;
        Ranked::new(&buckets, self.observations).outliers()
    }
}
