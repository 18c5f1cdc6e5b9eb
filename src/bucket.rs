use super::Error;

use std::fmt;

/// A [Bucket] approximates a contiguous run of observations.
///
/// The bucket remembers only the closed range `[min, min + span]` and how many
/// observations fell into it.  Observations inside a bucket are assumed to be
/// spread uniformly across the range, so a rank inside the bucket is answered by
/// linear interpolation.
///
/// A bucket always holds at least one observation.  There is no way to build an
/// empty one.
///
/// Histograms sort buckets by their low end.  `Bucket` has no `Ord`, so
/// [Bucket::min] and [Bucket::max] are always the range accessors.
#[derive(Eq, PartialEq, Debug, Copy, Clone)]
pub struct Bucket {
    /// low end of the range
    pub(crate) min: u64,
    /// distance from `min` to the high end of the range
    pub(crate) span: u64,
    /// observations believed to be in `[min, min + span]`, never zero
    pub(crate) count: u32,
}

impl fmt::Display for Bucket {
    /// Formats the bucket as `[min,count,max]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{},{}]", self.min, self.count, self.max())
    }
}

impl From<u64> for Bucket {
    fn from(observation: u64) -> Self {
        Bucket::new(observation)
    }
}

impl Bucket {
    /// This function creates a bucket holding exactly one observation.
    pub fn new(observation: u64) -> Bucket {
        Bucket { min: observation, span: 0, count: 1 }
    }
    /// This function rebuilds a bucket from its raw parts.
    ///
    /// A `count` of zero is rejected, as is a `span` that would push the high
    /// end of the range past `u64::MAX`.
    pub fn from_parts(min: u64, span: u64, count: u32) -> Result<Bucket, Error> {
        if count == 0 {
            log::error!("bucket [{},{}] rejected: zero observations", min, span);
            return Err(Error::EmptyBucket);
        }
        if min.checked_add(span).is_none() {
            log::error!("bucket [{},{}] rejected: range exceeds u64", min, span);
            return Err(Error::Invariant("bucket range exceeds u64"));
        }
        Ok(Bucket { min, span, count })
    }
    /// The low end of the range.
    pub fn min(&self) -> u64 {
        self.min
    }
    /// The high end of the range.
    pub fn max(&self) -> u64 {
        self.min + self.span
    }
    /// The width of the range.
    pub fn span(&self) -> u64 {
        self.span
    }
    /// The number of observations in the bucket.
    pub fn count(&self) -> u32 {
        self.count
    }
    /// This function combines two buckets into one covering both ranges.
    ///
    /// The result is lossy: the original spread of observations inside the
    /// widened range cannot be recovered, only interpolated.  If the combined
    /// count does not fit a `u32`, `Error::CountOverflow` is returned and neither
    /// bucket is touched.
    pub fn merge(&self, other: &Bucket) -> Result<Bucket, Error> {
        let count = match self.count.checked_add(other.count) {
            Some(count) => count,
            None => {
                log::error!("merging {} into {} overflows the bucket count", other, self);
                return Err(Error::CountOverflow);
            }
        };
        let min = self.min.min(other.min);
        let max = self.max().max(other.max());
        let span = max
            .checked_sub(min)
            .ok_or(Error::Invariant("merged bucket range is inverted"))?;
        Ok(Bucket { min, span, count })
    }
    /// Determines if the two closed ranges share at least one value.
    pub fn is_overlapping(&self, other: &Bucket) -> bool {
        self.min <= other.max() && self.max() >= other.min
    }
    /// Determines if `rank` is a valid 1-based rank local to this bucket.
    pub fn contains_rank(&self, rank: u64) -> bool {
        rank >= 1 && rank <= self.count as u64
    }
    /// This function interpolates the observation at local `rank`.
    ///
    /// Rank 1 is `min` and rank `count` is `max`; ranks in between are spread
    /// linearly.  The caller must ensure [Bucket::contains_rank] holds.
    pub fn rank(&self, rank: u64) -> u64 {
        debug_assert!(self.contains_rank(rank));
        if self.count == 1 {
            self.min
        } else {
            // u128 keeps (rank-1)*span from wrapping for wide buckets
            let offset = (rank.saturating_sub(1) as u128 * self.span as u128)
                / (self.count as u128 - 1);
            self.min + offset as u64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleton() {
        let b = Bucket::new(42);
        assert_eq!(b.min(), 42);
        assert_eq!(b.max(), 42);
        assert_eq!(b.count(), 1);
        assert_eq!(b.rank(1), 42);
        assert!(b.contains_rank(1));
        assert!(!b.contains_rank(0));
        assert!(!b.contains_rank(2));
    }

    #[test]
    fn merge_widens() -> Result<(), Error> {
        let b = Bucket::new(10).merge(&Bucket::new(30))?;
        assert_eq!((b.min(), b.span(), b.max(), b.count()), (10, 20, 30, 2));
        let b = b.merge(&Bucket::new(20))?;
        assert_eq!((b.min(), b.max(), b.count()), (10, 30, 3));
        let b = Bucket::new(5).merge(&b)?;
        assert_eq!((b.min(), b.max(), b.count()), (5, 30, 4));
        Ok(())
    }

    #[test]
    fn merge_overflow() -> Result<(), Error> {
        let full = Bucket::from_parts(0, 10, u32::MAX)?;
        assert!(matches!(full.merge(&Bucket::new(3)), Err(Error::CountOverflow)));
        Ok(())
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(Bucket::from_parts(7, 0, 0), Err(Error::EmptyBucket)));
        assert!(Bucket::from_parts(u64::MAX, 1, 1).is_err());
    }

    #[test]
    fn interpolation() -> Result<(), Error> {
        let b = Bucket::from_parts(100, 100, 5)?;
        let ranks: Vec<u64> = (1..=5).map(|r| b.rank(r)).collect();
        assert_eq!(ranks, vec![100, 125, 150, 175, 200]);
        let wide = Bucket::from_parts(0, u64::MAX, 3)?;
        assert_eq!(wide.rank(3), u64::MAX);
        assert_eq!(wide.rank(2), u64::MAX / 2);
        Ok(())
    }

    #[test]
    fn overlapping() -> Result<(), Error> {
        let a = Bucket::from_parts(10, 10, 2)?;
        assert!(a.is_overlapping(&Bucket::new(10)));
        assert!(a.is_overlapping(&Bucket::new(20)));
        assert!(a.is_overlapping(&Bucket::from_parts(0, 10, 2)?));
        assert!(!a.is_overlapping(&Bucket::new(21)));
        assert!(!a.is_overlapping(&Bucket::from_parts(0, 9, 2)?));
        Ok(())
    }

    #[test]
    fn accessors_on_owned_values() -> Result<(), Error> {
        let b = Bucket::from_parts(3, 4, 2)?;
        let (low, high) = (b.min(), b.max());
        assert_eq!((low, high), (3, 7));
        let mut bs = vec![Bucket::new(9), b, Bucket::new(1)];
        bs.sort_unstable_by_key(|b| b.min());
        assert_eq!(bs.iter().map(|b| b.min()).collect::<Vec<_>>(), vec![1, 3, 9]);
        assert_eq!(bs[2].max(), 9);
        Ok(())
    }

    #[test]
    fn display() -> Result<(), Error> {
        assert_eq!(Bucket::from_parts(4, 6, 3)?.to_string(), "[4,3,10]");
        Ok(())
    }
}
