use super::bucket::Bucket;
use super::Error;

use std::cell::{Cell, Ref, RefCell};
use std::{fmt, time::Duration};

/// `MAX_BUCKETS` is the default bucket capacity of a [Histogram].
pub const MAX_BUCKETS: usize = 256;

#[cfg(test)]
macro_rules! hist {
    () => ( Histogram::new() );
    ($($obs:expr),+ $(,)?) => ( {
        let mut h = Histogram::new();
        [$($obs),+].iter().for_each(|x: &u64| { h.add_observation(*x).expect("observation"); });
        h
    } )
}

/// Whether the bucket list currently satisfies the compaction postconditions.
#[derive(Eq, PartialEq, Debug, Copy, Clone)]
enum Layout {
    /// sorted, non-overlapping, under capacity
    Compacted,
    /// observations appended since the last compaction
    Dirty,
}

/// `(a + b/2) / b`, integer division rounded to nearest.
pub(crate) fn round_div(dividend: u64, divisor: u64) -> u64 {
    ((dividend as u128 + (divisor / 2) as u128) / divisor as u128) as u64
}

#[derive(Debug, Clone)]
/// A bounded-memory histogram over a stream of `u64` observations.
///
/// Every observation is appended as a singleton [Bucket].  Once the bucket list
/// reaches capacity it is compacted: sorted, and neighbouring buckets merged until
/// each holds roughly `count / max_buckets` observations.  Memory stays bounded no
/// matter how many observations are added, at the cost of exactness inside merged
/// buckets.
///
/// Read operations compact first, so they take `&self` and may still restructure
/// the bucket list.  A [Histogram] is meant to be owned by a single thread; combine
/// per-thread histograms with [Histogram::merge].
///
/// Rank-dependent reads on an empty histogram return `0`; check
/// [Histogram::count] first when that distinction matters.
pub struct Histogram {
    pub(crate) buckets: RefCell<Vec<Bucket>>,
    pub(crate) observations: u64,
    pub(crate) max_buckets: usize,
    layout: Cell<Layout>,
}

impl Default for Histogram {
    fn default() -> Self {
        Histogram::new()
    }
}

impl fmt::Display for Histogram {
    /// Formats the compacted bucket list, e.g. `[[1,2,3][7,1,7]]`.
    ///
    /// A histogram that cannot be compacted is shown as its raw bucket list.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let buckets = match self.compacted() {
            Ok(buckets) => buckets,
            Err(_) => self.buckets.borrow(),
        };
        write!(f, "[")?;
        for bucket in buckets.iter() {
            write!(f, "{}", bucket)?;
        }
        write!(f, "]")
    }
}

impl Histogram {
    /// This function creates a new, empty histogram with [MAX_BUCKETS] capacity.
    pub fn new() -> Histogram {
        Histogram {
            buckets: RefCell::new(Vec::with_capacity(MAX_BUCKETS)),
            observations: 0,
            max_buckets: MAX_BUCKETS,
            layout: Cell::new(Layout::Compacted),
        }
    }
    /// This function creates a new, empty histogram holding at most
    /// `max_buckets - 1` buckets after each compaction.
    ///
    /// ```
    /// use trimhist::Histogram;
    ///
    /// let h = Histogram::with_max_buckets(64)?;
    /// assert_eq!(h.count(), 0);
    /// # Ok::<(), trimhist::Error>(())
    /// ```
    pub fn with_max_buckets(max_buckets: usize) -> Result<Histogram, Error> {
        if max_buckets < 2 {
            return Err(Error::InvalidCapacity(max_buckets));
        }
        Ok(Histogram {
            buckets: RefCell::new(Vec::with_capacity(max_buckets)),
            observations: 0,
            max_buckets,
            layout: Cell::new(Layout::Compacted),
        })
    }
    /// This function builds a histogram from an already summarized bucket list.
    #[cfg_attr(not(feature = "serde"), allow(dead_code))]
    pub(crate) fn from_buckets(max_buckets: usize, buckets: Vec<Bucket>) -> Result<Histogram, Error> {
        let mut h = Histogram::with_max_buckets(max_buckets)?;
        let observations = buckets.iter().try_fold(0u64, |total, b| {
            total.checked_add(b.count as u64).ok_or(Error::CountOverflow)
        })?;
        *h.buckets.get_mut() = buckets;
        h.observations = observations;
        h.layout.set(Layout::Dirty);
        h.compact()?;
        Ok(h)
    }
    /// This function records a single observation.
    ///
    /// When the bucket list reaches capacity it is compacted right away, so this
    /// call can fail with the same errors as a compaction.  A failed call
    /// records nothing.
    ///
    /// ```
    /// use trimhist::Histogram;
    ///
    /// let mut h = Histogram::new();
    /// for v in [120, 80, 100] {
    ///     h.add_observation(v)?;
    /// }
    /// assert_eq!(h.count(), 3);
    /// assert_eq!(h.trimedian()?, 100);
    /// # Ok::<(), trimhist::Error>(())
    /// ```
    pub fn add_observation(&mut self, observation: u64) -> Result<(), Error> {
        self.observations = match self.observations.checked_add(1) {
            Some(n) => n,
            None => {
                log::error!("histogram observation count overflow");
                return Err(Error::CountOverflow);
            }
        };
        let layout = self.layout.get();
        self.buckets.get_mut().push(Bucket::new(observation));
        self.layout.set(Layout::Dirty);
        if self.buckets.get_mut().len() >= self.max_buckets {
            if let Err(e) = self.compact() {
                self.buckets.get_mut().pop();
                self.observations -= 1;
                self.layout.set(layout);
                return Err(e);
            }
        }
        Ok(())
    }
    /// This function records a duration as whole nanoseconds.
    ///
    /// Durations longer than `u64::MAX` nanoseconds saturate.
    pub fn add_duration(&mut self, d: Duration) -> Result<(), Error> {
        self.add_observation(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
    }
    /// This function folds the observations of `other` into the caller.
    ///
    /// The bucket lists are concatenated and compacted right away.  If that
    /// compaction fails the caller is left exactly as it was.
    pub fn merge(&mut self, other: &Histogram) -> Result<(), Error> {
        self.merge_many(&[other])
    }
    /// This function folds the observations of every histogram in `others` into
    /// the caller.
    pub fn merge_many(&mut self, others: &[&Histogram]) -> Result<(), Error> {
        let observations = others.iter().try_fold(self.observations, |total, other| {
            total.checked_add(other.observations).ok_or(Error::CountOverflow)
        })?;
        let layout = self.layout.get();
        let observations_before = self.observations;
        let buckets = self.buckets.get_mut();
        let len_before = buckets.len();
        for other in others {
            buckets.extend(other.buckets.borrow().iter().copied());
        }
        log::debug!(
            "merged {} histograms: {} observations in {} buckets",
            others.len(),
            observations,
            buckets.len()
        );
        self.observations = observations;
        self.layout.set(Layout::Dirty);
        if let Err(e) = self.compact() {
            self.buckets.get_mut().truncate(len_before);
            self.observations = observations_before;
            self.layout.set(layout);
            return Err(e);
        }
        Ok(())
    }
    /// This function will empty the histogram of all recorded observations.
    pub fn clear(&mut self) {
        self.buckets.get_mut().clear();
        self.observations = 0;
        self.layout.set(Layout::Compacted);
    }
    /// This function returns the exact number of observations recorded.
    pub fn count(&self) -> u64 {
        self.observations
    }
    /// This function brings the bucket list back under capacity.
    ///
    /// It is a no-op when nothing was added since the last compaction.  On
    /// error the bucket list is left untouched and stays uncompacted.
    pub fn compact(&self) -> Result<(), Error> {
        self.compacted().map(|_| ())
    }
    /// Compacts if needed and hands out the sorted bucket list.
    pub(crate) fn compacted(&self) -> Result<Ref<'_, Vec<Bucket>>, Error> {
        if self.layout.get() == Layout::Dirty {
            let mut sorted = self.buckets.borrow().clone();
            sorted.sort_unstable_by_key(|b| b.min);
            let merged = compact_sorted(&sorted, self.observations, self.max_buckets)?;
            *self.buckets.borrow_mut() = merged;
            self.layout.set(Layout::Compacted);
        }
        Ok(self.buckets.borrow())
    }
    /// This function returns the interpolated observation at 1-based `rank`.
    ///
    /// `rank` is clamped into `[1, count]`.  Returns `0` on an empty histogram.
    pub fn by_rank(&self, rank: u64) -> Result<u64, Error> {
        let buckets = self.compacted()?;
        Ranked::new(&buckets, self.observations).by_rank(rank)
    }
    /// The smallest observation (the low end of the first bucket).
    pub fn min(&self) -> Result<u64, Error> {
        let buckets = self.compacted()?;
        Ok(Ranked::new(&buckets, self.observations).min())
    }
    /// The largest observation (the high end of the last bucket).
    pub fn max(&self) -> Result<u64, Error> {
        let buckets = self.compacted()?;
        Ok(Ranked::new(&buckets, self.observations).max())
    }
}

/// Merges a sorted bucket list down to fewer than `max_buckets` buckets.
fn compact_sorted(
    sorted: &[Bucket],
    observations: u64,
    max_buckets: usize,
) -> Result<Vec<Bucket>, Error> {
    let target = 1 + round_div(observations, max_buckets as u64);
    let mut merged: Vec<Bucket> = Vec::with_capacity(max_buckets);
    for bucket in sorted {
        match merged.last_mut() {
            Some(last) if (last.count as u64) < target || last.is_overlapping(bucket) => {
                *last = last.merge(bucket)?;
            }
            _ => merged.push(*bucket),
        }
    }
    // every bucket but the last holds at least `target`, so only a trailing
    // partial bucket can leave the list at capacity
    if merged.len() >= max_buckets {
        if let Some(tail) = merged.pop() {
            if let Some(last) = merged.last_mut() {
                *last = last.merge(&tail)?;
            }
        }
    }
    log::trace!(
        "compacted {} buckets into {} (target size {}, {} observations)",
        sorted.len(),
        merged.len(),
        target,
        observations
    );

    let total = merged.iter().map(|b| b.count as u64).sum::<u64>();
    if total != observations {
        log::error!("bucket counts sum to {} but {} observations were recorded", total, observations);
        return Err(Error::Invariant("bucket counts do not sum to the observation count"));
    }
    if merged.len() >= max_buckets {
        log::error!("compaction left {} buckets, capacity is {}", merged.len(), max_buckets);
        return Err(Error::Invariant("compaction left the histogram at capacity"));
    }
    Ok(merged)
}

/// A read-only view over a compacted bucket list.
///
/// All rank arithmetic happens here so that a single borrow of the bucket list
/// can answer several queries.
pub(crate) struct Ranked<'a> {
    pub(crate) buckets: &'a [Bucket],
    pub(crate) observations: u64,
}

impl<'a> Ranked<'a> {
    pub(crate) fn new(buckets: &'a [Bucket], observations: u64) -> Self {
        Ranked { buckets, observations }
    }

    pub(crate) fn by_rank(&self, rank: u64) -> Result<u64, Error> {
        if self.observations == 0 {
            return Ok(0);
        }
        let mut remaining = rank.clamp(1, self.observations);
        for bucket in self.buckets {
            if bucket.contains_rank(remaining) {
                return Ok(bucket.rank(remaining));
            }
            remaining -= bucket.count as u64;
        }
        log::error!("rank {} is past the last bucket ({} observations)", rank, self.observations);
        Err(Error::Invariant("rank walk ran past the last bucket"))
    }

    pub(crate) fn min(&self) -> u64 {
        self.buckets.first().map(|b| b.min()).unwrap_or(0)
    }

    pub(crate) fn max(&self) -> u64 {
        self.buckets.last().map(|b| b.max()).unwrap_or(0)
    }
}
