use super::histogram::{round_div, Ranked};
use super::{Error, Histogram};

/// Number of characters in a default sparkline.
pub const DEFAULT_SPARKLINE_WIDTH: usize = 9;

const STEPS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

impl Ranked<'_> {
    pub(crate) fn sparkline(&self, width: usize) -> String {
        if self.observations == 0 || width == 0 {
            return String::new();
        }
        let min = self.min();
        let range = self.max() - min;
        // `max` lands in the last bin
        let bin_width = if width > 1 { range as f64 / (width - 1) as f64 } else { 0.0 };

        let mut bins = vec![0u64; width];
        for bucket in self.buckets {
            for rank in 1..=bucket.count() as u64 {
                let index = if bin_width > 0.0 {
                    ((bucket.rank(rank) - min) as f64 / bin_width) as usize
                } else {
                    0
                };
                bins[index.min(width - 1)] += 1;
            }
        }

        let tallest = bins.iter().copied().max().unwrap_or(0).max(1);
        bins.iter()
            .map(|height| {
                let step = round_div(height * (STEPS.len() as u64 - 1), tallest) as usize;
                STEPS[step.min(STEPS.len() - 1)]
            })
            .collect()
    }
}

impl Histogram {
    /// Render the distribution as a [DEFAULT_SPARKLINE_WIDTH] character
    /// sparkline, e.g. `▁▂█▃▁▁▁▁▁`.
    pub fn sparkline(&self) -> Result<String, Error> {
        self.sparkline_with_width(DEFAULT_SPARKLINE_WIDTH)
    }
    /// Render the distribution as a sparkline of `width` characters.
    ///
    /// `[min, max]` is cut into `width` equal bins and every observation is
    /// placed by its interpolated value; each bin is drawn as one of eight block
    /// heights relative to the tallest bin.
    ///
    /// This walks every observation, O(count), and is recomputed on each call.
    /// An empty histogram renders as an empty string.
    pub fn sparkline_with_width(&self, width: usize) -> Result<String, Error> {
        let buckets = self.compacted()?;
        Ok(Ranked::new(&buckets, self.observations).sparkline(width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty() -> Result<(), Error> {
        assert_eq!(hist![].sparkline()?, "");
        assert_eq!(hist![1, 2].sparkline_with_width(0)?, "");
        Ok(())
    }

    #[test]
    fn width() -> Result<(), Error> {
        let mut h = Histogram::new();
        for v in 0..5000u64 {
            h.add_observation(v * 31 % 4999)?;
        }
        assert_eq!(h.sparkline()?.chars().count(), DEFAULT_SPARKLINE_WIDTH);
        assert_eq!(h.sparkline_with_width(20)?.chars().count(), 20);
        assert_eq!(h.sparkline_with_width(1)?, "█");
        Ok(())
    }

    #[test]
    fn constant() -> Result<(), Error> {
        let mut h = Histogram::new();
        for _ in 0..1000 {
            h.add_observation(42)?;
        }
        assert_eq!(h.sparkline()?, "█▁▁▁▁▁▁▁▁");
        Ok(())
    }

    #[test]
    fn shape() -> Result<(), Error> {
        // bins of width 1 over [0, 8]
        let h = hist![0, 0, 0, 0, 0, 0, 0, 4, 4, 4, 4, 8];
        assert_eq!(h.sparkline()?, "█▁▁▁▅▁▁▁▂");
        Ok(())
    }
}
