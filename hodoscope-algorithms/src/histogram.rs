//! Coarse timing histogram used to find the event consensus time.
#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]

/// Fixed-binning 1D histogram.
///
/// The peak time is `0.5 * (1-based index of the fullest bin)`. With the
/// default 0.5 ns binning that is the lower edge of the bin; existing
/// calibrations depend on this, so it must not become the bin centre.
#[derive(Clone, Debug)]
pub struct TimeHistogram {
    bins: Vec<f64>,
    lo: f64,
    hi: f64,
    entries: usize,
    sum_x: f64,
    sum_x2: f64,
}

impl TimeHistogram {
    /// Number of bins of the coarse histogram.
    pub const COARSE_BINS: usize = 400;

    #[must_use]
    pub fn new(n_bins: usize, lo: f64, hi: f64) -> Self {
        Self {
            bins: vec![0.0; n_bins.max(1)],
            lo,
            hi,
            entries: 0,
            sum_x: 0.0,
            sum_x2: 0.0,
        }
    }

    /// 400 bins over [0, 200) ns.
    #[must_use]
    pub fn coarse() -> Self {
        Self::new(Self::COARSE_BINS, 0.0, 200.0)
    }

    pub fn reset(&mut self) {
        self.bins.iter_mut().for_each(|b| *b = 0.0);
        self.entries = 0;
        self.sum_x = 0.0;
        self.sum_x2 = 0.0;
    }

    /// Add a value; values outside [lo, hi) only count as entries.
    pub fn fill(&mut self, x: f64) {
        self.entries += 1;
        if !(x >= self.lo && x < self.hi) {
            return;
        }
        let width = (self.hi - self.lo) / self.bins.len() as f64;
        let bin = (((x - self.lo) / width) as usize).min(self.bins.len() - 1);
        self.bins[bin] += 1.0;
        self.sum_x += x;
        self.sum_x2 += x * x;
    }

    /// 1-based index of the first fullest bin (1 when empty).
    #[must_use]
    pub fn maximum_bin(&self) -> usize {
        let mut best = 0;
        for (i, &content) in self.bins.iter().enumerate() {
            if content > self.bins[best] {
                best = i;
            }
        }
        best + 1
    }

    /// Provisional consensus time, `0.5 * maximum_bin()`.
    #[must_use]
    pub fn peak_time(&self) -> f64 {
        0.5 * self.maximum_bin() as f64
    }

    /// Number of in-range fills.
    #[must_use]
    pub fn integral(&self) -> f64 {
        self.bins.iter().sum()
    }

    /// All fills, including under- and overflow.
    #[must_use]
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Standard deviation of the in-range fills.
    #[must_use]
    pub fn rms(&self) -> f64 {
        let n = self.integral();
        if n == 0.0 {
            return 0.0;
        }
        let mean = self.sum_x / n;
        (self.sum_x2 / n - mean * mean).max(0.0).sqrt()
    }
}

impl Default for TimeHistogram {
    fn default() -> Self {
        Self::coarse()
    }
}
