//! ADC pedestal accumulation.
//!
//! During pedestal events every raw pulse integral is folded into a
//! per-channel running sum. Samples above an adaptive ceiling are ignored
//! so that physics signal does not pull the pedestal up. Once a fifth of
//! the nominal sample size has been collected the ceiling drops to
//! `limit_margin + average`.

use hodoscope_core::{PedestalConfig, RawPaddleHit, Side};
use log::{info, warn};

/// Running pedestal statistics for one PMT.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PedestalAccumulator {
    sum: i64,
    sum2: i64,
    count: u32,
    limit: i32,
}

impl PedestalAccumulator {
    #[must_use]
    pub fn new(initial_limit: i32) -> Self {
        Self {
            sum: 0,
            sum2: 0,
            count: 0,
            limit: initial_limit,
        }
    }

    /// Add a sample; returns whether it was below the ceiling.
    pub fn accumulate(&mut self, sample: i32, config: &PedestalConfig) -> bool {
        if sample > self.limit {
            return false;
        }
        let s = i64::from(sample);
        self.sum += s;
        self.sum2 += s * s;
        self.count += 1;
        if self.count == config.min_events / 5 {
            let average = self.sum / i64::from(self.count);
            self.limit = config
                .limit_margin
                .saturating_add(i32::try_from(average).unwrap_or(i32::MAX));
        }
        true
    }

    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[must_use]
    pub fn sum(&self) -> i64 {
        self.sum
    }

    #[must_use]
    pub fn limit(&self) -> i32 {
        self.limit
    }

    /// Mean of the accepted samples, 0 when there are none.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average(&self) -> f64 {
        self.sum as f64 / f64::from(self.count.max(1))
    }

    /// Spread of the accepted samples.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn rms(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = f64::from(self.count);
        let mean = self.sum as f64 / n;
        (self.sum2 as f64 / n - mean * mean).max(0.0).sqrt()
    }
}

/// Frozen pedestal of one PMT.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChannelPedestal {
    pub pedestal: f64,
    pub threshold: f64,
}

/// Pedestal state for every PMT of one plane.
#[derive(Clone, Debug)]
pub struct PlanePedestals {
    plane_number: u32,
    config: PedestalConfig,
    pos: Vec<PedestalAccumulator>,
    neg: Vec<PedestalAccumulator>,
    pos_frozen: Vec<ChannelPedestal>,
    neg_frozen: Vec<ChannelPedestal>,
}

impl PlanePedestals {
    #[must_use]
    pub fn new(plane_number: u32, n_paddles: usize, config: PedestalConfig) -> Self {
        let acc = PedestalAccumulator::new(config.initial_limit);
        Self {
            plane_number,
            pos: vec![acc.clone(); n_paddles],
            neg: vec![acc; n_paddles],
            pos_frozen: vec![ChannelPedestal::default(); n_paddles],
            neg_frozen: vec![ChannelPedestal::default(); n_paddles],
            config,
        }
    }

    /// Fold the first-pulse integrals of this plane's raw hits into the sums.
    pub fn accumulate(&mut self, hits: &[RawPaddleHit]) {
        for hit in hits {
            let Some(index) = hit.paddle_index().filter(|&i| i < self.pos.len()) else {
                warn!(
                    "Plane {}: pedestal hit with paddle {} out of range",
                    self.plane_number, hit.paddle
                );
                continue;
            };
            for side in Side::BOTH {
                if let Some(sample) = hit.adc(side).first_pulse_int_raw() {
                    let acc = match side {
                        Side::Positive => &mut self.pos[index],
                        Side::Negative => &mut self.neg[index],
                    };
                    acc.accumulate(sample, &self.config);
                }
            }
        }
    }

    /// Compute pedestals and thresholds from the accumulated sums.
    pub fn finalize(&mut self) {
        let margin = self.config.threshold_margin;
        let mut empty = 0usize;
        for (acc, frozen) in self
            .pos
            .iter()
            .zip(self.pos_frozen.iter_mut())
            .chain(self.neg.iter().zip(self.neg_frozen.iter_mut()))
        {
            if acc.count() == 0 {
                empty += 1;
            }
            let pedestal = acc.average();
            *frozen = ChannelPedestal {
                pedestal,
                threshold: pedestal + margin,
            };
        }
        if empty > 0 {
            warn!(
                "Plane {}: {} channels without pedestal samples, pedestal set to 0",
                self.plane_number, empty
            );
        }
        info!("Plane {}: pedestals computed", self.plane_number);
    }

    #[must_use]
    pub fn accumulator(&self, side: Side, index: usize) -> &PedestalAccumulator {
        match side {
            Side::Positive => &self.pos[index],
            Side::Negative => &self.neg[index],
        }
    }

    /// Frozen pedestal for a paddle side (0 before the first finalize).
    #[must_use]
    pub fn pedestal(&self, side: Side, index: usize) -> f64 {
        self.channel(side, index).pedestal
    }

    #[must_use]
    pub fn channel(&self, side: Side, index: usize) -> ChannelPedestal {
        match side {
            Side::Positive => self.pos_frozen[index],
            Side::Negative => self.neg_frozen[index],
        }
    }
}
