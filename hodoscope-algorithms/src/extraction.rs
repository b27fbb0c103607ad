//! Raw paddle hits to calibrated hits for one plane.
//!
//! For each raw hit the extractor picks the first in-window TDC entry per
//! side, matches an ADC pulse (or aggregate integral) according to the
//! configured [`AdcMode`], and records the hit if at least one side has
//! both. Recorded hits then get time-walk, pulse-height and light
//! propagation corrections and the nominal flight time to the plane
//! removed.

use hodoscope_core::constants::NO_ADC_INTEGRAL;
use hodoscope_core::{
    AdcMode, AdcSignal, CalibratedPaddleHit, HodoscopeConfig, PaddleCalibration, PlaneConfig,
    PlaneCounters, RawPaddleHit, Side, SideCalibration, TimeCorrectionMode, TimingConfig,
};
use log::warn;

use crate::pedestal::PlanePedestals;
use crate::timing::{fadc_offset, inverse_adc_time, time_walk};

/// End of the contiguous run of hits belonging to plane `number`,
/// starting at `start`.
#[must_use]
pub fn plane_run(hits: &[RawPaddleHit], start: usize, number: u32) -> usize {
    hits[start.min(hits.len())..]
        .iter()
        .position(|h| h.plane != number)
        .map_or(hits.len(), |n| start + n)
}

/// Turns one plane's raw hits into calibrated hits.
pub struct HitExtractor<'a> {
    plane: &'a PlaneConfig,
    plane_index: usize,
    timing: &'a TimingConfig,
    config: &'a HodoscopeConfig,
}

impl<'a> HitExtractor<'a> {
    /// # Panics
    /// Panics if `plane_index` is not a configured plane.
    #[must_use]
    pub fn new(config: &'a HodoscopeConfig, plane_index: usize) -> Self {
        Self {
            plane: &config.planes[plane_index],
            plane_index,
            timing: &config.timing,
            config,
        }
    }

    /// Extract calibrated hits, in raw-hit order.
    pub fn extract(
        &self,
        raw: &[RawPaddleHit],
        pedestals: &PlanePedestals,
    ) -> (Vec<CalibratedPaddleHit>, PlaneCounters) {
        let mut counters = PlaneCounters::default();
        let mut hits = Vec::new();

        for raw_hit in raw {
            counters.raw_hits += 1;
            let Some(index) = raw_hit
                .paddle_index()
                .filter(|&i| i < self.plane.n_paddles())
            else {
                warn!(
                    "Plane {}: paddle {} out of range, hit skipped",
                    self.plane.name, raw_hit.paddle
                );
                continue;
            };
            if let Some(hit) = self.extract_one(raw_hit, index, pedestals, &mut counters) {
                hits.push(hit);
            }
        }
        (hits, counters)
    }

    fn extract_one(
        &self,
        raw: &RawPaddleHit,
        index: usize,
        pedestals: &PlanePedestals,
        counters: &mut PlaneCounters,
    ) -> Option<CalibratedPaddleHit> {
        let cal = self.config.calibration.get(self.plane_index, index);
        let mut hit = CalibratedPaddleHit::new(raw.paddle, self.plane.pos_center[index]);

        for side in Side::BOTH {
            let tdc = self.select_tdc(raw, side);
            let adc = self.select_adc(
                raw,
                side,
                tdc,
                cal.side(side),
                pedestals.pedestal(side, index),
                counters,
            );

            if !raw.tdc(side).is_empty() {
                *raw_tdc_counter(counters, side) += 1;
            }
            if !raw.adc(side).pulses.is_empty() {
                *raw_adc_counter(counters, side) += 1;
            }
            if adc.map_or(NO_ADC_INTEGRAL, |a| a.integral) >= self.timing.adc_diag_cut {
                match side {
                    Side::Positive => counters.pos_adc_diag_hits += 1,
                    Side::Negative => counters.neg_adc_diag_hits += 1,
                }
            }

            let signal = hit.side_mut(side);
            signal.tdc = tdc;
            signal.adc = adc;
        }

        if !(hit.pos.is_good() || hit.neg.is_good()) {
            return None;
        }

        for side in Side::BOTH {
            let signal = hit.side(side);
            if signal.adc.is_some_and(|a| a.pulse_used.is_some()) {
                match side {
                    Side::Positive => counters.good_pos_adc_hits += 1,
                    Side::Negative => counters.good_neg_adc_hits += 1,
                }
            }
            if signal.has_tdc() {
                match side {
                    Side::Positive => counters.good_pos_tdc_hits += 1,
                    Side::Negative => counters.good_neg_tdc_hits += 1,
                }
            }
        }

        self.correct_times(&mut hit, cal, index);
        Some(hit)
    }

    /// First multi-hit entry inside the TDC window.
    fn select_tdc(&self, raw: &RawPaddleHit, side: Side) -> Option<i32> {
        raw.tdc(side)
            .iter()
            .map(|t| t.time + self.plane.tdc_offset)
            .find(|&t| self.timing.tdc_in_window(t))
    }

    fn select_adc(
        &self,
        raw: &RawPaddleHit,
        side: Side,
        tdc: Option<i32>,
        cal: &SideCalibration,
        pedestal: f64,
        counters: &mut PlaneCounters,
    ) -> Option<AdcSignal> {
        let channel = raw.adc(side);
        let multiplicity = channel.pulses.len();
        match self.timing.adc_mode {
            AdcMode::DynamicPedestal => {
                let tdc_time = f64::from(tdc?) * self.timing.tdc_to_time;
                counters.adc_errors += channel.pulses.iter().filter(|p| p.amp_raw <= 0).count();
                channel
                    .pulses
                    .iter()
                    .enumerate()
                    .find_map(|(i, pulse)| {
                        let time = pulse.time + self.plane.adc_tdc_offset;
                        let diff = tdc_time - time;
                        (pulse.amp_raw > 0 && cal.in_adc_window(diff)).then_some(AdcSignal {
                            pedestal: pulse.ped,
                            integral: pulse.int,
                            amplitude: Some(pulse.amp),
                            time: Some(time),
                            tdc_diff_time: Some(diff),
                            multiplicity,
                            pulse_used: Some(i + 1),
                        })
                    })
            }
            AdcMode::SampleIntegral => Some(AdcSignal::aggregate(
                pedestal,
                channel.sample_int_raw - pedestal,
                multiplicity,
            )),
            AdcMode::SampleIntegralDynamicPedestal => {
                let firmware_ped = channel.pulses.first().map_or(0.0, |p| p.ped);
                Some(AdcSignal::aggregate(
                    firmware_ped,
                    channel.sample_int,
                    multiplicity,
                ))
            }
            AdcMode::Standard => {
                let int_raw = f64::from(channel.first_pulse_int_raw().unwrap_or(0));
                Some(AdcSignal::aggregate(
                    pedestal,
                    int_raw - pedestal,
                    multiplicity,
                ))
            }
        }
    }

    fn correct_times(&self, hit: &mut CalibratedPaddleHit, cal: &PaddleCalibration, index: usize) {
        let tdc_to_time = self.timing.tdc_to_time;
        let mut walk = [0.0; 2];
        let mut pulse_corrected = [0.0; 2];

        for (i, side) in Side::BOTH.into_iter().enumerate() {
            let side_cal = cal.side(side);
            let signal = hit.side_mut(side);
            let (Some(tdc), Some(adc)) = (signal.tdc, signal.adc) else {
                continue;
            };
            let time = f64::from(tdc) * tdc_to_time;
            walk[i] = time_walk(
                signal.amplitude(),
                self.timing.tdc_threshold,
                side_cal.walk_c2,
            );
            signal.uncorrected_time = time;
            signal.walk_corrected_time = time - walk[i];
            pulse_corrected[i] = match self.timing.mode {
                TimeCorrectionMode::InverseAdc => inverse_adc_time(time, side_cal, adc.integral),
                TimeCorrectionMode::Fadc => time - walk[i] + fadc_offset(cal, side),
            };
        }

        if !hit.both_sides_good() {
            // Only one end: no position correction possible.
            for (i, side) in Side::BOTH.into_iter().enumerate() {
                let signal = hit.side_mut(side);
                if signal.is_good() {
                    signal.corrected_time = pulse_corrected[i];
                    signal.tof_corrected_time = pulse_corrected[i];
                }
            }
            hit.scin_corrected_time = 0.0;
            return;
        }

        let [mut time_pos, mut time_neg] = pulse_corrected;
        let walk_diff =
            hit.neg.walk_corrected_time - 2.0 * cal.cable_fit - hit.pos.walk_corrected_time;
        hit.diff_dist_track = Some(0.5 * walk_diff * cal.vel_fit);

        let distance = 0.5 * (time_neg - time_pos) * cal.vel_light;
        let position = (self.plane.bar_center() + distance)
            .min(self.plane.pos_left)
            .max(self.plane.pos_right);
        hit.hit_position = Some(position);

        let scin_time = match self.timing.mode {
            TimeCorrectionMode::InverseAdc => {
                time_pos -= (self.plane.pos_left - position) / cal.pos.invadc_linear;
                time_neg -= (position - self.plane.pos_right) / cal.neg.invadc_linear;
                0.5 * (time_pos + time_neg)
            }
            TimeCorrectionMode::Fadc => {
                let mean = 0.5 * (time_pos + time_neg);
                time_pos = mean;
                time_neg = mean;
                mean
            }
        };

        let flight = self.timing.nominal_flight_time(self.plane.paddle_z(index));
        hit.scin_corrected_time = scin_time;
        hit.pos.corrected_time = time_pos;
        hit.neg.corrected_time = time_neg;
        hit.pos.tof_corrected_time = time_pos - flight;
        hit.neg.tof_corrected_time = time_neg - flight;
    }
}

fn raw_tdc_counter(counters: &mut PlaneCounters, side: Side) -> &mut usize {
    match side {
        Side::Positive => &mut counters.raw_pos_tdc_hits,
        Side::Negative => &mut counters.raw_neg_tdc_hits,
    }
}

fn raw_adc_counter(counters: &mut PlaneCounters, side: Side) -> &mut usize {
    match side {
        Side::Positive => &mut counters.raw_pos_adc_pulses,
        Side::Negative => &mut counters.raw_neg_adc_pulses,
    }
}
