//! Track-independent focal-plane time and velocity.

use hodoscope_core::{FitStatus, FocalPlaneTime, HodoscopeConfig};

use crate::fit::{fit_beta, TimedPoint};
use crate::histogram::TimeHistogram;
use crate::plane::Plane;

/// At least one good plane in the front pair and one in the back pair.
#[must_use]
pub fn covers_both_views(good_plane_time: &[bool]) -> bool {
    let good = |i: usize| good_plane_time.get(i).copied().unwrap_or(false);
    (good(0) || good(1)) && (good(2) || good(3))
}

/// Estimates the event start time from all planes.
pub struct FocalPlaneEstimator<'a> {
    config: &'a HodoscopeConfig,
}

impl<'a> FocalPlaneEstimator<'a> {
    #[must_use]
    pub fn new(config: &'a HodoscopeConfig) -> Self {
        Self { config }
    }

    /// Flag two-good-time hits, set per-plane focal-plane times and fit
    /// beta without a track.
    ///
    /// `histogram` is working storage; it is reset before use.
    pub fn estimate(&self, planes: &mut [Plane], histogram: &mut TimeHistogram) -> FocalPlaneTime {
        let timing = &self.config.timing;
        let mut result = FocalPlaneTime::default();

        histogram.reset();
        for hit in planes.iter().flat_map(|p| p.hits()) {
            histogram.fill(hit.pos.tof_corrected_time);
            histogram.fill(hit.neg.tof_corrected_time);
        }
        let center = histogram.peak_time();
        result.time_hist_peak = center;
        result.time_hist_sigma = histogram.rms();
        result.time_hist_hits = histogram.integral();

        let lo = center - timing.tof_tolerance;
        let hi = center + timing.tof_tolerance;
        let in_window = |t: f64| t > lo && t < hi;

        let n_beta = self.config.n_beta_planes().min(planes.len());
        let mut good_plane_time = vec![false; n_beta];
        let mut points = Vec::new();
        let mut fp_sum = 0.0;
        let mut n_fp = 0usize;

        for (ip, plane) in planes.iter_mut().enumerate().take(n_beta) {
            let plane_config = &self.config.planes[ip];
            let mut plane_sum = 0.0;
            let mut n_good = 0usize;
            for hit in plane.hits_mut() {
                hit.two_good_times = in_window(hit.pos.tof_corrected_time)
                    && in_window(hit.neg.tof_corrected_time);
                if !hit.two_good_times {
                    continue;
                }
                let index = hit.index();
                let z = plane_config.paddle_z(index);
                let fp_time = hit.scin_corrected_time - timing.nominal_flight_time(z);
                plane_sum += fp_time;
                n_good += 1;

                let sigma = self
                    .config
                    .calibration
                    .get(ip, index)
                    .combined_sigma(timing.mode);
                points.push(TimedPoint::new(z, hit.scin_corrected_time, sigma));
            }
            if n_good > 0 {
                #[allow(clippy::cast_precision_loss)]
                let mean = plane_sum / n_good as f64;
                plane.fp_time = mean;
                good_plane_time[ip] = true;
            }
            plane.n_good_hits = n_good;
            fp_sum += plane_sum;
            n_fp += n_good;
        }

        if n_fp > 0 {
            #[allow(clippy::cast_precision_loss)]
            let start = fp_sum / n_fp as f64;
            result.start_time = start;
            result.good_start_time = true;
        } else {
            result.start_time = timing.start_time_center;
            result.good_start_time = false;
        }

        if covers_both_views(&good_plane_time) {
            let fit = fit_beta(&points, 1.0);
            result.beta_no_track = fit.beta;
            result.beta_no_track_chisq = fit.chisq;
            result.fit_status = fit.status;
            result.good_event_tof_calib = matches!(n_beta, 3 | 4)
                && planes[..n_beta]
                    .iter()
                    .zip(&good_plane_time)
                    .all(|(p, &good)| good && p.n_good_hits == 1);
        } else {
            result.fit_status = FitStatus::InsufficientPlanes;
        }

        histogram.reset();
        result
    }
}
