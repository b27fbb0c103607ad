//! Per-track time of flight and velocity.
//!
//! For each track the hits of the beta planes are tested against the
//! track projection. On-track hits get their PMT times recomputed with
//! the projected position along the bar, are moved back to the reference
//! plane with the flight time expected for the track, and histogrammed.
//! Times that agree with the histogram peak enter the focal-plane time
//! average and the velocity fit.
#![allow(clippy::cast_precision_loss)]

use hodoscope_core::constants::{
    empty_plane_fp_time, CHISQ_INSUFFICIENT_PLANES, NO_ADC_INTEGRAL, SPEED_OF_LIGHT,
};
use hodoscope_core::{
    CalibratedPaddleHit, FitStatus, GoodFlags, HodoscopeConfig, PaddleCalibration, PlaneConfig,
    Side, TimeCorrectionMode, TofHitInfo, Track, TrackTof,
};

use crate::fit::{fit_beta, TimedPoint};
use crate::focal_plane::covers_both_views;
use crate::histogram::TimeHistogram;
use crate::plane::Plane;
use crate::timing::{fadc_offset, inverse_adc_term, time_walk};

/// Fits beta and the focal-plane time for one track at a time.
pub struct TrackTofFitter<'a> {
    config: &'a HodoscopeConfig,
}

impl<'a> TrackTofFitter<'a> {
    #[must_use]
    pub fn new(config: &'a HodoscopeConfig) -> Self {
        Self { config }
    }

    /// Time of flight for `track` using the hits of the beta planes.
    ///
    /// `histogram` is working storage; it is reset before use.
    pub fn fit(&self, track: &Track, planes: &[Plane], histogram: &mut TimeHistogram) -> TrackTof {
        let n_beta = self.config.n_beta_planes().min(planes.len());
        let mut result = TrackTof {
            good_plane_time: vec![false; n_beta],
            good_flags: planes[..n_beta]
                .iter()
                .map(|p| vec![GoodFlags::default(); p.n_hits()])
                .collect(),
            ..TrackTof::default()
        };

        histogram.reset();
        let mut infos = Vec::new();
        for (ip, plane) in planes.iter().enumerate().take(n_beta) {
            let plane_config = &self.config.planes[ip];
            for (ih, hit) in plane.hits().iter().enumerate() {
                let info = self.project(track, ip, plane_config, ih, hit);
                if info.tdc_time_pos.is_some() {
                    histogram.fill(info.time_pos);
                }
                if info.tdc_time_neg.is_some() {
                    histogram.fill(info.time_neg);
                }
                infos.push(info);
            }
        }

        let center = histogram.peak_time();
        let tolerance = self.config.timing.tof_tolerance;
        let in_window = |t: f64| t > center - tolerance && t < center + tolerance;
        for info in &mut infos {
            info.keep_pos = in_window(info.time_pos);
            info.keep_neg = in_window(info.time_neg);
        }

        let mode = self.config.timing.mode;
        let mut points = Vec::new();
        let mut plane_sum = vec![0.0; n_beta];
        let mut plane_count = vec![0usize; n_beta];
        for info in &infos {
            if !info.on_track {
                continue;
            }
            let flags = &mut result.good_flags[info.plane][info.hit];
            flags.on_track = true;
            flags.good_tdc_pos = info.keep_pos;
            flags.good_tdc_neg = info.keep_neg;

            let cal = self
                .config
                .calibration
                .get(info.plane, info.paddle as usize - 1);
            let (scin_time, fp_time, sigma, n_pmt, dedx) = match (info.keep_pos, info.keep_neg) {
                (true, true) => (
                    0.5 * (info.scin_pos_time + info.scin_neg_time),
                    0.5 * (info.time_pos + info.time_neg),
                    cal.combined_sigma(mode),
                    2,
                    (info.adc_pos * info.adc_neg).max(0.0).sqrt(),
                ),
                (true, false) => (
                    info.scin_pos_time,
                    info.time_pos,
                    cal.pos.timing_sigma(mode),
                    1,
                    info.adc_pos.max(0.0),
                ),
                (false, true) => (
                    info.scin_neg_time,
                    info.time_neg,
                    cal.neg.timing_sigma(mode),
                    1,
                    info.adc_neg.max(0.0),
                ),
                (false, false) => continue,
            };
            flags.good_scin_time = true;

            plane_sum[info.plane] += fp_time;
            plane_count[info.plane] += 1;
            result.n_scin_hit += 1;
            result.n_pmt_hit += n_pmt;
            result.dedx_per_hit.push(dedx);
            result.good_plane_time[info.plane] = true;
            points.push(TimedPoint::new(info.z, scin_time, sigma));
        }

        result.good_plane3 = result.good_plane_time.get(2).copied().unwrap_or(false);
        result.good_plane4 = n_beta == 4 && result.good_plane_time[3];

        if covers_both_views(&result.good_plane_time) {
            let fit = fit_beta(&points, track.path_norm());
            result.beta = fit.beta;
            result.beta_chisq = fit.chisq;
            result.fit_status = fit.status;
        } else {
            result.beta = 0.0;
            result.beta_chisq = CHISQ_INSUFFICIENT_PLANES;
            result.fit_status = FitStatus::InsufficientPlanes;
        }

        let total: f64 = plane_sum.iter().sum();
        let count: usize = plane_count.iter().sum();
        if count > 0 {
            result.fp_time = total / count as f64;
            result.fp_time_all = result.fp_time;
        }
        result.plane_fp_time = plane_sum
            .iter()
            .zip(&plane_count)
            .enumerate()
            .map(|(ip, (&sum, &n))| {
                if n > 0 {
                    sum / n as f64
                } else {
                    empty_plane_fp_time(ip)
                }
            })
            .collect();
        result.dedx = result.dedx_per_hit.first().copied().unwrap_or(0.0);
        result.hit_info = infos;
        result
    }

    /// Track projection and corrected times for one hit.
    fn project(
        &self,
        track: &Track,
        ip: usize,
        plane: &PlaneConfig,
        ih: usize,
        hit: &CalibratedPaddleHit,
    ) -> TofHitInfo {
        let mut info = TofHitInfo::new(ip, ih, hit.paddle);
        let index = hit.index();
        let z = plane.paddle_z(index);
        info.z = z;

        let (x, y) = track.position_at(z);
        let (transverse, longitudinal) = plane.view.split(x, y);
        if (plane.paddle_position(index) - transverse).abs() >= 0.5 * plane.size + plane.slop {
            return info;
        }
        info.on_track = true;

        let path_norm = track.path_norm();
        let zcor = if self.config.timing.cosmic {
            -z / SPEED_OF_LIGHT * path_norm
        } else {
            z / (SPEED_OF_LIGHT * track.beta()) * path_norm
        };
        info.zcor = zcor;

        let cal = self.config.calibration.get(ip, index);
        for side in Side::BOTH {
            let signal = hit.side(side);
            let Some(tdc) = signal.tdc else {
                continue;
            };
            let tdc_time = f64::from(tdc) * self.config.timing.tdc_to_time;
            let adc = signal.adc.map_or(NO_ADC_INTEGRAL, |a| a.integral);
            let (path, scin_time) =
                self.side_time(plane, cal, side, tdc_time, adc, signal.amplitude(), longitudinal);
            match side {
                Side::Positive => {
                    info.tdc_time_pos = Some(tdc_time);
                    info.adc_pos = adc;
                    info.path_pos = path;
                    info.scin_pos_time = scin_time;
                    info.time_pos = scin_time - zcor;
                }
                Side::Negative => {
                    info.tdc_time_neg = Some(tdc_time);
                    info.adc_neg = adc;
                    info.path_neg = path;
                    info.scin_neg_time = scin_time;
                    info.time_neg = scin_time - zcor;
                }
            }
        }
        info
    }

    /// Light path to the PMT and corrected time at the paddle.
    #[allow(clippy::too_many_arguments)]
    fn side_time(
        &self,
        plane: &PlaneConfig,
        cal: &PaddleCalibration,
        side: Side,
        tdc_time: f64,
        adc: f64,
        amplitude: f64,
        longitudinal: f64,
    ) -> (f64, f64) {
        let side_cal = cal.side(side);
        match self.config.timing.mode {
            TimeCorrectionMode::InverseAdc => {
                let path = match side {
                    Side::Positive => plane.pos_left - longitudinal,
                    Side::Negative => longitudinal - plane.pos_right,
                };
                let time = tdc_time
                    - (inverse_adc_term(side_cal, adc) + path / side_cal.invadc_linear);
                (path, time)
            }
            TimeCorrectionMode::Fadc => {
                let walk = time_walk(amplitude, self.config.timing.tdc_threshold, side_cal.walk_c2);
                let propagation = match side {
                    Side::Positive => longitudinal / cal.vel_fit,
                    Side::Negative => -longitudinal / cal.vel_fit,
                };
                let time = tdc_time - walk + fadc_offset(cal, side) + propagation;
                (longitudinal, time)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hodoscope_core::{PedestalConfig, PlaneCounters, TimingConfig};

    fn setup(mode: TimeCorrectionMode) -> (HodoscopeConfig, Vec<Plane>) {
        setup_with(TimingConfig::default().with_mode(mode), [0.0, 10.0, 20.0, 30.0])
    }

    fn setup_with(timing: TimingConfig, z: [f64; 4]) -> (HodoscopeConfig, Vec<Plane>) {
        let planes = ["1x", "1y", "2x", "2y"]
            .iter()
            .zip(1..)
            .zip(z)
            .map(|((name, number), z)| PlaneConfig::new(*name, number, 8).with_z(z, 0.0))
            .collect();
        let config = HodoscopeConfig::new(planes).with_timing(
            timing
                .with_tdc_to_time(1.0e-6)
                .with_tdc_window(0.0, 2.0e9),
        );
        let state = config
            .planes
            .iter()
            .enumerate()
            .map(|(i, p)| Plane::new(i, p, PedestalConfig::default()))
            .collect();
        (config, state)
    }

    /// Hit with the given PMT times (ns) and matched ADC signals.
    fn hit_at(
        config: &HodoscopeConfig,
        ip: usize,
        paddle: u32,
        pos: Option<f64>,
        neg: Option<f64>,
    ) -> CalibratedPaddleHit {
        let center = config.planes[ip].pos_center[paddle as usize - 1];
        let mut hit = CalibratedPaddleHit::new(paddle, center);
        for (side, time) in [(Side::Positive, pos), (Side::Negative, neg)] {
            if let Some(t) = time {
                let signal = hit.side_mut(side);
                #[allow(clippy::cast_possible_truncation)]
                let counts = (t / config.timing.tdc_to_time).round() as i32;
                signal.tdc = Some(counts);
                signal.adc = Some(hodoscope_core::AdcSignal {
                    amplitude: Some(200.0),
                    ..hodoscope_core::AdcSignal::aggregate(0.0, 400.0, 1)
                });
            }
        }
        hit
    }

    fn central_track() -> Track {
        // beta = 1 / sqrt(1 + 0.44) = 1 / 1.2
        Track::new(0.0, 0.0, 0.0, 0.0).with_momentum(1.0, 0.44_f64.sqrt())
    }

    #[test]
    fn test_fadc_fit_recovers_beta() {
        let (config, mut planes) = setup(TimeCorrectionMode::Fadc);
        let beta = 1.0 / 1.2;
        // paddles 4 and 5 straddle zero; 4 is centred at -3.75
        for ip in 0..4 {
            let z = config.planes[ip].z_pos;
            let t = 5.0 + z / (beta * SPEED_OF_LIGHT);
            planes[ip].set_hits(
                vec![hit_at(&config, ip, 4, Some(t), Some(t))],
                PlaneCounters::default(),
            );
        }
        let mut histogram = TimeHistogram::coarse();
        let tof = TrackTofFitter::new(&config).fit(&central_track(), &planes, &mut histogram);

        assert_eq!(tof.fit_status, FitStatus::Fitted);
        assert_relative_eq!(tof.beta, beta, epsilon = 1e-4);
        assert!(tof.good_plane_time.iter().all(|&g| g));
        assert!(tof.good_plane3 && tof.good_plane4);
        assert_eq!(tof.n_scin_hit, 4);
        assert_eq!(tof.n_pmt_hit, 8);
        assert_eq!(tof.dedx_per_hit.len(), 4);
        assert_relative_eq!(tof.dedx, 400.0);
        // the track beta matches the hit timing, so every hit projects to t0
        assert_relative_eq!(tof.fp_time, 5.0, epsilon = 1e-3);
        assert_relative_eq!(tof.fp_time_all, tof.fp_time);
        for ip in 0..4 {
            assert_relative_eq!(tof.plane_fp_time[ip], 5.0, epsilon = 1e-3);
            assert!(tof.flags(ip, 0).good_scin_time);
        }
    }

    #[test]
    fn test_off_track_hits_are_ignored() {
        let (config, mut planes) = setup(TimeCorrectionMode::Fadc);
        for ip in 0..4 {
            let t = 10.0 + config.planes[ip].z_pos / SPEED_OF_LIGHT;
            planes[ip].set_hits(
                vec![
                    hit_at(&config, ip, 4, Some(t), Some(t)),
                    hit_at(&config, ip, 8, Some(t), Some(t)),
                ],
                PlaneCounters::default(),
            );
        }
        let mut histogram = TimeHistogram::coarse();
        let track = Track::new(0.0, 0.0, 0.0, 0.0).with_momentum(1.0, 0.0);
        let tof = TrackTofFitter::new(&config).fit(&track, &planes, &mut histogram);

        assert_eq!(tof.n_scin_hit, 4);
        for ip in 0..4 {
            assert_eq!(tof.good_flags[ip].len(), 2);
            assert!(tof.flags(ip, 0).on_track);
            assert!(!tof.flags(ip, 1).on_track);
            assert!(!tof.flags(ip, 1).good_scin_time);
        }
        assert_relative_eq!(tof.beta, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_one_view_only_is_insufficient() {
        let (config, mut planes) = setup(TimeCorrectionMode::Fadc);
        for (ip, t) in [(0, 20.0), (1, 20.3)] {
            planes[ip].set_hits(
                vec![hit_at(&config, ip, 4, Some(t), Some(t))],
                PlaneCounters::default(),
            );
        }
        let mut histogram = TimeHistogram::coarse();
        let tof = TrackTofFitter::new(&config).fit(&central_track(), &planes, &mut histogram);

        assert_eq!(tof.fit_status, FitStatus::InsufficientPlanes);
        assert_relative_eq!(tof.beta_chisq, -1.0);
        assert_relative_eq!(tof.beta, 0.0);
        assert!(!tof.good_plane3);
        assert_relative_eq!(tof.plane_fp_time[2], 3000.0);
        assert_relative_eq!(tof.plane_fp_time[3], 4000.0);
    }

    #[test]
    fn test_no_hits_keeps_sentinels() {
        let (config, planes) = setup(TimeCorrectionMode::InverseAdc);
        let mut histogram = TimeHistogram::coarse();
        let tof = TrackTofFitter::new(&config).fit(&central_track(), &planes, &mut histogram);

        assert_relative_eq!(tof.fp_time, 0.0);
        assert_relative_eq!(tof.fp_time_all, -1000.0);
        assert_relative_eq!(tof.dedx, 0.0);
        assert_eq!(tof.n_pmt_hit, 0);
        assert!(tof.good_flags.iter().all(Vec::is_empty));
        assert!(tof.dedx_per_hit.is_empty());
    }

    #[test]
    fn test_single_ended_hits_count_one_pmt() {
        let (config, mut planes) = setup(TimeCorrectionMode::InverseAdc);
        for ip in 0..4 {
            planes[ip].set_hits(
                vec![hit_at(&config, ip, 4, Some(30.0 + ip as f64 * 0.1), None)],
                PlaneCounters::default(),
            );
        }
        let mut histogram = TimeHistogram::coarse();
        let tof = TrackTofFitter::new(&config).fit(&central_track(), &planes, &mut histogram);

        assert_eq!(tof.n_pmt_hit, 4);
        assert!(tof.flags(0, 0).good_tdc_pos);
        assert!(!tof.flags(0, 0).good_tdc_neg);
        assert_relative_eq!(tof.dedx, 400.0);
        // path to the positive PMT in inverse-ADC mode is left edge minus position
        assert_relative_eq!(tof.hit_info[0].path_pos, 60.0);
        assert!(tof.hit_info[0].tdc_time_neg.is_none());
    }

    #[test]
    fn test_good_flags_sized_by_plane_hits() {
        let (config, mut planes) = setup(TimeCorrectionMode::Fadc);
        planes[0].set_hits(
            vec![
                hit_at(&config, 0, 3, Some(20.0), Some(20.0)),
                hit_at(&config, 0, 4, Some(20.0), Some(20.0)),
                hit_at(&config, 0, 5, Some(20.0), Some(20.0)),
            ],
            PlaneCounters::default(),
        );
        planes[2].set_hits(
            vec![hit_at(&config, 2, 4, Some(20.8), Some(20.8))],
            PlaneCounters::default(),
        );
        let mut histogram = TimeHistogram::coarse();
        let tof = TrackTofFitter::new(&config).fit(&central_track(), &planes, &mut histogram);

        let sizes: Vec<usize> = tof.good_flags.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 0, 1, 0]);
        assert_eq!(tof.dedx_per_hit.len(), tof.n_scin_hit);
    }

    #[test]
    fn test_inverse_adc_fit_recovers_beta() {
        let (config, mut planes) = setup(TimeCorrectionMode::InverseAdc);
        let beta = 1.0 / 1.2;
        // central track: 60 cm of light path to either PMT at 15 cm/ns
        let propagation = 60.0 / 15.0;
        for ip in 0..4 {
            let z = config.planes[ip].z_pos;
            let t = 5.0 + propagation + z / (beta * SPEED_OF_LIGHT);
            planes[ip].set_hits(
                vec![hit_at(&config, ip, 4, Some(t), Some(t))],
                PlaneCounters::default(),
            );
        }
        let mut histogram = TimeHistogram::coarse();
        let tof = TrackTofFitter::new(&config).fit(&central_track(), &planes, &mut histogram);

        assert_eq!(tof.fit_status, FitStatus::Fitted);
        assert_relative_eq!(tof.beta, beta, epsilon = 1e-4);
        assert_relative_eq!(tof.fp_time, 5.0, epsilon = 1e-3);
        assert_eq!(tof.n_pmt_hit, 8);
        for info in &tof.hit_info {
            assert_relative_eq!(info.path_pos, 60.0);
            assert_relative_eq!(info.path_neg, 60.0);
            assert_relative_eq!(info.scin_pos_time, info.scin_neg_time, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_cosmic_zcor_ignores_track_beta() {
        let timing = TimingConfig::default()
            .with_mode(TimeCorrectionMode::Fadc)
            .with_cosmic(true);
        let (config, mut planes) = setup_with(timing, [0.0, 10.0, 20.0, 30.0]);
        for ip in 0..4 {
            let t = 40.0 - config.planes[ip].z_pos / SPEED_OF_LIGHT;
            planes[ip].set_hits(
                vec![hit_at(&config, ip, 4, Some(t), Some(t))],
                PlaneCounters::default(),
            );
        }
        let fitter = TrackTofFitter::new(&config);
        let mut histogram = TimeHistogram::coarse();
        let slow = fitter.fit(&central_track(), &planes, &mut histogram);
        let fast = fitter.fit(
            &Track::new(0.0, 0.0, 0.0, 0.0).with_momentum(1.0, 0.0),
            &planes,
            &mut histogram,
        );

        for ip in 0..4 {
            let z = config.planes[ip].z_pos;
            assert_relative_eq!(slow.hit_info[ip].zcor, -z / SPEED_OF_LIGHT, epsilon = 1e-12);
            assert_relative_eq!(fast.hit_info[ip].zcor, slow.hit_info[ip].zcor);
            assert_relative_eq!(
                slow.hit_info[ip].time_pos,
                slow.hit_info[ip].scin_pos_time + z / SPEED_OF_LIGHT,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_planes_at_one_z_give_degenerate_fit() {
        let (config, mut planes) =
            setup_with(TimingConfig::default().with_mode(TimeCorrectionMode::Fadc), [10.0; 4]);
        for (ip, plane) in planes.iter_mut().enumerate() {
            plane.set_hits(
                vec![hit_at(&config, ip, 4, Some(20.0), Some(20.0))],
                PlaneCounters::default(),
            );
        }
        let mut histogram = TimeHistogram::coarse();
        let tof = TrackTofFitter::new(&config).fit(&central_track(), &planes, &mut histogram);

        assert!(tof.good_plane_time.iter().all(|&g| g));
        assert_eq!(tof.fit_status, FitStatus::Degenerate);
        assert_relative_eq!(tof.beta, 0.0);
        assert_relative_eq!(tof.beta_chisq, -2.0);
        // the focal-plane time does not depend on the fit
        assert_eq!(tof.n_scin_hit, 4);
        assert!(tof.fp_time > 0.0);
    }
}
