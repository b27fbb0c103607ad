//! Golden-track diagnostics and the TOF calibration dump.
//!
//! Both work on the first track of the event and on the hits it flagged
//! with good times on both PMTs.
#![allow(clippy::cast_precision_loss)]

use hodoscope_core::constants::BIG;
use hodoscope_core::{
    HodoscopeConfig, ParticleId, Side, TofDump, TofDumpRecord, TofHitInfo, Track, TrackTof,
};

use crate::plane::Plane;

/// Where the golden track crosses one plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaneTrackDiagnostics {
    /// Track projection minus the mean centre of the two-ended hits.
    pub hit_distance: f64,
    pub track_x: Option<f64>,
    pub track_y: Option<f64>,
}

impl Default for PlaneTrackDiagnostics {
    fn default() -> Self {
        Self {
            hit_distance: BIG,
            track_x: None,
            track_y: None,
        }
    }
}

/// Fine-processing step run after the per-track fits.
pub struct GoldenTrackProcessor<'a> {
    config: &'a HodoscopeConfig,
}

impl<'a> GoldenTrackProcessor<'a> {
    #[must_use]
    pub fn new(config: &'a HodoscopeConfig) -> Self {
        Self { config }
    }

    /// Per-plane distance between the track and the hits it used.
    #[must_use]
    pub fn plane_diagnostics(
        &self,
        track: &Track,
        tof: &TrackTof,
        planes: &[Plane],
    ) -> Vec<PlaneTrackDiagnostics> {
        (0..tof.good_flags.len().min(planes.len()))
            .map(|ip| {
                let plane_config = &self.config.planes[ip];
                let (mut sum_pos, mut sum_z, mut n) = (0.0, 0.0, 0usize);
                for (hit, flags) in planes[ip].hits().iter().zip(&tof.good_flags[ip]) {
                    if flags.good_tdc_pos && flags.good_tdc_neg {
                        sum_pos += plane_config.paddle_position(hit.index());
                        sum_z += plane_config.paddle_z(hit.index());
                        n += 1;
                    }
                }
                if n == 0 {
                    return PlaneTrackDiagnostics::default();
                }
                let mean_pos = sum_pos / n as f64;
                let mean_z = sum_z / n as f64;
                let (x, y) = track.position_at(mean_z);
                let projected = if ip % 2 == 0 { x } else { y };
                PlaneTrackDiagnostics {
                    hit_distance: projected - mean_pos,
                    track_x: Some(x),
                    track_y: Some(y),
                }
            })
            .collect()
    }

    /// Records for the TOF calibration dump.
    ///
    /// Nothing is produced unless dumping is enabled, the event has
    /// exactly one track and passed the calibration-quality gate.
    pub fn tof_dump<P: ParticleId + ?Sized>(
        &self,
        tracks: &[Track],
        tof: &TrackTof,
        good_event_tof_calib: bool,
        pid: &P,
    ) -> TofDump {
        let cuts = &self.config.tof_dump;
        let mut dump = TofDump::default();
        let [track] = tracks else {
            return dump;
        };
        if !cuts.enabled || !good_event_tof_calib {
            return dump;
        }

        let enorm = track.normalized_energy();
        let shower_ok = enorm > cuts.shower_track_lo && enorm < cuts.shower_track_hi;
        let beta_ok = tof.beta > cuts.beta_lo && tof.beta < cuts.beta_hi;
        let cherenkov_ok = pid.cherenkov_npe().map_or(true, |npe| npe > cuts.cherenkov_lo);

        if shower_ok && beta_ok && cherenkov_ok {
            for info in &tof.hit_info {
                let flags = tof.flags(info.plane, info.hit);
                if flags.good_tdc_pos && flags.good_tdc_neg {
                    dump.records.push(self.record(info, Side::Positive));
                    dump.records.push(self.record(info, Side::Negative));
                }
            }
        }
        dump.terminated = shower_ok && !tof.hit_info.is_empty();
        dump
    }

    fn record(&self, info: &TofHitInfo, side: Side) -> TofDumpRecord {
        let plane = self.config.planes[info.plane].number;
        match side {
            Side::Positive => TofDumpRecord {
                side,
                plane,
                paddle: info.paddle,
                tdc_time: info.tdc_time_pos.unwrap_or(0.0),
                path: info.path_pos,
                zcor: info.zcor,
                time: info.time_pos,
                adc: info.adc_pos,
            },
            Side::Negative => TofDumpRecord {
                side,
                plane,
                paddle: info.paddle,
                tdc_time: info.tdc_time_neg.unwrap_or(0.0),
                path: info.path_neg,
                zcor: info.zcor,
                time: info.time_neg,
                adc: info.adc_neg,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hodoscope_core::{
        CalibratedPaddleHit, GoodFlags, PedestalConfig, PlaneConfig, PlaneCounters, TofDumpConfig,
    };

    fn setup(dump: TofDumpConfig) -> (HodoscopeConfig, Vec<Plane>) {
        let planes = vec![
            PlaneConfig::new("1x", 1, 4).with_z(0.0, 2.0),
            PlaneConfig::new("1y", 2, 4).with_z(10.0, 0.0),
        ];
        let config = HodoscopeConfig::new(planes).with_tof_dump(dump);
        let mut state: Vec<Plane> = config
            .planes
            .iter()
            .enumerate()
            .map(|(i, p)| Plane::new(i, p, PedestalConfig::default()))
            .collect();
        for (ip, plane) in state.iter_mut().enumerate() {
            let hits = (1..=2)
                .map(|p| CalibratedPaddleHit::new(p, config.planes[ip].pos_center[p as usize - 1]))
                .collect();
            plane.set_hits(hits, PlaneCounters::default());
        }
        (config, state)
    }

    fn both_good() -> GoodFlags {
        GoodFlags {
            on_track: true,
            good_scin_time: true,
            good_tdc_pos: true,
            good_tdc_neg: true,
        }
    }

    fn tof_with_flags(flags: Vec<Vec<GoodFlags>>) -> TrackTof {
        let mut tof = TrackTof {
            beta: 0.98,
            ..TrackTof::default()
        };
        for (ip, plane) in flags.iter().enumerate() {
            for ih in 0..plane.len() {
                #[allow(clippy::cast_possible_truncation)]
                let mut info = TofHitInfo::new(ip, ih, ih as u32 + 1);
                info.tdc_time_pos = Some(31.0);
                info.tdc_time_neg = Some(32.0);
                info.path_pos = 50.0;
                info.path_neg = 70.0;
                info.zcor = 1.5;
                info.time_pos = 29.5;
                info.time_neg = 30.5;
                info.adc_pos = 800.0;
                info.adc_neg = 900.0;
                tof.hit_info.push(info);
            }
        }
        tof.good_flags = flags;
        tof
    }

    fn dump_config() -> TofDumpConfig {
        TofDumpConfig {
            enabled: true,
            shower_track_lo: 0.7,
            shower_track_hi: 1.3,
            cherenkov_lo: 2.0,
            beta_lo: 0.9,
            beta_hi: 1.1,
        }
    }

    fn electron() -> Track {
        Track::new(1.0, -2.0, 0.01, 0.02)
            .with_momentum(2.0, 0.000_511)
            .with_energy(2.0)
    }

    #[test]
    fn test_plane_diagnostics() {
        let (config, planes) = setup(TofDumpConfig::default());
        let tof = tof_with_flags(vec![
            vec![both_good(), both_good()],
            vec![GoodFlags::default(), GoodFlags::default()],
        ]);
        let track = electron();
        let diag = GoldenTrackProcessor::new(&config).plane_diagnostics(&track, &tof, &planes);

        assert_eq!(diag.len(), 2);
        // paddles 1 and 2 at -11.25 and -3.75, z 0 and 2
        let x = track.x + track.theta * 1.0;
        assert_relative_eq!(diag[0].hit_distance, x - (-7.5), epsilon = 1e-12);
        assert_relative_eq!(diag[0].track_x.unwrap(), x, epsilon = 1e-12);
        assert_relative_eq!(diag[0].track_y.unwrap(), track.y + track.phi * 1.0, epsilon = 1e-12);
        assert_relative_eq!(diag[1].hit_distance, BIG);
        assert!(diag[1].track_x.is_none());
    }

    #[test]
    fn test_dump_records_for_single_track() {
        let (config, _) = setup(dump_config());
        let tof = tof_with_flags(vec![
            vec![both_good(), GoodFlags::default()],
            vec![GoodFlags::default(), both_good()],
        ]);
        let dump = GoldenTrackProcessor::new(&config).tof_dump(&[electron()], &tof, true, &Some(5.0));

        assert_eq!(dump.records.len(), 4);
        assert!(dump.terminated);
        let first = dump.records[0];
        assert_eq!(first.side, Side::Positive);
        assert_eq!((first.plane, first.paddle), (1, 1));
        assert_relative_eq!(first.tdc_time, 31.0);
        assert_relative_eq!(first.path, 50.0);
        assert_relative_eq!(first.time, 29.5);
        assert_eq!(dump.records[1].side, Side::Negative);
        assert_relative_eq!(dump.records[1].adc, 900.0);
        assert_eq!((dump.records[2].plane, dump.records[2].paddle), (2, 2));
    }

    #[test]
    fn test_dump_cuts() {
        let (config, _) = setup(dump_config());
        let tof = tof_with_flags(vec![vec![both_good()], vec![]]);
        let processor = GoldenTrackProcessor::new(&config);

        // low Cherenkov signal: no records, still terminated
        let dump = processor.tof_dump(&[electron()], &tof, true, &Some(1.0));
        assert!(dump.records.is_empty());
        assert!(dump.terminated);

        // no Cherenkov detector passes
        let dump = processor.tof_dump(&[electron()], &tof, true, &None::<f64>);
        assert_eq!(dump.records.len(), 2);

        // shower cut fails: nothing at all
        let pion = electron().with_energy(0.4);
        assert!(processor.tof_dump(&[pion], &tof, true, &None::<f64>).is_empty());

        // calibration gate and track multiplicity
        assert!(processor.tof_dump(&[electron()], &tof, false, &None::<f64>).is_empty());
        assert!(processor
            .tof_dump(&[electron(), electron()], &tof, true, &None::<f64>)
            .is_empty());
    }

    #[test]
    fn test_dump_disabled() {
        let (config, _) = setup(TofDumpConfig::default());
        let tof = tof_with_flags(vec![vec![both_good()], vec![]]);
        let dump = GoldenTrackProcessor::new(&config).tof_dump(&[electron()], &tof, true, &None::<f64>);
        assert!(dump.is_empty());
    }

    #[test]
    fn test_dump_side_without_tdc_writes_zero() {
        let (config, _) = setup(dump_config());
        let mut tof = tof_with_flags(vec![vec![both_good()], vec![]]);
        tof.hit_info[0].tdc_time_neg = None;
        let dump = GoldenTrackProcessor::new(&config).tof_dump(&[electron()], &tof, true, &None::<f64>);

        assert_eq!(dump.records.len(), 2);
        assert_relative_eq!(dump.records[0].tdc_time, 31.0);
        assert_eq!(dump.records[1].side, Side::Negative);
        assert_relative_eq!(dump.records[1].tdc_time, 0.0);
        // the rest of the record is still written
        assert_relative_eq!(dump.records[1].path, 70.0);
    }
}
