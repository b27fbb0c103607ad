//! Event pipeline for the whole hodoscope.
//!
//! An event goes through three stages:
//! - [`Hodoscope::decode`]: per-event reset, pedestal gate, hit
//!   extraction and the track-independent focal-plane estimate
//! - [`Hodoscope::coarse_process`]: per-track beta fits and the
//!   track-efficiency test
//! - [`Hodoscope::fine_process`]: golden-track plane diagnostics and the
//!   TOF calibration dump
//!
//! [`Hodoscope::process_event`] runs all three and collects the results
//! into an [`EventReport`].

use hodoscope_core::{
    EventClassifier, EventReport, EventStatus, FocalPlaneTime, HodoscopeConfig, ParticleId,
    PlaneSummary, RawEvent, TofDump, Track, TrackTof,
};
use log::{debug, warn};

use crate::efficiency::TrackEfficiencyTester;
use crate::extraction::{plane_run, HitExtractor};
use crate::focal_plane::FocalPlaneEstimator;
use crate::golden::{GoldenTrackProcessor, PlaneTrackDiagnostics};
use crate::histogram::TimeHistogram;
use crate::plane::Plane;
use crate::tof::TrackTofFitter;

/// Hodoscope state carried through a run.
///
/// Pedestal sums are the only thing that survives from one event to the
/// next. Everything else is rebuilt by [`decode`](Self::decode).
#[derive(Clone, Debug)]
pub struct Hodoscope {
    config: HodoscopeConfig,
    planes: Vec<Plane>,
    histogram: TimeHistogram,
    pedestals_pending: bool,
    focal_plane: FocalPlaneTime,
    track_tof: Vec<TrackTof>,
    good_scin_hits: bool,
    diagnostics: Vec<PlaneTrackDiagnostics>,
    tof_dump: TofDump,
}

impl Hodoscope {
    #[must_use]
    pub fn new(config: HodoscopeConfig) -> Self {
        let planes = config
            .planes
            .iter()
            .enumerate()
            .map(|(i, p)| Plane::new(i, p, config.pedestal.clone()))
            .collect();
        Self {
            planes,
            histogram: TimeHistogram::coarse(),
            pedestals_pending: false,
            focal_plane: FocalPlaneTime::default(),
            track_tof: Vec::new(),
            good_scin_hits: false,
            diagnostics: Vec::new(),
            tof_dump: TofDump::default(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &HodoscopeConfig {
        &self.config
    }

    #[must_use]
    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    #[must_use]
    pub fn focal_plane(&self) -> &FocalPlaneTime {
        &self.focal_plane
    }

    /// Per-track results of the last [`coarse_process`](Self::coarse_process).
    #[must_use]
    pub fn track_tof(&self) -> &[TrackTof] {
        &self.track_tof
    }

    #[must_use]
    pub fn good_scin_hits(&self) -> bool {
        self.good_scin_hits
    }

    #[must_use]
    pub fn tof_dump(&self) -> &TofDump {
        &self.tof_dump
    }

    /// Pedestal events were seen since the last finalisation.
    #[must_use]
    pub fn pedestals_pending(&self) -> bool {
        self.pedestals_pending
    }

    fn clear(&mut self) {
        for plane in &mut self.planes {
            plane.clear();
        }
        self.histogram.reset();
        self.focal_plane = FocalPlaneTime::default();
        self.track_tof.clear();
        self.good_scin_hits = false;
        self.diagnostics.clear();
        self.tof_dump = TofDump::default();
    }

    /// Decode one event.
    ///
    /// Pedestal events only feed the pedestal sums. The first physics
    /// event after them freezes the pedestals before extraction.
    pub fn decode<C: EventClassifier + ?Sized>(
        &mut self,
        event: &RawEvent,
        classifier: &C,
    ) -> EventStatus {
        self.clear();

        if classifier.is_pedestal_event(event) {
            let mut next = 0;
            for (plane_config, plane) in self.config.planes.iter().zip(&mut self.planes) {
                let end = plane_run(&event.hits, next, plane_config.number);
                plane.pedestals_mut().accumulate(&event.hits[next..end]);
                next = end;
            }
            self.pedestals_pending = true;
            return EventStatus::Pedestal;
        }

        if self.pedestals_pending {
            for plane in &mut self.planes {
                plane.pedestals_mut().finalize();
            }
            self.pedestals_pending = false;
        }

        let mut next = 0;
        for (ip, plane) in self.planes.iter_mut().enumerate() {
            let number = self.config.planes[ip].number;
            let end = plane_run(&event.hits, next, number);
            let (hits, counters) = HitExtractor::new(&self.config, ip)
                .extract(&event.hits[next..end], plane.pedestals());
            plane.set_hits(hits, counters);
            next = end;
        }
        if next < event.hits.len() {
            warn!(
                "Event {}: {} raw hits not consumed by the plane walk",
                event.event_number,
                event.hits.len() - next
            );
        }

        self.focal_plane =
            FocalPlaneEstimator::new(&self.config).estimate(&mut self.planes, &mut self.histogram);

        if event.hits.is_empty() {
            EventStatus::Empty
        } else {
            EventStatus::Processed
        }
    }

    /// Fit every track and run the track-efficiency test.
    pub fn coarse_process(&mut self, tracks: &[Track]) {
        let fitter = TrackTofFitter::new(&self.config);
        self.track_tof = tracks
            .iter()
            .map(|track| fitter.fit(track, &self.planes, &mut self.histogram))
            .collect();
        self.good_scin_hits = TrackEfficiencyTester::new(&self.config).test(&mut self.planes);
    }

    /// Golden-track diagnostics and TOF dump records.
    ///
    /// Must follow [`coarse_process`](Self::coarse_process) with the same
    /// tracks.
    pub fn fine_process<P: ParticleId + ?Sized>(&mut self, tracks: &[Track], pid: &P) {
        let (Some(track), Some(tof)) = (tracks.first(), self.track_tof.first()) else {
            return;
        };
        let processor = GoldenTrackProcessor::new(&self.config);
        self.diagnostics = processor.plane_diagnostics(track, tof, &self.planes);
        self.tof_dump =
            processor.tof_dump(tracks, tof, self.focal_plane.good_event_tof_calib, pid);
    }

    /// Run the full pipeline on one event.
    pub fn process_event<C, P>(
        &mut self,
        event: &RawEvent,
        tracks: &[Track],
        classifier: &C,
        pid: &P,
    ) -> EventReport
    where
        C: EventClassifier + ?Sized,
        P: ParticleId + ?Sized,
    {
        let status = self.decode(event, classifier);
        if status == EventStatus::Pedestal {
            return EventReport {
                event_number: event.event_number,
                status,
                ..EventReport::default()
            };
        }

        self.coarse_process(tracks);
        self.fine_process(tracks, pid);
        let report = self.report(event.event_number, status);
        debug!(
            "Event {}: {} hits, start time {:.2} (good {}), {} tracks, beta {:.3}, good scin hits {}",
            report.event_number,
            report.planes.iter().map(|p| p.n_hits).sum::<usize>(),
            report.focal_plane.start_time,
            report.focal_plane.good_start_time,
            report.tracks.len(),
            report.beta,
            report.good_scin_hits
        );
        report
    }

    /// Snapshot of the current event.
    #[must_use]
    pub fn report(&self, event_number: u64, status: EventStatus) -> EventReport {
        let planes = self
            .planes
            .iter()
            .zip(&self.config.planes)
            .enumerate()
            .map(|(ip, (plane, plane_config))| {
                let mut summary: PlaneSummary = plane.summary(plane_config);
                if let Some(diag) = self.diagnostics.get(ip) {
                    summary.hit_distance = diag.hit_distance;
                    summary.track_x = diag.track_x;
                    summary.track_y = diag.track_y;
                }
                summary
            })
            .collect();

        let golden = self.track_tof.first();
        EventReport {
            event_number,
            status,
            focal_plane: self.focal_plane,
            planes,
            tracks: self.track_tof.clone(),
            good_scin_hits: self.good_scin_hits,
            beta: golden.map_or(0.0, |t| t.beta),
            fp_time_all: golden.map_or(self.focal_plane.start_time, |t| t.fp_time),
            tof_dump: self.tof_dump.clone(),
        }
    }
}
