//! Per-event inputs, collaborator interfaces and result records.

use serde::{Deserialize, Serialize};

use crate::cluster::Cluster;
use crate::constants::{BIG, START_TIME_UNSET};
use crate::hit::{RawPaddleHit, Side};
use crate::track::{FitStatus, TrackTof};

/// Raw hits for one readout cycle, grouped by plane.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEvent {
    pub event_number: u64,
    /// Trigger type reported by the DAQ.
    pub event_type: u32,
    pub hits: Vec<RawPaddleHit>,
}

impl RawEvent {
    #[must_use]
    pub fn new(event_number: u64, hits: Vec<RawPaddleHit>) -> Self {
        Self {
            event_number,
            event_type: 0,
            hits,
        }
    }

    #[must_use]
    pub fn with_event_type(mut self, event_type: u32) -> Self {
        self.event_type = event_type;
        self
    }
}

/// Decides whether an event is a pedestal event.
pub trait EventClassifier {
    fn is_pedestal_event(&self, event: &RawEvent) -> bool;
}

impl<F> EventClassifier for F
where
    F: Fn(&RawEvent) -> bool,
{
    fn is_pedestal_event(&self, event: &RawEvent) -> bool {
        self(event)
    }
}

/// Pedestal events are identified by their trigger type.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventTypeClassifier {
    pub pedestal_types: Vec<u32>,
}

impl EventTypeClassifier {
    #[must_use]
    pub fn new(pedestal_types: Vec<u32>) -> Self {
        Self { pedestal_types }
    }
}

impl EventClassifier for EventTypeClassifier {
    fn is_pedestal_event(&self, event: &RawEvent) -> bool {
        self.pedestal_types.contains(&event.event_type)
    }
}

/// Particle identification from other detectors.
pub trait ParticleId {
    /// Cherenkov photo-electrons; `None` when there is no Cherenkov.
    fn cherenkov_npe(&self) -> Option<f64>;
}

impl ParticleId for Option<f64> {
    fn cherenkov_npe(&self) -> Option<f64> {
        *self
    }
}

/// What happened to an event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Used for pedestal accumulation only.
    Pedestal,
    /// No raw hits.
    #[default]
    Empty,
    Processed,
}

/// Hit counters for one plane in one event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaneCounters {
    /// Raw hits walked for this plane.
    pub raw_hits: usize,
    pub raw_pos_tdc_hits: usize,
    pub raw_neg_tdc_hits: usize,
    pub raw_pos_adc_pulses: usize,
    pub raw_neg_adc_pulses: usize,
    /// ADC pulses rejected for a non-positive amplitude.
    pub adc_errors: usize,
    pub good_pos_tdc_hits: usize,
    pub good_neg_tdc_hits: usize,
    pub good_pos_adc_hits: usize,
    pub good_neg_adc_hits: usize,
    /// ADC integrals at or above the diagnostic cut.
    pub pos_adc_diag_hits: usize,
    pub neg_adc_diag_hits: usize,
}

/// Per-plane event summary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaneSummary {
    pub name: String,
    /// Calibrated hits in the plane.
    pub n_hits: usize,
    /// Hits within the consensus window.
    pub n_good_hits: usize,
    pub fp_time: f64,
    pub counters: PlaneCounters,
    pub clusters: Vec<Cluster>,
    /// Golden track projection minus mean centre of two-ended hits.
    pub hit_distance: f64,
    pub track_x: Option<f64>,
    pub track_y: Option<f64>,
}

impl PlaneSummary {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            n_hits: 0,
            n_good_hits: 0,
            fp_time: crate::constants::PLANE_FP_TIME_UNSET,
            counters: PlaneCounters::default(),
            clusters: Vec::new(),
            hit_distance: BIG,
            track_x: None,
            track_y: None,
        }
    }
}

/// Track-independent timing results.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FocalPlaneTime {
    pub start_time: f64,
    pub good_start_time: bool,
    pub beta_no_track: f64,
    pub beta_no_track_chisq: f64,
    pub fit_status: FitStatus,
    /// Provisional consensus time from the coarse histogram.
    pub time_hist_peak: f64,
    pub time_hist_sigma: f64,
    pub time_hist_hits: f64,
    /// Exactly one good hit in every beta plane.
    pub good_event_tof_calib: bool,
}

impl Default for FocalPlaneTime {
    fn default() -> Self {
        Self {
            start_time: START_TIME_UNSET,
            good_start_time: false,
            beta_no_track: 0.0,
            beta_no_track_chisq: 0.0,
            fit_status: FitStatus::NotFitted,
            time_hist_peak: 0.0,
            time_hist_sigma: 0.0,
            time_hist_hits: 0.0,
            good_event_tof_calib: false,
        }
    }
}

/// One line of the TOF calibration dump.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TofDumpRecord {
    pub side: Side,
    /// 1-based plane number.
    pub plane: u32,
    pub paddle: u32,
    /// TDC time of this side (ns); 0 when the side has no TDC hit.
    pub tdc_time: f64,
    pub path: f64,
    pub zcor: f64,
    pub time: f64,
    pub adc: f64,
}

/// TOF calibration dump output of one event.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TofDump {
    pub records: Vec<TofDumpRecord>,
    /// Write the end-of-event marker.
    pub terminated: bool,
}

impl TofDump {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && !self.terminated
    }
}

/// Everything the hodoscope reports for one event.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventReport {
    pub event_number: u64,
    pub status: EventStatus,
    pub focal_plane: FocalPlaneTime,
    pub planes: Vec<PlaneSummary>,
    pub tracks: Vec<TrackTof>,
    /// Track-efficiency verdict.
    pub good_scin_hits: bool,
    /// Golden track beta.
    pub beta: f64,
    /// Golden track focal-plane time.
    pub fp_time_all: f64,
    #[serde(skip)]
    pub tof_dump: TofDump,
}
