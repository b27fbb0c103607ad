//! hodoscope-core: Core types for scintillator hodoscope reconstruction.
//!
//! This crate provides the data model shared by the reconstruction
//! algorithms and the I/O layer: raw and calibrated paddle hits,
//! clusters, tracks, per-event reports, calibration tables and the
//! run configuration.
//!

pub mod calibration;
pub mod cluster;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod hit;
pub mod params;
pub mod track;

pub use calibration::{
    CalibrationTable, PaddleCalibration, SideCalibration, TimeCorrectionMode,
};
pub use cluster::Cluster;
pub use config::{
    AdcMode, HodoscopeConfig, PedestalConfig, PlaneConfig, PlaneView, TimingConfig,
    TofDumpConfig, TrackEffConfig,
};
pub use error::{Error, Result};
pub use event::{
    EventClassifier, EventReport, EventStatus, EventTypeClassifier, FocalPlaneTime,
    ParticleId, PlaneCounters, PlaneSummary, RawEvent, TofDump, TofDumpRecord,
};
pub use hit::{AdcChannel, AdcPulse, AdcSignal, CalibratedPaddleHit, RawPaddleHit, Side, SideSignal, TdcHit};
pub use params::{ParamStore, ParamValue};
pub use track::{FitStatus, GoodFlags, TofHitInfo, Track, TrackTof};
