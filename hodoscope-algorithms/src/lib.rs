//! hodoscope-algorithms: Hit reconstruction and timing for scintillator hodoscopes.
//!
//! This crate provides the per-event reconstruction chain:
//! - **Pedestals** - running ADC pedestal estimate gated on pedestal events
//! - **Extraction** - TDC/ADC selection and time-walk/position corrections
//! - **Focal-plane time** - histogram-peak start time and beta without a track
//! - **Track TOF** - weighted least-squares beta fit per track
//! - **Track efficiency** - front/back cluster matching independent of tracking
//!
//! [`Hodoscope`] ties them together into an event pipeline.
//!

mod efficiency;
mod extraction;
mod fit;
mod focal_plane;
mod golden;
mod histogram;
mod hodoscope;
mod pedestal;
mod plane;
pub mod timing;
mod tof;

pub use efficiency::{verdict, TrackEfficiencyTester};
pub use extraction::{plane_run, HitExtractor};
pub use fit::{fit_beta, BetaFit, TimedPoint};
pub use focal_plane::{covers_both_views, FocalPlaneEstimator};
pub use golden::{GoldenTrackProcessor, PlaneTrackDiagnostics};
pub use histogram::TimeHistogram;
pub use hodoscope::Hodoscope;
pub use pedestal::{ChannelPedestal, PedestalAccumulator, PlanePedestals};
pub use plane::Plane;
pub use tof::TrackTofFitter;
