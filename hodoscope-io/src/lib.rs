//! hodoscope-io: File input and output for hodoscope reconstruction.
//!
//! Events are read from memory-mapped JSON-lines files; per-event
//! reports go to JSON lines or CSV, and the TOF calibration dump to its
//! fixed-column text format.
//!

mod config;
mod error;
mod reader;
mod tof_dump;
mod writer;

pub use config::load_config;
pub use error::{Error, Result};
pub use reader::{EventFileReader, EventRecord};
pub use tof_dump::{format_record, TofDumpWriter};
pub use writer::{OutputFormat, ReportWriter};
