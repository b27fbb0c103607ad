//! Event report writers.

use crate::{Error, Result};
use hodoscope_core::{EventReport, EventStatus, TrackTof};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Output layout of a [`ReportWriter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// One serialized [`EventReport`] per line.
    JsonLines,
    /// One row per event with the event-level and golden-track values.
    Csv,
}

impl OutputFormat {
    /// Pick the format from the file extension.
    ///
    /// # Errors
    /// Returns an error for anything but `.jsonl`, `.json` or `.csv`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("jsonl" | "json") => Ok(Self::JsonLines),
            Some("csv") => Ok(Self::Csv),
            _ => Err(Error::InvalidFormat(format!(
                "cannot infer output format from {}",
                path.display()
            ))),
        }
    }
}

const CSV_HEADER: &str = "event,status,start_time,good_start_time,beta_notrack,\
beta_notrack_chisq,good_scin_hits,ntracks,beta,beta_chisq,fp_time_all,dedx,n_scin_hit,n_pmt_hit";

/// Writer for per-event reconstruction results.
pub struct ReportWriter {
    writer: BufWriter<File>,
    format: OutputFormat,
    written: usize,
}

impl ReportWriter {
    /// Creates a new file writer.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, format: OutputFormat) -> Result<Self> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        Ok(Self {
            writer,
            format,
            written: 0,
        })
    }

    #[must_use]
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Reports written so far.
    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }

    /// Writes one event.
    ///
    /// # Errors
    /// Returns an error if writing or serialization fails.
    pub fn write(&mut self, report: &EventReport) -> Result<()> {
        match self.format {
            OutputFormat::JsonLines => {
                serde_json::to_writer(&mut self.writer, report).map_err(|source| Error::Json {
                    line: self.written + 1,
                    source,
                })?;
                writeln!(self.writer)?;
            }
            OutputFormat::Csv => {
                if self.written == 0 {
                    writeln!(self.writer, "{CSV_HEADER}")?;
                }
                let default = TrackTof::default();
                let golden = report.tracks.first().unwrap_or(&default);
                let fp = &report.focal_plane;
                writeln!(
                    self.writer,
                    "{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
                    report.event_number,
                    status_label(report.status),
                    fp.start_time,
                    u8::from(fp.good_start_time),
                    fp.beta_no_track,
                    fp.beta_no_track_chisq,
                    u8::from(report.good_scin_hits),
                    report.tracks.len(),
                    report.beta,
                    golden.beta_chisq,
                    report.fp_time_all,
                    golden.dedx,
                    golden.n_scin_hit,
                    golden.n_pmt_hit
                )?;
            }
        }
        self.written += 1;
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if the underlying file cannot be flushed.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn status_label(status: EventStatus) -> &'static str {
    match status {
        EventStatus::Pedestal => "pedestal",
        EventStatus::Empty => "empty",
        EventStatus::Processed => "processed",
    }
}
