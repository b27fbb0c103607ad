//! Text output for the TOF calibration dump.
//!
//! Each record is one line: side code (1 positive, 2 negative), plane,
//! paddle, TDC time, light path, z correction, time at the reference
//! plane and ADC, floats fixed to two decimals. An event that passed the
//! calibration gates ends with a `0 ` line.

use crate::Result;
use hodoscope_core::{Side, TofDump, TofDumpRecord};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Formats one dump record, without the newline.
#[must_use]
pub fn format_record(record: &TofDumpRecord) -> String {
    let side = match record.side {
        Side::Positive => 1,
        Side::Negative => 2,
    };
    format!(
        " {side}{:>3}{:>3}{:>10.2}{:>10.2}{:>10.2}{:>10.2}{:>10.2}",
        record.plane, record.paddle, record.tdc_time, record.path, record.zcor, record.time, record.adc
    )
}

/// Writer for the TOF calibration dump file.
pub struct TofDumpWriter {
    writer: BufWriter<File>,
    events: usize,
}

impl TofDumpWriter {
    /// Creates a new dump file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            events: 0,
        })
    }

    /// Events terminated so far.
    #[must_use]
    pub fn events(&self) -> usize {
        self.events
    }

    /// Writes the records of one event.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write(&mut self, dump: &TofDump) -> Result<()> {
        for record in &dump.records {
            writeln!(self.writer, "{}", format_record(record))?;
        }
        if dump.terminated {
            writeln!(self.writer, "0 ")?;
            self.events += 1;
        }
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
