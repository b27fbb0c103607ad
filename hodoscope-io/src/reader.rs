//! Memory-mapped JSON-lines event reader.

use crate::{Error, Result};
use hodoscope_core::{ParticleId, RawEvent, Track};
use memmap2::Mmap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};

/// One input line: the raw hits of an event plus what other detectors
/// contribute to it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(flatten)]
    pub event: RawEvent,
    /// Tracks found by the tracking detectors, golden track first.
    #[serde(default)]
    pub tracks: Vec<Track>,
    /// Cherenkov photo-electrons, absent without a Cherenkov detector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cherenkov_npe: Option<f64>,
}

impl ParticleId for EventRecord {
    fn cherenkov_npe(&self) -> Option<f64> {
        self.cherenkov_npe
    }
}

/// A memory-mapped event file with one JSON object per line.
///
/// Blank lines are skipped. Line numbers in errors are 1-based.
pub struct EventFileReader {
    mmap: Mmap,
    path: PathBuf,
}

impl EventFileReader {
    /// Opens a file for memory-mapped reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
        // This is the standard safety contract for memory mapping.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            mmap,
            path: path.as_ref().to_path_buf(),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Returns true if the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Non-blank lines with their 1-based line numbers.
    fn lines(&self) -> impl Iterator<Item = (usize, &[u8])> {
        self.mmap
            .split(|&b| b == b'\n')
            .enumerate()
            .map(|(i, line)| (i + 1, line))
            .filter(|(_, line)| !line.iter().all(u8::is_ascii_whitespace))
    }

    /// Number of events in the file.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.lines().count()
    }

    /// Parses every event, in parallel, keeping file order.
    ///
    /// # Errors
    /// Returns an error if the file is not UTF-8 or any line fails to parse.
    pub fn read_all(&self) -> Result<Vec<EventRecord>> {
        if std::str::from_utf8(&self.mmap).is_err() {
            return Err(Error::InvalidFormat(format!(
                "{} is not valid UTF-8",
                self.path.display()
            )));
        }
        let lines: Vec<(usize, &[u8])> = self.lines().collect();
        lines
            .par_iter()
            .map(|&(line, bytes)| parse_line(line, bytes))
            .collect()
    }

    /// Parses events one at a time.
    pub fn records(&self) -> impl Iterator<Item = Result<EventRecord>> + '_ {
        self.lines().map(|(line, bytes)| parse_line(line, bytes))
    }
}

fn parse_line(line: usize, bytes: &[u8]) -> Result<EventRecord> {
    serde_json::from_slice(bytes).map_err(|source| Error::Json { line, source })
}
