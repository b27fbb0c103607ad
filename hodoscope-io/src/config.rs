//! Loading the reconstruction configuration from a parameter file.

use crate::Result;
use hodoscope_core::{HodoscopeConfig, ParamStore, PlaneConfig};
use log::info;
use std::path::Path;

/// Reads a JSON parameter file and builds the configuration for the
/// detector whose keys start with `prefix`.
///
/// # Errors
/// Returns an error if the file cannot be read or a required parameter
/// is missing or malformed.
pub fn load_config<P: AsRef<Path>>(path: P, prefix: &str) -> Result<HodoscopeConfig> {
    let path = path.as_ref();
    let store = ParamStore::from_file(path)?;
    let config = HodoscopeConfig::from_params(&store, prefix)?;
    info!(
        "Loaded {} planes with {} paddles from {}",
        config.n_planes(),
        config.planes.iter().map(PlaneConfig::n_paddles).sum::<usize>(),
        path.display()
    );
    Ok(config)
}
