//! Clusters of adjacent fired paddles.

use serde::{Deserialize, Serialize};

/// A maximal run of adjacent paddles in one plane.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    /// Indices into the plane's hit collection, ordered by paddle.
    pub hits: Vec<usize>,
    /// First and last paddle numbers of the run.
    pub first_paddle: u32,
    pub last_paddle: u32,
    /// Mean paddle position (plane offset applied).
    pub position: f64,
    /// Inside the efficiency acceptance window.
    pub in_acceptance: bool,
    /// Matched to a cluster in the partner plane.
    pub used: bool,
}

impl Cluster {
    #[must_use]
    pub fn size(&self) -> usize {
        self.hits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}
