//! Per-plane event state.
//!
//! A [`Plane`] owns the calibrated hits of one event, the clusters built
//! from them and the pedestal accumulators, which are the only state kept
//! across events.
#![allow(clippy::cast_precision_loss)]

use hodoscope_core::constants::{MAX_EXPECTED_CLUSTER_SIZE, PLANE_FP_TIME_UNSET};
use hodoscope_core::{
    CalibratedPaddleHit, Cluster, PedestalConfig, PlaneConfig, PlaneCounters, PlaneSummary,
};
use log::warn;

use crate::pedestal::PlanePedestals;

/// One plane of the hodoscope.
#[derive(Clone, Debug)]
pub struct Plane {
    index: usize,
    hits: Vec<CalibratedPaddleHit>,
    clusters: Vec<Cluster>,
    counters: PlaneCounters,
    pedestals: PlanePedestals,
    /// Hits inside the consensus window.
    pub n_good_hits: usize,
    /// Mean focal-plane time of those hits.
    pub fp_time: f64,
}

impl Plane {
    #[must_use]
    pub fn new(index: usize, config: &PlaneConfig, pedestal: PedestalConfig) -> Self {
        Self {
            index,
            hits: Vec::with_capacity(config.n_paddles()),
            clusters: Vec::new(),
            counters: PlaneCounters::default(),
            pedestals: PlanePedestals::new(config.number, config.n_paddles(), pedestal),
            n_good_hits: 0,
            fp_time: PLANE_FP_TIME_UNSET,
        }
    }

    /// Drop everything derived from the previous event.
    pub fn clear(&mut self) {
        self.hits.clear();
        self.clusters.clear();
        self.counters = PlaneCounters::default();
        self.n_good_hits = 0;
        self.fp_time = PLANE_FP_TIME_UNSET;
    }

    pub fn set_hits(&mut self, hits: Vec<CalibratedPaddleHit>, counters: PlaneCounters) {
        self.hits = hits;
        self.counters = counters;
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn hits(&self) -> &[CalibratedPaddleHit] {
        &self.hits
    }

    pub fn hits_mut(&mut self) -> &mut [CalibratedPaddleHit] {
        &mut self.hits
    }

    #[must_use]
    pub fn n_hits(&self) -> usize {
        self.hits.len()
    }

    #[must_use]
    pub fn counters(&self) -> &PlaneCounters {
        &self.counters
    }

    #[must_use]
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn clusters_mut(&mut self) -> &mut [Cluster] {
        &mut self.clusters
    }

    #[must_use]
    pub fn pedestals(&self) -> &PlanePedestals {
        &self.pedestals
    }

    pub fn pedestals_mut(&mut self) -> &mut PlanePedestals {
        &mut self.pedestals
    }

    /// Cluster every hit.
    pub fn clusterize(&mut self, config: &PlaneConfig, acceptance: Option<(f64, f64)>) {
        self.clusterize_by(config, acceptance, |_| true);
    }

    /// Cluster the hits accepted by `keep`.
    ///
    /// Hits are ordered by paddle and split wherever two consecutive
    /// paddle numbers differ by anything but one. A cluster is in
    /// acceptance when its mean position lies in `[lo, hi]`.
    pub fn clusterize_by<F>(&mut self, config: &PlaneConfig, acceptance: Option<(f64, f64)>, keep: F)
    where
        F: Fn(&CalibratedPaddleHit) -> bool,
    {
        self.clusters.clear();
        let mut order: Vec<usize> = (0..self.hits.len())
            .filter(|&i| keep(&self.hits[i]))
            .collect();
        order.sort_by_key(|&i| self.hits[i].paddle);

        let mut current: Vec<usize> = Vec::new();
        for i in order {
            if let Some(&last) = current.last() {
                if self.hits[last].paddle + 1 != self.hits[i].paddle {
                    let run = std::mem::take(&mut current);
                    self.push_cluster(config, acceptance, run);
                }
            }
            current.push(i);
        }
        if !current.is_empty() {
            self.push_cluster(config, acceptance, current);
        }
    }

    fn push_cluster(&mut self, config: &PlaneConfig, acceptance: Option<(f64, f64)>, hits: Vec<usize>) {
        let position = hits
            .iter()
            .map(|&i| config.paddle_position(self.hits[i].index()))
            .sum::<f64>()
            / hits.len() as f64;
        let first_paddle = self.hits[hits[0]].paddle;
        let last_paddle = self.hits[hits[hits.len() - 1]].paddle;
        let cluster = Cluster {
            hits,
            first_paddle,
            last_paddle,
            position,
            in_acceptance: acceptance.is_some_and(|(lo, hi)| position >= lo && position <= hi),
            used: false,
        };
        if is_oversized(&cluster) {
            warn!(
                "Plane {}: cluster of {} paddles",
                config.name,
                cluster.size()
            );
        }
        self.clusters.push(cluster);
    }

    /// Clusters in acceptance that are wider than a particle can fire.
    #[must_use]
    pub fn oversized_clusters(&self) -> usize {
        self.clusters.iter().filter(|c| is_oversized(c)).count()
    }

    /// Position window spanned by the paddle range `(lo, hi)`, both 1-based.
    ///
    /// Paddle numbers are clamped to the plane.
    #[must_use]
    pub fn acceptance_window(config: &PlaneConfig, paddles: (u32, u32)) -> Option<(f64, f64)> {
        let n = config.n_paddles();
        if n == 0 {
            return None;
        }
        let position = |paddle: u32| {
            let index = (paddle.max(1) as usize - 1).min(n - 1);
            config.paddle_position(index)
        };
        let (a, b) = (position(paddles.0), position(paddles.1));
        Some((a.min(b), a.max(b)))
    }

    /// Summary for the event report.
    #[must_use]
    pub fn summary(&self, config: &PlaneConfig) -> PlaneSummary {
        PlaneSummary {
            n_hits: self.hits.len(),
            n_good_hits: self.n_good_hits,
            fp_time: self.fp_time,
            counters: self.counters,
            clusters: self.clusters.clone(),
            ..PlaneSummary::new(config.name.clone())
        }
    }
}

fn is_oversized(cluster: &Cluster) -> bool {
    cluster.in_acceptance && cluster.size() > MAX_EXPECTED_CLUSTER_SIZE
}
