//! Track-independent check that the hodoscope saw a particle which the
//! tracking should have reconstructed.
//!
//! Clusters of two-good-time hits inside the acceptance are matched
//! between the front and back plane of each view. The event passes when
//! both views match, or one view matches and the other has at least one
//! cluster.

use hodoscope_core::{HodoscopeConfig, TrackEffConfig};

use crate::plane::Plane;

/// Runs the efficiency test on the clustered planes.
pub struct TrackEfficiencyTester<'a> {
    config: &'a HodoscopeConfig,
}

impl<'a> TrackEfficiencyTester<'a> {
    #[must_use]
    pub fn new(config: &'a HodoscopeConfig) -> Self {
        Self { config }
    }

    /// Cluster the beta planes and return the verdict.
    pub fn test(&self, planes: &mut [Plane]) -> bool {
        let track_eff = &self.config.track_eff;
        let n_beta = self.config.n_beta_planes().min(planes.len());
        for (ip, plane) in planes.iter_mut().enumerate().take(n_beta) {
            let plane_config = &self.config.planes[ip];
            let window = track_eff
                .acceptance_paddles(ip)
                .and_then(|paddles| Plane::acceptance_window(plane_config, paddles));
            plane.clusterize_by(plane_config, window, |hit| hit.two_good_times);
        }
        let planes = &mut planes[..n_beta];

        let ratio = track_eff.xpfp_to_xfp_ratio;
        let x_factor = match (self.config.planes.first(), self.config.planes.get(2)) {
            (Some(front), Some(back)) => 1.0 + ratio * (back.z_pos - front.z_pos),
            _ => 1.0,
        };
        let x_match = match_view(planes, 0, 2, x_factor, track_eff.x_diff_max);
        let y_match = match_view(planes, 1, 3, 1.0, track_eff.y_diff_max);

        let has_clusters = |ip: usize| {
            planes
                .get(ip)
                .is_some_and(|p| p.clusters().iter().any(|c| c.in_acceptance))
        };
        let any_x = has_clusters(0) || has_clusters(2);
        let any_y = has_clusters(1) || has_clusters(3);

        verdict(track_eff, x_match, y_match, any_x, any_y)
    }
}

/// Good-scintillator-hit verdict from the per-view results.
#[must_use]
pub fn verdict(
    config: &TrackEffConfig,
    x_match: bool,
    y_match: bool,
    any_x: bool,
    any_y: bool,
) -> bool {
    matches!(config.required_planes, 3 | 4)
        && ((x_match && y_match) || (any_y && x_match) || (any_x && y_match))
}

/// Match in-acceptance clusters of plane `front` (projected by `factor`)
/// to those of plane `back`. Matched clusters are flagged as used.
fn match_view(planes: &mut [Plane], front: usize, back: usize, factor: f64, max_diff: f64) -> bool {
    if back >= planes.len() {
        return false;
    }
    let (head, tail) = planes.split_at_mut(back);
    let front_clusters = head[front].clusters_mut();
    let back_clusters = tail[0].clusters_mut();

    let mut matched = false;
    for f in front_clusters.iter_mut().filter(|c| c.in_acceptance) {
        let projected = f.position * factor;
        if let Some(b) = back_clusters
            .iter_mut()
            .filter(|c| c.in_acceptance)
            .find(|c| (projected - c.position).abs() < max_diff)
        {
            matched = true;
            f.used = true;
            b.used = true;
        }
    }
    matched
}
