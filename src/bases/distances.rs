use crate::backend::PathingOracle;
use crate::bases::site::Site;
use crate::geometry::point::Point2;
use log::warn;

/// Symmetric pairwise ground-travel distances between sites. Computed once
/// at startup and never recomputed.
///
/// Entry `(i, j)` with `i < j` lives at index `j*(j-1)/2 + i` of the
/// triangular storage.
#[derive(Clone, Debug)]
pub struct DistanceMatrix {
    site_count: usize,
    distances: Vec<f32>,
}

impl DistanceMatrix {
    /// Issues both directions of every unordered pair to the pathing oracle
    /// in a single batch, because the backend is known to return inconsistent
    /// results depending on query direction. The larger reply wins; a failed
    /// pair keeps the straight-line prefill, which can understate ground
    /// distance across unpathable terrain and is a documented approximation.
    pub fn build<O>(sites: &[Site], oracle: &mut O) -> Self
    where
        O: PathingOracle,
    {
        let site_count = sites.len();
        let mut distances = vec![0.0; site_count * site_count.saturating_sub(1) / 2];
        let mut pairs: Vec<(Point2, Point2)> = Vec::with_capacity(distances.len() * 2);

        for j in 0..site_count {
            for i in 0..j {
                let a = sites[i].resource_center;
                let b = sites[j].resource_center;
                pairs.push((a, b));
                pairs.push((b, a));
                // At least as far as the crow flies, in case both queries
                // fail.
                distances[j * (j - 1) / 2 + i] = a.distance(b);
            }
        }

        let replies = oracle.pathing_distances(&pairs);
        if replies.len() != pairs.len() {
            warn!(
                "Pathing oracle returned {} replies for {} queries.",
                replies.len(),
                pairs.len()
            );
        }
        for (k, reply) in replies.iter().enumerate().take(pairs.len()) {
            if let Some(distance) = reply {
                if distances[k / 2] < *distance {
                    distances[k / 2] = *distance;
                }
            }
        }

        DistanceMatrix {
            site_count,
            distances,
        }
    }

    /// O(1), symmetric, zero on the diagonal.
    pub fn get(&self, i: usize, j: usize) -> f32 {
        if i == j {
            return 0.0;
        }
        let (i, j) = if i < j { (i, j) } else { (j, i) };
        self.distances[j * (j - 1) / 2 + i]
    }

    pub fn site_count(&self) -> usize {
        self.site_count
    }
}
