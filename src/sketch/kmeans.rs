/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Divisive (bisecting) k-means over HLL sketches with Jaccard distance.
//! The routine is a heuristic: it returns a labeling of the points, and
//! downstream correctness never depends on its quality.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::hll::jaccard_registers;

#[derive(Clone, Copy, Debug)]
pub struct ClusteringParams {
    pub min_delta: f64,
    pub max_iterations: usize,
    pub min_cluster_size: usize,
    pub seed: u64,
}

impl Default for ClusteringParams {
    fn default() -> Self {
        Self {
            min_delta: 1e-4,
            max_iterations: 10,
            min_cluster_size: 0,
            seed: 0,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Clustering {
    pub num_clusters: usize,
    pub labels: Vec<u32>,
}

#[inline]
fn distance(a: &[u8], b: &[u8]) -> f64 {
    1.0 - jaccard_registers(a, b)
}

/// Register-wise rounded mean of the member sketches; an HLL-shaped
/// pseudo-sketch good enough to compare Jaccard distances against.
fn centroid(points: &[Vec<u8>], members: &[u32]) -> Vec<u8> {
    let len = points[members[0] as usize].len();
    let mut sums = vec![0u64; len];
    for &m in members {
        for (s, &r) in sums.iter_mut().zip(&points[m as usize]) {
            *s += r as u64;
        }
    }
    let n = members.len() as u64;
    sums.iter().map(|&s| ((s + n / 2) / n) as u8).collect()
}

fn mean_distance(points: &[Vec<u8>], members: &[u32], center: &[u8]) -> f64 {
    members
        .iter()
        .map(|&m| distance(&points[m as usize], center))
        .sum::<f64>()
        / members.len() as f64
}

/// Split `members` in two with Lloyd iterations; returns the two halves,
/// or `None` when the split does not separate the points.
fn bisect(
    points: &[Vec<u8>],
    members: &[u32],
    params: &ClusteringParams,
    rng: &mut SmallRng,
) -> Option<(Vec<u32>, Vec<u32>)> {
    let first = members[rng.random_range(0..members.len())];
    // the second seed is the point farthest from the first
    let second = *members
        .iter()
        .max_by(|&&a, &&b| {
            let da = distance(&points[a as usize], &points[first as usize]);
            let db = distance(&points[b as usize], &points[first as usize]);
            da.total_cmp(&db)
        })
        .unwrap();
    if first == second {
        return None;
    }
    let mut centers = [
        points[first as usize].clone(),
        points[second as usize].clone(),
    ];
    let mut halves: (Vec<u32>, Vec<u32>) = (Vec::new(), Vec::new());
    let mut prev_cost = f64::MAX;
    for _ in 0..params.max_iterations {
        halves.0.clear();
        halves.1.clear();
        let mut cost = 0.0;
        for &m in members {
            let d0 = distance(&points[m as usize], &centers[0]);
            let d1 = distance(&points[m as usize], &centers[1]);
            if d0 <= d1 {
                halves.0.push(m);
                cost += d0;
            } else {
                halves.1.push(m);
                cost += d1;
            }
        }
        if halves.0.is_empty() || halves.1.is_empty() {
            return None;
        }
        cost /= members.len() as f64;
        if prev_cost - cost < params.min_delta {
            break;
        }
        prev_cost = cost;
        centers[0] = centroid(points, &halves.0);
        centers[1] = centroid(points, &halves.1);
    }
    if halves.0.is_empty() || halves.1.is_empty() {
        None
    } else {
        Some(halves)
    }
}

/// Cluster `points` (one register array per point) by recursive
/// bisection; a cluster splits while the split lowers its mean distance
/// to the centroid by more than `min_delta` and both halves respect
/// `min_cluster_size`.
pub fn kmeans_divisive(points: &[Vec<u8>], params: &ClusteringParams) -> Clustering {
    let num_points = points.len();
    if num_points == 0 {
        return Clustering::default();
    }
    let mut rng = SmallRng::seed_from_u64(params.seed);
    let mut final_clusters: Vec<Vec<u32>> = Vec::new();
    let mut queue: Vec<Vec<u32>> = vec![(0..num_points as u32).collect()];

    while let Some(members) = queue.pop() {
        let splittable = members.len() >= 2 && members.len() >= 2 * params.min_cluster_size;
        if !splittable {
            final_clusters.push(members);
            continue;
        }
        let center = centroid(points, &members);
        let cost = mean_distance(points, &members, &center);
        match bisect(points, &members, params, &mut rng) {
            Some((left, right))
                if left.len() >= params.min_cluster_size
                    && right.len() >= params.min_cluster_size =>
            {
                let left_cost = mean_distance(points, &left, &centroid(points, &left));
                let right_cost = mean_distance(points, &right, &centroid(points, &right));
                let new_cost = (left_cost * left.len() as f64 + right_cost * right.len() as f64)
                    / members.len() as f64;
                if cost - new_cost > params.min_delta {
                    queue.push(left);
                    queue.push(right);
                } else {
                    final_clusters.push(members);
                }
            }
            _ => final_clusters.push(members),
        }
    }

    let mut labels = vec![0u32; num_points];
    for (cluster_id, members) in final_clusters.iter().enumerate() {
        for &m in members {
            labels[m as usize] = cluster_id as u32;
        }
    }
    Clustering {
        num_clusters: final_clusters.len(),
        labels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sketch::HllSketch;

    #[test]
    fn separates_disjoint_groups() {
        // two groups of near-identical sets, far apart from each other
        let mut points = Vec::new();
        for g in 0..2u64 {
            for variant in 0..5u64 {
                let mut sketch = HllSketch::new(8);
                for i in 0..2000 {
                    sketch.add(g * 1_000_000 + i);
                }
                sketch.add(g * 1_000_000 + 5000 + variant);
                points.push(sketch.registers().to_vec());
            }
        }
        let clustering = kmeans_divisive(&points, &ClusteringParams::default());
        assert_eq!(clustering.labels.len(), 10);
        assert!(clustering.num_clusters >= 2);
        // the two groups never share a cluster
        for i in 0..5 {
            for j in 5..10 {
                assert_ne!(clustering.labels[i], clustering.labels[j]);
            }
        }
    }

    #[test]
    fn degenerate_inputs() {
        assert_eq!(kmeans_divisive(&[], &ClusteringParams::default()).num_clusters, 0);
        let one = vec![vec![0u8; 16]];
        let clustering = kmeans_divisive(&one, &ClusteringParams::default());
        assert_eq!(clustering.num_clusters, 1);
        assert_eq!(clustering.labels, vec![0]);
    }
}
