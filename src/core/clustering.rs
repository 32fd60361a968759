// K-means clustering over labelled feature vectors

use crate::core::error::ClusterError;
use crate::core::features::FeatureVector;
use crate::core::similarity::{check_vector, euclidean_distance};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Configuration for k-means clustering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeansConfig {
    /// Number of clusters requested
    pub k: usize,
    /// Maximum iterations
    pub max_iter: usize,
    /// Stop once every centroid moves less than this
    pub tolerance: f32,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        KMeansConfig {
            k: 5,
            max_iter: 100,
            tolerance: 0.001,
        }
    }
}

impl KMeansConfig {
    pub fn new(k: usize) -> Self {
        KMeansConfig {
            k,
            ..Default::default()
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// A clustered point with its distance to the centroid it was assigned to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterMember<T> {
    pub label: T,
    /// Position in the input slice
    pub index: usize,
    pub distance: f32,
}

/// One group of the final partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster<T> {
    pub id: usize,
    pub members: Vec<ClusterMember<T>>,
}

impl<T> Cluster<T> {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Result of k-means clustering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterResult<T> {
    /// One entry per centroid, possibly empty
    pub clusters: Vec<Cluster<T>>,
    /// Final centroids
    pub centroids: Vec<FeatureVector>,
    /// Cluster assignment for each input point
    pub assignments: Vec<usize>,
    /// Number of iterations run
    pub iterations: usize,
    /// True when halted by the tolerance test rather than the iteration cap
    pub converged: bool,
}

impl<T> ClusterResult<T> {
    /// Clusters that received at least one point
    pub fn non_empty(&self) -> impl Iterator<Item = &Cluster<T>> {
        self.clusters.iter().filter(|c| !c.is_empty())
    }

    /// Cluster holding the point at `index` in the input
    pub fn cluster_of(&self, index: usize) -> Option<&Cluster<T>> {
        let id = *self.assignments.get(index)?;
        self.clusters.get(id)
    }

    pub fn sizes(&self) -> Vec<usize> {
        cluster_sizes(&self.assignments, self.clusters.len())
    }

    /// Sum of member distances to their centroid
    pub fn inertia(&self) -> f32 {
        self.clusters
            .iter()
            .flat_map(|c| c.members.iter())
            .map(|m| m.distance)
            .sum()
    }
}

/// Cluster count actually used for `n` points: at most `n`, at least 2 when `n >= 2`
pub fn effective_k(requested: usize, n: usize) -> usize {
    match n {
        0 => 0,
        1 => 1,
        _ => requested.min(n).max(2),
    }
}

/// Index of the nearest centroid and the distance to it; the lowest index wins ties
pub fn nearest_centroid(point: &[f32], centroids: &[FeatureVector]) -> (usize, f32) {
    let mut best = 0;
    let mut best_distance = f32::INFINITY;
    for (c, centroid) in centroids.iter().enumerate() {
        let d = euclidean_distance(point, centroid);
        if d < best_distance {
            best_distance = d;
            best = c;
        }
    }
    (best, best_distance)
}

/// One assignment + update cycle of Lloyd's algorithm
///
/// Returns the (centroid, distance) assignment of every point and the updated
/// centroids. A centroid that received no points keeps its previous position.
pub fn lloyd_step(
    vectors: &[FeatureVector],
    centroids: &[FeatureVector],
) -> (Vec<(usize, f32)>, Vec<FeatureVector>) {
    let assignment: Vec<(usize, f32)> = vectors
        .iter()
        .map(|v| nearest_centroid(v, centroids))
        .collect();

    let mut sums: Vec<Vec<f32>> = centroids.iter().map(|c| vec![0.0; c.len()]).collect();
    let mut counts = vec![0usize; centroids.len()];

    for (v, &(c, _)) in vectors.iter().zip(assignment.iter()) {
        counts[c] += 1;
        for (sum, val) in sums[c].iter_mut().zip(v.iter()) {
            *sum += val;
        }
    }

    let updated = centroids
        .iter()
        .zip(sums)
        .zip(counts.iter())
        .map(|((old, sum), &count)| {
            if count == 0 {
                old.clone()
            } else {
                sum.into_iter().map(|s| s / count as f32).collect()
            }
        })
        .collect();

    (assignment, updated)
}

/// Perform k-means clustering with full configuration
///
/// Centroids start at points sampled uniformly with replacement using `rng`,
/// so a seeded generator makes the run reproducible.
pub fn kmeans_cluster<T: Clone, R: Rng>(
    points: &[(T, FeatureVector)],
    config: &KMeansConfig,
    rng: &mut R,
) -> Result<ClusterResult<T>, ClusterError> {
    validate_points(points)?;

    let n = points.len();
    let k = effective_k(config.k, n);
    let centroids: Vec<FeatureVector> = (0..k)
        .map(|_| points[rng.gen_range(0..n)].1.clone())
        .collect();

    Ok(run_lloyd(points, centroids, config))
}

/// Perform k-means clustering from explicit starting centroids
pub fn kmeans_cluster_from<T: Clone>(
    points: &[(T, FeatureVector)],
    initial_centroids: Vec<FeatureVector>,
    config: &KMeansConfig,
) -> Result<ClusterResult<T>, ClusterError> {
    let dim = validate_points(points)?;
    if initial_centroids.is_empty() {
        return Err(ClusterError::NoCentroids);
    }
    for (i, c) in initial_centroids.iter().enumerate() {
        check_vector(i, c, dim)?;
    }

    Ok(run_lloyd(points, initial_centroids, config))
}

/// Reject empty input and inconsistent vectors, returning the shared dimension
fn validate_points<T>(points: &[(T, FeatureVector)]) -> Result<usize, ClusterError> {
    let Some((_, first)) = points.first() else {
        return Err(ClusterError::EmptyInput);
    };
    let dim = first.len();
    for (i, (_, v)) in points.iter().enumerate() {
        check_vector(i, v, dim)?;
    }
    Ok(dim)
}

fn run_lloyd<T: Clone>(
    points: &[(T, FeatureVector)],
    mut centroids: Vec<FeatureVector>,
    config: &KMeansConfig,
) -> ClusterResult<T> {
    let vectors: Vec<FeatureVector> = points.iter().map(|(_, v)| v.clone()).collect();
    let max_iter = config.max_iter.max(1);

    let mut assignment = Vec::new();
    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iter {
        let (step_assignment, updated) = lloyd_step(&vectors, &centroids);

        converged = centroids
            .iter()
            .zip(updated.iter())
            .all(|(old, new)| euclidean_distance(old, new) < config.tolerance);

        centroids = updated;
        assignment = step_assignment;
        iterations += 1;

        if converged {
            break;
        }
    }

    let mut clusters: Vec<Cluster<T>> = (0..centroids.len())
        .map(|id| Cluster {
            id,
            members: Vec::new(),
        })
        .collect();

    for (index, &(c, distance)) in assignment.iter().enumerate() {
        clusters[c].members.push(ClusterMember {
            label: points[index].0.clone(),
            index,
            distance,
        });
    }

    ClusterResult {
        clusters,
        centroids,
        assignments: assignment.iter().map(|&(c, _)| c).collect(),
        iterations,
        converged,
    }
}

/// Get cluster sizes from assignments
pub fn cluster_sizes(assignments: &[usize], k: usize) -> Vec<usize> {
    let mut sizes = vec![0usize; k];
    for &a in assignments {
        if a < k {
            sizes[a] += 1;
        }
    }
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn labelled(vectors: &[[f32; 2]]) -> Vec<(usize, FeatureVector)> {
        vectors.iter().enumerate().map(|(i, v)| (i, v.to_vec())).collect()
    }

    fn two_blobs() -> Vec<(usize, FeatureVector)> {
        labelled(&[
            [0.0, 0.0],
            [0.05, 0.0],
            [0.0, 0.05],
            [1.0, 1.0],
            [0.95, 1.0],
            [1.0, 0.95],
        ])
    }

    #[test]
    fn test_kmeans_empty() {
        let points: Vec<(usize, FeatureVector)> = vec![];
        let mut rng = StdRng::seed_from_u64(1);
        let result = kmeans_cluster(&points, &KMeansConfig::new(3), &mut rng);
        assert!(matches!(result, Err(ClusterError::EmptyInput)));
    }

    #[test]
    fn test_kmeans_single_point() {
        let points = labelled(&[[0.3, 0.7]]);
        let mut rng = StdRng::seed_from_u64(1);
        let result = kmeans_cluster(&points, &KMeansConfig::new(5), &mut rng).unwrap();
        assert_eq!(result.clusters.len(), 1);
        assert_eq!(result.assignments, vec![0]);
        assert_eq!(result.clusters[0].members[0].distance, 0.0);
        assert!(result.converged);
    }

    #[test]
    fn test_effective_k() {
        assert_eq!(effective_k(5, 0), 0);
        assert_eq!(effective_k(5, 1), 1);
        assert_eq!(effective_k(5, 2), 2);
        assert_eq!(effective_k(0, 10), 2);
        assert_eq!(effective_k(1, 10), 2);
        assert_eq!(effective_k(3, 10), 3);
        assert_eq!(effective_k(8, 4), 4);
    }

    #[test]
    fn test_kmeans_k_larger_than_n() {
        let points = labelled(&[[1.0, 0.0], [0.0, 1.0]]);
        let mut rng = StdRng::seed_from_u64(3);
        let result = kmeans_cluster(&points, &KMeansConfig::new(5), &mut rng).unwrap();
        // k should be clamped to n
        assert_eq!(result.centroids.len(), 2);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let points = vec![(0, vec![0.0, 0.0]), (1, vec![1.0])];
        let mut rng = StdRng::seed_from_u64(1);
        let err = kmeans_cluster(&points, &KMeansConfig::new(2), &mut rng).unwrap_err();
        assert_eq!(
            err,
            ClusterError::DimensionMismatch {
                index: 1,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_same_seed_same_result() {
        let points = two_blobs();
        let config = KMeansConfig::new(2);
        let a = kmeans_cluster(&points, &config, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = kmeans_cluster(&points, &config, &mut StdRng::seed_from_u64(42)).unwrap();

        assert_eq!(a.assignments, b.assignments);
        assert_eq!(a.centroids, b.centroids);
        assert_eq!(a.iterations, b.iterations);
    }

    #[test]
    fn test_members_carry_labels_and_distances() {
        let points = two_blobs();
        let mut rng = StdRng::seed_from_u64(9);
        let result = kmeans_cluster(&points, &KMeansConfig::new(2), &mut rng).unwrap();

        let total: usize = result.clusters.iter().map(|c| c.len()).sum();
        assert_eq!(total, points.len());
        for cluster in &result.clusters {
            for m in &cluster.members {
                assert_eq!(m.label, m.index);
                assert_eq!(result.assignments[m.index], cluster.id);
                assert!(m.distance >= 0.0);
            }
        }
    }

    #[test]
    fn test_lloyd_step_keeps_empty_centroid() {
        let vectors = vec![vec![0.0, 0.0], vec![0.2, 0.0]];
        let centroids = vec![vec![0.1, 0.0], vec![5.0, 5.0]];
        let (assignment, updated) = lloyd_step(&vectors, &centroids);

        assert!(assignment.iter().all(|&(c, _)| c == 0));
        assert!((updated[0][0] - 0.1).abs() < 1e-6);
        assert_eq!(updated[1], vec![5.0, 5.0]);
    }

    #[test]
    fn test_tie_goes_to_lowest_index() {
        let centroids = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        let (c, d) = nearest_centroid(&[0.5, 0.5], &centroids);
        assert_eq!(c, 0);
        assert!((d - 0.5f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_iteration_cap_reported() {
        let points = two_blobs();
        let config = KMeansConfig::new(2).with_max_iter(1).with_tolerance(0.0);
        let mut rng = StdRng::seed_from_u64(5);
        let result = kmeans_cluster(&points, &config, &mut rng).unwrap();

        assert_eq!(result.iterations, 1);
        assert!(!result.converged);
    }

    #[test]
    fn test_explicit_initialisation_separates_blobs() {
        let points = two_blobs();
        let initial = vec![vec![0.0, 0.0], vec![1.0, 1.0]];
        let result = kmeans_cluster_from(&points, initial, &KMeansConfig::new(2)).unwrap();

        assert_eq!(result.assignments, vec![0, 0, 0, 1, 1, 1]);
        assert!(result.converged);
        assert_eq!(result.sizes(), vec![3, 3]);
        assert!((result.centroids[0][0] - 0.05 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_duplicate_initial_centroids_leave_one_empty() {
        let points = two_blobs();
        let initial = vec![vec![0.0, 0.0], vec![0.0, 0.0]];
        let config = KMeansConfig::new(2).with_max_iter(1);
        let result = kmeans_cluster_from(&points, initial, &config).unwrap();

        // every point ties, so all go to the first centroid
        assert_eq!(result.non_empty().count(), 1);
        assert!(result.clusters[1].is_empty());
        assert_eq!(result.centroids[1], vec![0.0, 0.0]);
        assert!(!result.converged);
    }

    #[test]
    fn test_no_initial_centroids_rejected() {
        let points = two_blobs();
        let err = kmeans_cluster_from(&points, vec![], &KMeansConfig::new(2)).unwrap_err();
        assert_eq!(err, ClusterError::NoCentroids);
    }

    #[test]
    fn test_cluster_sizes() {
        let assignments = vec![0, 1, 0, 2, 1, 0];
        let sizes = cluster_sizes(&assignments, 3);
        assert_eq!(sizes, vec![3, 2, 1]);
    }
}
