// Distance and similarity functions for feature vectors

use crate::core::error::ClusterError;
use serde::{Deserialize, Serialize};

/// Compute Euclidean distance between two vectors
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

/// Map a distance to a similarity score in [0, 1]
/// Distance 0 gives 1.0, distance 2 or more gives 0.0, linear in between
pub fn distance_to_similarity(distance: f32) -> f32 {
    if distance.is_nan() {
        return 0.0;
    }
    (1.0 - distance / 2.0).max(0.0).min(1.0)
}

/// Outcome of checking a set of vectors for consistency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub count: usize,
    pub dimension: Option<usize>,
    pub issues: Vec<String>,
}

/// Check that all vectors share one dimension and hold finite values
pub fn validate_vectors(vectors: &[Vec<f32>], expected_dim: Option<usize>) -> ValidationResult {
    if vectors.is_empty() {
        return ValidationResult {
            valid: false,
            count: 0,
            dimension: None,
            issues: vec!["No vectors found".to_string()],
        };
    }

    let dimension = vectors[0].len();
    let expected = expected_dim.unwrap_or(dimension);
    let mut issues = Vec::new();

    for (i, v) in vectors.iter().enumerate() {
        if let Err(e) = check_vector(i, v, expected) {
            issues.push(e.to_string());
        }
    }

    ValidationResult {
        valid: issues.is_empty(),
        count: vectors.len(),
        dimension: Some(dimension),
        issues,
    }
}

/// Check a single vector, reporting the first problem found
pub fn check_vector(index: usize, vector: &[f32], expected: usize) -> Result<(), ClusterError> {
    if vector.len() != expected {
        return Err(ClusterError::DimensionMismatch {
            index,
            expected,
            found: vector.len(),
        });
    }
    if let Some(position) = vector.iter().position(|v| !v.is_finite()) {
        return Err(ClusterError::NonFiniteValue { index, position });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean_distance() {
        assert!((euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 1e-6);
        assert_eq!(euclidean_distance(&[1.0, 1.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_distance_to_similarity_endpoints() {
        assert_eq!(distance_to_similarity(0.0), 1.0);
        assert!((distance_to_similarity(1.0) - 0.5).abs() < 1e-6);
        assert_eq!(distance_to_similarity(2.0), 0.0);
        assert_eq!(distance_to_similarity(7.5), 0.0);
    }

    #[test]
    fn test_validation() {
        let vectors = vec![vec![0.1, 0.2, 0.3], vec![0.4, 0.5, 0.6]];
        let result = validate_vectors(&vectors, None);
        assert!(result.valid);
        assert_eq!(result.count, 2);
        assert_eq!(result.dimension, Some(3));
    }

    #[test]
    fn test_validation_dimension_mismatch() {
        let vectors = vec![vec![0.1, 0.2, 0.3], vec![0.4, 0.5]];
        let result = validate_vectors(&vectors, None);
        assert!(!result.valid);
        assert_eq!(result.issues.len(), 1);
    }

    #[test]
    fn test_check_vector_non_finite() {
        let err = check_vector(4, &[0.0, f32::NAN], 2).unwrap_err();
        assert_eq!(err, ClusterError::NonFiniteValue { index: 4, position: 1 });
    }
}
