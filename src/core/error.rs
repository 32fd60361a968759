// Error types for catalog access, clustering and recommendation requests

use thiserror::Error;

/// Errors raised by the k-means clusterer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusterError {
    #[error("Empty input: no points to cluster")]
    EmptyInput,

    #[error("No initial centroids given")]
    NoCentroids,

    #[error("Point {index} has dimension {found} (expected {expected})")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("Point {index} has a non-finite value at position {position}")]
    NonFiniteValue { index: usize, position: usize },
}

/// Errors raised by the catalog and order-history collaborators
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid catalog snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced to callers of the recommendation operations
#[derive(Error, Debug)]
pub enum RecommendError {
    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Clustering failed: {0}")]
    Clustering(#[from] ClusterError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl RecommendError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RecommendError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = RecommendError::NotFound("b-42".to_string());
        assert_eq!(err.to_string(), "Item not found: b-42");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_catalog_error_is_transparent() {
        let err: RecommendError = CatalogError::Unavailable("timeout".to_string()).into();
        assert_eq!(err.to_string(), "Catalog unavailable: timeout");
        assert!(!err.is_not_found());
    }
}
