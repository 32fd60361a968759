// Bookstore Recommender Library
// Product similarity clustering and purchase-history recommendations for both Lambda and CLI

pub mod core;

// Lambda-specific modules (when feature enabled)
#[cfg(feature = "aws")]
mod lambda;

// Re-export core functionality for external use
pub use core::{
    // Errors
    CatalogError, ClusterError, RecommendError,
    // Domain types
    CatalogItem, OrderLine, OrderRecord, OrderStatus, PopularityTable,
    SimilarItem, MatchInfo, FallbackReason, Strategy, Recommendations,
    RefreshReport, PersonalRecommendations,
    // Configuration
    RecommenderConfig,
    // Features
    CategorySet, CatalogStats, FeatureExtractor, FeatureVector, PriceTier,
    // Similarity functions
    euclidean_distance, distance_to_similarity, validate_vectors, ValidationResult,
    // Clustering
    kmeans_cluster, kmeans_cluster_from, lloyd_step, effective_k,
    Cluster, ClusterMember, ClusterResult, KMeansConfig,
    // Collaborators
    CatalogSnapshot, CatalogSource, OrderHistory,
    // Recommenders
    SimilarityResolver, PreferenceRecommender,
};

// Re-export Lambda handler (when feature enabled)
#[cfg(feature = "aws")]
pub use lambda::{handler, Action, Request, Response, ApiGatewayResponse};

/// Install a `tracing` subscriber writing to stderr, filtered by `RUST_LOG` (default `info`)
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
