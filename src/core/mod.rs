// Core recommendation functionality shared between CLI and Lambda

pub mod error;
pub mod types;
pub mod config;
pub mod features;
pub mod similarity;
pub mod clustering;
pub mod catalog;
pub mod resolver;
pub mod preferences;

// Re-export error types
pub use error::{CatalogError, ClusterError, RecommendError};

// Re-export domain and output types
pub use types::{
    CatalogItem, OrderLine, OrderRecord, OrderStatus, PopularityTable,
    SimilarItem, MatchInfo, FallbackReason, Strategy, Recommendations,
    RefreshReport, PersonalRecommendations,
};

// Re-export configuration
pub use config::RecommenderConfig;

// Re-export feature extraction
pub use features::{
    CategorySet, CategoryPriceStats, CatalogStats, FeatureExtractor, FeatureVector, PriceTier,
};

// Re-export similarity functions
pub use similarity::{
    euclidean_distance, distance_to_similarity, validate_vectors, ValidationResult,
};

// Re-export clustering
pub use clustering::{
    kmeans_cluster, kmeans_cluster_from, lloyd_step, nearest_centroid, effective_k,
    cluster_sizes, Cluster, ClusterMember, ClusterResult, KMeansConfig,
};

// Re-export collaborators
pub use catalog::{CatalogSnapshot, CatalogSource, OrderHistory};

// Re-export recommenders
pub use resolver::SimilarityResolver;
pub use preferences::{PreferenceRecommender, CategoryTally, preferred_category};
