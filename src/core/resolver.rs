// Similar-item resolution: statistics -> feature vectors -> k-means -> ranking
//
// Every call recomputes from the current catalog and order snapshot. Expected
// shortfalls (too few items, a lonely target) and unexpected clustering errors
// both degrade to same-category recommendations; only an unknown target id is
// reported as an error.

use crate::core::catalog::{CatalogSource, OrderHistory};
use crate::core::clustering::{ClusterMember, ClusterResult, KMeansConfig, kmeans_cluster};
use crate::core::config::RecommenderConfig;
use crate::core::error::{CatalogError, ClusterError, RecommendError};
use crate::core::features::{CatalogStats, FeatureExtractor, FeatureVector};
use crate::core::similarity::distance_to_similarity;
use crate::core::types::{
    CatalogItem, FallbackReason, MatchInfo, Recommendations, RefreshReport, SimilarItem, Strategy,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// Result of the clustering path before any category top-up
enum ClusterOutcome {
    Ranked {
        items: Vec<SimilarItem>,
        cluster_id: usize,
        iterations: usize,
        converged: bool,
    },
    Inconclusive(FallbackReason),
}

/// Finds catalog items similar to a target item
pub struct SimilarityResolver<C, O> {
    catalog: C,
    orders: O,
    config: RecommenderConfig,
    extractor: FeatureExtractor,
}

impl<C: CatalogSource, O: OrderHistory> SimilarityResolver<C, O> {
    pub fn new(catalog: C, orders: O, config: RecommenderConfig) -> Self {
        let extractor = FeatureExtractor::new(config.categories.clone());
        SimilarityResolver {
            catalog,
            orders,
            config,
            extractor,
        }
    }

    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    /// Fresh generator per call: seeded when configured, from entropy otherwise
    fn rng(&self) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Ranked items similar to `item_id`; `limit` defaults to the configured result limit
    pub fn find_similar_items(
        &self,
        item_id: &str,
        limit: Option<usize>,
    ) -> Result<Recommendations, RecommendError> {
        let mut rng = self.rng();
        self.find_similar_items_with_rng(item_id, limit, &mut rng)
    }

    pub fn find_similar_items_with_rng<R: Rng>(
        &self,
        item_id: &str,
        limit: Option<usize>,
        rng: &mut R,
    ) -> Result<Recommendations, RecommendError> {
        let limit = self.config.similar_limit(limit);

        let target = self
            .catalog
            .item(item_id)?
            .ok_or_else(|| RecommendError::NotFound(item_id.to_string()))?;

        // target first, then every other item
        let mut candidates = vec![target.clone()];
        candidates.extend(
            self.catalog
                .all_items()?
                .into_iter()
                .filter(|i| i.id != target.id),
        );
        let others = candidates.len() - 1;

        if others < self.config.min_other_items {
            debug!(item_id, others, "Too few items to cluster, using category fallback");
            return self.fallback(&target, limit, FallbackReason::TooFewItems { others });
        }

        let popularity = self.orders.popularity()?;
        let stats = CatalogStats::compute(&candidates, popularity);

        let outcome = self.cluster_target(&candidates, &stats, limit, rng);
        self.resolve_outcome(&target, limit, outcome)
    }

    /// Turn the clustering path's outcome into recommendations, degrading to the category
    fn resolve_outcome(
        &self,
        target: &CatalogItem,
        limit: usize,
        outcome: Result<ClusterOutcome, ClusterError>,
    ) -> Result<Recommendations, RecommendError> {
        let item_id = target.id.as_str();
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(item_id, error = %e, "Clustering failed, using category fallback");
                return self.fallback(
                    target,
                    limit,
                    FallbackReason::Anomaly {
                        message: e.to_string(),
                    },
                );
            }
        };

        match outcome {
            ClusterOutcome::Inconclusive(reason) => {
                debug!(item_id, ?reason, "Clustering inconclusive, using category fallback");
                self.fallback(target, limit, reason)
            }
            ClusterOutcome::Ranked {
                mut items,
                cluster_id,
                iterations,
                converged,
            } => {
                if items.len() < limit {
                    let mut seen: HashSet<String> = items.iter().map(|s| s.item.id.clone()).collect();
                    seen.insert(target.id.clone());
                    let extra = self.category_recommendations(target, limit - items.len(), &seen)?;
                    items.extend(extra);
                }

                debug!(
                    item_id,
                    cluster_id,
                    iterations,
                    converged,
                    results = items.len(),
                    "Resolved similar items"
                );

                Ok(Recommendations {
                    target_id: target.id.clone(),
                    items,
                    strategy: Strategy::Clustered {
                        cluster_id,
                        iterations,
                        converged,
                    },
                })
            }
        }
    }

    /// Cluster all candidates and rank the target's cluster-mates
    ///
    /// `candidates[0]` is the target.
    fn cluster_target<R: Rng>(
        &self,
        candidates: &[CatalogItem],
        stats: &CatalogStats,
        limit: usize,
        rng: &mut R,
    ) -> Result<ClusterOutcome, ClusterError> {
        let points = self.points(candidates, stats);
        let config = self.kmeans_config(self.config.similar_k(candidates.len() - 1));
        let result = kmeans_cluster(&points, &config, rng)?;
        Ok(rank_target_cluster(&result, candidates, limit))
    }

    /// Cluster the whole catalog and report on the partition
    pub fn refresh_clusters(&self) -> Result<RefreshReport, RecommendError> {
        let mut rng = self.rng();
        self.refresh_clusters_with_rng(&mut rng)
    }

    pub fn refresh_clusters_with_rng<R: Rng>(&self, rng: &mut R) -> Result<RefreshReport, RecommendError> {
        info!("Starting product clustering refresh");

        let items = self.catalog.all_items()?;
        if items.is_empty() {
            warn!("Catalog is empty, nothing to cluster");
            return Ok(RefreshReport {
                cluster_count: 0,
                iterations: 0,
                converged: true,
                items_processed: 0,
                cluster_sizes: Vec::new(),
                inertia: 0.0,
            });
        }

        let stats = CatalogStats::compute(&items, self.orders.popularity()?);
        let points = self.points(&items, &stats);
        let config = self.kmeans_config(self.config.refresh_k(items.len()));

        let result = kmeans_cluster(&points, &config, rng).inspect_err(|e| {
            error!(error = %e, "Batch clustering failed");
        })?;

        let cluster_sizes: Vec<usize> = result.sizes().into_iter().filter(|&s| s > 0).collect();
        let report = RefreshReport {
            cluster_count: cluster_sizes.len(),
            iterations: result.iterations,
            converged: result.converged,
            items_processed: items.len(),
            cluster_sizes,
            inertia: result.inertia(),
        };

        info!(
            clusters = report.cluster_count,
            iterations = report.iterations,
            converged = report.converged,
            items = report.items_processed,
            "Clustering refresh completed"
        );

        Ok(report)
    }

    /// Up to `limit` newest items of the target's category, skipping ids in `skip`
    pub fn category_recommendations(
        &self,
        target: &CatalogItem,
        limit: usize,
        skip: &HashSet<String>,
    ) -> Result<Vec<SimilarItem>, CatalogError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let candidates = self.catalog.latest_in_category(
            &target.category,
            Some(&target.id),
            limit + skip.len(),
        )?;

        Ok(candidates
            .into_iter()
            .filter(|i| i.id != target.id && !skip.contains(&i.id))
            .take(limit)
            .map(|item| SimilarItem {
                item,
                similarity_score: self.config.category_fallback_score,
                match_info: MatchInfo::category(&target.category),
            })
            .collect())
    }

    fn fallback(
        &self,
        target: &CatalogItem,
        limit: usize,
        reason: FallbackReason,
    ) -> Result<Recommendations, RecommendError> {
        let items = self.category_recommendations(target, limit, &HashSet::new())?;
        Ok(Recommendations {
            target_id: target.id.clone(),
            items,
            strategy: Strategy::CategoryFallback { reason },
        })
    }

    fn points(&self, items: &[CatalogItem], stats: &CatalogStats) -> Vec<(usize, FeatureVector)> {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| (i, self.extractor.extract(item, stats)))
            .collect()
    }

    fn kmeans_config(&self, k: usize) -> KMeansConfig {
        KMeansConfig::new(k)
            .with_max_iter(self.config.max_iterations)
            .with_tolerance(self.config.tolerance)
    }
}

/// Rank the target's cluster-mates, or say why the partition is no use
///
/// `candidates[0]` is the target and point labels index into `candidates`.
fn rank_target_cluster(
    result: &ClusterResult<usize>,
    candidates: &[CatalogItem],
    limit: usize,
) -> ClusterOutcome {
    let Some(cluster) = result.cluster_of(0) else {
        return ClusterOutcome::Inconclusive(FallbackReason::TargetNotClustered);
    };
    if cluster.len() < 2 {
        return ClusterOutcome::Inconclusive(FallbackReason::ClusterTooSmall {
            size: cluster.len(),
        });
    }

    let items = rank_members(&cluster.members, limit)
        .into_iter()
        .map(|m| SimilarItem {
            item: candidates[m.label].clone(),
            similarity_score: distance_to_similarity(m.distance),
            match_info: MatchInfo::cluster(cluster.id, cluster.len()),
        })
        .collect();

    ClusterOutcome::Ranked {
        items,
        cluster_id: cluster.id,
        iterations: result.iterations,
        converged: result.converged,
    }
}

/// Cluster-mates of the target (label 0), nearest to the centroid first
fn rank_members(members: &[ClusterMember<usize>], limit: usize) -> Vec<&ClusterMember<usize>> {
    let mut mates: Vec<&ClusterMember<usize>> = members.iter().filter(|m| m.label != 0).collect();
    mates.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
    mates.truncate(limit);
    mates
}
