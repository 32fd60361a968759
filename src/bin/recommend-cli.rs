// CLI tool for bookstore recommendations over a JSON catalog snapshot
// Uses shared core functionality from the bookstore_recommender library

use bookstore_recommender::{
    CatalogSnapshot, CatalogStats, OrderHistory, PreferenceRecommender, RecommenderConfig,
    SimilarityResolver, init_tracing, validate_vectors,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "recommend-cli")]
#[command(version = "0.1.0")]
#[command(about = "Bookstore recommendation CLI tool", long_about = None)]
struct Cli {
    /// Catalog snapshot JSON file (reads stdin when omitted)
    #[arg(short, long, global = true)]
    snapshot: Option<PathBuf>,

    /// Fixed seed for k-means initialisation
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Pretty print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find items similar to one catalog item
    Similar {
        /// Target item id
        item_id: String,
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Cluster the whole catalog and report on the partition
    Refresh,

    /// Print the normalised feature vector of every item
    Features,

    /// Recommend from a customer's purchase history
    Preferences {
        /// Customer id
        customer_id: String,
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[derive(Serialize)]
struct ItemFeatures<'a> {
    id: &'a str,
    category: &'a str,
    features: Vec<f32>,
}

fn load_snapshot(path: Option<PathBuf>) -> Result<CatalogSnapshot, Box<dyn std::error::Error>> {
    let content = match path {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    Ok(CatalogSnapshot::from_json(&content)?)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), Box<dyn std::error::Error>> {
    let output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", output);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = RecommenderConfig::from_env();
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }

    let snapshot = load_snapshot(cli.snapshot)?;
    info!(
        items = snapshot.items.len(),
        orders = snapshot.orders.len(),
        "Loaded catalog snapshot"
    );

    match cli.command {
        Commands::Similar { item_id, limit } => {
            let resolver = SimilarityResolver::new(&snapshot, &snapshot, config);
            let recommendations = resolver.find_similar_items(&item_id, limit)?;
            print_json(&recommendations, cli.pretty)?;
        }

        Commands::Refresh => {
            let resolver = SimilarityResolver::new(&snapshot, &snapshot, config);
            let report = resolver.refresh_clusters()?;
            print_json(&report, cli.pretty)?;
        }

        Commands::Features => {
            let resolver = SimilarityResolver::new(&snapshot, &snapshot, config);
            let extractor = resolver.extractor();
            let stats = CatalogStats::compute(&snapshot.items, snapshot.popularity()?);
            let vectors = extractor.extract_all(&snapshot.items, &stats);
            let validation = validate_vectors(&vectors, Some(extractor.dimension()));

            let items: Vec<ItemFeatures> = snapshot
                .items
                .iter()
                .zip(vectors)
                .map(|(item, features)| ItemFeatures {
                    id: &item.id,
                    category: &item.category,
                    features,
                })
                .collect();

            let result = serde_json::json!({
                "dimension": extractor.dimension(),
                "categories": extractor.categories().names(),
                "items": items,
                "validation": validation,
            });
            print_json(&result, cli.pretty)?;
        }

        Commands::Preferences { customer_id, limit } => {
            let limit = config.preference_limit(limit);
            let recommender = PreferenceRecommender::new(&snapshot, &snapshot, limit);
            let recommendations = recommender.recommend(&customer_id)?;
            print_json(&recommendations, cli.pretty)?;
        }
    }

    Ok(())
}
