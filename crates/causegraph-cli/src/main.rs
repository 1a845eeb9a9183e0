//! causegraph - build a deduplicated causal knowledge graph from extracted
//! relationship records.
//!
//! Stages run one at a time and hand off through files in the output
//! directory, so an expensive stage (embedding, labeling) never has to be
//! repeated to rerun a cheap one:
//!
//! ```text
//! causegraph vocab   --records triplets.jsonl      # -> keys.txt
//! causegraph embed                                 # -> embeddings.jsonl
//! causegraph cluster --records triplets.jsonl      # -> clustered_keys.jsonl, merged_keys.jsonl
//! causegraph label                                 # -> cluster_labels.json
//! causegraph graph   --records triplets.jsonl      # -> graph.json
//! causegraph explore                               # k-means elbow report
//! ```
//!
//! # Configuration
//!
//! `--config <file>` (TOML, JSON or YAML), otherwise the user config file if
//! present, then environment overrides (`CAUSEGRAPH_*`, `DEEPINFRA_API_KEY`,
//! `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`). A `.env` file is loaded first.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use causegraph_core::PipelineConfig;

mod commands;

#[derive(Parser)]
#[command(name = "causegraph")]
#[command(about = "Causal relationship knowledge graph pipeline", long_about = None)]
struct Cli {
    /// Configuration file (.toml, .json, .yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory for intermediate and final artifacts
    #[arg(short, long, global = true, env = "CAUSEGRAPH_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive the short-key vocabulary from relationship records
    Vocab {
        /// Relationship records (JSONL)
        #[arg(long)]
        records: PathBuf,
    },

    /// Fetch embeddings for the key vocabulary
    Embed {
        /// Key list (defaults to the vocab output)
        #[arg(long)]
        keys: Option<PathBuf>,

        /// Keep existing embeddings and fetch only missing keys
        #[arg(long)]
        resume: bool,

        /// Maximum requests in flight
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Cluster near-duplicate keys and select representatives
    Cluster {
        /// Relationship records (JSONL)
        #[arg(long)]
        records: PathBuf,

        /// Key embeddings (defaults to the embed output)
        #[arg(long)]
        embeddings: Option<PathBuf>,

        /// Cosine distance radius
        #[arg(long)]
        eps: Option<f64>,

        /// Minimum neighbourhood size, the key itself included
        #[arg(long)]
        min_samples: Option<usize>,
    },

    /// Name every cluster with an LLM
    Label,

    /// Assemble the knowledge graph
    Graph {
        /// Relationship records (JSONL)
        #[arg(long)]
        records: PathBuf,

        /// Cluster labels (defaults to the label output when present)
        #[arg(long)]
        labels: Option<PathBuf>,
    },

    /// Report the k-means inertia curve and elbow of the key embeddings
    Explore {
        /// Key embeddings (defaults to the embed output)
        #[arg(long)]
        embeddings: Option<PathBuf>,

        /// Number of clusters to describe (defaults to the elbow)
        #[arg(short, long)]
        k: Option<usize>,

        /// Members listed per cluster
        #[arg(long, default_value = "10")]
        top: usize,
    },
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => {
            let default = PipelineConfig::default_path();
            if default.exists() {
                tracing::info!("Using config {}", default.display());
                PipelineConfig::from_file(&default)
                    .with_context(|| format!("Failed to load config {}", default.display()))?
            } else {
                PipelineConfig::default()
            }
        }
    };

    let mut config = config.with_env();
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    let mut config = load_config(&cli)?;

    match cli.command {
        Commands::Vocab { records } => commands::vocab(&config, &records).await,
        Commands::Embed {
            keys,
            resume,
            concurrency,
        } => {
            if let Some(n) = concurrency {
                config.fetch.max_concurrency = n;
            }
            commands::embed(&config, keys, resume).await
        }
        Commands::Cluster {
            records,
            embeddings,
            eps,
            min_samples,
        } => {
            if let Some(eps) = eps {
                config.clustering.eps = eps;
            }
            if let Some(min_samples) = min_samples {
                config.clustering.min_samples = min_samples;
            }
            commands::cluster(&config, &records, embeddings).await
        }
        Commands::Label => commands::label(&config).await,
        Commands::Graph { records, labels } => commands::graph(&config, &records, labels).await,
        Commands::Explore { embeddings, k, top } => commands::explore(&config, embeddings, k, top).await,
    }
}
