//! Subcommand handlers.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use causegraph_core::cluster::kmeans::{self, KMeansConfig};
use causegraph_core::export::{
    write_clustered_keys, write_clusters, write_embeddings, write_graph, write_key_list, write_labels, ArtifactLayout,
};
use causegraph_core::import::{
    read_clustered_keys, read_clusters, read_embeddings, read_key_list, read_labels, read_records,
};
use causegraph_core::labels::label_records;
use causegraph_core::{ClusterArtifacts, EmbeddingTable, LabelSet, Pipeline, PipelineConfig};
use causegraph_embeddings::EmbedderFactory;
use causegraph_llm::LlmFactory;

fn layout(config: &PipelineConfig) -> ArtifactLayout {
    ArtifactLayout::new(&config.output_dir)
}

fn pipeline(config: &PipelineConfig) -> Result<Pipeline> {
    Pipeline::new(config.clone()).context("Invalid pipeline configuration")
}

pub async fn vocab(config: &PipelineConfig, records: &Path) -> Result<()> {
    let pipeline = pipeline(config)?;
    let (records, stats) = read_records(records).await?;
    let vocabulary = pipeline.vocabulary(&records);

    let out = layout(config).key_list();
    write_key_list(&out, &vocabulary).await?;
    println!(
        "{} records ({} skipped) -> {} keys in {}",
        stats.imported,
        stats.skipped,
        vocabulary.len(),
        out.display()
    );
    Ok(())
}

pub async fn embed(config: &PipelineConfig, keys: Option<PathBuf>, resume: bool) -> Result<()> {
    let pipeline = pipeline(config)?;
    let layout = layout(config);
    let keys = read_key_list(keys.unwrap_or_else(|| layout.key_list())).await?;
    let out = layout.embeddings();

    let mut table = if resume && out.exists() {
        let (existing, _) = read_embeddings(&out).await?;
        info!(existing = existing.len(), "Resuming from existing embeddings");
        existing
    } else {
        EmbeddingTable::new()
    };

    let pending: Vec<_> = keys.into_iter().filter(|k| !table.contains(k)).collect();
    if pending.is_empty() {
        println!("All keys already embedded in {}", out.display());
        return Ok(());
    }

    let embedder = EmbedderFactory::create(config.embedder.provider, config.embedder.config.clone())?;
    let outcome = pipeline.embed(embedder.as_ref(), &pending).await;
    for embedding in outcome.table.iter() {
        table.insert(embedding.clone());
    }
    for failed in &outcome.failed {
        warn!(key = %failed.key, error = %failed.error, "Key left without embedding");
    }

    write_embeddings(&out, &table).await?;
    println!(
        "Embedded {}/{} keys ({} failed) -> {}",
        outcome.table.len(),
        pending.len(),
        outcome.failed.len(),
        out.display()
    );
    Ok(())
}

pub async fn cluster(config: &PipelineConfig, records: &Path, embeddings: Option<PathBuf>) -> Result<()> {
    let pipeline = pipeline(config)?;
    let layout = layout(config);
    let (records, _) = read_records(records).await?;
    let (table, _) = read_embeddings(embeddings.unwrap_or_else(|| layout.embeddings())).await?;

    let vocabulary = pipeline.vocabulary(&records);
    let artifacts = pipeline.cluster(&vocabulary, &table)?;

    write_clustered_keys(layout.clustered_keys(), &artifacts.clustered).await?;
    write_clusters(layout.merged_keys(), &artifacts.clusters).await?;
    println!(
        "{} keys: {} clusters, {} noise, {} without embeddings (eps={}, min_samples={})",
        vocabulary.len(),
        artifacts.clusters.len(),
        artifacts.noise_count(),
        artifacts.unembedded.len(),
        config.clustering.eps,
        config.clustering.min_samples
    );
    Ok(())
}

pub async fn label(config: &PipelineConfig) -> Result<()> {
    let pipeline = pipeline(config)?;
    let layout = layout(config);
    let clusters = read_clusters(layout.merged_keys()).await?;
    if clusters.is_empty() {
        println!("No clusters to label");
        return Ok(());
    }

    let llm = LlmFactory::create(config.llm.provider, config.llm.config.clone())?;
    let labels = pipeline.label(llm, &clusters).await;
    let records = label_records(&labels, &clusters);

    write_labels(layout.labels(), &records).await?;
    println!(
        "Labeled {}/{} clusters -> {}",
        labels.len(),
        clusters.len(),
        layout.labels().display()
    );
    Ok(())
}

pub async fn graph(config: &PipelineConfig, records: &Path, labels: Option<PathBuf>) -> Result<()> {
    let pipeline = pipeline(config)?;
    let layout = layout(config);
    let (records, _) = read_records(records).await?;
    let artifacts = ClusterArtifacts::from_tables(
        read_clustered_keys(layout.clustered_keys()).await?,
        read_clusters(layout.merged_keys()).await?,
    );

    let labels = match labels {
        Some(path) => read_labels(path).await?,
        None if layout.labels().exists() => read_labels(layout.labels()).await?,
        None => {
            info!("No cluster labels found, using generic names");
            LabelSet::new()
        }
    };

    let graph = pipeline.assemble(&records, &artifacts, &labels);
    write_graph(layout.graph(), &graph).await?;

    let stats = graph.stats();
    println!(
        "{} entities, {} clusters, {} relations, {} memberships -> {}",
        stats.entity_nodes,
        stats.cluster_nodes,
        stats.relation_edges,
        stats.membership_edges,
        layout.graph().display()
    );
    Ok(())
}

pub async fn explore(config: &PipelineConfig, embeddings: Option<PathBuf>, k: Option<usize>, top: usize) -> Result<()> {
    let layout = layout(config);
    let (table, _) = read_embeddings(embeddings.unwrap_or_else(|| layout.embeddings())).await?;
    let aligned = table.aligned();
    if aligned.keys.len() < 2 {
        bail!("Need at least 2 embedded keys to explore, found {}", aligned.keys.len());
    }

    let kmeans_config = KMeansConfig::default();
    let curve = kmeans::inertia_curve(&aligned.vectors, &kmeans_config)?;
    println!("k\tinertia");
    for (k, inertia) in &curve {
        println!("{}\t{:.4}", k, inertia);
    }

    let elbow = kmeans::find_elbow(&curve);
    match elbow {
        Some(e) => println!("Elbow at k={}", e),
        None => println!("No elbow found"),
    }

    let Some(k) = k.or(elbow) else {
        return Ok(());
    };
    let fit = kmeans::fit(&aligned.vectors, k, &kmeans_config)?;
    for cluster in 0..fit.k {
        let members = kmeans::top_members(&aligned.keys, &aligned.vectors, &fit, cluster, top);
        let size = fit.members(cluster).len();
        let names: Vec<&str> = members.iter().map(|m| m.as_str()).collect();
        println!("\ncluster {} ({} keys): {}", cluster, size, names.join(", "));
    }
    Ok(())
}
