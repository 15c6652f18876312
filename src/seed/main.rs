//! Bulk loader for hoarding records.
//!
//! Takes a JSON array of records whose images are already hosted (each
//! row carries its imageUrl), validates coordinates up front and
//! bulk-indexes the rest. Rows with bad coordinates are skipped, not
//! fatal.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

use hoardmap::elasticsearch::{create_index, BulkIndexer, EsClient};
use hoardmap::geo::{parse_point, CoordinateInput};
use hoardmap::models::{ConsultationStatus, Hoarding, HoardingDraft, Location};

#[derive(Parser, Debug)]
#[command(name = "seed")]
#[command(about = "Bulk-load hoarding records into Elasticsearch")]
struct Args {
    /// JSON file holding an array of hoarding records
    #[arg(short, long)]
    file: PathBuf,

    /// Elasticsearch URL
    #[arg(long, default_value = "http://localhost:9200")]
    es_url: String,

    /// Elasticsearch index name
    #[arg(long, default_value = "hoardings")]
    index: String,

    /// Create/recreate index before loading
    #[arg(long)]
    create_index: bool,

    /// Batch size for bulk indexing
    #[arg(long, default_value = "500")]
    batch_size: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedRecord {
    name: Option<String>,
    address: Option<String>,
    coordinates: CoordinateInput,
    width: Option<f64>,
    height: Option<f64>,
    price: Option<f64>,
    status: Option<String>,
    consultation_status: Option<ConsultationStatus>,
    owner_name: Option<String>,
    owner_contact_number: Option<String>,
    notes: Option<String>,
    image_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("HoardMap Seed Loader");
    info!("File: {}", args.file.display());

    let es_client = EsClient::connect(&args.es_url, &args.index)
        .await
        .context("Failed to connect to Elasticsearch")?;

    if !es_client.is_healthy().await? {
        anyhow::bail!("Elasticsearch cluster is not healthy");
    }
    info!("Connected to Elasticsearch");

    if args.create_index {
        create_index(&es_client, true).await?;
    }

    let file = File::open(&args.file).context("Failed to open seed file")?;
    let records: Vec<SeedRecord> =
        serde_json::from_reader(BufReader::new(file)).context("Failed to parse seed file")?;
    info!("Loaded {} records", records.len());

    let pb = ProgressBar::new(records.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})",
            )?
            .progress_chars("#>-"),
    );

    let mut indexer = BulkIndexer::new(es_client.clone(), args.batch_size);
    let mut skipped = 0usize;
    let now = Utc::now();

    for (row, record) in records.into_iter().enumerate() {
        pb.inc(1);

        let point = match parse_point(&record.coordinates) {
            Ok(p) => p,
            Err(e) => {
                warn!("Skipping record {}: {}", row, e);
                skipped += 1;
                continue;
            }
        };

        let draft = HoardingDraft {
            name: record.name,
            address: record.address,
            width: record.width,
            height: record.height,
            price: record.price,
            status: record.status,
            consultation_status: record.consultation_status,
            owner_name: record.owner_name,
            owner_contact_number: record.owner_contact_number,
            notes: record.notes,
        };
        let hoarding = Hoarding::from_draft(
            Uuid::new_v4().to_string(),
            draft,
            Location::from(point),
            record.image_url,
            now,
        );

        indexer.add(hoarding).await?;
    }

    pb.finish_with_message("Loading complete");

    let (indexed, errors) = indexer.finish().await?;
    info!(
        "Indexed {} documents ({} errors, {} skipped)",
        indexed, errors, skipped
    );

    let doc_count = es_client.doc_count().await?;
    info!("Total documents in index: {}", doc_count);

    Ok(())
}
