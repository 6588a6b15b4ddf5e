//! # innovator-sync CLI interface
//!
//! Command parsing and orchestration only. Everything that talks to
//! Innovator, reads a BOM or walks a transfer lives in `innovator-sync-core`;
//! this module wires the configured clients into it.
//!
//! - [`Cli`] / [`Commands`]: the clap surface.
//! - [`run`]: async entrypoint shared by `main` and the integration tests.
use crate::hyperthought::HyperThoughtClient;
use crate::load_config::{load_config, resolve_password, CliConfig};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use innovator_sync_core::bom::Bom;
use innovator_sync_core::files::FilesApi;
use innovator_sync_core::odata::ODataClient;
use innovator_sync_core::parts::PartsApi;
use innovator_sync_core::session::Session;
use innovator_sync_core::tagging::{TagOutcome, Tagger};
use innovator_sync_core::transfer::{TransferConfig, TransferPipeline};
use std::path::{Path, PathBuf};

/// CLI for innovator-sync: move tagged CAD data from HyperThought into Aras Innovator.
#[derive(Parser)]
#[clap(
    name = "innovator-sync",
    version,
    about = "Tag HyperThought CAD files from a BOM and transfer them into Aras Innovator"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create parts, assemblies and CAD files in Innovator from a tagged location
    Transfer {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
    /// Write BOM metadata onto CAD files in HyperThought
    Tag {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Tag a single file instead of the whole configured location
        #[clap(long)]
        file_pk: Option<String>,
    },
    /// Print the item type of every BOM row (offline)
    Classify {
        /// Path to the BOM CSV export
        #[clap(long)]
        bom: PathBuf,
    },
}

fn config_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

fn document_source(http: &reqwest::Client, config: &CliConfig) -> Result<HyperThoughtClient> {
    HyperThoughtClient::from_env(http.clone(), &config.hyperthought.base_url)
        .context("Failed to construct the HyperThought client")
}

/// Prints one line per row: item number, part number, item type.
pub fn classify_rows(bom: &Bom) -> Vec<String> {
    bom.rows
        .iter()
        .zip(bom.classify())
        .map(|(row, item_type)| format!("{}\t{}\t{}", row.item_number, row.part_number, item_type))
        .collect()
}

async fn transfer(config_path: PathBuf) -> Result<()> {
    let config = load_config(&config_path)?;
    let transfer_config: TransferConfig = config.transfer_config(&config_dir(&config_path));
    tracing::info!(command = "transfer", space_id = %transfer_config.space_id, "Starting transfer");

    let http = reqwest::Client::new();
    let source = document_source(&http, &config)?;
    let password = resolve_password(&config.innovator.username)?;
    let session = Session::login(&http, &config.credentials(password))
        .await
        .context("Failed to log in to Innovator")?;
    let odata = ODataClient::new(http.clone(), session);
    let parts = PartsApi::new(odata.clone());
    let files = FilesApi::new(odata);

    let pipeline = TransferPipeline::new(&parts, &files, &source, &transfer_config).await?;
    match pipeline.create_parts_from_metadata().await {
        Ok(report) => {
            tracing::info!(
                command = "transfer",
                parts = report.parts.len(),
                assemblies = report.assemblies.len(),
                uploaded = report.uploaded.len(),
                links = report.links.len(),
                skipped = report.skipped.len(),
                "Transfer complete"
            );
            for (name, reason) in &report.skipped {
                println!("skipped {name}: {reason}");
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "transfer", error = %e, "Transfer failed");
            Err(anyhow::Error::new(e))
        }
    }
}

async fn tag(config_path: PathBuf, file_pk: Option<String>) -> Result<()> {
    let config = load_config(&config_path)?;
    let transfer_config = config.transfer_config(&config_dir(&config_path));
    let bom = Bom::from_path(&transfer_config.bom_file)
        .with_context(|| format!("Failed to read BOM {:?}", transfer_config.bom_file))?;

    let http = reqwest::Client::new();
    let source = document_source(&http, &config)?;
    let tagger = Tagger::new(&source, &bom);

    let outcomes = match file_pk {
        Some(pk) => vec![tagger.parse(&pk).await?],
        None => {
            tagger
                .parse_all(&transfer_config.space_id, transfer_config.path.as_deref())
                .await?
        }
    };
    for outcome in &outcomes {
        match outcome {
            TagOutcome::Tagged {
                name, matched_rows, ..
            } => println!("tagged {name} ({matched_rows} BOM rows)"),
            TagOutcome::Skipped { name, .. } => println!("skipped {name}"),
        }
    }
    tracing::info!(command = "tag", files = outcomes.len(), "Tagging complete");
    Ok(())
}

fn classify(bom_path: PathBuf) -> Result<()> {
    let bom = Bom::from_path(&bom_path)
        .with_context(|| format!("Failed to read BOM {:?}", bom_path))?;
    for line in classify_rows(&bom) {
        println!("{line}");
    }
    tracing::info!(command = "classify", rows = bom.rows.len(), "Classification complete");
    Ok(())
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Transfer { config } => transfer(config).await,
        Commands::Tag { config, file_pk } => tag(config, file_pk).await,
        Commands::Classify { bom } => classify(bom),
    }
}
