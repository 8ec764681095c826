mod cli;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use litefetch_hub::{GlobFilters, HubClient, HubConfig, Repo};
use litefetch_models::{default_destination, inspect, registry, resolve, ModelDownloader};
use tracing::info;

fn destination(variant: &str, dest: Option<PathBuf>) -> Result<PathBuf> {
    match dest {
        Some(dest) => Ok(dest),
        None => Ok(default_destination(variant)?),
    }
}

async fn download(config: HubConfig, variant: &str, dest: PathBuf) -> Result<()> {
    info!(
        "Using {} with up to {} attempts per file",
        config.endpoint, config.max_retries
    );
    let downloader = ModelDownloader::new(config)?;
    let mut progress = downloader.start_download(variant, dest.clone())?;

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos:>3}%")?
            .progress_chars("=>-"),
    );
    bar.set_message(variant.to_string());

    while let Some(update) = progress.next().await {
        match update {
            Ok(p) => bar.set_position(p.percent().round() as u64),
            Err(e) => {
                bar.abandon_with_message(format!("{} failed", variant));
                return Err(e).with_context(|| format!("Downloading {}", variant));
            }
        }
    }
    bar.finish_with_message(format!("{} ready", variant));

    println!("✓ Downloaded {}", variant);
    println!("  Path: {}", dest.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Variants => {
            println!("Registered variants:\n");
            for variant in registry::VARIANTS.iter() {
                let source = if variant.is_vendor() {
                    "vendor"
                } else {
                    "reference"
                };
                println!("  {}", variant.id);
                println!("    Name: {}", variant.name);
                println!("    Encoder/decoder: {}", source);
            }
        }

        Commands::Download { variant, dest } => {
            let config = HubConfig::from_env()?;
            let dest = destination(&variant, dest)?;
            download(config, &variant, dest).await?;
        }

        Commands::Files {
            repo,
            globs,
            revision,
            kind,
        } => {
            let client = HubClient::new(HubConfig::from_env()?)?;
            let repo = Repo::new(repo, kind, revision);
            info!("Listing {} on {}", repo, client.config().endpoint);
            let filters = GlobFilters::new(&globs)?;

            let files = client.files_metadata(&repo, &filters).await?;
            if files.is_empty() {
                println!("No files in {} match {}", repo, filters);
            } else {
                let total: u64 = files.iter().map(|f| f.size).sum();
                for file in &files {
                    println!("{:>14}  {}", file.size, file.filename);
                }
                println!("{:>14}  total ({} files)", total, files.len());
            }
        }

        Commands::Status {
            variant,
            dest,
            json,
        } => {
            let plan = resolve(&variant)?;
            let dest = destination(&variant, dest)?;
            let status = inspect(&plan, &dest);

            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("{} in {}", status.variant, status.root.display());
                for asset in &status.assets {
                    match asset.size {
                        Some(size) => println!("  ✓ {} ({} bytes)", asset.path.display(), size),
                        None => println!("  ✗ {} missing", asset.path.display()),
                    }
                }
                println!("  Total on disk: {} bytes", status.total_bytes);
                if !status.is_complete() {
                    println!("\nUse 'litefetch download {}' to fetch it.", variant);
                }
            }
        }
    }

    Ok(())
}
