/*
 * SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: LicenseRef-NvidiaProprietary
 *
 * NVIDIA CORPORATION, its affiliates and licensors retain all intellectual
 * property and proprietary rights in and to this material, related
 * documentation and any modifications thereto. Any use, reproduction,
 * disclosure or distribution of this material and related documentation
 * without an express license agreement from NVIDIA CORPORATION or
 * its affiliates is strictly prohibited.
 */

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use firmware_catalog::inventory::RestInventory;
use firmware_catalog::registry::RestCatalogRegistry;
use firmware_catalog::repository::SshRepository;
use firmware_catalog::{
    CatalogConfig, CatalogRequest, Orchestrator, ReaderRegistry, UpdateType, Vendor,
};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Parser)]
#[command(
    name = "firmware-catalog",
    about = "Vendor firmware catalog ingestion",
    version
)]
struct Cli {
    /// Directory for log files (if not specified, only console logging is used)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[arg(long, default_value = "WARN", global = true)]
    log_level: Option<String>,

    #[arg(long, default_value = "DEBUG", global = true)]
    file_log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Read the vendor catalog, materialize binaries and submit everything to the registry
    Create(RunArgs),

    /// Read the vendor catalog and print it as JSON, without materializing or submitting
    Read(RunArgs),

    /// Print an annotated example config file
    DefaultConfig,
}

/// Config file plus command line overrides. Flags win over the file.
#[derive(Debug, Args)]
struct RunArgs {
    /// Path to the catalog config file
    #[arg(short, long, env = "FIRMWARE_CATALOG_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long)]
    name: Option<String>,

    #[arg(long, value_enum)]
    vendor: Option<Vendor>,

    #[arg(long, value_enum)]
    update_type: Option<UpdateType>,

    #[arg(long)]
    vendor_url: Option<String>,

    #[arg(long, env = "FIRMWARE_CATALOG_VENDOR_TOKEN", hide_env_values = true)]
    vendor_token: Option<String>,

    #[arg(long)]
    local_catalog_path: Option<PathBuf>,

    #[arg(long)]
    local_binaries_path: Option<PathBuf>,

    /// Target system names, replaces systems_filter (can be given multiple times)
    #[arg(long = "system")]
    systems: Vec<String>,

    /// Target server types, replaces server_types_filter (can be given multiple times)
    #[arg(long = "server-type")]
    server_types: Vec<String>,

    #[arg(long)]
    download: bool,

    #[arg(long)]
    upload: bool,

    #[arg(long, env = "FIRMWARE_CATALOG_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

impl RunArgs {
    fn load_config(&self) -> Result<CatalogConfig> {
        let mut config = match &self.config {
            Some(path) => CatalogConfig::load(path)?,
            None => CatalogConfig::default(),
        };
        self.apply_overrides(&mut config)?;
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut CatalogConfig) -> Result<()> {
        if let Some(name) = &self.name {
            config.name = name.clone();
        }
        if let Some(vendor) = self.vendor {
            config.vendor = Some(vendor);
        }
        if let Some(update_type) = self.update_type {
            config.update_type = update_type;
        }
        if let Some(vendor_url) = &self.vendor_url {
            config.vendor_url = Some(vendor_url.clone());
        }
        if let Some(vendor_token) = &self.vendor_token {
            config.vendor_token = Some(vendor_token.clone());
        }
        if let Some(path) = &self.local_catalog_path {
            config.local_catalog_path = Some(path.clone());
        }
        if let Some(path) = &self.local_binaries_path {
            config.local_binaries_path = Some(path.clone());
        }
        if !self.systems.is_empty() {
            config.systems_filter = self.systems.clone();
        }
        if !self.server_types.is_empty() {
            config.server_types_filter = self.server_types.clone();
        }
        config.download_binaries |= self.download;
        config.upload_binaries |= self.upload;
        if let Some(api_key) = &self.api_key {
            let Some(api) = &mut config.api else {
                anyhow::bail!("--api-key needs an [api] section in the config file");
            };
            api.api_key = Some(api_key.clone());
        }
        Ok(())
    }
}

fn build_orchestrator(
    config: &CatalogConfig,
    http_client: reqwest::Client,
) -> Result<Orchestrator> {
    let mut orchestrator = Orchestrator::new(
        http_client.clone(),
        ReaderRegistry::with_defaults(http_client.clone()),
    );
    if let Some(api) = &config.api {
        let endpoint = api.endpoint()?;
        orchestrator = orchestrator
            .with_registry(Arc::new(RestCatalogRegistry::new(
                endpoint.clone(),
                http_client.clone(),
            )))
            .with_inventory(Arc::new(RestInventory::new(endpoint, http_client)));
    }
    if let Some(repository) = &config.repository {
        orchestrator = orchestrator.with_repository(Arc::new(SshRepository::new(
            repository.sftp_target(),
            repository.root_path.clone(),
        )));
    }
    Ok(orchestrator)
}

async fn run(command: Commands) -> Result<()> {
    let (args, submit) = match command {
        Commands::DefaultConfig => {
            println!("{}", CatalogConfig::default().into_annotated_config_file());
            return Ok(());
        }
        Commands::Create(args) => (args, true),
        Commands::Read(args) => (args, false),
    };

    let config = args.load_config()?;
    let request: CatalogRequest = if submit {
        config.validate()?
    } else {
        config.validate_read()?
    };
    let http_client = reqwest::Client::builder()
        .build()
        .context("Failed to build HTTP client")?;
    let orchestrator = build_orchestrator(&config, http_client)?;

    if !submit {
        let catalog = orchestrator.read(&request).await?;
        println!("{}", serde_json::to_string_pretty(&catalog)?);
        return Ok(());
    }

    let result = orchestrator
        .run(&request)
        .await
        .with_context(|| format!("Catalog run '{}' failed", request.name))?;
    if let Some(catalog_id) = result.catalog_id {
        println!(
            "catalog {catalog_id}: {} binaries registered",
            result.binaries.len()
        );
    }
    for (external_id, binary_id) in &result.binaries {
        println!("  {binary_id}\t{external_id}");
    }
    for (external_id, reason) in &result.skipped {
        println!("  skipped\t{external_id}\t{reason}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let file_env_filter = EnvFilter::builder().parse(
        cli.file_log_level
            .unwrap_or_else(|| "firmware_catalog=DEBUG".to_string()),
    )?;
    let console_env_filter = EnvFilter::builder().parse(
        cli.log_level
            .unwrap_or_else(|| "firmware_catalog=WARN".to_string()),
    )?;

    let console_layer = tracing_subscriber::fmt::layer()
        .with_ansi(true)
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(console_env_filter);

    // Keep the guard alive
    let _guard = if let Some(log_dir) = &cli.log_dir {
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

        let file_appender = tracing_appender::rolling::Builder::new()
            .filename_prefix("firmware-catalog")
            .filename_suffix("log")
            .build(log_dir)
            .context("Failed to create file appender")?;

        let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_writer(non_blocking_writer)
            .with_filter(file_env_filter);

        tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .try_init()?;

        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(console_layer)
            .try_init()?;

        None
    };

    run(cli.command).await
}
