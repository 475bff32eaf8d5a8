//! Command-line interface for abm.
//!
//! Provides commands for fetching and validating a manifest and for
//! inspecting the resolved configuration.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fs2::FileExt;
use reqwest::Url;
use tokio::sync::mpsc;

use crate::adapters::{fallback_from_file, FulfillmentProgress, WebPubManifestParser};
use crate::config::{self, ResolvedConfig};
use crate::core::{AcquisitionOutcome, AcquisitionRequest, LicenseCheckChain, ManifestOrchestrator};
use crate::domain::{AudioBookManifest, Credentials};

/// abm - Audiobook manifest acquisition
#[derive(Parser, Debug)]
#[command(name = "abm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch, parse, and license-check a manifest
    Fetch(FetchArgs),

    /// Show resolved configuration (debug)
    Config,
}

#[derive(clap::Args, Debug)]
pub struct FetchArgs {
    /// Manifest URI
    pub uri: String,

    /// Expected manifest content type
    #[arg(short = 't', long, default_value = "application/audiobook+json")]
    pub content_type: String,

    /// Client identity (overrides configuration)
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Username for HTTP basic authentication
    #[arg(long)]
    pub username: Option<String>,

    /// Password for HTTP basic authentication (used only with --username)
    #[arg(long, env = "ABM_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Bearer token (ignored when --username is given)
    #[arg(long, env = "ABM_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Treat the network as unavailable
    #[arg(long)]
    pub offline: bool,

    /// Local manifest to use when the network is unavailable
    #[arg(long)]
    pub fallback: Option<PathBuf>,

    /// Scratch directory (overrides configuration)
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Skip all license checks
    #[arg(long)]
    pub no_license_checks: bool,

    /// Print the full step log as JSON
    #[arg(long)]
    pub json: bool,
}

impl FetchArgs {
    /// Basic auth when a username is given, else a bearer token, else none
    ///
    /// A password without a username is ignored so an exported
    /// `ABM_PASSWORD` does not affect anonymous fetches.
    fn credentials(&self) -> Result<Option<Credentials>> {
        if let Some(username) = &self.username {
            let password = self
                .password
                .clone()
                .with_context(|| format!("No password given for user '{}'", username))?;
            return Ok(Some(Credentials::UsernamePassword {
                username: username.clone(),
                password,
            }));
        }

        Ok(self.token.clone().map(|token| Credentials::BearerToken { token }))
    }

    /// Turn arguments plus configuration into a request
    fn request(&self, config: &ResolvedConfig) -> Result<AcquisitionRequest<AudioBookManifest>> {
        let target_uri =
            Url::parse(&self.uri).with_context(|| format!("Invalid manifest URI: {}", self.uri))?;

        let license_checks = if self.no_license_checks {
            LicenseCheckChain::new()
        } else {
            config.license_check_chain()
        };

        let offline = self.offline;
        let mut request = AcquisitionRequest::new(target_uri, self.content_type.clone())
            .with_user_agent(
                self.user_agent
                    .clone()
                    .unwrap_or_else(|| config.user_agent.clone()),
            )
            .with_strategy_registry(config.strategy_registry())
            .with_network_available(move || !offline)
            .with_parser(WebPubManifestParser)
            .with_cache_directory(
                self.cache_dir
                    .clone()
                    .unwrap_or_else(|| config.cache_dir.clone()),
            );
        request.license_checks = license_checks;

        if let Some(credentials) = self.credentials()? {
            request = request.with_credentials(credentials);
        }
        if let Some(path) = &self.fallback {
            request = request.with_fallback(fallback_from_file(path, self.content_type.clone()));
        }

        Ok(request)
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Fetch(args) => fetch(args).await,
            Commands::Config => show_config(),
        }
    }
}

/// Fetch a manifest and report the outcome
async fn fetch(args: FetchArgs) -> Result<()> {
    let config = config::load()?;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let request = args.request(&config)?.with_progress_sink(tx);
    let cache_dir = request.cache_directory.clone();

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            print_progress(&event);
        }
    });

    // The pipeline blocks on network I/O; keep it off the async workers.
    let outcome = tokio::task::spawn_blocking(move || -> Result<AcquisitionOutcome<AudioBookManifest>> {
        let _lock = lock_cache_directory(&cache_dir)?;
        Ok(ManifestOrchestrator::new().orchestrate(&request))
    })
    .await
    .context("Acquisition task panicked")??;

    printer.await.context("Progress printer panicked")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&outcome).context("Failed to serialize outcome")?
        );
    } else if let Some(result) = outcome.value() {
        let manifest = &result.manifest;
        println!("Title: {}", manifest.metadata.title);
        println!("Identifier: {}", manifest.metadata.identifier);
        println!("Chapters: {}", manifest.reading_order.len());
        if let Some(duration) = manifest.total_duration() {
            println!("Duration: {:.0}s", duration);
        }
        println!("Content type: {}", result.content_type);
        println!("Source: {:?}", result.source);
        if let Some(diagnostic) = &result.fulfillment_diagnostic {
            eprintln!("Note: {}", diagnostic);
        }
    } else {
        eprint!("{}", outcome.support_report());
    }

    if outcome.is_failure() {
        std::process::exit(1);
    }

    Ok(())
}

/// Hold an exclusive lock on the cache directory for one acquisition
///
/// Concurrent `abm` processes sharing a cache directory take turns.
fn lock_cache_directory(cache_dir: &Path) -> Result<File> {
    std::fs::create_dir_all(cache_dir)
        .with_context(|| format!("Failed to create cache directory: {}", cache_dir.display()))?;

    let lock_path = cache_dir.join(".lock");
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .open(&lock_path)
        .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;

    file.lock_exclusive()
        .with_context(|| format!("Failed to lock cache directory: {}", cache_dir.display()))?;

    Ok(file)
}

fn print_progress(event: &FulfillmentProgress) {
    match event {
        FulfillmentProgress::Started { uri } => eprintln!("Requesting {}", uri),
        FulfillmentProgress::Received {
            received,
            expected: Some(expected),
        } => eprintln!("Received {}/{} bytes", received, expected),
        FulfillmentProgress::Received { received, .. } => {
            eprintln!("Received {} bytes", received)
        }
        FulfillmentProgress::Finished { received } => {
            eprintln!("Finished ({} bytes)", received)
        }
    }
}

/// Show resolved configuration
fn show_config() -> Result<()> {
    let config = config::load()?;

    println!("Config file: {}", match &config.config_file {
        Some(path) => path.display().to_string(),
        None => "(none)".to_string(),
    });
    println!("Home: {}", config.home.display());
    println!("Cache: {}", config.cache_dir.display());
    println!("User agent: {}", config.user_agent);
    println!("HTTP timeout: {}s", config.http_timeout.as_secs());
    println!("License checks:");
    println!("  expiration: {}", config.license_checks.expiration);
    println!("  reading_order: {}", config.license_checks.reading_order);

    Ok(())
}
