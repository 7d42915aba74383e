// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use storage_scraper::config::settings::{default_config_path, ConfigUpdate, Settings};
use storage_scraper::domain::models::RunSummary;
use storage_scraper::domain::services::extraction_service::ExtractionService;
use storage_scraper::domain::services::llm_service::OllamaService;
use storage_scraper::engines::browser_engine::BrowserEngine;
use storage_scraper::infrastructure::export::{export, ExportFormat};
use storage_scraper::utils::telemetry;
use storage_scraper::utils::url_utils::{dedup_urls, is_http_url, read_url_file};
use storage_scraper::workers::{ScrapeManager, ScrapeWorker};

#[derive(Parser)]
#[command(
    name = "storage-scraper",
    about = "Extract self-storage unit sizes and prices from facility web pages",
    version
)]
struct Cli {
    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Settings file (defaults to ~/.storage_scraper.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape storage unit listings from one or more URLs
    Scrape(ScrapeArgs),
    /// Show or update persisted settings
    Config(ConfigArgs),
}

#[derive(Args)]
struct ScrapeArgs {
    /// Single URL to scrape
    #[arg(long)]
    url: Option<String>,
    /// Additional URLs. Can be repeated.
    #[arg(long, num_args = 1..)]
    urls: Vec<String>,
    /// File with one URL per line
    #[arg(long)]
    file: Option<PathBuf>,
    /// Output file
    #[arg(long, short, default_value = "output.csv")]
    output: PathBuf,
    /// Output format
    #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
    format: ExportFormat,
    /// Number of URLs processed at the same time
    #[arg(long)]
    concurrency: Option<usize>,
}

#[derive(Args)]
struct ConfigArgs {
    /// Print the current settings
    #[arg(long)]
    show: bool,
    /// Model name
    #[arg(long)]
    model: Option<String>,
    /// Generation endpoint base URL
    #[arg(long)]
    base_url: Option<String>,
    /// Timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
}

/// 主函数
///
/// 初始化日志与配置后分发到子命令
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = telemetry::init_telemetry(cli.verbose, ".");

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;

    match cli.command {
        Commands::Scrape(args) => scrape(settings, args).await,
        Commands::Config(args) => configure(settings, cli.config.as_deref(), args),
    }
}

async fn scrape(settings: Settings, args: ScrapeArgs) -> Result<()> {
    let mut urls = Vec::new();
    urls.extend(args.url);
    urls.extend(args.urls);
    if let Some(ref file) = args.file {
        let from_file = read_url_file(file)
            .with_context(|| format!("Failed to read URL file {}", file.display()))?;
        urls.extend(from_file);
    }
    if urls.is_empty() {
        bail!("No URLs given: use --url, --urls or --file");
    }

    let (urls, removed) = dedup_urls(urls);
    if removed > 0 {
        info!("Removed {} duplicate URLs", removed);
    }
    for url in urls.iter().filter(|u| !is_http_url(u)) {
        warn!("{} does not look like an http(s) URL", url);
    }

    let concurrency = args.concurrency.unwrap_or(settings.scraper.concurrency);
    let engine = Arc::new(
        BrowserEngine::launch(&settings.scraper.browser_options())
            .await
            .context("Failed to start browser")?,
    );

    let llm = OllamaService::new(
        settings.ollama.model.clone(),
        settings.ollama.base_url.clone(),
        settings.scraper.timeout(),
    )
    .with_options(settings.ollama.generation_options());
    info!("Using model {} at {}", llm.model(), llm.endpoint());

    let extractor = ExtractionService::new(Arc::new(llm))
        .with_max_prompt_chars(settings.ollama.max_prompt_chars);
    let worker = ScrapeWorker::new(
        engine.clone(),
        Arc::new(extractor),
        settings.worker_config(),
    );
    let manager = ScrapeManager::new(Arc::new(worker), concurrency);

    let results = manager.run(&urls).await;

    if let Err(e) = engine.shutdown().await {
        warn!("Browser shutdown failed: {}", e);
    }

    export(&results, &args.output, args.format)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    let summary = RunSummary::from_results(&results);
    println!(
        "Scraped {}/{} pages successfully, {} failed, {} units written to {}",
        summary.successful,
        summary.total,
        summary.failed,
        summary.total_units,
        args.output.display()
    );
    Ok(())
}

fn configure(mut settings: Settings, path: Option<&Path>, args: ConfigArgs) -> Result<()> {
    let update = ConfigUpdate {
        model: args.model,
        base_url: args.base_url,
        timeout_seconds: args.timeout,
    };

    if !update.is_empty() {
        let path = path
            .map(Path::to_path_buf)
            .or_else(default_config_path)
            .context("Cannot determine settings file location")?;
        settings.apply(update).context("Invalid settings")?;
        settings
            .save(&path)
            .with_context(|| format!("Failed to save settings to {}", path.display()))?;
        println!("Settings saved to {}", path.display());
    }

    if args.show {
        println!("{}", serde_json::to_string_pretty(&settings)?);
    }
    Ok(())
}
