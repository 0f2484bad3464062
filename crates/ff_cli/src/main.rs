use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use ff_core::{ArticleStorage, FeedFormat};
use ff_inference::{CallPolicy, Provider};
use ff_scrapers::{
    init_logging, HttpFetcher, OnEnrichmentFailure, Pipeline, PipelineConfig, SourceProfile,
};
use ff_web::LoggingMailer;
use ff_storage::StorageKind;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
struct HumanDuration(Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_millis = 0u64;
        let mut current_number = String::new();
        let mut chars = s.trim().chars().peekable();
        let mut has_number = false;

        while let Some(c) = chars.next() {
            if c.is_ascii_digit() {
                current_number.push(c);
                continue;
            }
            if c.is_whitespace() {
                continue;
            }
            let num: u64 = current_number
                .parse()
                .map_err(|_| format!("Unit {} must follow a number", c))?;
            let factor = match c {
                'm' if chars.peek() == Some(&'s') => {
                    chars.next();
                    1
                }
                's' => 1_000,
                'm' => 60_000,
                'h' => 3_600_000,
                'd' => 86_400_000,
                _ => return Err(format!("Invalid duration unit: {}", c)),
            };
            total_millis += num * factor;
            current_number.clear();
            has_number = true;
        }

        // A trailing bare number counts as seconds.
        if !current_number.is_empty() {
            let num: u64 = current_number
                .parse()
                .map_err(|_| "Invalid number in duration".to_string())?;
            total_millis += num * 1_000;
            has_number = true;
        }

        if !has_number {
            return Err("Duration must include a number".to_string());
        }
        Ok(HumanDuration(Duration::from_millis(total_millis)))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Crypto news ingestion pipeline", long_about = None)]
struct Cli {
    #[arg(long, value_enum, env = "FF_STORAGE", default_value_t = StorageKind::Memory)]
    storage: StorageKind,
    /// Database URL for the sqlite store, e.g. sqlite://crypto_news.db
    #[arg(long, env = "FF_DATABASE_URL")]
    database_url: Option<String>,
    #[command(flatten)]
    models: ModelArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct ModelArgs {
    #[arg(long, value_enum, default_value_t = Provider::Gateway)]
    provider: Provider,
    #[arg(long, env = "AI_GATEWAY_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[arg(long, env = "AI_GATEWAY_URL", default_value = ff_inference::Config::DEFAULT_BASE_URL)]
    gateway_url: String,
    /// Per-call timeout for model requests (e.g. 30s, 1m, 500ms)
    #[arg(long, default_value = "30s")]
    model_timeout: HumanDuration,
    /// Extra attempts per model call, at most 1
    #[arg(long, default_value_t = 1)]
    model_retries: u32,
}

impl ModelArgs {
    fn config(&self) -> ff_inference::Config {
        let defaults = ff_inference::Config::default();
        ff_inference::Config {
            provider: self.provider,
            api_key: self.api_key.clone(),
            base_url: self.gateway_url.clone(),
            policy: CallPolicy::new(
                self.model_timeout.0,
                self.model_retries,
                defaults.policy.backoff,
            ),
            ..defaults
        }
    }
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    #[arg(long, default_value = "rss")]
    format: FeedFormat,
    /// Maximum articles per run (defaults to 5 for rss, 12 for markdown)
    #[arg(long)]
    cap: Option<usize>,
    #[arg(long)]
    no_images: bool,
    /// Rewrite title and description in formal Arabic
    #[arg(long)]
    rewrite: bool,
    #[arg(long, value_enum, default_value_t = OnEnrichmentFailure::Drop)]
    on_enrichment_failure: OnEnrichmentFailure,
    #[arg(long, default_value_t = 3)]
    concurrency: usize,
}

impl RunArgs {
    fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::for_format(self.format);
        if let Some(cap) = self.cap {
            config.cap = cap;
        }
        config.generate_images = !self.no_images;
        config.rewrite_copy = self.rewrite;
        config.on_enrichment_failure = self.on_enrichment_failure;
        config.enrichment_concurrency = self.concurrency;
        config
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP functions
    Serve {
        #[arg(long, env = "FF_BIND", default_value = "0.0.0.0:8080")]
        bind: SocketAddr,
        /// Address contact form submissions are sent to
        #[arg(long, env = "FF_CONTACT_TO", default_value = ff_web::mailer::DEFAULT_RECIPIENT)]
        contact_to: String,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Run the pipeline once, or periodically with --interval
    Ingest {
        #[command(flatten)]
        run: RunArgs,
        /// Enrich but do not store
        #[arg(long)]
        dry_run: bool,
        /// Repeat the run with this interval (e.g. 1h, 30m, 1h15m)
        #[arg(long)]
        interval: Option<HumanDuration>,
    },
    /// Fetch and extract without enriching or storing
    Preview {
        #[arg(long, default_value = "markdown")]
        format: FeedFormat,
        #[arg(long)]
        cap: Option<usize>,
    },
    /// Show the most recently stored articles
    Recent {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn build_pipeline(
    config: PipelineConfig,
    models: &ModelArgs,
    storage: Option<Arc<dyn ArticleStorage>>,
) -> anyhow::Result<Pipeline> {
    let fetcher = Arc::new(HttpFetcher::new(HttpFetcher::DEFAULT_TIMEOUT)?);
    let generate_images = config.generate_images;
    let rewrite_copy = config.rewrite_copy;
    let mut pipeline = Pipeline::new(config, SourceProfile::investing_crypto(), fetcher)?;

    let model_config = models.config();
    if generate_images {
        let images = ff_inference::create_image_generator(&model_config)
            .context("Image generation needs a model; pass --no-images to skip it")?;
        pipeline = pipeline.with_image_generator(images);
    }
    if rewrite_copy {
        pipeline = pipeline.with_rewriter(ff_inference::create_rewriter(&model_config)?);
    }
    if let Some(storage) = storage {
        pipeline = pipeline.with_storage(storage);
    }
    Ok(pipeline)
}

/// Logs a failed periodic run. Errors that the next run would hit again
/// end the loop.
fn after_failed_run(e: ff_core::Error) -> anyhow::Result<()> {
    if e.is_fatal() {
        return Err(anyhow::Error::new(e).context("Stopping periodic ingest"));
    }
    error!("Ingest run failed, retrying at the next interval: {}", e);
    Ok(())
}

fn preview_config(format: FeedFormat, cap: Option<usize>) -> PipelineConfig {
    let mut config = PipelineConfig::for_format(format);
    config.generate_images = false;
    config.rewrite_copy = false;
    config.persist = false;
    if let Some(cap) = cap {
        config.cap = cap;
    }
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Failed to load .env: {}", e);
        }
    }
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            contact_to,
            run,
        } => {
            let storage =
                ff_storage::create_storage(cli.storage, cli.database_url.as_deref()).await?;
            let pipeline =
                build_pipeline(run.pipeline_config(), &cli.models, Some(storage.clone()))?;
            let preview =
                build_pipeline(preview_config(FeedFormat::Markdown, None), &cli.models, None)?;
            let state = ff_web::AppState::new(pipeline, preview)
                .with_storage(storage)
                .with_mailer(Arc::new(LoggingMailer), contact_to);
            let app = ff_web::create_app(state);

            let listener = tokio::net::TcpListener::bind(bind)
                .await
                .with_context(|| format!("Failed to bind {}", bind))?;
            info!("🚀 Listening on http://{}", bind);
            axum::serve(listener, app).await?;
        }
        Commands::Ingest {
            run,
            dry_run,
            interval,
        } => {
            let mut config = run.pipeline_config();
            config.persist = !dry_run;
            let storage = if dry_run {
                None
            } else {
                Some(ff_storage::create_storage(cli.storage, cli.database_url.as_deref()).await?)
            };
            if storage.is_some() && cli.storage == StorageKind::Memory {
                warn!("Memory storage is discarded when the process exits");
            }
            let pipeline = build_pipeline(config, &cli.models, storage)?;

            match interval {
                Some(interval) => {
                    info!("Running every {:?}", interval.0);
                    loop {
                        match pipeline.ingest().await {
                            Ok(report) => info!(
                                "Run stored {} of {} articles",
                                report.processed(),
                                report.candidates
                            ),
                            Err(e) => after_failed_run(e)?,
                        }
                        tokio::time::sleep(interval.0).await;
                    }
                }
                None => {
                    let report = pipeline.ingest().await?;
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
            }
        }
        Commands::Preview { format, cap } => {
            let pipeline = build_pipeline(preview_config(format, cap), &cli.models, None)?;
            let articles = pipeline.preview().await?;
            println!("{}", serde_json::to_string_pretty(&articles)?);
        }
        Commands::Recent { limit } => {
            let storage =
                ff_storage::create_storage(cli.storage, cli.database_url.as_deref()).await?;
            let articles = storage.recent_articles(limit).await?;
            println!("{}", serde_json::to_string_pretty(&articles)?);
        }
    }

    Ok(())
}
