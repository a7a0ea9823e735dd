/*
trendflow - command line entry point.
Runs the research/draft/critique/publish workflow for a topic, or exposes the news layer on its own.
*/

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::Config;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use trendflow::llm::{create_llm_provider, LlmProvider, LlmTier};
use trendflow::news::{self, Aggregator, NewsDigest};
use trendflow::workflow::Workflow;

#[derive(Parser, Debug)]
#[command(name = "trendflow", about = "News-driven article pipeline: research, draft, critique, publish")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full workflow for a topic and print the final state as JSON
    Run {
        topic: String,
        /// Stop after packaging, do not hand the article to a publisher
        #[arg(long)]
        no_publish: bool,
    },
    /// Print the aggregated news digest for a topic
    Digest { topic: String },
    /// Print structured headlines for a topic as JSON
    News {
        topic: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Query every news source once and report what answers
    Sources {
        #[arg(long, default_value = "Artificial Intelligence")]
        topic: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    // Credentials come from the environment, optionally seeded by .env
    dotenv::dotenv().ok();

    let config = load_config(args.config).await?;

    match args.command {
        Command::Run { topic, no_publish } => {
            let fast = build_llm(&config, LlmTier::Fast)?;
            let creative = build_llm(&config, LlmTier::Creative)?;
            let workflow = Workflow::from_config(&config, fast, creative, !no_publish)?;
            let state = workflow.run(&topic).await?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        Command::Digest { topic } => {
            let aggregator = Aggregator::from_config(&config)?;
            println!("{}", aggregator.fetch_news(&topic).await);
        }
        Command::News { topic, limit } => {
            let items = news::fetch_structured_news(&config.news, &topic, limit).await;
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        Command::Sources { topic } => {
            let client = news::build_client(&config.news)?;
            let (mut providers, web_search) = news::providers_from_config(&config.news, &client);
            providers.extend(web_search);
            let timeout = Duration::from_secs(config.news.provider_timeout_seconds.unwrap_or(20));
            let report = tokio::time::timeout(
                timeout * providers.len().max(1) as u32,
                news::probe_providers(&providers, &topic),
            )
            .await
            .context("source probe timed out")?;
            for (source, status) in report {
                println!("{:<14} {}", source.to_string(), serde_json::to_string(&status)?);
            }
        }
    }

    Ok(())
}

async fn load_config(explicit: Option<PathBuf>) -> Result<Config> {
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = explicit {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() {
            Some(p)
        } else {
            None
        }
    };

    let config = Config::load_with_defaults(
        if default_path.exists() { Some(default_path.as_path()) } else { None },
        override_path.as_deref(),
    )
    .await
    .context("failed to load configuration")?;
    info!(default = ?default_path, override = ?override_path, "configuration loaded");
    Ok(config)
}

fn build_llm(config: &Config, tier: LlmTier) -> Result<Arc<dyn LlmProvider>> {
    let provider = create_llm_provider(&config.llm, tier)
        .with_context(|| format!("Failed to initialize {:?} LLM provider", tier))?;
    info!(?tier, "LLM provider initialized");
    Ok(Arc::from(provider))
}
