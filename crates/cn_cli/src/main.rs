use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use cn_core::config::{self, AppConfig, ModelProvider};
use cn_core::{Error, FeedSource};
use tracing::info;

mod context;
mod display;
mod shell;

use context::AppContext;

fn parse_duration_arg(s: &str) -> std::result::Result<Duration, String> {
    config::parse_duration(s).map_err(|e| e.to_string())
}

fn parse_source_arg(s: &str) -> std::result::Result<FeedSource, String> {
    config::parse_source(s).map_err(|e| e.to_string())
}

fn parse_provider_arg(s: &str) -> std::result::Result<ModelProvider, String> {
    s.parse().map_err(|e: Error| e.to_string())
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Crypto news ingestion, analysis and Q&A", long_about = None)]
pub struct Cli {
    /// SQLite database file
    #[arg(long, global = true, default_value = config::DEFAULT_DB_PATH)]
    db: PathBuf,
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[arg(long, global = true, env = "OPENAI_API_BASE", default_value = config::DEFAULT_API_BASE)]
    api_base: String,
    #[arg(long, global = true, env = "CN_MODEL", default_value = config::DEFAULT_MODEL)]
    model: String,
    /// Chat model backend: openai or dummy
    #[arg(long, global = true, default_value = "openai", value_parser = parse_provider_arg)]
    provider: ModelProvider,
    /// Feed source as name=url. Repeat to replace the built-in list.
    #[arg(long = "source", global = true, value_parser = parse_source_arg)]
    sources: Vec<FeedSource>,
    /// Pause after each analyzed article
    #[arg(long, global = true, default_value = "1s", value_parser = parse_duration_arg)]
    article_delay: Duration,
    #[arg(long, global = true, default_value = "60s", value_parser = parse_duration_arg)]
    llm_timeout: Duration,
    /// How long answers stay in the query cache; 0 disables it
    #[arg(long, global = true, default_value = "4h", value_parser = parse_duration_arg)]
    cache_ttl: Duration,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Interactive menu (default)
    Shell,
    /// Run one fetch and analysis cycle
    Fetch,
    /// Ask a question about stored news
    Query {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Show database statistics
    Stats,
    /// List the newest stored articles
    Articles {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Fetch periodically until Ctrl-C (e.g. 4h, 30m, 1h15m30s)
    Watch {
        #[arg(long, default_value = "4h", value_parser = parse_duration_arg)]
        interval: Duration,
    },
    /// Serve the JSON dashboard API
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: SocketAddr,
    },
}

impl Cli {
    fn to_config(&self) -> AppConfig {
        let mut config = AppConfig {
            db_path: self.db.clone(),
            provider: self.provider,
            api_key: self.api_key.clone().filter(|key| !key.trim().is_empty()),
            api_base: self.api_base.clone(),
            model: self.model.clone(),
            article_delay: self.article_delay,
            llm_timeout: self.llm_timeout,
            cache_ttl: self.cache_ttl,
            ..AppConfig::default()
        };
        if !self.sources.is_empty() {
            config.sources = self.sources.clone();
        }
        if let Some(Commands::Watch { interval }) = &self.command {
            config.fetch_interval = *interval;
        }
        config
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let logger = cn_core::logging::init_logging();
    let config = cli.to_config();
    info!("⚙️ Configuration: {:?}", config);

    let mut ctx = AppContext::build(config, logger).await?;

    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => {
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            shell::run_shell(&mut ctx, stdin).await?;
        }
        Commands::Fetch => {
            let report = ctx.pipeline.run_cycle().await;
            println!("✅ Fetch completed: {}", display::format_report(&report));
        }
        Commands::Query { question } => {
            let answer = ctx.query_engine.answer(&question.join(" ")).await;
            println!("{}", answer);
        }
        Commands::Stats => {
            let stats = ctx.storage.stats().await?;
            print!("{}", display::format_stats(&stats));
        }
        Commands::Articles { limit } => {
            let articles = ctx.storage.recent_articles(limit).await?;
            print!("{}", display::format_articles(&articles));
        }
        Commands::Watch { interval } => {
            info!("Running in periodic mode with {} interval", display::format_duration(interval));
            ctx.start_scheduler();
            tokio::signal::ctrl_c().await?;
            info!("👋 Interrupt received");
            ctx.shutdown().await;
        }
        Commands::Serve { addr } => {
            cn_web::serve(ctx.web_state(), addr).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match run(cli).await {
        Err(e) if matches!(e.downcast_ref::<Error>(), Some(Error::Config(_))) => {
            eprintln!("❌ Error: {}", e);
            eprintln!("Please make sure you have set your OPENAI_API_KEY in the .env file.");
            std::process::exit(1);
        }
        result => result,
    }
}
