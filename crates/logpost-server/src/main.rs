//! logpost - centralized log collection service
//!
//! Accepts structured log messages over HTTP, stores them in a search
//! index, and serves paginated, filtered listings.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use logpost_core::{MemoryStore, MessageStore};
use logpost_elastic::ElasticStore;
use logpost_server::{BackendConfig, LogServer, ServerConfig};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "logpost")]
#[command(about = "Centralized log collection service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve {
        /// Path to config file
        #[arg(short, long, env = "LOGPOST_CONFIG")]
        config: Option<PathBuf>,

        /// Address to listen on, overriding the config file
        #[arg(long, env = "LOGPOST_BIND")]
        bind: Option<SocketAddr>,

        /// Elasticsearch URL, overriding the config file
        #[arg(long, env = "LOGPOST_ELASTIC_URL")]
        elastic_url: Option<String>,

        /// Emit logs as JSON lines
        #[arg(long)]
        log_json: bool,
    },

    /// Generate a default config file
    InitConfig {
        /// Path to write config
        #[arg(short, long, default_value = "logpost.json")]
        output: PathBuf,

        /// Elasticsearch URL to store messages in
        #[arg(long)]
        elastic_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            bind,
            elastic_url,
            log_json,
        } => {
            init_tracing(log_json)?;
            let config = resolve_config(config, bind, elastic_url)?;
            serve(config).await?;
        }

        Commands::InitConfig {
            output,
            elastic_url,
        } => {
            init_config(output, elastic_url)?;
        }
    }

    Ok(())
}

fn init_tracing(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("logpost=info".parse()?)
        .add_directive("logpost_server=info".parse()?)
        .add_directive("logpost_core=info".parse()?)
        .add_directive("logpost_elastic=info".parse()?);

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
    Ok(())
}

fn resolve_config(
    path: Option<PathBuf>,
    bind: Option<SocketAddr>,
    elastic_url: Option<String>,
) -> anyhow::Result<ServerConfig> {
    let mut config = match path {
        Some(path) => {
            info!(config = %path.display(), "loading config");
            ServerConfig::load(&path)?
        }
        None => ServerConfig::default(),
    };

    if let Some(bind) = bind {
        config = config.with_bind_addr(bind);
    }
    if let Some(url) = elastic_url {
        config = config.with_elastic_url(url);
    }
    config.validate()?;
    Ok(config)
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    match config.backend.clone() {
        BackendConfig::Memory => {
            info!("using in-memory message store");
            run(LogServer::new(MemoryStore::new(), config)).await
        }
        BackendConfig::Elastic(elastic) => {
            info!(url = %elastic.url, index = %elastic.index, "using elasticsearch message store");
            let store = ElasticStore::new(elastic)?;
            run(LogServer::new(store, config)).await
        }
    }
}

async fn run<S: MessageStore>(server: LogServer<S>) -> anyhow::Result<()> {
    let addr = server.state().config().bind_addr;
    server.serve_with_shutdown(addr, shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

fn init_config(output: PathBuf, elastic_url: Option<String>) -> anyhow::Result<()> {
    let mut config = ServerConfig::default();
    if let Some(url) = elastic_url {
        config = config.with_elastic_url(url);
    }
    config.validate()?;
    config.save(&output)?;

    println!("Config written to {}", output.display());
    println!();
    println!("Start the service with:");
    println!("  logpost serve --config {}", output.display());

    Ok(())
}
