//! Edge rules CLI.
//!
//! # Architecture Overview
//!
//! ```text
//!     edge.toml
//!         │
//!         ▼
//!   ┌──────────┐    ┌────────────┐    ┌─────────────┐
//!   │  config  │───▶│   rules    │───▶│   bundle    │──▶ edge-bundle.json (compile)
//!   │ + valid. │    │ pattern /  │    │ request +   │
//!   └──────────┘    │ glob       │    │ response +  │
//!                   └────────────┘    │ cache policy│
//!                                     └──────┬──────┘
//!                                            │ (preview)
//!                                            ▼
//!     Viewer ──▶ request hook ──▶ origin ──▶ response hook ──▶ Viewer
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use edge_rules::bundle::EdgeBundle;
use edge_rules::config::load_config;
use edge_rules::http::EdgeServer;
use edge_rules::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "edge-rules")]
#[command(about = "Compile and preview edge redirect, rewrite and header rules", long_about = None)]
struct Cli {
    /// Path to the TOML configuration.
    #[arg(short, long, default_value = "edge.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the rules and write the compiled edge bundle
    Compile {
        /// Output file; stdout when omitted
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Serve the edge hooks locally in front of an origin
    Preview {
        /// Use a previously compiled bundle instead of compiling the config
        #[arg(long)]
        bundle: Option<PathBuf>,

        /// Override preview.bind_address
        #[arg(long)]
        bind: Option<String>,

        /// Override preview.origin
        #[arg(long)]
        origin: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = load_config(&cli.config)?;
    logging::init(&config.observability);

    tracing::info!(config = %cli.config.display(), "Configuration loaded");

    match cli.command {
        Commands::Compile { out } => {
            let output = EdgeBundle::compile(&config)?;
            for diagnostic in &output.diagnostics {
                eprintln!("warning: {diagnostic}");
            }
            match out {
                Some(path) => {
                    output.bundle.write_to(&path)?;
                    tracing::info!(path = %path.display(), "Bundle written");
                }
                None => println!("{}", output.bundle.to_json()?),
            }
        }
        Commands::Preview { bundle, bind, origin } => {
            if let Some(bind) = bind {
                config.preview.bind_address = bind;
            }
            if let Some(origin) = origin {
                config.preview.origin = origin;
            }

            let bundle = match bundle {
                Some(path) => EdgeBundle::read_from(&path)?,
                None => EdgeBundle::compile(&config)?.bundle,
            };

            if config.observability.metrics_enabled {
                let addr: SocketAddr = config.observability.metrics_address.parse()?;
                metrics::init_metrics(addr)?;
            }

            let listener = TcpListener::bind(&config.preview.bind_address).await?;
            tracing::info!(
                address = %listener.local_addr()?,
                origin = %config.preview.origin,
                "Listening for connections"
            );

            let server = EdgeServer::new(bundle, &config.preview)?;
            server.run(listener, shutdown_signal()).await?;
        }
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
