mod handlers;
mod server;
#[cfg(test)]
mod cli_test;
#[cfg(test)]
mod server_test;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stocklock_core::{LockConfig, StockService};

#[derive(Parser)]
#[command(
    name = "stocklock",
    about = "stocklock: quorum-locked stock deduction",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Backends {
    /// Comma-separated lock nodes: "memory", "sqlite:<path>", "redis://host:port"
    #[arg(long, default_value = "memory", env = "STOCKLOCK_NODES")]
    nodes: String,

    /// Product storage: "memory" or "sqlite:<path>"
    #[arg(long, default_value = "memory", env = "STOCKLOCK_STORAGE")]
    storage: String,

    /// JSON file with lock settings (ttl_ms, retry_count, drift_factor, ...)
    #[arg(long, env = "STOCKLOCK_CONFIG")]
    config: Option<String>,

    /// Override the lease duration in milliseconds
    #[arg(long)]
    ttl_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        #[command(flatten)]
        backends: Backends,
    },

    /// Deduct stock once and print the result. Needs persistent storage
    /// (`--storage sqlite:<path>`); a fresh in-memory store has no products.
    Deduct {
        /// Product id
        #[arg(long)]
        id: u64,

        #[arg(long, default_value = "1")]
        quantity: u64,

        #[command(flatten)]
        backends: Backends,
    },

    /// Ping every lock node
    Ping {
        #[command(flatten)]
        backends: Backends,
    },

    /// Print version information
    Version,
}

/// A one-shot deduction against a fresh in-memory store can only fail.
fn check_deduct_storage(storage: &str) -> Result<(), String> {
    if storage.trim() == "memory" {
        return Err("deduct needs persistent storage, e.g. --storage sqlite:stock.db".to_string());
    }
    Ok(())
}

fn open_service(backends: &Backends) -> StockService {
    let mut config = match &backends.config {
        Some(path) => LockConfig::from_json_file(path).unwrap_or_else(|e| {
            tracing::error!("{}", e);
            std::process::exit(2);
        }),
        None => LockConfig::default(),
    };
    if let Some(ttl) = backends.ttl_ms {
        config.ttl_ms = ttl;
    }

    tracing::info!("💾 Lock nodes: {} | storage: {}", backends.nodes, backends.storage);
    stocklock_core::client::open_service(config, &backends.nodes, &backends.storage)
        .unwrap_or_else(|e| {
            tracing::error!("{}", e);
            std::process::exit(2);
        })
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, host, backends } => {
            let service = open_service(&backends);
            server::run(&host, port, service).await;
        }
        Commands::Deduct { id, quantity, backends } => {
            if let Err(e) = check_deduct_storage(&backends.storage) {
                eprintln!("{}", e);
                std::process::exit(2);
            }
            let service = open_service(&backends);
            let outcome = tokio::task::spawn_blocking(move || {
                let outcome = service.deduct(id, quantity);
                service.locks().close();
                outcome
            })
            .await
            .expect("Deduction task panicked");

            match outcome {
                Ok(product) => {
                    let body = handlers::ProductResponse::from(product);
                    println!("{}", serde_json::to_string_pretty(&body).expect("serializable"));
                }
                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Ping { backends } => {
            let service = open_service(&backends);
            let (health, quorum) = tokio::task::spawn_blocking(move || {
                let locks = service.locks();
                (locks.health(), locks.quorum())
            })
            .await
            .expect("Ping task panicked");

            println!("{}", serde_json::to_string_pretty(&health).expect("serializable"));
            let healthy = health.iter().filter(|n| n.healthy).count();
            if healthy < quorum {
                eprintln!("only {}/{} nodes healthy, quorum is {}", healthy, health.len(), quorum);
                std::process::exit(1);
            }
        }
        Commands::Version => {
            println!("stocklock {}", env!("CARGO_PKG_VERSION"));
            println!("Quorum-locked stock deduction");
        }
    }
}
