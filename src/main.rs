use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use upvote::{api, config::Config, db};

#[derive(Parser)]
#[command(name = "upvote")]
#[command(about = "Feature voting server with popularity ranking")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port for HTTP API
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },
    /// Recompute every cached vote count from the vote ledger
    Reconcile,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "upvote=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn open_database(config: &Config) -> anyhow::Result<db::Database> {
    let db = match &config.database_path {
        Some(path) => db::Database::open(path.clone()),
        None => db::Database::open_default(),
    }
    .context("Failed to open database")?;
    db.migrate()?;
    Ok(db)
}

async fn serve(config: Config, host: &str, port: u16) -> anyhow::Result<()> {
    tracing::info!("Starting upvote server on {}:{}", host, port);

    let db = open_database(&config)?;
    let app = api::create_router_with_config(db, &config);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))?;
    tracing::info!("upvote listening on http://{}:{}", host, port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();
    let config = Config::from_env();

    match cli.command {
        Some(Commands::Serve { host, port }) => serve(config, &host, port).await?,
        Some(Commands::Reconcile) => {
            let db = open_database(&config)?;
            let drifts = db
                .reconcile_vote_counts()
                .context("Failed to reconcile vote counts")?;

            if drifts.is_empty() {
                println!("All vote counts match the ledger.");
            }
            for drift in &drifts {
                println!(
                    "feature {}: vote_count {} -> {}",
                    drift.feature_id, drift.cached, drift.actual
                );
            }
        }
        None => serve(config, "127.0.0.1", 8000).await?,
    }

    Ok(())
}
