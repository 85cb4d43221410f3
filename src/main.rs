use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use perfhub::{api, db::Database};

#[derive(Parser)]
#[command(name = "perfhub")]
#[command(about = "OKR and key-result tracking backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Interface to bind
        #[arg(long, env = "PERFHUB_HOST", default_value = "127.0.0.1")]
        host: String,

        /// Port for HTTP API
        #[arg(short, long, env = "PERFHUB_PORT", default_value = "3000")]
        port: u16,

        #[command(flatten)]
        store: StoreArgs,
    },
    /// Create or upgrade the database schema and exit
    Migrate {
        #[command(flatten)]
        store: StoreArgs,
    },
}

#[derive(Args)]
struct StoreArgs {
    /// SQLite database file (defaults to the platform data directory)
    #[arg(long, env = "PERFHUB_DB")]
    db: Option<PathBuf>,
}

impl StoreArgs {
    fn open(&self) -> anyhow::Result<Database> {
        let db = match &self.db {
            Some(path) => Database::open(path)?,
            None => Database::open_default()?,
        };
        db.migrate()?;
        Ok(db)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| {
                "perfhub=debug,perfhub_core=debug,tower_http=debug".into()
            }),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { host, port, store }) => serve(&host, port, &store).await?,
        Some(Commands::Migrate { store }) => {
            store.open()?;
            tracing::info!("Database schema is up to date");
        }
        None => serve("127.0.0.1", 3000, &StoreArgs { db: None }).await?,
    }

    Ok(())
}

async fn serve(host: &str, port: u16, store: &StoreArgs) -> anyhow::Result<()> {
    tracing::info!("Starting perfhub server on {}:{}", host, port);

    let db = store.open()?;
    let app = api::create_router(db);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
    tracing::info!("perfhub server listening on http://{}:{}", host, port);

    axum::serve(listener, app).await?;
    Ok(())
}
