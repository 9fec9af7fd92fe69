use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use volunteer_api::auth::{generate_jwt, Claims};
use volunteer_api::config;
use volunteer_api::routes::{app, AppState};
use volunteer_api::store::{MemoryStore, PgStore, ResourceStore};

#[derive(Parser)]
#[command(name = "volunteer-api")]
#[command(about = "REST backend for volunteer coordination")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Override the configured listen port")]
        port: Option<u16>,
    },

    #[command(about = "Mint a bearer token for a user id")]
    Token {
        #[arg(long, help = "User id the token authenticates as")]
        user: Uuid,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Token { user }) => {
            let token = generate_jwt(Claims::new(user)).context("failed to mint token")?;
            println!("{token}");
            Ok(())
        }
        Some(Commands::Serve { port }) => serve(port).await,
        None => serve(None).await,
    }
}

async fn serve(port_override: Option<u16>) -> anyhow::Result<()> {
    let config = config::config();
    tracing::info!("Starting volunteer API in {:?} mode", config.environment);

    if volunteer_api::is_production!() && config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set in production");
    }

    let store: Arc<dyn ResourceStore> = match &config.database.url {
        Some(url) => {
            let store = PgStore::connect(url).await.context("store connect")?;
            store.ensure_schema().await.context("schema init")?;
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store (data will not persist)");
            Arc::new(MemoryStore::new())
        }
    };

    let app = app(AppState { store });

    let port = port_override.unwrap_or(config.server.port);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("volunteer API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server")
}
