// ScholarSeva - Web Server
// JSON API over the catalog and the local account store

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use scholarseva::server::{router, AppState, DynStore};
use scholarseva::{logging, AccountStore, AppConfig, Catalog, SqliteStore};

#[derive(Parser)]
#[command(name = "scholarseva-server", version, about = "ScholarSeva JSON API")]
struct Args {
    /// Config file (defaults to ./scholarseva.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port to listen on, overrides the config
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config =
        AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    logging::init(&config.log.level)?;

    // A catalog that fails to load is fatal: there is nothing to serve
    let catalog = Catalog::load(&config.catalog.path)
        .with_context(|| format!("Failed to load scholarships from {:?}", config.catalog.path))?;

    let storage = SqliteStore::open(&config.storage.path)
        .with_context(|| format!("Failed to open account storage {:?}", config.storage.path))?;
    let accounts: AccountStore<DynStore> = AccountStore::new(Box::new(storage));

    let app = router(AppState::new(catalog, accounts));

    let addr = config.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(%addr, "server running");
    info!("API: http://{}/api/scholarships", addr);

    axum::serve(listener, app).await.context("Server stopped")?;
    Ok(())
}
