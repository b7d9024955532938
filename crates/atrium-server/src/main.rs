use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use atrium_api::state::AppStateInner;
use atrium_roster::{Divisions, Roster};
use atrium_store::Store;
use atrium_types::models::SeedRecord;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "atrium=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("ATRIUM_DB_PATH").unwrap_or_else(|_| "atrium.db".into());
    let data_dir = PathBuf::from(std::env::var("ATRIUM_DATA_DIR").unwrap_or_else(|_| "data".into()));
    let host = std::env::var("ATRIUM_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("ATRIUM_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Static datasets
    let roster = Roster::load(&data_dir.join("staff.json"))?;
    let divisions = Divisions::load(&data_dir.join("divisions.json"))?;
    let seeds = load_seeds(&data_dir.join("messages.json"))?;

    // Store, with the one-shot seed merge
    let store = Store::open(Path::new(&db_path))?;
    let imported = store.import_seed(&seeds)?;
    info!("Imported {} of {} seed messages", imported, seeds.len());

    let state = Arc::new(AppStateInner {
        store,
        roster,
        divisions,
        data_dir,
    });

    let app = atrium_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Atrium server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn load_seeds(path: &Path) -> anyhow::Result<Vec<SeedRecord>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
