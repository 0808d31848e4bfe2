//! Drive the view controller against a running proxy and print what the page
//! would render.
//! Usage:
//!   cargo run --bin browse                 # popular titles + trending
//!   cargo run --bin browse -- <query>      # search, then open the first result
//! Uses PROXY_ENDPOINT and, when set, the APPWRITE_* variables (.env supported).
//! Without Appwrite settings the search counters live in memory for this run.

use anyhow::Result;
use dotenvy::dotenv;
use reelscout::appwrite::{AnalyticsSink, AppwriteStore, DocumentStore, MemoryStore};
use reelscout::catalog::ProxyMovieSource;
use reelscout::config::Config;
use reelscout::controller::ViewController;
use reelscout::view::trending_entries;
use std::env;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;
    let store: Arc<dyn DocumentStore> = match AppwriteStore::from_env() {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!("Appwrite not configured ({e}); counting searches in memory");
            Arc::new(MemoryStore::new())
        }
    };
    let source = Arc::new(ProxyMovieSource::new(config.proxy_endpoint)?);
    let controller = Arc::new(ViewController::new(source, AnalyticsSink::new(store)));

    controller.mount().await;

    let query = env::args().skip(1).collect::<Vec<_>>().join(" ");
    if !query.is_empty() {
        controller.set_search_text(query).await.await?;
    }

    let snapshot = controller.snapshot().await;
    if let Some(message) = snapshot.error_message() {
        println!("error: {message}");
    }
    for card in snapshot.cards() {
        println!(
            "{:>8}  {}  ★ {}  {}  {}",
            card.id, card.title, card.rating, card.language, card.year
        );
    }

    if let Some(first) = snapshot.movies().first().cloned() {
        controller.select(first).await.await?;
        if let Some(detail) = controller.snapshot().await.detail_view() {
            println!();
            println!("{}", serde_json::to_string_pretty(&detail)?);
        }
        controller.close().await;
    }

    // Let the fire-and-forget counter write land before reading trending.
    tokio::time::sleep(Duration::from_millis(500)).await;
    controller.load_trending().await;
    println!();
    for entry in trending_entries(&controller.snapshot().await.trending) {
        println!("#{} {} ({})", entry.rank, entry.term, entry.poster_url);
    }

    Ok(())
}
