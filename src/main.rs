use anyhow::{Context, Result};
use clap::Parser;
use doc_search::config::Cli;
use doc_search::crawler::Crawler;
use doc_search::gateway::{self, Outcome};
use doc_search::{web, SearchEngine};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; flags and real environment still apply.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| cli.log_filter().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = cli.into_settings()?;
    info!(root = %settings.root.display(), "using path");
    info!(refresh = settings.refresh, "rebuild the index");

    let crawler = Crawler::new(&settings.root, settings.extensions).skipping(&settings.index_path);
    info!(extensions = ?crawler.extensions(), "allowed extensions");
    let prepared = gateway::prepare_index(&settings.index_path, settings.refresh, &crawler)
        .await
        .with_context(|| format!("failed to prepare index at {}", settings.index_path.display()))?;
    match prepared.outcome {
        Outcome::Opened => info!("serving existing index, crawl skipped"),
        Outcome::Built { documents } => info!(documents, "serving freshly built index"),
    }

    let engine = Arc::new(
        SearchEngine::new(prepared.index, &settings.root).with_limit(settings.result_limit),
    );
    web::serve(engine, settings.addr, settings.search_timeout)
        .await
        .context("web server failed")?;

    Ok(())
}
