use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wiki_feed::config::{Config, StorageBackend};
use wiki_feed::db::{
    self, ContentStore, InterestStore, MemoryContentStore, MemoryInterestStore, PgContentStore,
    PgInterestStore,
};
use wiki_feed::handlers::{self, EngagementHandlerState, FeedHandlerState};
use wiki_feed::services::{ContentCache, EngagementRecorder, FeedGenerator, InterestLedger};
use wiki_feed::sources::{GuardedSource, WikipediaSource};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.app.default_log_filter().into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true),
        )
        .init();

    info!("Starting wiki-feed-service v{}", env!("CARGO_PKG_VERSION"));
    info!(env = %config.app.env, backend = ?config.database.backend, "Configuration loaded");

    let (content_store, interest_store): (Arc<dyn ContentStore>, Arc<dyn InterestStore>) =
        match config.database.backend {
            StorageBackend::Postgres => {
                let pool = db::create_pool(&config.database)
                    .await
                    .context("Failed to create database pool")?;
                db::migrate(&pool)
                    .await
                    .context("Failed to run database migrations")?;
                (
                    Arc::new(PgContentStore::new(pool.clone())),
                    Arc::new(PgInterestStore::new(pool)),
                )
            }
            StorageBackend::Memory => {
                info!("Using in-memory stores; state is lost on restart");
                (
                    Arc::new(MemoryContentStore::new()),
                    Arc::new(MemoryInterestStore::new()),
                )
            }
        };

    let wikipedia = WikipediaSource::new(&config.source.api_url, &config.source.user_agent)
        .context("Failed to build Wikipedia client")?;
    let source = Arc::new(GuardedSource::new(wikipedia, config.source.guard()));

    let cache = ContentCache::new(content_store.clone(), source, config.cache.clone());
    let ledger = InterestLedger::new(interest_store, config.interests.clone());
    let feed = FeedGenerator::new(cache, ledger.clone(), config.feed.clone());
    let recorder = EngagementRecorder::new(content_store, ledger);

    let feed_state = web::Data::new(FeedHandlerState { feed });
    let engagement_state = web::Data::new(EngagementHandlerState { recorder });

    let bind_addr = format!("{}:{}", config.app.host, config.app.port);
    info!("HTTP server listening on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(feed_state.clone())
            .app_data(engagement_state.clone())
            .configure(handlers::configure)
    })
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {}", bind_addr))?
    .run()
    .await
    .context("HTTP server error")?;

    info!("wiki-feed-service stopped");
    Ok(())
}
