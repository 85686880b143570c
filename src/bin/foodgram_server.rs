use std::sync::Arc;

use foodgram_sdk::{
    config::Config,
    error::{CacheError, Error},
    jwt::SessionKeys,
    memory::MemoryStore,
    routes::{api, ApiContext},
    services::catalog::{import_catalog, CatalogFile},
    store::{PgStore, Store},
};
use redis::aio::MultiplexedConnection;
use tracing_subscriber::{fmt, EnvFilter};
use warp::Filter;

async fn open_store(config: &Config) -> Result<Arc<dyn Store>, Error> {
    match &config.database_url {
        Some(url) => {
            log::info!("Connecting to database...");
            let store = PgStore::connect(url, config.database_max_connections).await?;
            store.migrate().await?;
            Ok(Arc::new(store))
        }
        None => {
            log::warn!("DATABASE_URL not set, keeping all data in memory");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn open_cache(config: &Config) -> Result<Option<MultiplexedConnection>, Error> {
    let Some(url) = &config.redis_url else {
        log::info!("REDIS_URL not set, catalog cache disabled");
        return Ok(None);
    };

    let client = redis::Client::open(url.as_str()).map_err(CacheError::from)?;
    let connection = client
        .get_multiplexed_async_connection()
        .await
        .map_err(CacheError::from)?;

    Ok(Some(connection))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let store = open_store(&config).await?;
    let cache = open_cache(&config).await?;

    if let Some(path) = &config.catalog_path {
        let catalog = CatalogFile::load(path)?;
        import_catalog(store.as_ref(), cache.as_ref(), &catalog).await?;
    }

    let ctx = ApiContext {
        store,
        keys: SessionKeys::new(config.session_secret.as_bytes(), config.session_ttl_hours)?,
        base_url: config.base_url.to_owned(),
        tag_policy: config.tag_policy,
        cache,
    };
    let routes = api(ctx).with(warp::log("foodgram::api"));

    let (addr, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(config.addr, async {
            tokio::signal::ctrl_c().await.ok();
            log::info!("Shutting down...");
        })
        .map_err(|e| Error::Internal(format!("Could not bind {}: {e}", config.addr)))?;

    log::info!("Server running on {addr}");
    server.await;

    Ok(())
}
