//! # rusty-threads
//!
//! Assembles the client from the adapters selected at compile time and keeps
//! the home feed live until interrupted.

use anyhow::Context;
use rt_app::{AppContext, HomeViewModel, SampleNotifications};
use rt_config::Settings;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

#[cfg(not(all(
    feature = "store-sqlite",
    feature = "media-local",
    feature = "auth-simple",
    feature = "cache-file"
)))]
compile_error!("rusty-threads needs one adapter per port; enable the default features");

// Feature-gated adapters
#[cfg(feature = "store-sqlite")]
use rt_store_sqlite::SqliteStore;

#[cfg(feature = "media-local")]
use rt_media_local::LocalMediaUploader;

#[cfg(feature = "auth-simple")]
use rt_auth_simple::SimpleAuthProvider;

#[cfg(feature = "cache-file")]
use rt_cache_file::FileCache;

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log.filter));
    let builder = fmt().with_env_filter(filter);
    if settings.log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading configuration")?;
    init_tracing(&settings);
    tracing::debug!(file = rt_config::DEFAULT_CONFIG_FILE, "configuration loaded");

    // 1. Document store
    #[cfg(feature = "store-sqlite")]
    let store = SqliteStore::new(&settings.database.url, settings.database.max_connections)
        .await
        .with_context(|| format!("opening store at {}", settings.database.url))?;

    // 2. Media
    #[cfg(feature = "media-local")]
    let media = LocalMediaUploader::new(settings.media.root.clone(), settings.media.url_prefix.clone());

    // 3. Identity and device cache
    #[cfg(feature = "auth-simple")]
    let auth = SimpleAuthProvider::new(settings.auth.pepper);
    #[cfg(feature = "cache-file")]
    let cache = FileCache::open(settings.cache.path.clone())
        .await
        .context("opening local cache")?;

    let ctx = AppContext::new(
        Arc::new(store),
        Arc::new(auth),
        Arc::new(media),
        Arc::new(cache),
        Arc::new(SampleNotifications::new()),
    );

    match ctx.session.cached_profile().await {
        Ok(Some(profile)) => tracing::info!(username = %profile.username, "last signed-in user"),
        Ok(None) => tracing::info!("no cached profile"),
        Err(e) => tracing::warn!(error = %e, "local cache unreadable"),
    }

    let home = HomeViewModel::new(ctx);
    home.start().await.context("subscribing to threads")?;
    tracing::info!("rusty-threads running, press ctrl-c to stop");

    let mut items = home.state().items.subscribe();
    let mut status = home.state().status.subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Ok(()) = items.changed() => {
                let feed = items.borrow_and_update().clone();
                match feed.first() {
                    Some(latest) => tracing::info!(
                        threads = feed.len(),
                        latest_by = %latest.author.username,
                        "feed updated"
                    ),
                    None => tracing::info!("feed is empty"),
                }
            }
            Ok(()) = status.changed() => {
                if let Some(error) = status.borrow_and_update().error.clone() {
                    tracing::warn!(%error, "feed error");
                }
            }
        }
    }

    home.close().await;
    tracing::info!("shut down");
    Ok(())
}
