use std::fmt::Debug;

use axum::Router;
use tower_http::services::ServeDir;
use tracing::info;

use crate::handlers::v1::routes;
use crate::operations::package_cache::{disk::DiskCache, fauna::FaunaCache};
use crate::operations::package_listing::directory::{Directory, FILES_PREFIX};
use crate::operations::package_storage::{read_through::ReadThrough, remote::RemoteIndex};
use crate::operations::policy::Policy;
use crate::operations::settings::{CacheBackend, Settings};
use crate::operations::PackageCache;

/// Assemble the router for whichever backend `settings` selects.
///
/// With a cache configured, lookups and listings are both served by the
/// read-through resolver. Without one, JSON lookups are proxied straight to
/// the upstream index and the simple index is built from the package
/// directory, whose files are served under `/packages`.
pub fn package_routes(settings: &Settings) -> anyhow::Result<Router> {
    let upstream = RemoteIndex::new(settings);

    let app = match settings.cache_backend() {
        CacheBackend::Fauna {
            secret,
            endpoint,
            collection,
        } => {
            info!(%endpoint, %collection, "serving from fauna cache");
            let cache = FaunaCache::new(&endpoint, secret, collection)?;
            cached_routes(settings, cache, upstream)
        }
        CacheBackend::Disk(cache_dir) => {
            info!(?cache_dir, "serving from disk cache");
            cached_routes(settings, DiskCache::new(cache_dir), upstream)
        }
        CacheBackend::None => {
            let directory = Directory::from_settings(settings);
            info!(root = ?directory.root(), "serving package directory, proxying metadata");
            let files = ServeDir::new(directory.root());
            routes(
                Policy::new()
                    .with_package_storage(upstream)
                    .with_package_listing(directory),
            )
            .nest_service(FILES_PREFIX, files)
        }
    };

    Ok(app)
}

fn cached_routes<C>(settings: &Settings, cache: C, upstream: RemoteIndex) -> Router
where
    C: PackageCache + Clone + Debug + Send + Sync + 'static,
{
    info!(fallback = settings.fallback, "resolving through the cache");
    let store = ReadThrough::new(settings, cache, upstream);
    routes(
        Policy::new()
            .with_package_storage(store.clone())
            .with_package_listing(store),
    )
}
