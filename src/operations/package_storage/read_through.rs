use tracing::{debug, info, instrument};

use crate::models::{FileLink, PackageName, PackageRecord};
use crate::operations::settings::Settings;
use crate::operations::{LookupError, Origin, PackageCache, PackageListing, PackageStorage};

/// Serves package records out of a cache, falling back to an upstream index
/// on a miss or when the cached record lacks the requested release.
#[derive(Clone, Debug)]
pub struct ReadThrough<C, R>
where
    C: PackageCache + Clone + std::fmt::Debug + Send + Sync + 'static,
    R: PackageStorage + Clone + std::fmt::Debug + Send + Sync + 'static,
{
    cache: C,
    inner: R,
    fallback: bool,
}

impl<C, R> ReadThrough<C, R>
where
    C: PackageCache + Clone + std::fmt::Debug + Send + Sync + 'static,
    R: PackageStorage + Clone + std::fmt::Debug + Send + Sync + 'static,
{
    pub fn new(settings: &Settings, cache: C, inner: R) -> Self {
        Self {
            cache,
            inner,
            fallback: settings.fallback,
        }
    }

    /// Look `name` up, optionally insisting that `release` exists.
    ///
    /// The cache is consulted first. A miss, or a cached record without the
    /// requested release, is refreshed from the upstream index when fallback
    /// is enabled. A refresh replaces the cached record wholesale, so releases
    /// the upstream no longer reports are dropped along with it.
    #[instrument(level = "info", skip(self))]
    pub async fn resolve(
        &self,
        name: &PackageName,
        release: Option<&str>,
    ) -> Result<PackageRecord, LookupError> {
        let release = release.filter(|version| !version.is_empty());

        let record = match self.cache.get(name).await? {
            Some(record) => {
                debug!("cache hit");
                record
            }
            None if self.fallback => {
                debug!("cache miss, falling back to upstream");
                self.refresh(name).await?
            }
            None => {
                return Err(LookupError::PackageNotFound {
                    name: name.clone(),
                    origin: Origin::Cache,
                })
            }
        };

        let Some(version) = release else {
            return Ok(record);
        };

        if record.has_release(version) {
            return Ok(record);
        }

        if !self.fallback {
            return Err(LookupError::ReleaseNotFound {
                name: name.clone(),
                version: version.to_string(),
                origin: Origin::Cache,
            });
        }

        debug!("release missing from cached record, refreshing");
        let record = self.refresh(name).await?;
        if record.has_release(version) {
            Ok(record)
        } else {
            Err(LookupError::ReleaseNotFound {
                name: name.clone(),
                version: version.to_string(),
                origin: Origin::Upstream,
            })
        }
    }

    async fn refresh(&self, name: &PackageName) -> Result<PackageRecord, LookupError> {
        let record = self.inner.fetch_package(name, None).await?;
        info!(releases = record.releases.len(), "writing from upstream to cache");
        self.cache.put(name, &record).await?;
        Ok(record)
    }
}

#[async_trait::async_trait]
impl<C, R> PackageStorage for ReadThrough<C, R>
where
    C: PackageCache + Clone + std::fmt::Debug + Send + Sync + 'static,
    R: PackageStorage + Clone + std::fmt::Debug + Send + Sync + 'static,
{
    async fn fetch_package(
        &self,
        name: &PackageName,
        release: Option<&str>,
    ) -> Result<PackageRecord, LookupError> {
        self.resolve(name, release).await
    }
}

#[async_trait::async_trait]
impl<C, R> PackageListing for ReadThrough<C, R>
where
    C: PackageCache + Clone + std::fmt::Debug + Send + Sync + 'static,
    R: PackageStorage + Clone + std::fmt::Debug + Send + Sync + 'static,
{
    async fn list_packages(&self) -> anyhow::Result<Vec<String>> {
        let mut names = self.cache.list_names().await?;
        names.sort();
        names.dedup();
        Ok(names)
    }

    async fn list_files(&self, name: &PackageName) -> Result<Vec<FileLink>, LookupError> {
        Ok(self.resolve(name, None).await?.files())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::operations::package_cache::in_memory::InMemoryCache;

    #[derive(Clone, Debug, Default)]
    struct FakeUpstream {
        packages: HashMap<String, PackageRecord>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeUpstream {
        fn with(mut self, name: &str, releases: &[&str]) -> Self {
            self.packages.insert(name.to_string(), record(name, releases));
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl PackageStorage for FakeUpstream {
        async fn fetch_package(
            &self,
            name: &PackageName,
            _release: Option<&str>,
        ) -> Result<PackageRecord, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.packages
                .get(name.as_str())
                .cloned()
                .ok_or_else(|| LookupError::PackageNotFound {
                    name: name.clone(),
                    origin: Origin::Upstream,
                })
        }
    }

    fn record(name: &str, releases: &[&str]) -> PackageRecord {
        let releases: serde_json::Map<_, _> = releases
            .iter()
            .map(|version| {
                (
                    version.to_string(),
                    json!([{
                        "filename": format!("{}-{}.tar.gz", name, version),
                        "url": format!("https://files.example/{}-{}.tar.gz", name, version),
                    }]),
                )
            })
            .collect();
        serde_json::from_value(json!({"info": {"name": name}, "releases": releases})).unwrap()
    }

    type Store = ReadThrough<InMemoryCache, FakeUpstream>;

    fn read_through(fallback: bool, cache: InMemoryCache, upstream: FakeUpstream) -> Store {
        let lookup = |key: &str| (key == "PIRRIP_FALLBACK").then(|| fallback.to_string());
        ReadThrough::new(&Settings::from_lookup(lookup).unwrap(), cache, upstream)
    }

    async fn cached(package: &str, releases: &[&str]) -> InMemoryCache {
        let cache = InMemoryCache::default();
        let stored = record(package, releases);
        cache.put(&name(package), &stored).await.unwrap();
        cache
    }

    fn name(name: &str) -> PackageName {
        name.parse().unwrap()
    }

    #[tokio::test]
    async fn absent_everywhere_is_package_not_found() {
        let store = read_through(true, InMemoryCache::default(), FakeUpstream::default());

        assert!(matches!(
            store.resolve(&name("nope"), None).await,
            Err(LookupError::PackageNotFound {
                origin: Origin::Upstream,
                ..
            })
        ));
        assert!(store.cache.list_names().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cache_miss_without_fallback_never_calls_upstream() {
        let upstream = FakeUpstream::default().with("foo", &["1.0"]);
        let store = read_through(false, InMemoryCache::default(), upstream.clone());

        assert!(matches!(
            store.resolve(&name("foo"), None).await,
            Err(LookupError::PackageNotFound {
                origin: Origin::Cache,
                ..
            })
        ));
        assert_eq!(upstream.calls(), 0);
    }

    #[tokio::test]
    async fn cache_hit_skips_upstream() {
        let cache = cached("foo", &["1.0"]).await;
        let upstream = FakeUpstream::default().with("foo", &["1.0", "2.0"]);
        let store = read_through(true, cache, upstream.clone());

        let found = store.resolve(&name("foo"), None).await.unwrap();
        assert_eq!(found, record("foo", &["1.0"]));

        let found = store.resolve(&name("foo"), Some("1.0")).await.unwrap();
        assert_eq!(found, record("foo", &["1.0"]));
        assert_eq!(upstream.calls(), 0);
    }

    #[tokio::test]
    async fn cache_miss_populates_cache() {
        let upstream = FakeUpstream::default().with("foo", &["1.0"]);
        let store = read_through(true, InMemoryCache::default(), upstream.clone());

        let found = store.resolve(&name("foo"), None).await.unwrap();
        assert_eq!(found, record("foo", &["1.0"]));
        assert_eq!(
            store.cache.get(&name("foo")).await.unwrap(),
            Some(record("foo", &["1.0"]))
        );

        store.resolve(&name("foo"), None).await.unwrap();
        assert_eq!(upstream.calls(), 1);
    }

    #[tokio::test]
    async fn missing_release_refreshes_and_overwrites_cache() {
        let cache = cached("foo", &["1.0"]).await;
        let upstream = FakeUpstream::default().with("foo", &["1.0", "2.0"]);
        let store = read_through(true, cache, upstream.clone());

        let found = store.resolve(&name("foo"), Some("2.0")).await.unwrap();
        assert!(found.has_release("2.0"));
        assert_eq!(
            store.cache.get(&name("foo")).await.unwrap(),
            Some(record("foo", &["1.0", "2.0"]))
        );
        assert_eq!(upstream.calls(), 1);
    }

    #[tokio::test]
    async fn refresh_replaces_instead_of_merging() {
        let cache = cached("foo", &["0.9", "1.0"]).await;
        let upstream = FakeUpstream::default().with("foo", &["1.0", "2.0"]);
        let store = read_through(true, cache, upstream);

        store.resolve(&name("foo"), Some("2.0")).await.unwrap();
        let cached = store.cache.get(&name("foo")).await.unwrap().unwrap();
        assert!(!cached.has_release("0.9"));
    }

    #[tokio::test]
    async fn missing_release_without_fallback_leaves_cache_alone() {
        let cache = cached("foo", &["1.0"]).await;
        let upstream = FakeUpstream::default().with("foo", &["1.0", "2.0"]);
        let store = read_through(false, cache, upstream.clone());

        match store.resolve(&name("foo"), Some("2.0")).await {
            Err(LookupError::ReleaseNotFound {
                version, origin, ..
            }) => {
                assert_eq!(version, "2.0");
                assert_eq!(origin, Origin::Cache);
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert_eq!(
            store.cache.get(&name("foo")).await.unwrap(),
            Some(record("foo", &["1.0"]))
        );
        assert_eq!(upstream.calls(), 0);
    }

    #[tokio::test]
    async fn release_absent_upstream_too() {
        let upstream = FakeUpstream::default().with("foo", &["1.0"]);
        let store = read_through(true, InMemoryCache::default(), upstream.clone());

        assert!(matches!(
            store.resolve(&name("foo"), Some("3.0")).await,
            Err(LookupError::ReleaseNotFound {
                origin: Origin::Upstream,
                ..
            })
        ));
        // One fetch for the miss, one for the refresh.
        assert_eq!(upstream.calls(), 2);
    }

    #[tokio::test]
    async fn empty_release_means_package_lookup() {
        let upstream = FakeUpstream::default().with("foo", &["1.0"]);
        let store = read_through(true, InMemoryCache::default(), upstream);

        let found = store.resolve(&name("foo"), Some("")).await.unwrap();
        assert_eq!(found, record("foo", &["1.0"]));
    }

    #[tokio::test]
    async fn repeated_lookups_are_byte_identical() {
        let upstream = FakeUpstream::default().with("foo", &["1.0", "1.1"]);
        let store = read_through(true, InMemoryCache::default(), upstream);

        let first = store.resolve(&name("foo"), None).await.unwrap();
        let second = store.resolve(&name("foo"), None).await.unwrap();
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn lists_cached_names_and_files() {
        let cache = cached("zeta", &["1.0"]).await;
        let alpha = record("alpha", &["0.1", "0.2"]);
        cache.put(&name("alpha"), &alpha).await.unwrap();
        let store = read_through(false, cache, FakeUpstream::default());

        assert_eq!(store.list_packages().await.unwrap(), vec!["alpha", "zeta"]);

        let files = store.list_files(&name("alpha")).await.unwrap();
        let filenames: Vec<_> = files.iter().map(|file| file.filename.as_str()).collect();
        assert_eq!(filenames, vec!["alpha-0.1.tar.gz", "alpha-0.2.tar.gz"]);

        let err = store.list_files(&name("missing")).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
