use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::warn;

use crate::models::{PackageName, PackageRecord};
use crate::operations::PackageCache;

const KEY_PREFIX: &str = "package:";

/// Package records kept in a content-addressed cache directory.
#[derive(Clone, Debug)]
pub struct DiskCache {
    cache_dir: PathBuf,
}

impl DiskCache {
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        Self {
            cache_dir: PathBuf::from(cache_dir.as_ref()),
        }
    }

    fn key(name: &PackageName) -> String {
        format!("{}{}", KEY_PREFIX, name)
    }
}

#[async_trait::async_trait]
impl PackageCache for DiskCache {
    async fn get(&self, name: &PackageName) -> anyhow::Result<Option<PackageRecord>> {
        match cacache::read(&self.cache_dir, Self::key(name)).await {
            Ok(bytes) => {
                let record = serde_json::from_slice(bytes.as_slice())
                    .with_context(|| format!("cached record for {} is not valid json", name))?;
                Ok(Some(record))
            }
            Err(cacache::Error::EntryNotFound(_, _)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, name: &PackageName, record: &PackageRecord) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec(record)?;
        cacache::write(&self.cache_dir, Self::key(name), bytes).await?;
        Ok(())
    }

    async fn list_names(&self) -> anyhow::Result<Vec<String>> {
        let cache_dir = self.cache_dir.clone();
        tokio::task::spawn_blocking(move || {
            let mut names = Vec::new();
            for entry in cacache::list_sync(&cache_dir) {
                match entry {
                    Ok(entry) => {
                        if let Some(name) = entry.key.strip_prefix(KEY_PREFIX) {
                            names.push(name.to_string());
                        }
                    }
                    Err(e) => warn!(error = ?e, "skipping unreadable cache index entry"),
                }
            }
            names.sort();
            names.dedup();
            names
        })
        .await
        .context("cache listing task failed")
    }
}
