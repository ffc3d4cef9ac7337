use std::{collections::HashMap, fmt::Debug, sync::Arc};

use tokio::sync::RwLock;

use crate::models::{PackageName, PackageRecord};
use crate::operations::PackageCache;

#[derive(Clone)]
pub struct InMemoryCache {
    packages: Arc<RwLock<HashMap<PackageName, PackageRecord>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self {
            packages: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for InMemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut formatter = f.debug_struct("InMemoryCache");
        if let Ok(packages) = self.packages.try_read() {
            formatter.field("packages", &packages.keys().collect::<Vec<_>>());
        }
        formatter.finish()
    }
}

#[async_trait::async_trait]
impl PackageCache for InMemoryCache {
    async fn get(&self, name: &PackageName) -> anyhow::Result<Option<PackageRecord>> {
        let packages = self.packages.read().await;
        Ok(packages.get(name).cloned())
    }

    async fn put(&self, name: &PackageName, record: &PackageRecord) -> anyhow::Result<()> {
        let mut packages = self.packages.write().await;
        packages.insert(name.clone(), record.clone());
        Ok(())
    }

    async fn list_names(&self) -> anyhow::Result<Vec<String>> {
        let packages = self.packages.read().await;
        Ok(packages.keys().map(ToString::to_string).collect())
    }
}
