use super::not_implemented::NotImplemented;
use super::*;

/// The set of services the HTTP routes are served from.
#[derive(Clone, Copy, Debug)]
pub struct Policy<PackageStorageImpl = NotImplemented, PackageListingImpl = NotImplemented>
where
    PackageStorageImpl: PackageStorage + Send + Sync,
    PackageListingImpl: PackageListing + Send + Sync,
{
    package_storage: PackageStorageImpl,
    package_listing: PackageListingImpl,
}

impl Policy {
    pub fn new() -> Self {
        Self {
            package_storage: NotImplemented,
            package_listing: NotImplemented,
        }
    }
}

impl Default for Policy {
    fn default() -> Self {
        Policy::new()
    }
}

impl<S, L> Policy<S, L>
where
    S: PackageStorage + Send + Sync,
    L: PackageListing + Send + Sync,
{
    pub fn with_package_storage<S1: PackageStorage + Send + Sync>(
        self,
        package_storage: S1,
    ) -> Policy<S1, L> {
        Policy {
            package_storage,
            package_listing: self.package_listing,
        }
    }

    pub fn with_package_listing<L1: PackageListing + Send + Sync>(
        self,
        package_listing: L1,
    ) -> Policy<S, L1> {
        Policy {
            package_storage: self.package_storage,
            package_listing,
        }
    }
}

#[async_trait::async_trait]
impl<S, L> PackageStorage for Policy<S, L>
where
    S: PackageStorage + Send + Sync,
    L: PackageListing + Send + Sync,
{
    async fn fetch_package(
        &self,
        name: &PackageName,
        release: Option<&str>,
    ) -> Result<PackageRecord, LookupError> {
        self.package_storage.fetch_package(name, release).await
    }
}

#[async_trait::async_trait]
impl<S, L> PackageListing for Policy<S, L>
where
    S: PackageStorage + Send + Sync,
    L: PackageListing + Send + Sync,
{
    async fn list_packages(&self) -> anyhow::Result<Vec<String>> {
        self.package_listing.list_packages().await
    }

    async fn list_files(&self, name: &PackageName) -> Result<Vec<FileLink>, LookupError> {
        self.package_listing.list_files(name).await
    }
}
