use std::fmt::Display;

use thiserror::Error;

use crate::models::{FileLink, PackageName, PackageNameError, PackageRecord};

pub(crate) mod not_implemented;
pub(crate) mod package_cache;
pub(crate) mod package_listing;
pub(crate) mod package_storage;
pub(crate) mod policy;
pub(crate) mod settings;

/// Where a lookup gave up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    Cache,
    Upstream,
    PackageDirectory,
}

impl Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Origin::Cache => "cache",
            Origin::Upstream => "upstream index",
            Origin::PackageDirectory => "package directory",
        })
    }
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error(transparent)]
    InvalidName(#[from] PackageNameError),

    #[error("package {name} not found in {origin}")]
    PackageNotFound { name: PackageName, origin: Origin },

    #[error("release {version} of package {name} not found in {origin}")]
    ReleaseNotFound {
        name: PackageName,
        version: String,
        origin: Origin,
    },

    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LookupError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LookupError::PackageNotFound { .. } | LookupError::ReleaseNotFound { .. }
        )
    }
}

/// Something that can answer package and release metadata lookups.
#[async_trait::async_trait]
pub trait PackageStorage: Send + Sync {
    /// Fetch the record for `name`. When `release` is given, the lookup fails
    /// with [`LookupError::ReleaseNotFound`] unless that release exists.
    async fn fetch_package(
        &self,
        name: &PackageName,
        release: Option<&str>,
    ) -> Result<PackageRecord, LookupError>;
}

/// The document store persisted package records live in.
#[async_trait::async_trait]
pub trait PackageCache: Send + Sync {
    async fn get(&self, name: &PackageName) -> anyhow::Result<Option<PackageRecord>>;

    /// Create the entry for `name`, or replace it wholesale.
    async fn put(&self, name: &PackageName, record: &PackageRecord) -> anyhow::Result<()>;

    async fn list_names(&self) -> anyhow::Result<Vec<String>>;
}

/// Backs the browsable `/simple/` pages.
#[async_trait::async_trait]
pub trait PackageListing: Send + Sync {
    async fn list_packages(&self) -> anyhow::Result<Vec<String>>;

    async fn list_files(&self, name: &PackageName) -> Result<Vec<FileLink>, LookupError>;
}
