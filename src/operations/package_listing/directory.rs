use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::models::{FileLink, PackageName};
use crate::operations::settings::Settings;
use crate::operations::{LookupError, Origin, PackageListing};

/// Mount point for the raw files of a package directory.
pub const FILES_PREFIX: &str = "/packages";

/// A local directory holding one sub-directory of distribution files per
/// package.
#[derive(Clone, Debug)]
pub struct Directory {
    root: PathBuf,
}

impl Directory {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: PathBuf::from(root.as_ref()),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.package_dir)
    }

    pub fn root(&self) -> &Path {
        self.root.as_path()
    }
}

#[async_trait::async_trait]
impl PackageListing for Directory {
    async fn list_packages(&self) -> anyhow::Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(root = ?self.root, "package directory does not exist");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    async fn list_files(&self, name: &PackageName) -> Result<Vec<FileLink>, LookupError> {
        let package_dir = self.root.join(name.as_str());
        let is_dir = match tokio::fs::metadata(&package_dir).await {
            Ok(metadata) => metadata.is_dir(),
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(anyhow::Error::from(e).into()),
        };
        if !is_dir {
            return Err(LookupError::PackageNotFound {
                name: name.clone(),
                origin: Origin::PackageDirectory,
            });
        }

        let mut entries = tokio::fs::read_dir(&package_dir)
            .await
            .map_err(anyhow::Error::from)?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(anyhow::Error::from)? {
            let is_file = entry
                .file_type()
                .await
                .map_err(anyhow::Error::from)?
                .is_file();
            if !is_file {
                continue;
            }
            let Ok(filename) = entry.file_name().into_string() else {
                continue;
            };

            let href = format!(
                "{}/{}/{}",
                FILES_PREFIX,
                urlencoding::encode(name.as_str()),
                urlencoding::encode(filename.as_str())
            );
            files.push(FileLink { filename, href });
        }
        files.sort();
        Ok(files)
    }
}
