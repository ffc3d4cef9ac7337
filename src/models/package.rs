use std::{
    collections::BTreeMap,
    fmt::{Debug, Display},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PackageNameError {
    #[error("Invalid package name: {0}")]
    InvalidPackageName(&'static str),
}

/// A package name exactly as the caller supplied it. No PEP 503 normalization
/// is applied, so `Foo` and `foo` address different cache entries.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageName(String);

impl PackageName {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for PackageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl Debug for PackageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for PackageName {
    type Err = PackageNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PackageNameError::InvalidPackageName(
                "there must be some kind of package name",
            ));
        }

        if s.contains('/') || s.contains('\\') {
            return Err(PackageNameError::InvalidPackageName(
                "package names may not contain path separators",
            ));
        }

        if s == "." || s == ".." {
            return Err(PackageNameError::InvalidPackageName(
                "package names may not be relative path components",
            ));
        }

        Ok(PackageName(s.to_string()))
    }
}

/// The metadata document the upstream index returns for a package.
///
/// Only `releases` is interpreted. Every other field is carried through
/// untouched, and map keys serialize in sorted order so the same record always
/// produces the same bytes.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
pub struct PackageRecord {
    #[serde(default)]
    pub releases: BTreeMap<String, serde_json::Value>,

    #[serde(flatten)]
    pub meta: serde_json::Map<String, serde_json::Value>,
}

impl PackageRecord {
    pub fn has_release(&self, version: &str) -> bool {
        self.releases.contains_key(version)
    }

    /// Every distribution file listed under any release, in version-key order.
    /// Entries without a `filename` or `url` are skipped.
    pub fn files(&self) -> Vec<FileLink> {
        self.releases
            .values()
            .filter_map(serde_json::Value::as_array)
            .flatten()
            .filter_map(|file| {
                let filename = file.get("filename")?.as_str()?;
                let url = file.get("url")?.as_str()?;
                let href = match file
                    .get("digests")
                    .and_then(|digests| digests.get("sha256"))
                    .and_then(serde_json::Value::as_str)
                {
                    Some(sha256) => format!("{}#sha256={}", url, sha256),
                    None => url.to_string(),
                };

                Some(FileLink {
                    filename: filename.to_string(),
                    href,
                })
            })
            .collect()
    }
}

/// One anchor on a `/simple/{name}/` page.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, PartialOrd, Ord)]
pub struct FileLink {
    pub filename: String,
    pub href: String,
}
