use reqwest::StatusCode;
use tracing::{debug, instrument};
use url::Url;

use crate::models::{PackageName, PackageRecord};
use crate::operations::settings::Settings;
use crate::operations::{LookupError, Origin, PackageStorage};

/// Read-only client for an upstream index speaking PyPI's JSON API.
#[derive(Clone, Debug)]
pub struct RemoteIndex {
    registry: Url,
    client: reqwest::Client,
}

impl RemoteIndex {
    pub fn new(settings: &Settings) -> Self {
        Self {
            registry: settings.upstream_url.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn url_for(&self, name: &PackageName, release: Option<&str>) -> anyhow::Result<Url> {
        let mut url = self.registry.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow::anyhow!("upstream url {} cannot be a base", self.registry))?;
            segments.pop_if_empty().push("pypi").push(name.as_str());
            if let Some(release) = release {
                segments.push(release);
            }
            segments.push("json");
        }
        Ok(url)
    }
}

#[async_trait::async_trait]
impl PackageStorage for RemoteIndex {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_package(
        &self,
        name: &PackageName,
        release: Option<&str>,
    ) -> Result<PackageRecord, LookupError> {
        let url = self.url_for(name, release)?;
        let response = self.client.get(url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(status = %response.status(), "upstream has no such package");
            return Err(match release {
                Some(version) => LookupError::ReleaseNotFound {
                    name: name.clone(),
                    version: version.to_string(),
                    origin: Origin::Upstream,
                },
                None => LookupError::PackageNotFound {
                    name: name.clone(),
                    origin: Origin::Upstream,
                },
            });
        }

        Ok(response.error_for_status()?.json().await?)
    }
}
