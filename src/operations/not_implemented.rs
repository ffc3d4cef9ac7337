use super::*;

#[derive(Clone, Copy, Debug, Default)]
pub struct NotImplemented;

#[async_trait::async_trait]
impl PackageStorage for NotImplemented {
    async fn fetch_package(
        &self,
        _name: &PackageName,
        _release: Option<&str>,
    ) -> Result<PackageRecord, LookupError> {
        Err(anyhow::anyhow!("not implemented").into())
    }
}

#[async_trait::async_trait]
impl PackageListing for NotImplemented {
    async fn list_packages(&self) -> anyhow::Result<Vec<String>> {
        Err(anyhow::anyhow!("not implemented"))
    }

    async fn list_files(&self, _name: &PackageName) -> Result<Vec<FileLink>, LookupError> {
        Err(anyhow::anyhow!("not implemented").into())
    }
}
