mod app;
mod handlers;
mod models;
mod operations;

pub use app::package_routes;
pub use handlers::v1::routes;
pub use models::{FileLink, PackageName, PackageNameError, PackageRecord};
pub use operations::policy::Policy;
pub use operations::settings::{CacheBackend, Settings, SettingsError};

pub use operations::{LookupError, Origin, PackageCache, PackageListing, PackageStorage};

pub mod services {
    pub mod storage {
        pub use crate::operations::package_storage::read_through::ReadThrough;
        pub use crate::operations::package_storage::remote::RemoteIndex;
    }

    pub mod cache {
        pub use crate::operations::package_cache::disk::DiskCache as Disk;
        pub use crate::operations::package_cache::fauna::{FaunaCache as Fauna, FaunaError};
        pub use crate::operations::package_cache::in_memory::InMemoryCache as InMemory;
    }

    pub mod listing {
        pub use crate::operations::package_listing::directory::{Directory, FILES_PREFIX};
    }
}
