pub mod provider;

#[cfg(feature = "backend-cpal")]
pub mod cpal;

pub use provider::{
    PermissionProvider, PermissionProviderFactory, PermissionSource, StaticPermission,
};
