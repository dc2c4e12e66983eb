//! stack-platform — the orchestration platform as the reconciler sees it.
//!
//! The platform is a black box with a get / install / upgrade-or-install /
//! uninstall / create-namespace contract ([`ReleasePlatform`]). Release
//! versions are owned by the platform; callers never set them.
//!
//! [`MemoryPlatform`] keeps releases in memory. It backs the standalone
//! daemon and the reconciler tests, and supports fault injection per
//! operation and release name.

pub mod error;
pub mod memory;
pub mod platform;
pub mod release;

pub use error::{PlatformError, PlatformResult};
pub use memory::{MemoryPlatform, PlatformCall, PlatformOp};
pub use platform::ReleasePlatform;
pub use release::{Chart, ChartMetadata, Dependency, InstallConfig, Release, ReleaseStatus, Values};
