//! stack-state — system-of-record for deployed applications.
//!
//! Backed by [redb](https://docs.rs/redb). Holds one `ApplicationSpec` row per
//! (cluster, application name), an append-only `DeployEvent` log, and the
//! registries each project may pull from.
//!
//! The reconciler only depends on the [`Repository`] trait; `StateStore` is
//! the bundled implementation. `StateStore` is `Clone` + `Send` + `Sync`
//! (backed by `Arc<Database>`) and can be shared across async tasks.
//!
//! The store is a best-effort mirror of the cluster. It never claims to know
//! whether an application is actually running.

pub mod error;
pub mod repository;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{Stage, StateError, StateResult};
pub use repository::Repository;
pub use store::StateStore;
pub use types::*;
