//! stack-reconciler — converge one application onto the cluster and the record store.
//!
//! A reconciliation takes a [`DeployRequest`](stack_core::DeployRequest) and:
//!
//! 1. probes the platform for the main release (absent → create, present → update),
//! 2. resolves the image and compiles the manifest,
//! 3. on create, makes sure the application namespace exists,
//! 4. on override, installs / upgrades / uninstalls the job release,
//! 5. installs (create) or upgrade-installs (update) the main release,
//! 6. writes the application row and appends a deploy event.
//!
//! # Components
//!
//! - **`image`** — image resolution from request, prior release and build output
//! - **`probe`** — release existence probe
//! - **`job`** — job release state machine
//! - **`driver`** — namespace + main release install / upgrade with rollback
//! - **`records`** — application row and deploy event writes
//! - **`lock`** — per-(cluster, name) serialization
//! - **`target`** — namespace and release names of an application
//! - **`reconciler`** — the orchestration above
//!
//! The cluster is authoritative. The record store is a best-effort mirror and
//! nothing here spans both in a transaction.

pub mod driver;
pub mod error;
pub mod image;
pub mod job;
pub mod lock;
pub mod probe;
pub mod reconciler;
pub mod records;
pub mod target;

pub use error::{ErrorClass, PlatformOp, ReconcileError, ReconcileResult};
pub use image::{ImageSources, resolve_image};
pub use job::JobAction;
pub use lock::ReleaseLocks;
pub use reconciler::{Outcome, Reconciled, Reconciler};
pub use target::StackTarget;
