//! stack-compiler — stack manifest → deployable artifacts.
//!
//! Compiles a stack manifest plus a resolved image into:
//!
//! - a chart whose dependencies are the manifest's apps,
//! - the values map for the main release,
//! - optional values for the release job (`None` = no job release wanted).
//!
//! On updates the caller may pass the prior release's values and chart
//! dependencies. New values are deep-merged over them so fields the manifest
//! does not mention survive, and dependency pins are reused.
//!
//! Compilation is pure: it never talks to the platform or the store, which
//! makes it the validation gate in front of any cluster mutation.

pub mod compiler;
pub mod error;
pub mod manifest;
pub mod values;

pub use compiler::{ChartCompiler, CompileInput, CompileOptions, CompiledStack, ManifestCompiler};
pub use error::{CompileError, CompileResult};
pub use manifest::{AppKind, StackManifest};
pub use values::deep_merge;
