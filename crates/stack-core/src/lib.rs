pub mod config;
pub mod image;
pub mod patch;
pub mod request;

pub use config::StackdConfig;
pub use image::ImageInfo;
pub use patch::FieldPatch;
pub use request::{DeployRequest, ProvenancePatch, RequestError};
