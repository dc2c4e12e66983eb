//! Image resolution.
//!
//! Priority, highest first:
//!
//! 1. a complete `{repository, tag}` pair on the request,
//! 2. the image baked into the prior release values (create or override only),
//! 3. the upstream build output (`repo:tag`),
//! 4. nothing: the zero value, which leaves image values untouched.

use serde_json::Value;
use stack_core::ImageInfo;
use stack_platform::Values;

/// Everything the resolver may draw an image from.
#[derive(Debug, Clone, Copy)]
pub struct ImageSources<'a> {
    pub explicit: &'a ImageInfo,
    /// Whether the prior release config may be consulted.
    pub consult_prior: bool,
    pub prior_config: Option<&'a Values>,
    pub build_output: Option<&'a str>,
}

pub fn resolve_image(sources: &ImageSources<'_>) -> ImageInfo {
    if sources.explicit.is_complete() {
        return sources.explicit.clone();
    }

    if sources.consult_prior {
        if let Some(image) = sources.prior_config.and_then(image_from_values) {
            return image;
        }
    }

    sources
        .build_output
        .map(ImageInfo::parse_reference)
        .unwrap_or_default()
}

/// Image recorded in release values: `global.image` first, then the first
/// top-level section (by key) that carries one.
pub fn image_from_values(values: &Values) -> Option<ImageInfo> {
    if let Some(image) = values.get("global").and_then(image_in_section) {
        return Some(image);
    }

    let mut keys: Vec<&String> = values.keys().filter(|key| *key != "global").collect();
    keys.sort();
    keys.into_iter()
        .find_map(|key| values.get(key).and_then(image_in_section))
}

fn image_in_section(section: &Value) -> Option<ImageInfo> {
    let image = section.get("image")?;
    let repository = image.get("repository")?.as_str()?;
    let tag = image.get("tag")?.as_str()?;
    let image = ImageInfo::new(repository, tag);
    image.is_complete().then_some(image)
}
