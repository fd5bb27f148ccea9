pub mod batch;
pub mod extract;
pub mod inspect;
pub mod validate;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::cli::ExtractionOptions;
use crate::structure::{CitationConfig, ExtractConfig, ImageCatalog, parse_terminal_punctuation};
use crate::util::read_json;

pub(crate) fn extract_config(
    options: &ExtractionOptions,
    images: ImageCatalog,
    act_url: Option<String>,
) -> ExtractConfig {
    ExtractConfig {
        terminal_punctuation: parse_terminal_punctuation(&options.terminal_punctuation),
        depth_rule: options.depth_rule,
        citation: CitationConfig {
            base_url: options.citation_base_url.clone(),
            default_jurisdiction: options.default_jurisdiction.clone(),
            act_url: act_url.or_else(|| options.act_url.clone()),
        },
        images,
    }
}

/// Image maps are JSON objects from the identifier found in the markup to the
/// converted image's display name.
pub(crate) fn load_image_catalog(path: Option<&Path>) -> Result<ImageCatalog> {
    let Some(path) = path else {
        return Ok(ImageCatalog::default());
    };

    let names: BTreeMap<String, String> = read_json(path)?;
    let catalog = ImageCatalog::new(names);
    info!(path = %path.display(), images = catalog.len(), "loaded image map");
    Ok(catalog)
}
