//! # Storage Key Derivation
//!
//! Maps item metadata to the object key an archive is stored under:
//!
//! ```text
//! {site label}/{top-level category}/{url slug}.zip
//!
//! site            = "themeforest.net"            → "themeforest"
//! classification  = "site-templates/creative"    → "site-templates"
//! url             = "https://themeforest.net/item/avada-responsive/2833226"
//!                                                → "avada-responsive"
//! key             = "themeforest/site-templates/avada-responsive.zip"
//! ```
//!
//! The slug is the second path segment of the canonical item URL (the first
//! being `item`). Derivation is a pure function of its input, so the same
//! metadata always maps to the same key and re-uploads overwrite in place.

use bridge_traits::catalog::ItemMetadata;
use url::Url;

use crate::{Result, SyncError};

/// Extension appended to every archive key
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Derive the object key for an item
///
/// # Errors
///
/// Returns [`SyncError::KeyDerivation`] when the site or classification is
/// blank, the URL does not parse, or its path has no slug segment.
pub fn derive_storage_key(item: &ItemMetadata) -> Result<String> {
    let site = first_component(&item.site, '.', "site")?;
    let category = first_component(&item.classification, '/', "classification")?;
    let slug = url_slug(&item.url)?;

    Ok(format!("{}/{}/{}.{}", site, category, slug, ARCHIVE_EXTENSION))
}

fn first_component<'a>(value: &'a str, separator: char, field: &str) -> Result<&'a str> {
    let component = value.trim().split(separator).next().unwrap_or_default().trim();
    validate_component(component, field, value)?;
    Ok(component)
}

fn url_slug(raw_url: &str) -> Result<String> {
    let url = Url::parse(raw_url.trim()).map_err(|e| {
        SyncError::KeyDerivation(format!("item url '{}' is not a valid URL: {}", raw_url, e))
    })?;

    let slug = url
        .path_segments()
        .and_then(|mut segments| segments.nth(1))
        .unwrap_or_default();
    validate_component(slug, "url slug", raw_url)?;

    Ok(slug.to_string())
}

fn validate_component(component: &str, field: &str, source: &str) -> Result<()> {
    if component.is_empty() {
        return Err(SyncError::KeyDerivation(format!(
            "{} is empty (from '{}')",
            field, source
        )));
    }
    if component == "." || component == ".." {
        return Err(SyncError::KeyDerivation(format!(
            "{} '{}' is a relative path component",
            field, component
        )));
    }
    if component.contains(['/', '\\']) || component.chars().any(char::is_control) {
        return Err(SyncError::KeyDerivation(format!(
            "{} '{}' contains a path separator or control character",
            field, component
        )));
    }
    Ok(())
}
