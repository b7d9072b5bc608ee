//! Envato Market API response types
//!
//! Data structures for deserializing Envato Market API v3 responses. Unknown
//! fields are ignored.

use bridge_traits::catalog::{ItemId, ItemMetadata, Purchase};
use serde::Deserialize;

/// `GET /buyer/list-purchases` response
///
/// See: https://build.envato.com/api/#market_0_getBuyerListPurchases
#[derive(Debug, Deserialize)]
pub struct ListPurchasesResponse {
    /// Total number of purchases across all pages
    #[serde(default)]
    pub count: Option<u64>,

    /// Purchases on this page
    #[serde(default)]
    pub results: Vec<PurchaseEntry>,
}

/// One purchase (a sale of an item to the token owner)
#[derive(Debug, Deserialize)]
pub struct PurchaseEntry {
    pub item: CatalogItem,
}

/// Catalog item resource
///
/// Returned both inside purchase entries and by `GET /catalog/item`.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogItem {
    pub id: u64,
    pub name: String,
    pub url: String,
    pub site: String,
    pub classification: String,
    pub updated_at: String,
    #[serde(default)]
    pub previews: Option<Previews>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Previews {
    #[serde(default)]
    pub icon_with_landscape_preview: Option<LandscapePreview>,
    #[serde(default)]
    pub landscape_preview: Option<LandscapePreview>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LandscapePreview {
    #[serde(default)]
    pub landscape_url: Option<String>,
}

/// `GET /buyer/download` response
#[derive(Debug, Deserialize)]
pub struct DownloadResponse {
    pub download_url: String,
}

impl CatalogItem {
    /// Landscape preview URL, preferring the icon-with-landscape variant
    pub fn preview_url(&self) -> Option<String> {
        let previews = self.previews.as_ref()?;
        previews
            .icon_with_landscape_preview
            .as_ref()
            .and_then(|p| p.landscape_url.clone())
            .or_else(|| {
                previews
                    .landscape_preview
                    .as_ref()
                    .and_then(|p| p.landscape_url.clone())
            })
    }

    pub fn into_purchase(self) -> Purchase {
        let preview_url = self.preview_url();
        Purchase {
            item_id: ItemId(self.id),
            name: self.name,
            url: self.url,
            updated_at: self.updated_at,
            site: self.site,
            classification: self.classification,
            preview_url,
        }
    }

    pub fn into_metadata(self) -> ItemMetadata {
        let preview_url = self.preview_url();
        ItemMetadata {
            id: ItemId(self.id),
            name: self.name,
            url: self.url,
            site: self.site,
            classification: self.classification,
            updated_at: self.updated_at,
            preview_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITEM: &str = r#"{
        "id": 2833226,
        "name": "Avada | Website Builder For WordPress & WooCommerce",
        "url": "https://themeforest.net/item/avada-responsive-multipurpose-theme/2833226",
        "site": "themeforest.net",
        "classification": "wordpress/corporate",
        "updated_at": "2023-01-01T00:00:00+10:00",
        "number_of_sales": 900000,
        "previews": {
            "landscape_preview": { "landscape_url": "https://s3.envato.com/landscape.jpg" }
        }
    }"#;

    #[test]
    fn test_preview_falls_back_to_landscape_preview() {
        let item: CatalogItem = serde_json::from_str(ITEM).unwrap();
        assert_eq!(
            item.preview_url().as_deref(),
            Some("https://s3.envato.com/landscape.jpg")
        );
    }

    #[test]
    fn test_preview_prefers_icon_with_landscape() {
        let json = r#"{
            "id": 1, "name": "n", "url": "u", "site": "s", "classification": "c",
            "updated_at": "t",
            "previews": {
                "icon_with_landscape_preview": { "landscape_url": "https://a/icon.jpg" },
                "landscape_preview": { "landscape_url": "https://a/plain.jpg" }
            }
        }"#;
        let item: CatalogItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.preview_url().as_deref(), Some("https://a/icon.jpg"));
    }

    #[test]
    fn test_missing_previews() {
        let json = r#"{"id": 1, "name": "n", "url": "u", "site": "s", "classification": "c", "updated_at": "t"}"#;
        let item: CatalogItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.preview_url(), None);
    }

    #[test]
    fn test_into_metadata_keeps_updated_at_verbatim() {
        let item: CatalogItem = serde_json::from_str(ITEM).unwrap();
        let metadata = item.into_metadata();
        assert_eq!(metadata.id, ItemId(2833226));
        assert_eq!(metadata.updated_at, "2023-01-01T00:00:00+10:00");
    }

    #[test]
    fn test_list_purchases_page() {
        let json = format!(r#"{{"count": 1, "results": [{{"code": "abc", "item": {}}}]}}"#, ITEM);
        let page: ListPurchasesResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(page.count, Some(1));
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].item.site, "themeforest.net");
    }
}
