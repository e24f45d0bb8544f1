use std::collections::BTreeMap;

/// One catalog entry from the result page, progressively enriched with
/// scraped metadata fields and product download options.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneRecord {
    /// Catalog entity id, also the archive file stem.
    pub id: String,
    /// Full-size browse image URL.
    pub preview: String,
    /// Metadata-lookup page for this scene.
    pub metadata_url: String,
    /// Scraped metadata rows. The key set is whatever the remote table
    /// contains, so this stays a plain string map.
    pub fields: BTreeMap<String, String>,
    /// Product option label -> download URL.
    pub products: BTreeMap<String, String>,
    /// Set only after the archive is on disk and passed verification.
    pub downloaded: bool,
}

impl SceneRecord {
    pub fn new(id: &str, preview: &str, metadata_url: &str) -> Self {
        SceneRecord {
            id: id.to_string(),
            preview: preview.to_string(),
            metadata_url: metadata_url.to_string(),
            fields: BTreeMap::new(),
            products: BTreeMap::new(),
            downloaded: false,
        }
    }

    /// First product option whose label contains `label_part`.
    pub fn product_url_containing(&self, label_part: &str) -> Option<&str> {
        self.products
            .iter()
            .find(|(label, _)| label.contains(label_part))
            .map(|(_, url)| url.as_str())
    }
}
