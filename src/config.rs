use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use toml;

/// Everything a run needs beyond credentials. Constructed once at process
/// start and passed by reference into each component.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct JobConfig {
    pub base_url: String,
    pub auth_url: String,
    /// Catalog id of the dataset the wizard is narrowed to.
    pub dataset_id: String,
    /// Hard cap on the result set; the result page cannot be paged.
    pub max_scene_count: u64,
    /// Substring selecting which product option to download per scene.
    pub product_filter: String,
    /// Additional-criteria field ids of the dataset's search form. Remote
    /// form schema, not logic; an empty selection means "all".
    pub criteria_fields: Vec<String>,
    /// The reference flow skips the spatial/temporal tab; flip to submit it.
    pub apply_spatial_filter: bool,
    pub result_dir: PathBuf,
    pub tmp_dir: PathBuf,
    pub search: SearchRequest,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct SearchRequest {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    /// Closed ring of (longitude, latitude) vertices.
    pub polygon: Vec<(f64, f64)>,
    /// Month numbers the acquisition date must fall in.
    pub months: Vec<u8>,
}

impl JobConfig {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn write<P: AsRef<Path>>(self: &Self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn from_template(table: &toml::Table) -> Self {
        let config: Self =
            toml::from_str(&table.to_string()).expect("Error serializing template");
        config
    }

    pub fn tabs_save_url(self: &Self) -> String {
        format!("{}/tabs/save", self.base_url)
    }

    pub fn count_url(self: &Self, cache_buster: u128) -> String {
        format!(
            "{}/result/count?collection_id={}&_={}",
            self.base_url, self.dataset_id, cache_buster
        )
    }

    pub fn result_index_url(self: &Self) -> String {
        format!("{}/result/index", self.base_url)
    }

    pub fn metadata_lookup_url(self: &Self, scene_id: &str) -> String {
        format!(
            "{}/form/metadatalookup/?collection_id={}&entity_id={}",
            self.base_url, self.dataset_id, scene_id
        )
    }

    pub fn download_options_url(self: &Self, scene_id: &str) -> String {
        format!(
            "{}/download/options/{}/{}",
            self.base_url, self.dataset_id, scene_id
        )
    }
}

pub fn job_template() -> toml::Table {
    toml::toml! {
        base_url = "https://earthexplorer.usgs.gov"
        auth_url = "https://ers.cr.usgs.gov/login/"

        // Landsat 8. Other catalog ids:
        //   LandSat-4,5              - "3119"
        //   LandSat-7 (1999 - 2003)  - "3372"
        //   Landsat-7 (2003 - now)   - "3373"
        dataset_id = "4923"

        max_scene_count = 25000
        product_filter = "Level 1 GeoTIFF Data Product"
        apply_spatial_filter = false

        criteria_fields = [
            "select_10041_4",
            "select_10040_6",
            "select_10039_4",
            "select_10037_5",
            "select_10035_3",
            "select_16067_4",
            "select_17735_5",
        ]

        result_dir = "./scenes"
        tmp_dir = "/tmp"

        [search]
        date_from = "2014-08-23"
        date_to = "2015-09-01"
        months = [8]
        polygon = [
            [65.274704, 57.422701],
            [65.126716, 57.425387],
            [65.038587, 57.370736],
            [65.048564, 57.319596],
            [65.045239, 57.295346],
            [65.169948, 57.260291],
            [65.246437, 57.26209],
            [65.30796, 57.225203],
            [65.416042, 57.223402],
            [65.499182, 57.198189],
            [65.570682, 57.186476],
            [65.73031, 57.170253],
            [65.861671, 57.157631],
            [66.036265, 57.213499],
            [66.071183, 57.265686],
            [65.735299, 57.343829],
            [65.520798, 57.393144],
            [65.520798, 57.393144],
            [65.274704, 57.422701],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template() {
        let config = JobConfig::from_template(&job_template());
        assert_eq!(config.dataset_id, "4923");
        assert_eq!(config.max_scene_count, 25000);
        assert_eq!(config.criteria_fields.len(), 7);
        assert_eq!(config.search.polygon.len(), 19);
        assert_eq!(config.search.months, vec![8]);
        assert_eq!(
            config.search.date_from,
            NaiveDate::from_ymd_opt(2014, 8, 23).unwrap()
        );
        assert_eq!(config.apply_spatial_filter, false);
    }

    #[test]
    fn test_roundtrip_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.toml");

        let config = JobConfig::from_template(&job_template());
        config.write(&path).unwrap();

        let config = JobConfig::read(&path).unwrap();
        assert_eq!(config.base_url, "https://earthexplorer.usgs.gov");
        assert_eq!(config.search.polygon.len(), 19);
    }

    #[test]
    fn test_endpoint_urls() {
        let config = JobConfig::from_template(&job_template());
        assert_eq!(
            config.count_url(1234),
            "https://earthexplorer.usgs.gov/result/count?collection_id=4923&_=1234"
        );
        assert_eq!(
            config.metadata_lookup_url("LC81700212015"),
            "https://earthexplorer.usgs.gov/form/metadatalookup/?collection_id=4923&entity_id=LC81700212015"
        );
        assert_eq!(
            config.download_options_url("LC81700212015"),
            "https://earthexplorer.usgs.gov/download/options/4923/LC81700212015"
        );
    }
}
