//! The three wizard-state transitions that narrow the catalog search to a
//! single dataset with its criteria. Each transition POSTs a form field
//! `data` holding a JSON payload to the same save-tab endpoint; the remote
//! keeps the wizard state server-side, so there is nothing to validate in
//! the response beyond HTTP success.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::{JobConfig, SearchRequest};
use crate::error::Error;
use crate::session::Session;

/// Polygon vertex in the positional form the catalog expects.
#[derive(Serialize, Debug, PartialEq)]
pub struct Coordinate {
    /// Vertex index within the ring.
    pub c: usize,
    /// Latitude.
    pub a: f64,
    /// Longitude.
    pub o: f64,
}

/// Run the fixed tab sequence. The spatial/temporal tab is submitted only
/// when the config enables it; the dataset and criteria tabs always run.
pub async fn apply_search(
    session: &Session,
    config: &JobConfig,
    search: &SearchRequest,
) -> Result<(), Error> {
    if config.apply_spatial_filter {
        save_tab(session, config, &spatial_filter_payload(config, search)).await?;
    }
    save_tab(session, config, &dataset_payload(config)).await?;
    save_tab(session, config, &criteria_payload(config)).await?;
    Ok(())
}

async fn save_tab(session: &Session, config: &JobConfig, payload: &Value) -> Result<(), Error> {
    debug!(tab = %payload["tab"], destination = %payload["destination"], "saving wizard tab");

    let response = session
        .client()
        .post(config.tabs_save_url())
        .form(&[("data", payload.to_string())])
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(Error::Protocol(format!(
            "tabs/save responded with {}",
            response.status()
        )));
    }
    Ok(())
}

pub fn polygon_to_coordinates(polygon: &[(f64, f64)]) -> Vec<Coordinate> {
    polygon
        .iter()
        .enumerate()
        .map(|(i, &(lon, lat))| Coordinate { c: i, a: lat, o: lon })
        .collect()
}

/// Tab 1 -> 2: spatial and temporal filter. Dates go over the wire in the
/// US form the search form uses; months as decimal strings.
fn spatial_filter_payload(config: &JobConfig, search: &SearchRequest) -> Value {
    let months: Vec<String> = search.months.iter().map(u8::to_string).collect();
    json!({
        "tab": 1,
        "destination": 2,
        "coordinates": polygon_to_coordinates(&search.polygon),
        "format": "dd",
        "dStart": search.date_from.format("%m/%d/%Y").to_string(),
        "dEnd": search.date_to.format("%m/%d/%Y").to_string(),
        "searchType": "Std",
        "num": config.max_scene_count.to_string(),
        "months": months,
        "pType": "polygon",
    })
}

/// Tab 2 -> 3: select the dataset by catalog id.
fn dataset_payload(config: &JobConfig) -> Value {
    json!({
        "tab": 2,
        "destination": 3,
        "cList": [config.dataset_id],
        "selected": config.dataset_id,
    })
}

/// Tab 3 -> 4: empty criteria, selecting "all" for every configured
/// filter-field id of the dataset's search form.
fn criteria_payload(config: &JobConfig) -> Value {
    let mut fields = serde_json::Map::new();
    for field in &config.criteria_fields {
        fields.insert(field.clone(), json!([""]));
    }

    let mut criteria = serde_json::Map::new();
    criteria.insert(config.dataset_id.clone(), Value::Object(fields));

    json!({
        "tab": 3,
        "destination": 4,
        "criteria": criteria,
        "selected": config.dataset_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::job_template;

    #[test]
    fn test_polygon_to_coordinates() {
        let coordinates = polygon_to_coordinates(&[(65.274704, 57.422701), (65.126716, 57.425387)]);
        assert_eq!(
            coordinates,
            vec![
                Coordinate { c: 0, a: 57.422701, o: 65.274704 },
                Coordinate { c: 1, a: 57.425387, o: 65.126716 },
            ]
        );
    }

    #[test]
    fn test_spatial_filter_payload() {
        let config = JobConfig::from_template(&job_template());
        let payload = spatial_filter_payload(&config, &config.search);

        assert_eq!(payload["tab"], 1);
        assert_eq!(payload["destination"], 2);
        assert_eq!(payload["dStart"], "08/23/2014");
        assert_eq!(payload["dEnd"], "09/01/2015");
        assert_eq!(payload["searchType"], "Std");
        assert_eq!(payload["pType"], "polygon");
        // The form expects numbers as strings.
        assert_eq!(payload["num"], "25000");
        assert_eq!(payload["months"], json!(["8"]));
        assert_eq!(payload["coordinates"].as_array().unwrap().len(), 19);
        assert_eq!(payload["coordinates"][0], json!({"c": 0, "a": 57.422701, "o": 65.274704}));
    }

    #[test]
    fn test_dataset_payload() {
        let config = JobConfig::from_template(&job_template());
        let payload = dataset_payload(&config);

        assert_eq!(payload["tab"], 2);
        assert_eq!(payload["destination"], 3);
        assert_eq!(payload["cList"], json!(["4923"]));
        assert_eq!(payload["selected"], "4923");
    }

    #[test]
    fn test_criteria_payload() {
        let config = JobConfig::from_template(&job_template());
        let payload = criteria_payload(&config);

        assert_eq!(payload["tab"], 3);
        assert_eq!(payload["destination"], 4);
        assert_eq!(payload["selected"], "4923");

        let fields = payload["criteria"]["4923"].as_object().unwrap();
        assert_eq!(fields.len(), 7);
        assert_eq!(fields["select_10041_4"], json!([""]));
        assert_eq!(fields["select_17735_5"], json!([""]));
    }
}
