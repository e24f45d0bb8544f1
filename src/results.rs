use std::time::{SystemTime, UNIX_EPOCH};

use scraper::{Html, Selector};
use serde_json::Value;
use tracing::info;

use crate::config::JobConfig;
use crate::error::Error;
use crate::scene::SceneRecord;
use crate::session::Session;

/// Query the result count and scrape the rendered result page into scene
/// records, in document order. An empty result set is not an error; a
/// result set over the configured cap is, since the page cannot be paged.
pub async fn enumerate_scenes(
    session: &Session,
    config: &JobConfig,
) -> Result<Vec<SceneRecord>, Error> {
    let count = fetch_scene_count(session, config).await?;
    info!(count, "received scene count");

    if count == 0 {
        return Ok(Vec::new());
    }
    guard_scene_count(count, config.max_scene_count)?;

    let html = fetch_result_page(session, config).await?;
    Ok(parse_result_page(&html, config))
}

async fn fetch_scene_count(session: &Session, config: &JobConfig) -> Result<u64, Error> {
    // Cache buster, same shape the result page's own JS sends.
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();

    let body: Value = session
        .client()
        .get(config.count_url(millis))
        .send()
        .await?
        .json()
        .await?;

    parse_collection_count(&body)
}

/// The count endpoint has served `collectionCount` both as a JSON number
/// and as a decimal string; accept either.
fn parse_collection_count(body: &Value) -> Result<u64, Error> {
    match &body["collectionCount"] {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| Error::Protocol(format!("collectionCount is not a count: {n}"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| Error::Protocol(format!("collectionCount is not a count: {s:?}"))),
        other => Err(Error::Protocol(format!(
            "count response has no collectionCount: {other}"
        ))),
    }
}

fn guard_scene_count(count: u64, limit: u64) -> Result<(), Error> {
    if count > limit {
        return Err(Error::ResultSetTooLarge { count, limit });
    }
    Ok(())
}

async fn fetch_result_page(session: &Session, config: &JobConfig) -> Result<String, Error> {
    // Without this header set the endpoint renders a full page instead of
    // the AJAX fragment the scraper expects.
    let response = session
        .client()
        .post(config.result_index_url())
        .header("Content-Type", "application/x-www-form-urlencoded; charset=UTF-8")
        .header("X-Requested-With", "XMLHttpRequest")
        .header("Referer", config.base_url.as_str())
        .header("Pragma", "no-cache")
        .header("Cache-Control", "no-cache")
        .body(format!("collectionId={}", config.dataset_id))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(Error::Protocol(format!(
            "result/index responded with {}",
            response.status()
        )));
    }
    Ok(response.text().await?)
}

/// Every `img` carrying a class encodes one scene: the first class token is
/// the entity id, the thumbnail src rewrites to the full browse image.
pub(crate) fn parse_result_page(html: &str, config: &JobConfig) -> Vec<SceneRecord> {
    let document = Html::parse_document(html);
    let images = Selector::parse("img").expect("Selector pattern should always compile");

    let mut scenes = Vec::new();
    for img in document.select(&images) {
        let Some(class) = img.value().attr("class") else {
            continue;
        };
        let Some(id) = class.split_whitespace().next() else {
            continue;
        };

        let Some(src) = img.value().attr("src") else {
            continue;
        };
        let preview = src.replace("/browse/thumbnails/", "/browse/");

        scenes.push(SceneRecord::new(id, &preview, &config.metadata_lookup_url(id)));
    }
    scenes
}
