//! Per-scene enrichment: the metadata-lookup table and the download-options
//! panel. Both are real-world HTML with decorative rows and disabled
//! controls mixed in, so the parsers skip what they cannot shape rather
//! than fail.

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use crate::config::JobConfig;
use crate::error::{Error, ScrapeStage};
use crate::scene::SceneRecord;
use crate::session::Session;

/// One enabled entry of the download-options panel.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductOption {
    pub label: String,
    pub url: String,
}

/// Fetch and merge the metadata table and download options into `scene`.
/// A transport or shape failure surfaces with the scene id and the stage
/// that broke, so one bad scene can be dropped without losing the batch.
pub async fn enrich_scene(
    session: &Session,
    config: &JobConfig,
    scene: &mut SceneRecord,
) -> Result<(), Error> {
    fill_metadata(session, scene).await?;
    fill_download_options(session, config, scene).await?;
    Ok(())
}

async fn fill_metadata(session: &Session, scene: &mut SceneRecord) -> Result<(), Error> {
    let stage = ScrapeStage::Metadata;
    let response = session
        .client()
        .get(&scene.metadata_url)
        .send()
        .await
        .map_err(|e| scrape_error(&scene.id, stage, e))?;
    let html = response
        .text()
        .await
        .map_err(|e| scrape_error(&scene.id, stage, e))?;

    for (key, value) in parse_metadata_rows(&html) {
        scene.fields.insert(key, value);
    }
    Ok(())
}

async fn fill_download_options(
    session: &Session,
    config: &JobConfig,
    scene: &mut SceneRecord,
) -> Result<(), Error> {
    let stage = ScrapeStage::DownloadOptions;
    let response = session
        .client()
        .get(config.download_options_url(&scene.id))
        .header("X-Requested-With", "XMLHttpRequest")
        .send()
        .await
        .map_err(|e| scrape_error(&scene.id, stage, e))?;
    let html = response
        .text()
        .await
        .map_err(|e| scrape_error(&scene.id, stage, e))?;

    for option in parse_download_options(&html) {
        scene.products.insert(option.label, option.url);
    }
    Ok(())
}

fn scrape_error(scene_id: &str, stage: ScrapeStage, reason: impl ToString) -> Error {
    Error::Scrape {
        scene_id: scene_id.to_string(),
        stage,
        reason: reason.to_string(),
    }
}

/// A metadata row is a `tr` whose first `td` wraps an `a` (the field name)
/// followed by a `td` holding the value. Anything else is decoration.
pub(crate) fn parse_metadata_rows(html: &str) -> Vec<(String, String)> {
    let document = Html::parse_document(html);
    let rows = Selector::parse("tr").expect("Selector pattern should always compile");
    let cells = Selector::parse("td").expect("Selector pattern should always compile");
    let links = Selector::parse("a").expect("Selector pattern should always compile");

    let mut pairs = Vec::new();
    for row in document.select(&rows) {
        let mut tds = row.select(&cells);
        let (Some(first), Some(second)) = (tds.next(), tds.next()) else {
            continue;
        };
        let Some(link) = first.select(&links).next() else {
            continue;
        };

        let key = link.text().collect::<String>().trim().to_string();
        if key.is_empty() {
            continue;
        }
        let value = second.text().collect::<String>().trim().to_string();
        pairs.push((key, value));
    }
    pairs
}

/// Each option is an `input` whose `onclick` carries the download URL.
/// Disabled options are logged and dropped; the label sits in the element
/// right after the input (html5ever parses `input` as void, so the label
/// `div` lands as a sibling, not a child).
pub(crate) fn parse_download_options(html: &str) -> Vec<ProductOption> {
    let document = Html::parse_document(html);
    let inputs =
        Selector::parse("input[onclick]").expect("Selector pattern should always compile");

    let mut options = Vec::new();
    for input in document.select(&inputs) {
        let onclick = input.value().attr("onclick").unwrap_or_default();
        let Some(url) = extract_onclick_url(onclick) else {
            warn!(onclick, "download option with unrecognized onclick shape");
            continue;
        };

        if input.value().attr("disabled").is_some() {
            warn!(url = %url, "skipping disabled download option");
            continue;
        }

        let Some(label) = option_label(input) else {
            warn!(url = %url, "download option without a label");
            continue;
        };

        options.push(ProductOption { label, url });
    }
    options
}

fn option_label(input: ElementRef) -> Option<String> {
    let sibling = input.next_siblings().filter_map(ElementRef::wrap).next()?;
    let label = sibling.text().collect::<String>().trim().to_string();
    if label.is_empty() {
        return None;
    }
    Some(label)
}

/// Recover the raw URL from an inline `onclick="window.location='<url>'"`
/// handler. Returns None for any other handler shape.
pub(crate) fn extract_onclick_url(onclick: &str) -> Option<String> {
    let rest = onclick.trim().strip_prefix("window.location=")?;
    let rest = rest.trim().trim_end_matches(';').trim();

    let url = rest
        .strip_prefix('\'')
        .and_then(|r| r.strip_suffix('\''))
        .or_else(|| rest.strip_prefix('"').and_then(|r| r.strip_suffix('"')))
        .unwrap_or(rest);

    if url.is_empty() {
        return None;
    }
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const METADATA_TABLE: &str = r##"
        <table class="metadataTable">
            <tr><th>Attribute</th><th>Value</th></tr>
            <tr><td><a href="#">Landsat Scene Identifier</a></td><td>LC81700212015231LGN00</td></tr>
            <tr><td><a href="#">WRS Path</a></td><td>170</td></tr>
            <tr><td><a href="#">WRS Row</a></td><td>021</td></tr>
            <tr><td><a href="#">Date Acquired</a></td><td>2015/08/19</td></tr>
            <tr><td><a href="#">Land Cloud Cover</a></td><td>3.37</td></tr>
            <tr><td colspan="2">Decorative separator</td></tr>
        </table>
    "##;

    #[test]
    fn test_parse_metadata_rows() {
        let pairs = parse_metadata_rows(METADATA_TABLE);

        assert_eq!(pairs.len(), 5);
        assert_eq!(
            pairs[0],
            (
                "Landsat Scene Identifier".to_string(),
                "LC81700212015231LGN00".to_string()
            )
        );
        assert_eq!(pairs[3], ("Date Acquired".to_string(), "2015/08/19".to_string()));
        assert_eq!(pairs[4], ("Land Cloud Cover".to_string(), "3.37".to_string()));
    }

    #[test]
    fn test_parse_metadata_rows_all_malformed() {
        let pairs = parse_metadata_rows("<table><tr><th>no cells</th></tr><tr></tr></table>");
        assert_eq!(pairs.len(), 0);
    }

    const DOWNLOAD_OPTIONS: &str = r#"
        <div class="optionContainer">
            <input type="button" onclick="window.location='https://earthexplorer.usgs.gov/download/4923/LC81700212015231LGN00/STANDARD/EE'">
            <div>Level 1 GeoTIFF Data Product (912.5 MB)</div>

            <input type="button" onclick="window.location='https://earthexplorer.usgs.gov/download/4923/LC81700212015231LGN00/FR_REFL/EE'" disabled>
            <div>LandsatLook Images with Geographic Reference</div>

            <input type="button" onclick="window.location='https://earthexplorer.usgs.gov/download/4923/LC81700212015231LGN00/FR_BUND/EE'">
            <div> LandsatLook Natural Color Image (7.9 MB) </div>
        </div>
    "#;

    #[test]
    fn test_parse_download_options_skips_disabled() {
        let options = parse_download_options(DOWNLOAD_OPTIONS);

        assert_eq!(options.len(), 2);
        assert_eq!(
            options[0],
            ProductOption {
                label: "Level 1 GeoTIFF Data Product (912.5 MB)".to_string(),
                url: "https://earthexplorer.usgs.gov/download/4923/LC81700212015231LGN00/STANDARD/EE"
                    .to_string(),
            }
        );
        // Labels are trimmed.
        assert_eq!(options[1].label, "LandsatLook Natural Color Image (7.9 MB)");
        assert_eq!(
            options[1].url,
            "https://earthexplorer.usgs.gov/download/4923/LC81700212015231LGN00/FR_BUND/EE"
        );
    }

    #[test]
    fn test_parse_download_options_ignores_plain_inputs() {
        let options = parse_download_options(
            r#"<input type="submit" onclick="return confirm('sure?')"><div>Submit</div>"#,
        );
        assert_eq!(options.len(), 0);
    }

    #[test]
    fn test_extract_onclick_url_single_quotes() {
        assert_eq!(
            extract_onclick_url("window.location='https://example.com/download/1'"),
            Some("https://example.com/download/1".to_string())
        );
    }

    #[test]
    fn test_extract_onclick_url_double_quotes_and_semicolon() {
        assert_eq!(
            extract_onclick_url(r#"window.location="https://example.com/download/2";"#),
            Some("https://example.com/download/2".to_string())
        );
    }

    #[test]
    fn test_extract_onclick_url_unquoted() {
        assert_eq!(
            extract_onclick_url("window.location=https://example.com/download/3"),
            Some("https://example.com/download/3".to_string())
        );
    }

    #[test]
    fn test_extract_onclick_url_rejects_other_handlers() {
        assert_eq!(extract_onclick_url("return confirm('sure?')"), None);
        assert_eq!(extract_onclick_url("window.open('https://example.com')"), None);
        assert_eq!(extract_onclick_url(""), None);
        assert_eq!(extract_onclick_url("window.location=''"), None);
    }
}
