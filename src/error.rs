use reqwest::StatusCode;
use thiserror::Error;

/// Which per-scene scrape request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeStage {
    Metadata,
    DownloadOptions,
}

impl std::fmt::Display for ScrapeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScrapeStage::Metadata => write!(f, "metadata"),
            ScrapeStage::DownloadOptions => write!(f, "download options"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("authentication failed: login responded with {status}, expected a 302 redirect")]
    Authentication { status: StatusCode },

    #[error("unexpected response from the catalog: {0}")]
    Protocol(String),

    #[error("search matched {count} scenes, more than the cap of {limit}; narrow the search criteria")]
    ResultSetTooLarge { count: u64, limit: u64 },

    #[error("scrape failed for scene {scene_id} ({stage}): {reason}")]
    Scrape {
        scene_id: String,
        stage: ScrapeStage,
        reason: String,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
