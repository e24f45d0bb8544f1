use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use futures_util::TryStreamExt;
use tempfile::{Builder, TempPath};
use tracing::{debug, info};

use crate::config::JobConfig;
use crate::credentials::Credentials;
use crate::error::Error;
use crate::scene::SceneRecord;
use crate::session::Session;
use crate::util;

/// How a single scene download attempt ended. Missing product options and
/// corrupt archives are expected occasional outcomes, not errors; the
/// caller decides whether to retry.
#[derive(Debug, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// Archive downloaded and verified; `downloaded` was set on the scene.
    Complete(PathBuf),
    /// Archive was already on disk; nothing was fetched or re-verified.
    AlreadyPresent(PathBuf),
    /// No product option label matched the configured filter.
    NoMatchingProduct,
    /// The archive failed verification and was removed from disk.
    FailedIntegrity,
}

/// Fetch the scene's configured product archive into
/// `result_dir/<id>.tar.gz`. Re-runs are idempotent: an existing target
/// short-circuits before any network traffic.
pub async fn download_scene(
    scene: &mut SceneRecord,
    creds: &Credentials,
    config: &JobConfig,
) -> Result<DownloadOutcome, Error> {
    let target = config.result_dir.join(format!("{}.tar.gz", scene.id));
    if target.is_file() {
        return Ok(DownloadOutcome::AlreadyPresent(target));
    }

    let Some(url) = scene.product_url_containing(&config.product_filter) else {
        return Ok(DownloadOutcome::NoMatchingProduct);
    };
    let url = url.to_string();

    let streamed = fetch_archive(&url, creds, config, &target).await;
    finish_download(streamed, scene, target)
}

/// Decide the fate of whatever the stream attempt left at `target`. This
/// runs even when the stream failed partway: the partial file has already
/// been moved into place, and it must not survive to be mistaken for a
/// finished archive on the next run.
fn finish_download(
    streamed: Result<(), Error>,
    scene: &mut SceneRecord,
    target: PathBuf,
) -> Result<DownloadOutcome, Error> {
    // A partial download can still carry a decodable leading block, so a
    // failed stream is never intact no matter what the checker says.
    let intact = streamed.is_ok() && util::check_archive_fast(&target);
    if !intact {
        util::silent_remove(&target);
    }
    streamed?;

    if intact {
        scene.downloaded = true;
        Ok(DownloadOutcome::Complete(target))
    } else {
        Ok(DownloadOutcome::FailedIntegrity)
    }
}

/// Stream the archive to a temp file, then move it into place. The move
/// runs even when the stream failed partway, so a partial file never
/// lingers in the temp directory; the integrity check decides its fate.
async fn fetch_archive(
    url: &str,
    creds: &Credentials,
    config: &JobConfig,
    target: &Path,
) -> Result<(), Error> {
    // Downloads may run long after enumeration; a fresh login avoids
    // depending on the scrape-phase session still being valid.
    let session = Session::new()?;
    session.authenticate(&config.auth_url, creds).await?;

    let tmp = Builder::new()
        .prefix("scene-")
        .suffix(".tar.gz")
        .tempfile_in(&config.tmp_dir)?;
    let (file, tmp_path) = tmp.into_parts();

    let streamed = stream_to_file(&session, url, file).await;
    let moved = persist(tmp_path, target);
    streamed?;
    moved
}

async fn stream_to_file(session: &Session, url: &str, mut file: File) -> Result<(), Error> {
    let response = session.client().get(url).send().await?;
    if !response.status().is_success() {
        return Err(Error::Protocol(format!(
            "download responded with {}",
            response.status()
        )));
    }

    let mut stream = response.bytes_stream();
    let mut byte_count = 0_u64;
    while let Some(bytes) = stream.try_next().await? {
        file.write_all(&bytes)?;
        byte_count += bytes.len() as u64;
    }
    file.flush()?;

    debug!(byte_count, "archive stream finished");
    Ok(())
}

fn persist(tmp_path: TempPath, target: &Path) -> Result<(), Error> {
    tmp_path.persist(target).map_err(|e| Error::Io(e.error))?;
    info!(target = %target.display(), "moved archive into result directory");
    Ok(())
}
