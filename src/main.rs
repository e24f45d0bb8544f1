use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ee_grab::config::{job_template, JobConfig};
use ee_grab::credentials::Credentials;
use ee_grab::criteria::apply_search;
use ee_grab::download::{download_scene, DownloadOutcome};
use ee_grab::results::enumerate_scenes;
use ee_grab::scrape::enrich_scene;
use ee_grab::session::Session;

#[derive(Parser, Debug)]
#[command(about = "Fetch Landsat scene archives from USGS EarthExplorer")]
struct Args {
    /// Path to the job configuration TOML.
    #[arg(default_value = "./inputs/job.toml")]
    config: PathBuf,

    /// Print the embedded configuration template and exit.
    #[arg(long)]
    print_template: bool,

    /// Enumerate and enrich scenes but do not download archives.
    #[arg(long)]
    skip_download: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if args.print_template {
        println!("{}", job_template());
        return Ok(());
    }

    let config = JobConfig::read(&args.config)?;
    let creds = Credentials::from_env()?;

    fs::create_dir_all(&config.result_dir)?;
    fs::create_dir_all(&config.tmp_dir)?;

    let session = Session::new()?;
    session.authenticate(&config.auth_url, &creds).await?;
    apply_search(&session, &config, &config.search).await?;

    let scenes = enumerate_scenes(&session, &config).await?;
    info!(scenes = scenes.len(), "enumerated result page");

    // One bad scene should not sink the batch.
    let mut enriched = Vec::with_capacity(scenes.len());
    for mut scene in scenes {
        match enrich_scene(&session, &config, &mut scene).await {
            Ok(()) => enriched.push(scene),
            Err(e) => warn!(scene = %scene.id, error = %e, "dropping scene after scrape failure"),
        }
    }

    if args.skip_download {
        for scene in &enriched {
            println!("{}", scene.id);
        }
        return Ok(());
    }

    let mut complete = 0_usize;
    let mut skipped = 0_usize;
    let mut failed = 0_usize;
    for scene in enriched.iter_mut() {
        info!(scene = %scene.id, "processing scene");
        match download_scene(scene, &creds, &config).await {
            Ok(DownloadOutcome::Complete(path)) => {
                info!(path = %path.display(), "downloaded and verified");
                complete += 1;
            }
            Ok(DownloadOutcome::AlreadyPresent(path)) => {
                info!(path = %path.display(), "already on disk, skipping");
                complete += 1;
            }
            Ok(DownloadOutcome::NoMatchingProduct) => {
                warn!(scene = %scene.id, "no product option matched the filter");
                skipped += 1;
            }
            Ok(DownloadOutcome::FailedIntegrity) => {
                warn!(scene = %scene.id, "archive failed verification and was removed");
                failed += 1;
            }
            Err(e) => {
                warn!(scene = %scene.id, error = %e, "download failed");
                failed += 1;
            }
        }
    }
    info!(complete, skipped, failed, "run finished");

    Ok(())
}
