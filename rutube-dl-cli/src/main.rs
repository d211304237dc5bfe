use std::process;

use clap::Parser;
use rutube_api::RutubeClient;
use rutube_dl::{AppConfig, AppError, Args, BatchRunner, Result, logging};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use vodl_engine::{VodDownloader, build_client};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logging::init_logging(args.verbose, args.quiet);

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping downloads");
            signal_token.cancel();
        }
    });

    if let Err(e) = run(args, token).await {
        error!("{e}");
        eprintln!("Error: {e}");
        process::exit(if e.is_cancelled() { 130 } else { 1 });
    }
}

async fn run(args: Args, token: CancellationToken) -> Result<()> {
    let mut config = AppConfig::load(args.config.as_deref())?;
    config.apply_args(&args);
    let vod_config = config.vod_config()?;

    let client = build_client(&vod_config)?;
    let api = RutubeClient::with_base_url(client, &config.api_base_url);
    let downloader = VodDownloader::new(vod_config, token.clone())?;
    let runner = BatchRunner::new(api, downloader, config.artifact_dir.clone(), token);

    if let Some(feed_id) = &args.list_id {
        info!(feed_id, from_episode = args.from_episode, "Downloading feed");
        let summary = runner.download_feed(feed_id, args.from_episode).await?;
        if summary.failed > 0 {
            return Err(AppError::BatchFailed {
                failed: summary.failed,
                attempted: summary.attempted(),
            });
        }
    } else if let Some(link) = &args.file_link {
        info!(url = %link, "Downloading video");
        let artifact = runner.download_link(link).await?;
        if artifact.segments == 0 {
            warn!(
                quality = %artifact.quality,
                "No segments for the requested quality, nothing saved"
            );
        } else {
            info!(path = %artifact.path.display(), quality = %artifact.quality, "Done");
        }
    }
    Ok(())
}
