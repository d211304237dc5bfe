use std::path::PathBuf;

use clap::{ArgGroup, Parser};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "rutube-dl",
    version,
    about = "Download rutube videos and playlists",
    long_about = "Downloads a single video (--file-link) or every episode of a feed \
                  (--list-id). Segments are fetched in parallel and merged into \
                  `<title>.mp4` in the current directory."
)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["list_id", "file_link"])
))]
pub struct Args {
    /// ID of the feed to download
    #[arg(long, alias = "list_id", value_name = "ID")]
    pub list_id: Option<String>,

    /// Page URL of a single video, e.g. https://rutube.ru/video/<id>/
    #[arg(long, alias = "file_link", value_name = "URL")]
    pub file_link: Option<String>,

    /// Directory for temporary segment files [default: downloads]
    #[arg(short, long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Number of concurrent segment downloads; be careful above 5 [default: 1]
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Merge segments with ffmpeg instead of plain concatenation
    #[arg(long, alias = "with_ffmpeg")]
    pub with_ffmpeg: bool,

    /// ffmpeg binary used with --with-ffmpeg [default: ffmpeg]
    #[arg(long, value_name = "PATH")]
    pub ffmpeg_path: Option<PathBuf>,

    /// Skip feed entries whose episode number is lower than this
    #[arg(long, alias = "from_episode", default_value_t = 1, requires = "list_id")]
    pub from_episode: u32,

    /// Variant label prefix, `=LABEL` for an exact match or `*` for any [default: 1920x]
    #[arg(short, long)]
    pub quality: Option<String>,

    /// Per-request timeout in seconds [default: 60]
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Attempts per request, first one included [default: 3]
    #[arg(long)]
    pub retries: Option<u32>,

    /// Pause between attempts in milliseconds [default: 2000]
    #[arg(long, value_name = "MS")]
    pub retry_delay: Option<u64>,

    /// Config file [default: <config dir>/rutube-dl/config.toml]
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Errors only
    #[arg(long)]
    pub quiet: bool,
}
