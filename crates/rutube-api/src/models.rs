use serde::Deserialize;

/// `play/options` response; only the fields the downloader needs.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PlayOptions {
    #[serde(default)]
    pub title: String,
    pub video_balancer: VideoBalancer,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct VideoBalancer {
    pub m3u8: String,
}

/// One page of `metainfo/tv/{id}/video/`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FeedPage {
    #[serde(default)]
    pub has_next: bool,
    pub next: Option<String>,
    #[serde(default)]
    pub results: Vec<FeedResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FeedResult {
    #[serde(default)]
    pub title: String,
    pub video_url: String,
    #[serde(default)]
    pub episode: Option<u32>,
    #[serde(default)]
    pub feed_name: Option<String>,
}

/// What the downloader needs to fetch one video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    pub manifest_url: String,
}

/// One entry of a feed, in listing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    /// 0 when the feed does not number its episodes.
    pub episode: u32,
    pub title: String,
    pub video_url: String,
    pub feed_name: String,
}

impl From<FeedResult> for FeedItem {
    fn from(result: FeedResult) -> Self {
        Self {
            episode: result.episode.unwrap_or(0),
            title: result.title,
            video_url: result.video_url,
            feed_name: result.feed_name.unwrap_or_default(),
        }
    }
}
