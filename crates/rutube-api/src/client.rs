use std::sync::LazyLock;

use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};
use url::Url;

use crate::error::ApiError;
use crate::models::{FeedItem, FeedPage, PlayOptions, VideoMetadata};

pub const DEFAULT_BASE_URL: &str = "https://rutube.ru";

static VIDEO_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"video/([\w\d]+)").unwrap());

/// Pulls the video id out of a `.../video/<id>/` page URL.
pub fn extract_video_id(link: &str) -> Result<String, ApiError> {
    VIDEO_ID_RE
        .captures(link)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ApiError::invalid_url(link, "no video id in URL"))
}

#[derive(Debug, Clone)]
pub struct RutubeClient {
    client: Client,
    base_url: String,
}

impl RutubeClient {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL)
    }

    /// Points the client at another host, e.g. a local stub.
    pub fn with_base_url(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let raw = format!("{}/{path}", self.base_url);
        Url::parse(&raw).map_err(|e| ApiError::invalid_url(raw, e))
    }

    /// Title and master manifest URL of one video.
    #[instrument(skip(self))]
    pub async fn video_metadata(&self, video_id: &str) -> Result<VideoMetadata, ApiError> {
        let mut url = self.endpoint(&format!("api/play/options/{video_id}/"))?;
        url.query_pairs_mut()
            .append_pair("no_404", "true")
            .append_pair("referer", "https://rutube.ru")
            .append_pair("pver", "v2");

        let options: PlayOptions = self.get_json(url).await?;
        debug!(title = %options.title, "Fetched play options");
        Ok(VideoMetadata {
            id: video_id.to_string(),
            title: options.title,
            manifest_url: options.video_balancer.m3u8,
        })
    }

    /// Every item of a feed, following pagination to the last page.
    ///
    /// A failure on any page fails the whole listing.
    #[instrument(skip(self))]
    pub async fn feed_items(&self, feed_id: &str) -> Result<Vec<FeedItem>, ApiError> {
        let mut url = self.endpoint(&format!("api/metainfo/tv/{feed_id}/video/"))?;
        let mut items = Vec::new();
        let mut pages = 0usize;

        loop {
            let page: FeedPage = self.get_json(url.clone()).await?;
            pages += 1;
            items.extend(page.results.into_iter().map(FeedItem::from));

            match page.next {
                Some(next) if page.has_next => {
                    url = url.join(&next).map_err(|e| ApiError::invalid_url(next, e))?;
                }
                _ => break,
            }
        }

        info!(pages, items = items.len(), "Feed listed");
        Ok(items)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        debug!(%url, "GET");
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(ApiError::Status {
                url: url.to_string(),
                status,
            });
        }
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_id_from_page_url() {
        assert_eq!(
            extract_video_id("https://rutube.ru/video/7a1b2c3d4e5f/").unwrap(),
            "7a1b2c3d4e5f"
        );
        assert_eq!(
            extract_video_id("https://rutube.ru/video/abc123?t=10").unwrap(),
            "abc123"
        );
    }

    #[test]
    fn rejects_url_without_video_segment() {
        let err = extract_video_id("https://rutube.ru/channel/42/").unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl { .. }));
    }

    #[test]
    fn endpoints_hang_off_the_base_url() {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
        let client = RutubeClient::with_base_url(Client::new(), "http://127.0.0.1:9/");
        assert_eq!(
            client.endpoint("api/metainfo/tv/7/video/").unwrap().as_str(),
            "http://127.0.0.1:9/api/metainfo/tv/7/video/"
        );
    }

    #[test]
    fn unparseable_base_url_surfaces_on_first_request() {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
        let client = RutubeClient::with_base_url(Client::new(), "not a url");
        assert!(matches!(
            client.endpoint("api/play/options/x/"),
            Err(ApiError::InvalidUrl { .. })
        ));
    }
}
