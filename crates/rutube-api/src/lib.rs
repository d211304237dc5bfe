//! Thin client for the two rutube endpoints the downloader needs: video
//! play options (title and master manifest) and paged feed listings.

pub mod client;
pub mod error;
mod models;

pub use client::{DEFAULT_BASE_URL, RutubeClient, extract_video_id};
pub use error::ApiError;
pub use models::{FeedItem, VideoMetadata};
