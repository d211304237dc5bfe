// Manifest model: flat segment lists, multi-variant lists and the quality predicate
// that picks between variants.

use std::fmt;
use std::str::FromStr;

use m3u8_rs::{Playlist, parse_playlist_res};
use url::Url;

use crate::error::VodError;

/// Label reported for manifests that carry no variant information.
pub const UNKNOWN_QUALITY: &str = "unknown";

/// Predicate over variant quality labels (e.g. `1920x1080`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QualityPredicate {
    /// Label must equal the string exactly.
    Exact(String),
    /// Label must start with the string, e.g. `1920x` for a resolution family.
    Prefix(String),
    /// Any variant qualifies; the first usable one wins.
    Any,
}

impl QualityPredicate {
    pub fn matches(&self, label: &str) -> bool {
        match self {
            QualityPredicate::Exact(expected) => label == expected,
            QualityPredicate::Prefix(prefix) => label.starts_with(prefix.as_str()),
            QualityPredicate::Any => true,
        }
    }

    /// Label reported when nothing matched.
    pub fn label(&self) -> &str {
        match self {
            QualityPredicate::Exact(label) | QualityPredicate::Prefix(label) => label,
            QualityPredicate::Any => "any",
        }
    }
}

impl Default for QualityPredicate {
    fn default() -> Self {
        QualityPredicate::Prefix("1920x".to_string())
    }
}

impl fmt::Display for QualityPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityPredicate::Exact(label) => write!(f, "={label}"),
            QualityPredicate::Prefix(prefix) => f.write_str(prefix),
            QualityPredicate::Any => f.write_str("*"),
        }
    }
}

/// Parses `*` (any), `=LABEL` (exact) or `PREFIX`.
impl FromStr for QualityPredicate {
    type Err = VodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(VodError::configuration("quality predicate must not be empty"));
        }
        if s == "*" {
            return Ok(QualityPredicate::Any);
        }
        match s.strip_prefix('=') {
            Some("") => Err(VodError::configuration("exact quality label must not be empty")),
            Some(exact) => Ok(QualityPredicate::Exact(exact.to_string())),
            None => Ok(QualityPredicate::Prefix(s.to_string())),
        }
    }
}

/// One quality-labelled alternative of a multi-variant manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub quality: String,
    /// Sub-manifest URI as written in the document (may be relative).
    pub uri: String,
}

/// A parsed manifest document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Manifest {
    /// Segment-level manifest; URIs in playback order.
    Flat { segments: Vec<String> },
    /// Variant list in document order.
    MultiVariant { variants: Vec<Variant> },
}

impl Manifest {
    /// Parses raw manifest bytes. `url` is used for error context only.
    pub fn parse(url: &str, bytes: &[u8]) -> Result<Self, VodError> {
        match parse_playlist_res(bytes) {
            Ok(Playlist::MediaPlaylist(pl)) => Ok(Manifest::Flat {
                segments: pl.segments.into_iter().map(|s| s.uri).collect(),
            }),
            Ok(Playlist::MasterPlaylist(pl)) => Ok(Manifest::MultiVariant {
                variants: pl
                    .variants
                    .into_iter()
                    .filter(|v| !v.is_i_frame)
                    .map(|v| Variant {
                        quality: v
                            .resolution
                            .map(|r| format!("{}x{}", r.width, r.height))
                            .unwrap_or_default(),
                        uri: v.uri,
                    })
                    .collect(),
            }),
            Err(e) => Err(VodError::unknown_manifest(url, e)),
        }
    }
}

/// Resolves a manifest-relative URI against the manifest's own location.
///
/// Relative URIs land next to the manifest (its path up to the last `/`);
/// absolute URIs are returned unchanged.
pub fn resolve_uri(manifest_url: &Url, uri: &str) -> Result<Url, VodError> {
    manifest_url
        .join(uri.trim())
        .map_err(|e| VodError::invalid_url(uri, e))
}
