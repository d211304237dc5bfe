// Manifest Resolver: manifest URL -> ordered absolute segment addresses + quality label.

use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use crate::error::VodError;
use crate::fetcher::Fetch;
use crate::manifest::{Manifest, QualityPredicate, UNKNOWN_QUALITY, Variant, resolve_uri};

/// Outcome of resolving a manifest URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedManifest {
    /// The root document was already segment-level.
    Flat { segments: Vec<Url> },
    /// A variant of a multi-variant manifest was selected and resolved.
    Variant { quality: String, segments: Vec<Url> },
    /// No variant matched, or every matching one was unusable.
    Unmatched { quality: String },
}

impl ResolvedManifest {
    /// Segment addresses in playback order.
    pub fn segments(&self) -> &[Url] {
        match self {
            ResolvedManifest::Flat { segments } | ResolvedManifest::Variant { segments, .. } => {
                segments
            }
            ResolvedManifest::Unmatched { .. } => &[],
        }
    }

    pub fn quality(&self) -> &str {
        match self {
            ResolvedManifest::Flat { .. } => UNKNOWN_QUALITY,
            ResolvedManifest::Variant { quality, .. }
            | ResolvedManifest::Unmatched { quality } => quality,
        }
    }

    pub fn into_segments(self) -> Vec<Url> {
        match self {
            ResolvedManifest::Flat { segments } | ResolvedManifest::Variant { segments, .. } => {
                segments
            }
            ResolvedManifest::Unmatched { .. } => Vec::new(),
        }
    }
}

pub struct ManifestResolver {
    fetcher: Arc<dyn Fetch>,
    quality: QualityPredicate,
}

impl ManifestResolver {
    pub fn new(fetcher: Arc<dyn Fetch>, quality: QualityPredicate) -> Self {
        Self { fetcher, quality }
    }

    /// Fetches and parses `manifest_url`, walking into the first usable
    /// variant that satisfies the quality predicate.
    ///
    /// Never fails just because no variant matched: that case yields
    /// [`ResolvedManifest::Unmatched`] with an empty segment list.
    pub async fn resolve(&self, manifest_url: &Url) -> Result<ResolvedManifest, VodError> {
        let bytes = self.fetcher.fetch(manifest_url).await.map_err(|e| {
            if e.is_cancelled() {
                e
            } else {
                VodError::manifest_fetch(manifest_url.as_str(), e)
            }
        })?;

        match Manifest::parse(manifest_url.as_str(), &bytes)? {
            Manifest::Flat { segments } => {
                let segments = absolutize(manifest_url, &segments)?;
                debug!(url = %manifest_url, segments = segments.len(), "Flat manifest");
                Ok(ResolvedManifest::Flat { segments })
            }
            Manifest::MultiVariant { variants } => self.select_variant(manifest_url, &variants).await,
        }
    }

    async fn select_variant(
        &self,
        manifest_url: &Url,
        variants: &[Variant],
    ) -> Result<ResolvedManifest, VodError> {
        for variant in variants.iter().filter(|v| self.quality.matches(&v.quality)) {
            match self.load_variant(manifest_url, variant).await {
                Ok(segments) => {
                    info!(
                        quality = %variant.quality,
                        segments = segments.len(),
                        "Selected variant"
                    );
                    return Ok(ResolvedManifest::Variant {
                        quality: variant.quality.clone(),
                        segments,
                    });
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    warn!(
                        quality = %variant.quality,
                        uri = %variant.uri,
                        error = %e,
                        "Variant unavailable, trying next one"
                    );
                }
            }
        }

        warn!(
            url = %manifest_url,
            quality = %self.quality,
            variants = variants.len(),
            "No usable variant matched"
        );
        Ok(ResolvedManifest::Unmatched {
            quality: self.quality.label().to_string(),
        })
    }

    /// Fetches a variant's sub-manifest; it must be a non-empty flat manifest.
    async fn load_variant(&self, manifest_url: &Url, variant: &Variant) -> Result<Vec<Url>, VodError> {
        let sub_url = resolve_uri(manifest_url, &variant.uri)?;
        let bytes = self.fetcher.fetch(&sub_url).await?;
        match Manifest::parse(sub_url.as_str(), &bytes)? {
            Manifest::Flat { segments } if segments.is_empty() => Err(
                VodError::unknown_manifest(sub_url.as_str(), "sub-manifest has no segments"),
            ),
            // Segment URIs are relative to the sub-manifest, never the root manifest.
            Manifest::Flat { segments } => absolutize(&sub_url, &segments),
            Manifest::MultiVariant { .. } => Err(VodError::unknown_manifest(
                sub_url.as_str(),
                "expected a segment-level sub-manifest, got a variant list",
            )),
        }
    }
}

fn absolutize(base: &Url, uris: &[String]) -> Result<Vec<Url>, VodError> {
    uris.iter().map(|uri| resolve_uri(base, uri)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Serves canned documents; missing URLs fail like an exhausted fetch.
    #[derive(Default)]
    struct CannedFetcher {
        documents: HashMap<String, String>,
        requested: Mutex<Vec<String>>,
    }

    impl CannedFetcher {
        fn with(mut self, url: &str, body: &str) -> Self {
            self.documents.insert(url.to_string(), body.to_string());
            self
        }
    }

    #[async_trait]
    impl Fetch for CannedFetcher {
        async fn fetch(&self, url: &Url) -> Result<Bytes, VodError> {
            self.requested.lock().push(url.to_string());
            self.documents
                .get(url.as_str())
                .map(|body| Bytes::from(body.clone()))
                .ok_or_else(|| VodError::FetchExhausted {
                    url: url.to_string(),
                    attempts: 1,
                    last_error: crate::error::AttemptError::Status(
                        reqwest::StatusCode::NOT_FOUND,
                    ),
                })
        }
    }

    const MASTER: &str = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360
360/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=5000000,RESOLUTION=1920x1080
1080/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=2500000,RESOLUTION=1280x720
720/index.m3u8
";

    fn media(segments: &[&str]) -> String {
        let mut doc = String::from("#EXTM3U\n#EXT-X-TARGETDURATION:10\n");
        for s in segments {
            doc.push_str("#EXTINF:10.0,\n");
            doc.push_str(s);
            doc.push('\n');
        }
        doc.push_str("#EXT-X-ENDLIST\n");
        doc
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn prefix(p: &str) -> QualityPredicate {
        QualityPredicate::Prefix(p.to_string())
    }

    #[tokio::test]
    async fn selects_matching_variant_even_when_not_first() {
        let fetcher = CannedFetcher::default()
            .with("http://h/v/master.m3u8", MASTER)
            .with("http://h/v/360/index.m3u8", &media(&["a.ts"]))
            .with("http://h/v/1080/index.m3u8", &media(&["s1.ts", "s2.ts"]))
            .with("http://h/v/720/index.m3u8", &media(&["b.ts"]));
        let fetcher = Arc::new(fetcher);
        let resolver = ManifestResolver::new(fetcher.clone(), prefix("1920x"));

        let resolved = resolver.resolve(&url("http://h/v/master.m3u8")).await.unwrap();

        assert_eq!(resolved.quality(), "1920x1080");
        assert_eq!(
            resolved.segments(),
            [url("http://h/v/1080/s1.ts"), url("http://h/v/1080/s2.ts")]
        );
        let requested = fetcher.requested.lock().clone();
        assert_eq!(
            requested,
            ["http://h/v/master.m3u8", "http://h/v/1080/index.m3u8"]
        );
    }

    #[tokio::test]
    async fn falls_through_to_next_matching_variant_when_one_is_unavailable() {
        let master = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=5000000,RESOLUTION=1920x1080
broken/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=4000000,RESOLUTION=1920x800
ok/index.m3u8
";
        let fetcher = CannedFetcher::default()
            .with("http://h/master.m3u8", master)
            .with("http://h/ok/index.m3u8", &media(&["1.ts"]));
        let resolver = ManifestResolver::new(Arc::new(fetcher), prefix("1920x"));

        let resolved = resolver.resolve(&url("http://h/master.m3u8")).await.unwrap();

        assert_eq!(resolved.quality(), "1920x800");
        assert_eq!(resolved.segments(), [url("http://h/ok/1.ts")]);
    }

    #[tokio::test]
    async fn no_matching_variant_yields_empty_list_with_predicate_label() {
        let fetcher = CannedFetcher::default().with("http://h/master.m3u8", MASTER);
        let resolver = ManifestResolver::new(Arc::new(fetcher), prefix("3840x"));

        let resolved = resolver.resolve(&url("http://h/master.m3u8")).await.unwrap();

        assert_eq!(
            resolved,
            ResolvedManifest::Unmatched {
                quality: "3840x".to_string()
            }
        );
        assert!(resolved.segments().is_empty());
    }

    #[tokio::test]
    async fn flat_manifest_reports_unknown_quality() {
        let fetcher = CannedFetcher::default().with("http://h/a/index.m3u8", &media(&["1.ts", "2.ts"]));
        let resolver = ManifestResolver::new(Arc::new(fetcher), prefix("1920x"));

        let resolved = resolver.resolve(&url("http://h/a/index.m3u8")).await.unwrap();

        assert_eq!(resolved.quality(), UNKNOWN_QUALITY);
        assert_eq!(
            resolved.into_segments(),
            vec![url("http://h/a/1.ts"), url("http://h/a/2.ts")]
        );
    }

    #[tokio::test]
    async fn nested_variant_list_is_skipped() {
        let master = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=5000000,RESOLUTION=1920x1080
nested.m3u8
";
        let fetcher = CannedFetcher::default()
            .with("http://h/master.m3u8", master)
            .with("http://h/nested.m3u8", MASTER);
        let resolver = ManifestResolver::new(Arc::new(fetcher), prefix("1920x"));

        let resolved = resolver.resolve(&url("http://h/master.m3u8")).await.unwrap();
        assert!(matches!(resolved, ResolvedManifest::Unmatched { .. }));
    }

    #[tokio::test]
    async fn root_fetch_failure_is_manifest_fetch_error() {
        let resolver = ManifestResolver::new(Arc::new(CannedFetcher::default()), prefix("1920x"));
        let err = resolver.resolve(&url("http://h/missing.m3u8")).await.unwrap_err();
        assert!(matches!(err, VodError::ManifestFetch { .. }));
    }

    #[tokio::test]
    async fn unparseable_root_is_unknown_manifest_type() {
        let fetcher = CannedFetcher::default().with("http://h/x.m3u8", "{\"json\": true}");
        let resolver = ManifestResolver::new(Arc::new(fetcher), prefix("1920x"));
        let err = resolver.resolve(&url("http://h/x.m3u8")).await.unwrap_err();
        assert!(matches!(err, VodError::UnknownManifestType { .. }));
    }
}
