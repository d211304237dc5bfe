//! Feed and single-video runs against a stub API and CDN.

use std::time::Duration;

use http_stub::{Route, StubServer};
use rutube_api::RutubeClient;
use rutube_dl::{AppError, BatchRunner, BatchSummary};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use vodl_engine::{QualityPredicate, VodConfig, VodDownloader, build_client};

const MASTER: &str = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=800000,RESOLUTION=640x360
360/index.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=5000000,RESOLUTION=1920x1080
1080/index.m3u8
";

fn media(count: usize) -> String {
    let mut doc = String::from("#EXTM3U\n#EXT-X-TARGETDURATION:4\n");
    for i in 0..count {
        doc.push_str(&format!("#EXTINF:4.0,\nseg{i}.ts\n"));
    }
    doc.push_str("#EXT-X-ENDLIST\n");
    doc
}

/// Registers play options and a two-segment 1080p stream for `id`.
fn serve_video(server: &StubServer, id: &str, title: &str) -> Vec<u8> {
    server.route(
        &format!("/api/play/options/{id}/"),
        Route::ok(format!(
            r#"{{"title":"{title}","video_balancer":{{"m3u8":"{}"}}}}"#,
            server.url(&format!("/cdn/{id}/master.m3u8"))
        )),
    );
    server.route(&format!("/cdn/{id}/master.m3u8"), Route::ok(MASTER));
    server.route(&format!("/cdn/{id}/1080/index.m3u8"), Route::ok(media(2)));
    let mut expected = Vec::new();
    for i in 0..2 {
        let body = format!("{id}:{i};");
        server.route(&format!("/cdn/{id}/1080/seg{i}.ts"), Route::ok(body.clone()));
        expected.extend(body.into_bytes());
    }
    expected
}

fn feed_entry(episode: u32, id: &str) -> String {
    format!(
        r#"{{"title":"Ep {episode}","episode":{episode},"video_url":"https://rutube.ru/video/{id}/","feed_name":"Show"}}"#
    )
}

struct Fixture {
    server: StubServer,
    scratch: TempDir,
    out: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            server: StubServer::start(),
            scratch: tempfile::tempdir().unwrap(),
            out: tempfile::tempdir().unwrap(),
        }
    }

    fn runner(&self, token: CancellationToken) -> BatchRunner {
        let config = VodConfig {
            timeout: Duration::from_secs(5),
            max_attempts: 2,
            retry_delay: Duration::from_millis(10),
            output_dir: self.scratch.path().to_path_buf(),
            worker_count: 2,
            quality: QualityPredicate::Prefix("1920x".to_string()),
            ..Default::default()
        };
        let api = RutubeClient::with_base_url(build_client(&config).unwrap(), self.server.base());
        let downloader = VodDownloader::new(config, token.clone()).unwrap();
        BatchRunner::new(api, downloader, self.out.path().to_path_buf(), token)
    }
}

#[tokio::test]
async fn single_link_is_saved_under_its_title() {
    let fx = Fixture::new();
    let expected = serve_video(&fx.server, "abc123", "Pilot: part 1");

    let artifact = fx
        .runner(CancellationToken::new())
        .download_link("https://rutube.ru/video/abc123/")
        .await
        .unwrap();

    assert_eq!(artifact.path, fx.out.path().join("Pilot_ part 1.mp4"));
    assert_eq!(std::fs::read(&artifact.path).unwrap(), expected);
    assert!(!fx.scratch.path().join("abc123").exists());
}

#[tokio::test]
async fn link_without_video_id_is_rejected_before_any_request() {
    let fx = Fixture::new();

    let err = fx
        .runner(CancellationToken::new())
        .download_link("https://rutube.ru/channel/1/")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Api(_)));
}

#[tokio::test]
async fn feed_skips_early_episodes_and_survives_a_failed_video() {
    let fx = Fixture::new();
    serve_video(&fx.server, "ep1", "Ep 1");
    let second = serve_video(&fx.server, "ep2", "Ep 2");
    // ep3 has no play options: its metadata lookup fails with 404
    fx.server.route(
        "/api/metainfo/tv/42/video/",
        Route::ok(format!(
            r#"{{"has_next":false,"next":null,"results":[{},{},{}]}}"#,
            feed_entry(1, "ep1"),
            feed_entry(2, "ep2"),
            feed_entry(3, "ep3"),
        )),
    );

    let summary = fx
        .runner(CancellationToken::new())
        .download_feed("42", 2)
        .await
        .unwrap();

    assert_eq!(
        summary,
        BatchSummary {
            succeeded: 1,
            failed: 1,
            skipped: 1
        }
    );
    assert_eq!(summary.attempted(), 2);
    assert_eq!(fx.server.hits("/api/play/options/ep1/"), 0);
    assert_eq!(
        std::fs::read(fx.out.path().join("Ep 2.mp4")).unwrap(),
        second
    );
    assert!(!fx.out.path().join("Ep 1.mp4").exists());
}

#[tokio::test]
async fn feed_listing_failure_aborts() {
    let fx = Fixture::new();

    let err = fx
        .runner(CancellationToken::new())
        .download_feed("404", 1)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Api(_)));
}

#[tokio::test]
async fn cancelled_run_stops_before_the_next_episode() {
    let fx = Fixture::new();
    serve_video(&fx.server, "ep1", "Ep 1");
    fx.server.route(
        "/api/metainfo/tv/7/video/",
        Route::ok(format!(
            r#"{{"has_next":false,"next":null,"results":[{}]}}"#,
            feed_entry(1, "ep1")
        )),
    );
    let token = CancellationToken::new();
    token.cancel();

    let err = fx.runner(token).download_feed("7", 1).await.unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(fx.server.hits("/api/play/options/ep1/"), 0);
}
