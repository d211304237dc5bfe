//! The API client against a local stub.

use http_stub::{Route, StubServer};
use rutube_api::{ApiError, FeedItem, RutubeClient};

fn client(server: &StubServer) -> RutubeClient {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    RutubeClient::with_base_url(reqwest::Client::new(), server.base())
}

#[tokio::test]
async fn video_metadata_reads_title_and_manifest() {
    let server = StubServer::start();
    server.route(
        "/api/play/options/abc123/",
        Route::ok(
            r#"{"title":"Episode 1","duration":1200,
                "video_balancer":{"default":"x","m3u8":"https://cdn/abc/master.m3u8"}}"#,
        ),
    );

    let meta = client(&server).video_metadata("abc123").await.unwrap();

    assert_eq!(meta.id, "abc123");
    assert_eq!(meta.title, "Episode 1");
    assert_eq!(meta.manifest_url, "https://cdn/abc/master.m3u8");
    assert_eq!(server.hits("/api/play/options/abc123/"), 1);
}

#[tokio::test]
async fn missing_video_is_a_status_error() {
    let server = StubServer::start();

    let err = client(&server).video_metadata("gone").await.unwrap_err();

    match err {
        ApiError::Status { status, .. } => assert_eq!(status.as_u16(), 404),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = StubServer::start();
    server.route("/api/play/options/bad/", Route::ok("<html>nope</html>"));

    let err = client(&server).video_metadata("bad").await.unwrap_err();
    assert!(matches!(err, ApiError::Decode { .. }));
}

fn page(items: &[(u32, &str)], next: Option<String>) -> String {
    let results: Vec<String> = items
        .iter()
        .map(|(episode, id)| {
            format!(
                r#"{{"id":"{id}","title":"Ep {episode}","episode":{episode},
                    "video_url":"https://rutube.ru/video/{id}/","feed_name":"Show"}}"#
            )
        })
        .collect();
    let next = match next {
        Some(url) => format!(r#""{url}""#),
        None => "null".to_string(),
    };
    format!(
        r#"{{"has_next":{},"next":{next},"page":1,"per_page":2,"results":[{}]}}"#,
        next != "null",
        results.join(",")
    )
}

#[tokio::test]
async fn feed_listing_drains_every_page_in_order() {
    let server = StubServer::start();
    let feed = "/api/metainfo/tv/77/video/";
    server.route(
        feed,
        Route::ok(page(&[(1, "a1"), (2, "b2")], Some(server.url("/feed/77/p2")))),
    );
    server.route("/feed/77/p2", Route::ok(page(&[(3, "c3")], Some(server.url("/feed/77/p3")))));
    server.route("/feed/77/p3", Route::ok(page(&[(4, "d4")], None)));

    let items = client(&server).feed_items("77").await.unwrap();

    let episodes: Vec<u32> = items.iter().map(|i| i.episode).collect();
    assert_eq!(episodes, [1, 2, 3, 4]);
    assert_eq!(
        items[2],
        FeedItem {
            episode: 3,
            title: "Ep 3".to_string(),
            video_url: "https://rutube.ru/video/c3/".to_string(),
            feed_name: "Show".to_string(),
        }
    );
    assert_eq!(server.hits(feed), 1);
    assert_eq!(server.hits("/feed/77/p3"), 1);
}

#[tokio::test]
async fn next_link_is_ignored_without_has_next() {
    let server = StubServer::start();
    server.route(
        "/api/metainfo/tv/5/video/",
        Route::ok(format!(
            r#"{{"has_next":false,"next":"{}","results":[]}}"#,
            server.url("/never")
        )),
    );

    let items = client(&server).feed_items("5").await.unwrap();

    assert!(items.is_empty());
    assert_eq!(server.hits("/never"), 0);
}

#[tokio::test]
async fn failing_page_fails_the_whole_listing() {
    let server = StubServer::start();
    server.route(
        "/api/metainfo/tv/9/video/",
        Route::ok(page(&[(1, "a1")], Some(server.url("/feed/9/p2")))),
    );
    server.route("/feed/9/p2", Route::status(502));

    let err = client(&server).feed_items("9").await.unwrap_err();
    assert!(matches!(err, ApiError::Status { .. }));
}
