use auto_reel::music::{MusicLibrary, MusicTrack};
use auto_reel::VideoError;
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn track(server: &MockServer, id: &str, file: &str) -> MusicTrack {
    MusicTrack {
        id: id.to_string(),
        name: "Test Tune".to_string(),
        description: "for tests".to_string(),
        url: format!("{}/{}", server.uri(), file),
        duration: "0:03".to_string(),
        mood: "calm".to_string(),
        attribution: "Test Composer CC0".to_string(),
    }
}

#[tokio::test]
async fn second_request_uses_the_cache() {
    let server = MockServer::start().await;
    let body = vec![0x49, 0x44, 0x33, 0x04, 0x00, 0x01, 0x02, 0x03];
    Mock::given(method("GET"))
        .and(path("/tune.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let library = MusicLibrary::new(dir.path(), vec![track(&server, "tune", "tune.mp3")]).unwrap();

    let first = library.track_path("tune").await.unwrap();
    let second = library.track_path("tune").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first, dir.path().join("tune.mp3"));
    assert_eq!(std::fs::read(&first).unwrap(), body);
    assert!(!dir.path().join("tune.mp3.part").exists());
}

#[tokio::test]
async fn http_errors_leave_no_file_behind() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone.mp3"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let library = MusicLibrary::new(dir.path(), vec![track(&server, "gone", "gone.mp3")]).unwrap();

    let err = library.track_path("gone").await.unwrap_err();
    assert!(matches!(err, VideoError::Api(_)));
    assert!(!dir.path().join("gone.mp3").exists());
}

#[tokio::test]
async fn download_all_reports_each_track() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken.mp3"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let library = MusicLibrary::new(
        dir.path(),
        vec![track(&server, "ok", "ok.mp3"), track(&server, "broken", "broken.mp3")],
    )
    .unwrap();

    let results = library.download_all().await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0], ("ok".to_string(), Some(dir.path().join("ok.mp3"))));
    assert_eq!(results[1], ("broken".to_string(), None));
    assert_eq!(
        library.attribution("ok"),
        "Music: Test Tune by Test Composer CC0"
    );
}
