//! Upload and duration endpoints.

#![cfg(unix)]

mod common;

use common::{upload, FakeTools, TestHarness};

#[tokio::test]
async fn test_upload_reports_probed_duration() {
    let (_harness, addr) = TestHarness::with_server().await;

    let (status, body) = upload(addr, "clip.mp4", b"fake video").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["duration"], 12.5);
    assert_eq!(body["filename"], "clip.mp4");
}

#[tokio::test]
async fn test_output_duration_after_upload() {
    let (harness, addr) = TestHarness::with_tools(FakeTools {
        duration: "60.0".to_string(),
        ..FakeTools::default()
    })
    .serve()
    .await;

    upload(addr, "clip.mp4", b"fake video").await;

    for (speed, expected) in [(1, 60.0), (4, 15.0), (7, 60.0 / 7.0)] {
        let body: serde_json::Value = reqwest::get(format!("http://{}/duration?speed={}", addr, speed))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["success"], true);
        let got = body["outputDuration"].as_f64().unwrap();
        assert!((got - expected).abs() < 1e-9, "speed {speed}: {got} != {expected}");
    }
    assert_eq!(harness.ctx.service.original_duration(), Some(60.0));
}

#[tokio::test]
async fn test_zero_speed_is_rejected() {
    let (_harness, addr) = TestHarness::with_server().await;
    upload(addr, "clip.mp4", b"fake video").await;

    let resp = reqwest::get(format!("http://{}/duration?speed=0", addr))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid input: speed must be at least 1");
}

#[tokio::test]
async fn test_unparseable_duration_becomes_zero() {
    let (_harness, addr) = TestHarness::with_tools(FakeTools {
        duration: "N/A".to_string(),
        ..FakeTools::default()
    })
    .serve()
    .await;

    let (status, body) = upload(addr, "stream.ts", b"x").await;
    assert_eq!(status, 200);
    assert_eq!(body["duration"], 0.0);
}

#[tokio::test]
async fn test_new_upload_replaces_previous() {
    let (harness, addr) = TestHarness::with_server().await;

    upload(addr, "first.mp4", b"first upload").await;
    let first = harness.staged_uploads();
    assert_eq!(first.len(), 1);

    upload(addr, "second.mp4", b"second upload").await;
    let staged = harness.staged_uploads();
    assert_eq!(staged.len(), 1);
    assert_ne!(staged[0], first[0]);
    assert!(staged[0].to_string_lossy().ends_with("_second.mp4"));
    assert_eq!(std::fs::read(&staged[0]).unwrap(), b"second upload");
}

#[tokio::test]
async fn test_upload_name_cannot_escape_staging() {
    let (harness, addr) = TestHarness::with_server().await;

    let (status, _) = upload(addr, "../../../escape.mp4", b"x").await;
    assert_eq!(status, 200);

    let staged = harness.staged_uploads();
    assert_eq!(staged.len(), 1);
    assert_eq!(staged[0].parent().unwrap(), harness.staging_dir());
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let (_harness, addr) = TestHarness::with_server().await;

    let form = reqwest::multipart::Form::new().text("other", "value");
    let resp = reqwest::Client::new()
        .post(format!("http://{}/upload", addr))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid input: missing multipart field 'file'");
}

#[tokio::test]
async fn test_startup_purges_staging() {
    let dir = tempfile::tempdir().unwrap();
    let staging = dir.path().join("staging");
    std::fs::create_dir_all(&staging).unwrap();
    std::fs::write(staging.join("stale_upload.mp4"), b"old").unwrap();
    std::fs::write(staging.join("preview.mp4"), b"old preview").unwrap();

    let mut config = timelapse::config::Config::default();
    config.app.staging_dir = Some(staging.clone());
    let ctx = timelapse::server::build_context(&config).unwrap();

    assert_eq!(std::fs::read_dir(&staging).unwrap().count(), 0);
    assert!(ctx.service.staging().current_upload().is_none());
}
