mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::Harness;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let h = Harness::new();
    let (status, body) = h.get("/health", None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn root_describes_the_service() -> Result<()> {
    let h = Harness::new();
    let (status, body) = h.get("/", None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Maury Portal API");
    assert!(body["data"]["endpoints"].is_object());
    Ok(())
}

#[tokio::test]
async fn first_ping_of_the_day_succeeds() -> Result<()> {
    let h = Harness::new();
    let (status, body) = h.get("/api/ping", None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "Pinged today");
    Ok(())
}

#[tokio::test]
async fn repeat_ping_on_the_same_day_is_rejected() -> Result<()> {
    let h = Harness::new();
    let (first, _) = h.get("/api/ping", None).await?;
    assert_eq!(first, StatusCode::OK);

    let (second, body) = h.get("/api/ping", None).await?;
    assert_eq!(second, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["message"], "Already pinged today");
    Ok(())
}

#[tokio::test]
async fn ping_accepts_post_too() -> Result<()> {
    let h = Harness::new();
    let (status, body) = h.post("/api/ping", None, None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "Pinged today");
    Ok(())
}

#[tokio::test]
async fn ping_store_failure_is_a_server_error() -> Result<()> {
    let h = Harness::new();
    h.platform.set_fail_ping_store(true);

    let (status, body) = h.get("/api/ping", None).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Failed to record ping");
    Ok(())
}
