mod common;

use anyhow::Result;
use reqwest::StatusCode;

use common::{json_body, TestServer};

#[tokio::test]
async fn health_reports_ok() -> Result<()> {
    let server = TestServer::start().await?;

    let (status, body) = json_body(server.client.get(server.url("/api/health")).send().await?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "OK");
    assert_eq!(body["database"], "ok");
    assert_eq!(body["backend"], "memory");
    Ok(())
}

#[tokio::test]
async fn test_db_succeeds_on_memory_backend() -> Result<()> {
    let server = TestServer::start().await?;

    let (status, body) = json_body(server.client.get(server.url("/api/test-db")).send().await?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    Ok(())
}

#[tokio::test]
async fn unknown_api_endpoint_is_404_envelope() -> Result<()> {
    let server = TestServer::start().await?;

    let (status, body) = json_body(server.client.get(server.url("/api/does-not-exist")).send().await?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "API endpoint not found");
    Ok(())
}

#[tokio::test]
async fn cors_mirrors_request_origin() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server
        .client
        .get(server.url("/api/health"))
        .header("Origin", "http://localhost:5173")
        .send()
        .await?;
    assert_eq!(
        res.headers().get("access-control-allow-origin").map(|v| v.to_str().unwrap()),
        Some("http://localhost:5173")
    );
    Ok(())
}
