use pretty_assertions::assert_eq;
use serde_json::Value;
use slotdesk_api::routes::health::BANNER;

use crate::test_utils::TestContext;

#[tokio::test]
async fn test_root_banner() {
    let server = TestContext::new().server();

    let response = server.get("/").await;

    response.assert_status_ok();
    assert_eq!(response.text(), BANNER);
}

#[tokio::test]
async fn test_health_and_version() {
    let server = TestContext::new().server();

    let health = server.get("/health").await.json::<Value>();
    assert_eq!(health["status"], "ok");

    let version = server.get("/version").await.json::<Value>();
    assert_eq!(version["version"], env!("CARGO_PKG_VERSION"));
}
