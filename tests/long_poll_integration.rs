//! Integration tests for the long poll session handling.

mod common;

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{calls, mock_method, test_config};
use voicebot::models::VkUpdate;
use voicebot::services::{LongPollService, VkApiService};

async fn long_poll(server: &MockServer, timeout: Duration) -> LongPollService {
    let dir = std::env::temp_dir();
    let mut config = test_config(&server.uri(), &dir);
    config.long_poll.timeout = timeout;
    let vk = VkApiService::new(&config.vk, "test-token").unwrap();

    mock_method(
        server,
        "groups.getLongPollServer",
        json!({ "server": format!("{}/lp", server.uri()), "key": "secret", "ts": "10" }),
    )
    .await;

    LongPollService::new(vk, config.vk.group_id, config.long_poll)
}

#[tokio::test]
async fn test_updates_are_parsed_and_ts_advances() {
    let server = MockServer::start().await;
    let lp = long_poll(&server, Duration::from_secs(2)).await;

    Mock::given(method("GET"))
        .and(path("/lp"))
        .and(query_param("act", "a_check"))
        .and(query_param("key", "secret"))
        .and(query_param("ts", "10"))
        .and(query_param("wait", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ts": "11",
            "updates": [
                [4, 500, 1, 42, 1700000000, "привет"],
                [],
                { "type": "message_new", "object": { "message": { "from_id": 43, "text": "hi", "id": 9 } } }
            ]
        })))
        .mount(&server)
        .await;

    let updates = lp.get_updates().await.unwrap();
    assert_eq!(updates.len(), 2);
    assert!(matches!(updates[0], VkUpdate::Legacy { code: 4, .. }));
    assert_eq!(updates[1].extract_message().unwrap().user_id, 43);
    assert_eq!(lp.ts().await.as_deref(), Some("11"));
}

#[tokio::test]
async fn test_outdated_history_adopts_new_ts() {
    let server = MockServer::start().await;
    let lp = long_poll(&server, Duration::from_secs(2)).await;

    Mock::given(method("GET"))
        .and(path("/lp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "failed": 1, "ts": 30 })))
        .mount(&server)
        .await;

    assert!(lp.get_updates().await.unwrap().is_empty());
    assert_eq!(lp.ts().await.as_deref(), Some("30"));
    assert_eq!(calls(&server, "groups.getLongPollServer").await.len(), 1);
}

#[tokio::test]
async fn test_expired_key_reconnects() {
    let server = MockServer::start().await;
    let lp = long_poll(&server, Duration::from_secs(2)).await;

    Mock::given(method("GET"))
        .and(path("/lp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "failed": 2 })))
        .mount(&server)
        .await;

    assert!(lp.get_updates().await.unwrap().is_empty());
    // Lazy connect plus the reconnect
    assert_eq!(calls(&server, "groups.getLongPollServer").await.len(), 2);
}

#[tokio::test]
async fn test_unknown_failure_is_an_error() {
    let server = MockServer::start().await;
    let lp = long_poll(&server, Duration::from_secs(2)).await;

    Mock::given(method("GET"))
        .and(path("/lp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "failed": 4 })))
        .mount(&server)
        .await;

    assert!(lp.get_updates().await.is_err());
}

#[tokio::test]
async fn test_timeout_yields_no_updates() {
    let server = MockServer::start().await;
    let lp = long_poll(&server, Duration::from_millis(200)).await;

    Mock::given(method("GET"))
        .and(path("/lp"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "ts": "99", "updates": [] }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    assert!(lp.get_updates().await.unwrap().is_empty());
    assert_eq!(lp.ts().await.as_deref(), Some("10"));
}
