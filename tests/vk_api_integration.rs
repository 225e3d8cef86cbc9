//! Integration tests for the VK API client against a mock server.

mod common;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{calls, mock_method, test_config};
use voicebot::services::{LongPollServer, UnreadConversation, VkApiService};
use voicebot::Error;

async fn client(server: &MockServer) -> VkApiService {
    let dir = std::env::temp_dir();
    let config = test_config(&server.uri(), &dir);
    VkApiService::new(&config.vk, "test-token").unwrap()
}

#[tokio::test]
async fn test_send_message_posts_form() {
    let server = MockServer::start().await;
    mock_method(&server, "messages.send", json!(1)).await;
    let vk = client(&server).await;

    vk.send_message(42, "Привет, мир", Some("doc1_2")).await.unwrap();

    let sent = calls(&server, "messages.send").await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["user_id"], "42");
    assert_eq!(sent[0]["message"], "Привет, мир");
    assert_eq!(sent[0]["attachment"], "doc1_2");
    assert_eq!(sent[0]["access_token"], "test-token");
    assert_eq!(sent[0]["v"], "5.131");
    assert!(sent[0]["random_id"].parse::<i32>().is_ok());
}

#[tokio::test]
async fn test_send_message_without_attachment() {
    let server = MockServer::start().await;
    mock_method(&server, "messages.send", json!(1)).await;
    let vk = client(&server).await;

    vk.send_message(42, "текст", None).await.unwrap();

    let sent = calls(&server, "messages.send").await;
    assert!(!sent[0].contains_key("attachment"));
}

#[tokio::test]
async fn test_api_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages.send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {
                "error_code": 901,
                "error_msg": "Can't send messages for users without permission"
            }
        })))
        .mount(&server)
        .await;
    let vk = client(&server).await;

    let err = vk.send_message(1, "x", None).await.unwrap_err();
    match err {
        Error::VkApi { code, message } => {
            assert_eq!(code, 901);
            assert!(message.contains("permission"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_http_error_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    let vk = client(&server).await;

    let err = vk.api_request("users.get", vec![]).await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_upload_audio_message() {
    let server = MockServer::start().await;
    mock_method(
        &server,
        "docs.getMessagesUploadServer",
        json!({ "upload_url": format!("{}/upload", server.uri()) }),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "file": "uploaded-file" })))
        .expect(1)
        .mount(&server)
        .await;
    mock_method(
        &server,
        "docs.save",
        json!({ "type": "audio_message", "audio_message": { "owner_id": -5, "id": 77 } }),
    )
    .await;
    let vk = client(&server).await;

    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), b"RIFF....WAVE").unwrap();

    let attachment = vk.upload_audio_message(file.path(), 42).await.unwrap();
    assert_eq!(attachment, "doc-5_77");

    let server_calls = calls(&server, "docs.getMessagesUploadServer").await;
    assert_eq!(server_calls[0]["type"], "audio_message");
    assert_eq!(server_calls[0]["peer_id"], "42");
    assert_eq!(calls(&server, "docs.save").await[0]["file"], "uploaded-file");
}

#[tokio::test]
async fn test_upload_failure_is_reported() {
    let server = MockServer::start().await;
    mock_method(
        &server,
        "docs.getMessagesUploadServer",
        json!({ "upload_url": format!("{}/upload", server.uri()) }),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": "bad file" })))
        .mount(&server)
        .await;
    let vk = client(&server).await;

    let file = tempfile::NamedTempFile::new().unwrap();
    let err = vk.upload_audio_message(file.path(), 1).await.unwrap_err();
    assert!(matches!(err, Error::Vk(_)));
    assert!(calls(&server, "docs.save").await.is_empty());
}

#[tokio::test]
async fn test_group_long_poll_server() {
    let server = MockServer::start().await;
    mock_method(
        &server,
        "groups.getLongPollServer",
        json!({ "server": "https://lp.vk.com/wh777", "key": "k", "ts": "100" }),
    )
    .await;
    let vk = client(&server).await;

    let lp = vk.get_long_poll_server(Some(777)).await.unwrap();
    assert_eq!(
        lp,
        LongPollServer {
            server: "https://lp.vk.com/wh777".into(),
            key: "k".into(),
            ts: "100".into(),
        }
    );
    assert_eq!(calls(&server, "groups.getLongPollServer").await[0]["group_id"], "777");
}

#[tokio::test]
async fn test_user_long_poll_server_numeric_ts() {
    let server = MockServer::start().await;
    mock_method(
        &server,
        "messages.getLongPollServer",
        json!({ "server": "im.vk.com/nim1", "key": "k", "ts": 1715 }),
    )
    .await;
    let vk = client(&server).await;

    let lp = vk.get_long_poll_server(None).await.unwrap();
    assert_eq!(lp.ts, "1715");
}

#[tokio::test]
async fn test_get_user_info() {
    let server = MockServer::start().await;
    mock_method(
        &server,
        "users.get",
        json!([
            { "id": 1, "first_name": "Анна", "last_name": "Иванова", "sex": 1 },
            { "id": 2, "first_name": "Олег", "last_name": "Петров" }
        ]),
    )
    .await;
    let vk = client(&server).await;

    let users = vk.get_user_info(&[1, 2]).await.unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].sex, Some(1));
    assert_eq!(users[1].sex, None);

    let sent = calls(&server, "users.get").await;
    assert_eq!(sent[0]["user_ids"], "1,2");
    assert_eq!(sent[0]["fields"], "sex");
}

#[tokio::test]
async fn test_get_user_info_empty_input_skips_request() {
    let server = MockServer::start().await;
    let vk = client(&server).await;

    assert!(vk.get_user_info(&[]).await.unwrap().is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unread_conversations_sorted_and_filtered() {
    let server = MockServer::start().await;
    mock_method(
        &server,
        "messages.getConversations",
        json!({
            "count": 4,
            "items": [
                { "conversation": { "peer": { "id": 1 } }, "last_message": { "text": "старое", "date": 100 } },
                { "conversation": { "peer": { "id": 2 } }, "last_message": { "text": "", "date": 300 } },
                { "conversation": { "peer": { "id": 3 } }, "last_message": { "text": "новое", "date": 200 } },
                { "conversation": {}, "last_message": { "text": "без собеседника", "date": 400 } }
            ]
        }),
    )
    .await;
    let vk = client(&server).await;

    let unread = vk.get_unread_conversations(20).await.unwrap();
    assert_eq!(
        unread,
        vec![
            UnreadConversation { peer_id: 3, text: "новое".into(), date: 200 },
            UnreadConversation { peer_id: 1, text: "старое".into(), date: 100 },
        ]
    );
    assert_eq!(calls(&server, "messages.getConversations").await[0]["filter"], "unread");
}
