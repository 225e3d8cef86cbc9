//! VK API client.
//!
//! Provides access to the VK methods the bot needs:
//! - Sending messages and uploading voice messages
//! - Long poll server discovery
//! - User profiles and unread conversations

use std::num::NonZeroU32;
use std::path::Path;
use std::sync::Arc;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{multipart, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};
use url::Url;

use crate::config::VkConfig;
use crate::error::{Error, Result};

/// Long poll session parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongPollServer {
    pub server: String,
    pub key: String,
    pub ts: String,
}

/// Profile returned by `users.get`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VkUserInfo {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// 1 female, 2 male, 0 unknown.
    #[serde(default)]
    pub sex: Option<i64>,
}

/// Last message of an unread conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadConversation {
    pub peer_id: i64,
    pub text: String,
    pub date: i64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error_code: i64,
    #[serde(default)]
    error_msg: String,
}

/// Service for VK API operations.
#[derive(Clone)]
pub struct VkApiService {
    client: Client,
    token: String,
    base_url: String,
    api_version: String,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl VkApiService {
    /// Create a new VK API service.
    pub fn new(cfg: &VkConfig, token: impl Into<String>) -> Result<Self> {
        let base_url = Url::parse(&cfg.api_base_url).map_err(|e| {
            Error::Config(format!("Invalid VK API base URL {}: {}", cfg.api_base_url, e))
        })?;

        let client = Client::builder()
            .timeout(cfg.request_timeout)
            .user_agent("voicebot/1.0")
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        let per_second = NonZeroU32::new(cfg.rate_limit).unwrap_or(NonZeroU32::MIN);
        let limiter = RateLimiter::direct(Quota::per_second(per_second));

        Ok(Self {
            client,
            token: token.into(),
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            api_version: cfg.api_version.clone(),
            limiter: Arc::new(limiter),
        })
    }

    /// HTTP client shared with the long poll service.
    pub fn http_client(&self) -> &Client {
        &self.client
    }

    /// Call an API method and return its `response` value.
    pub async fn api_request(&self, method: &str, params: Vec<(&str, String)>) -> Result<Value> {
        self.limiter.until_ready().await;

        let mut form = params;
        form.push(("access_token", self.token.clone()));
        form.push(("v", self.api_version.clone()));

        let url = format!("{}/{}", self.base_url, method);
        debug!(method, "VK API request");

        let response = self.client.post(&url).form(&form).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Vk(format!("{} returned {}: {}", method, status, text)));
        }

        let mut body: Value = response
            .json()
            .await
            .map_err(|e| Error::Vk(format!("Failed to parse {} response: {}", method, e)))?;

        if let Some(err) = body.get("error") {
            let err: ApiErrorBody = serde_json::from_value(err.clone())?;
            error!(method, code = err.error_code, message = %err.error_msg, "VK API error");
            return Err(Error::VkApi {
                code: err.error_code,
                message: err.error_msg,
            });
        }

        Ok(body
            .get_mut("response")
            .map(Value::take)
            .unwrap_or_else(|| Value::Object(Default::default())))
    }

    /// Send a text message, optionally with an attachment.
    pub async fn send_message(&self, user_id: i64, text: &str, attachment: Option<&str>) -> Result<()> {
        let mut params = vec![
            ("user_id", user_id.to_string()),
            ("message", text.to_string()),
            ("random_id", rand::random::<i32>().to_string()),
        ];
        if let Some(attachment) = attachment {
            params.push(("attachment", attachment.to_string()));
        }

        self.api_request("messages.send", params).await?;
        info!(user_id, "Message sent");
        Ok(())
    }

    /// Upload an audio file as a voice message and return the attachment string.
    pub async fn upload_audio_message(&self, path: &Path, peer_id: i64) -> Result<String> {
        let server = self
            .api_request(
                "docs.getMessagesUploadServer",
                vec![
                    ("type", "audio_message".to_string()),
                    ("peer_id", peer_id.to_string()),
                ],
            )
            .await?;
        let upload_url = server
            .get("upload_url")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Vk("Upload server response has no upload_url".into()))?;

        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "voice.wav".to_string());
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/wav")?;
        let form = multipart::Form::new().part("file", part);

        let uploaded: Value = self
            .client
            .post(upload_url)
            .multipart(form)
            .send()
            .await?
            .json()
            .await?;
        let file = uploaded
            .get("file")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::Vk(format!(
                    "Upload failed: {}",
                    uploaded.get("error").unwrap_or(&uploaded)
                ))
            })?;

        let saved = self
            .api_request("docs.save", vec![("file", file.to_string())])
            .await?;
        let doc = saved
            .get("audio_message")
            .ok_or_else(|| Error::Vk("docs.save response has no audio_message".into()))?;
        let owner_id = doc.get("owner_id").and_then(Value::as_i64);
        let doc_id = doc.get("id").and_then(Value::as_i64);

        match (owner_id, doc_id) {
            (Some(owner_id), Some(doc_id)) => {
                debug!(peer_id, owner_id, doc_id, "Voice message uploaded");
                Ok(format!("doc{}_{}", owner_id, doc_id))
            }
            _ => Err(Error::Vk("docs.save response is missing document ids".into())),
        }
    }

    /// Get long poll server parameters.
    ///
    /// Community tokens use `groups.getLongPollServer`, user tokens
    /// `messages.getLongPollServer`.
    pub async fn get_long_poll_server(&self, group_id: Option<i64>) -> Result<LongPollServer> {
        let result = match group_id {
            Some(group_id) => {
                self.api_request(
                    "groups.getLongPollServer",
                    vec![("group_id", group_id.to_string())],
                )
                .await?
            }
            None => self.api_request("messages.getLongPollServer", vec![]).await?,
        };

        let field = |name: &str| {
            result
                .get(name)
                .and_then(value_to_string)
                .ok_or_else(|| Error::Vk(format!("Long poll server response has no {}", name)))
        };
        let server = LongPollServer {
            server: field("server")?,
            key: field("key")?,
            ts: field("ts")?,
        };

        info!(server = %server.server, "Long poll server received");
        Ok(server)
    }

    /// Get profiles for the given users.
    pub async fn get_user_info(&self, user_ids: &[i64]) -> Result<Vec<VkUserInfo>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = user_ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let result = self
            .api_request(
                "users.get",
                vec![("user_ids", ids), ("fields", "sex".to_string())],
            )
            .await?;

        match result {
            Value::Array(_) => Ok(serde_json::from_value(result)?),
            _ => Ok(Vec::new()),
        }
    }

    /// Get unread conversations with a non-empty last message, newest first.
    pub async fn get_unread_conversations(&self, count: usize) -> Result<Vec<UnreadConversation>> {
        let result = self
            .api_request(
                "messages.getConversations",
                vec![
                    ("filter", "unread".to_string()),
                    ("count", count.to_string()),
                    ("extended", "0".to_string()),
                ],
            )
            .await?;

        let mut conversations: Vec<UnreadConversation> = result
            .get("items")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(parse_conversation).collect())
            .unwrap_or_default();

        conversations.sort_by(|a, b| b.date.cmp(&a.date));
        conversations.truncate(count);
        Ok(conversations)
    }
}

fn parse_conversation(item: &Value) -> Option<UnreadConversation> {
    let peer_id = item
        .pointer("/conversation/peer/id")
        .and_then(Value::as_i64)
        .filter(|id| *id != 0)?;
    let last = item.get("last_message")?;
    let text = last.get("text").and_then(Value::as_str)?.trim();
    if text.is_empty() {
        return None;
    }

    Some(UnreadConversation {
        peer_id,
        text: text.to_string(),
        date: last.get("date").and_then(Value::as_i64).unwrap_or(0),
    })
}

/// VK returns `ts` as a number or a string depending on the method.
pub(crate) fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_conversation() {
        let item = json!({
            "conversation": {"peer": {"id": 42, "type": "user"}},
            "last_message": {"text": "  привет  ", "date": 1700000000}
        });
        assert_eq!(
            parse_conversation(&item),
            Some(UnreadConversation {
                peer_id: 42,
                text: "привет".into(),
                date: 1700000000,
            })
        );
    }

    #[test]
    fn test_parse_conversation_skips_incomplete() {
        let no_peer = json!({"conversation": {}, "last_message": {"text": "a"}});
        let empty_text = json!({
            "conversation": {"peer": {"id": 1}},
            "last_message": {"text": "   "}
        });
        assert_eq!(parse_conversation(&no_peer), None);
        assert_eq!(parse_conversation(&empty_text), None);
    }

    #[test]
    fn test_value_to_string() {
        assert_eq!(value_to_string(&json!(123)), Some("123".into()));
        assert_eq!(value_to_string(&json!("45")), Some("45".into()));
        assert_eq!(value_to_string(&json!(null)), None);
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let cfg = VkConfig {
            token: None,
            group_id: None,
            api_version: "5.131".into(),
            api_base_url: "not a url".into(),
            rate_limit: 20,
            request_timeout: std::time::Duration::from_secs(5),
        };
        assert!(matches!(VkApiService::new(&cfg, "t"), Err(Error::Config(_))));
    }

    #[test]
    fn test_user_info_without_sex() {
        let info: VkUserInfo =
            serde_json::from_value(json!({"id": 1, "first_name": "A", "last_name": "B"})).unwrap();
        assert_eq!(info.sex, None);
    }
}
