//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use voicebot::config::{
    BotConfig, Config, DatabaseConfig, LongPollConfig, TelemetryConfig, VkConfig, VoiceConfig,
};
use voicebot::db::{self, DbPool};
use voicebot::services::wav::PcmWav;
use voicebot::services::{SpeechEngine, VkApiService, VoiceService};
use voicebot::{AppState, Result};

/// Configuration pointing the VK client at a mock server.
pub fn test_config(vk_base_url: &str, temp_dir: &Path) -> Config {
    Config {
        vk: VkConfig {
            token: Some("test-token".into()),
            group_id: Some(777),
            api_version: "5.131".into(),
            api_base_url: vk_base_url.into(),
            rate_limit: 1000,
            request_timeout: Duration::from_secs(5),
        },
        long_poll: LongPollConfig {
            wait: 1,
            timeout: Duration::from_secs(2),
        },
        database: DatabaseConfig {
            path: ":memory:".into(),
            first_admin_vk_id: None,
        },
        voice: VoiceConfig {
            temp_dir: temp_dir.to_path_buf(),
            ..VoiceConfig::default()
        },
        bot: BotConfig {
            error_backoff: Duration::from_millis(50),
            process_unread_on_start: false,
        },
        telemetry: TelemetryConfig {
            metrics_addr: None,
            json_logs: false,
        },
    }
}

/// Initialize an in-memory database with the schema applied.
pub async fn setup_test_db() -> DbPool {
    let pool = db::init_pool(":memory:").await.unwrap();
    db::initialize_schema(&pool).await.unwrap();
    pool
}

/// Engine producing a short 16 kHz tone regardless of the text.
pub struct ToneEngine;

#[async_trait]
impl SpeechEngine for ToneEngine {
    fn name(&self) -> &'static str {
        "tone"
    }

    async fn synthesize(&self, _text: &str, out_wav: &Path) -> Result<()> {
        let samples = (0..1600).map(|i| ((i % 32) as i16 - 16) * 200).collect();
        let wav = PcmWav {
            sample_rate: 16000,
            channels: 1,
            samples,
        };
        tokio::fs::write(out_wav, wav.to_bytes()).await?;
        Ok(())
    }
}

/// Application state wired to a mock VK server and the tone engine.
pub async fn test_state(server: &MockServer, temp_dir: &Path) -> AppState {
    let config = test_config(&server.uri(), temp_dir);
    let db = setup_test_db().await;
    let vk = VkApiService::new(&config.vk, "test-token").unwrap();
    let voice = VoiceService::new(Arc::new(ToneEngine), config.voice.clone());
    AppState::with_services(&config, db, vk, voice)
}

/// Mount a VK method answering with `response`.
pub async fn mock_method(server: &MockServer, name: &str, response: Value) {
    Mock::given(method("POST"))
        .and(path(format!("/{}", name)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": response })))
        .mount(server)
        .await;
}

/// Decode a form-encoded request body.
pub fn form(request: &Request) -> HashMap<String, String> {
    url::form_urlencoded::parse(&request.body)
        .into_owned()
        .collect()
}

/// Form bodies of all requests made to a VK method.
pub async fn calls(server: &MockServer, name: &str) -> Vec<HashMap<String, String>> {
    let wanted = format!("/{}", name);
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == wanted)
        .map(form)
        .collect()
}
