//! VK long poll client.
//!
//! Keeps the session (server, key, ts) between requests and reconnects
//! when VK reports that the key expired or the history was lost.

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::LongPollConfig;
use crate::error::{Error, Result};
use crate::models::VkUpdate;
use crate::services::vk_api::{value_to_string, LongPollServer, VkApiService};

/// Long poll session and request loop.
pub struct LongPollService {
    vk: VkApiService,
    group_id: Option<i64>,
    cfg: LongPollConfig,
    session: Mutex<Option<LongPollServer>>,
}

impl LongPollService {
    pub fn new(vk: VkApiService, group_id: Option<i64>, cfg: LongPollConfig) -> Self {
        Self {
            vk,
            group_id,
            cfg,
            session: Mutex::new(None),
        }
    }

    /// Fetch a fresh long poll session.
    pub async fn connect(&self) -> Result<()> {
        let server = self.vk.get_long_poll_server(self.group_id).await?;
        info!(server = %server.server, "Long poll connected");
        *self.session.lock().await = Some(server);
        Ok(())
    }

    /// Current `ts`, if connected.
    pub async fn ts(&self) -> Option<String> {
        self.session.lock().await.as_ref().map(|s| s.ts.clone())
    }

    /// Wait for the next batch of updates.
    pub async fn get_updates(&self) -> Result<Vec<VkUpdate>> {
        if self.session.lock().await.is_none() {
            self.connect().await?;
        }

        let session = match self.session.lock().await.clone() {
            Some(session) => session,
            None => return Err(Error::Internal("Long poll session missing".into())),
        };

        let url = server_url(&session.server);
        let wait = self.cfg.wait.to_string();
        let response = self
            .vk
            .http_client()
            .get(&url)
            .query(&[
                ("act", "a_check"),
                ("key", session.key.as_str()),
                ("ts", session.ts.as_str()),
                ("wait", wait.as_str()),
            ])
            .timeout(self.cfg.timeout)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                debug!("Long poll request timed out");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if let Some(failed) = body.get("failed") {
            return self.handle_failure(failed.as_i64(), &body).await;
        }

        if let Some(ts) = body.get("ts").and_then(value_to_string) {
            self.set_ts(ts).await;
        }

        let updates: Vec<VkUpdate> = body
            .get("updates")
            .and_then(Value::as_array)
            .map(|raw| {
                raw.iter()
                    .cloned()
                    .filter_map(VkUpdate::from_value)
                    .collect()
            })
            .unwrap_or_default();

        if !updates.is_empty() {
            debug!(count = updates.len(), "Long poll updates received");
        }
        Ok(updates)
    }

    async fn handle_failure(&self, failed: Option<i64>, body: &Value) -> Result<Vec<VkUpdate>> {
        match failed {
            Some(1) => {
                // History is outdated; continue from the ts VK hands back
                match body.get("ts").and_then(value_to_string) {
                    Some(ts) => self.set_ts(ts).await,
                    None => self.connect().await?,
                }
                Ok(Vec::new())
            }
            Some(2) | Some(3) => {
                warn!(failed = ?failed, "Long poll session expired, reconnecting");
                self.connect().await?;
                Ok(Vec::new())
            }
            _ => Err(Error::Vk(format!("Long poll failed: {}", body))),
        }
    }

    async fn set_ts(&self, ts: String) {
        if let Some(session) = self.session.lock().await.as_mut() {
            session.ts = ts;
        }
    }
}

/// Community servers come with a scheme, user servers without.
fn server_url(server: &str) -> String {
    if server.starts_with("http://") || server.starts_with("https://") {
        server.to_string()
    } else {
        format!("https://{}", server)
    }
}
