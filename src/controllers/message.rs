//! Handling of regular user messages.

use metrics::counter;
use tracing::{error, info, warn};

use crate::controllers::replies;
use crate::db::{self, DbPool};
use crate::error::Result;
use crate::models::Message;
use crate::services::{VkApiService, VoiceService};

/// Turns user messages into voice replies.
#[derive(Clone)]
pub struct MessageController {
    db: DbPool,
    vk: VkApiService,
    voice: VoiceService,
}

impl MessageController {
    pub fn new(db: DbPool, vk: VkApiService, voice: VoiceService) -> Self {
        Self { db, vk, voice }
    }

    /// Register an unknown sender using their VK profile.
    async fn ensure_user_exists(&self, user_id: i64) -> Result<()> {
        if db::get_user_by_vk_id(&self.db, user_id).await?.is_some() {
            return Ok(());
        }

        let profiles = self.vk.get_user_info(&[user_id]).await?;
        let Some(profile) = profiles.into_iter().next() else {
            warn!(user_id, "No VK profile returned for user");
            return Ok(());
        };

        let first_name = if profile.first_name.is_empty() {
            "Неизвестно"
        } else {
            profile.first_name.as_str()
        };
        db::add_user(
            &self.db,
            user_id,
            first_name,
            &profile.last_name,
            Some(profile.sex.unwrap_or(0)),
        )
        .await?;
        counter!("voicebot_users_registered_total").increment(1);
        Ok(())
    }

    /// Handle one incoming message.
    pub async fn handle_message(&self, message: &Message) -> Result<()> {
        info!(user_id = message.user_id, text = %message.text, "Message received");

        if let Err(e) = self.ensure_user_exists(message.user_id).await {
            error!(user_id = message.user_id, error = %e, "Failed to register user");
        }

        if db::is_user_blocked(&self.db, message.user_id).await? {
            info!(user_id = message.user_id, "Ignoring message from blocked user");
            return Ok(());
        }

        if let Some(command) = message.command() {
            return self.handle_command(message, command).await;
        }

        if message.text.trim().is_empty() {
            return self.vk.send_message(message.user_id, replies::EMPTY_TEXT, None).await;
        }

        match self.send_voice(message).await {
            Ok(()) => {
                counter!("voicebot_voice_messages_total", "result" => "ok").increment(1);
                info!(user_id = message.user_id, "Voice message sent");
                Ok(())
            }
            Err(e) => {
                counter!("voicebot_voice_messages_total", "result" => "error").increment(1);
                error!(
                    user_id = message.user_id,
                    error = %e,
                    code = e.error_code(),
                    "Failed to generate voice message"
                );
                self.vk
                    .send_message(message.user_id, &replies::generation_error(&e.to_string()), None)
                    .await
            }
        }
    }

    async fn send_voice(&self, message: &Message) -> Result<()> {
        let audio = self.voice.generate_voice_message(&message.text).await?;

        // Removed when `file` goes out of scope, on success or failure
        let file = self.voice.save_audio_to_temp_file(&audio)?;
        let attachment = self
            .vk
            .upload_audio_message(file.path(), message.peer_id)
            .await?;

        self.vk
            .send_message(message.user_id, "", Some(&attachment))
            .await
    }

    async fn handle_command(&self, message: &Message, command: &str) -> Result<()> {
        let reply = match command {
            "start" => replies::WELCOME.to_string(),
            "help" => replies::HELP.to_string(),
            other => {
                warn!(user_id = message.user_id, command = other, "Unknown command");
                replies::unknown_command(other)
            }
        };
        self.vk.send_message(message.user_id, &reply, None).await
    }
}
