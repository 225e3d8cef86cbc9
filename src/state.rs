//! Application state for the voice bot.
//!
//! Contains the shared services wired together at startup.

use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::controllers::{AdminController, MessageController};
use crate::db::{self, DbPool};
use crate::services::{BotWorker, LongPollService, VkApiService, VoiceService};
use crate::{Error, Result};

/// Application state shared by the bot worker and controllers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: DbPool,
    /// VK API client.
    pub vk: VkApiService,
    /// Speech synthesis service.
    pub voice: VoiceService,
    /// Long poll session.
    pub long_poll: Arc<LongPollService>,
    pub admin: AdminController,
    pub messages: MessageController,
    config: Config,
}

impl AppState {
    /// Create the application state, initializing all services.
    ///
    /// Fails when the bot token is missing, the voice model cannot be found
    /// or the first long poll session cannot be obtained.
    pub async fn new(config: &Config) -> Result<Self> {
        let token = config
            .vk
            .token
            .clone()
            .ok_or_else(|| Error::Config("VK_BOT_TOKEN is not set".into()))?;

        let db = db::init_pool(&config.database.path).await?;
        db::initialize_schema(&db).await?;
        db::health_check(&db).await?;
        if db::ensure_first_admin(&db, config.database.first_admin_vk_id).await? {
            info!("Bootstrap administrator registered");
        }

        tokio::fs::create_dir_all(&config.voice.temp_dir).await?;
        let voice = VoiceService::from_config(&config.voice)?;
        let vk = VkApiService::new(&config.vk, token)?;

        let state = Self::with_services(config, db, vk, voice);
        state.long_poll.connect().await?;

        info!(engine = state.voice.engine_name(), "Application state initialized");
        Ok(state)
    }

    /// Wire controllers around already constructed services.
    pub fn with_services(config: &Config, db: DbPool, vk: VkApiService, voice: VoiceService) -> Self {
        let long_poll = Arc::new(LongPollService::new(
            vk.clone(),
            config.vk.group_id,
            config.long_poll.clone(),
        ));
        let admin = AdminController::new(db.clone(), vk.clone());
        let messages = MessageController::new(db.clone(), vk.clone(), voice.clone());

        Self {
            db,
            vk,
            voice,
            long_poll,
            admin,
            messages,
            config: config.clone(),
        }
    }

    /// Build the long poll worker.
    pub fn worker(&self) -> BotWorker {
        BotWorker::new(
            self.vk.clone(),
            self.long_poll.clone(),
            self.admin.clone(),
            self.messages.clone(),
            self.config.bot.clone(),
        )
    }
}
