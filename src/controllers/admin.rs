//! Administrator commands.
//!
//! Commands from administrators are tried here first. Anything that is
//! not an administrator command falls through to the message controller.

use metrics::counter;
use tracing::{error, info, warn};

use crate::controllers::replies;
use crate::db::{self, DbPool};
use crate::error::{Error, Result};
use crate::models::{Message, UserFilter};
use crate::services::VkApiService;

/// Executes administrator commands.
#[derive(Clone)]
pub struct AdminController {
    db: DbPool,
    vk: VkApiService,
}

impl AdminController {
    pub fn new(db: DbPool, vk: VkApiService) -> Self {
        Self { db, vk }
    }

    /// Handle `command` (text after the slash, arguments included).
    ///
    /// Returns false when the sender is not an administrator or the
    /// command is not an administrator command.
    pub async fn handle_command(&self, message: &Message, command: &str) -> Result<bool> {
        if !db::is_admin(&self.db, message.user_id).await? {
            return Ok(false);
        }

        let command = command.trim();
        let (name, args) = match command.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (command, ""),
        };

        match name.to_lowercase().as_str() {
            "block" => self.block(message, args).await?,
            "unblock" => self.unblock(message, args).await?,
            "send" => self.send(message, args).await?,
            "admin" => self.add_admin(message, args).await?,
            "stats" => self.stats(message).await?,
            "broadcast" => self.broadcast(message, args).await?,
            _ => return Ok(false),
        }

        info!(admin = message.user_id, command = name, "Admin command handled");
        Ok(true)
    }

    async fn reply(&self, message: &Message, text: &str) -> Result<()> {
        self.vk.send_message(message.user_id, text, None).await
    }

    async fn display_name(&self, vk_id: i64) -> Result<String> {
        Ok(db::get_user_by_vk_id(&self.db, vk_id)
            .await?
            .map(|u| u.full_name())
            .unwrap_or_else(|| format!("ID {}", vk_id)))
    }

    async fn block(&self, message: &Message, args: &str) -> Result<()> {
        if args.is_empty() {
            return self.reply(message, replies::BLOCK_USAGE).await;
        }
        let Ok(vk_id) = args.parse::<i64>() else {
            return self.reply(message, replies::INVALID_ID).await;
        };

        if vk_id == message.user_id {
            return self.reply(message, replies::CANNOT_BLOCK_SELF).await;
        }
        if db::is_admin(&self.db, vk_id).await? {
            return self.reply(message, replies::CANNOT_BLOCK_ADMIN).await;
        }

        if db::block_user(&self.db, vk_id).await? {
            let name = self.display_name(vk_id).await?;
            self.reply(message, &replies::user_blocked(&name, vk_id)).await
        } else {
            self.reply(message, &replies::user_not_found(vk_id)).await
        }
    }

    async fn unblock(&self, message: &Message, args: &str) -> Result<()> {
        if args.is_empty() {
            return self.reply(message, replies::UNBLOCK_USAGE).await;
        }
        let Ok(vk_id) = args.parse::<i64>() else {
            return self.reply(message, replies::INVALID_ID).await;
        };

        if db::unblock_user(&self.db, vk_id).await? {
            let name = self.display_name(vk_id).await?;
            self.reply(message, &replies::user_unblocked(&name, vk_id)).await
        } else {
            self.reply(message, &replies::user_not_found(vk_id)).await
        }
    }

    async fn send(&self, message: &Message, args: &str) -> Result<()> {
        if args.is_empty() {
            return self.reply(message, replies::SEND_USAGE).await;
        }
        let Some((target, text)) = args.split_once(char::is_whitespace) else {
            return self.reply(message, replies::SEND_MISSING_TEXT).await;
        };
        let Ok(target) = target.parse::<i64>() else {
            return self.reply(message, replies::INVALID_ID).await;
        };

        if let Err(e) = self.vk.send_message(target, text.trim(), None).await {
            error!(target_id = target, error = %e, "Failed to send admin message");
            return self.reply(message, &replies::send_failed(&e.to_string())).await;
        }

        let name = self.display_name(target).await?;
        self.reply(message, &replies::message_sent(&name, target)).await
    }

    async fn add_admin(&self, message: &Message, args: &str) -> Result<()> {
        if args.is_empty() {
            return self.reply(message, replies::ADMIN_USAGE).await;
        }
        let Ok(vk_id) = args.parse::<i64>() else {
            return self.reply(message, replies::INVALID_ID).await;
        };

        if db::is_admin(&self.db, vk_id).await? {
            return self.reply(message, &replies::already_admin(vk_id)).await;
        }

        if let Err(e) = db::add_admin(&self.db, vk_id).await {
            error!(vk_id, error = %e, "Failed to add administrator");
            return self.reply(message, &replies::command_failed(&e.to_string())).await;
        }

        let name = self.display_name(vk_id).await?;
        self.reply(message, &replies::admin_added(&name, vk_id)).await?;

        if let Err(e) = self
            .vk
            .send_message(vk_id, &replies::new_admin_notice(), None)
            .await
        {
            warn!(vk_id, error = %e, "Failed to notify new administrator");
            return self.reply(message, &replies::command_failed(&e.to_string())).await;
        }
        Ok(())
    }

    async fn stats(&self, message: &Message) -> Result<()> {
        let counts = async {
            let stats = db::user_stats(&self.db).await?;
            let admins = db::count_admins(&self.db).await?;
            Ok::<_, Error>((stats, admins))
        };
        let (stats, admins) = match counts.await {
            Ok(counts) => counts,
            Err(e) => {
                error!(error = %e, "Failed to collect statistics");
                return self.reply(message, &replies::stats_failed(&e.to_string())).await;
            }
        };

        let mut text = replies::stats(stats.total, stats.blocked, stats.active(), admins);
        if stats.total > 0 {
            text.push_str(&replies::gender_breakdown(
                stats.male,
                stats.female,
                stats.unknown_gender(),
            ));
        }
        self.reply(message, &text).await
    }

    async fn broadcast(&self, message: &Message, args: &str) -> Result<()> {
        if args.is_empty() {
            return self.reply(message, replies::BROADCAST_USAGE).await;
        }

        let (filter, text) = match parse_broadcast_args(args) {
            Ok(parsed) => parsed,
            Err(token) => return self.reply(message, &replies::invalid_filter(&token)).await,
        };
        if text.is_empty() {
            return self.reply(message, replies::BROADCAST_MISSING_TEXT).await;
        }

        let users = db::list_users(&self.db, &filter).await?;
        if users.is_empty() {
            return self.reply(message, replies::BROADCAST_NO_RECIPIENTS).await;
        }

        let mut sent = 0;
        let mut failed = 0;
        for user in &users {
            match self.vk.send_message(user.vk_id, &text, None).await {
                Ok(()) => {
                    counter!("voicebot_broadcast_deliveries_total", "result" => "ok").increment(1);
                    sent += 1;
                }
                Err(e) => {
                    counter!("voicebot_broadcast_deliveries_total", "result" => "error").increment(1);
                    error!(vk_id = user.vk_id, error = %e, "Broadcast delivery failed");
                    failed += 1;
                }
            }
        }

        info!(sent, failed, ?filter, "Broadcast finished");
        self.reply(message, &replies::broadcast_report(sent, failed, users.len()))
            .await
    }
}

/// Split broadcast arguments into recipient filters and the message text.
///
/// `gender=N` and `blocked=N` tokens may appear anywhere; every other token
/// is part of the text. Returns the offending token for malformed filters.
pub fn parse_broadcast_args(args: &str) -> std::result::Result<(UserFilter, String), String> {
    let mut filter = UserFilter::default();
    let mut words = Vec::new();

    for token in args.split_whitespace() {
        if let Some(value) = token.strip_prefix("gender=") {
            filter.gender = Some(value.parse().map_err(|_| token.to_string())?);
        } else if let Some(value) = token.strip_prefix("blocked=") {
            let value: i64 = value.parse().map_err(|_| token.to_string())?;
            filter.is_blocked = Some(value != 0);
        } else {
            words.push(token);
        }
    }

    Ok((filter, words.join(" ")))
}
