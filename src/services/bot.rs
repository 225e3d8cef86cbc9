//! Bot worker: the long poll loop that dispatches incoming messages.
//!
//! Each cycle waits for updates, routes administrator commands to the
//! admin controller and everything else to the message controller. A
//! failed cycle is logged and followed by a pause before the next one.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::BotConfig;
use crate::controllers::{AdminController, MessageController};
use crate::error::{Error, Result};
use crate::models::{Message, VkUpdate};
use crate::services::{LongPollService, VkApiService};

/// Unread conversations answered at startup.
const UNREAD_BATCH: usize = 20;

/// Peer ids from this value up are group chats.
const CHAT_PEER_OFFSET: i64 = 2_000_000_000;

/// How long `stop` waits for the current cycle before aborting it.
const STOP_GRACE: Duration = Duration::from_secs(2);

/// Long poll worker.
#[derive(Clone)]
pub struct BotWorker {
    inner: Arc<BotWorkerInner>,
}

struct BotWorkerInner {
    vk: VkApiService,
    long_poll: Arc<LongPollService>,
    admin: AdminController,
    messages: MessageController,
    cfg: BotConfig,
    running: RwLock<bool>,
}

impl BotWorker {
    pub fn new(
        vk: VkApiService,
        long_poll: Arc<LongPollService>,
        admin: AdminController,
        messages: MessageController,
        cfg: BotConfig,
    ) -> Self {
        Self {
            inner: Arc::new(BotWorkerInner {
                vk,
                long_poll,
                admin,
                messages,
                cfg,
                running: RwLock::new(false),
            }),
        }
    }

    /// Start the worker loop.
    /// Returns a handle that can be used to stop the worker.
    pub async fn start(&self) -> BotWorkerHandle {
        *self.inner.running.write().await = true;

        let worker = self.clone();
        let handle = tokio::spawn(async move {
            if worker.inner.cfg.process_unread_on_start {
                if let Err(e) = worker.answer_unread().await {
                    warn!(error = %e, "Failed to process unread conversations");
                }
            }
            worker.run_loop().await;
        });

        info!("Bot worker started");

        BotWorkerHandle {
            worker: self.clone(),
            handle,
        }
    }

    pub async fn is_running(&self) -> bool {
        *self.inner.running.read().await
    }

    /// Signal the loop to stop after the current cycle.
    pub async fn stop(&self) {
        *self.inner.running.write().await = false;
        info!("Bot worker stop requested");
    }

    async fn run_loop(&self) {
        loop {
            if !self.is_running().await {
                info!("Bot worker stopping");
                break;
            }

            if let Err(e) = self.poll_once().await {
                if e.is_transient() {
                    warn!(error = %e, "Poll cycle failed");
                } else {
                    error!(error = %e, code = e.error_code(), "Poll cycle failed");
                }
                counter!("voicebot_poll_errors_total").increment(1);
                sleep(self.inner.cfg.error_backoff).await;
            }
        }
    }

    /// Fetch one batch of updates and handle each of them.
    pub async fn poll_once(&self) -> Result<usize> {
        let updates = self.inner.long_poll.get_updates().await?;
        let count = updates.len();

        for update in &updates {
            counter!("voicebot_updates_total").increment(1);
            if let Err(e) = self.process_update(update).await {
                error!(error = %e, code = e.error_code(), "Failed to process update");
            }
        }

        Ok(count)
    }

    /// Route one long poll update.
    pub async fn process_update(&self, update: &VkUpdate) -> Result<()> {
        if !update.is_message() {
            return Ok(());
        }

        let Some(incoming) = update.extract_message() else {
            return Ok(());
        };

        let message = Message::new(incoming.user_id, incoming.text, incoming.message_id);
        self.dispatch(&message).await
    }

    /// Route a message to the admin controller or the message controller.
    pub async fn dispatch(&self, message: &Message) -> Result<()> {
        counter!("voicebot_messages_total").increment(1);

        if let Some(command) = message.command_with_args().filter(|c| !c.trim().is_empty()) {
            if self.inner.admin.handle_command(message, command).await? {
                return Ok(());
            }
        }

        self.inner.messages.handle_message(message).await
    }

    /// Answer the last message of every unread private conversation.
    pub async fn answer_unread(&self) -> Result<usize> {
        let conversations = self.inner.vk.get_unread_conversations(UNREAD_BATCH).await?;
        let mut answered = 0;

        for conversation in conversations {
            if conversation.peer_id <= 0 || conversation.peer_id >= CHAT_PEER_OFFSET {
                debug!(peer_id = conversation.peer_id, "Skipping non-user conversation");
                continue;
            }

            let message = Message::new(conversation.peer_id, conversation.text, None);
            match self.dispatch(&message).await {
                Ok(()) => answered += 1,
                Err(e) => {
                    error!(peer_id = conversation.peer_id, error = %e, "Failed to answer unread message")
                }
            }
        }

        info!(answered, "Unread conversations processed");
        Ok(answered)
    }
}

/// Handle to a running bot worker.
pub struct BotWorkerHandle {
    worker: BotWorker,
    handle: tokio::task::JoinHandle<()>,
}

impl BotWorkerHandle {
    /// Stop the worker, aborting a long poll request still in flight.
    pub async fn stop(self) -> Result<()> {
        self.worker.stop().await;

        let mut handle = self.handle;
        match tokio::time::timeout(STOP_GRACE, &mut handle).await {
            Ok(joined) => joined.map_err(|e| Error::Internal(format!("Bot worker panicked: {}", e))),
            Err(_) => {
                handle.abort();
                debug!("Bot worker aborted while waiting for updates");
                Ok(())
            }
        }
    }
}
