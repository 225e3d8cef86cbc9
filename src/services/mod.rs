//! Service layer for the voice bot.
//!
//! Contains business logic and external integrations:
//! - VkApi (VK API client, rate limited)
//! - LongPoll (VK long poll session)
//! - Markup (pause and stress markup)
//! - Wav (PCM post-processing)
//! - Voice (speech synthesis through Piper or espeak-ng)
//! - Bot (long poll worker loop)

mod bot;
mod long_poll;
pub mod markup;
pub mod voice;
mod vk_api;
pub mod wav;

pub use bot::{BotWorker, BotWorkerHandle};
pub use long_poll::LongPollService;
pub use vk_api::{LongPollServer, UnreadConversation, VkApiService, VkUserInfo};
pub use voice::{engine_from_config, EspeakEngine, PiperEngine, SpeechEngine, VoiceService};
