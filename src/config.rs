//! Configuration management for the voice bot.
//!
//! Loads configuration from environment variables (and a `.env` file when
//! present):
//! - VK API access and long poll tuning
//! - SQLite database location and the bootstrap administrator
//! - Speech engine selection and audio post-processing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration
pub fn config() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Initialize configuration (call once at startup)
pub fn init() -> &'static Config {
    config()
}

#[derive(Debug, Clone)]
pub struct Config {
    pub vk: VkConfig,
    pub long_poll: LongPollConfig,
    pub database: DatabaseConfig,
    pub voice: VoiceConfig,
    pub bot: BotConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub struct VkConfig {
    pub token: Option<String>,
    pub group_id: Option<i64>,
    pub api_version: String,
    pub api_base_url: String,
    /// Maximum API calls per second.
    pub rate_limit: u32,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct LongPollConfig {
    /// Seconds the long poll server holds a request open.
    pub wait: u64,
    /// Client side timeout for one long poll request.
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: String,
    pub first_admin_vk_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Piper,
    Espeak,
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "piper" => Ok(Self::Piper),
            "espeak" | "espeak-ng" => Ok(Self::Espeak),
            _ => Err(format!("Unknown TTS engine: {}", s)),
        }
    }
}

/// Fixed synthesis parameters for a low, clean voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthesisParams {
    pub volume: f32,
    /// Slower speech, which also reads lower.
    pub length_scale: f32,
    pub noise_scale: f32,
    pub noise_w_scale: f32,
    pub normalize_audio: bool,
}

impl Default for SynthesisParams {
    fn default() -> Self {
        Self {
            volume: 1.0,
            length_scale: 1.2,
            noise_scale: 0.1,
            noise_w_scale: 0.1,
            normalize_audio: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VoiceConfig {
    pub engine: EngineKind,
    pub piper_bin: PathBuf,
    pub piper_model: PathBuf,
    pub espeak_bin: PathBuf,
    pub espeak_voice: String,
    pub timeout: Duration,
    pub temp_dir: PathBuf,
    /// Maximum characters synthesized per message.
    pub max_text_length: usize,
    /// Playback rate multiplier used to lower the pitch (0.84 is ~3 semitones).
    pub pitch_factor: f32,
    pub params: SynthesisParams,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::Piper,
            piper_bin: PathBuf::from("piper"),
            piper_model: PathBuf::from("piper1-gpl/ru_RU-ruslan-medium.onnx"),
            espeak_bin: PathBuf::from("espeak-ng"),
            espeak_voice: "ru".to_string(),
            timeout: Duration::from_secs(60),
            temp_dir: env::temp_dir(),
            max_text_length: 1000,
            pitch_factor: 0.84,
            params: SynthesisParams::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Pause after a failed poll cycle.
    pub error_backoff: Duration,
    pub process_unread_on_start: bool,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub metrics_addr: Option<SocketAddr>,
    pub json_logs: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            vk: VkConfig {
                token: env::var("VK_BOT_TOKEN").ok().filter(|t| !t.trim().is_empty()),
                group_id: env_parse("VK_GROUP_ID"),
                api_version: env_or("VK_API_VERSION", "5.131"),
                api_base_url: env_or("VK_API_BASE_URL", "https://api.vk.com/method"),
                rate_limit: env_parse("VK_RATE_LIMIT").unwrap_or(20),
                request_timeout: Duration::from_secs(30),
            },
            long_poll: LongPollConfig {
                wait: env_parse("LONG_POLL_WAIT").unwrap_or(25),
                timeout: Duration::from_secs(env_parse("LONG_POLL_TIMEOUT").unwrap_or(30)),
            },
            database: DatabaseConfig {
                path: env_or("DATABASE_PATH", "bot.db"),
                first_admin_vk_id: env_parse("FIRST_ADMIN_VK_ID"),
            },
            voice: Self::parse_voice_config(),
            bot: BotConfig {
                error_backoff: Duration::from_secs(5),
                process_unread_on_start: env_flag("PROCESS_UNREAD_ON_START"),
            },
            telemetry: TelemetryConfig {
                metrics_addr: env_parse("METRICS_ADDR"),
                json_logs: env_or("LOG_FORMAT", "pretty").eq_ignore_ascii_case("json"),
            },
        }
    }

    fn parse_voice_config() -> VoiceConfig {
        let defaults = VoiceConfig::default();

        VoiceConfig {
            engine: env_parse("TTS_ENGINE").unwrap_or(defaults.engine),
            piper_bin: env::var("PIPER_BIN").map(PathBuf::from).unwrap_or(defaults.piper_bin),
            piper_model: env::var("PIPER_MODEL")
                .map(PathBuf::from)
                .unwrap_or(defaults.piper_model),
            espeak_bin: env::var("ESPEAK_BIN")
                .map(PathBuf::from)
                .unwrap_or(defaults.espeak_bin),
            espeak_voice: env_or("ESPEAK_VOICE", &defaults.espeak_voice),
            timeout: env_parse("TTS_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.timeout),
            temp_dir: env::var("TEMP_DIR").map(PathBuf::from).unwrap_or(defaults.temp_dir),
            max_text_length: env_parse("MAX_TEXT_LENGTH").unwrap_or(defaults.max_text_length),
            pitch_factor: env_parse::<f32>("VOICE_PITCH_FACTOR")
                .filter(|f| *f > 0.0 && *f <= 2.0)
                .unwrap_or(defaults.pitch_factor),
            params: SynthesisParams::default(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, treating unset or malformed values as absent.
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_flag(key: &str) -> bool {
    matches!(
        env::var(key).as_deref().map(str::trim),
        Ok("1") | Ok("true") | Ok("TRUE") | Ok("yes")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_kind_parsing() {
        assert_eq!("piper".parse::<EngineKind>().unwrap(), EngineKind::Piper);
        assert_eq!("ESPEAK".parse::<EngineKind>().unwrap(), EngineKind::Espeak);
        assert_eq!("espeak-ng".parse::<EngineKind>().unwrap(), EngineKind::Espeak);
        assert!("festival".parse::<EngineKind>().is_err());
    }

    #[test]
    fn test_synthesis_defaults() {
        let params = SynthesisParams::default();
        assert_eq!(params.length_scale, 1.2);
        assert_eq!(params.noise_scale, 0.1);
        assert_eq!(params.noise_w_scale, 0.1);
        assert!(params.normalize_audio);
    }

    #[test]
    fn test_env_parse_rejects_garbage() {
        env::set_var("VOICEBOT_TEST_GROUP_ID", "not-a-number");
        assert_eq!(env_parse::<i64>("VOICEBOT_TEST_GROUP_ID"), None);
        env::set_var("VOICEBOT_TEST_GROUP_ID", " 12345 ");
        assert_eq!(env_parse::<i64>("VOICEBOT_TEST_GROUP_ID"), Some(12345));
        env::remove_var("VOICEBOT_TEST_GROUP_ID");
    }
}
