//! Voice message generation.
//!
//! Text goes through the markup rewrites, is synthesized by an external
//! engine into a WAV file in the scratch directory, and is post-processed
//! for a lower voice. Supported engines:
//! - Piper (neural, requires a voice model)
//! - espeak-ng (formant synthesis, fallback)

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::{EngineKind, SynthesisParams, VoiceConfig};
use crate::error::{Error, Result};
use crate::services::{markup, wav};

/// A text-to-speech backend writing WAV output to a file.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Synthesize prepared text into `out_wav`.
    async fn synthesize(&self, text: &str, out_wav: &Path) -> Result<()>;
}

/// Piper command line engine.
pub struct PiperEngine {
    bin: PathBuf,
    model: PathBuf,
    params: SynthesisParams,
}

impl PiperEngine {
    /// Create the engine, checking that the voice model exists.
    pub fn new(bin: PathBuf, model: PathBuf, params: SynthesisParams) -> Result<Self> {
        if !model.exists() {
            return Err(Error::Config(format!(
                "Voice model not found: {}",
                model.display()
            )));
        }
        Ok(Self { bin, model, params })
    }

    fn command(&self, out_wav: &Path) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("-m").arg(&self.model);
        cmd.arg("-f").arg(out_wav);
        cmd.arg("--length_scale")
            .arg(format!("{:.2}", self.params.length_scale));
        cmd.arg("--noise_scale")
            .arg(format!("{:.2}", self.params.noise_scale));
        cmd.arg("--noise_w")
            .arg(format!("{:.2}", self.params.noise_w_scale));
        if (self.params.volume - 1.0).abs() > f32::EPSILON {
            cmd.arg("--volume").arg(format!("{:.2}", self.params.volume));
        }
        cmd
    }
}

#[async_trait]
impl SpeechEngine for PiperEngine {
    fn name(&self) -> &'static str {
        "piper"
    }

    async fn synthesize(&self, text: &str, out_wav: &Path) -> Result<()> {
        let mut cmd = self.command(out_wav);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(target: "tts", command = ?cmd, "Running piper");
        let mut child = cmd
            .spawn()
            .map_err(|e| Error::Synthesis(format!("Failed to start piper: {}", e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            // Dropping stdin closes it so piper sees EOF
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(Error::Synthesis(format!(
                "Piper failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

/// espeak-ng command line engine.
pub struct EspeakEngine {
    bin: PathBuf,
    voice: String,
    params: SynthesisParams,
}

impl EspeakEngine {
    pub fn new(bin: PathBuf, voice: String, params: SynthesisParams) -> Self {
        Self { bin, voice, params }
    }

    /// Words per minute derived from the length scale.
    fn words_per_minute(&self) -> i32 {
        (175.0 / self.params.length_scale).round().clamp(80.0, 450.0) as i32
    }

    fn amplitude(&self) -> i32 {
        (100.0 * self.params.volume).round().clamp(0.0, 200.0) as i32
    }
}

#[async_trait]
impl SpeechEngine for EspeakEngine {
    fn name(&self) -> &'static str {
        "espeak-ng"
    }

    async fn synthesize(&self, text: &str, out_wav: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("-v").arg(&self.voice);
        cmd.arg("-s").arg(self.words_per_minute().to_string());
        cmd.arg("-a").arg(self.amplitude().to_string());
        cmd.arg("-w").arg(out_wav);
        cmd.arg("--").arg(text);
        cmd.kill_on_drop(true);

        debug!(target: "tts", command = ?cmd, "Running espeak-ng");
        let output = cmd
            .output()
            .await
            .map_err(|e| Error::Synthesis(format!("Failed to start espeak-ng: {}", e)))?;
        if !output.status.success() {
            return Err(Error::Synthesis(format!(
                "espeak-ng failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

/// Build the engine selected in configuration.
pub fn engine_from_config(cfg: &VoiceConfig) -> Result<Arc<dyn SpeechEngine>> {
    let engine: Arc<dyn SpeechEngine> = match cfg.engine {
        EngineKind::Piper => Arc::new(PiperEngine::new(
            cfg.piper_bin.clone(),
            cfg.piper_model.clone(),
            cfg.params,
        )?),
        EngineKind::Espeak => Arc::new(EspeakEngine::new(
            cfg.espeak_bin.clone(),
            cfg.espeak_voice.clone(),
            cfg.params,
        )),
    };
    Ok(engine)
}

/// Service turning user text into voice message audio.
#[derive(Clone)]
pub struct VoiceService {
    engine: Arc<dyn SpeechEngine>,
    cfg: VoiceConfig,
}

impl VoiceService {
    pub fn new(engine: Arc<dyn SpeechEngine>, cfg: VoiceConfig) -> Self {
        info!(engine = engine.name(), temp_dir = ?cfg.temp_dir, "Voice service initialized");
        Self { engine, cfg }
    }

    /// Create the service with the engine selected in configuration.
    pub fn from_config(cfg: &VoiceConfig) -> Result<Self> {
        Ok(Self::new(engine_from_config(cfg)?, cfg.clone()))
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Generate voice message audio (WAV bytes) from raw user text.
    pub async fn generate_voice_message(&self, text: &str) -> Result<Vec<u8>> {
        let prepared = markup::prepare_text(text, self.cfg.max_text_length);
        if prepared.trim().is_empty() {
            return Err(Error::Validation("Text is empty after cleanup".into()));
        }

        let raw = self.synthesize_wav(&prepared).await?;

        let processed = match wav::post_process(
            &raw,
            self.cfg.pitch_factor,
            self.cfg.params.normalize_audio,
        ) {
            Ok(processed) => processed,
            Err(e) => {
                warn!(error = %e, "Audio post-processing failed, sending unprocessed audio");
                raw
            }
        };

        debug!(chars = prepared.chars().count(), bytes = processed.len(), "Voice generated");
        Ok(processed)
    }

    async fn synthesize_wav(&self, text: &str) -> Result<Vec<u8>> {
        let out = tempfile::Builder::new()
            .prefix("tts_")
            .suffix(".wav")
            .tempfile_in(&self.cfg.temp_dir)?;

        match timeout(self.cfg.timeout, self.engine.synthesize(text, out.path())).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::Synthesis(format!(
                    "{} timed out after {} ms",
                    self.engine.name(),
                    self.cfg.timeout.as_millis()
                )))
            }
        }

        let bytes = tokio::fs::read(out.path()).await?;
        if bytes.is_empty() {
            return Err(Error::Synthesis(format!(
                "{} produced no audio",
                self.engine.name()
            )));
        }
        Ok(bytes)
    }

    /// Write audio to a scratch file that is removed when the handle drops.
    pub fn save_audio_to_temp_file(&self, audio: &[u8]) -> Result<NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix("voice_")
            .suffix(".wav")
            .tempfile_in(&self.cfg.temp_dir)?;
        std::io::Write::write_all(&mut file, audio)?;
        std::io::Write::flush(&mut file)?;
        Ok(file)
    }
}
