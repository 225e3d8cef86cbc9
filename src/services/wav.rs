//! 16-bit PCM WAV handling for voice post-processing.
//!
//! Piper writes mono 16-bit PCM. We lower the pitch by replaying the
//! samples at a reduced rate and resampling back to the original rate,
//! then peak-normalize.

use crate::error::{Error, Result};

/// Headroom left below full scale by `normalize`, in dB.
pub const DEFAULT_HEADROOM_DB: f32 = 0.1;

const PCM_FORMAT: u16 = 1;

/// Decoded PCM audio.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmWav {
    pub sample_rate: u32,
    pub channels: u16,
    /// Interleaved samples.
    pub samples: Vec<i16>,
}

impl PcmWav {
    /// Parse a RIFF/WAVE byte buffer holding 16-bit PCM.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < 12 || &buf[0..4] != b"RIFF" || &buf[8..12] != b"WAVE" {
            return Err(Error::Audio("not a RIFF/WAVE buffer".into()));
        }

        let mut fmt: Option<(u16, u16, u32, u16)> = None;
        let mut data: Option<&[u8]> = None;

        let mut idx = 12;
        while idx + 8 <= buf.len() {
            let chunk_id = &buf[idx..idx + 4];
            let size = u32::from_le_bytes([buf[idx + 4], buf[idx + 5], buf[idx + 6], buf[idx + 7]])
                as usize;
            let body_start = idx + 8;
            // Streamed WAVs may carry a placeholder size; clamp to what we have
            let body_end = body_start.saturating_add(size).min(buf.len());
            let body = &buf[body_start..body_end];

            match chunk_id {
                b"fmt " => {
                    if body.len() < 16 {
                        return Err(Error::Audio("truncated fmt chunk".into()));
                    }
                    let format = u16::from_le_bytes([body[0], body[1]]);
                    let channels = u16::from_le_bytes([body[2], body[3]]);
                    let sample_rate = u32::from_le_bytes([body[4], body[5], body[6], body[7]]);
                    let bits = u16::from_le_bytes([body[14], body[15]]);
                    fmt = Some((format, channels, sample_rate, bits));
                }
                b"data" => {
                    data = Some(body);
                    break;
                }
                _ => {}
            }

            // Chunks are word aligned
            idx = body_start.saturating_add(size + (size & 1));
        }

        let (format, channels, sample_rate, bits) =
            fmt.ok_or_else(|| Error::Audio("missing fmt chunk".into()))?;
        let data = data.ok_or_else(|| Error::Audio("missing data chunk".into()))?;

        if format != PCM_FORMAT || bits != 16 {
            return Err(Error::Audio(format!(
                "unsupported format {} with {} bits per sample",
                format, bits
            )));
        }
        if channels == 0 || sample_rate == 0 {
            return Err(Error::Audio("invalid channel count or sample rate".into()));
        }

        let samples = data
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();

        Ok(Self {
            sample_rate,
            channels,
            samples,
        })
    }

    /// Encode as a canonical 44-byte-header WAV.
    pub fn to_bytes(&self) -> Vec<u8> {
        let data_len = (self.samples.len() * 2) as u32;
        let block_align = self.channels * 2;
        let byte_rate = self.sample_rate * block_align as u32;

        let mut out = Vec::with_capacity(44 + data_len as usize);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&PCM_FORMAT.to_le_bytes());
        out.extend_from_slice(&self.channels.to_le_bytes());
        out.extend_from_slice(&self.sample_rate.to_le_bytes());
        out.extend_from_slice(&byte_rate.to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for s in &self.samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_secs(&self) -> f32 {
        self.frames() as f32 / self.sample_rate as f32
    }

    pub fn peak(&self) -> i16 {
        self.samples
            .iter()
            .map(|s| s.unsigned_abs())
            .max()
            .map(|p| p.min(i16::MAX as u16) as i16)
            .unwrap_or(0)
    }

    /// Lower (factor < 1) or raise (factor > 1) the pitch.
    ///
    /// Equivalent to playing the audio at `sample_rate * factor` and
    /// resampling to `sample_rate`; duration scales by `1 / factor`.
    pub fn shift_pitch(&self, factor: f32) -> Result<Self> {
        if !(factor > 0.0 && factor.is_finite()) {
            return Err(Error::Audio(format!("invalid pitch factor {}", factor)));
        }

        let channels = self.channels as usize;
        let in_frames = self.frames();
        if in_frames == 0 {
            return Ok(self.clone());
        }

        let out_frames = ((in_frames as f64) / factor as f64).round() as usize;
        let mut samples = Vec::with_capacity(out_frames * channels);

        for i in 0..out_frames {
            let pos = i as f64 * factor as f64;
            let base = pos.floor() as usize;
            let frac = pos - base as f64;
            let next = (base + 1).min(in_frames - 1);
            let base = base.min(in_frames - 1);

            for ch in 0..channels {
                let a = self.samples[base * channels + ch] as f64;
                let b = self.samples[next * channels + ch] as f64;
                let v = a + (b - a) * frac;
                samples.push(v.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16);
            }
        }

        Ok(Self {
            sample_rate: self.sample_rate,
            channels: self.channels,
            samples,
        })
    }

    /// Scale so the peak sits `headroom_db` below full scale.
    ///
    /// Silence is returned unchanged.
    pub fn normalize(&self, headroom_db: f32) -> Self {
        let peak = self.peak();
        if peak == 0 {
            return self.clone();
        }

        let target = i16::MAX as f32 * 10f32.powf(-headroom_db / 20.0);
        let gain = target / peak as f32;

        let samples = self
            .samples
            .iter()
            .map(|s| (*s as f32 * gain).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16)
            .collect();

        Self {
            sample_rate: self.sample_rate,
            channels: self.channels,
            samples,
        }
    }
}

/// Pitch-shift and normalize a WAV buffer.
pub fn post_process(wav: &[u8], pitch_factor: f32, normalize: bool) -> Result<Vec<u8>> {
    let audio = PcmWav::from_bytes(wav)?;
    let mut shifted = audio.shift_pitch(pitch_factor)?;
    if normalize {
        shifted = shifted.normalize(DEFAULT_HEADROOM_DB);
    }
    Ok(shifted.to_bytes())
}
