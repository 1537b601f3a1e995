//! PCM transcoding between float samples and the 16-bit wire format.

use anyhow::Result;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// A base64 media payload tagged with its MIME descriptor, as sent over the
/// live session wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaBlob {
    pub mime_type: String,
    pub data: String,
}

impl MediaBlob {
    pub fn jpeg(bytes: &[u8]) -> Self {
        Self {
            mime_type: "image/jpeg".to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }
}

/// A decoded single-channel audio buffer.
#[derive(Debug, Clone)]
pub struct PcmBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl PcmBuffer {
    /// Playback duration in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Encode a float frame as base64 16-bit little-endian PCM.
///
/// Samples are clamped to [-1, 1]; the negative side scales by 32768 and the
/// positive by 32767 so both rails map onto the full i16 range.
pub fn encode_audio_frame(samples: &[f32], sample_rate: u32) -> MediaBlob {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let s = sample.clamp(-1.0, 1.0);
        let scaled = if s < 0.0 { s * 32768.0 } else { s * 32767.0 };
        bytes.extend_from_slice(&(scaled as i16).to_le_bytes());
    }

    MediaBlob {
        mime_type: format!("audio/pcm;rate={sample_rate}"),
        data: base64::engine::general_purpose::STANDARD.encode(&bytes),
    }
}

/// Decode 16-bit little-endian PCM bytes into a float buffer.
///
/// An odd byte length is a caller error, not a recoverable condition.
pub fn decode_pcm16(bytes: &[u8], sample_rate: u32) -> Result<PcmBuffer> {
    if bytes.len() % 2 != 0 {
        anyhow::bail!("PCM byte length must be even, got {}", bytes.len());
    }

    let samples: Vec<f32> = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();

    Ok(PcmBuffer {
        samples,
        sample_rate,
    })
}

/// Decode a base64 payload of 16-bit PCM, as received from the live session.
pub fn decode_pcm16_base64(data: &str, sample_rate: u32) -> Result<PcmBuffer> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(data)?;
    decode_pcm16(&bytes, sample_rate)
}
