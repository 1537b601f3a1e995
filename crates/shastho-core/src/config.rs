//! Configuration loading and validation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level Amar Shastho configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini: Option<GeminiConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub live: Option<LiveConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub triage: Option<TriageConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<ExportConfig>,
}

/// Hosted AI service credentials and endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_api_key_env(),
            base_url: None,
        }
    }
}

impl GeminiConfig {
    /// Resolve the API key: explicit `api_key` field first, then the
    /// `api_key_env` environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(key) = &self.api_key {
            if !key.is_empty() {
                return Some(key.clone());
            }
        }
        if let Ok(key) = std::env::var(&self.api_key_env) {
            if !key.is_empty() {
                return Some(key);
            }
        }
        None
    }
}

/// Live companion session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    #[serde(default = "default_live_model")]
    pub model: String,

    #[serde(default = "default_voice")]
    pub voice: String,

    #[serde(default = "default_input_sample_rate")]
    pub input_sample_rate: u32,

    #[serde(default = "default_output_sample_rate")]
    pub output_sample_rate: u32,

    /// Samples per outbound audio frame (~256ms at 16kHz).
    #[serde(default = "default_frame_samples")]
    pub frame_samples: usize,

    /// Video snapshots per second.
    #[serde(default = "default_snapshot_fps")]
    pub snapshot_fps: f64,

    /// Maximum snapshot width in pixels.
    #[serde(default = "default_snapshot_max_width")]
    pub snapshot_max_width: u32,

    /// JPEG quality for snapshots (0-100).
    #[serde(default = "default_snapshot_quality")]
    pub snapshot_quality: u8,
}

fn default_live_model() -> String {
    "gemini-2.5-flash-native-audio-preview-09-2025".to_string()
}

fn default_voice() -> String {
    "Kore".to_string()
}

fn default_input_sample_rate() -> u32 {
    16_000
}

fn default_output_sample_rate() -> u32 {
    24_000
}

fn default_frame_samples() -> usize {
    4096
}

fn default_snapshot_fps() -> f64 {
    2.0
}

fn default_snapshot_max_width() -> u32 {
    320
}

fn default_snapshot_quality() -> u8 {
    50
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            model: default_live_model(),
            voice: default_voice(),
            input_sample_rate: default_input_sample_rate(),
            output_sample_rate: default_output_sample_rate(),
            frame_samples: default_frame_samples(),
            snapshot_fps: default_snapshot_fps(),
            snapshot_max_width: default_snapshot_max_width(),
            snapshot_quality: default_snapshot_quality(),
        }
    }
}

/// Triage and chat settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageConfig {
    #[serde(default = "default_text_model")]
    pub model: String,

    /// Low temperature keeps classification near-deterministic.
    #[serde(default = "default_classify_temperature")]
    pub classify_temperature: f64,

    #[serde(default = "default_chat_temperature")]
    pub chat_temperature: f64,
}

fn default_text_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_classify_temperature() -> f64 {
    0.1
}

fn default_chat_temperature() -> f64 {
    0.7
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            model: default_text_model(),
            classify_temperature: default_classify_temperature(),
            chat_temperature: default_chat_temperature(),
        }
    }
}

/// Report export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory where generated PDFs are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

impl Config {
    /// Load config from a JSON5 file, substituting `${ENV_VAR}` references.
    ///
    /// A missing file yields the default config; a missing API key is
    /// reported by the caller at first use, not here.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(crate::error::ShasthoError::Io)?;
        let substituted = substitute_env_vars(&raw);

        let config: Config = json5::from_str(&substituted)
            .map_err(|e| crate::error::ShasthoError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Default config file location.
    pub fn default_path() -> PathBuf {
        PathBuf::from("shastho.json")
    }

    pub fn gemini(&self) -> GeminiConfig {
        self.gemini.clone().unwrap_or_default()
    }

    pub fn live(&self) -> LiveConfig {
        self.live.clone().unwrap_or_default()
    }

    pub fn triage(&self) -> TriageConfig {
        self.triage.clone().unwrap_or_default()
    }

    pub fn export(&self) -> ExportConfig {
        self.export.clone().unwrap_or_default()
    }
}

/// Replace `${ENV_VAR}` references with their environment values.
fn substitute_env_vars(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var = &after[..end];
                match std::env::var(var) {
                    Ok(val) => out.push_str(&val),
                    Err(_) => {
                        out.push_str("${");
                        out.push_str(var);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str("${");
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
