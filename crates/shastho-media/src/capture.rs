//! Media capture adapter — audio frames and video snapshots at a fixed cadence.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use shastho_core::config::LiveConfig;

use crate::snapshot::downscale_jpeg;

/// A fixed-size window of single-channel float samples.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// A downscaled JPEG still from the live video feed.
#[derive(Debug, Clone)]
pub struct VideoSnapshot {
    pub jpeg: Vec<u8>,
}

/// Receivers handed to the session manager when capture starts.
pub struct CaptureStreams {
    pub audio: mpsc::Receiver<AudioFrame>,
    pub video: mpsc::Receiver<VideoSnapshot>,
}

/// Cadence and payload-size settings for a capture run.
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub sample_rate: u32,
    pub frame_samples: usize,
    pub snapshot_fps: f64,
    pub snapshot_max_width: u32,
    pub snapshot_quality: u8,
}

impl From<&LiveConfig> for CaptureSettings {
    fn from(live: &LiveConfig) -> Self {
        Self {
            sample_rate: live.input_sample_rate,
            frame_samples: live.frame_samples,
            snapshot_fps: live.snapshot_fps,
            snapshot_max_width: live.snapshot_max_width,
            snapshot_quality: live.snapshot_quality,
        }
    }
}

/// Media capture backend trait.
///
/// `start` acquires the underlying source; acquisition failure (missing
/// device, denied permission, unreadable file) must surface as an error so
/// the session manager can fail the connection attempt instead of silently
/// continuing without media.
#[async_trait]
pub trait MediaCapture: Send {
    /// Start capturing, returning frame and snapshot receivers.
    async fn start(&mut self, settings: &CaptureSettings) -> Result<CaptureStreams>;

    /// Stop capturing and release the source.
    async fn stop(&mut self) -> Result<()>;

    fn is_capturing(&self) -> bool;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Capture backend that replays a 16-bit mono WAV file as the microphone
/// feed, looping when it reaches the end, with an optional still image as
/// the camera feed.
pub struct WavFileCapture {
    wav_path: PathBuf,
    image_path: Option<PathBuf>,
    cancel: Option<CancellationToken>,
}

impl WavFileCapture {
    pub fn new(wav_path: impl Into<PathBuf>, image_path: Option<PathBuf>) -> Self {
        Self {
            wav_path: wav_path.into(),
            image_path,
            cancel: None,
        }
    }
}

#[async_trait]
impl MediaCapture for WavFileCapture {
    async fn start(&mut self, settings: &CaptureSettings) -> Result<CaptureStreams> {
        if self.cancel.is_some() {
            anyhow::bail!("capture already running");
        }

        let reader = hound::WavReader::open(&self.wav_path)
            .with_context(|| format!("cannot open audio source {}", self.wav_path.display()))?;
        let spec = reader.spec();
        if spec.channels != 1 {
            anyhow::bail!("audio source must be mono, got {} channels", spec.channels);
        }
        if spec.sample_rate != settings.sample_rate {
            anyhow::bail!(
                "audio source must be {} Hz, got {}",
                settings.sample_rate,
                spec.sample_rate
            );
        }
        if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
            anyhow::bail!("audio source must be 16-bit integer PCM");
        }

        let samples: Vec<f32> = reader
            .into_samples::<i16>()
            .collect::<std::result::Result<Vec<i16>, _>>()
            .context("failed reading audio source samples")?
            .into_iter()
            .map(|s| s as f32 / 32768.0)
            .collect();
        if samples.is_empty() {
            anyhow::bail!("audio source is empty");
        }

        // Decode and downscale the camera still once up front; a bad image
        // fails the connection attempt like a denied camera would.
        let snapshot = match &self.image_path {
            Some(path) => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("cannot open video source {}", path.display()))?;
                Some(downscale_jpeg(
                    &bytes,
                    settings.snapshot_max_width,
                    settings.snapshot_quality,
                )?)
            }
            None => None,
        };

        let (audio_tx, audio_rx) = mpsc::channel::<AudioFrame>(8);
        let (video_tx, video_rx) = mpsc::channel::<VideoSnapshot>(4);
        let cancel = CancellationToken::new();

        let frame_samples = settings.frame_samples;
        let sample_rate = settings.sample_rate;
        let frame_period = Duration::from_secs_f64(frame_samples as f64 / sample_rate as f64);

        let audio_cancel = cancel.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(frame_period);
            let mut offset = 0usize;
            loop {
                tokio::select! {
                    _ = audio_cancel.cancelled() => break,
                    _ = interval.tick() => {
                        let frame: Vec<f32> = samples
                            .iter()
                            .cycle()
                            .skip(offset)
                            .take(frame_samples)
                            .copied()
                            .collect();
                        offset = (offset + frame_samples) % samples.len();
                        if audio_tx.send(AudioFrame { samples: frame, sample_rate }).await.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("audio capture loop ended");
        });

        if let Some(jpeg) = snapshot {
            let video_cancel = cancel.clone();
            let snapshot_period = Duration::from_secs_f64(1.0 / settings.snapshot_fps);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(snapshot_period);
                loop {
                    tokio::select! {
                        _ = video_cancel.cancelled() => break,
                        _ = interval.tick() => {
                            if video_tx.send(VideoSnapshot { jpeg: jpeg.clone() }).await.is_err() {
                                break;
                            }
                        }
                    }
                }
                debug!("video capture loop ended");
            });
        }

        info!(source = %self.wav_path.display(), "media capture started");
        self.cancel = Some(cancel);
        Ok(CaptureStreams {
            audio: audio_rx,
            video: video_rx,
        })
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.cancel.is_some()
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}

/// Capture backend fed from pre-baked frames; used by tests and demos.
pub struct ScriptedCapture {
    frames: Vec<AudioFrame>,
    snapshots: Vec<VideoSnapshot>,
    cancel: Option<CancellationToken>,
}

impl ScriptedCapture {
    pub fn new(frames: Vec<AudioFrame>, snapshots: Vec<VideoSnapshot>) -> Self {
        Self {
            frames,
            snapshots,
            cancel: None,
        }
    }
}

#[async_trait]
impl MediaCapture for ScriptedCapture {
    async fn start(&mut self, _settings: &CaptureSettings) -> Result<CaptureStreams> {
        let (audio_tx, audio_rx) = mpsc::channel(self.frames.len().max(1));
        let (video_tx, video_rx) = mpsc::channel(self.snapshots.len().max(1));

        for frame in self.frames.drain(..) {
            let _ = audio_tx.try_send(frame);
        }
        for snapshot in self.snapshots.drain(..) {
            let _ = video_tx.try_send(snapshot);
        }

        let cancel = CancellationToken::new();
        let guard = cancel.clone();
        // Hold the senders open until stopped so receivers see a live stream.
        tokio::spawn(async move {
            guard.cancelled().await;
            drop(audio_tx);
            drop(video_tx);
        });

        self.cancel = Some(cancel);
        Ok(CaptureStreams {
            audio: audio_rx,
            video: video_rx,
        })
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.cancel.is_some()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
