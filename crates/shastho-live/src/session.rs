//! Live session manager — owns one streaming connection end to end:
//! connect, stream outbound media, schedule inbound audio, tear down.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use futures::{SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use shastho_core::config::Config;
use shastho_core::types::ConnectionState;
use shastho_media::capture::{CaptureSettings, MediaCapture};
use shastho_media::pcm::{self, MediaBlob};
use shastho_media::playback::{PlaybackScheduler, ScheduledChunk, SystemClock};
use shastho_media::volume::rms_level;

use crate::protocol::{RealtimeInputMessage, ServerMessage, SetupMessage};

const DEFAULT_WS_BASE: &str = "wss://generativelanguage.googleapis.com";
const BIDI_PATH: &str =
    "/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Frames waiting on the socket writer. Capture never blocks on this; a
/// full queue drops the frame.
const OUTBOUND_QUEUE_DEPTH: usize = 32;

const SYSTEM_PERSONA: &str = "\
You are an intelligent, accurate, and warm AI video call companion.

Key behaviors:
1. Personality: speak with a genuine smile. Be friendly and human-like.
2. Accuracy: provide precise information about what you see.
3. Interaction: react naturally. Keep the conversation flowing smoothly.";

/// Events surfaced to the caller while a session is live.
#[derive(Debug, Clone)]
pub enum LiveEvent {
    /// Decoded model speech committed to a playback slot.
    Audio(ScheduledChunk),
    /// Text part of a model turn.
    Text(String),
    /// The model finished its turn.
    TurnComplete,
    /// The server closed the session.
    Closed,
    /// Fatal stream error; socket tasks have been torn down.
    Error(String),
}

/// One live streaming session.
///
/// `connect` owns the whole lifecycle: it returns only once the service has
/// acknowledged setup and capture is running. Dropping the session cancels
/// its tasks; `disconnect` is the orderly teardown and is idempotent.
pub struct LiveSession {
    state_tx: Arc<watch::Sender<ConnectionState>>,
    state_rx: watch::Receiver<ConnectionState>,
    volume_rx: watch::Receiver<f32>,
    cancel: CancellationToken,
    closed: Arc<AtomicBool>,
    capture: Box<dyn MediaCapture>,
}

impl LiveSession {
    /// Open a session: DISCONNECTED → CONNECTING → CONNECTED.
    ///
    /// Any failure before the service acks setup — bad credentials, socket
    /// refusal, capture acquisition — aborts the attempt with every
    /// already-acquired resource released.
    pub async fn connect(
        config: &Config,
        mut capture: Box<dyn MediaCapture>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<LiveEvent>)> {
        let gemini = config.gemini();
        let live = config.live();

        let api_key = gemini
            .resolve_api_key()
            .context("no API key configured for the live session")?;
        let url = ws_endpoint(gemini.base_url.as_deref(), &api_key);

        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let state_tx = Arc::new(state_tx);

        info!(model = %live.model, "opening live session");
        let (ws, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .context("live session connect failed")?;
        let (mut sink, mut stream) = ws.split();

        let setup = SetupMessage::new(&live.model, &live.voice, SYSTEM_PERSONA);
        let payload = serde_json::to_string(&setup)?;
        sink.send(Message::Text(payload.into()))
            .await
            .context("failed to send session setup")?;

        wait_for_setup_ack(&mut stream).await?;
        state_tx.send_replace(ConnectionState::Connected);
        info!("live session open");

        // Capture starts only once the session is open; a denied or missing
        // device fails the connection attempt rather than continuing mute.
        let settings = CaptureSettings::from(&live);
        let streams = match capture.start(&settings).await {
            Ok(streams) => streams,
            Err(e) => {
                let _ = sink.send(Message::Close(None)).await;
                return Err(e.context("media capture failed"));
            }
        };

        let (volume_tx, volume_rx) = watch::channel(0.0f32);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let closed = Arc::new(AtomicBool::new(false));

        // Socket writer: sole consumer of the outbound queue. Send failures
        // are logged and dropped; streaming tolerates them.
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Message>(OUTBOUND_QUEUE_DEPTH);
        let writer_cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = writer_cancel.cancelled() => {
                        // Close-time errors are swallowed.
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                    msg = outbound_rx.recv() => match msg {
                        Some(msg) => {
                            if let Err(e) = sink.send(msg).await {
                                warn!(error = %e, "dropped outbound payload");
                            }
                        }
                        None => break,
                    },
                }
            }
            debug!("socket writer ended");
        });

        // Outbound pump: capture frames -> encoder -> best-effort queue.
        // The volume estimate publishes before enqueueing so a congested
        // network never stalls the meter.
        let pump_cancel = cancel.clone();
        let pump_closed = closed.clone();
        let mut audio_rx = streams.audio;
        let mut video_rx = streams.video;
        tokio::spawn(async move {
            let mut video_open = true;
            loop {
                tokio::select! {
                    _ = pump_cancel.cancelled() => break,
                    frame = audio_rx.recv() => match frame {
                        Some(frame) => {
                            if pump_closed.load(Ordering::SeqCst) {
                                continue;
                            }
                            volume_tx.send_replace(rms_level(&frame.samples));
                            let blob = pcm::encode_audio_frame(&frame.samples, frame.sample_rate);
                            enqueue_media(&outbound_tx, blob);
                        }
                        None => break,
                    },
                    snapshot = video_rx.recv(), if video_open => match snapshot {
                        Some(snapshot) => {
                            if pump_closed.load(Ordering::SeqCst) {
                                continue;
                            }
                            enqueue_media(&outbound_tx, MediaBlob::jpeg(&snapshot.jpeg));
                        }
                        None => video_open = false,
                    },
                }
            }
            debug!("outbound pump ended");
        });

        // Inbound loop: decode, schedule, surface events. The playback
        // cursor is touched only here and stays lock-free.
        let inbound_cancel = cancel.clone();
        let inbound_state = state_tx.clone();
        let output_rate = live.output_sample_rate;
        tokio::spawn(async move {
            let mut scheduler = PlaybackScheduler::new(Box::new(SystemClock::new()));
            loop {
                tokio::select! {
                    _ = inbound_cancel.cancelled() => break,
                    incoming = stream.next() => match incoming {
                        Some(Ok(msg)) => {
                            let parsed: Option<ServerMessage> = match &msg {
                                Message::Text(text) => serde_json::from_str(text.as_str()).ok(),
                                Message::Binary(bin) => serde_json::from_slice(bin.as_ref()).ok(),
                                Message::Close(_) => {
                                    info!("live session closed by server");
                                    inbound_state.send_replace(ConnectionState::Disconnected);
                                    let _ = events_tx.send(LiveEvent::Closed);
                                    inbound_cancel.cancel();
                                    break;
                                }
                                _ => None,
                            };
                            if let Some(server_msg) = parsed {
                                apply_server_message(server_msg, &mut scheduler, output_rate, &events_tx);
                            }
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "live session stream error");
                            inbound_state.send_replace(ConnectionState::Error);
                            let _ = events_tx.send(LiveEvent::Error(e.to_string()));
                            inbound_cancel.cancel();
                            break;
                        }
                        None => {
                            inbound_state.send_replace(ConnectionState::Disconnected);
                            let _ = events_tx.send(LiveEvent::Closed);
                            inbound_cancel.cancel();
                            break;
                        }
                    },
                }
            }
            debug!("inbound loop ended");
        });

        let session = Self {
            state_tx,
            state_rx,
            volume_rx,
            cancel,
            closed,
            capture,
        };
        Ok((session, events_rx))
    }

    /// Observe connection state transitions.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    pub fn current_state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Observe the outbound volume meter, in [0, 1].
    pub fn volume(&self) -> watch::Receiver<f32> {
        self.volume_rx.clone()
    }

    /// Orderly teardown: stop capture, close the socket (errors swallowed),
    /// transition to DISCONNECTED. Safe to call from any state, any number
    /// of times; in-flight capture callbacks become no-ops.
    pub async fn disconnect(&mut self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel.cancel();
        if let Err(e) = self.capture.stop().await {
            warn!(error = %e, "capture stop failed during disconnect");
        }
        self.state_tx.send_replace(ConnectionState::Disconnected);
        info!("live session ended");
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        // A dropped session must not leave tasks streaming.
        self.closed.store(true, Ordering::SeqCst);
        self.cancel.cancel();
    }
}

/// Build the websocket endpoint, mapping an http(s) base override onto the
/// ws(s) scheme.
fn ws_endpoint(base_url: Option<&str>, api_key: &str) -> String {
    let base = base_url.unwrap_or(DEFAULT_WS_BASE).trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{base}{BIDI_PATH}?key={api_key}")
}

/// Read server messages until the setup ack arrives.
async fn wait_for_setup_ack<S>(stream: &mut S) -> Result<()>
where
    S: Stream<Item = std::result::Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(incoming) = stream.next().await {
        let msg = incoming.context("live session rejected during setup")?;
        let parsed: Option<ServerMessage> = match &msg {
            Message::Text(text) => serde_json::from_str(text.as_str()).ok(),
            Message::Binary(bin) => serde_json::from_slice(bin.as_ref()).ok(),
            Message::Close(_) => anyhow::bail!("live session closed during setup"),
            _ => None,
        };
        if let Some(server_msg) = parsed {
            if server_msg.setup_complete.is_some() {
                return Ok(());
            }
        }
    }
    anyhow::bail!("live session ended before setup completed")
}

/// Serialize a media payload onto the bounded queue. A full (or closed)
/// queue drops the frame; each frame is independently decodable so the
/// stream recovers on its own.
fn enqueue_media(queue: &mpsc::Sender<Message>, blob: MediaBlob) -> bool {
    let payload = match serde_json::to_string(&RealtimeInputMessage::media(blob)) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "failed to encode outbound payload");
            return false;
        }
    };
    match queue.try_send(Message::Text(payload.into())) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "outbound queue full, dropping frame");
            false
        }
    }
}

/// Apply one inbound server message to the playback schedule and event
/// stream. Interruption resets the cursor before any new audio in the same
/// message is scheduled; buffers already handed out keep their slots.
fn apply_server_message(
    msg: ServerMessage,
    scheduler: &mut PlaybackScheduler,
    output_rate: u32,
    events: &mpsc::UnboundedSender<LiveEvent>,
) {
    let Some(content) = msg.server_content else {
        return;
    };

    if content.interrupted {
        debug!("model speech interrupted by user");
        scheduler.interrupt();
    }

    if let Some(turn) = content.model_turn {
        for part in turn.parts {
            if let Some(inline) = part.inline_data {
                if inline.mime_type.starts_with("audio/pcm") {
                    match pcm::decode_pcm16_base64(&inline.data, output_rate) {
                        Ok(buffer) => {
                            let chunk = scheduler.schedule(buffer);
                            let _ = events.send(LiveEvent::Audio(chunk));
                        }
                        Err(e) => warn!(error = %e, "undecodable inbound audio chunk"),
                    }
                }
            }
            if let Some(text) = part.text {
                let _ = events.send(LiveEvent::Text(text));
            }
        }
    }

    if content.turn_complete {
        let _ = events.send(LiveEvent::TurnComplete);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use shastho_core::config::{GeminiConfig, LiveConfig};
    use shastho_media::capture::{AudioFrame, ScriptedCapture, WavFileCapture};
    use std::time::Duration;
    use tokio::task::JoinHandle;

    fn test_config(port: u16) -> Config {
        Config {
            gemini: Some(GeminiConfig {
                api_key: Some("test-key".into()),
                api_key_env: "SHASTHO_TEST_UNSET".into(),
                base_url: Some(format!("ws://127.0.0.1:{port}")),
            }),
            live: Some(LiveConfig::default()),
            ..Default::default()
        }
    }

    /// JSON for an inbound audio chunk of the given duration at 24kHz.
    fn audio_message(duration_secs: f64) -> String {
        let samples = (duration_secs * 24_000.0).round() as usize;
        let bytes: Vec<u8> = std::iter::repeat([0x00u8, 0x10u8])
            .take(samples)
            .flatten()
            .collect();
        let data = base64::engine::general_purpose::STANDARD.encode(&bytes);
        format!(
            r#"{{"serverContent":{{"modelTurn":{{"parts":[{{"inlineData":{{"mimeType":"audio/pcm;rate=24000","data":"{data}"}}}}]}}}}}}"#
        )
    }

    /// A scripted service endpoint: acks setup, pushes `outbound`, collects
    /// up to `collect` text frames from the client, then optionally closes.
    async fn spawn_service(
        outbound: Vec<String>,
        collect: usize,
        close_after: bool,
    ) -> (u16, JoinHandle<Vec<serde_json::Value>>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let mut received = Vec::new();

            // Setup handshake.
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                received.push(serde_json::from_str(text.as_str()).unwrap());
            }
            ws.send(Message::Text(r#"{"setupComplete":{}}"#.to_string().into()))
                .await
                .unwrap();

            for payload in outbound {
                ws.send(Message::Text(payload.into())).await.unwrap();
            }

            let mut collected = 0;
            while collected < collect {
                match ws.next().await {
                    Some(Ok(Message::Text(text))) => {
                        received.push(serde_json::from_str(text.as_str()).unwrap());
                        collected += 1;
                    }
                    Some(Ok(_)) | Some(Err(_)) | None => break,
                }
            }

            if close_after {
                let _ = ws.close(None).await;
            }
            received
        });

        (port, handle)
    }

    fn quiet_capture() -> Box<dyn MediaCapture> {
        Box::new(ScriptedCapture::new(Vec::new(), Vec::new()))
    }

    async fn next_event(
        events: &mut mpsc::UnboundedReceiver<LiveEvent>,
    ) -> LiveEvent {
        tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event stream ended")
    }

    #[tokio::test]
    async fn test_connect_reaches_connected_state() {
        let (port, _server) = spawn_service(Vec::new(), 1, false).await;
        let (mut session, _events) =
            LiveSession::connect(&test_config(port), quiet_capture())
                .await
                .unwrap();

        assert_eq!(session.current_state(), ConnectionState::Connected);
        session.disconnect().await;
        assert_eq!(session.current_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_inbound_chunks_schedule_back_to_back() {
        let outbound = vec![audio_message(0.5), audio_message(0.25)];
        let (port, _server) = spawn_service(outbound, 1, false).await;
        let (mut session, mut events) =
            LiveSession::connect(&test_config(port), quiet_capture())
                .await
                .unwrap();

        let LiveEvent::Audio(c1) = next_event(&mut events).await else {
            panic!("expected audio");
        };
        let LiveEvent::Audio(c2) = next_event(&mut events).await else {
            panic!("expected audio");
        };

        assert!((c1.buffer.duration() - 0.5).abs() < 1e-9);
        assert!((c2.start_at - (c1.start_at + 0.5)).abs() < 1e-6);

        session.disconnect().await;
    }

    #[tokio::test]
    async fn test_interruption_resets_schedule() {
        let outbound = vec![
            audio_message(1.0),
            audio_message(1.0),
            r#"{"serverContent":{"interrupted":true}}"#.to_string(),
            audio_message(0.1),
        ];
        let (port, _server) = spawn_service(outbound, 1, false).await;
        let (mut session, mut events) =
            LiveSession::connect(&test_config(port), quiet_capture())
                .await
                .unwrap();

        let LiveEvent::Audio(c1) = next_event(&mut events).await else {
            panic!("expected audio");
        };
        let LiveEvent::Audio(c2) = next_event(&mut events).await else {
            panic!("expected audio");
        };
        let LiveEvent::Audio(c3) = next_event(&mut events).await else {
            panic!("expected audio");
        };

        // Without the reset c3 would start at c2.start + 1.0; the
        // interruption pulls it back to (nearly) the current clock.
        assert!((c2.start_at - (c1.start_at + 1.0)).abs() < 1e-6);
        assert!(c3.start_at < c2.start_at + 1.0 - 0.5);

        session.disconnect().await;
    }

    #[tokio::test]
    async fn test_text_turn_complete_and_server_close() {
        let outbound = vec![
            r#"{"serverContent":{"modelTurn":{"parts":[{"text":"hello"}]},"turnComplete":true}}"#
                .to_string(),
        ];
        let (port, _server) = spawn_service(outbound, 0, true).await;
        let (mut session, mut events) =
            LiveSession::connect(&test_config(port), quiet_capture())
                .await
                .unwrap();

        let LiveEvent::Text(text) = next_event(&mut events).await else {
            panic!("expected text");
        };
        assert_eq!(text, "hello");
        assert!(matches!(next_event(&mut events).await, LiveEvent::TurnComplete));
        assert!(matches!(next_event(&mut events).await, LiveEvent::Closed));

        let mut state = session.state();
        tokio::time::timeout(Duration::from_secs(2), async {
            while *state.borrow() != ConnectionState::Disconnected {
                state.changed().await.unwrap();
            }
        })
        .await
        .unwrap();

        session.disconnect().await;
    }

    #[tokio::test]
    async fn test_outbound_audio_reaches_service_and_moves_meter() {
        let frames = vec![
            AudioFrame {
                samples: vec![0.1; 4096],
                sample_rate: 16_000,
            },
            AudioFrame {
                samples: vec![0.1; 4096],
                sample_rate: 16_000,
            },
        ];
        let capture = Box::new(ScriptedCapture::new(frames, Vec::new()));
        let (port, server) = spawn_service(Vec::new(), 2, false).await;
        let (mut session, _events) = LiveSession::connect(&test_config(port), capture)
            .await
            .unwrap();

        let mut volume = session.volume();
        tokio::time::timeout(Duration::from_secs(2), volume.changed())
            .await
            .unwrap()
            .unwrap();
        assert!((*volume.borrow() - 0.5).abs() < 1e-3);

        let received = tokio::time::timeout(Duration::from_secs(2), server)
            .await
            .unwrap()
            .unwrap();
        // First frame is our setup message, then the media payloads.
        assert!(received[0]["setup"]["model"].is_string());
        let mime = received[1]["realtimeInput"]["mediaChunks"][0]["mimeType"]
            .as_str()
            .unwrap();
        assert!(mime.starts_with("audio/pcm"));

        session.disconnect().await;
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let (port, _server) = spawn_service(Vec::new(), 1, false).await;
        let (mut session, _events) =
            LiveSession::connect(&test_config(port), quiet_capture())
                .await
                .unwrap();

        session.disconnect().await;
        assert_eq!(session.current_state(), ConnectionState::Disconnected);
        // Second call is a no-op and must not hang or change state.
        session.disconnect().await;
        assert_eq!(session.current_state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_capture_failure_fails_connect() {
        let (port, _server) = spawn_service(Vec::new(), 0, false).await;
        let capture = Box::new(WavFileCapture::new("/nonexistent/mic.wav", None));
        let result = LiveSession::connect(&test_config(port), capture).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_dialing() {
        let config = Config {
            gemini: Some(GeminiConfig {
                api_key: None,
                api_key_env: "SHASTHO_TEST_UNSET_KEY".into(),
                base_url: None,
            }),
            ..Default::default()
        };
        let result = LiveSession::connect(&config, quiet_capture()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_back_to_back_sessions() {
        // A fresh connect after teardown establishes cleanly; the first
        // session's callbacks are dead by then.
        let (port1, _s1) = spawn_service(Vec::new(), 1, false).await;
        let (mut first, _e1) = LiveSession::connect(&test_config(port1), quiet_capture())
            .await
            .unwrap();
        first.disconnect().await;

        let (port2, _s2) = spawn_service(Vec::new(), 1, false).await;
        let (mut second, _e2) = LiveSession::connect(&test_config(port2), quiet_capture())
            .await
            .unwrap();
        assert_eq!(second.current_state(), ConnectionState::Connected);
        assert_eq!(first.current_state(), ConnectionState::Disconnected);
        second.disconnect().await;
    }

    #[test]
    fn test_outbound_queue_drops_when_full() {
        let (tx, _rx) = mpsc::channel::<Message>(1);
        let blob = MediaBlob {
            mime_type: "audio/pcm;rate=16000".into(),
            data: "AAAA".into(),
        };
        assert!(enqueue_media(&tx, blob.clone()));
        // Queue full: the frame is dropped, not blocked on.
        assert!(!enqueue_media(&tx, blob));
    }

    #[test]
    fn test_ws_endpoint_scheme_mapping() {
        let url = ws_endpoint(None, "k");
        assert!(url.starts_with("wss://generativelanguage.googleapis.com/ws/"));
        assert!(url.ends_with("?key=k"));

        let url = ws_endpoint(Some("https://example.test"), "k");
        assert!(url.starts_with("wss://example.test/ws/"));

        let url = ws_endpoint(Some("ws://127.0.0.1:9"), "k");
        assert!(url.starts_with("ws://127.0.0.1:9/ws/"));
    }
}
