//! Screen Mirroring Loop
//!
//! One session per `/ws/screen` connection:
//!
//! ```text
//! Connecting ──▶ Streaming ──(stop / socket closed)──▶ Idle
//! ```
//!
//! The capture loop is self-paced: each cycle captures one frame, measures
//! how long that took, and sleeps `max(20ms, interval − elapsed)`. The next
//! capture is only issued after the previous one returned, so a session never
//! has two captures in flight. Touch input arrives on a separate channel and
//! is injected independently of the capture cadence.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use adcon_core::prelude::*;
use adcon_core::{encode_frame, InputEvent, FRAME_TAG_PNG};
use adcon_daemon::{capture_png, inject_input, Adb};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

/// Fastest capture cadence a client may request
pub const MIN_INTERVAL_MS: u64 = 80;

/// Slowest capture cadence a client may request
pub const MAX_INTERVAL_MS: u64 = 2000;

/// Floor on the pause between two captures
pub const MIN_CAPTURE_DELAY: Duration = Duration::from_millis(20);

/// Clamp a requested interval into `[MIN_INTERVAL_MS, MAX_INTERVAL_MS]`
pub fn clamp_interval(ms: u64) -> u64 {
    ms.clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS)
}

/// Interval for a raw `intervalMs` query value.
///
/// Missing or non-numeric values use `default_ms`; the result is clamped.
pub fn parse_interval(raw: Option<&str>, default_ms: u64) -> Duration {
    let ms = raw
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.max(0.0).floor() as u64)
        .unwrap_or(default_ms);
    Duration::from_millis(clamp_interval(ms))
}

/// Pause before the next capture after one that took `elapsed`
pub fn next_delay(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed).max(MIN_CAPTURE_DELAY)
}

/// Frame source and input sink for one device
#[trait_variant::make(DeviceScreen: Send)]
pub trait LocalDeviceScreen {
    /// Capture one PNG frame
    async fn capture(&self) -> Result<Vec<u8>>;

    /// Inject a tap or swipe
    async fn inject(&self, event: InputEvent) -> Result<()>;
}

/// [`DeviceScreen`] backed by the device bridge
#[derive(Debug, Clone)]
pub struct AdbScreen {
    adb: Adb,
    serial: String,
    capture_timeout: Option<Duration>,
}

impl AdbScreen {
    pub fn new(adb: Adb, serial: impl Into<String>, capture_timeout: Option<Duration>) -> Self {
        Self {
            adb,
            serial: serial.into(),
            capture_timeout,
        }
    }
}

impl DeviceScreen for AdbScreen {
    async fn capture(&self) -> Result<Vec<u8>> {
        capture_png(&self.adb, &self.serial, self.capture_timeout).await
    }

    async fn inject(&self, event: InputEvent) -> Result<()> {
        inject_input(&self.adb, &self.serial, &event).await
    }
}

/// Outbound message of a mirroring session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenOutput {
    /// Binary frame: tag byte followed by the image
    Frame(Vec<u8>),
    /// Transient capture failure; the session continues
    Error(String),
}

/// Run the capture loop until `stop` is set or `out` closes.
///
/// A capture already in flight when `stop` is set completes and its result is
/// discarded.
pub async fn run_capture_loop<S: DeviceScreen>(
    screen: &S,
    interval: Duration,
    out: &mpsc::Sender<ScreenOutput>,
    mut stop: watch::Receiver<bool>,
) {
    let mut delay = Duration::ZERO;
    let mut frames: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = stop.wait_for(|stopped| *stopped) => break,
            _ = tokio::time::sleep(delay) => {}
        }

        let started = Instant::now();
        let result = screen.capture().await;
        if is_stopped(&stop) {
            trace!("Discarding capture finished after stop");
            break;
        }

        let message = match result {
            Ok(png) => {
                frames += 1;
                delay = next_delay(interval, started.elapsed());
                trace!("Frame {} ({} bytes), next in {:?}", frames, png.len(), delay);
                ScreenOutput::Frame(encode_frame(FRAME_TAG_PNG, &png))
            }
            Err(e) => {
                delay = interval;
                warn!("Screen capture failed: {}", e);
                ScreenOutput::Error(e.to_string())
            }
        };

        if out.send(message).await.is_err() {
            debug!("Screen output closed");
            break;
        }
    }

    debug!("Capture loop ended after {} frame(s)", frames);
}

/// Inject every well-formed input message until `input` closes or `stop` is
/// set. Malformed messages are ignored.
pub async fn run_input_loop<S: DeviceScreen>(
    screen: &S,
    input: &mut mpsc::Receiver<String>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        let text = tokio::select! {
            biased;
            _ = stop.wait_for(|stopped| *stopped) => break,
            text = input.recv() => match text {
                Some(text) => text,
                None => break,
            },
        };

        let Some(event) = InputEvent::parse(&text) else {
            trace!("Ignoring input message: {}", text);
            continue;
        };
        if let Err(e) = screen.inject(event).await {
            warn!("Input injection failed: {}", e);
        }
    }
}

/// Run a full mirroring session: capture loop and input loop side by side.
///
/// Returns once both have ended; closing `input` ends the input side only,
/// so the caller signals `stop` when the connection goes away.
pub async fn run_screen_session<S: DeviceScreen + Sync>(
    screen: S,
    interval: Duration,
    out: mpsc::Sender<ScreenOutput>,
    mut input: mpsc::Receiver<String>,
    stop: watch::Receiver<bool>,
) {
    info!("Screen session started (interval {:?})", interval);
    tokio::join!(
        run_capture_loop(&screen, interval, &out, stop.clone()),
        run_input_loop(&screen, &mut input, stop),
    );
    info!("Screen session ended");
}

fn is_stopped(stop: &watch::Receiver<bool>) -> bool {
    *stop.borrow() || stop.has_changed().is_err()
}

// ─────────────────────────────────────────────────────────────────────────────
// Session registry
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct RegistryInner {
    next_token: u64,
    sessions: HashMap<String, (u64, Arc<watch::Sender<bool>>)>,
}

/// Tracks live mirroring sessions by client key.
///
/// Registering a key that already has a session stops the previous one, so a
/// reconnecting control never leaves two capture loops racing.
#[derive(Debug, Clone, Default)]
pub struct ScreenRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl ScreenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Open a session, stopping any prior session registered under `client`.
    ///
    /// Sessions without a key are tracked only by their lease.
    pub fn open(&self, client: Option<&str>) -> ScreenLease {
        let (stop_tx, _) = watch::channel(false);
        let stop = Arc::new(stop_tx);

        let mut inner = self.lock();
        inner.next_token += 1;
        let token = inner.next_token;

        let key = client.filter(|k| !k.is_empty()).map(str::to_string);
        if let Some(key) = &key {
            if let Some((_, previous)) = inner.sessions.insert(key.clone(), (token, Arc::clone(&stop))) {
                info!("Screen client {:?} reconnected, stopping previous session", key);
                previous.send_replace(true);
            }
        }

        ScreenLease {
            registry: self.clone(),
            key,
            token,
            stop,
        }
    }

    /// Number of keyed sessions
    pub fn len(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, key: &str, token: u64) {
        let mut inner = self.lock();
        if inner.sessions.get(key).is_some_and(|(t, _)| *t == token) {
            inner.sessions.remove(key);
        }
    }
}

/// Ownership of one mirroring session's stop signal.
///
/// Dropping the lease stops the session and unregisters it.
pub struct ScreenLease {
    registry: ScreenRegistry,
    key: Option<String>,
    token: u64,
    stop: Arc<watch::Sender<bool>>,
}

impl ScreenLease {
    /// Receiver that flips to `true` when the session must stop
    pub fn stop_signal(&self) -> watch::Receiver<bool> {
        self.stop.subscribe()
    }

    #[cfg(test)]
    pub fn is_stopped(&self) -> bool {
        *self.stop.borrow()
    }
}

impl Drop for ScreenLease {
    fn drop(&mut self) {
        self.stop.send_replace(true);
        if let Some(key) = &self.key {
            self.registry.release(key, self.token);
        }
    }
}
