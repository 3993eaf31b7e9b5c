//! Log Tail Bridge
//!
//! Forwards the device log of one serial to one connection. No history is
//! replayed; the client sees output from the moment the tail starts.

use adcon_core::prelude::*;
use adcon_core::{ProcessEvent, SessionMessage};
use adcon_daemon::{spawn_logcat, Adb};
use tokio::sync::mpsc;

/// Capacity of the channel between the tail process and the session
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Stream `adb logcat` output for `serial` to `out` until the receiver is
/// dropped or the tail process ends.
///
/// The tail process is sent SIGTERM when the session returns.
pub async fn run_logcat_session(adb: &Adb, serial: &str, out: mpsc::Sender<SessionMessage>) {
    let (event_tx, mut event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

    let _process = match spawn_logcat(adb, serial, event_tx) {
        Ok(process) => process,
        Err(e) => {
            warn!("Log tail for {} failed to start: {}", serial, e);
            let _ = out.send(SessionMessage::error(e.to_string())).await;
            return;
        }
    };
    info!("Log tail started for {}", serial);

    loop {
        let event = tokio::select! {
            _ = out.closed() => {
                debug!("Log tail client for {} went away", serial);
                break;
            }
            event = event_rx.recv() => event,
        };

        match event {
            Some(ProcessEvent::Output(text)) => {
                if out.send(SessionMessage::log(text)).await.is_err() {
                    break;
                }
            }
            Some(ProcessEvent::Exited { code, signal }) => {
                info!("Log tail for {} ended (code {:?}, signal {:?})", serial, code, signal);
                let _ = out.send(SessionMessage::error(end_message(code))).await;
                break;
            }
            Some(ProcessEvent::SpawnFailed { reason }) => {
                let _ = out.send(SessionMessage::error(reason)).await;
                break;
            }
            None => break,
        }
    }
}

fn end_message(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("Log stream ended (exit {})", code),
        None => "Log stream ended".to_string(),
    }
}
