//! WebSocket endpoints
//!
//! Each connection owns its session: closing the socket stops the capture
//! loop or terminates the log tail process. The build log stream only
//! observes the supervisor and never affects the build.

use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use adcon_app::build::BuildSubscription;
use adcon_app::{parse_interval, run_logcat_session, run_screen_session, AdbScreen, ScreenOutput};
use adcon_core::prelude::*;
use adcon_core::SessionMessage;

use crate::api::{self, Params};
use crate::SharedState;

/// Frames buffered between the capture loop and the socket writer
const FRAME_BUFFER: usize = 4;

/// Inbound input messages buffered ahead of injection
const INPUT_BUFFER: usize = 64;

/// Log chunks buffered between the tail process and the socket
const LOG_BUFFER: usize = 256;

type WsSender = SplitSink<WebSocket, Message>;

async fn send_json(sender: &mut WsSender, message: &SessionMessage) -> bool {
    sender
        .send(Message::Text(message.to_json().into()))
        .await
        .is_ok()
}

/// Wait for the client to go away. Anything it sends is ignored.
async fn closed_by_client(receiver: &mut SplitStream<WebSocket>) {
    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Close(_)) | Err(_) => return,
            Ok(_) => {}
        }
    }
}

/// Report a connection-level error and close
async fn reject(socket: WebSocket, error: &str) {
    let (mut sender, _receiver) = socket.split();
    send_json(&mut sender, &SessionMessage::error(error)).await;
    let _ = sender.close().await;
}

fn serial_or_error(params: &HashMap<String, String>) -> std::result::Result<String, String> {
    api::serial(params)
        .map(str::to_string)
        .map_err(|e| e.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// /ws/screen
// ─────────────────────────────────────────────────────────────────────────────

pub async fn screen(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
    Query(params): Params,
) -> Response {
    ws.on_upgrade(move |socket| screen_session(socket, state, params))
}

async fn screen_session(socket: WebSocket, state: SharedState, params: HashMap<String, String>) {
    let serial = match serial_or_error(&params) {
        Ok(serial) => serial,
        Err(error) => return reject(socket, &error).await,
    };
    let interval = parse_interval(
        params.get("intervalMs").map(String::as_str),
        state.screen.default_interval_ms,
    );
    let lease = state.screens.open(params.get("client").map(String::as_str));
    let mut stop = lease.stop_signal();

    let device = AdbScreen::new(state.adb.clone(), serial.clone(), state.screen.capture_timeout());
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel(FRAME_BUFFER);
    let (input_tx, input_rx) = mpsc::channel(INPUT_BUFFER);

    info!("Screen client connected for {}", serial);
    let session = tokio::spawn(run_screen_session(
        device,
        interval,
        out_tx,
        input_rx,
        stop.clone(),
    ));

    // Frames out; ends once the session drops its sender
    let writer = tokio::spawn(async move {
        while let Some(output) = out_rx.recv().await {
            let message = match output {
                ScreenOutput::Frame(bytes) => Message::Binary(bytes.into()),
                ScreenOutput::Error(error) => {
                    Message::Text(SessionMessage::error(error).to_json().into())
                }
            };
            if ws_tx.send(message).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    // Input in, until the client leaves or a newer session takes over
    loop {
        tokio::select! {
            _ = stop.wait_for(|stopped| *stopped) => {
                info!("Screen session for {} replaced", serial);
                break;
            }
            message = ws_rx.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    if input_tx.try_send(text.as_str().to_owned()).is_err() {
                        trace!("Input backlog full, dropping message");
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    drop(lease);
    drop(input_tx);
    let _ = session.await;
    let _ = writer.await;
    info!("Screen client for {} disconnected", serial);
}

// ─────────────────────────────────────────────────────────────────────────────
// /ws/logcat
// ─────────────────────────────────────────────────────────────────────────────

pub async fn logcat(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
    Query(params): Params,
) -> Response {
    ws.on_upgrade(move |socket| logcat_session(socket, state, params))
}

async fn logcat_session(socket: WebSocket, state: SharedState, params: HashMap<String, String>) {
    let serial = match serial_or_error(&params) {
        Ok(serial) => serial,
        Err(error) => return reject(socket, &error).await,
    };

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel(LOG_BUFFER);
    let adb = state.adb.clone();
    let tail = tokio::spawn(async move { run_logcat_session(&adb, &serial, out_tx).await });

    loop {
        tokio::select! {
            message = out_rx.recv() => match message {
                Some(message) => {
                    if !send_json(&mut ws_tx, &message).await {
                        break;
                    }
                }
                None => break,
            },
            _ = closed_by_client(&mut ws_rx) => break,
        }
    }

    // The tail notices the dropped receiver and terminates its process
    drop(out_rx);
    let _ = tail.await;
    let _ = ws_tx.close().await;
}

// ─────────────────────────────────────────────────────────────────────────────
// /ws/build-log
// ─────────────────────────────────────────────────────────────────────────────

pub async fn build_log(ws: WebSocketUpgrade, State(state): State<SharedState>) -> Response {
    ws.on_upgrade(move |socket| build_log_session(socket, state))
}

async fn build_log_session(socket: WebSocket, state: SharedState) {
    let BuildSubscription {
        backlog,
        status,
        mut receiver,
    } = state.supervisor.subscribe();
    let (mut ws_tx, mut ws_rx) = socket.split();

    if !backlog.is_empty() && !send_json(&mut ws_tx, &SessionMessage::log(backlog)).await {
        return;
    }
    if !send_json(&mut ws_tx, &SessionMessage::State { status }).await {
        return;
    }

    loop {
        tokio::select! {
            message = receiver.recv() => match message {
                Some(message) => {
                    if !send_json(&mut ws_tx, &message).await {
                        break;
                    }
                }
                None => break,
            },
            _ = closed_by_client(&mut ws_rx) => break,
        }
    }
    debug!("Build log listener left");
}
