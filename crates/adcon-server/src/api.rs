//! JSON endpoints under `/api`
//!
//! Handlers validate query parameters, delegate to the daemon/app layers and
//! wrap the result in the `{ok: true, ...}` envelope. Failures go through
//! [`ApiError`](crate::error::ApiError).

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::Json;
use serde_json::{json, Value};

use adcon_app::build::CancelOutcome;
use adcon_app::config::{load_project_config, update_project_config};
use adcon_app::{find_artifact, list_artifacts};
use adcon_core::prelude::*;
use adcon_daemon::{
    kill_emulator, launch_emulator, list_avds, list_devices, set_network_profile, DeviceAction,
    LaunchOptions,
};

use crate::error::ApiResult;
use crate::SharedState;

/// Raw query string parameters
pub type Params = Query<HashMap<String, String>>;

fn param<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params.get(key).map(String::as_str)
}

/// A parameter that must be present and non-empty
fn required<'a>(params: &'a HashMap<String, String>, key: &str, message: &str) -> Result<&'a str> {
    param(params, key)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::validation(message))
}

pub(crate) fn serial(params: &HashMap<String, String>) -> Result<&str> {
    required(params, "serial", "Missing ?serial=")
}

fn ok() -> ApiResult {
    Ok(Json(json!({ "ok": true })))
}

// ─────────────────────────────────────────────────────────────────────────────
// Project & build
// ─────────────────────────────────────────────────────────────────────────────

pub async fn get_project(State(state): State<SharedState>) -> ApiResult {
    let project = load_project_config(state.paths.root());
    Ok(Json(json!({ "ok": true, "project": project })))
}

pub async fn post_project(State(state): State<SharedState>, body: Bytes) -> ApiResult {
    let update: Value = if body.iter().all(u8::is_ascii_whitespace) {
        json!({})
    } else {
        serde_json::from_slice(&body).map_err(Error::from)?
    };
    let project = update_project_config(state.paths.root(), &update)?;
    info!("Project configuration updated");
    Ok(Json(json!({ "ok": true, "project": project })))
}

pub async fn build_start(State(state): State<SharedState>) -> ApiResult {
    let project = load_project_config(state.paths.root());
    let build_id = state.supervisor.start(&project)?;
    Ok(Json(json!({ "ok": true, "buildId": build_id })))
}

pub async fn build_status(State(state): State<SharedState>) -> ApiResult {
    Ok(Json(json!({ "ok": true, "status": state.supervisor.status() })))
}

pub async fn build_log(State(state): State<SharedState>) -> ApiResult {
    let log = state.supervisor.log()?;
    Ok(Json(json!({ "ok": true, "log": log })))
}

pub async fn build_cancel(State(state): State<SharedState>) -> ApiResult {
    let status = match state.supervisor.cancel() {
        CancelOutcome::Requested => state.supervisor.status().status,
        CancelOutcome::NotRunning(status) => status,
    };
    Ok(Json(json!({ "ok": true, "status": status })))
}

pub async fn build_artifacts(State(state): State<SharedState>) -> ApiResult {
    let project = load_project_config(state.paths.root());
    let artifacts = list_artifacts(&project);
    Ok(Json(json!({ "ok": true, "artifacts": artifacts })))
}

// ─────────────────────────────────────────────────────────────────────────────
// Discovery
// ─────────────────────────────────────────────────────────────────────────────

pub async fn health(State(state): State<SharedState>) -> ApiResult {
    let adb = match state.adb.version().await {
        Ok(banner) => banner,
        Err(message) => message,
    };
    Ok(Json(json!({ "ok": true, "adb": adb })))
}

pub async fn devices(State(state): State<SharedState>) -> ApiResult {
    let devices = list_devices(&state.adb).await?;
    Ok(Json(json!({ "ok": true, "devices": devices })))
}

pub async fn avds(State(state): State<SharedState>) -> ApiResult {
    let avds = list_avds(&state.tools).await?;
    Ok(Json(json!({ "ok": true, "avds": avds })))
}

// ─────────────────────────────────────────────────────────────────────────────
// Emulator lifecycle
// ─────────────────────────────────────────────────────────────────────────────

pub async fn emulator_start(State(state): State<SharedState>, Query(params): Params) -> ApiResult {
    let avd = required(&params, "avd", "Missing ?avd=")?;
    let options = LaunchOptions {
        cold: param(&params, "cold") == Some("1"),
        wipe: param(&params, "wipe") == Some("1"),
    };
    launch_emulator(&state.tools.emulator, avd, options)?;
    Ok(Json(json!({ "ok": true, "message": format!("Starting emulator {}", avd) })))
}

pub async fn emulator_kill(State(state): State<SharedState>, Query(params): Params) -> ApiResult {
    let serial = serial(&params)?;
    kill_emulator(&state.adb, serial).await?;
    ok()
}

pub async fn emulator_net(State(state): State<SharedState>, Query(params): Params) -> ApiResult {
    let serial = serial(&params)?;
    let speed = param(&params, "speed").unwrap_or("full");
    let delay = param(&params, "delay").unwrap_or("none");
    set_network_profile(&state.adb, serial, speed, delay).await?;
    ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// One-shot device actions
// ─────────────────────────────────────────────────────────────────────────────

/// Check the serial, build the action from the query, run it.
///
/// The serial is validated first so a request missing everything reports the
/// serial.
async fn run_action(
    state: &SharedState,
    params: &HashMap<String, String>,
    build: impl FnOnce(&HashMap<String, String>) -> Result<DeviceAction>,
) -> ApiResult {
    let serial = serial(params)?;
    let action = build(params)?;
    let output = action.apply(&state.adb, serial).await?;
    if action.reports_output() {
        Ok(Json(json!({ "ok": true, "output": output })))
    } else {
        ok()
    }
}

pub async fn rotate(State(state): State<SharedState>, Query(params): Params) -> ApiResult {
    run_action(&state, &params, |p| Ok(DeviceAction::rotate(param(p, "mode")))).await
}

pub async fn wifi(State(state): State<SharedState>, Query(params): Params) -> ApiResult {
    run_action(&state, &params, |p| DeviceAction::wifi(param(p, "enabled"))).await
}

pub async fn mobile_data(State(state): State<SharedState>, Query(params): Params) -> ApiResult {
    run_action(&state, &params, |p| DeviceAction::mobile_data(param(p, "enabled"))).await
}

pub async fn geo(State(state): State<SharedState>, Query(params): Params) -> ApiResult {
    run_action(&state, &params, |p| {
        DeviceAction::geo(param(p, "lat"), param(p, "lon"))
    })
    .await
}

pub async fn battery(State(state): State<SharedState>, Query(params): Params) -> ApiResult {
    run_action(&state, &params, |p| {
        DeviceAction::battery(param(p, "mode"), param(p, "level"), param(p, "charging"))
    })
    .await
}

pub async fn theme(State(state): State<SharedState>, Query(params): Params) -> ApiResult {
    run_action(&state, &params, |p| Ok(DeviceAction::theme(param(p, "mode")))).await
}

pub async fn locale(State(state): State<SharedState>, Query(params): Params) -> ApiResult {
    run_action(&state, &params, |p| DeviceAction::locale(param(p, "locale"))).await
}

pub async fn font_scale(State(state): State<SharedState>, Query(params): Params) -> ApiResult {
    run_action(&state, &params, |p| DeviceAction::font_scale(param(p, "scale"))).await
}

pub async fn key_event(State(state): State<SharedState>, Query(params): Params) -> ApiResult {
    run_action(&state, &params, |p| DeviceAction::key(param(p, "action"))).await
}

pub async fn launch(State(state): State<SharedState>, Query(params): Params) -> ApiResult {
    run_action(&state, &params, |p| DeviceAction::launch(param(p, "pkg"))).await
}

pub async fn clear_data(State(state): State<SharedState>, Query(params): Params) -> ApiResult {
    run_action(&state, &params, |p| DeviceAction::clear_data(param(p, "pkg"))).await
}

pub async fn deep_link(State(state): State<SharedState>, Query(params): Params) -> ApiResult {
    run_action(&state, &params, |p| DeviceAction::deep_link(param(p, "url"))).await
}

/// Install from `?artifact=<name>` (resolved in the artifact dir) or
/// `?apk=<path>`
pub async fn install(State(state): State<SharedState>, Query(params): Params) -> ApiResult {
    let paths = state.paths.clone();
    run_action(&state, &params, move |p| {
        let apk = match param(p, "artifact").filter(|name| !name.is_empty()) {
            Some(name) => {
                let project = load_project_config(paths.root());
                find_artifact(&project, name)?.to_string_lossy().into_owned()
            }
            None => required(p, "apk", "Missing ?apk=/path/to.apk")?.to_string(),
        };
        Ok(DeviceAction::Install { apk })
    })
    .await
}
