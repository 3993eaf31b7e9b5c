//! HTTP integration tests against a live router
#![cfg(unix)]

mod common;

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{write_file, TestServer};

async fn get(server: &TestServer, path: &str) -> (StatusCode, Value) {
    let res = reqwest::get(server.url(path)).await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

async fn post(server: &TestServer, path: &str) -> (StatusCode, Value) {
    let res = reqwest::Client::new()
        .post(server.url(path))
        .send()
        .await
        .unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

async fn post_json(server: &TestServer, path: &str, body: &Value) -> (StatusCode, Value) {
    let res = reqwest::Client::new()
        .post(server.url(path))
        .json(body)
        .send()
        .await
        .unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

/// Poll build status until it leaves running/cancelling
async fn wait_for_build(server: &TestServer) -> Value {
    for _ in 0..100 {
        let (_, body) = get(server, "/api/build/status").await;
        let status = body["status"]["status"].as_str().unwrap().to_string();
        if status != "running" && status != "cancelling" {
            return body["status"].clone();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("build did not finish");
}

// ─────────────────────────────────────────────────────────
// Discovery
// ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_health_reports_adb_banner() {
    let server = TestServer::start().await;
    let (status, body) = get(&server, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["adb"], "Android Debug Bridge version 1.0.41");
}

#[tokio::test]
async fn test_devices_listing() {
    let server = TestServer::start().await;
    let (status, body) = get(&server, "/api/devices").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["devices"],
        json!([
            {
                "serial": "emulator-5554",
                "state": "device",
                "extras": "product:sdk_gphone64 model:Pixel_8 transport_id:1"
            },
            {
                "serial": "R58M12345",
                "state": "unauthorized",
                "extras": "usb:1-1 transport_id:2"
            }
        ])
    );
}

#[tokio::test]
async fn test_avds_listing() {
    let server = TestServer::start().await;
    let (status, body) = get(&server, "/api/avds").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "avds": ["Pixel_8_API_35"] }));
}

#[tokio::test]
async fn test_read_endpoints_accept_post() {
    let server = TestServer::start().await;
    let (status, body) = post(&server, "/api/build/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"]["status"], "idle");
}

// ─────────────────────────────────────────────────────────
// Routing and envelope
// ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unknown_endpoint() {
    let server = TestServer::start().await;
    let (status, body) = get(&server, "/api/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "ok": false, "error": "Unknown endpoint" }));

    // Mutating endpoints are POST-only
    let (status, body) = get(&server, "/api/build/start").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Unknown endpoint");
}

#[tokio::test]
async fn test_method_not_allowed() {
    let server = TestServer::start().await;
    let res = reqwest::Client::new()
        .put(server.url("/api/project"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "ok": false, "error": "Method not allowed" }));
}

#[tokio::test]
async fn test_missing_serial_is_validation_error() {
    let server = TestServer::start().await;
    for path in [
        "/api/device/rotate?mode=landscape",
        "/api/device/wifi?enabled=1",
        "/api/app/launch?pkg=com.example",
        "/api/emulator/kill",
    ] {
        let (status, body) = post(&server, path).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", path);
        assert_eq!(body, json!({ "ok": false, "error": "Missing ?serial=" }));
    }
    assert!(server.adb_calls().is_empty());
}

// ─────────────────────────────────────────────────────────
// Device actions
// ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_rotate_runs_both_commands() {
    let server = TestServer::start().await;
    let (status, body) = post(&server, "/api/device/rotate?serial=emulator-5554&mode=landscape").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));

    let calls = server.adb_calls();
    assert_eq!(
        calls,
        vec![
            "-s emulator-5554 shell settings put system accelerometer_rotation 0",
            "-s emulator-5554 shell settings put system user_rotation 1",
        ]
    );
}

#[tokio::test]
async fn test_parameter_validation_messages() {
    let server = TestServer::start().await;
    let cases = [
        ("/api/device/geo?serial=x&lat=abc&lon=1", "Missing ?lat=<number>&lon=<number>"),
        ("/api/device/battery?serial=x&level=150", "Missing ?level=0..100 (or ?mode=reset)"),
        ("/api/device/font-scale?serial=x&scale=3", "Missing ?scale=0.75..2.0"),
        ("/api/device/keyevent?serial=x&action=jump", "Invalid action"),
        ("/api/app/install?serial=x", "Missing ?apk=/path/to.apk"),
        ("/api/emulator/start", "Missing ?avd="),
    ];
    for (path, message) in cases {
        let (status, body) = post(&server, path).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", path);
        assert_eq!(body["error"], message, "{}", path);
    }
}

#[tokio::test]
async fn test_launch_reports_tool_output() {
    let server = TestServer::start().await;
    let (status, body) = post(&server, "/api/app/launch?serial=emulator-5554&pkg=com.example").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "output": "Events injected: 1" }));
}

#[tokio::test]
async fn test_tool_failure_surfaces_stderr() {
    let server = TestServer::start().await;
    let (status, body) = post(&server, "/api/device/theme?serial=bad&mode=dark").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({ "ok": false, "error": "error: device 'bad' not found" })
    );
}

#[tokio::test]
async fn test_install_by_artifact_name() {
    let server = TestServer::start().await;
    let root = server.project_root();
    write_file(&root.join("out/app-debug.apk"), b"apk");
    write_file(&server.dir.path().join("secret.apk"), b"apk");

    let (status, _) = post_json(
        &server,
        "/api/project",
        &json!({ "projectRoot": root.to_string_lossy(), "apkDir": "out" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(
        &server,
        "/api/app/install?serial=emulator-5554&artifact=app-debug.apk",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["output"], "Success");
    let expected = format!(
        "-s emulator-5554 install -r {}",
        root.join("out/app-debug.apk").display()
    );
    assert!(server.adb_calls().contains(&expected));

    let (status, body) = post(
        &server,
        "/api/app/install?serial=emulator-5554&artifact=../../secret.apk",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Artifact not found");
}

#[tokio::test]
async fn test_install_artifact_requires_configuration() {
    let server = TestServer::start().await;
    let (status, body) = post(&server, "/api/app/install?serial=x&artifact=app.apk").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Configure APK directory first");
}

#[tokio::test]
async fn test_emulator_start_and_network() {
    let server = TestServer::start().await;
    let (status, body) = post(&server, "/api/emulator/start?avd=Pixel_8&cold=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true, "message": "Starting emulator Pixel_8" }));

    let (status, _) = post(&server, "/api/emulator/net?serial=emulator-5554&speed=edge").await;
    assert_eq!(status, StatusCode::OK);
    let calls = server.adb_calls();
    assert!(calls.contains(&"-s emulator-5554 emu network speed edge".to_string()));
    assert!(calls.contains(&"-s emulator-5554 emu network delay none".to_string()));
}

// ─────────────────────────────────────────────────────────
// Project configuration
// ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_project_defaults_and_merge() {
    let server = TestServer::start().await;
    let (_, body) = get(&server, "/api/project").await;
    assert_eq!(body["project"]["projectRoot"], "");
    assert_eq!(body["project"]["autoLaunch"], true);

    let (status, body) = post_json(
        &server,
        "/api/project",
        &json!({ "packageName": "  com.example  ", "autoLaunch": false, "apkDir": 7 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["project"]["packageName"], "com.example");
    assert_eq!(body["project"]["autoLaunch"], false);
    assert_eq!(
        body["project"]["apkDir"],
        "android/app/build/outputs/apk/debug"
    );

    let (_, reread) = get(&server, "/api/project").await;
    assert_eq!(reread["project"], body["project"]);
}

#[tokio::test]
async fn test_project_invalid_json() {
    let server = TestServer::start().await;
    let res = reqwest::Client::new()
        .post(server.url("/api/project"))
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["ok"], false);
}

// ─────────────────────────────────────────────────────────
// Build lifecycle
// ─────────────────────────────────────────────────────────

async fn configure_build(server: &TestServer, command: &str) {
    let root = server.project_root();
    let (status, _) = post_json(
        server,
        "/api/project",
        &json!({ "projectRoot": root.to_string_lossy(), "buildCommand": command, "apkDir": "out" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_build_requires_configuration() {
    let server = TestServer::start().await;
    let (status, body) = post(&server, "/api/build/start").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Configure project root and build command first"
    );
}

#[tokio::test]
async fn test_build_success_and_log() {
    let server = TestServer::start().await;
    configure_build(&server, "echo compiling; mkdir -p out; echo x > out/app.apk").await;

    let (status, body) = post(&server, "/api/build/start").await;
    assert_eq!(status, StatusCode::OK);
    let build_id = body["buildId"].as_str().unwrap().to_string();

    let session = wait_for_build(&server).await;
    assert_eq!(session["status"], "success");
    assert_eq!(session["id"], build_id.as_str());
    assert_eq!(session["exitCode"], 0);
    assert!(session["finishedAt"].is_i64());

    let (_, body) = get(&server, "/api/build/log").await;
    assert_eq!(body["log"], "compiling\n");

    let (_, body) = get(&server, "/api/build/artifacts").await;
    let artifacts = body["artifacts"].as_array().unwrap();
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0]["name"], "app.apk");
    assert_eq!(artifacts[0]["size"], 2);
    assert!(artifacts[0].get("path").is_none());
}

#[tokio::test]
async fn test_build_conflict_and_cancel() {
    let server = TestServer::start().await;
    configure_build(&server, "echo started; sleep 5").await;

    let (status, body) = post(&server, "/api/build/start").await;
    assert_eq!(status, StatusCode::OK);
    let first_id = body["buildId"].clone();

    let (status, body) = post(&server, "/api/build/start").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Build already running");

    let (_, body) = get(&server, "/api/build/status").await;
    assert_eq!(body["status"]["id"], first_id);

    // Interrupt only once the command itself is running
    for _ in 0..100 {
        let (_, body) = get(&server, "/api/build/log").await;
        if body["log"].as_str().unwrap_or_default().contains("started") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let (status, body) = post(&server, "/api/build/cancel").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelling");

    let session = wait_for_build(&server).await;
    assert_eq!(session["status"], "cancelled");
    assert!(session["finishedAt"].is_i64());

    // Nothing left to cancel
    let (_, body) = post(&server, "/api/build/cancel").await;
    assert_eq!(body, json!({ "ok": true, "status": "cancelled" }));
}

#[tokio::test]
async fn test_build_failure_exit_code() {
    let server = TestServer::start().await;
    configure_build(&server, "echo broken >&2; exit 4").await;

    post(&server, "/api/build/start").await;
    let session = wait_for_build(&server).await;
    assert_eq!(session["status"], "failed");
    assert_eq!(session["exitCode"], 4);
    assert_eq!(session["error"], "Exited with code 4");

    let (_, body) = get(&server, "/api/build/log").await;
    assert_eq!(body["log"], "broken\n");
}
