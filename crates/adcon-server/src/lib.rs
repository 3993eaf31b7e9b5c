//! # adcon-server - HTTP/WebSocket front door
//!
//! Routes requests to the daemon and app layers and converts every failure
//! into the `{ok:false, error}` envelope.
//!
//! ## Public API
//!
//! - [`AppState`], [`SharedState`] - Everything handlers need, built once at startup
//! - [`router`] - The full route table
//! - [`serve`] - Run the router on a bound listener until shutdown
//!
//! ## Routes
//!
//! | Path | Methods |
//! |------|---------|
//! | `/api/health`, `/api/devices`, `/api/avds` | GET, POST |
//! | `/api/project` | GET, POST |
//! | `/api/build/status`, `/api/build/log`, `/api/build/artifacts` | GET, POST |
//! | `/api/build/start`, `/api/build/cancel` | POST |
//! | `/api/emulator/{start,kill,net}` | POST |
//! | `/api/device/{rotate,wifi,data,geo,battery,theme,locale,font-scale,keyevent}` | POST |
//! | `/api/app/{install,launch,clear,deeplink}` | POST |
//! | `/ws/screen`, `/ws/logcat`, `/ws/build-log` | WebSocket |

use std::future::Future;
use std::sync::Arc;

use axum::handler::Handler;
use axum::http::{Method, StatusCode, Uri};
use axum::response::Response;
use axum::routing::{get, post, MethodRouter};
use axum::Router;
use tokio::net::TcpListener;

use adcon_app::config::{ScreenSettings, Settings, StatePaths};
use adcon_app::{BuildSupervisor, ScreenRegistry};
use adcon_core::prelude::*;
use adcon_daemon::{Adb, AndroidTools};

pub mod api;
pub mod error;
pub mod ws;

pub use error::{ApiError, ApiResult};

/// Shared handler state
pub type SharedState = Arc<AppState>;

/// Process-wide state behind every route
#[derive(Debug)]
pub struct AppState {
    pub paths: StatePaths,
    pub tools: AndroidTools,
    pub adb: Adb,
    pub screen: ScreenSettings,
    pub supervisor: BuildSupervisor,
    pub screens: ScreenRegistry,
}

impl AppState {
    /// Resolve tools and create the build supervisor for `paths`
    pub fn new(paths: StatePaths, settings: &Settings) -> Self {
        let tools = AndroidTools::resolve(&settings.tools);
        Self::with_tools(paths, settings, tools)
    }

    /// Like [`AppState::new`] with already-resolved tools
    pub fn with_tools(paths: StatePaths, settings: &Settings, tools: AndroidTools) -> Self {
        let supervisor = BuildSupervisor::new(paths.build_logs_dir(), settings.build.shell.clone());
        Self {
            adb: tools.adb(),
            tools,
            screen: settings.screen.clone(),
            supervisor,
            screens: ScreenRegistry::new(),
            paths,
        }
    }

    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }
}

/// GET or POST: read-only endpoints accept either
fn read<H, T>(handler: H) -> MethodRouter<SharedState>
where
    H: Handler<T, SharedState>,
    T: 'static,
{
    get(handler.clone()).post(handler).fallback(unmatched)
}

fn write<H, T>(handler: H) -> MethodRouter<SharedState>
where
    H: Handler<T, SharedState>,
    T: 'static,
{
    post(handler).fallback(unmatched)
}

/// Build the complete route table
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/health", read(api::health))
        .route("/api/devices", read(api::devices))
        .route("/api/avds", read(api::avds))
        .route(
            "/api/project",
            get(api::get_project)
                .post(api::post_project)
                .fallback(unmatched),
        )
        .route("/api/build/start", write(api::build_start))
        .route("/api/build/status", read(api::build_status))
        .route("/api/build/log", read(api::build_log))
        .route("/api/build/cancel", write(api::build_cancel))
        .route("/api/build/artifacts", read(api::build_artifacts))
        .route("/api/emulator/start", write(api::emulator_start))
        .route("/api/emulator/kill", write(api::emulator_kill))
        .route("/api/emulator/net", write(api::emulator_net))
        .route("/api/device/rotate", write(api::rotate))
        .route("/api/device/wifi", write(api::wifi))
        .route("/api/device/data", write(api::mobile_data))
        .route("/api/device/geo", write(api::geo))
        .route("/api/device/battery", write(api::battery))
        .route("/api/device/theme", write(api::theme))
        .route("/api/device/locale", write(api::locale))
        .route("/api/device/font-scale", write(api::font_scale))
        .route("/api/device/keyevent", write(api::key_event))
        .route("/api/app/install", write(api::install))
        .route("/api/app/launch", write(api::launch))
        .route("/api/app/clear", write(api::clear_data))
        .route("/api/app/deeplink", write(api::deep_link))
        .route("/ws/screen", get(ws::screen))
        .route("/ws/logcat", get(ws::logcat))
        .route("/ws/build-log", get(ws::build_log))
        .fallback(unmatched)
        .with_state(state)
}

/// Unknown path, or a known path with the wrong method
async fn unmatched(method: Method, uri: Uri) -> Response {
    if method != Method::GET && method != Method::POST {
        return error::envelope_error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
    }
    let message = if uri.path().starts_with("/api/") {
        "Unknown endpoint"
    } else {
        "Not found"
    };
    error::envelope_error(StatusCode::NOT_FOUND, message)
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: SharedState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Listening on http://{}", addr);
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("Server stopped");
    Ok(())
}
