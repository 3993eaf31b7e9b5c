//! adcon - A local web console for Android devices, emulators and the build loop
//!
//! This is the binary entry point. All logic lives in the workspace crates.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tokio::net::TcpListener;

use adcon_app::config::{default_state_dir, load_settings, StatePaths};
use adcon_server::{serve, AppState};

/// How long a running build gets to react to the interrupt on shutdown
const BUILD_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// adcon - Android device, emulator and build console
#[derive(Parser, Debug)]
#[command(name = "adcon", version)]
#[command(about = "A local web console for Android devices, emulators and builds", long_about = None)]
struct Args {
    /// Address to listen on (overrides config.toml)
    #[arg(long, env = "ANDROID_DEV_UI_HOST")]
    host: Option<IpAddr>,

    /// Port to listen on (overrides config.toml)
    #[arg(long, env = "ANDROID_DEV_UI_PORT")]
    port: Option<u16>,

    /// Directory holding config.toml, project.json and logs
    #[arg(long, env = "ANDROID_DEV_UI_STATE", value_name = "DIR")]
    state_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let paths = StatePaths::new(args.state_dir.unwrap_or_else(default_state_dir));
    paths
        .ensure()
        .wrap_err_with(|| format!("Cannot create state directory {}", paths.root().display()))?;
    let _log_guard = adcon_core::logging::init(&paths.logs_dir()).wrap_err("Cannot initialize logging")?;

    let settings = load_settings(paths.root());
    let addr = SocketAddr::new(
        args.host.unwrap_or(settings.server.host),
        args.port.unwrap_or(settings.server.port),
    );

    let state = AppState::new(paths, &settings).shared();
    let listener = TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("Cannot listen on {}", addr))?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Ctrl-C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown requested");
    };

    serve(listener, state.clone(), shutdown).await?;
    state.supervisor.shutdown(BUILD_SHUTDOWN_GRACE).await;
    Ok(())
}
