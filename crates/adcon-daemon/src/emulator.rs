//! Emulator lifecycle: boot an AVD, kill a running instance, shape its network

use std::process::Stdio;

use adcon_core::prelude::*;
use tokio::process::Command;

use crate::adb::Adb;

/// Boot flags for [`launch_emulator`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Skip the quick-boot snapshot (`-no-snapshot-load`)
    pub cold: bool,
    /// Factory-reset user data (`-wipe-data`)
    pub wipe: bool,
}

/// Command-line arguments for booting `avd`
pub fn launch_args(avd: &str, options: LaunchOptions) -> Vec<String> {
    let mut args = vec![
        "-avd".to_string(),
        avd.to_string(),
        "-gpu".to_string(),
        "host".to_string(),
    ];
    if options.cold {
        args.push("-no-snapshot-load".to_string());
    }
    if options.wipe {
        args.push("-wipe-data".to_string());
    }
    args.push("-no-boot-anim".to_string());
    args
}

/// Boot an AVD in the background and return immediately.
///
/// The emulator runs detached in its own process group and outlives the
/// console; a task reaps it when it eventually exits.
pub fn launch_emulator(emulator: &str, avd: &str, options: LaunchOptions) -> Result<()> {
    let mut cmd = Command::new(emulator);
    cmd.args(launch_args(avd, options))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::tool_not_found(emulator)
        } else {
            Error::spawn(format!("emulator: {}", e))
        }
    })?;
    info!("Starting emulator {} (PID {:?})", avd, child.id());

    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => debug!("Emulator exited with {}", status),
            Err(e) => warn!("Error waiting for emulator: {}", e),
        }
    });

    Ok(())
}

/// Shut down the emulator behind `serial`
pub async fn kill_emulator(adb: &Adb, serial: &str) -> Result<()> {
    adb.checked_on(serial, ["emu", "kill"], "Failed to kill emulator")
        .await?;
    info!("Killed emulator {}", serial);
    Ok(())
}

/// Apply a network speed and latency profile (`full`/`lte`/`edge`…,
/// `none`/`umts`/`gprs`…). Both settings are attempted; the first failure is
/// reported.
pub async fn set_network_profile(adb: &Adb, serial: &str, speed: &str, delay: &str) -> Result<()> {
    let speed_result = adb
        .checked_on(
            serial,
            ["emu", "network", "speed", speed],
            "Network profile failed",
        )
        .await;
    let delay_result = adb
        .checked_on(
            serial,
            ["emu", "network", "delay", delay],
            "Network profile failed",
        )
        .await;
    speed_result?;
    delay_result?;
    Ok(())
}
