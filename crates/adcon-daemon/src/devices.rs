//! Device discovery via `adb devices -l`

use adcon_core::prelude::*;
use adcon_core::{Device, DeviceState};

use crate::adb::Adb;
use crate::runner::RunOptions;

/// Banner printed by the device bridge before the table
const LISTING_BANNER: &str = "List of devices attached";

/// List connected devices and emulators
pub async fn list_devices(adb: &Adb) -> Result<Vec<Device>> {
    let output = adb
        .run(["devices", "-l"], &RunOptions::default())
        .await
        .into_result("adb devices failed")?;

    let devices = parse_adb_devices(&String::from_utf8_lossy(&output.stdout));
    debug!("Discovered {} device(s)", devices.len());
    Ok(devices)
}

/// Parse the `adb devices -l` table.
///
/// Each row is `serial state [extras…]`. The banner, daemon start-up chatter
/// (`* daemon started successfully`), blank rows, and rows with fewer than two
/// tokens are dropped. Input order is preserved.
pub fn parse_adb_devices(output: &str) -> Vec<Device> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !line.starts_with(LISTING_BANNER) && !line.starts_with('*'))
        .filter_map(parse_device_line)
        .collect()
}

fn parse_device_line(line: &str) -> Option<Device> {
    let mut tokens = line.split_whitespace();
    let serial = tokens.next()?;
    let state = tokens.next()?;
    let extras = tokens.collect::<Vec<_>>().join(" ");

    Some(Device {
        serial: serial.to_string(),
        state: DeviceState::from(state),
        extras,
    })
}
