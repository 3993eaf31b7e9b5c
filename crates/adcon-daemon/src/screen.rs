//! Screen capture and touch injection through the device bridge

use std::time::Duration;

use adcon_core::prelude::*;
use adcon_core::InputEvent;

use crate::adb::Adb;
use crate::runner::RunOptions;

/// Capture one PNG frame with `adb exec-out screencap -p`.
///
/// A nonzero exit or empty output is an error carrying the tool's stderr, or
/// `screencap failed (exit N)` when stderr is empty. `timeout` bounds a hung
/// bridge call.
pub async fn capture_png(adb: &Adb, serial: &str, timeout: Option<Duration>) -> Result<Vec<u8>> {
    let options = RunOptions::binary().with_timeout(timeout);
    let output = adb
        .run_on(serial, ["exec-out", "screencap", "-p"], &options)
        .await;

    if let Some(err) = output.error {
        return Err(Error::upstream(err));
    }
    if output.status != 0 || output.stdout.is_empty() {
        let stderr = output.stderr_text();
        let message = if stderr.is_empty() {
            format!("screencap failed (exit {})", output.status)
        } else {
            stderr
        };
        return Err(Error::upstream(message));
    }

    trace!("Captured {} byte frame from {}", output.stdout.len(), serial);
    Ok(output.stdout)
}

/// Inject a tap or swipe with `adb shell input …`
pub async fn inject_input(adb: &Adb, serial: &str, event: &InputEvent) -> Result<()> {
    let mut args = vec!["shell".to_string()];
    args.extend(event.shell_args());
    adb.run_on(serial, &args, &RunOptions::default())
        .await
        .into_result("input failed")?;
    Ok(())
}
