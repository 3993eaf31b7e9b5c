//! Continuous device log stream (`adb -s <serial> logcat`)

use adcon_core::events::ProcessEvent;
use adcon_core::prelude::*;
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::adb::Adb;
use crate::process::{ProcessGroup, SupervisedProcess};

/// Start tailing the device log of `serial`.
///
/// Output arrives on `event_tx` as raw chunks. Dropping the returned handle
/// sends SIGTERM to the tail process.
pub fn spawn_logcat(
    adb: &Adb,
    serial: &str,
    event_tx: mpsc::Sender<ProcessEvent>,
) -> Result<SupervisedProcess> {
    let mut cmd = Command::new(adb.path());
    cmd.args(["-s", serial, "logcat"]);
    SupervisedProcess::spawn("logcat", cmd, ProcessGroup::Inherit, event_tx)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_utils::fake_tool;
    use std::time::Duration;

    #[tokio::test]
    async fn test_logcat_streams_both_streams() {
        let dir = tempfile::tempdir().unwrap();
        let adb = Adb::new(fake_tool(
            dir.path(),
            "adb",
            r#"echo "I/ActivityManager: $2"; echo "W/System: warn" >&2"#,
        ));

        let (tx, mut rx) = mpsc::channel(16);
        let _process = spawn_logcat(&adb, "emulator-5554", tx).unwrap();

        let mut text = String::new();
        loop {
            match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await {
                Ok(Some(ProcessEvent::Output(chunk))) => text.push_str(&chunk),
                Ok(Some(ProcessEvent::Exited { .. })) => break,
                other => panic!("unexpected {:?}", other),
            }
        }
        assert!(text.contains("I/ActivityManager: emulator-5554"));
        assert!(text.contains("W/System: warn"));
    }

    #[tokio::test]
    async fn test_logcat_missing_adb() {
        let (tx, _rx) = mpsc::channel(1);
        let adb = Adb::new("/no/such/adb");
        assert!(spawn_logcat(&adb, "x", tx).is_err());
    }
}
