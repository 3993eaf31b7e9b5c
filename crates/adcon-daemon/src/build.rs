//! Build command process
//!
//! The configured build command is a shell expression (`cd android &&
//! ./gradlew assembleDebug`), so it runs through `<shell> -c` in the project
//! root. It gets its own process group: an interrupt reaches Gradle and every
//! other process the shell started.

use std::path::Path;

use adcon_core::events::ProcessEvent;
use adcon_core::prelude::*;
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::process::{ProcessGroup, SupervisedProcess};

/// Spawn `shell -c command` in `cwd`
pub fn spawn_build(
    shell: &str,
    command: &str,
    cwd: &Path,
    event_tx: mpsc::Sender<ProcessEvent>,
) -> Result<SupervisedProcess> {
    let mut cmd = Command::new(shell);
    cmd.arg("-c").arg(command).current_dir(cwd);
    debug!("Spawning build: {} -c {:?} in {}", shell, command, cwd.display());
    SupervisedProcess::spawn("build", cmd, ProcessGroup::Own, event_tx)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::process::StopSignal;
    use std::time::Duration;

    async fn drain(rx: &mut mpsc::Receiver<ProcessEvent>) -> (String, ProcessEvent) {
        let mut text = String::new();
        loop {
            match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await {
                Ok(Some(ProcessEvent::Output(chunk))) => text.push_str(&chunk),
                Ok(Some(event)) => return (text, event),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_build_runs_compound_command_in_cwd() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("android")).unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        let _build = spawn_build("sh", "cd android && pwd && exit 3", dir.path(), tx).unwrap();

        let (text, exit) = drain(&mut rx).await;
        assert!(text.trim_end().ends_with("android"));
        assert_eq!(
            exit,
            ProcessEvent::Exited {
                code: Some(3),
                signal: None
            }
        );
    }

    #[tokio::test]
    async fn test_interrupt_stops_compound_command() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::channel(16);
        let mut build = spawn_build("sh", "sleep 30 && echo finished", dir.path(), tx).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(build.request_stop(StopSignal::Interrupt));

        let (text, exit) = drain(&mut rx).await;
        assert!(!text.contains("finished"));
        assert!(matches!(exit, ProcessEvent::Exited { .. }));
    }
}
