//! Shared harness: a live server on an ephemeral port backed by fake SDK tools

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use adcon_app::config::{Settings, StatePaths};
use adcon_daemon::test_utils::fake_tool;
use adcon_daemon::AndroidTools;
use adcon_server::{serve, AppState, SharedState};

/// Fake `adb`: every invocation is appended to `calls.log`.
///
/// The serial `bad` fails every command; everything else succeeds with
/// plausible output.
const FAKE_ADB: &str = r#"
echo "$*" >> "{calls}"
case "$*" in
  "-s bad "*) echo "error: device 'bad' not found" >&2; exit 1 ;;
  "version") echo "Android Debug Bridge version 1.0.41" ;;
  "devices -l")
    echo "List of devices attached"
    echo "emulator-5554          device product:sdk_gphone64 model:Pixel_8 transport_id:1"
    echo "R58M12345              unauthorized usb:1-1 transport_id:2"
    ;;
  *"exec-out screencap -p") printf '\211PNG\r\n\032\nframe' ;;
  *"shell monkey"*) echo "Events injected: 1" ;;
  *"install -r"*) echo "Success" ;;
  *" logcat") echo "I/Test: hello"; exec sleep 30 ;;
  *) ;;
esac
"#;

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: SharedState,
    pub dir: TempDir,
    calls: PathBuf,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        std::fs::create_dir(&bin).unwrap();
        let calls = dir.path().join("calls.log");

        let tools = AndroidTools {
            adb: fake_tool(
                &bin,
                "adb",
                &FAKE_ADB.replace("{calls}", &calls.to_string_lossy()),
            ),
            emulator: fake_tool(&bin, "emulator", "exit 0"),
            avdmanager: fake_tool(&bin, "avdmanager", "echo '    Name: Pixel_8_API_35'"),
        };

        let paths = StatePaths::new(dir.path().join("state"));
        paths.ensure().unwrap();
        let state = AppState::with_tools(paths, &Settings::default(), tools).shared();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(serve(listener, state.clone(), async {
            let _ = rx.await;
        }));

        Self {
            addr,
            state,
            dir,
            calls,
            shutdown: Some(tx),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    /// Project directory inside the temp dir
    pub fn project_root(&self) -> PathBuf {
        let root = self.dir.path().join("project");
        std::fs::create_dir_all(&root).unwrap();
        root
    }

    /// Every fake adb invocation so far, one per line
    pub fn adb_calls(&self) -> Vec<String> {
        std::fs::read_to_string(&self.calls)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Poll until an adb invocation containing `needle` shows up
    pub async fn wait_for_call(&self, needle: &str) -> bool {
        for _ in 0..100 {
            if self.adb_calls().iter().any(|c| c.contains(needle)) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        false
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub fn write_file(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, bytes).unwrap();
}
