//! Build Supervisor
//!
//! Owns at most one build process for the whole console, its append-only log
//! file, and the set of `/ws/build-log` listeners.
//!
//! ```text
//! idle ─start─▶ running ─exit─▶ success | failed | cancelled
//!                  │
//!                cancel
//!                  ▼
//!              cancelling ─exit─▶ cancelled | failed | success
//! ```
//!
//! All state sits behind one mutex. Log chunks are written to the file and
//! broadcast while holding it, and a joining listener reads its backlog and
//! subscribes while holding it, so a listener sees every chunk exactly once.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use adcon_core::events::ProcessEvent;
use adcon_core::prelude::*;
use adcon_core::{now_millis, BuildSession, BuildStatus, SessionMessage};
use adcon_daemon::{spawn_build, StopSignal, SupervisedProcess};
use tokio::sync::mpsc;

use crate::broadcast::Broadcaster;
use crate::config::ProjectConfig;

/// Event buffer between the build process and the supervisor
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Exit status a shell reports for a child killed by SIGINT
const SHELL_INTERRUPTED_EXIT: i32 = 130;

/// What a listener gets on joining
#[derive(Debug)]
pub struct BuildSubscription {
    /// Log so far (active build, else the latest one); may be empty
    pub backlog: String,
    pub status: BuildStatus,
    /// Live log chunks and state transitions
    pub receiver: mpsc::UnboundedReceiver<SessionMessage>,
}

/// Result of a cancel request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Interrupt delivered; the exit handler will finalize
    Requested,
    /// Nothing to cancel; carries the unchanged status
    NotRunning(BuildStatus),
}

#[derive(Default)]
struct BuildState {
    session: BuildSession,
    process: Option<SupervisedProcess>,
    log: Option<File>,
    listeners: Broadcaster<SessionMessage>,
    last_id: i64,
}

struct Inner {
    logs_dir: PathBuf,
    shell: String,
    state: Mutex<BuildState>,
}

/// Process-wide build lifecycle manager. Cheap to clone.
#[derive(Clone)]
pub struct BuildSupervisor {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for BuildSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildSupervisor")
            .field("logs_dir", &self.inner.logs_dir)
            .field("shell", &self.inner.shell)
            .finish()
    }
}

impl BuildSupervisor {
    /// `logs_dir` receives one `build-<id>.log` per build; `shell` runs the
    /// build command as `<shell> -c <command>`
    pub fn new(logs_dir: impl Into<PathBuf>, shell: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                logs_dir: logs_dir.into(),
                shell: shell.into(),
                state: Mutex::new(BuildState::default()),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BuildState> {
        // A panic while holding the lock leaves the state readable.
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start a build of `project`, returning the new build id.
    ///
    /// Rejected with [`Error::Conflict`] while a build is running and with
    /// [`Error::Validation`] when the project has no root or command. A
    /// command that cannot be spawned still returns the id; the session is
    /// then already `failed` with the spawn error recorded.
    pub fn start(&self, project: &ProjectConfig) -> Result<String> {
        let mut state = self.lock();

        if state.session.status.is_active() {
            return Err(Error::conflict("Build already running"));
        }
        if !project.is_buildable() {
            return Err(Error::validation(
                "Configure project root and build command first",
            ));
        }

        let id_millis = now_millis().max(state.last_id + 1);
        let id = id_millis.to_string();
        let log_path = self.inner.logs_dir.join(format!("build-{}.log", id));

        let log = match open_log(&self.inner.logs_dir, &log_path) {
            Ok(file) => file,
            Err(e) => {
                state.session = BuildSession::default();
                return Err(e);
            }
        };

        state.last_id = id_millis;
        state.log = Some(log);
        state.session = BuildSession {
            status: BuildStatus::Running,
            id: Some(id.clone()),
            started_at: Some(id_millis),
            finished_at: None,
            exit_code: None,
            log_file: Some(log_path),
            error: None,
        };
        info!("Build {} starting: {:?}", id, project.build_command);
        broadcast_state(&mut state);

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        match spawn_build(
            &self.inner.shell,
            &project.build_command,
            Path::new(&project.project_root),
            event_tx,
        ) {
            Ok(process) => {
                state.process = Some(process);
                tokio::spawn(forward_build_events(self.clone(), id.clone(), event_rx));
            }
            Err(e) => {
                warn!("Build {} failed to spawn: {}", id, e);
                finalize(&mut state, BuildStatus::Failed, None, Some(e.to_string()));
            }
        }

        Ok(id)
    }

    /// Snapshot of the current session
    pub fn status(&self) -> BuildSession {
        self.lock().session.clone()
    }

    /// Contents of the active build's log, else of the most recent log file,
    /// else empty
    pub fn log(&self) -> Result<String> {
        let path = {
            let state = self.lock();
            self.log_path(&state)
        };
        match path {
            Some(path) => read_log(&path),
            None => Ok(String::new()),
        }
    }

    /// Interrupt the running build. No escalation: a process that ignores
    /// SIGINT keeps running.
    ///
    /// Cancellation is signal-only. A SIGINT that lands while the shell is
    /// still starting up, after it has installed its own handler but before
    /// it forks the command, is absorbed by the shell and the build stays
    /// `cancelling` until the command ends on its own.
    pub fn cancel(&self) -> CancelOutcome {
        let mut state = self.lock();
        if state.session.status != BuildStatus::Running {
            return CancelOutcome::NotRunning(state.session.status);
        }
        let Some(process) = state.process.as_mut() else {
            return CancelOutcome::NotRunning(state.session.status);
        };

        process.request_stop(StopSignal::Interrupt);
        state.session.status = BuildStatus::Cancelling;
        state.session.error = Some("Cancelled by user".to_string());
        info!("Build {:?} cancelling", state.session.id);
        CancelOutcome::Requested
    }

    /// Join the build log stream: backlog, current status, then live events
    pub fn subscribe(&self) -> BuildSubscription {
        let mut state = self.lock();
        let backlog = self
            .log_path(&state)
            .and_then(|path| read_log(&path).ok())
            .unwrap_or_default();
        let status = state.session.status;
        let receiver = state.listeners.subscribe();
        debug!("Build log listener joined ({} total)", state.listeners.len());
        BuildSubscription {
            backlog,
            status,
            receiver,
        }
    }

    /// Interrupt a running build and wait up to `grace` for it to finish
    pub async fn shutdown(&self, grace: Duration) {
        let mut subscription = self.subscribe();
        if !subscription.status.is_active() {
            return;
        }
        if let CancelOutcome::Requested = self.cancel() {
            info!("Interrupting build before shutdown");
        }

        let finished = async {
            while let Some(message) = subscription.receiver.recv().await {
                if matches!(message, SessionMessage::State { status } if status.is_terminal()) {
                    break;
                }
            }
        };
        if tokio::time::timeout(grace, finished).await.is_err() {
            warn!("Build still running after {:?}; leaving it", grace);
        }
    }

    /// Log file backing `log()` and join backlogs
    fn log_path(&self, state: &BuildState) -> Option<PathBuf> {
        match &state.session.log_file {
            Some(path) if path.exists() => Some(path.clone()),
            _ => latest_log_file(&self.inner.logs_dir),
        }
    }

    /// Append an output chunk of build `id`
    fn handle_output(&self, id: &str, text: String) {
        let mut state = self.lock();
        if state.session.id.as_deref() != Some(id) {
            return;
        }
        if let Some(log) = state.log.as_mut() {
            if let Err(e) = log.write_all(text.as_bytes()) {
                warn!("Failed to write build log: {}", e);
            }
        }
        trace!("Build output chunk: {} bytes", text.len());
        state.listeners.send(&SessionMessage::Log { text });
    }

    /// Exit handler of build `id`; finalizes at most once
    fn handle_exit(&self, id: &str, code: Option<i32>, signal: Option<i32>) {
        let mut state = self.lock();
        if state.session.id.as_deref() != Some(id) || state.session.status.is_terminal() {
            return;
        }
        let (status, error) = resolve_outcome(state.session.status, code, signal);
        info!(
            "Build {} finished: {} (code {:?}, signal {:?})",
            id, status, code, signal
        );
        finalize(&mut state, status, code, error);
    }
}

/// Terminal status and error for a build process exit.
///
/// A signal always means cancelled. Exit 0 is success even if a cancel lost
/// the race. While cancelling, the shell's 130 also means cancelled.
pub fn resolve_outcome(
    current: BuildStatus,
    code: Option<i32>,
    signal: Option<i32>,
) -> (BuildStatus, Option<String>) {
    if signal.is_some() {
        return (BuildStatus::Cancelled, Some("Cancelled".to_string()));
    }
    match code {
        Some(0) => (BuildStatus::Success, None),
        Some(SHELL_INTERRUPTED_EXIT) if current == BuildStatus::Cancelling => {
            (BuildStatus::Cancelled, Some("Cancelled".to_string()))
        }
        Some(code) => (
            BuildStatus::Failed,
            Some(format!("Exited with code {}", code)),
        ),
        None => (
            BuildStatus::Failed,
            Some("Build process ended without an exit status".to_string()),
        ),
    }
}

fn finalize(
    state: &mut BuildState,
    status: BuildStatus,
    exit_code: Option<i32>,
    error: Option<String>,
) {
    state.session.status = status;
    state.session.exit_code = exit_code;
    state.session.finished_at = Some(now_millis());
    state.session.error = error;
    state.process = None;
    if let Some(mut log) = state.log.take() {
        if let Err(e) = log.flush() {
            warn!("Failed to flush build log: {}", e);
        }
    }
    broadcast_state(state);
}

fn broadcast_state(state: &mut BuildState) {
    let status = state.session.status;
    let reached = state.listeners.send(&SessionMessage::State { status });
    debug!("Build state {} sent to {} listener(s)", status, reached);
}

async fn forward_build_events(
    supervisor: BuildSupervisor,
    id: String,
    mut events: mpsc::Receiver<ProcessEvent>,
) {
    while let Some(event) = events.recv().await {
        match event {
            ProcessEvent::Output(text) => supervisor.handle_output(&id, text),
            ProcessEvent::Exited { code, signal } => {
                supervisor.handle_exit(&id, code, signal);
                break;
            }
            ProcessEvent::SpawnFailed { reason } => {
                let mut state = supervisor.lock();
                if state.session.id.as_deref() == Some(id.as_str())
                    && !state.session.status.is_terminal()
                {
                    finalize(&mut state, BuildStatus::Failed, None, Some(reason));
                }
                break;
            }
        }
    }
}

fn open_log(dir: &Path, path: &Path) -> Result<File> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create log dir {:?}", dir))?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open build log {:?}", path))
}

fn read_log(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Most recent `*.log` by file name
fn latest_log_file(dir: &Path) -> Option<PathBuf> {
    std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "log"))
        .max_by(|a, b| a.file_name().cmp(&b.file_name()))
}
