//! Long-running child process supervision
//!
//! A [`SupervisedProcess`] owns nothing but control handles: the `Child` itself
//! is moved into a dedicated wait task, and stdout/stderr are drained by two
//! reader tasks that forward decoded chunks as [`ProcessEvent::Output`].
//! The wait task emits exactly one [`ProcessEvent::Exited`], and only after both
//! readers have finished, so no output is ever observed after the exit event.

use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use adcon_core::events::ProcessEvent;
use adcon_core::prelude::*;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Read buffer size for output pumping
const CHUNK_SIZE: usize = 8 * 1024;

/// Graceful stop request delivered to a supervised process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopSignal {
    /// SIGINT, like Ctrl-C in a terminal
    Interrupt,
    /// SIGTERM
    Terminate,
}

/// Whether the child gets its own process group.
///
/// Shell-interpreted commands run in their own group so a stop signal reaches
/// every process the shell started, not just the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessGroup {
    Inherit,
    Own,
}

/// Control handle for a running child process.
pub struct SupervisedProcess {
    label: &'static str,
    pid: Option<u32>,
    /// Consumed on first use (or on drop)
    stop_tx: Option<oneshot::Sender<StopSignal>>,
    exited: Arc<AtomicBool>,
}

impl std::fmt::Debug for SupervisedProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupervisedProcess")
            .field("label", &self.label)
            .field("pid", &self.pid)
            .field("exited", &self.has_exited())
            .finish()
    }
}

impl SupervisedProcess {
    /// Spawn `command` with piped output and start supervising it.
    ///
    /// Output chunks and the final exit are delivered on `event_tx`.
    pub fn spawn(
        label: &'static str,
        mut command: Command,
        group: ProcessGroup,
        event_tx: mpsc::Sender<ProcessEvent>,
    ) -> Result<Self> {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        if group == ProcessGroup::Own {
            command.process_group(0);
            // SAFETY: only async-signal-safe libc calls between fork and exec.
            // A console started with SIGINT ignored must not pass that on,
            // otherwise cancellation could never reach the build.
            unsafe {
                command.pre_exec(|| {
                    libc::signal(libc::SIGINT, libc::SIG_DFL);
                    Ok(())
                });
            }
        }

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::spawn(format!("{}: command or working directory not found ({})", label, e))
            } else {
                Error::spawn(format!("{}: {}", label, e))
            }
        })?;

        let pid = child.id();
        info!("{} process started with PID: {:?}", label, pid);

        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(pump_output(stdout, event_tx.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(pump_output(stderr, event_tx.clone())));
        }

        let exited = Arc::new(AtomicBool::new(false));
        let (stop_tx, stop_rx) = oneshot::channel::<StopSignal>();

        tokio::spawn(wait_for_exit(
            label,
            child,
            group,
            stop_rx,
            readers,
            event_tx,
            Arc::clone(&exited),
        ));

        Ok(Self {
            label,
            pid,
            stop_tx: Some(stop_tx),
            exited,
        })
    }

    /// Ask the process to stop with `signal`.
    ///
    /// Returns `false` if the process already exited or a stop was already
    /// requested. There is no escalation: a process that ignores the signal
    /// keeps running until it exits on its own.
    pub fn request_stop(&mut self, signal: StopSignal) -> bool {
        if self.has_exited() {
            return false;
        }
        match self.stop_tx.take() {
            Some(tx) => {
                info!("Requesting {} stop with {:?}", self.label, signal);
                tx.send(signal).is_ok()
            }
            None => false,
        }
    }

    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::Acquire)
    }
}

impl Drop for SupervisedProcess {
    fn drop(&mut self) {
        if !self.has_exited() {
            if let Some(tx) = self.stop_tx.take() {
                debug!("{} handle dropped while running, terminating", self.label);
                let _ = tx.send(StopSignal::Terminate);
            }
        }
    }
}

/// Background task: owns `child`, waits for it to exit, emits `ProcessEvent::Exited`.
async fn wait_for_exit(
    label: &'static str,
    mut child: Child,
    group: ProcessGroup,
    stop_rx: oneshot::Receiver<StopSignal>,
    readers: Vec<JoinHandle<()>>,
    event_tx: mpsc::Sender<ProcessEvent>,
    exited: Arc<AtomicBool>,
) {
    let status = tokio::select! {
        status = child.wait() => status,
        signal = stop_rx => {
            if let Ok(signal) = signal {
                deliver_signal(label, &mut child, group, signal);
            }
            child.wait().await
        }
    };

    let (code, signal) = match status {
        Ok(status) => {
            info!("{} process exited with status: {:?}", label, status);
            exit_parts(status)
        }
        Err(e) => {
            error!("Error waiting for {} process: {}", label, e);
            (None, None)
        }
    };

    // Readers end at EOF; no output may trail the exit event.
    for reader in readers {
        let _ = reader.await;
    }

    exited.store(true, Ordering::Release);

    debug!("Sending ProcessEvent::Exited {{ code: {:?}, signal: {:?} }}", code, signal);
    let _ = event_tx.send(ProcessEvent::Exited { code, signal }).await;
}

#[cfg(unix)]
fn deliver_signal(label: &str, child: &mut Child, group: ProcessGroup, signal: StopSignal) {
    let Some(pid) = child.id() else {
        return;
    };
    let sig = match signal {
        StopSignal::Interrupt => libc::SIGINT,
        StopSignal::Terminate => libc::SIGTERM,
    };
    let target = match group {
        ProcessGroup::Own => -(pid as i32),
        ProcessGroup::Inherit => pid as i32,
    };
    // SAFETY: kill(2) has no memory-safety preconditions.
    let res = unsafe { libc::kill(target, sig) };
    if res != 0 {
        warn!(
            "Failed to signal {} process {}: {}",
            label,
            pid,
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
fn deliver_signal(label: &str, child: &mut Child, _group: ProcessGroup, _signal: StopSignal) {
    if let Err(e) = child.start_kill() {
        warn!("Failed to stop {} process: {}", label, e);
    }
}

#[cfg(unix)]
fn exit_parts(status: ExitStatus) -> (Option<i32>, Option<i32>) {
    use std::os::unix::process::ExitStatusExt;
    (status.code(), status.signal())
}

#[cfg(not(unix))]
fn exit_parts(status: ExitStatus) -> (Option<i32>, Option<i32>) {
    (status.code(), None)
}

/// Forward every chunk read from `reader` as `ProcessEvent::Output`.
async fn pump_output<R: AsyncRead + Unpin>(mut reader: R, tx: mpsc::Sender<ProcessEvent>) {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut decoder = Utf8ChunkDecoder::default();

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let text = decoder.decode(&buf[..n]);
                if text.is_empty() {
                    continue;
                }
                trace!("output chunk: {} bytes", text.len());
                if tx.send(ProcessEvent::Output(text)).await.is_err() {
                    debug!("output channel closed");
                    return;
                }
            }
            Err(e) => {
                warn!("Output read failed: {}", e);
                break;
            }
        }
    }

    let rest = decoder.finish();
    if !rest.is_empty() {
        let _ = tx.send(ProcessEvent::Output(rest)).await;
    }
}

/// Incremental UTF-8 decoder that never splits a multi-byte character
/// across chunks. Invalid bytes decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    /// Decode `bytes`, holding back an incomplete trailing sequence
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let split = self.pending.len() - incomplete_tail_len(&self.pending);
        let text = String::from_utf8_lossy(&self.pending[..split]).into_owned();
        self.pending.drain(..split);
        text
    }

    /// Flush whatever is held back
    pub fn finish(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }
}

/// Length of an incomplete multi-byte sequence at the end of `bytes`
fn incomplete_tail_len(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let b = bytes[bytes.len() - back];
        if b & 0b1100_0000 == 0b1000_0000 {
            continue;
        }
        let needed = if b & 0b1110_0000 == 0b1100_0000 {
            2
        } else if b & 0b1111_0000 == 0b1110_0000 {
            3
        } else if b & 0b1111_1000 == 0b1111_0000 {
            4
        } else {
            1
        };
        return if needed > back { back } else { 0 };
    }
    0
}
