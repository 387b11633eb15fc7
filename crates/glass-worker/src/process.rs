//! Spawning a renderer worker, its startup handshake and shutdown.

use std::{
    collections::VecDeque,
    io::{self, BufRead, BufReader},
    path::PathBuf,
    process::{Child, ChildStdout, Command, Stdio},
    sync::{
        Arc,
        mpsc::{self, RecvTimeoutError},
    },
    thread,
    time::{Duration, Instant},
};

use glass_protocol::{
    ChannelAddress, CommandId, EffectParameters, HANDSHAKE_PREFIX, HandshakeLine,
    ProtocolRevision, WindowHandle, parse_handshake_line, worker_args,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    Error, Result,
    channel::CommandChannel,
    desktop::{Desktop, MINIMUM_OS_BUILD},
};

/// Time to wait for the worker to honour `Exit` before killing it.
pub const SHUTDOWN_TIMEOUT_MS: u64 = 5000;
/// Time allowed for the worker to announce its control window.
pub const HANDSHAKE_TIMEOUT_MS: u64 = 10_000;
/// Poll interval while waiting for the worker to exit.
const EXIT_POLL_INTERVAL_MS: u64 = 10;
/// Diagnostic lines retained from worker startup output.
const LAST_LOG_LINES: usize = 64;
/// Alpha of a fully opaque layered window.
const OPAQUE: u8 = 255;

/// Configuration for launching renderer workers.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerConfig {
    /// Path to the worker executable.
    pub executable: PathBuf,
    /// Arguments placed before the positional effect arguments.
    pub prefix_args: Vec<String>,
    /// Extra environment for the worker.
    pub env: Vec<(String, String)>,
    /// Protocol spoken by the worker.
    pub revision: ProtocolRevision,
    /// OS builds below this fail with `UnsupportedPlatform`.
    pub min_os_build: u32,
    /// Upper bound on the handshake read loop.
    pub handshake_timeout: Duration,
    /// Grace period between `Exit` and a forced kill.
    pub shutdown_timeout: Duration,
}

impl WorkerConfig {
    /// Create a configuration for the given executable with default timings.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            prefix_args: Vec::new(),
            env: Vec::new(),
            revision: ProtocolRevision::Current,
            min_os_build: MINIMUM_OS_BUILD,
            handshake_timeout: Duration::from_millis(HANDSHAKE_TIMEOUT_MS),
            shutdown_timeout: Duration::from_millis(SHUTDOWN_TIMEOUT_MS),
        }
    }

    /// Arguments inserted ahead of the positional effect arguments.
    pub fn with_prefix_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefix_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Add an environment variable for the worker.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Select the worker protocol revision.
    pub fn with_revision(mut self, revision: ProtocolRevision) -> Self {
        self.revision = revision;
        self
    }

    /// Override the OS build gate.
    pub fn with_min_os_build(mut self, build: u32) -> Self {
        self.min_os_build = build;
        self
    }

    /// Override the handshake deadline.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Override the shutdown grace period.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Poll `child` until it exits or `timeout` elapses.
fn wait_exit_sync(child: &mut Child, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        match child.try_wait() {
            Ok(Some(_)) => return true,
            Ok(None) => thread::sleep(Duration::from_millis(EXIT_POLL_INTERVAL_MS)),
            Err(_) => break,
        }
    }
    false
}

/// Kill and reap `child`, ignoring failures.
fn kill_child(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Append a diagnostic line to the bounded log ring.
fn push_log(logs: &mut VecDeque<String>, line: String) {
    if logs.len() == LAST_LOG_LINES {
        logs.pop_front();
    }
    logs.push_back(line);
}

/// Join the log ring for an error message.
fn joined(logs: &VecDeque<String>) -> String {
    logs.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
}

/// Build a handshake error carrying the captured output.
fn handshake_error(reason: String, logs: &VecDeque<String>) -> Error {
    Error::Handshake {
        reason,
        logs: joined(logs),
    }
}

/// Decode one raw output line, dropping the line terminator.
///
/// Workers may print in a legacy code page; bytes that are not UTF-8 are
/// replaced rather than failing the handshake.
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Read worker stdout on a helper thread until the handshake line.
///
/// The reader stops (and drops the pipe) as soon as the address line has
/// been read, so the worker's output can never fill up and block it.
fn spawn_reader(stdout: ChildStdout) -> Result<mpsc::Receiver<io::Result<String>>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("glass-handshake".into())
        .spawn(move || {
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                let line = match reader.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    Ok(_) => Ok(decode_line(&buf)),
                    Err(e) => Err(e),
                };
                let done = line
                    .as_ref()
                    .map_or(true, |l| l.starts_with(HANDSHAKE_PREFIX));
                if tx.send(line).is_err() || done {
                    break;
                }
            }
        })?;
    Ok(rx)
}

/// Run the handshake against a freshly spawned worker.
fn handshake(
    child: &mut Child,
    timeout: Duration,
    logs: &mut VecDeque<String>,
) -> Result<ChannelAddress> {
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| handshake_error("worker stdout was not captured".into(), logs))?;
    let rx = spawn_reader(stdout)?;
    let start = Instant::now();
    loop {
        let remaining = timeout.saturating_sub(start.elapsed());
        match rx.recv_timeout(remaining) {
            Ok(Ok(line)) => match parse_handshake_line(&line) {
                Ok(HandshakeLine::Address(addr)) => return Ok(addr),
                Ok(HandshakeLine::Diagnostic(text)) => {
                    debug!(line = %text, "worker output");
                    push_log(logs, text);
                }
                Err(e) => return Err(handshake_error(e.to_string(), logs)),
            },
            Ok(Err(e)) => return Err(handshake_error(format!("reading worker output: {e}"), logs)),
            Err(RecvTimeoutError::Timeout) => {
                return Err(handshake_error(
                    format!("no control window announced within {timeout:?}"),
                    logs,
                ));
            }
            Err(RecvTimeoutError::Disconnected) => {
                let reason = match child.try_wait() {
                    Ok(Some(status)) => {
                        format!("worker exited ({status}) before announcing its control window")
                    }
                    _ => "worker closed its output before announcing its control window".into(),
                };
                return Err(handshake_error(reason, logs));
            }
        }
    }
}

/// One running renderer worker bound to a host window.
///
/// Created by [`EffectProcess::launch`]; `is_live` is the only liveness
/// signal. Dropping a process that is still running shuts it down.
pub struct EffectProcess {
    /// Worker process; `None` after shutdown.
    child: Option<Child>,
    /// Control channel learned at handshake.
    channel: Option<CommandChannel>,
    /// Host window the effect is applied to.
    target: WindowHandle,
    /// Platform services.
    desktop: Arc<dyn Desktop>,
    /// Grace period for `Exit`.
    shutdown_timeout: Duration,
    /// Diagnostic output captured during startup.
    last_logs: VecDeque<String>,
}

impl EffectProcess {
    /// Launch a worker for `target` and complete the handshake.
    ///
    /// Blocks until the worker announces its control window, exits, or the
    /// handshake deadline passes. Any failure after spawn kills the worker
    /// before the error is returned.
    pub fn launch(
        config: &WorkerConfig,
        desktop: Arc<dyn Desktop>,
        target: WindowHandle,
        params: &EffectParameters,
    ) -> Result<Self> {
        let build = desktop.os_build();
        if build.is_none_or(|b| b < config.min_os_build) {
            warn!(?build, required = config.min_os_build, "platform below renderer minimum");
            return Err(Error::UnsupportedPlatform {
                build,
                required: config.min_os_build,
            });
        }
        if !config.executable.is_file() {
            return Err(Error::Launch(format!(
                "worker executable {} does not exist",
                config.executable.display()
            )));
        }

        let args = worker_args(config.revision, target, params);
        info!(exe = ?config.executable, %target, "starting renderer worker");
        debug!(?args, "worker args");

        let mut command = Command::new(&config.executable);
        command
            .args(&config.prefix_args)
            .args(&args)
            .envs(config.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            /// Keep the worker from flashing a console window.
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            command.creation_flags(CREATE_NO_WINDOW);
        }
        let mut child = command
            .spawn()
            .map_err(|e| Error::Launch(format!("{}: {e}", config.executable.display())))?;
        info!(pid = child.id(), "renderer worker spawned");

        let mut last_logs = VecDeque::new();
        let address = match handshake(&mut child, config.handshake_timeout, &mut last_logs) {
            Ok(addr) => addr,
            Err(e) => {
                warn!(error = %e, "handshake failed; killing worker");
                kill_child(&mut child);
                return Err(e);
            }
        };
        info!(pid = child.id(), channel = %address, "renderer worker ready");

        let channel = CommandChannel::new(address, target, config.revision, desktop.clone());
        Ok(Self {
            child: Some(child),
            channel: Some(channel),
            target,
            desktop,
            shutdown_timeout: config.shutdown_timeout,
            last_logs,
        })
    }

    /// True while the worker process is running.
    pub fn is_live(&mut self) -> bool {
        self.child
            .as_mut()
            .is_some_and(|c| matches!(c.try_wait(), Ok(None)))
    }

    /// Send a command to the worker's control window.
    pub fn send_command(&self, command: CommandId, value: i32) -> Result<()> {
        self.channel
            .as_ref()
            .ok_or(Error::NotRunning)?
            .send(command, value)
    }

    /// Stop the worker: send `Exit`, wait up to the grace period, then kill.
    ///
    /// Afterwards the host window is forced back to fully opaque if the
    /// worker left it translucent. Every step is best-effort.
    pub fn shutdown(&mut self) {
        let channel = self.channel.take();
        if let Some(mut child) = self.child.take() {
            let running = matches!(child.try_wait(), Ok(None));
            let exited = match (&channel, running) {
                (_, false) => true,
                (Some(ch), true) => {
                    if let Err(e) = ch.send(CommandId::Exit, 0) {
                        debug!(error = %e, "exit command not delivered");
                    }
                    wait_exit_sync(&mut child, self.shutdown_timeout)
                }
                (None, true) => false,
            };
            if exited {
                let _ = child.wait();
                info!("renderer worker exited");
            } else {
                warn!("renderer worker did not exit in time; killing");
                kill_child(&mut child);
            }
        }
        self.restore_opacity();
    }

    /// Reset the host window to opaque if it was left translucent.
    fn restore_opacity(&self) {
        if let Some(alpha) = self.desktop.window_alpha(self.target)
            && alpha < OPAQUE
        {
            debug!(window = %self.target, alpha, "restoring host window opacity");
            if let Err(e) = self.desktop.set_window_alpha(self.target, OPAQUE) {
                debug!(error = %e, "failed to restore host window opacity");
            }
        }
    }

    /// Process ID of the worker, if any.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Control window announced at handshake.
    pub fn channel_address(&self) -> Option<ChannelAddress> {
        self.channel.as_ref().map(CommandChannel::address)
    }

    /// Host window the effect targets.
    pub fn target(&self) -> WindowHandle {
        self.target
    }

    /// Diagnostic lines the worker printed before its handshake.
    pub fn last_logs(&self) -> impl Iterator<Item = &str> {
        self.last_logs.iter().map(String::as_str)
    }
}

impl Drop for EffectProcess {
    fn drop(&mut self) {
        if self.child.is_some() {
            debug!("EffectProcess dropped while still running, shutting down");
            self.shutdown();
        }
    }
}
