//! The process harness.
//!
//! Spawns the MCP server under test as a child process, performs the
//! `initialize` handshake over newline-delimited JSON-RPC on stdio, and
//! correlates requests with responses by id. Two reader threads (stdout
//! framing, stderr buffering) run beside the driving test thread; the
//! only shared mutable state is the stderr buffer and the pending-call
//! map, both mutex-guarded.
pub mod protocol;

use log::{debug, warn};
use parking_lot::Mutex;
use regex::Regex;
use serde_json::{json, Value};
use std::{
    collections::HashMap,
    fmt, io,
    io::{BufRead, BufReader, Read, Write},
    path::PathBuf,
    process::{Child, ChildStdin, Command, Stdio},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc,
    },
    thread,
    time::{Duration, Instant},
};
use thiserror::Error;

pub use protocol::{ClientInfo, ServerHandshake, DEFAULT_PROTOCOL_VERSION};

/// Which await expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    Handshake,
    Response,
    Shutdown,
}

impl fmt::Display for TimeoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutKind::Handshake => f.write_str("handshake"),
            TimeoutKind::Response => f.write_str("response"),
            TimeoutKind::Shutdown => f.write_str("shutdown"),
        }
    }
}

/// Process-level failures. Validation mismatches never surface here;
/// they are data in a `ValidationResult`.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("failed to spawn server process '{command}': {source}")]
    Spawn {
        command: String,
        source: io::Error,
    },
    #[error("invalid ready pattern: {0}")]
    ReadyPattern(#[from] regex::Error),
    #[error("timed out waiting for {0}")]
    Timeout(TimeoutKind),
    #[error("protocol framing error: {0}")]
    ProtocolFraming(String),
    #[error("server rejected the handshake: {message} (code {code})")]
    HandshakeRejected { code: i64, message: String },
    #[error("operation cancelled")]
    Cancelled,
}

impl HarnessError {
    /// Stable machine-readable discriminator for reporters.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            HarnessError::Spawn { .. } => "spawn_failed",
            HarnessError::ReadyPattern(_) => "spawn_failed",
            HarnessError::Timeout(TimeoutKind::Handshake) => "timeout:handshake",
            HarnessError::Timeout(TimeoutKind::Response) => "timeout:response",
            HarnessError::Timeout(TimeoutKind::Shutdown) => "timeout:shutdown",
            HarnessError::ProtocolFraming(_) => "protocol_framing",
            HarnessError::HandshakeRejected { .. } => "handshake_rejected",
            HarnessError::Cancelled => "cancelled",
        }
    }
}

/// How to spawn and talk to the server under test.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Executable to spawn.
    pub command: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Extra environment on top of the inherited one.
    pub env: Vec<(String, String)>,
    /// How long to wait for the ready pattern before attempting the
    /// handshake anyway. Ignored when no pattern is configured.
    pub startup_timeout: Duration,
    /// Regex matched against accumulated stderr to detect readiness.
    pub ready_pattern: Option<String>,
    pub protocol_version: String,
    pub client_info: ClientInfo,
    pub handshake_timeout: Duration,
    pub response_timeout: Duration,
    /// Grace window between closing stdin and killing the child.
    pub shutdown_grace: Duration,
}

impl ServerConfig {
    pub fn new(command: impl Into<String>) -> ServerConfig {
        ServerConfig {
            command: command.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
            startup_timeout: Duration::from_secs(5),
            ready_pattern: None,
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            client_info: ClientInfo::default(),
            handshake_timeout: Duration::from_secs(10),
            response_timeout: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

/// Stderr accumulates up to this many bytes; beyond it the oldest bytes
/// are dropped and the buffer is flagged as truncated.
const STDERR_HIGH_WATER: usize = 1 << 20;

#[derive(Debug)]
struct StderrBuffer {
    data: String,
    truncated: bool,
}

impl StderrBuffer {
    fn append(&mut self, chunk: &str) {
        self.data.push_str(chunk);
        if self.data.len() > STDERR_HIGH_WATER {
            let mut cut = self.data.len() - STDERR_HIGH_WATER;
            while !self.data.is_char_boundary(cut) {
                cut += 1;
            }
            self.data.drain(..cut);
            self.truncated = true;
        }
    }
}

type PendingSender = mpsc::Sender<Result<Value, HarnessError>>;

#[derive(Debug)]
struct SharedState {
    pending: Mutex<HashMap<i64, PendingSender>>,
    stderr: Mutex<StderrBuffer>,
    cancelled: AtomicBool,
    /// Set on framing errors or premature EOF; later calls fail fast.
    poisoned: Mutex<Option<String>>,
}

impl SharedState {
    fn fail_all_pending(&self, reason: impl Fn() -> HarnessError) {
        let mut pending = self.pending.lock();
        for (_, sender) in pending.drain() {
            let _ = sender.send(Err(reason()));
        }
    }

    fn poison(&self, reason: &str) {
        let mut poisoned = self.poisoned.lock();
        if poisoned.is_none() {
            *poisoned = Some(reason.to_string());
        }
        drop(poisoned);
        self.fail_all_pending(|| HarnessError::ProtocolFraming(reason.to_string()));
    }
}

/// Cancels a running session from another thread: pending awaits
/// complete with `cancelled` and the child is terminated.
#[derive(Clone)]
pub struct CancelHandle {
    state: Arc<SharedState>,
    child: Arc<Mutex<Child>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
        self.state.fail_all_pending(|| HarnessError::Cancelled);
        let mut child = self.child.lock();
        if let Err(error) = child.kill() {
            debug!("cancel: child already gone: {error}");
        }
        let _ = child.wait();
    }
}

/// One live server-under-test.
#[derive(Debug)]
pub struct Session {
    child: Arc<Mutex<Child>>,
    stdin: Option<ChildStdin>,
    state: Arc<SharedState>,
    handshake: ServerHandshake,
    next_id: i64,
    config: ServerConfig,
    readers: Vec<thread::JoinHandle<()>>,
}

impl Session {
    /// Spawn the server, wait for readiness, and perform the MCP
    /// handshake. On any failure the child is terminated and reaped.
    pub fn start(config: ServerConfig) -> Result<Session, HarnessError> {
        let ready_regex = config
            .ready_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()?;
        let mut command = Command::new(&config.command);
        command
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &config.cwd {
            command.current_dir(cwd);
        }
        for (key, value) in &config.env {
            command.env(key, value);
        }
        let mut child = command.spawn().map_err(|source| HarnessError::Spawn {
            command: config.command.clone(),
            source,
        })?;
        debug!("spawned '{}' (pid {})", config.command, child.id());
        let stdin = child.stdin.take();
        let stdout = child.stdout.take().expect("stdout is piped");
        let stderr = child.stderr.take().expect("stderr is piped");
        let state = Arc::new(SharedState {
            pending: Mutex::new(HashMap::new()),
            stderr: Mutex::new(StderrBuffer {
                data: String::new(),
                truncated: false,
            }),
            cancelled: AtomicBool::new(false),
            poisoned: Mutex::new(None),
        });

        let stdout_state = Arc::clone(&state);
        let stdout_reader = thread::spawn(move || read_stdout(stdout, &stdout_state));

        let (ready_tx, ready_rx) = mpsc::channel();
        let stderr_state = Arc::clone(&state);
        let ready = ready_regex.map(|regex| (regex, ready_tx));
        let stderr_reader = thread::spawn(move || read_stderr(stderr, &stderr_state, ready));

        let mut session = Session {
            child: Arc::new(Mutex::new(child)),
            stdin,
            state,
            handshake: ServerHandshake::default(),
            next_id: 0,
            config,
            readers: vec![stdout_reader, stderr_reader],
        };

        // Ready detection: the pattern match or the startup timeout,
        // whichever comes first; either way the handshake is attempted.
        if session.config.ready_pattern.is_some() {
            match ready_rx.recv_timeout(session.config.startup_timeout) {
                Ok(()) => debug!("ready pattern matched"),
                Err(_) => debug!(
                    "ready pattern not seen within {:?}, attempting handshake",
                    session.config.startup_timeout
                ),
            }
        }
        session.perform_handshake()?;
        Ok(session)
    }

    fn perform_handshake(&mut self) -> Result<(), HarnessError> {
        let id = self.take_id();
        let request = protocol::initialize_request(
            id,
            &self.config.protocol_version,
            &self.config.client_info,
        );
        let timeout = self.config.handshake_timeout;
        let envelope = self.dispatch(id, &request, timeout, TimeoutKind::Handshake)?;
        if let Some(error) = envelope.get("error") {
            return Err(HarnessError::HandshakeRejected {
                code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("initialize failed")
                    .to_string(),
            });
        }
        let result = envelope.get("result").cloned().unwrap_or(Value::Null);
        self.handshake = ServerHandshake::from_result(&result);
        if self.handshake.protocol_version.is_empty() {
            warn!("server did not advertise a protocolVersion");
        }
        self.write_message(&protocol::initialized_notification())?;
        debug!(
            "handshake complete (protocol {})",
            self.handshake.protocol_version
        );
        Ok(())
    }

    /// What the server advertised during the handshake.
    #[must_use]
    pub fn handshake(&self) -> &ServerHandshake {
        &self.handshake
    }

    /// Issue a request and await the matching response envelope.
    ///
    /// The returned value is the full JSON-RPC envelope (`result` XOR
    /// `error`); expectation documents assert against it as-is.
    pub fn call(&mut self, method: &str, params: Value) -> Result<Value, HarnessError> {
        let id = self.take_id();
        let request = protocol::Request::new(id, method, params);
        let timeout = self.config.response_timeout;
        self.dispatch(id, &request, timeout, TimeoutKind::Response)
    }

    /// `tools/list` shortcut.
    pub fn list_tools(&mut self) -> Result<Value, HarnessError> {
        self.call("tools/list", json!({}))
    }

    /// `tools/call` shortcut.
    pub fn call_tool(&mut self, name: &str, arguments: Value) -> Result<Value, HarnessError> {
        self.call("tools/call", json!({"name": name, "arguments": arguments}))
    }

    /// Send a notification; notifications carry no id and are not
    /// awaited.
    pub fn notify(&mut self, method: &str, params: Value) -> Result<(), HarnessError> {
        self.write_message(&protocol::Notification::new(method, params))
    }

    fn take_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check_usable(&self) -> Result<(), HarnessError> {
        if self.state.cancelled.load(Ordering::SeqCst) {
            return Err(HarnessError::Cancelled);
        }
        if let Some(reason) = self.state.poisoned.lock().as_ref() {
            return Err(HarnessError::ProtocolFraming(reason.clone()));
        }
        Ok(())
    }

    fn dispatch(
        &mut self,
        id: i64,
        request: &protocol::Request,
        timeout: Duration,
        kind: TimeoutKind,
    ) -> Result<Value, HarnessError> {
        self.check_usable()?;
        let (sender, receiver) = mpsc::channel();
        self.state.pending.lock().insert(id, sender);
        if let Err(error) = self.write_message(request) {
            self.state.pending.lock().remove(&id);
            return Err(error);
        }
        match receiver.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                self.state.pending.lock().remove(&id);
                Err(HarnessError::Timeout(kind))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                if self.state.cancelled.load(Ordering::SeqCst) {
                    Err(HarnessError::Cancelled)
                } else {
                    Err(HarnessError::ProtocolFraming(
                        "response channel closed".to_string(),
                    ))
                }
            }
        }
    }

    fn write_message(&mut self, message: &impl serde::Serialize) -> Result<(), HarnessError> {
        let stdin = self.stdin.as_mut().ok_or_else(|| {
            HarnessError::ProtocolFraming("stdin already closed".to_string())
        })?;
        let mut line = serde_json::to_string(message)
            .map_err(|error| HarnessError::ProtocolFraming(error.to_string()))?;
        line.push('\n');
        stdin
            .write_all(line.as_bytes())
            .and_then(|()| stdin.flush())
            .map_err(|error| {
                HarnessError::ProtocolFraming(format!("failed to write request: {error}"))
            })
    }

    /// Snapshot of everything the child wrote to stderr so far.
    #[must_use]
    pub fn stderr(&self) -> String {
        self.state.stderr.lock().data.clone()
    }

    /// Whether the drop-oldest high-water policy discarded bytes.
    #[must_use]
    pub fn stderr_truncated(&self) -> bool {
        self.state.stderr.lock().truncated
    }

    /// Reset the stderr buffer between tests.
    pub fn clear_stderr(&self) {
        let mut buffer = self.state.stderr.lock();
        buffer.data.clear();
        buffer.truncated = false;
    }

    /// A handle that cancels in-flight awaits and terminates the child.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            state: Arc::clone(&self.state),
            child: Arc::clone(&self.child),
        }
    }

    /// Graceful shutdown: close stdin, wait up to the grace window,
    /// then terminate. The child is reaped on every path; expiry of the
    /// grace window is reported as `timeout:shutdown`.
    pub fn close(mut self) -> Result<(), HarnessError> {
        drop(self.stdin.take());
        let deadline = Instant::now() + self.config.shutdown_grace;
        let mut outcome = Ok(());
        loop {
            let status = self.child.lock().try_wait();
            match status {
                Ok(Some(status)) => {
                    debug!("server exited with {status}");
                    break;
                }
                Ok(None) => {
                    if Instant::now() >= deadline {
                        warn!("server did not exit within the grace window, killing it");
                        let mut child = self.child.lock();
                        let _ = child.kill();
                        let _ = child.wait();
                        outcome = Err(HarnessError::Timeout(TimeoutKind::Shutdown));
                        break;
                    }
                    thread::sleep(Duration::from_millis(10));
                }
                Err(error) => {
                    let _ = self.child.lock().wait();
                    outcome = Err(HarnessError::ProtocolFraming(format!(
                        "failed to poll child: {error}"
                    )));
                    break;
                }
            }
        }
        for reader in self.readers.drain(..) {
            let _ = reader.join();
        }
        outcome
    }
}

impl Drop for Session {
    /// Last-resort reaping for sessions dropped without `close` (e.g.
    /// on handshake failure).
    fn drop(&mut self) {
        let mut child = self.child.lock();
        if let Ok(None) = child.try_wait() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

fn read_stdout(stdout: impl Read, state: &SharedState) {
    let mut reader = BufReader::new(stdout);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => {
                if !state.cancelled.load(Ordering::SeqCst) {
                    state.poison("unexpected end of stream");
                }
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match protocol::classify(trimmed) {
                    protocol::Incoming::Response {
                        id: Some(id),
                        envelope,
                    } => {
                        let sender = state.pending.lock().remove(&id);
                        match sender {
                            Some(sender) => {
                                let _ = sender.send(Ok(envelope));
                            }
                            None => warn!("unsolicited response for id {id}, dropping"),
                        }
                    }
                    protocol::Incoming::Response { id: None, .. } => {
                        warn!("response with non-integer id, dropping");
                    }
                    protocol::Incoming::Notification { method } => {
                        debug!("server notification '{method}'");
                    }
                    protocol::Incoming::Request { method } => {
                        debug!("ignoring server-to-client request '{method}'");
                    }
                    protocol::Incoming::Invalid { reason } => {
                        warn!("framing error: {reason}");
                        state.poison(&reason);
                    }
                }
            }
            Err(error) => {
                state.poison(&format!("failed to read stdout: {error}"));
                break;
            }
        }
    }
}

fn read_stderr(
    stderr: impl Read,
    state: &SharedState,
    mut ready: Option<(Regex, mpsc::Sender<()>)>,
) {
    let mut reader = BufReader::new(stderr);
    let mut chunk = [0u8; 4096];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => {
                let text = String::from_utf8_lossy(&chunk[..read]);
                let mut buffer = state.stderr.lock();
                buffer.append(&text);
                let matched = ready
                    .as_ref()
                    .map_or(false, |(regex, _)| regex.is_match(&buffer.data));
                if matched {
                    if let Some((_, sender)) = ready.take() {
                        let _ = sender.send(());
                    }
                }
            }
            Err(error) => {
                debug!("stderr reader stopped: {error}");
                break;
            }
        }
    }
}
