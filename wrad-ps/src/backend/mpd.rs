//! MPD playback backend
//!
//! Drives a Music Player Daemon over its line protocol: one command per
//! line, `key: value` response lines terminated by `OK`, errors as `ACK`
//! lines. A single persistent connection is serialized behind a mutex and
//! reopened on demand after the socket drops.
//!
//! Two conditioning details keep MPD's queue in lockstep with the
//! scheduler's: consume mode is enabled on every (re)connect so played
//! entries leave MPD's list, and resume optionally rewinds one second before
//! playing because some stream decoders crash when resumed exactly at the
//! suspended position.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{BackendError, BackendPlayState, BackendStatus, PlaybackBackend};

/// One open protocol connection.
struct MpdConnection {
    stream: BufStream<TcpStream>,
}

impl MpdConnection {
    async fn open(addr: &str) -> Result<Self, BackendError> {
        let stream = TcpStream::connect(addr).await?;
        let mut conn = Self {
            stream: BufStream::new(stream),
        };

        let greeting = conn.read_line().await?;
        if !greeting.starts_with("OK MPD") {
            return Err(BackendError::UnexpectedResponse(greeting));
        }
        debug!(addr = %addr, greeting = %greeting, "MPD connection established");

        Ok(conn)
    }

    /// Send one command and collect response lines up to `OK`.
    async fn execute(&mut self, command: &str) -> Result<Vec<String>, BackendError> {
        self.stream.write_all(command.as_bytes()).await?;
        self.stream.write_all(b"\n").await?;
        self.stream.flush().await?;

        let mut lines = Vec::new();
        loop {
            let line = self.read_line().await?;
            if line == "OK" {
                return Ok(lines);
            }
            if let Some(ack) = line.strip_prefix("ACK ") {
                return Err(BackendError::Protocol(ack.to_string()));
            }
            lines.push(line);
        }
    }

    async fn read_line(&mut self) -> Result<String, BackendError> {
        let mut line = String::new();
        let read = self.stream.read_line(&mut line).await?;
        if read == 0 {
            return Err(BackendError::Disconnected);
        }
        Ok(line.trim_end().to_string())
    }
}

/// Quote a command argument, escaping backslashes and double quotes.
fn escape_argument(arg: &str) -> String {
    let mut escaped = String::with_capacity(arg.len() + 2);
    escaped.push('"');
    for c in arg.chars() {
        if c == '"' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('"');
    escaped
}

/// Parse `status` response lines into a [`BackendStatus`].
fn parse_status(lines: &[String]) -> BackendStatus {
    let mut state = BackendPlayState::Stop;
    let mut elapsed_secs = None;

    for line in lines {
        let Some((key, value)) = line.split_once(": ") else {
            continue;
        };
        match key {
            "state" => {
                state = match value {
                    "play" => BackendPlayState::Play,
                    "pause" => BackendPlayState::Pause,
                    _ => BackendPlayState::Stop,
                };
            }
            "elapsed" => {
                elapsed_secs = value.parse::<f64>().ok().map(|secs| secs as u32);
            }
            _ => {}
        }
    }

    BackendStatus { state, elapsed_secs }
}

/// [`PlaybackBackend`] implementation over the MPD line protocol.
pub struct MpdBackend {
    addr: String,
    resume_rewind: bool,
    conn: Mutex<Option<MpdConnection>>,
}

impl MpdBackend {
    pub fn new(addr: &str, resume_rewind: bool) -> Self {
        Self {
            addr: addr.to_string(),
            resume_rewind,
            conn: Mutex::new(None),
        }
    }

    /// Run one command over the shared connection, opening it first if
    /// needed. A connection-level failure drops the cached connection so the
    /// next command reconnects; the failed command itself is not retried.
    async fn command(&self, command: &str) -> Result<Vec<String>, BackendError> {
        let mut guard = self.conn.lock().await;

        if guard.is_none() {
            let mut conn = MpdConnection::open(&self.addr).await?;
            // Played entries must leave MPD's own queue.
            conn.execute("consume 1").await?;
            info!(addr = %self.addr, "Connected to MPD (consume mode on)");
            *guard = Some(conn);
        }

        let conn = match guard.as_mut() {
            Some(conn) => conn,
            None => return Err(BackendError::Disconnected),
        };

        match conn.execute(command).await {
            Ok(lines) => Ok(lines),
            Err(err) => {
                if matches!(err, BackendError::Io(_) | BackendError::Disconnected) {
                    warn!(addr = %self.addr, error = %err, "MPD connection lost");
                    *guard = None;
                }
                Err(err)
            }
        }
    }
}

#[async_trait]
impl PlaybackBackend for MpdBackend {
    async fn enqueue(&self, locator: &str) -> Result<(), BackendError> {
        debug!(locator = %locator, "MPD add");
        self.command(&format!("add {}", escape_argument(locator)))
            .await?;
        Ok(())
    }

    async fn play(&self) -> Result<(), BackendError> {
        self.command("play").await?;
        Ok(())
    }

    async fn pause(&self) -> Result<(), BackendError> {
        self.command("pause 1").await?;
        Ok(())
    }

    async fn resume(&self) -> Result<(), BackendError> {
        if self.resume_rewind {
            // Non-seekable streams make this ACK; playback still resumes.
            if let Err(err) = self.command("seekcur -1").await {
                match err {
                    BackendError::Protocol(message) => {
                        debug!(message = %message, "Resume rewind not applied");
                    }
                    other => return Err(other),
                }
            }
        }
        self.command("play").await?;
        Ok(())
    }

    async fn stop(&self) -> Result<(), BackendError> {
        self.command("stop").await?;
        Ok(())
    }

    async fn clear_queue(&self) -> Result<(), BackendError> {
        self.command("clear").await?;
        Ok(())
    }

    async fn status(&self) -> Result<BackendStatus, BackendError> {
        let lines = self.command("status").await?;
        Ok(parse_status(&lines))
    }
}
