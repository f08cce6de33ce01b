use std::io::{self, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};

mod sink;

pub use sink::{MemorySink, OutputSink, StdoutSink};

/// Capacity of a [`CommandList`].
pub const MAX_COMMANDS: usize = 100;
pub const HEADER_PREFIX: &str = "Command: ";

/// Fixed-capacity list of shell command strings. The first empty slot ends
/// the sequence; anything after it is never looked at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandList {
    slots: Vec<String>,
}

impl CommandList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_slots<I, S>(slots: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Self::new();
        for s in slots {
            list.push(s)?;
        }
        Ok(list)
    }

    pub fn push(&mut self, command: impl Into<String>) -> Result<()> {
        if self.slots.len() >= MAX_COMMANDS {
            return Err(Error::msg(format!(
                "command list is full ({MAX_COMMANDS} commands)"
            )));
        }
        self.slots.push(command.into());
        Ok(())
    }

    /// Commands up to (not including) the first empty slot.
    pub fn active(&self) -> impl Iterator<Item = &str> {
        self.slots
            .iter()
            .map(String::as_str)
            .take_while(|s| !s.is_empty())
    }

    pub fn len(&self) -> usize {
        self.active().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub command: String,
    pub status: CommandStatus,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
}

impl CommandOutcome {
    fn pending(command: &str) -> Self {
        Self {
            command: command.to_string(),
            status: CommandStatus::Pending,
            exit_code: None,
            error: None,
        }
    }
}

/// Result of one [`Executor::run`]: the transcript exactly as it was shown
/// and one outcome per active command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub transcript: Vec<String>,
    pub outcomes: Vec<CommandOutcome>,
}

impl RunReport {
    pub fn ok(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| o.status == CommandStatus::Completed)
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == CommandStatus::Failed)
            .count()
    }
}

// Written by the foreground (headers) and by the reader thread (output),
// never both at once: the foreground is parked on the completion signal
// while a reader is alive.
#[derive(Default)]
struct Transcript {
    lines: Mutex<Vec<String>>,
}

impl Transcript {
    fn append(&self, line: String, sink: &dyn OutputSink) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.clone());
        }
        sink.append(&line);
    }

    fn publish(&self, line: String, sink: &dyn OutputSink) {
        let text = match self.lines.lock() {
            Ok(mut lines) => {
                lines.push(line);
                lines.join("\n")
            }
            Err(_) => return,
        };
        sink.replace(&text);
    }

    fn snapshot(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

enum Step {
    Exited(ExitStatus),
    SpawnFailed(String),
    Lost(String),
}

/// Runs command lists one command at a time through `<shell> -c`, streaming
/// merged stdout/stderr into the sink as it arrives.
pub struct Executor {
    shell: String,
    sink: Arc<dyn OutputSink>,
}

impl Executor {
    pub fn new(shell: impl Into<String>, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            shell: shell.into(),
            sink,
        }
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    /// Blocks until every active command has exited and its output has been
    /// drained. A failing command does not stop the sequence; a command that
    /// cannot be spawned does.
    pub fn run(&self, commands: &CommandList) -> RunReport {
        let active: Vec<&str> = commands.active().collect();
        let mut outcomes: Vec<CommandOutcome> =
            active.iter().map(|c| CommandOutcome::pending(c)).collect();
        let transcript = Arc::new(Transcript::default());

        self.sink.replace("");
        for (idx, command) in active.iter().enumerate() {
            transcript.append(format!("{HEADER_PREFIX}{command}"), self.sink.as_ref());
            let outcome = &mut outcomes[idx];
            outcome.status = CommandStatus::Running;
            info!(shell = %self.shell, command = %command, "running command");

            match self.run_one(command, &transcript) {
                Step::Exited(status) => {
                    outcome.exit_code = status.code();
                    if status.success() {
                        outcome.status = CommandStatus::Completed;
                        info!(command = %command, "command completed");
                    } else {
                        outcome.status = CommandStatus::Failed;
                        warn!(command = %command, %status, "command failed");
                        transcript.publish(status.to_string(), self.sink.as_ref());
                    }
                }
                Step::Lost(e) => {
                    outcome.status = CommandStatus::Failed;
                    warn!(command = %command, error = %e, "command output lost");
                    outcome.error = Some(e);
                }
                Step::SpawnFailed(e) => {
                    outcome.status = CommandStatus::Failed;
                    warn!(command = %command, error = %e, "spawn failed, stopping run");
                    outcome.error = Some(e);
                    break;
                }
            }
        }

        RunReport {
            transcript: transcript.snapshot(),
            outcomes,
        }
    }

    fn run_one(&self, command: &str, transcript: &Arc<Transcript>) -> Step {
        let (reader, mut child) = match self.spawn(command) {
            Ok(v) => v,
            Err(e) => return Step::SpawnFailed(e.to_string()),
        };

        // Single-slot completion signal, fired once the pipe hits EOF.
        let (done_tx, done_rx) = mpsc::sync_channel::<usize>(1);
        let worker_transcript = Arc::clone(transcript);
        let sink = Arc::clone(&self.sink);
        let spawned = thread::Builder::new()
            .name("cmd-output".into())
            .spawn(move || {
                let n = read_lines(reader, |line| {
                    worker_transcript.publish(line, sink.as_ref());
                });
                let _ = done_tx.send(n);
            });

        let drained = match spawned {
            Ok(_) => done_rx
                .recv()
                .map_err(|_| Error::msg("output reader stopped before end of stream")),
            Err(e) => Err(Error::msg(format!("failed to start output reader: {e}"))),
        };
        match drained {
            Ok(n) => debug!(command = %command, lines = n, "output drained"),
            Err(e) => {
                // Without a reader the child could block on a full pipe forever.
                let _ = child.kill();
                let _ = child.wait();
                return Step::Lost(e.to_string());
            }
        }

        match child.wait() {
            Ok(status) => Step::Exited(status),
            Err(e) => Step::Lost(format!("wait failed: {e}")),
        }
    }

    // stdout and stderr share one pipe so the child's write order survives.
    fn spawn(&self, command: &str) -> Result<(io::PipeReader, Child)> {
        let (reader, writer) = io::pipe()?;
        let err_writer = writer.try_clone()?;
        // The Command owns the parent's copies of the write end; it has to be
        // dropped before reading or EOF never arrives.
        let child = {
            let mut cmd = Command::new(&self.shell);
            cmd.arg("-c")
                .arg(command)
                .stdin(Stdio::null())
                .stdout(writer)
                .stderr(err_writer);
            cmd.spawn()
                .map_err(|e| Error::msg(format!("spawn failed: {} -c: {e}", self.shell)))?
        };
        Ok((reader, child))
    }
}

/// Split a byte stream into lines, calling `emit` for each as soon as its
/// `\n` arrives. One trailing `\r` is dropped so `\r\n` output reads the
/// same as `\n`; any other byte, a lone `\r` included, stays in the line. A
/// trailing unterminated line is emitted at EOF. Returns the number of lines.
fn read_lines<R: Read>(reader: R, mut emit: impl FnMut(String)) -> usize {
    let mut r = BufReader::new(reader);
    let mut buf = [0u8; 8192];
    let mut pending: Vec<u8> = Vec::with_capacity(1024);
    let mut count = 0usize;

    let mut flush = |pending: &mut Vec<u8>| {
        if pending.last() == Some(&b'\r') {
            pending.pop();
        }
        let line = String::from_utf8_lossy(pending).into_owned();
        pending.clear();
        count += 1;
        emit(line);
    };

    loop {
        let n = match r.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        };
        let mut rest = &buf[..n];
        while let Some(pos) = rest.iter().position(|b| *b == b'\n') {
            pending.extend_from_slice(&rest[..pos]);
            flush(&mut pending);
            rest = &rest[pos + 1..];
        }
        pending.extend_from_slice(rest);
    }

    if !pending.is_empty() {
        flush(&mut pending);
    }
    count
}
