//! Interactive shell process hosting the toolchain.

use std::io::{self, BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Start `command` outside the terminal's foreground process group.
///
/// Ctrl-C only cancels at the next step boundary, so a child already
/// running must not receive the terminal's SIGINT (or CTRL_C_EVENT).
pub(crate) fn detach_from_console_group(command: &mut Command) -> &mut Command {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
        command.creation_flags(CREATE_NEW_PROCESS_GROUP);
    }
    command
}

/// A running line-oriented interactive process.
pub trait ShellProcess: Send {
    /// Write one line followed by a newline and flush.
    fn send_line(&mut self, line: &str) -> io::Result<()>;

    /// Read the next output line without its terminator; `None` at end of output.
    fn read_line(&mut self) -> io::Result<Option<String>>;

    /// Send `command`, close input and wait up to `timeout` for the process
    /// to exit. Returns whether it exited in time.
    fn exit(&mut self, command: &str, timeout: Duration) -> io::Result<bool>;

    /// Terminate the process.
    fn kill(&mut self) -> io::Result<()>;
}

/// Starts shell processes.
pub trait ShellLauncher: Send {
    fn launch(&mut self) -> io::Result<Box<dyn ShellProcess>>;
}

/// Launches the configured system shell with piped stdio.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    shell: String,
}

impl ProcessLauncher {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl ShellLauncher for ProcessLauncher {
    fn launch(&mut self) -> io::Result<Box<dyn ShellProcess>> {
        debug!(shell = %self.shell, "Launching shell");
        let mut child = detach_from_console_group(&mut Command::new(&self.shell))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("shell stdout not captured"))?;

        // stderr is only diagnostic; drain it so the shell never blocks on it
        if let Some(stderr) = child.stderr.take() {
            thread::Builder::new()
                .name("toolchain-stderr".to_string())
                .spawn(move || {
                    for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                        trace!(target: "fleet::toolchain", "  ! {line}");
                    }
                })?;
        }

        Ok(Box::new(ChildShell {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        }))
    }
}

/// Real shell child process.
pub struct ChildShell {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl ShellProcess for ChildShell {
    fn send_line(&mut self, line: &str) -> io::Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "shell input closed"))?;
        stdin.write_all(line.as_bytes())?;
        stdin.write_all(b"\n")?;
        stdin.flush()
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        // Console output follows the OS code page, not necessarily UTF-8
        let mut buf = Vec::new();
        if self.stdout.read_until(b'\n', &mut buf)? == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&buf);
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn exit(&mut self, command: &str, timeout: Duration) -> io::Result<bool> {
        if let Err(err) = self.send_line(command) {
            warn!(error = %err, "Could not send exit command");
        }
        // closing stdin lets the shell see end of input
        self.stdin = None;

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = self.child.try_wait()? {
                debug!(%status, "Shell exited");
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            thread::sleep(EXIT_POLL_INTERVAL);
        }
    }

    fn kill(&mut self) -> io::Result<()> {
        self.child.kill()?;
        self.child.wait()?;
        Ok(())
    }
}
