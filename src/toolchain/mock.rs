//! Scripted toolchain shell for tests.
//!
//! Reacts to the session protocol the way the Vivado Tcl console does:
//! `puts "..."` echoes its text and `program_hw_devices` answers with the
//! next queued startup-status line (`HIGH` when the queue is empty).
//!
//! ```rust,ignore
//! let shell = ScriptedShell::new().with_program_results(&["LOW", "HIGH"]);
//! let mut session = Session::with_installation(Some(path), Box::new(shell.launcher()), options);
//! assert!(session.program(Path::new("top.bit"))?);
//! assert_eq!(shell.count_sent("program_hw_devices"), 2);
//! ```

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::process::{ShellLauncher, ShellProcess};
use super::{PROGRAM_COMMAND, STARTUP_STATUS_MARKER};

#[derive(Debug, Default)]
struct Script {
    sent: Vec<String>,
    output: VecDeque<String>,
    program_results: VecDeque<String>,
    launches: usize,
    broken_input: bool,
    hang_on_exit: bool,
    exited: bool,
    killed: bool,
}

/// Shared handle to a scripted shell; clones observe the same transcript.
#[derive(Debug, Clone, Default)]
pub struct ScriptedShell {
    script: Arc<Mutex<Script>>,
}

impl ScriptedShell {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue startup-status results (`"HIGH"`, `"LOW"`) for program commands.
    #[must_use]
    pub fn with_program_results(self, results: &[&str]) -> Self {
        self.lock()
            .program_results
            .extend(results.iter().map(|r| (*r).to_string()));
        self
    }

    /// Make every write fail as if the process had died.
    #[must_use]
    pub fn with_broken_input(self) -> Self {
        self.lock().broken_input = true;
        self
    }

    /// Ignore `exit`, forcing the session to kill the process.
    #[must_use]
    pub fn with_hang_on_exit(self) -> Self {
        self.lock().hang_on_exit = true;
        self
    }

    /// Launcher producing processes bound to this script.
    #[must_use]
    pub fn launcher(&self) -> ScriptedLauncher {
        ScriptedLauncher {
            shell: self.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Every line written to the process, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<String> {
        self.lock().sent.clone()
    }

    /// Number of sent lines starting with `prefix`.
    #[must_use]
    pub fn count_sent(&self, prefix: &str) -> usize {
        self.lock()
            .sent
            .iter()
            .filter(|line| line.starts_with(prefix))
            .count()
    }

    #[must_use]
    pub fn launches(&self) -> usize {
        self.lock().launches
    }

    #[must_use]
    pub fn exited(&self) -> bool {
        self.lock().exited
    }

    #[must_use]
    pub fn killed(&self) -> bool {
        self.lock().killed
    }
}

/// Launcher for [`ScriptedShell`].
#[derive(Debug, Clone)]
pub struct ScriptedLauncher {
    shell: ScriptedShell,
}

impl ShellLauncher for ScriptedLauncher {
    fn launch(&mut self) -> io::Result<Box<dyn ShellProcess>> {
        self.shell.lock().launches += 1;
        Ok(Box::new(ScriptedProcess {
            shell: self.shell.clone(),
        }))
    }
}

struct ScriptedProcess {
    shell: ScriptedShell,
}

impl ShellProcess for ScriptedProcess {
    fn send_line(&mut self, line: &str) -> io::Result<()> {
        let mut script = self.shell.lock();
        if script.broken_input || script.exited || script.killed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
        }
        script.sent.push(line.to_string());

        if let Some(text) = line
            .strip_prefix("puts \"")
            .and_then(|rest| rest.strip_suffix('"'))
        {
            script.output.push_back(text.to_string());
        } else if line.starts_with(PROGRAM_COMMAND) {
            let result = script
                .program_results
                .pop_front()
                .unwrap_or_else(|| "HIGH".to_string());
            script.output.push_back("INFO: [Labtools 27-3164] Programming device".to_string());
            script
                .output
                .push_back(format!("{STARTUP_STATUS_MARKER}: {result}"));
        } else {
            script.output.push_back(format!("% {line}"));
        }
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.shell.lock().output.pop_front())
    }

    fn exit(&mut self, command: &str, _timeout: Duration) -> io::Result<bool> {
        let mut script = self.shell.lock();
        script.sent.push(command.to_string());
        if script.hang_on_exit {
            return Ok(false);
        }
        script.exited = true;
        Ok(true)
    }

    fn kill(&mut self) -> io::Result<()> {
        self.shell.lock().killed = true;
        Ok(())
    }
}
