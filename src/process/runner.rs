//! Checker invocation and forced termination.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::time::Instant;

use super::transient::TransientInput;

/// Flag asking the interpreter to compile only
pub const CHECK_FLAG: &str = "-c";
/// Flag enabling interpreter warnings
pub const WARNINGS_FLAG: &str = "-w";

const MAX_KILL_ATTEMPTS: u32 = 10;
const KILL_POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("failed to write transient input: {0}")]
    TransientInput(#[source] io::Error),
    #[error("failed to spawn checker '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("checker error stream was not captured")]
    MissingStream,
    #[error("failed to read checker output: {0}")]
    Read(#[source] io::Error),
    #[error("checker did not finish within {0:?}")]
    Timeout(Duration),
}

/// Resolved interpreter executable plus its fixed flags (e.g. `-Ilib`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    pub path: PathBuf,
    pub flags: Vec<String>,
}

impl Interpreter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            flags: Vec::new(),
        }
    }

    pub fn with_flags(mut self, flags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.flags = flags.into_iter().map(Into::into).collect();
        self
    }

    /// Arguments after the executable: `flags.. -c [-w] <input>`
    pub fn arguments(&self, warnings: bool, input: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.flags.iter().map(OsString::from).collect();
        args.push(CHECK_FLAG.into());
        if warnings {
            args.push(WARNINGS_FLAG.into());
        }
        args.push(input.as_os_str().to_owned());
        args
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new("perl")
    }
}

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub warnings: bool,
    /// Upper bound on a single checker run; `None` waits for the stream to close
    pub check_timeout: Option<Duration>,
    /// Time allowed for a forced termination to be confirmed
    pub termination_grace: Duration,
    /// Directory for transient inputs; the platform default when `None`
    pub temp_dir: Option<PathBuf>,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            warnings: false,
            check_timeout: None,
            termination_grace: Duration::from_millis(400),
            temp_dir: None,
        }
    }
}

/// Captured result of one checker run
#[derive(Debug, Clone)]
pub struct CheckOutput {
    /// Everything the checker wrote to its error stream
    pub stderr: String,
    /// Path of the transient input, as it appears in `stderr`
    pub input_path: String,
}

#[derive(Debug, Clone)]
pub struct ProcessRunner {
    interpreter: Interpreter,
    options: RunnerOptions,
}

impl ProcessRunner {
    pub fn new(interpreter: Interpreter, options: RunnerOptions) -> Self {
        Self {
            interpreter,
            options,
        }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Check `text` and return the checker's diagnostic stream
    ///
    /// The transient input is removed on every path out of this function.
    pub async fn run(&self, text: &str) -> Result<CheckOutput, CheckError> {
        let input = match &self.options.temp_dir {
            Some(dir) => TransientInput::create_in(dir, text),
            None => TransientInput::create(text),
        }
        .map_err(CheckError::TransientInput)?;

        let input_path = input.display_path();
        let result = self.run_against(input.path()).await;
        input.remove();

        result.map(|stderr| CheckOutput { stderr, input_path })
    }

    async fn run_against(&self, input: &Path) -> Result<String, CheckError> {
        let args = self.interpreter.arguments(self.options.warnings, input);
        log::debug!(
            "Running {} {:?}",
            self.interpreter.path.display(),
            args
        );

        let mut child = Command::new(&self.interpreter.path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CheckError::Spawn {
                program: self.interpreter.path.display().to_string(),
                source,
            })?;

        match self.capture(&mut child).await {
            Ok(stderr) => Ok(stderr),
            Err(e) => {
                terminate(&mut child, self.options.termination_grace).await;
                Err(e)
            }
        }
    }

    /// Read the error stream to its end, then reap the process
    async fn capture(&self, child: &mut Child) -> Result<String, CheckError> {
        let mut stderr = child.stderr.take().ok_or(CheckError::MissingStream)?;

        let capture = async {
            let mut buf = Vec::new();
            stderr
                .read_to_end(&mut buf)
                .await
                .map_err(CheckError::Read)?;
            let status = child.wait().await.map_err(CheckError::Read)?;
            log::debug!("Checker exited with {}", status);
            Ok::<_, CheckError>(String::from_utf8_lossy(&buf).into_owned())
        };

        match self.options.check_timeout {
            Some(limit) => tokio::time::timeout(limit, capture)
                .await
                .map_err(|_| CheckError::Timeout(limit))?,
            None => capture.await,
        }
    }
}

/// Forcibly terminate `child`, alternating kill requests and exit polls
///
/// Gives up after a bounded number of rounds or once `grace` has elapsed.
/// Returns whether the exit was confirmed.
pub async fn terminate(child: &mut Child, grace: Duration) -> bool {
    let deadline = Instant::now() + grace;
    let mut attempts = 0;

    loop {
        attempts += 1;

        // Fails harmlessly when the process already exited on its own
        if let Err(e) = child.start_kill() {
            log::trace!("Kill request failed: {}", e);
        }

        match child.try_wait() {
            Ok(Some(status)) => {
                log::debug!(
                    "Checker terminated ({}) after {} attempt(s)",
                    status,
                    attempts
                );
                return true;
            }
            Ok(None) => {}
            Err(e) => log::debug!("Polling checker exit status failed: {}", e),
        }

        if attempts >= MAX_KILL_ATTEMPTS || Instant::now() >= deadline {
            log::error!(
                "Checker process {:?} still running after {} termination attempts, giving up",
                child.id(),
                attempts
            );
            return false;
        }

        tokio::time::sleep(KILL_POLL_INTERVAL).await;
    }
}
