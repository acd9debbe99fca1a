//! Configuration management for the syntax validator.
//!
//! Handles:
//! - Command-line argument parsing
//! - Project (`.perl-syntax.toml`) and user configuration files
//! - Deriving runner and scheduler settings
//! - Logger initialisation

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::process::{Interpreter, ProcessRunner, RunnerOptions};
use crate::scheduler::{
    SchedulerSettings, DEFAULT_INTERVAL, DEFAULT_MAX_DIAGNOSTICS, DEFAULT_TERMINATION_GRACE,
};

/// File name searched for from the working directory upward
pub const PROJECT_CONFIG_FILE: &str = ".perl-syntax.toml";
/// Directory under the platform config dir holding `config.toml`
pub const USER_CONFIG_DIR: &str = "perl-syntax-validator";

/// Command-line options shared by both binaries
#[derive(Debug, Clone, clap::Args)]
pub struct ConfigArgs {
    /// Perl interpreter to run
    #[arg(long, help = "Path to the Perl interpreter (default: perl)")]
    pub interpreter: Option<PathBuf>,

    /// Extra interpreter flags placed before `-c`
    #[arg(
        long = "interpreter-flag",
        value_name = "FLAG",
        allow_hyphen_values = true,
        help = "Extra interpreter flag, e.g. -Ilib (repeatable)"
    )]
    pub interpreter_flags: Vec<String>,

    #[arg(long, help = "Milliseconds between validation cycles")]
    pub interval_ms: Option<u64>,

    #[arg(long, help = "Milliseconds to wait for termination on shutdown")]
    pub termination_grace_ms: Option<u64>,

    #[arg(long, help = "Maximum checker output lines considered per cycle")]
    pub max_diagnostics: Option<usize>,

    #[arg(short = 'w', long, help = "Enable interpreter warnings (-w)")]
    pub warnings: bool,

    #[arg(long, help = "Abort a checker run after this many milliseconds")]
    pub check_timeout_ms: Option<u64>,

    /// Explicit configuration file, replaces project file discovery
    #[arg(long, help = "Configuration file to use instead of .perl-syntax.toml")]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        default_value = "info",
        help = "Log level (trace, debug, info, warn, error)"
    )]
    pub log_level: String,
}

impl Default for ConfigArgs {
    fn default() -> Self {
        Self {
            interpreter: None,
            interpreter_flags: Vec::new(),
            interval_ms: None,
            termination_grace_ms: None,
            max_diagnostics: None,
            warnings: false,
            check_timeout_ms: None,
            config: None,
            log_level: "info".to_string(),
        }
    }
}

/// Contents of a configuration file; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub interpreter: Option<PathBuf>,
    pub interpreter_flags: Option<Vec<String>>,
    pub interval_ms: Option<u64>,
    pub termination_grace_ms: Option<u64>,
    pub max_diagnostics: Option<usize>,
    pub warnings: Option<bool>,
    pub check_timeout_ms: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Layer `higher` on top of `self`
    pub fn merge(self, higher: FileConfig) -> FileConfig {
        FileConfig {
            interpreter: higher.interpreter.or(self.interpreter),
            interpreter_flags: higher.interpreter_flags.or(self.interpreter_flags),
            interval_ms: higher.interval_ms.or(self.interval_ms),
            termination_grace_ms: higher.termination_grace_ms.or(self.termination_grace_ms),
            max_diagnostics: higher.max_diagnostics.or(self.max_diagnostics),
            warnings: higher.warnings.or(self.warnings),
            check_timeout_ms: higher.check_timeout_ms.or(self.check_timeout_ms),
        }
    }
}

/// Combined configuration from all sources
#[derive(Debug, Clone)]
pub struct Config {
    pub interpreter: Interpreter,
    pub interval: Duration,
    pub termination_grace: Duration,
    pub max_diagnostics: usize,
    pub warnings: bool,
    pub check_timeout: Option<Duration>,
    pub log_level: String,
    /// Project or explicit config file that was applied
    pub project_config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interpreter: Interpreter::default(),
            interval: DEFAULT_INTERVAL,
            termination_grace: DEFAULT_TERMINATION_GRACE,
            max_diagnostics: DEFAULT_MAX_DIAGNOSTICS,
            warnings: false,
            check_timeout: None,
            log_level: "info".to_string(),
            project_config_path: None,
        }
    }
}

impl Config {
    /// Create configuration from command-line arguments and the files they
    /// point at or that are discovered from the working directory
    pub fn from_args(args: ConfigArgs) -> Result<Self> {
        let project = match &args.config {
            Some(explicit) => Some(explicit.clone()),
            None => {
                let cwd = std::env::current_dir().context("Failed to read working directory")?;
                Self::find_project_config(&cwd)
            }
        };
        let user = Self::user_config_path().filter(|p| p.is_file());

        Self::from_sources(args, user.as_deref(), project.as_deref())
    }

    /// Create configuration from explicit sources (useful for testing)
    pub fn from_sources(
        args: ConfigArgs,
        user_config: Option<&Path>,
        project_config: Option<&Path>,
    ) -> Result<Self> {
        let mut file = FileConfig::default();
        if let Some(path) = user_config {
            file = file.merge(FileConfig::load(path)?);
        }
        if let Some(path) = project_config {
            file = file.merge(FileConfig::load(path)?);
            log::debug!("Using project config {}", path.display());
        }

        let interpreter_path = args
            .interpreter
            .or(file.interpreter)
            .unwrap_or_else(|| Interpreter::default().path);
        let flags = if args.interpreter_flags.is_empty() {
            file.interpreter_flags.unwrap_or_default()
        } else {
            args.interpreter_flags
        };

        Ok(Config {
            interpreter: Interpreter::new(interpreter_path).with_flags(flags),
            interval: args
                .interval_ms
                .or(file.interval_ms)
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_INTERVAL),
            termination_grace: args
                .termination_grace_ms
                .or(file.termination_grace_ms)
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_TERMINATION_GRACE),
            max_diagnostics: args
                .max_diagnostics
                .or(file.max_diagnostics)
                .unwrap_or(DEFAULT_MAX_DIAGNOSTICS),
            warnings: args.warnings || file.warnings.unwrap_or(false),
            check_timeout: args
                .check_timeout_ms
                .or(file.check_timeout_ms)
                .map(Duration::from_millis),
            log_level: args.log_level,
            project_config_path: project_config.map(Path::to_path_buf),
        })
    }

    /// Walk up from `start` looking for a project config file
    pub fn find_project_config(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(PROJECT_CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// `<config_dir>/perl-syntax-validator/config.toml`
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(USER_CONFIG_DIR).join("config.toml"))
    }

    /// Interpreter path and fixed flags used for every checker run
    pub fn interpreter_invocation(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn runner_options(&self) -> RunnerOptions {
        RunnerOptions {
            warnings: self.warnings,
            check_timeout: self.check_timeout,
            termination_grace: self.termination_grace,
            temp_dir: None,
        }
    }

    pub fn process_runner(&self) -> ProcessRunner {
        ProcessRunner::new(self.interpreter_invocation().clone(), self.runner_options())
    }

    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            interval: self.interval,
            termination_grace: self.termination_grace,
            max_diagnostics: self.max_diagnostics,
        }
    }
}

/// Initialise `env_logger`, honouring `RUST_LOG` over `default_level`
pub fn init_logging(default_level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}
