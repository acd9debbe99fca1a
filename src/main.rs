use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use perl_syntax_validator::sink::ConsoleFormat;
use perl_syntax_validator::validation::DiagnosticSetExt;
use perl_syntax_validator::{
    init_logging, validate_once, Config, ConfigArgs, ConsoleSink, MarkerSink,
    ValidationScheduler, Validator,
};

/// Check the syntax of a Perl file, once or whenever it changes
#[derive(Debug, Parser)]
#[command(name = "perl-syntax-validator")]
#[command(version)]
struct Cli {
    /// Perl source file to check
    file: PathBuf,

    #[arg(long, help = "Keep running and recheck the file whenever it changes")]
    watch: bool,

    #[arg(long, help = "Print diagnostics as JSON lines")]
    json: bool,

    #[command(flatten)]
    config: ConfigArgs,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli.config.log_level);

    let config = Config::from_args(cli.config)?;
    let sink = ConsoleSink::new(if cli.json {
        ConsoleFormat::Json
    } else {
        ConsoleFormat::Human
    });

    if cli.watch {
        watch(&cli.file, &config, sink).await?;
        Ok(ExitCode::SUCCESS)
    } else {
        check_once(&cli.file, &config, sink).await
    }
}

/// Check the file a single time; exit status 1 when errors were found
async fn check_once(file: &Path, config: &Config, sink: ConsoleSink) -> Result<ExitCode> {
    let text = read_source(file).await?;
    let diagnostics = validate_once(&config.process_runner(), &text, config.max_diagnostics)
        .await
        .with_context(|| format!("Failed to check {}", file.display()))?;

    let has_errors = diagnostics.has_errors();
    sink.replace_markers(&file.display().to_string(), &text, diagnostics)
        .await;

    Ok(if has_errors {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}

/// Revalidate in the background, feeding the worker on every file change
async fn watch(file: &Path, config: &Config, sink: ConsoleSink) -> Result<()> {
    let validator = Validator::new(
        config.process_runner(),
        Arc::new(sink),
        file.display().to_string(),
    );
    let mut scheduler = ValidationScheduler::new(validator, config.scheduler_settings());
    scheduler.set_text(read_source(file).await?);
    scheduler.start();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let file_name = file.file_name().map(|n| n.to_os_string());
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let EventKind::Create(_) | EventKind::Modify(_) = event.kind {
                    if event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name)
                    {
                        let _ = tx.send(());
                    }
                }
            }
            Err(e) => log::warn!("File watcher error: {}", e),
        },
        notify::Config::default(),
    )?;

    // Watch the directory so editors that replace the file on save are seen
    let dir = match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    watcher
        .watch(dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch {}", dir.display()))?;
    log::info!("Watching {}", file.display());

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = rx.recv() => {
                if changed.is_none() {
                    break;
                }
                match read_source(file).await {
                    Ok(text) => scheduler.set_text(text),
                    Err(e) => log::warn!("{:#}", e),
                }
            }
            _ = &mut shutdown => break,
        }
    }

    scheduler.stop().await;
    Ok(())
}

async fn read_source(file: &Path) -> Result<String> {
    tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))
}
