//! Integration tests for the background validation worker
#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use perl_syntax_validator::process::{Interpreter, ProcessRunner, RunnerOptions};
use perl_syntax_validator::{
    CollectingSink, SchedulerSettings, Severity, ValidationScheduler, Validator, WorkerState,
};

const WAIT: Duration = Duration::from_secs(10);
const RESOURCE: &str = "file:///project/script.pl";

/// A checker reporting a syntax error for every line containing `BAD`,
/// and counting its own invocations
struct Harness {
    scripts: tempfile::TempDir,
    inputs: tempfile::TempDir,
    counter: PathBuf,
    sink: Arc<CollectingSink>,
}

impl Harness {
    fn new() -> Self {
        let scripts = tempfile::tempdir().expect("tempdir");
        let inputs = tempfile::tempdir().expect("tempdir");
        let counter = scripts.path().join("runs");
        Self {
            scripts,
            inputs,
            counter,
            sink: Arc::new(CollectingSink::new()),
        }
    }

    fn checker(&self) -> Interpreter {
        let script = self.scripts.path().join("checker.sh");
        let body = format!(
            r#"for input; do :; done
echo run >> "{counter}"
grep -n BAD "$input" | while IFS=: read n rest; do
  echo "syntax error at $input line $n, near \"BAD\"" >&2
done
"#,
            counter = self.counter.display()
        );
        std::fs::write(&script, body).expect("write checker");
        Interpreter::new("sh").with_flags([script.to_string_lossy().into_owned()])
    }

    /// Checker that reports an error only after `delay`
    fn slow_checker(&self, delay: &str) -> Interpreter {
        let script = self.scripts.path().join("slow.sh");
        let body = format!(
            r#"for input; do :; done
sleep {delay}
echo "syntax error at $input line 1, near \"BAD\"" >&2
"#
        );
        std::fs::write(&script, body).expect("write checker");
        Interpreter::new("sh").with_flags([script.to_string_lossy().into_owned()])
    }

    fn scheduler_with(
        &self,
        interpreter: Interpreter,
        termination_grace: Duration,
    ) -> ValidationScheduler {
        let runner = ProcessRunner::new(
            interpreter,
            RunnerOptions {
                temp_dir: Some(self.inputs.path().to_path_buf()),
                ..Default::default()
            },
        );
        let validator = Validator::new(runner, self.sink.clone(), RESOURCE);
        ValidationScheduler::new(
            validator,
            SchedulerSettings {
                interval: Duration::from_millis(30),
                termination_grace,
                max_diagnostics: 10,
            },
        )
    }

    fn scheduler(&self) -> ValidationScheduler {
        self.scheduler_with(self.checker(), Duration::from_secs(5))
    }

    fn runs(&self) -> usize {
        std::fs::read_to_string(&self.counter)
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    async fn wait_for_runs(&self, runs: usize) -> bool {
        let deadline = tokio::time::Instant::now() + WAIT;
        while tokio::time::Instant::now() < deadline {
            if self.runs() >= runs {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

fn inputs_left(dir: &Path) -> usize {
    std::fs::read_dir(dir).expect("read dir").count()
}

#[tokio::test]
async fn test_publishes_diagnostics() {
    let harness = Harness::new();
    let mut scheduler = harness.scheduler();
    scheduler.set_text("use strict;\n  BAD;\n");
    scheduler.start();

    assert!(harness.sink.wait_for_calls(1, WAIT).await);
    let published = harness.sink.published().await;
    assert_eq!(published[0].0, RESOURCE);

    let diagnostics = &published[0].1;
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].line, 2);
    assert_eq!(diagnostics[0].severity, Severity::Error);
    assert_eq!(diagnostics[0].message, "syntax error at line 2, near \"BAD\"");
    let range = diagnostics[0].range.expect("range");
    assert_eq!((range.start, range.end), (14, 18));

    assert!(scheduler.stop().await);
    assert_eq!(inputs_left(harness.inputs.path()), 0);
}

#[tokio::test]
async fn test_unchanged_text_is_not_rechecked() {
    let harness = Harness::new();
    let mut scheduler = harness.scheduler();
    scheduler.set_text("BAD\n");
    scheduler.start();

    assert!(harness.sink.wait_for_calls(1, WAIT).await);
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(harness.runs(), 1);
    assert_eq!(harness.sink.calls(), 1);

    // Staging identical text changes nothing either
    scheduler.set_text("BAD\n");
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(harness.runs(), 1);
    assert_eq!(harness.sink.calls(), 1);

    assert!(scheduler.stop().await);
}

#[tokio::test]
async fn test_unchanged_output_is_not_republished() {
    let harness = Harness::new();
    let mut scheduler = harness.scheduler();
    scheduler.set_text("BAD\n");
    scheduler.start();
    assert!(harness.sink.wait_for_calls(1, WAIT).await);

    // Comment-only edit: checker runs again, output is the same
    scheduler.set_text("BAD\n# just a comment\n");
    assert!(harness.wait_for_runs(2).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.sink.calls(), 1);

    // A real change is published
    scheduler.set_text("print 1;\nBAD\n");
    assert!(harness.sink.wait_for_calls(2, WAIT).await);
    let latest = harness.sink.latest().await.expect("published set");
    assert_eq!(latest[0].line, 2);

    assert!(scheduler.stop().await);
}

#[tokio::test]
async fn test_forced_revalidation_reruns_and_republishes() {
    let harness = Harness::new();
    let mut scheduler = harness.scheduler();
    scheduler.set_text("BAD\n");
    scheduler.start();
    assert!(harness.sink.wait_for_calls(1, WAIT).await);

    scheduler.set_text_forced("BAD\n", true);
    assert!(harness.sink.wait_for_calls(2, WAIT).await);
    assert_eq!(harness.runs(), 2);

    assert!(scheduler.stop().await);
}

#[tokio::test]
async fn test_clean_text_replaces_previous_set() {
    let harness = Harness::new();
    let mut scheduler = harness.scheduler();
    scheduler.set_text("BAD\n");
    scheduler.start();
    assert!(harness.sink.wait_for_calls(1, WAIT).await);

    scheduler.set_text("print 1;\n");
    assert!(harness.sink.wait_for_calls(2, WAIT).await);
    assert_eq!(harness.sink.latest().await, Some(Vec::new()));

    assert!(scheduler.stop().await);
}

#[tokio::test]
async fn test_no_publication_after_stop() {
    let harness = Harness::new();
    let mut scheduler = harness.scheduler();
    scheduler.set_text("BAD\n");
    scheduler.start();
    assert!(harness.sink.wait_for_calls(1, WAIT).await);

    assert!(scheduler.stop().await);
    assert_eq!(scheduler.state(), WorkerState::Terminated);

    scheduler.set_text("print 1;\nBAD\n");
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(harness.sink.calls(), 1);
    assert_eq!(harness.runs(), 1);
}

#[tokio::test]
async fn test_failing_cycles_keep_the_loop_alive() {
    let harness = Harness::new();
    let mut scheduler = harness.scheduler_with(
        Interpreter::new("/nonexistent/definitely-not-perl"),
        Duration::from_secs(5),
    );
    scheduler.set_text("BAD\n");
    scheduler.start();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_ne!(scheduler.state(), WorkerState::Terminated);
    assert_eq!(harness.sink.calls(), 0);
    assert_eq!(inputs_left(harness.inputs.path()), 0);

    assert!(scheduler.stop().await);
}

#[tokio::test]
async fn test_knobs_are_tunable() {
    let harness = Harness::new();
    let scheduler = harness.scheduler();

    assert_eq!(scheduler.state(), WorkerState::Idle);
    assert_eq!(scheduler.text(), None);

    scheduler.set_interval(Duration::from_millis(1500));
    scheduler.set_max_diagnostics(25);
    scheduler.set_text("1;\n");

    assert_eq!(scheduler.interval(), Duration::from_millis(1500));
    assert_eq!(scheduler.max_diagnostics(), 25);
    assert_eq!(scheduler.text().as_deref(), Some("1;\n"));
}

#[tokio::test]
async fn test_max_diagnostics_caps_report() {
    let harness = Harness::new();
    let mut scheduler = harness.scheduler();
    scheduler.set_max_diagnostics(2);
    scheduler.set_text("BAD\nBAD\nBAD\nBAD\n");
    scheduler.start();

    assert!(harness.sink.wait_for_calls(1, WAIT).await);
    let latest = harness.sink.latest().await.expect("published set");
    assert_eq!(latest.len(), 2);

    assert!(scheduler.stop().await);
}

#[tokio::test]
async fn test_slow_run_is_discarded_after_stop() {
    let harness = Harness::new();
    let mut scheduler =
        harness.scheduler_with(harness.slow_checker("0.8"), Duration::from_millis(400));
    scheduler.set_text("BAD\n");
    scheduler.start();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The checker is still running, so the worker cannot acknowledge in time
    assert!(!scheduler.stop().await);
    assert_eq!(harness.sink.calls(), 0);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(harness.sink.calls(), 0);
    assert_eq!(scheduler.state(), WorkerState::Terminated);
    assert_eq!(inputs_left(harness.inputs.path()), 0);
}

#[tokio::test]
async fn test_new_cap_applies_to_unchanged_text() {
    let harness = Harness::new();
    let mut scheduler = harness.scheduler();
    scheduler.set_max_diagnostics(1);
    scheduler.set_text("BAD\nBAD\nBAD\n");
    scheduler.start();

    assert!(harness.sink.wait_for_calls(1, WAIT).await);
    assert_eq!(harness.sink.latest().await.expect("published set").len(), 1);

    scheduler.set_max_diagnostics(3);
    assert!(harness.sink.wait_for_calls(2, WAIT).await);
    assert_eq!(harness.sink.latest().await.expect("published set").len(), 3);

    // Setting the same cap again changes nothing
    scheduler.set_max_diagnostics(3);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(harness.sink.calls(), 2);

    assert!(scheduler.stop().await);
}
