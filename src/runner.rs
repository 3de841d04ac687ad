//! Running spec files.
//!
//! [`SpecRunner`] ties the pieces together for one spec: read and parse the
//! file, drive a fresh session through its inputs, then compare what the session
//! rendered against the expected output.
//!
//! The free functions [`run_spec`] and [`run_spec_dir`] are the usual entry
//! points. They read [`RunConfig::from_env`], prepare tmux with
//! [`Tmux::setup`], run, and restore tmux with [`Tmux::teardown`].
//! [`assert_spec`] and [`assert_spec_dir`] wrap them for use inside `#[test]`
//! functions.
//!
//! # Example
//!
//! ```rust,no_run
//! #[test]
//! fn echo_spec() {
//!     tmux_tui_testing::assert_spec("tests/specs/echo.spec");
//! }
//! ```
//!
//! Mismatches are not errors at the runner level: a run that reached the
//! comparison returns a [`TestOutcome`], passing or not. Use
//! [`TestOutcome::into_result`] to turn a failing outcome into
//! [`TttError::ComparisonMismatch`].

use std::{
    fmt,
    fs,
    path::{Path, PathBuf},
};

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::{
    compare::{compare, Comparison},
    config::RunConfig,
    controller::{TerminalController, Tmux},
    driver::drive,
    error::{Result, TttError},
    parser::TestSpec,
};

type CleanupHook = Box<dyn Fn() + Send + Sync>;

/// Result of one spec that ran to the comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct TestOutcome {
    /// Test name from the spec.
    pub name: String,
    /// Spec file, when the run started from one.
    pub path: Option<PathBuf>,
    /// Snapshots taken during the run.
    pub snapshots: Vec<String>,
    /// Comparison of the combined output against the expected output.
    pub comparison: Comparison,
}

impl TestOutcome {
    /// Whether the output matched.
    pub fn passed(&self) -> bool {
        self.comparison.passed()
    }

    /// Converts a failing outcome into [`TttError::ComparisonMismatch`].
    pub fn into_result(self) -> Result<Self> {
        if self.passed() {
            return Ok(self);
        }
        Err(TttError::ComparisonMismatch {
            name: self.name,
            comparison: Box::new(self.comparison),
        })
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed() {
            return write!(f, "PASS {}", self.name);
        }
        writeln!(f, "FAIL {}", self.name)?;
        writeln!(f, "{}", self.comparison)?;
        write!(f, "{}", self.comparison.unified_diff())
    }
}

/// One entry of a directory run.
#[derive(Debug)]
pub struct SpecRun {
    /// The spec file.
    pub path: PathBuf,
    /// The outcome, or the error that stopped the run before comparison.
    pub result: Result<TestOutcome>,
}

impl SpecRun {
    /// Whether the spec ran and its output matched.
    pub fn passed(&self) -> bool {
        matches!(&self.result, Ok(outcome) if outcome.passed())
    }
}

/// Runs specs against a terminal controller.
pub struct SpecRunner<C: TerminalController> {
    controller: C,
    config: RunConfig,
    cleanup: Option<CleanupHook>,
}

impl<C: TerminalController> fmt::Debug for SpecRunner<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecRunner")
            .field("config", &self.config)
            .field("cleanup", &self.cleanup.is_some())
            .finish_non_exhaustive()
    }
}

impl SpecRunner<Tmux> {
    /// Creates a runner backed by tmux.
    pub fn tmux(config: RunConfig) -> Self {
        let tmux = Tmux::from_config(&config);
        Self::new(tmux, config)
    }
}

impl<C: TerminalController> SpecRunner<C> {
    /// Creates a runner.
    pub fn new(controller: C, config: RunConfig) -> Self {
        Self {
            controller,
            config,
            cleanup: None,
        }
    }

    /// Registers a hook called after every executed spec, pass or fail.
    ///
    /// The hook is not called for specs that fail to parse, since no session
    /// was started for them.
    pub fn with_cleanup(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.cleanup = Some(Box::new(hook));
        self
    }

    /// The controller.
    pub fn controller(&self) -> &C {
        &self.controller
    }

    /// The run configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Drives a parsed spec and compares its output.
    ///
    /// # Errors
    ///
    /// Returns the controller error or timeout that stopped the run. An output
    /// mismatch is reported through the returned [`TestOutcome`].
    pub async fn execute(&self, spec: &TestSpec) -> Result<TestOutcome> {
        tracing::info!(name = %spec.name, program = %spec.root_program, "running spec");

        let result = drive(&self.controller, spec, &self.config).await;
        self.run_cleanup();

        let output = match result {
            Ok(output) => output,
            Err(err) => {
                tracing::info!(name = %spec.name, error = %err, "spec errored");
                return Err(err);
            }
        };

        let comparison = compare(&output.combined(), &spec.expected_output);
        tracing::info!(name = %spec.name, passed = comparison.passed(), "spec finished");

        Ok(TestOutcome {
            name: spec.name.clone(),
            path: None,
            snapshots: output.snapshots,
            comparison,
        })
    }

    /// Reads, parses and executes one spec file.
    ///
    /// # Errors
    ///
    /// Returns [`TttError::Io`] or [`TttError::Parse`] if the file cannot be
    /// read, otherwise whatever [`SpecRunner::execute`] returns.
    pub async fn run_spec_async(&self, path: impl AsRef<Path>) -> Result<TestOutcome> {
        let path = path.as_ref();
        let spec = TestSpec::from_file(path)?;
        let mut outcome = self.execute(&spec).await?;
        outcome.path = Some(path.to_path_buf());
        Ok(outcome)
    }

    /// Runs every file directly inside `dir`, in file-name order.
    ///
    /// Subdirectories are skipped, not descended into. Execution errors are
    /// recorded per spec and the batch continues.
    ///
    /// # Errors
    ///
    /// Stops the batch if the directory cannot be listed or a spec file cannot
    /// be read or parsed.
    pub async fn run_spec_dir_async(&self, dir: impl AsRef<Path>) -> Result<Vec<SpecRun>> {
        let dir = dir.as_ref();
        let paths = spec_files(dir)?;
        tracing::debug!(dir = %dir.display(), count = paths.len(), "running spec directory");

        let mut runs = Vec::with_capacity(paths.len());
        for path in paths {
            let spec = TestSpec::from_file(&path)?;
            let result = self.execute(&spec).await.map(|mut outcome| {
                outcome.path = Some(path.clone());
                outcome
            });
            runs.push(SpecRun { path, result });
        }
        Ok(runs)
    }

    /// Blocking form of [`SpecRunner::run_spec_async`].
    ///
    /// Builds its own current-thread runtime, so it must not be called from
    /// within a tokio runtime.
    ///
    /// # Errors
    ///
    /// See [`SpecRunner::run_spec_async`].
    pub fn run_spec(&self, path: impl AsRef<Path>) -> Result<TestOutcome> {
        block_on(self.run_spec_async(path))?
    }

    /// Blocking form of [`SpecRunner::run_spec_dir_async`].
    ///
    /// # Errors
    ///
    /// See [`SpecRunner::run_spec_dir_async`].
    pub fn run_spec_dir(&self, dir: impl AsRef<Path>) -> Result<Vec<SpecRun>> {
        block_on(self.run_spec_dir_async(dir))?
    }

    fn run_cleanup(&self) {
        if let Some(hook) = &self.cleanup {
            hook();
        }
    }
}

fn spec_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }
        paths.push(entry.path());
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

fn block_on<F: std::future::Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build()?;
    Ok(runtime.block_on(future))
}

fn with_tmux<T>(run: impl FnOnce(&SpecRunner<Tmux>) -> Result<T>) -> Result<T> {
    let runner = SpecRunner::tmux(RunConfig::from_env());
    let tmux = runner.controller();
    let state = tmux.setup()?;

    let result = run(&runner);

    if let Err(err) = tmux.teardown(state) {
        tracing::warn!(error = %err, "failed to restore tmux");
    }
    result
}

/// Runs one spec file against tmux, configured from the environment.
///
/// # Errors
///
/// Returns setup, parse and execution errors. A mismatch is reported through
/// the [`TestOutcome`].
pub fn run_spec(path: impl AsRef<Path>) -> Result<TestOutcome> {
    with_tmux(|runner| runner.run_spec(path))
}

/// Runs every spec file in a directory against tmux, configured from the
/// environment.
///
/// # Errors
///
/// See [`SpecRunner::run_spec_dir_async`].
pub fn run_spec_dir(dir: impl AsRef<Path>) -> Result<Vec<SpecRun>> {
    with_tmux(|runner| runner.run_spec_dir(dir))
}

/// Runs one spec file and panics with the report unless it passes.
#[track_caller]
pub fn assert_spec(path: impl AsRef<Path>) {
    let path = path.as_ref();
    if let Err(err) = run_spec(path).and_then(TestOutcome::into_result) {
        panic!("spec {} failed: {}", path.display(), err);
    }
}

/// Runs a directory of specs and panics with every failure unless all pass.
#[track_caller]
pub fn assert_spec_dir(dir: impl AsRef<Path>) {
    let dir = dir.as_ref();
    let runs = match run_spec_dir(dir) {
        Ok(runs) => runs,
        Err(err) => panic!("spec directory {} failed: {}", dir.display(), err),
    };
    if let Some(report) = failure_report(&runs) {
        panic!("{}", report);
    }
}

fn failure_report(runs: &[SpecRun]) -> Option<String> {
    let failures: Vec<String> = runs
        .iter()
        .filter(|run| !run.passed())
        .map(|run| match &run.result {
            Ok(outcome) => outcome.to_string(),
            Err(err) => format!("ERROR {}: {}", run.path.display(), err),
        })
        .collect();

    if failures.is_empty() {
        return None;
    }
    Some(format!(
        "{} of {} specs failed:\n\n{}",
        failures.len(),
        runs.len(),
        failures.join("\n\n")
    ))
}
