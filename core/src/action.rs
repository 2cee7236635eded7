pub mod error {
    #[allow(unused_imports)]
    pub(crate) use anyhow::{anyhow, bail, ensure, Context as _};
    pub use anyhow::{Error, Result};
}
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use error::*;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::{Config, FixturePattern};
use crate::metadata;
use crate::testing::{
    ArtifactIdGen, CompileOutcome, CompiledArtifact, ExecutionResult, Executor, JudgeCode,
    TestCase,
};

/// Receives the outcome of every fixture and testcase as soon as it is known.
pub trait Reporter {
    /// The fixture could not be turned into testcases.
    fn fixture_error(&mut self, path: &Path, error: &Error);

    /// A testcase that was expected to compile did not (or the compiler could not be run).
    fn compile_error(&mut self, case: &TestCase, diagnostic: &str);

    /// A testcase annotated with `compile_fail`; `passed` is true iff compilation failed.
    fn compile_fail_checked(&mut self, case: &TestCase, passed: bool);

    /// Called in completion order.
    fn execution_finished(&mut self, result: &ExecutionResult);

    fn finished(&mut self, _summary: &Summary) {}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub passed: usize,
    pub fixture_errors: usize,
    pub failures: HashMap<JudgeCode, usize>,
}

impl Summary {
    pub fn num_failed(&self) -> usize {
        self.failures.values().sum()
    }

    pub fn num_cases(&self) -> usize {
        self.passed + self.num_failed()
    }

    pub fn any_failed(&self) -> bool {
        self.fixture_errors > 0 || self.num_failed() > 0
    }

    fn record(&mut self, judge: JudgeCode) {
        if judge == JudgeCode::AC {
            self.passed += 1;
        } else {
            *self.failures.entry(judge).or_default() += 1;
        }
    }
}

/// Writes the example config into `dir` and returns its path.
pub fn init_config(dir: impl AsRef<Path>) -> Result<PathBuf> {
    let path = dir.as_ref().join(Config::FILENAME);
    let toml = Config::example_toml()?;
    fsutil::write_new_with_mkdir(&path, toml).context("Failed to write config")?;
    Ok(path)
}

/// Expands the command line arguments into fixture files.
///
/// Directories are searched recursively for files matching `pattern`. A missing path is an
/// error for the whole run. Returned paths are canonical.
pub fn collect_fixtures(args: &[PathBuf], pattern: &FixturePattern) -> Result<Vec<PathBuf>> {
    let mut fixtures = Vec::new();
    for arg in args {
        ensure!(
            arg.exists(),
            "test file not found: {}",
            arg.to_string_lossy()
        );
        if arg.is_dir() {
            fixtures.extend(
                fsutil::find_files_recursively(arg, pattern)
                    .with_context(|| format!("No fixture in {}", arg.to_string_lossy()))?,
            );
        } else {
            fixtures.push(arg.clone());
        }
    }
    fixtures
        .iter()
        .map(|p| fsutil::canonicalize_path(p).map_err(Error::from))
        .collect()
}

/// Number of parallel executions: the configured number of jobs (or the number of CPUs),
/// capped by the number of artifacts, and at least one.
pub fn worker_count(jobs: Option<usize>, num_artifacts: usize) -> usize {
    let jobs = jobs.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(4)
    });
    jobs.min(num_artifacts).max(1)
}

fn discard_artifact(artifact: &CompiledArtifact) {
    if let Err(e) = fsutil::remove_file(&artifact.exe_path) {
        log::warn!("{:#}", e);
    }
}

/// Extracts testcases from every fixture, compiles them one by one, then executes the
/// compiled ones in parallel.
///
/// Individual failures never stop the run; they are reported and counted in the returned
/// summary.
pub async fn do_test(
    fixtures: &[PathBuf],
    cfg: &Config,
    reporter: &mut impl Reporter,
) -> Result<Summary> {
    let mut summary = Summary::default();

    let mut cases = Vec::new();
    for path in fixtures {
        match metadata::parse(path, &cfg.test.comment_marker) {
            Ok(found) => {
                if found.is_empty() {
                    log::warn!("No testcase in {}", path.to_string_lossy());
                }
                cases.extend(found);
            }
            Err(e) => {
                summary.fixture_errors += 1;
                reporter.fixture_error(path, &e.into());
            }
        }
    }

    let compiled = compile_all(cases, cfg, &mut summary, reporter).await;
    execute_all(compiled, cfg, &mut summary, reporter).await;

    reporter.finished(&summary);
    Ok(summary)
}

async fn compile_all(
    cases: Vec<TestCase>,
    cfg: &Config,
    summary: &mut Summary,
    reporter: &mut impl Reporter,
) -> Vec<CompiledArtifact> {
    let compiler = cfg.compiler();
    let ids = ArtifactIdGen::new();

    let bar = ProgressBar::new(cases.len() as u64).with_style(
        ProgressStyle::with_template("{spinner} Compiling [{pos}/{len}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(Duration::from_millis(100));

    let mut compiled = Vec::with_capacity(cases.len());
    for case in cases {
        bar.set_message(format!("{} ({})", case.name, case.file_stem()));
        let outcome = compiler.compile(&case, &ids).await;
        bar.inc(1);

        bar.suspend(|| match (outcome, case.compilation_should_fail) {
            (Err(e), _) => {
                summary.record(JudgeCode::IE);
                reporter.compile_error(&case, &format!("{:#}", e));
            }
            (Ok(CompileOutcome::Failed { .. }), true) => {
                summary.record(JudgeCode::AC);
                reporter.compile_fail_checked(&case, true);
            }
            (Ok(CompileOutcome::Compiled(artifact)), true) => {
                summary.record(JudgeCode::CE);
                reporter.compile_fail_checked(&case, false);
                if !cfg.test.keep_artifacts {
                    discard_artifact(&artifact);
                }
            }
            (Ok(CompileOutcome::Failed { diagnostic }), false) => {
                summary.record(JudgeCode::CE);
                reporter.compile_error(&case, &diagnostic);
            }
            (Ok(CompileOutcome::Compiled(artifact)), false) => compiled.push(artifact),
        });
    }
    bar.finish_and_clear();
    compiled
}

async fn execute_all(
    compiled: Vec<CompiledArtifact>,
    cfg: &Config,
    summary: &mut Summary,
    reporter: &mut impl Reporter,
) {
    if compiled.is_empty() {
        return;
    }

    let workers = worker_count(cfg.test.jobs, compiled.len());
    log::info!("Running {} testcases on {} workers", compiled.len(), workers);

    let executor = Arc::new(cfg.executor());
    let semaphore = Arc::new(Semaphore::new(workers));
    let keep_artifacts = cfg.test.keep_artifacts;

    let mut tasks = JoinSet::new();
    let mut pending = HashMap::with_capacity(compiled.len());
    for artifact in compiled {
        pending.insert(artifact.id, artifact.case.clone());
        let (executor, semaphore) = (executor.clone(), semaphore.clone());
        tasks.spawn(run_worker(artifact, executor, semaphore, keep_artifacts));
    }

    collect_results(tasks, pending, summary, reporter).await;
}

/// Reports every worker result in completion order. Cases whose worker task itself failed are
/// reported as [`JudgeCode::IE`] once all tasks are done.
async fn collect_results(
    mut tasks: JoinSet<(u64, ExecutionResult)>,
    mut pending: HashMap<u64, TestCase>,
    summary: &mut Summary,
    reporter: &mut impl Reporter,
) {
    let mut failure = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((id, result)) => {
                pending.remove(&id);
                summary.record(result.judge);
                reporter.execution_finished(&result);
            }
            Err(e) => {
                // panics of the execution itself are caught in `run_worker`
                log::error!("Worker task failed: {}", e);
                failure = Some(format!("Worker task failed: {}", e));
            }
        }
    }

    let mut lost: Vec<_> = pending.into_iter().collect();
    lost.sort_by_key(|(id, _)| *id);
    for (_, case) in lost {
        let msg = failure.clone().unwrap_or_else(|| "Worker task failed".to_owned());
        let result = ExecutionResult::internal_error(case, msg);
        summary.record(result.judge);
        reporter.execution_finished(&result);
    }
}

async fn run_worker(
    artifact: CompiledArtifact,
    executor: Arc<Executor>,
    semaphore: Arc<Semaphore>,
    keep_artifacts: bool,
) -> (u64, ExecutionResult) {
    let (id, case) = (artifact.id, artifact.case.clone());
    let Ok(_permit) = semaphore.acquire_owned().await else {
        return (id, ExecutionResult::internal_error(case, "Worker pool is closed"))
    };

    let execution = tokio::spawn(async move {
        let result = executor.execute(&artifact).await;
        if !keep_artifacts {
            discard_artifact(&artifact);
        }
        result
    });
    let result = execution.await.unwrap_or_else(|e| {
        log::error!("Execution of '{}' panicked: {}", case.name, e);
        ExecutionResult::internal_error(case, format!("Execution panicked: {}", e))
    });
    (id, result)
}
