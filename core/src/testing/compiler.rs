use std::{
    env::consts::EXE_SUFFIX,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

use anyhow::{bail, Context};
use tokio::process::Command;

use super::testcase::TestCase;

/// Source of the numeric ids that make artifact file names unique within a run.
#[derive(Debug)]
pub struct ArtifactIdGen {
    next: AtomicU64,
}

impl Default for ArtifactIdGen {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl ArtifactIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
    pub id: u64,
    pub case: TestCase,
    pub exe_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    Compiled(CompiledArtifact),
    Failed { diagnostic: String },
}

/// Invokes the external compiler as
/// `<command...> <output_flag> <exe> <support_sources...> <fixture>` inside `work_dir`.
#[derive(Debug, Clone)]
pub struct Compiler {
    command: Vec<String>,
    output_flag: String,
    support_sources: Vec<PathBuf>,
    scratch_dir: PathBuf,
    work_dir: PathBuf,
}

impl Compiler {
    const DEFAULT_OUTPUT_FLAG: &str = "-o";
    const DEFAULT_SCRATCH_DIR: &str = "build/testrun";

    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            output_flag: Self::DEFAULT_OUTPUT_FLAG.to_owned(),
            support_sources: Vec::new(),
            scratch_dir: Self::DEFAULT_SCRATCH_DIR.into(),
            work_dir: ".".into(),
        }
    }

    pub fn output_flag(mut self, flag: impl Into<String>) -> Self {
        self.output_flag = flag.into();
        self
    }

    pub fn support_sources(mut self, sources: Vec<PathBuf>) -> Self {
        self.support_sources = sources;
        self
    }

    /// Relative paths are resolved against the work dir.
    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn get_scratch_dir(&self) -> PathBuf {
        self.work_dir.join(&self.scratch_dir)
    }

    pub fn exe_path_for(&self, case: &TestCase, id: u64) -> PathBuf {
        self.get_scratch_dir()
            .join(format!("{}_{}{}", case.file_stem(), id, EXE_SUFFIX))
    }

    fn command_line(&self, exe_path: &Path, fixture: &Path) -> Vec<String> {
        let mut args = self.command.clone();
        args.push(self.output_flag.clone());
        args.push(exe_path.to_string_lossy().into_owned());
        args.extend(
            self.support_sources
                .iter()
                .map(|p| p.to_string_lossy().into_owned()),
        );
        args.push(fixture.to_string_lossy().into_owned());
        args
    }

    /// Compiles the fixture of `case` into a fresh executable.
    ///
    /// A non-zero exit of the compiler is a [`CompileOutcome::Failed`]; `Err` is reserved for
    /// failures of the harness itself (scratch dir, spawning the compiler).
    pub async fn compile(
        &self,
        case: &TestCase,
        ids: &ArtifactIdGen,
    ) -> anyhow::Result<CompileOutcome> {
        if self.command.is_empty() {
            bail!("Undefined compile command");
        }

        let scratch_dir = self.get_scratch_dir();
        fsutil::mkdir_all(&scratch_dir).context("Failed to prepare scratch dir")?;

        let id = ids.next_id();
        let exe_path = self.exe_path_for(case, id);
        let cmd = self.command_line(&exe_path, &case.path);
        let cmdline = cmd.join(" ");
        log::debug!("Compiling {}: {}", case.path.to_string_lossy(), cmdline);

        let output = Command::new(&cmd[0])
            .args(&cmd[1..])
            .current_dir(&self.work_dir)
            .output()
            .await
            .with_context(|| format!("Failed to spawn '{}'", cmdline))?;

        if !output.status.success() {
            let diagnostic = format!(
                "Compilation failed for {}\nCommand: {}\nstdout:\n{}\nstderr:\n{}\n",
                case.path.to_string_lossy(),
                cmdline,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr),
            );
            return Ok(CompileOutcome::Failed { diagnostic });
        }

        Ok(CompileOutcome::Compiled(CompiledArtifact {
            id,
            case: case.clone(),
            exe_path,
        }))
    }
}
