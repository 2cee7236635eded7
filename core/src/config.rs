use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::result::Result as StdResult;
use std::time::Duration;

use anyhow::Context as _;
use rust_embed::RustEmbed;
use serde::Deserialize;

use crate::testing::{Compiler, Executor};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Working directory of the compiler and of every execution.
    #[serde(skip)]
    pub root: PathBuf,
    #[serde(skip)]
    pub source_config_file: Option<PathBuf>,
    pub compiler: CompilerConfig,
    pub test: TestConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub command: Vec<String>,
    pub output_flag: String,
    pub support_sources: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    pub scratch_dir: PathBuf,
    pub comment_marker: String,
    pub fixture_pattern: FixturePattern,
    pub time_limit_ms: u64,
    pub jobs: Option<usize>,
    pub keep_artifacts: bool,
}

/// Glob matched against file names when a directory of fixtures is given.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct FixturePattern(glob::Pattern);

impl FixturePattern {
    const DEFAULT: &str = "*.fc";

    pub fn parse(pattern: &str) -> StdResult<Self, glob::PatternError> {
        glob::Pattern::new(pattern).map(Self)
    }
}

impl Default for FixturePattern {
    fn default() -> Self {
        Self::parse(Self::DEFAULT).expect("default fixture pattern is a valid glob")
    }
}

impl TryFrom<String> for FixturePattern {
    type Error = glob::PatternError;

    fn try_from(value: String) -> StdResult<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl Deref for FixturePattern {
    type Target = glob::Pattern;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::with_root(".")
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            command: vec!["bash".to_owned(), "./compile.sh".to_owned()],
            output_flag: "-o".to_owned(),
            support_sources: vec!["stdlib/utils.fc".into()],
        }
    }
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            scratch_dir: "build/testrun".into(),
            comment_marker: "//".to_owned(),
            fixture_pattern: FixturePattern::default(),
            time_limit_ms: Executor::DEFAULT_EXEC_TIME_LIMIT.as_millis() as u64,
            jobs: None,
            keep_artifacts: false,
        }
    }
}

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Asset;

impl Config {
    pub const FILENAME: &str = "testrun.toml";

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            source_config_file: None,
            compiler: CompilerConfig::default(),
            test: TestConfig::default(),
        }
    }

    pub fn example_toml() -> anyhow::Result<String> {
        let file = Asset::get(Self::FILENAME)
            .with_context(|| format!("'{}' is not embedded", Self::FILENAME))?;
        Ok(String::from_utf8_lossy(file.data.as_ref()).into_owned())
    }

    pub fn from_toml(s: &str) -> StdResult<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// The directory containing `filepath` becomes the root, as an absolute path.
    pub fn from_toml_file(filepath: PathBuf) -> anyhow::Result<Self> {
        let toml = fsutil::read_to_string_lossy(&filepath).context("Cannot read a file")?;
        let mut cfg = Self::from_toml(&toml)
            .with_context(|| format!("Invalid config TOML: {:?}", filepath))?;
        let filepath = fsutil::canonicalize_path(&filepath)?;
        cfg.root = filepath
            .parent()
            .map(Path::to_path_buf)
            .with_context(|| format!("Config file has no parent dir: {:?}", filepath))?;
        cfg.source_config_file = Some(filepath);
        Ok(cfg)
    }

    /// Find config file ancestor dirs, including current dir.
    pub fn find_file_in_ancestors(cur_dir: impl AsRef<Path>) -> Option<PathBuf> {
        cur_dir
            .as_ref()
            .ancestors()
            .map(|dir| dir.join(Self::FILENAME))
            .find(|path| path.is_file())
    }

    /// Loads the config found in the ancestors of `cur_dir`, or the defaults rooted at
    /// `cur_dir` when there is none.
    pub fn from_file_finding_in_ancestors_or_default(
        cur_dir: impl AsRef<Path>,
    ) -> anyhow::Result<Self> {
        match Self::find_file_in_ancestors(&cur_dir) {
            Some(path) => {
                log::info!("Using config {}", path.to_string_lossy());
                Self::from_toml_file(path)
            }
            None => {
                log::debug!("No {} found, using defaults", Self::FILENAME);
                Ok(Self::with_root(cur_dir.as_ref()))
            }
        }
    }

    pub fn compiler(&self) -> Compiler {
        Compiler::new(self.compiler.command.clone())
            .output_flag(self.compiler.output_flag.clone())
            .support_sources(self.compiler.support_sources.clone())
            .scratch_dir(self.test.scratch_dir.clone())
            .work_dir(self.root.clone())
    }

    pub fn executor(&self) -> Executor {
        Executor::new(self.root.clone()).execution_time_limit(self.test.time_limit())
    }
}

impl TestConfig {
    /// `None` when `time_limit_ms` is 0.
    pub fn time_limit(&self) -> Option<Duration> {
        match self.time_limit_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}
