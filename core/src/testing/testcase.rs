use std::path::{Path, PathBuf};

/// One (stdin, expected stdout, expected exit code) triple extracted from a fixture file.
///
/// Every testcase of the same fixture shares `name`, `expected_exit_code` and
/// `compilation_should_fail`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub path: PathBuf,
    pub name: String,
    pub stdin: String,
    pub expected_stdout: String,
    pub expected_exit_code: i32,

    /// Whether compiling the fixture file (not this particular case) is expected to fail.
    pub compilation_should_fail: bool,
}

impl TestCase {
    pub const DEFAULT_NAME: &str = "test";

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "fixture".to_owned())
    }
}
