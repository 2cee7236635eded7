//! Extraction of testcases from the leading comment block of a fixture file.
//!
//! ```text
//! // test: addition
//! // input: "5" "3"
//! // output: "8" "2"
//! // exit-code: 0
//! // compile_fail:
//! <code...>
//! ```
//!
//! Scanning stops at the first non-empty line that is not a comment. `input` and `output` hold
//! parallel lists; one [`TestCase`] is produced per pair.

use std::{
    num::ParseIntError,
    path::{Path, PathBuf},
};

use crate::annotation::{decode_quoted_literal, split_respecting_quotes};
use crate::testing::TestCase;

pub type Result<T> = std::result::Result<T, MetadataError>;

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("Amount of input({inputs}) and output({outputs}) args must be the same in '{}'", .path.to_string_lossy())]
    MismatchedCount {
        path: PathBuf,
        inputs: usize,
        outputs: usize,
    },

    #[error("Invalid exit-code '{value}' at {}:{line}: {source}", .path.to_string_lossy())]
    InvalidExitCode {
        path: PathBuf,
        line: usize,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error(transparent)]
    Io(#[from] fsutil::Error),
}

/// The directives of one fixture file, before expansion into testcases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveSet {
    pub name: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub exit_code: i32,
    pub compile_fail: bool,
}

impl Default for DirectiveSet {
    fn default() -> Self {
        Self {
            name: TestCase::DEFAULT_NAME.to_owned(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            exit_code: 0,
            compile_fail: false,
        }
    }
}

const VALUE_DELIMITER: &str = " ";

fn parse_value_list(value: &str) -> Vec<String> {
    split_respecting_quotes(value, VALUE_DELIMITER)
        .into_iter()
        .map(|field| decode_quoted_literal(field).into_string())
        .collect()
}

impl DirectiveSet {
    /// Collects directives from the leading comment block of `source`.
    /// `path` is only used for error messages.
    pub fn scan(path: &Path, source: &str, comment_marker: &str) -> Result<Self> {
        let mut set = Self::default();

        for (i, line) in source.lines().enumerate() {
            let stripped = line.trim();
            if stripped.is_empty() {
                continue;
            }
            let Some(content) = stripped.strip_prefix(comment_marker) else {
                break
            };
            let Some((key, value)) = content.split_once(':') else {
                continue
            };
            let (key, value) = (key.trim(), value.trim());

            match key {
                "test" => {
                    if !value.is_empty() {
                        set.name = value.to_owned();
                    }
                }
                "input" => set.inputs = parse_value_list(value),
                "output" => set.outputs = parse_value_list(value),
                "exit-code" => {
                    set.exit_code =
                        value
                            .parse()
                            .map_err(|source| MetadataError::InvalidExitCode {
                                path: path.to_owned(),
                                line: i + 1,
                                value: value.to_owned(),
                                source,
                            })?;
                }
                // any non-empty value counts as true, even "false"
                "compile_fail" => set.compile_fail = !value.is_empty(),
                _ => log::trace!("Ignoring unknown directive '{}' in {:?}", key, path),
            }
        }
        Ok(set)
    }

    pub fn into_testcases(self, path: &Path) -> Result<Vec<TestCase>> {
        if self.inputs.len() != self.outputs.len() {
            return Err(MetadataError::MismatchedCount {
                path: path.to_owned(),
                inputs: self.inputs.len(),
                outputs: self.outputs.len(),
            });
        }

        let Self {
            name,
            inputs,
            outputs,
            exit_code,
            compile_fail,
        } = self;

        Ok(inputs
            .into_iter()
            .zip(outputs)
            .map(|(stdin, expected_stdout)| TestCase {
                path: path.to_owned(),
                name: name.clone(),
                stdin,
                expected_stdout,
                expected_exit_code: exit_code,
                compilation_should_fail: compile_fail,
            })
            .collect())
    }
}

pub fn parse_str(path: &Path, source: &str, comment_marker: &str) -> Result<Vec<TestCase>> {
    DirectiveSet::scan(path, source, comment_marker)?.into_testcases(path)
}

/// Reads a fixture file and expands its directives into testcases.
/// A file without `input`/`output` directives yields no testcase.
pub fn parse(path: impl AsRef<Path>, comment_marker: &str) -> Result<Vec<TestCase>> {
    let path = path.as_ref();
    let source = fsutil::read_to_string_lossy(path)?;
    self::parse_str(path, &source, comment_marker)
}
