use std::time::Duration;

use super::testcase::TestCase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum JudgeCode {
    /// Accepted: stdout and exit code both match.
    AC,
    /// Wrong answer: exit code matches, stdout does not.
    WA,
    /// Exit code differs from the expected one.
    RE,
    /// Killed by the execution time limit.
    TLE,
    /// Unexpected compilation outcome.
    CE,
    /// The harness itself failed to run the case.
    IE,
}

impl JudgeCode {
    /// Stderr never affects the judgement.
    pub fn judge(case: &TestCase, stdout: &str, exit_code: Option<i32>) -> Self {
        if exit_code != Some(case.expected_exit_code) {
            JudgeCode::RE
        } else if stdout != case.expected_stdout {
            JudgeCode::WA
        } else {
            JudgeCode::AC
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub case: TestCase,
    pub judge: JudgeCode,
    pub stdout: String,
    pub stderr: String,

    /// `None` when the process was killed by the harness or never started.
    /// A process terminated by signal N reports `-N` on unix.
    pub exit_code: Option<i32>,
    pub execution_time: Duration,
}

impl ExecutionResult {
    pub fn ok(&self) -> bool {
        self.judge == JudgeCode::AC
    }

    pub fn internal_error(case: TestCase, message: impl Into<String>) -> Self {
        Self {
            case,
            judge: JudgeCode::IE,
            stdout: String::new(),
            stderr: message.into(),
            exit_code: None,
            execution_time: Duration::ZERO,
        }
    }
}
