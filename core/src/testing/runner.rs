use std::{
    io,
    path::PathBuf,
    process::{ExitStatus, Stdio},
    time::Duration,
};

use anyhow::Context;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    process::Command,
};

use super::{compiler::CompiledArtifact, result::*};

#[derive(Debug, Clone)]
pub struct Executor {
    work_dir: PathBuf,
    execution_time_limit: Option<Duration>,
}

impl Executor {
    pub const DEFAULT_EXEC_TIME_LIMIT: Duration = Duration::from_secs(10);

    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            execution_time_limit: Some(Self::DEFAULT_EXEC_TIME_LIMIT),
        }
    }

    /// `None` lets an execution run forever.
    pub fn execution_time_limit(mut self, limit: Option<Duration>) -> Self {
        self.execution_time_limit = limit;
        self
    }

    pub fn get_exec_time_limit(&self) -> Option<Duration> {
        self.execution_time_limit
    }

    /// Runs the artifact once, feeding the case's stdin.
    /// Failures of the harness are reported as [`JudgeCode::IE`] rather than returned.
    pub async fn execute(&self, artifact: &CompiledArtifact) -> ExecutionResult {
        self.try_execute(artifact).await.unwrap_or_else(|e| {
            log::error!(
                "Failed to execute {}: {:#}",
                artifact.exe_path.to_string_lossy(),
                e
            );
            ExecutionResult::internal_error(artifact.case.clone(), format!("{:#}", e))
        })
    }

    async fn try_execute(&self, artifact: &CompiledArtifact) -> anyhow::Result<ExecutionResult> {
        let case = &artifact.case;
        log::debug!("Running {}", artifact.exe_path.to_string_lossy());

        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();

        let mut proc = Command::new(&artifact.exe_path)
            .current_dir(&self.work_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| {
                format!("Failed to spawn '{}'", artifact.exe_path.to_string_lossy())
            })?;
        let mut stdin = proc.stdin.take().context("Failed to open stdin")?;
        let mut stdout = proc.stdout.take().context("Failed to open stdout")?;
        let mut stderr = proc.stderr.take().context("Failed to open stderr")?;

        let start_at = tokio::time::Instant::now();
        let res = {
            let input = case.stdin.as_bytes();
            let fut_stdin = async move {
                match stdin.write_all(input).await {
                    // the program exited without reading all of its input
                    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                    res => res,
                }
                // `stdin` is dropped here, which closes the pipe
            };
            let fut_stdout = stdout.read_to_end(&mut stdout_buf);
            let fut_stderr = stderr.read_to_end(&mut stderr_buf);
            let fut_exit_status = proc.wait();

            let fut = async {
                tokio::try_join!(fut_stdin, fut_stdout, fut_stderr, fut_exit_status)
                    .context("Failed to communicate with subprocess")
            };
            match self.execution_time_limit {
                Some(limit) => tokio::time::timeout(limit, fut).await.ok(),
                None => Some(fut.await),
            }
        };
        let execution_time = tokio::time::Instant::now().duration_since(start_at);

        let (judge, exit_code) = match res {
            None => {
                proc.kill()
                    .await
                    .unwrap_or_else(|e| log::warn!("Failed to kill TLE process: {:#}", e));
                (JudgeCode::TLE, None)
            }
            Some(res) => {
                let (_, _, _, exit_status) = res?;
                let exit_code = exit_code_of(exit_status);
                let stdout = String::from_utf8_lossy(&stdout_buf);
                (JudgeCode::judge(case, &stdout, exit_code), exit_code)
            }
        };

        Ok(ExecutionResult {
            case: case.clone(),
            judge,
            stdout: String::from_utf8_lossy(&stdout_buf).into_owned(),
            stderr: String::from_utf8_lossy(&stderr_buf).into_owned(),
            exit_code,
            execution_time,
        })
    }
}

fn exit_code_of(status: ExitStatus) -> Option<i32> {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt as _;
        if let Some(signal) = status.signal() {
            return Some(-signal);
        }
    }
    status.code()
}

#[cfg(all(test, unix))]
mod test {
    use std::path::Path;

    use super::*;
    use crate::testing::{sandbox::Sandbox, TestCase};

    struct X {
        input: &'static str,
        expected_stdout: &'static str,
        expected_exit_code: i32,
        script: &'static str,
        want_judge: JudgeCode,
        want_stdout: &'static str,
        want_stderr: &'static str,
        want_exit_code: Option<i32>,
    }

    fn artifact(exe_path: &Path, x: &X) -> CompiledArtifact {
        CompiledArtifact {
            id: 1,
            case: TestCase {
                path: PathBuf::from("sample.fc"),
                name: "sample testcase".to_owned(),
                stdin: x.input.to_owned(),
                expected_stdout: x.expected_stdout.to_owned(),
                expected_exit_code: x.expected_exit_code,
                compilation_should_fail: false,
            },
            exe_path: exe_path.to_owned(),
        }
    }

    async fn run_test(x: X) {
        let sb = Sandbox::new();
        let exe = sb.executable("sample", x.script);
        let r = Executor::new(sb.path()).execution_time_limit(Some(Duration::from_millis(500)));

        let res = dbg!(r.execute(&artifact(&exe, &x)).await);
        assert_eq!(res.judge, x.want_judge);
        assert_eq!(res.stdout, x.want_stdout);
        assert_eq!(res.stderr, x.want_stderr);
        assert_eq!(res.exit_code, x.want_exit_code);
    }

    #[tokio::test]
    async fn should_be_ac() {
        run_test(X {
            input: "123\n",
            expected_stdout: "hello_123\n",
            expected_exit_code: 0,
            script: r#"read x; echo "hello_$x""#,
            want_judge: JudgeCode::AC,
            want_stdout: "hello_123\n",
            want_stderr: "",
            want_exit_code: Some(0),
        })
        .await;
    }

    #[tokio::test]
    async fn should_be_ac_even_if_stdin_is_not_read() {
        run_test(X {
            input: "123\n",
            expected_stdout: "hello_123\n",
            expected_exit_code: 0,
            script: "echo hello_123",
            want_judge: JudgeCode::AC,
            want_stdout: "hello_123\n",
            want_stderr: "",
            want_exit_code: Some(0),
        })
        .await;
    }

    #[tokio::test]
    async fn stderr_does_not_affect_judge() {
        run_test(X {
            input: "",
            expected_stdout: "ok",
            expected_exit_code: 0,
            script: "printf ok; echo noise >&2",
            want_judge: JudgeCode::AC,
            want_stdout: "ok",
            want_stderr: "noise\n",
            want_exit_code: Some(0),
        })
        .await;
    }

    #[tokio::test]
    async fn should_be_wa_if_just_missing_newline() {
        run_test(X {
            input: "123\n",
            expected_stdout: "hello_123\n",
            expected_exit_code: 0,
            script: "printf hello_123",
            want_judge: JudgeCode::WA,
            want_stdout: "hello_123",
            want_stderr: "",
            want_exit_code: Some(0),
        })
        .await;
    }

    #[tokio::test]
    async fn should_be_ac_with_expected_nonzero_exit() {
        run_test(X {
            input: "",
            expected_stdout: "",
            expected_exit_code: 42,
            script: "exit 42",
            want_judge: JudgeCode::AC,
            want_stdout: "",
            want_stderr: "",
            want_exit_code: Some(42),
        })
        .await;
    }

    #[tokio::test]
    async fn should_be_re_even_if_stdout_is_correct() {
        run_test(X {
            input: "",
            expected_stdout: "hello_123\n",
            expected_exit_code: 0,
            script: "echo hello_123; exit 42",
            want_judge: JudgeCode::RE,
            want_stdout: "hello_123\n",
            want_stderr: "",
            want_exit_code: Some(42),
        })
        .await;
    }

    #[tokio::test]
    async fn signal_is_reported_as_negative_exit_code() {
        run_test(X {
            input: "",
            expected_stdout: "",
            expected_exit_code: 0,
            script: "kill -9 $$",
            want_judge: JudgeCode::RE,
            want_stdout: "",
            want_stderr: "",
            want_exit_code: Some(-9),
        })
        .await;
    }

    #[tokio::test]
    async fn should_be_tle() {
        run_test(X {
            input: "",
            expected_stdout: "",
            expected_exit_code: 0,
            script: "exec sleep 5",
            want_judge: JudgeCode::TLE,
            want_stdout: "",
            want_stderr: "",
            want_exit_code: None,
        })
        .await;
    }

    #[tokio::test]
    async fn large_input_and_output_do_not_deadlock() {
        let sb = Sandbox::new();
        let exe = sb.executable("cat", "exec cat");
        let input = "0123456789abcdef".repeat(64 * 1024);
        let x = X {
            input: "",
            expected_stdout: "",
            expected_exit_code: 0,
            script: "",
            want_judge: JudgeCode::AC,
            want_stdout: "",
            want_stderr: "",
            want_exit_code: Some(0),
        };
        let mut a = artifact(&exe, &x);
        a.case.stdin = input.clone();
        a.case.expected_stdout = input;

        let res = Executor::new(sb.path()).execute(&a).await;
        assert_eq!(res.judge, JudgeCode::AC);
    }

    #[tokio::test]
    async fn missing_executable_is_internal_error() {
        let sb = Sandbox::new();
        let x = X {
            input: "",
            expected_stdout: "",
            expected_exit_code: 0,
            script: "",
            want_judge: JudgeCode::IE,
            want_stdout: "",
            want_stderr: "",
            want_exit_code: None,
        };
        let res = Executor::new(sb.path())
            .execute(&artifact(&sb.path().join("missing"), &x))
            .await;
        assert_eq!(res.judge, JudgeCode::IE);
        assert!(res.stderr.contains("Failed to spawn"));
        assert!(!res.ok());
    }
}
