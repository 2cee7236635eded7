use std::path::Path;

use colored::{Color, ColoredString, Colorize};
use crossterm::terminal;

use crate::action::{error::Error, Reporter, Summary};
use crate::testing::{ExecutionResult, JudgeCode, TestCase};

#[macro_export]
macro_rules! print_success {
    ($fmt:literal, $($e:tt)*) => {{
        use ::colored::Colorize as _;
        println!("{}", format!($fmt, $($e)*).green())
    }};
}

pub fn is_truecolor_supported() -> bool {
    let Ok(v) = std::env::var("COLORTERM") else {
        return false
    };
    matches!(v.as_str(), "truecolor" | "24bit")
}

pub trait ColorTheme {
    fn color(&self) -> Color;
}

impl ColorTheme for log::Level {
    fn color(&self) -> Color {
        use log::Level::*;
        match self {
            Error => Color::BrightRed,
            Warn => Color::BrightYellow,
            Info => Color::Cyan,
            Debug => Color::Magenta,
            Trace => Color::Blue,
        }
    }
}

impl ColorTheme for JudgeCode {
    fn color(&self) -> Color {
        use JudgeCode::*;
        if !self::is_truecolor_supported() {
            return match self {
                AC => Color::Green,
                WA => Color::Yellow,
                RE => Color::Magenta,
                TLE | CE | IE => Color::Red,
            };
        }

        match self {
            AC => Color::TrueColor {
                r: 30,
                g: 180,
                b: 40,
            },
            WA => Color::TrueColor {
                r: 210,
                g: 138,
                b: 4,
            },
            RE => Color::TrueColor {
                r: 171,
                g: 40,
                b: 200,
            },
            TLE | CE | IE => Color::TrueColor {
                r: 220,
                g: 42,
                b: 42,
            },
        }
    }
}

pub fn judge_icon(judge: JudgeCode) -> ColoredString {
    let fg = if is_truecolor_supported() {
        Color::TrueColor {
            r: 255,
            g: 255,
            b: 255,
        }
    } else {
        Color::BrightBlack
    };
    format!(" {} ", judge)
        .on_color(judge.color())
        .bold()
        .color(fg)
}

fn ok_mark() -> ColoredString {
    "OK".green()
}

fn err_mark() -> ColoredString {
    "ERROR".red()
}

fn case_title(case: &TestCase) -> String {
    format!("{} ({})", case.name, case.path.to_string_lossy())
}

/// Prints one line per testcase to stdout, with details for failures.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn fixture_error(&mut self, path: &Path, error: &Error) {
        println!("{} {}: {:#}", err_mark(), path.to_string_lossy(), error);
    }

    fn compile_error(&mut self, case: &TestCase, diagnostic: &str) {
        println!(
            "{} {} {}",
            err_mark(),
            case_title(case),
            judge_icon(JudgeCode::CE)
        );
        eprintln!("{}", diagnostic);
    }

    fn compile_fail_checked(&mut self, case: &TestCase, passed: bool) {
        if passed {
            println!("{} {}", ok_mark(), case_title(case));
        } else {
            println!(
                "{} {} {}\n  Expected to fail compilation.",
                err_mark(),
                case_title(case),
                judge_icon(JudgeCode::CE)
            );
        }
    }

    fn execution_finished(&mut self, res: &ExecutionResult) {
        if res.ok() {
            println!("{} {}", ok_mark(), case_title(&res.case));
        } else {
            print_test_result_detail(res);
        }
    }

    fn finished(&mut self, summary: &Summary) {
        print_test_result_summary(summary);
    }
}

fn format_exit_code(code: Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "<none>".to_owned(),
    }
}

pub fn print_test_result_detail(res: &ExecutionResult) {
    const THIN_LINE: &str = "─";
    let (cols, _) = terminal::size().unwrap_or((40, 40));

    println!(
        "{} {} {} [{}ms]",
        err_mark(),
        case_title(&res.case),
        judge_icon(res.judge),
        res.execution_time.as_millis(),
    );

    let label = |s: &str| format!("  {:<18}", s).cyan();
    println!("{}{:?}", label("input:"), res.case.stdin);
    println!("{}{:?}", label("expected output:"), res.case.expected_stdout);
    println!("{}{:?}", label("real output:"), res.stdout);
    println!("{}{}", label("expected exit:"), res.case.expected_exit_code);
    println!("{}{}", label("real exit:"), format_exit_code(res.exit_code));
    if !res.stderr.is_empty() {
        println!("{}{:?}", label("stderr:"), res.stderr);
    }
    println!("{}", THIN_LINE.repeat(cols as usize).bright_black());
}

pub fn print_test_result_summary(summary: &Summary) {
    let bar = "-".repeat(5);
    print!("{} ", bar);

    let num_total_test = summary.num_cases();
    let num_failed = summary.num_failed();

    if !summary.any_failed() {
        let msg = format!("All {} tests passed ✨", num_total_test);
        print!("{}", msg.green());
    } else {
        let summary_msg = if summary.passed > 0 {
            format!("{}/{} tests failed 💣", num_failed, num_total_test)
        } else {
            format!("All {} tests failed 💀", num_total_test)
        };

        let mut counts: Vec<_> = summary.failures.iter().collect();
        counts.sort_by_key(|(judge, _)| judge.to_string());
        let mut details: Vec<String> = counts
            .into_iter()
            .map(|(&judge, &cnt)| {
                format!(
                    "{}{}{}",
                    self::judge_icon(judge),
                    "x".dimmed(),
                    cnt.to_string().bold().bright_white(),
                )
            })
            .collect();
        if summary.fixture_errors > 0 {
            details.push(format!("{} broken fixtures", summary.fixture_errors));
        }

        print!("{} ({})", summary_msg.bright_red(), details.join(", "));
    }

    println!(" {}", bar);
}
