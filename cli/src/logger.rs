use std::io::Write as _;

use colored::Colorize as _;
use testrun_core::style::ColorTheme as _;

/// `verbosity` 0 keeps `RUST_LOG` (default "warn"); 1 forces info, 2 or more forces debug.
pub fn init(verbosity: u8) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    match verbosity {
        0 => (),
        1 => {
            builder.parse_filters("info");
        }
        _ => {
            builder.parse_filters("debug");
        }
    }
    builder
        .format(|buf, record| {
            let level = record.level();
            writeln!(
                buf,
                "{}: {}",
                level.to_string().to_lowercase().color(level.color()).bold(),
                record.args()
            )
        })
        .init();
}
