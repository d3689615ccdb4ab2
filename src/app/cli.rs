use std::{fmt::Display, str::FromStr};

use clap::Parser;
use tracing_subscriber::filter::{self, Directive};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(flatten)]
    pub args: Args,
}

#[derive(clap::Args, Clone)]
pub struct Args {
    /// Repository owner
    #[clap(required_unless_present_any = ["print_log_dir", "set_token"])]
    pub owner: Option<String>,
    /// Repository name
    #[clap(required_unless_present_any = ["print_log_dir", "set_token"])]
    pub repo: Option<String>,
    /// Issue number whose comments are opened
    #[clap(required_unless_present_any = ["print_log_dir", "set_token"])]
    pub issue: Option<String>,
    #[clap(long, short, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
    #[clap(long, short)]
    pub print_log_dir: bool,
    /// Store a GitHub token in the OS keyring and exit
    #[clap(long)]
    pub set_token: Option<String>,
    /// Pause before a mention lookup is issued
    #[clap(long, default_value_t = 500)]
    pub debounce_ms: u64,
    #[clap(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    None,
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::None => "none",
        };
        write!(f, "{s}")
    }
}

impl TryFrom<LogLevel> for Directive {
    type Error = filter::ParseError;
    fn try_from(value: LogLevel) -> Result<Self, Self::Error> {
        match value {
            LogLevel::None => Directive::from_str("off"),
            level => Directive::from_str(&level.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_level_turns_logging_off() {
        let directive = Directive::try_from(LogLevel::None).expect("valid directive");
        assert_eq!(directive.to_string(), "off");
    }

    #[test]
    fn parses_positional_target() {
        let cli = Cli::try_parse_from(["chorus", "rust-lang", "rust", "42", "--debounce-ms", "250"])
            .expect("parse");
        assert_eq!(cli.args.owner.as_deref(), Some("rust-lang"));
        assert_eq!(cli.args.issue.as_deref(), Some("42"));
        assert_eq!(cli.args.debounce_ms, 250);
    }

    #[test]
    fn print_log_dir_needs_no_target() {
        let cli = Cli::try_parse_from(["chorus", "--print-log-dir"]).expect("parse");
        assert!(cli.args.print_log_dir);
        assert!(cli.args.owner.is_none());
    }
}
