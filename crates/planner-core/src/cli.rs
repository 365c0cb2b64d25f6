use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::commands::{expand_command_abbrev, known_command_names};

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "planner",
    version,
    about = "Calendar notes, to-dos, daily tech facts and a pomodoro timer",
    disable_help_subcommand = true,
    arg_required_else_help = false
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "plannerrc")]
    pub plannerrc: Option<PathBuf>,

    /// A single command to run instead of the interactive shell.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<OsString>,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls `rc.KEY=VALUE` and `rc.KEY:VALUE` tokens out of the argument list.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = if let Some((k, v)) = rest.split_once('=') {
                Some((format!("rc.{k}"), v.to_string()))
            } else {
                rest.split_once(':')
                    .map(|(k, v)| (format!("rc.{k}"), v.to_string()))
            };

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub command_args: Vec<String>,
    /// Everything after the command word, spacing kept as typed.
    pub raw_args: String,
}

impl Invocation {
    /// `None` when there is nothing to run, which starts the shell.
    #[tracing::instrument(skip(rest))]
    pub fn parse(rest: Vec<OsString>) -> anyhow::Result<Option<Self>> {
        let tokens: Vec<String> = rest
            .into_iter()
            .map(|arg| arg.to_string_lossy().to_string())
            .collect();
        let raw_args = tokens.get(1..).unwrap_or_default().join(" ");
        Self::from_tokens(&tokens, raw_args)
    }

    pub fn from_line(line: &str) -> anyhow::Result<Option<Self>> {
        let tokens: Vec<String> = line.split_whitespace().map(ToString::to_string).collect();
        let trimmed = line.trim_start();
        let after_command = trimmed
            .find(char::is_whitespace)
            .map_or("", |idx| trimmed[idx..].trim_start());
        Self::from_tokens(&tokens, after_command.to_string())
    }

    fn from_tokens(tokens: &[String], raw_args: String) -> anyhow::Result<Option<Self>> {
        let Some((first, args)) = tokens.split_first() else {
            return Ok(None);
        };

        let lowered = first.to_ascii_lowercase();
        let known = known_command_names();
        let command = expand_command_abbrev(&lowered, &known)
            .ok_or_else(|| anyhow!("unknown or ambiguous command: {first} (try `help`)"))?;

        debug!(token = %first, expanded = %command, "resolved command token");
        Ok(Some(Self {
            command: command.to_string(),
            command_args: args.to_vec(),
            raw_args,
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use super::{Invocation, preprocess_args};

    #[test]
    fn strips_positional_rc_overrides() {
        let raw: Vec<OsString> = ["planner", "rc.color=off", "month", "rc.calendar.weekstart:monday"]
            .into_iter()
            .map(OsString::from)
            .collect();

        let pre = preprocess_args(&raw).expect("preprocess");
        assert_eq!(pre.cleaned_args, vec![OsString::from("planner"), OsString::from("month")]);
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.color".to_string(), "off".to_string()),
                ("rc.calendar.weekstart".to_string(), "monday".to_string()),
            ]
        );
    }

    #[test]
    fn resolves_unique_prefixes() {
        let inv = Invocation::from_line("pom start")
            .expect("parse")
            .expect("has command");
        assert_eq!(inv.command, "pomodoro");
        assert_eq!(inv.command_args, vec!["start".to_string()]);

        assert!(Invocation::from_line("t 3").is_err());
        assert!(Invocation::from_line("frobnicate").is_err());
        assert_eq!(Invocation::from_line("   ").expect("blank"), None);
    }

    #[test]
    fn raw_args_keep_inner_spacing() {
        let inv = Invocation::from_line("  save   Team   sync ")
            .expect("parse")
            .expect("has command");
        assert_eq!(inv.command, "save");
        assert_eq!(inv.command_args, vec!["Team".to_string(), "sync".to_string()]);
        assert_eq!(inv.raw_args, "Team   sync ");

        let bare = Invocation::from_line("save").expect("parse").expect("has command");
        assert_eq!(bare.raw_args, "");
    }
}
