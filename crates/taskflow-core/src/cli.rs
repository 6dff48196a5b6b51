use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::filter::StatusFilter;
use crate::task::Priority;

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
    name = "taskflow",
    version,
    about = "Taskflow: a local task list with debounced persistence",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "taskflowrc")]
    pub taskflowrc: Option<PathBuf>,

    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Add a task at the top of the list.
    Add(TaskFields),
    /// List tasks, optionally narrowed by status and text.
    List(ListArgs),
    /// Show every field of one task.
    Show { id: String },
    /// Change fields of an existing task.
    Edit {
        id: String,
        #[command(flatten)]
        fields: EditFields,
    },
    /// Flip a task between done and not done.
    Done { id: String },
    /// Remove a task.
    Delete { id: String },
    /// Move a task directly in front of another one.
    Move {
        id: String,
        #[arg(long = "before")]
        before: String,
    },
    /// Print totals for the whole list.
    Stats,
    /// Print the rendered list as HTML.
    Html(ListArgs),
    /// Show the theme preference, or switch it with `toggle`.
    Theme { action: Option<ThemeAction> },
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeAction {
    Toggle,
}

#[derive(Args, Debug, Clone)]
pub struct TaskFields {
    pub title: String,

    #[arg(short = 'd', long = "desc", default_value = "")]
    pub description: String,

    /// Due date as YYYY-MM-DD.
    #[arg(long = "date", default_value = "")]
    pub date: String,

    #[arg(short = 'p', long = "priority", value_parser = parse_priority)]
    pub priority: Option<Priority>,

    #[arg(short = 't', long = "tag", action = ArgAction::Append)]
    pub tags: Vec<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct EditFields {
    #[arg(long = "title")]
    pub title: Option<String>,

    #[arg(short = 'd', long = "desc")]
    pub description: Option<String>,

    /// New date as YYYY-MM-DD; an empty value clears it.
    #[arg(long = "date")]
    pub date: Option<String>,

    #[arg(short = 'p', long = "priority", value_parser = parse_priority)]
    pub priority: Option<Priority>,

    /// Replaces all tags; repeat for several.
    #[arg(short = 't', long = "tag", action = ArgAction::Append)]
    pub tags: Option<Vec<String>>,

    #[arg(long = "clear-tags", conflicts_with = "tags")]
    pub clear_tags: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    #[arg(short = 'f', long = "filter", default_value = "all", value_parser = parse_status_filter)]
    pub filter: StatusFilter,

    #[arg(short = 's', long = "search", default_value = "")]
    pub search: String,
}

fn parse_priority(raw: &str) -> Result<Priority, String> {
    raw.parse::<Priority>().map_err(|err| err.to_string())
}

fn parse_status_filter(raw: &str) -> Result<StatusFilter, String> {
    raw.parse::<StatusFilter>().map_err(|err| err.to_string())
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
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls `rc.key=value` (or `rc.key:value`) words out of the argument list
/// so they can be given anywhere on the command line.
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
            } else if let Some((k, v)) = rest.split_once(':') {
                Some((format!("rc.{k}"), v.to_string()))
            } else {
                None
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
