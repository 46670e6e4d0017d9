use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

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
    name = "timeline",
    version,
    about = "Timeline: Gantt-style chart of dated items, grouped and scrolled to today",
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

    #[arg(long = "timelinerc")]
    pub timelinerc: Option<PathBuf>,

    /// Directory holding the offline snapshot.
    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    /// Read items from a JSON array file instead of the API.
    #[arg(long = "input", conflicts_with = "offline")]
    pub input: Option<PathBuf>,

    /// Use the last saved snapshot without contacting the API.
    #[arg(long = "offline")]
    pub offline: bool,

    /// Pretend today is this date (YYYY-MM-DD, today, yesterday, +3d, -2w, ...).
    #[arg(long = "today")]
    pub today: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Draw the chart.
    Show(ShowArgs),
    /// Print items as a table with period and duration.
    List(ListArgs),
    /// Print the computed layout as JSON.
    Layout(LayoutArgs),
    /// Create an item through the API.
    Add(AddArgs),
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct ShowArgs {
    /// Collapse this group (repeatable).
    #[arg(long = "collapse", action = ArgAction::Append)]
    pub collapse: Vec<String>,

    /// Flip this group's collapsed state (repeatable).
    #[arg(long = "toggle", action = ArgAction::Append)]
    pub toggle: Vec<String>,

    /// Chart columns to show; the view is scrolled so today is centered.
    #[arg(long = "width")]
    pub width: Option<usize>,
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct ListArgs {
    #[arg(long = "collapse", action = ArgAction::Append)]
    pub collapse: Vec<String>,
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct LayoutArgs {
    #[arg(long = "collapse", action = ArgAction::Append)]
    pub collapse: Vec<String>,

    #[arg(long = "pretty")]
    pub pretty: bool,

    /// Viewport width in pixels, used to report the initial scroll offset.
    #[arg(long = "viewport")]
    pub viewport: Option<f64>,
}

#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct AddArgs {
    #[arg(long = "name")]
    pub name: String,

    /// Defaults to the `add.group` setting.
    #[arg(long = "group")]
    pub group: Option<String>,

    #[arg(long = "start")]
    pub start: String,

    /// Omit for an ongoing item.
    #[arg(long = "end")]
    pub end: Option<String>,
}

impl Command {
    /// Command used when none is given on the command line.
    pub fn from_default_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "show" => Some(Self::Show(ShowArgs::default())),
            "list" => Some(Self::List(ListArgs::default())),
            "layout" => Some(Self::Layout(LayoutArgs::default())),
            other => {
                warn!(command = other, "default.command is not a view command");
                None
            }
        }
    }
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
        .with_thread_ids(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls `rc.key=value` and `rc.key:value` words out of the argument list so
/// they can be given anywhere on the command line.
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
