use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use contact_list::{GroupSort, ListStoreConfig, PrimarySort};
use std::path::PathBuf;

use crate::output::Output;
use crate::snapshot::Snapshot;
use crate::view;

#[derive(Debug, Clone, Parser)]
#[command(name = "styrene-contacts", about = "Styrene address book inspector", version)]
pub struct Cli {
    /// List store settings (TOML).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[arg(long, global = true)]
    pub json: bool,
    #[arg(long, global = true)]
    pub quiet: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print every contact in list order.
    List(ListArgs),
    /// Print the rows showing one contact uid.
    Show {
        uid: String,
        #[command(flatten)]
        view: ViewArgs,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub view: ViewArgs,
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Args)]
pub struct ViewArgs {
    /// Address book snapshot (TOML).
    #[arg(long)]
    pub snapshot: PathBuf,
    #[arg(long, value_enum)]
    pub sort: Option<SortArg>,
    #[arg(long, value_enum)]
    pub group: Option<GroupArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    Name,
    Presence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GroupArg {
    None,
    Pinned,
    Online,
}

impl From<SortArg> for PrimarySort {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Name => PrimarySort::Name,
            SortArg::Presence => PrimarySort::Presence,
        }
    }
}

impl From<GroupArg> for GroupSort {
    fn from(value: GroupArg) -> Self {
        match value {
            GroupArg::None => GroupSort::None,
            GroupArg::Pinned => GroupSort::Pinned,
            GroupArg::Online => GroupSort::Online,
        }
    }
}

pub fn run_cli(cli: Cli) -> Result<()> {
    let output = Output::new(cli.json, cli.quiet);
    let base = match &cli.config {
        Some(path) => ListStoreConfig::from_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ListStoreConfig::default(),
    };

    match cli.command {
        Command::List(args) => {
            let mut store = open(base, &args.view)?;
            let mut rows = view::rows(&mut store);
            if let Some(limit) = args.limit {
                rows.truncate(limit);
            }
            output.emit_rows(&rows)
        }
        Command::Show { uid, view: args } => {
            let mut store = open(base, &args)?;
            let rows = view::find(&mut store, &uid);
            if rows.is_empty() {
                bail!("no contact with uid {uid}");
            }
            output.emit_rows(&rows)
        }
    }
}

fn open(mut config: ListStoreConfig, args: &ViewArgs) -> Result<contact_list::ListStore> {
    if let Some(sort) = args.sort {
        config.primary_sort = sort.into();
    }
    if let Some(group) = args.group {
        config.group_sort = group.into();
    }
    let snapshot = Snapshot::load(&args.snapshot)?;
    let name = args.snapshot.display().to_string();
    view::build_store(config, &name, &snapshot)
}
