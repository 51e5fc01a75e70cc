use std::path::PathBuf;

use clap::{ArgAction, Parser};

#[derive(Parser, Debug)]
#[command(name = "pffocus")]
#[command(about = "Parse pfSense configuration backups into a typed document")]
pub struct Cli {
    /// Optional settings TOML file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Print the parsed document as JSON.
    Parse(ParseArgs),
    /// Show the typed tree of a backup.
    Inspect(InspectArgs),
    /// Check whether dotted paths below <pfsense> exist.
    Has(HasArgs),
}

#[derive(Parser, Debug)]
pub struct ParseArgs {
    pub file: PathBuf,
    /// Dotted path below <pfsense> to print instead of the whole document;
    /// a path ending at a repeated element prints every item.
    #[arg(long)]
    pub section: Option<String>,
    /// Leave interface and alias references as literal text.
    #[arg(long)]
    pub raw: bool,
    /// Emit compact JSON.
    #[arg(long)]
    pub compact: bool,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    pub file: PathBuf,
    /// Dotted path below <pfsense>; a repeated element shows every item.
    #[arg(long)]
    pub section: Option<String>,
    /// Maximum depth; defaults to the settings value.
    #[arg(long)]
    pub depth: Option<usize>,
    /// Do not resolve reference fields.
    #[arg(long)]
    pub raw: bool,
}

#[derive(Parser, Debug)]
pub struct HasArgs {
    pub file: PathBuf,
    #[arg(required = true)]
    pub paths: Vec<String>,
}
