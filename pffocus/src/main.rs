use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use pffocus::document::PfSenseDocument;
use pffocus::inspect::render_tree;
use pffocus::settings::{load_settings, Settings};
use schema_tree_core::{Child, Value};
use tracing::info;
use tracing::level_filters::LevelFilter;

mod cli;

use cli::{Cli, Command, HasArgs, InspectArgs, ParseArgs};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let settings = match &cli.config {
        Some(path) => load_settings(path)?,
        None => Settings::default(),
    };

    match cli.command {
        Command::Parse(args) => run_parse(args, &settings),
        Command::Inspect(args) => run_inspect(args, &settings),
        Command::Has(args) => run_has(args),
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        LevelFilter::ERROR
    } else {
        match verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_document(path: &Path) -> Result<PfSenseDocument> {
    info!(path = %path.display(), "parsing");
    let doc = PfSenseDocument::parse_file(path)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    info!(
        version = doc.version().unwrap_or("unknown"),
        "parsed pfSense config"
    );
    Ok(doc)
}

fn target<'a>(doc: &'a PfSenseDocument, section: Option<&str>) -> Result<Child<'a>> {
    match section {
        Some(path) => doc
            .section_child(path)
            .with_context(|| format!("section '{}' not found", path)),
        None => Ok(Child::Node(doc.tree().root())),
    }
}

fn run_parse(args: ParseArgs, settings: &Settings) -> Result<()> {
    let doc = load_document(&args.file)?;
    let selected = target(&doc, args.section.as_deref())?;
    let tree = doc.tree();

    let value = if args.raw || !settings.resolve.enabled {
        match selected {
            Child::Node(node) => tree.to_value(node),
            Child::List(items) => {
                Value::List(items.iter().map(|item| tree.to_value(*item)).collect())
            }
        }
    } else {
        let resolver = settings.resolver();
        let projected = match selected {
            Child::Node(node) => tree.project(node, &resolver),
            Child::List(items) => items
                .iter()
                .map(|item| tree.project(*item, &resolver))
                .collect::<Result<_, _>>()
                .map(Value::List),
        };
        projected
            .with_context(|| format!("failed to resolve references in {}", args.file.display()))?
    };

    let json = if args.compact {
        serde_json::to_string(&value)?
    } else {
        serde_json::to_string_pretty(&value)?
    };
    println!("{json}");
    Ok(())
}

fn run_inspect(args: InspectArgs, settings: &Settings) -> Result<()> {
    let doc = load_document(&args.file)?;
    let selected = target(&doc, args.section.as_deref())?;
    let depth = args.depth.unwrap_or(settings.inspect.depth);

    let resolver = settings.resolver();
    let resolver = (!args.raw && settings.resolve.enabled).then_some(&resolver);
    let nodes = match selected {
        Child::Node(node) => vec![node],
        Child::List(items) => items.to_vec(),
    };
    for node in nodes {
        print!("{}", render_tree(doc.tree(), node, depth, resolver)?);
    }
    Ok(())
}

fn run_has(args: HasArgs) -> Result<()> {
    let doc = load_document(&args.file)?;
    for path in &args.paths {
        println!("{path}={}", doc.has_path(path));
    }
    Ok(())
}
