use chrono::{DateTime, Utc};
use clap::ArgMatches;
use colored::Colorize;
use commands::command_argument_builder;
use std::path::PathBuf;
use std::process;
use tracing::Level;
use vantage_core::DEFAULT_MAX_HOPS;
use vantage::handlers::{
    OutputFormat, RecordCommand, collect_names, handle_init, handle_record, handle_resolve,
    handle_submit, open_store, render_pairs,
};

mod commands;

fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");
    let verbose = chosen_command.get_flag("verbose");
    init_logging(verbose, quiet);

    let db_dir = chosen_command
        .get_one::<String>("db")
        .map(String::as_str)
        .unwrap_or(vantage::handlers::DEFAULT_DB_DIR);

    let code = match chosen_command.subcommand() {
        Some(("init", args)) => exit_code(handle_init(db_dir, args.get_flag("force"), quiet).map(|_| ())),
        Some(("resolve", args)) => run_resolve(db_dir, args, quiet),
        Some(("submit", args)) => exit_code(run_submit(db_dir, args, quiet)),
        Some((name, args)) => match RecordCommand::from_matches(name, args) {
            Some(record) => exit_code(
                open_store(db_dir).and_then(|store| handle_record(&store, &record, quiet).map(|_| ())),
            ),
            None => unreachable!("clap should ensure we don't get here"),
        },
        None => unreachable!("clap should ensure we don't get here"),
    };

    process::exit(code);
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        Level::DEBUG
    } else if quiet {
        Level::ERROR
    } else {
        Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn exit_code(result: anyhow::Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{} {:#}", "✗".red().bold(), e);
            1
        }
    }
}

/// Exit codes: 0 pairs printed, 2 nothing found, 1 anything else
fn run_resolve(db_dir: &str, args: &ArgMatches, quiet: bool) -> i32 {
    let names = match collect_names(
        args.get_many::<String>("NAMES").unwrap_or_default(),
        args.get_one::<PathBuf>("names-file"),
    ) {
        Ok(names) => names,
        Err(e) => return exit_code(Err(anyhow::anyhow!(e))),
    };

    let since = args
        .get_one::<DateTime<Utc>>("since")
        .copied()
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let max_hops = args
        .get_one::<usize>("max-hops")
        .copied()
        .unwrap_or(DEFAULT_MAX_HOPS);
    let format = args
        .get_one::<String>("format")
        .and_then(|f| OutputFormat::from_str(f))
        .unwrap_or(OutputFormat::Text);

    let store = match open_store(db_dir) {
        Ok(store) => store,
        Err(e) => return exit_code(Err(e)),
    };

    match handle_resolve(&store, &names, since, max_hops) {
        Ok(pairs) => exit_code(render_pairs(&pairs, format).map(|out| print!("{}", out))),
        Err(e) if e.is_empty_result() => {
            if !quiet {
                eprintln!("{} {}", "⚠".yellow().bold(), e);
            }
            2
        }
        Err(e) => exit_code(Err(e.into())),
    }
}

fn run_submit(db_dir: &str, args: &ArgMatches, quiet: bool) -> anyhow::Result<()> {
    let names = collect_names(
        args.get_many::<String>("NAMES").unwrap_or_default(),
        args.get_one::<PathBuf>("names-file"),
    )
    .map_err(anyhow::Error::msg)?;
    let domains: Vec<String> = args
        .get_many::<String>("domain")
        .unwrap_or_default()
        .cloned()
        .collect();
    let source = args
        .get_one::<String>("source")
        .map(String::as_str)
        .unwrap_or("cli");

    let store = open_store(db_dir)?;
    handle_submit(&store, &domains, &names, source, quiet);
    Ok(())
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
