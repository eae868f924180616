use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use clap::ArgMatches;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;
use vantage_core::{
    Asset, AssetPayload, AssetStore, DomainScope, GraphError, Intake, LogDispatcher,
    NameAddrPair, RecordWriter, Resolver, ResolverOptions, SqliteStore,
};

pub const DEFAULT_DB_DIR: &str = "~/.config/vantage/";
pub const DB_FILE_NAME: &str = "vantage.db";

/// Output format for resolved pairs
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

/// A single fact to write into the graph, as given on the command line
#[derive(Debug, Clone, PartialEq)]
pub enum RecordCommand {
    Fqdn { name: String },
    Address { addr: String },
    A { name: String, addr: String },
    Aaaa { name: String, addr: String },
    Cname { name: String, target: String },
    Srv { name: String, target: String },
}

impl RecordCommand {
    /// Build from a write subcommand; `None` for any other subcommand.
    pub fn from_matches(subcommand: &str, args: &ArgMatches) -> Option<Self> {
        let get = |id: &str| args.get_one::<String>(id).cloned();
        match subcommand {
            "fqdn" => Some(RecordCommand::Fqdn { name: get("NAME")? }),
            "addr" => Some(RecordCommand::Address { addr: get("ADDR")? }),
            "a" => Some(RecordCommand::A {
                name: get("NAME")?,
                addr: get("ADDR")?,
            }),
            "aaaa" => Some(RecordCommand::Aaaa {
                name: get("NAME")?,
                addr: get("ADDR")?,
            }),
            "cname" => Some(RecordCommand::Cname {
                name: get("NAME")?,
                target: get("TARGET")?,
            }),
            "srv" => Some(RecordCommand::Srv {
                name: get("NAME")?,
                target: get("TARGET")?,
            }),
            _ => None,
        }
    }

    pub fn apply<S: AssetStore + ?Sized>(&self, store: &S) -> vantage_core::Result<Asset> {
        let writer = RecordWriter::new(store);
        match self {
            RecordCommand::Fqdn { name } => writer.upsert_fqdn(name),
            RecordCommand::Address { addr } => writer.upsert_address(addr),
            RecordCommand::A { name, addr } => writer.upsert_a(name, addr),
            RecordCommand::Aaaa { name, addr } => writer.upsert_aaaa(name, addr),
            RecordCommand::Cname { name, target } => writer.upsert_cname(name, target),
            RecordCommand::Srv { name, target } => writer.upsert_srv(name, target),
        }
    }
}

/// Location of the database file inside a (tilde-expanded) config directory
pub fn database_path(db_dir: &str) -> PathBuf {
    let expanded = shellexpand::tilde(db_dir);
    Path::new(expanded.as_ref()).join(DB_FILE_NAME)
}

pub fn open_store(db_dir: &str) -> anyhow::Result<SqliteStore> {
    let db_path = database_path(db_dir);
    if !SqliteStore::exists(&db_path) {
        bail!(
            "No database at {} (run `vantage init` first)",
            db_path.display()
        );
    }
    SqliteStore::open(&db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))
}

/// Parse an RFC 3339 timestamp such as `2024-01-01T00:00:00Z`
pub fn parse_since(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("Invalid timestamp {:?}: {}", value, e))
}

/// Parse a single line as a name, taking the host out of URLs
pub fn parse_name_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    if line.contains("://") {
        let url = Url::parse(line).ok()?;
        return url.host_str().map(|host| host.to_lowercase());
    }

    if line.chars().any(char::is_whitespace) {
        return None;
    }
    Some(line.trim_end_matches('.').to_lowercase())
}

/// Load and parse names from a newline-delimited file
pub fn load_names_from_file(path: &Path) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read names file {}: {}", path.display(), e))?;

    let names: Vec<String> = content.lines().filter_map(parse_name_line).collect();

    if names.is_empty() {
        return Err(format!("No valid names found in {}", path.display()));
    }

    Ok(names)
}

/// Gather names from positional arguments and an optional names file
pub fn collect_names<'a>(
    args: impl IntoIterator<Item = &'a String>,
    names_file: Option<&PathBuf>,
) -> Result<Vec<String>, String> {
    let mut names: Vec<String> = args.into_iter().filter_map(|n| parse_name_line(n)).collect();

    if let Some(path) = names_file {
        names.extend(load_names_from_file(path)?);
    }

    if names.is_empty() {
        return Err("Provide names as arguments or with --names-file".to_string());
    }
    Ok(names)
}

pub fn render_pairs(pairs: &[NameAddrPair], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(pairs).context("Failed to serialize pairs")
        }
        OutputFormat::Text => {
            let width = pairs
                .iter()
                .map(|p| p.fqdn.as_str().len())
                .max()
                .unwrap_or(0);
            let mut out = String::new();
            for pair in pairs {
                out.push_str(&format!(
                    "{:<width$}  {:<4}  {}\n",
                    pair.fqdn.as_str(),
                    pair.addr.family.as_str(),
                    pair.addr.address,
                    width = width
                ));
            }
            Ok(out)
        }
    }
}

pub fn print_divider() {
    println!("{}", "═".repeat(60).bright_black());
}

/// Create the config directory and a fresh database in it
pub fn handle_init(db_dir: &str, force: bool, quiet: bool) -> anyhow::Result<PathBuf> {
    let db_path = database_path(db_dir);
    let config_dir = db_path
        .parent()
        .context("Invalid database path")?
        .to_path_buf();

    if !quiet {
        print_divider();
        println!("{}", "  VANTAGE INITIALIZATION".bright_white().bold());
        print_divider();
        println!(
            "{} Target: {}",
            "→".blue(),
            config_dir.display().to_string().bright_white()
        );
    }

    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create {}", config_dir.display()))?;

    if SqliteStore::exists(&db_path) {
        if !force {
            bail!(
                "Database already exists at {} (use --force to overwrite)",
                db_path.display()
            );
        }
        SqliteStore::remove(&db_path)
            .with_context(|| format!("Failed to remove {}", db_path.display()))?;
        if !quiet {
            println!("{} Existing database removed", "✓".green().bold());
        }
    }

    SqliteStore::open(&db_path)
        .with_context(|| format!("Failed to create database {}", db_path.display()))?;

    if !quiet {
        println!(
            "{} Database initialized: {}",
            "✓".green().bold(),
            db_path.display().to_string().bright_white()
        );
    }
    Ok(db_path)
}

pub fn handle_record<S: AssetStore + ?Sized>(
    store: &S,
    command: &RecordCommand,
    quiet: bool,
) -> anyhow::Result<Asset> {
    let asset = command.apply(store).map_err(|e| {
        let verb = if e.is_format_error() {
            "Rejected"
        } else {
            "Failed to record"
        };
        anyhow::Error::new(e).context(format!("{} {:?}", verb, command))
    })?;

    if !quiet {
        let detail = match &asset.payload {
            AssetPayload::IpAddress(ip) => format!("{} ({})", ip, ip.family),
            AssetPayload::Fqdn(fqdn) => fqdn.to_string(),
        };
        println!(
            "{} Recorded {} [asset {}]",
            "✓".green().bold(),
            detail.bright_white(),
            asset.id
        );
    }
    Ok(asset)
}

/// Resolve names against the store. Empty outcomes are returned as errors the
/// caller can test with [`GraphError::is_empty_result`].
pub fn handle_resolve<S: AssetStore + ?Sized>(
    store: &S,
    names: &[String],
    since: DateTime<Utc>,
    max_alias_hops: usize,
) -> Result<Vec<NameAddrPair>, GraphError> {
    let mut pairs = Resolver::with_options(store, ResolverOptions { max_alias_hops })
        .resolve_addresses(names, since)?;
    pairs.sort();
    Ok(pairs)
}

/// Record every in-scope name and report how many made it in
pub fn handle_submit<S: AssetStore + ?Sized>(
    store: &S,
    domains: &[String],
    names: &[String],
    source: &str,
    quiet: bool,
) -> Vec<Asset> {
    let scope = DomainScope::new(domains);
    let recorded = Intake::new(store, &scope, &LogDispatcher, source).submit_names(names);

    if !quiet {
        println!(
            "{} {} of {} names in scope and recorded",
            "✓".green().bold(),
            recorded.len().to_string().cyan(),
            names.len().to_string().cyan()
        );
    }
    recorded
}
