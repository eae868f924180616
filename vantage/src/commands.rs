use crate::CLAP_STYLING;
use clap::{ArgAction, arg, command};
use vantage::handlers::{DEFAULT_DB_DIR, parse_since};

fn name_arg() -> clap::Arg {
    arg!(<NAME>).help("Domain name the record belongs to")
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("vantage")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("vantage")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress non-essential output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Enable debug logging")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(--"db" <PATH>)
                .required(false)
                .global(true)
                .help("Directory holding the vantage database")
                .default_value(DEFAULT_DB_DIR),
        )
        .subcommand_required(true)
        .subcommand(
            command!("init")
                .about("Initializes the vantage database on your filesystem")
                .arg(
                    arg!(-f --"force")
                        .help("Overwrites any existing database at the --db location.")
                        .required(false),
                ),
        )
        .subcommand(
            command!("fqdn")
                .about("Records a domain name")
                .arg(name_arg()),
        )
        .subcommand(
            command!("addr")
                .about("Records a standalone IP address")
                .arg(arg!(<ADDR>).help("IPv4 or IPv6 address")),
        )
        .subcommand(
            command!("a")
                .about("Records an A record: NAME resolves to the IPv4 ADDR")
                .arg(name_arg())
                .arg(arg!(<ADDR>).help("IPv4 address")),
        )
        .subcommand(
            command!("aaaa")
                .about("Records an AAAA record: NAME resolves to the IPv6 ADDR")
                .arg(name_arg())
                .arg(arg!(<ADDR>).help("IPv6 address")),
        )
        .subcommand(
            command!("cname")
                .about("Records a CNAME record: NAME is an alias of TARGET")
                .arg(name_arg())
                .arg(arg!(<TARGET>).help("Canonical name")),
        )
        .subcommand(
            command!("srv")
                .about("Records an SRV record: service NAME is served by TARGET")
                .arg(arg!(<NAME>).help("Service name, e.g. _sip._tcp.example.com"))
                .arg(arg!(<TARGET>).help("Target host name")),
        )
        .subcommand(
            command!("resolve")
                .about("Lists the addresses the given names resolve to, following CNAME/SRV aliases")
                .arg(arg!([NAMES] ... "Names to resolve").required(false))
                .arg(
                    arg!(-H --"names-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of names or URLs")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-s --"since" <TIME>)
                        .required(false)
                        .help("Only consider records observed at or after this RFC 3339 time")
                        .value_parser(parse_since),
                )
                .arg(
                    arg!(--"max-hops" <N>)
                        .required(false)
                        .help("Maximum alias hops to follow per name [default: 10]")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(-F --"format" <FORMAT>)
                        .required(false)
                        .help("Output format")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                ),
        )
        .subcommand(
            command!("submit")
                .about("Records discovered names that fall inside the given scope domains")
                .arg(arg!([NAMES] ... "Candidate names").required(false))
                .arg(
                    arg!(-d --"domain" <DOMAIN>)
                        .required(true)
                        .action(ArgAction::Append)
                        .help("In-scope apex domain (repeatable)"),
                )
                .arg(
                    arg!(-H --"names-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of names or URLs")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(--"source" <NAME>)
                        .required(false)
                        .help("Collector name attached to the discoveries")
                        .default_value("cli"),
                ),
        )
}
