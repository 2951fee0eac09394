use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use ipresource::{Error, IntervalMap, IpInterval, IpTree, LoaderConfig, OverlapPolicy, loader};

/// Query a file of IP intervals by containment
#[derive(Debug, Parser)]
#[command(name = "ipresource", version, about)]
struct Cli {
    /// Skip lines that partially overlap an interval loaded earlier
    #[arg(long)]
    skip_overlaps: bool,

    /// Skip lines whose interval cannot be parsed
    #[arg(long)]
    skip_invalid: bool,

    /// File of `interval value` lines
    file: PathBuf,

    /// Query to run
    #[arg(value_enum)]
    query: Query,

    /// Interval to query, e.g. `10.0.0.0/8` or `192.0.2.0 - 192.0.2.10`
    interval: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Query {
    Exact,
    FirstLess,
    ExactOrFirstLess,
    AllLess,
    ExactAndAllLess,
    FirstMore,
    AllMore,
    ExactAndAllMore,
}

impl Query {
    fn run<'a>(self, tree: &'a IpTree<String>, key: &IpInterval) -> Vec<&'a String> {
        match self {
            Query::Exact => tree.find_exact(key).into_iter().collect(),
            Query::FirstLess => tree.find_first_less_specific(key).into_iter().collect(),
            Query::ExactOrFirstLess => tree.find_exact_or_first_less_specific(key).into_iter().collect(),
            Query::AllLess => tree.find_all_less_specific(key),
            Query::ExactAndAllLess => tree.find_exact_and_all_less_specific(key),
            Query::FirstMore => tree.find_first_more_specific(key),
            Query::AllMore => tree.find_all_more_specific(key),
            Query::ExactAndAllMore => tree.find_exact_and_all_more_specific(key),
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn run(cli: &Cli) -> Result<(), Error> {
    let key: IpInterval = cli
        .interval
        .parse()
        .map_err(Error::Query)?;

    let config = LoaderConfig {
        overlap_policy: if cli.skip_overlaps {
            OverlapPolicy::Skip
        } else {
            OverlapPolicy::Abort
        },
        skip_invalid_lines: cli.skip_invalid,
        ..LoaderConfig::default()
    };
    let (tree, _) = loader::load_path(&cli.file, &config)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for value in cli.query.run(&tree, &key) {
        writeln!(out, "{value}")?;
    }
    Ok(())
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(err) = run(&cli) {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}
