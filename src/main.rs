use std::process::ExitCode;
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches, Parser};

use tabconv::config::{Config, ConfigStore};
use tabconv::observability::{CompositeObserver, ConversionObserver, FileObserver, StdErrObserver};
use tabconv::pipeline::{ConversionOptions, ConversionRequest, Converter};
use tabconv::registry::Registry;
use tabconv::ConvertResult;

const FALLBACK_OUTPUT: &str = "asciibox:-";

/// Convert tabular data between formats, optionally querying it with SQL on the way.
#[derive(Parser, Debug)]
#[command(name = "tabconv", version)]
struct Args {
    /// Source location, e.g. `data.csv`, `csv:-` or `sqlite:///db.sqlite?table=t`
    source: String,

    /// SQL run against the source (as table `data`, or natively for database sources)
    #[arg(short = 'q', long = "query")]
    query: Option<String>,

    /// SQL run against the result of the query, always as table `data`
    #[arg(short = 'F', long = "filter")]
    filter: Option<String>,

    /// Destination location (default: config `default_output`, else `asciibox:-`)
    #[arg(short = 'o', long = "output")]
    output: Option<String>,

    /// Log every conversion outcome to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> ConvertResult<()> {
    let registry = Registry::with_default_adapters()?;

    let matches = Args::command().after_help(registry.help_text()).get_matches();
    let args = match Args::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(e) => e.exit(),
    };

    let config = match ConfigStore::from_env() {
        Some(store) => store.load()?,
        None => Config::default(),
    };

    let destination = args
        .output
        .as_deref()
        .or(config.default_output.as_deref())
        .unwrap_or(FALLBACK_OUTPUT);

    let mut request = ConversionRequest::new(&args.source, destination)?;
    if let Some(q) = args.query {
        request = request.with_query(q);
    }
    if let Some(f) = args.filter {
        request = request.with_filter(f);
    }

    let converter = Converter::new(&registry).with_options(options_for(args.verbose, &config));
    let written = converter.convert(&request)?;
    if !request.destination.is_stdio() {
        eprintln!("Wrote out {written}");
    }
    Ok(())
}

fn options_for(verbose: bool, config: &Config) -> ConversionOptions {
    let mut observers: Vec<Arc<dyn ConversionObserver>> = Vec::new();
    if verbose {
        observers.push(Arc::new(StdErrObserver));
    }
    if let Some(path) = &config.log_file {
        observers.push(Arc::new(FileObserver::new(path)));
    }

    let observer: Option<Arc<dyn ConversionObserver>> = match observers.len() {
        0 => None,
        1 => observers.pop(),
        _ => Some(Arc::new(CompositeObserver::new(observers))),
    };
    ConversionOptions {
        observer,
        ..ConversionOptions::default()
    }
}
