use clap::Parser;
use colored::Colorize;
use pidmr::cache::Cache;
use pidmr::debounce::Debouncer;
use pidmr::report::{self, print_input_report, Report};
use pidmr::{Metaresolver, MetaresolverConfig, ResolutionMode, DEFAULT_API_BASE};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pidmr")]
#[command(version)]
#[command(about = "Identify persistent identifiers and build their resolution URLs", long_about = None)]
struct Args {
    /// PIDs to identify (e.g. doi:10.3352/jeehp.2013.10.3)
    inputs: Vec<String>,

    /// Metaresolver API base URL
    #[arg(long, env = "PIDMR_API", default_value = DEFAULT_API_BASE)]
    api: String,

    /// Load providers from the remote provider collection
    #[arg(long)]
    remote_registry: bool,

    /// Let the server identify inputs instead of matching locally
    #[arg(long)]
    remote_identify: bool,

    /// Load providers from a JSON file
    #[arg(long, value_name = "PATH")]
    registry_file: Option<PathBuf>,

    /// Print only the URL of this resolution mode (landingpage, metadata, resource)
    #[arg(long, short)]
    mode: Option<ResolutionMode>,

    /// List supported PID types
    #[arg(long)]
    list: bool,

    /// Read edits of one input from stdin, one per line, and identify as you type
    #[arg(long, short)]
    watch: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Disable caching of provider records
    #[arg(long)]
    no_cache: bool,

    /// Remove cached provider records
    #[arg(long)]
    clear_cache: bool,

    /// Strict mode: exit with error code if any input is not a valid PID
    #[arg(long, short)]
    strict: bool,

    /// Verbose output
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = if args.verbose { "pidmr=debug" } else { "pidmr=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if args.clear_cache {
        match Cache::new(true).and_then(|cache| cache.clear()) {
            Ok(()) => eprintln!("Cache cleared"),
            Err(e) => {
                eprintln!("{} Failed to clear cache: {}", "Error:".red().bold(), e);
                return ExitCode::FAILURE;
            }
        }
        if args.inputs.is_empty() && !args.list && !args.watch {
            return ExitCode::SUCCESS;
        }
    }

    let config = MetaresolverConfig {
        api_base: args.api.clone(),
        remote_registry: args.remote_registry,
        remote_identify: args.remote_identify,
        registry_file: args.registry_file.clone(),
        cache_enabled: !args.no_cache,
        ..Default::default()
    };

    let resolver = match Metaresolver::load(config).await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{} Failed to initialize metaresolver: {}", "Error:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    if args.list {
        report::print_providers(resolver.registry());
        if args.inputs.is_empty() && !args.watch {
            return ExitCode::SUCCESS;
        }
    }

    if args.watch {
        return watch(Arc::new(resolver), args.json).await;
    }

    if args.inputs.is_empty() {
        eprintln!("{} No inputs given (try --help)", "Error:".red().bold());
        return ExitCode::FAILURE;
    }

    let show_progress = args.inputs.len() > 1 && !args.json && args.mode.is_none();
    let report = resolver.identify_all(args.inputs.clone(), show_progress).await;

    if args.json {
        if let Err(e) = print_json(&report) {
            eprintln!("{} Failed to serialize report: {}", "Error:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    } else if let Some(mode) = args.mode {
        report.print_urls(mode);
    } else {
        report.print();
    }

    exit_code(&report, args.strict)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn exit_code(report: &Report, strict: bool) -> ExitCode {
    let valid = report.count_valid();
    if valid == 0 || (strict && valid < report.entries.len()) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Treat each stdin line as the current value of a single input field
async fn watch(resolver: Arc<Metaresolver>, json: bool) -> ExitCode {
    let mut debouncer = Debouncer::new(resolver.debounce_delay());
    let mut rx = debouncer.subscribe();

    let printer = tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let published = rx.borrow_and_update().clone();
            match published {
                Some(published) if json => {
                    if let Err(e) = print_json(&published.value) {
                        eprintln!("{} Failed to serialize result: {}", "Error:".red().bold(), e);
                    }
                }
                Some(published) => print_input_report(&published.value),
                None => println!("{}", "(cleared)".dimmed()),
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let resolver = Arc::clone(&resolver);
                debouncer.schedule(line, move |text| async move {
                    resolver.identify_input(&text).await
                });
            }
            Ok(None) => break,
            Err(e) => {
                eprintln!("{} Failed to read stdin: {}", "Error:".red().bold(), e);
                break;
            }
        }
    }

    debouncer.settle().await;
    // Closing the channel ends the printer
    drop(debouncer);
    let _ = printer.await;

    ExitCode::SUCCESS
}
