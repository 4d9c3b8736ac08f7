mod config;

use clap::{ArgAction, Parser};
use config::{config_path, get_default_config_toml, load_config};
use console::style;
use futures::StreamExt;
use libdns_dangle::{
    hosts::read_hosts, sink::CsvSink, Progress, ScanConfig, Scanner, StatusRecord, Verdict,
};
use std::{
    fs::File,
    io::{self, Write},
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dangle")]
#[command(about = "Dangling DNS scanner - find hostnames that resolve but no longer serve", long_about = None)]
struct Args {
    /// File with one hostname per line
    #[arg(required_unless_present_any = ["print_default_config", "write_default_config"])]
    input: Option<PathBuf>,

    /// Number of concurrent workers (default: 20)
    #[arg(allow_negative_numbers = true)]
    workers: Option<String>,

    /// Per-request timeout in seconds (default: 15)
    #[arg(allow_negative_numbers = true)]
    timeout: Option<String>,

    /// CSV file to write results to
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Do not retry with GET when a HEAD request fails
    #[arg(long)]
    no_get_fallback: bool,

    /// Also print every result as NDJSON on stdout (one JSON object per line)
    #[arg(long, short = 'j')]
    ndjson: bool,

    /// More diagnostics on stderr (-v info, -vv debug)
    #[arg(long, short = 'v', action = ArgAction::Count)]
    verbose: u8,

    /// Print the default config to stdout and exit
    #[arg(long)]
    print_default_config: bool,

    /// Write the default config to the config path and exit
    #[arg(long)]
    write_default_config: bool,
}

/// Positional numbers must be positive integers; anything else is reported
/// back so the caller can warn and keep its default.
fn parse_positive(raw: Option<&str>, default: u64) -> Result<u64, String> {
    match raw {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(raw.to_string()),
        },
    }
}

fn apply_args(args: &Args, mut scan: ScanConfig) -> ScanConfig {
    let default_workers = scan.workers as u64;
    scan.workers = match parse_positive(args.workers.as_deref(), default_workers) {
        Ok(n) => n as usize,
        Err(raw) => {
            eprintln!("Invalid max_workers value: {}. Using default: {}", raw, default_workers);
            scan.workers
        }
    };

    let default_timeout = scan.timeout.as_secs();
    scan.timeout = match parse_positive(args.timeout.as_deref(), default_timeout) {
        Ok(secs) => Duration::from_secs(secs),
        Err(raw) => {
            eprintln!(
                "Invalid timeout value: {}. Using default: {} seconds",
                raw, default_timeout
            );
            scan.timeout
        }
    };

    if args.no_get_fallback {
        scan.get_fallback = false;
    }
    scan
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("warn,libdns_dangle={level},dangle={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Operator-facing lines. With NDJSON on stdout they move to stderr.
#[derive(Debug, Clone, Copy)]
struct Console {
    ndjson: bool,
}

impl Console {
    fn say(&self, line: impl std::fmt::Display) {
        if self.ndjson {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }
}

fn progress_line(p: &Progress) -> String {
    format!(
        "Progress: {}/{} subdomains checked ({:.1}%) - Elapsed: {:.1}s, Est. remaining: {:.1}s",
        p.completed,
        p.total,
        p.percent(),
        p.elapsed.as_secs_f64(),
        p.remaining.as_secs_f64()
    )
}

#[derive(Debug, Default, PartialEq)]
struct Tally {
    active: usize,
    dangling: usize,
    dns_errors: usize,
    errors: usize,
}

impl Tally {
    fn add(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Active => self.active += 1,
            Verdict::PossibleDanglingDns => self.dangling += 1,
            Verdict::DnsError => self.dns_errors += 1,
            Verdict::Error => self.errors += 1,
        }
    }
}

fn report(record: &StatusRecord, console: Console) -> io::Result<()> {
    if record.verdict.is_dangling() {
        console.say(
            style(format!(
                "Possible dangling DNS: {} - {} - {}",
                record.host, record.outcome_label, record.dns_label
            ))
            .yellow()
            .bold(),
        );
    } else if record.verdict == Verdict::Error {
        eprintln!(
            "Error processing {}: {}",
            record.host, record.server_info_label
        );
    }

    if console.ndjson {
        if let Ok(json) = serde_json::to_string(record) {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", json)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

async fn run_scan(
    hosts: Vec<String>,
    scan: ScanConfig,
    sink: &CsvSink<File>,
    console: Console,
) -> Result<(Tally, Duration), Box<dyn std::error::Error>> {
    let scanner = Scanner::with_config(scan)?;

    // Progress only fires while the run is polled, so the banner still comes first.
    let mut run = scanner.run_with_progress(hosts, move |p: &Progress| {
        console.say(progress_line(p));
    });
    console.say(format!(
        "Starting scan of {} subdomains with {} concurrent workers and {}s timeout...",
        run.total(),
        run.worker_count(),
        run.timeout().as_secs()
    ));

    let mut tally = Tally::default();
    while let Some(record) = run.next().await {
        sink.write(&record)?;
        report(&record, console)?;
        tally.add(record.verdict);
    }

    info!(completed = run.completed(), ?tally, "Scan complete");
    Ok((tally, run.started_at().elapsed()))
}

fn print_summary(console: Console, elapsed: Duration, output: &Path, tally: &Tally) {
    console.say(format!("\nScan completed in {:.1} seconds", elapsed.as_secs_f64()));
    console.say(format!("Results saved to {}", output.display()));
    console.say(format!(
        "Active: {}, Possible dangling DNS: {}, DNS errors: {}, Errors: {}",
        tally.active, tally.dangling, tally.dns_errors, tally.errors
    ));
    console.say("\nTo find potential dangling DNS records, look for entries with:");
    console.say("- Valid DNS Resolution (IP address)");
    console.say("- Status Code showing 'No Response', 'Connection Refused', or 'Timeout'");
    console.say("- Status column showing 'Possible Dangling DNS'");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.print_default_config {
        println!("{}", get_default_config_toml());
        return Ok(());
    }

    if args.write_default_config {
        if let Some(path) = config_path() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, get_default_config_toml())?;
            println!("Default config written to: {}", path.display());
        } else {
            eprintln!("Error: Could not determine config path");
            std::process::exit(1);
        }
        return Ok(());
    }

    init_logging(args.verbose);

    let config = load_config();
    let scan = apply_args(&args, config.scan_config());
    let console = Console { ndjson: args.ndjson };

    let Some(input) = args.input.as_deref() else {
        eprintln!("Error: No input file given");
        std::process::exit(1);
    };

    let hosts = match read_hosts(input) {
        Ok(hosts) => hosts,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let output = args.output.clone().unwrap_or(config.output.path);
    let sink = match CsvSink::create(&output) {
        Ok(sink) => sink,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let rt = tokio::runtime::Runtime::new()?;
    let (tally, elapsed) = match rt.block_on(run_scan(hosts, scan, &sink, console)) {
        Ok(done) => done,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    print_summary(console, elapsed, &output, &tally);
    Ok(())
}
