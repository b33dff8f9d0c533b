//! expectrun - Expectation-Driven Test Case Runner CLI

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser};
use tracing_subscriber::EnvFilter;

use expectrun::{discover, Action, Batch, Engine, EngineConfig, RunnerConfig, VerbosityLevel};

#[derive(Parser, Debug)]
#[command(name = "expectrun", version)]
#[command(about = "Compile, run and check test cases against recorded output")]
#[command(group(ArgGroup::new("action").args(["test", "run", "store"])))]
struct Args {
    /// Test sources or directories (default: the configured cases directory)
    cases: Vec<PathBuf>,

    /// Compare output against the recorded expectation (default)
    #[arg(long)]
    test: bool,

    /// Run and print output without comparing
    #[arg(long)]
    run: bool,

    /// Record the output as the new expectation
    #[arg(long)]
    store: bool,

    /// Show executed commands and all output; repeat for more logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print verdict lines and the summary only
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Pass the debug argument to every test binary
    #[arg(long)]
    debug: bool,

    /// Runner configuration file (default: ./expectrun.toml if present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the resolved case paths and exit
    #[arg(long)]
    list: bool,
}

impl Args {
    fn action(&self) -> Action {
        if self.run {
            Action::Print
        } else if self.store {
            Action::Record
        } else {
            Action::Verify
        }
    }

    fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose > 0 {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .init();
}

fn run(args: &Args) -> Result<u8, String> {
    let workdir = std::env::current_dir()
        .map_err(|e| format!("Failed to determine working directory: {}", e))?;

    let runner = match &args.config {
        Some(path) => RunnerConfig::from_file(path),
        None => RunnerConfig::discover(&workdir),
    }
    .map_err(|e| e.to_string())?;

    let config = EngineConfig::from_env(workdir)
        .with_runner(runner)
        .with_verbosity(args.verbosity())
        .with_debug(args.debug);

    let paths = discover(&args.cases, &config).map_err(|e| e.to_string())?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.list {
        for path in &paths {
            writeln!(out, "{}", path.display()).map_err(|e| e.to_string())?;
        }
        return Ok(0);
    }

    let engine = Engine::new(config);
    let report = Batch::new(&engine, args.action())
        .run(&paths, &mut out)
        .map_err(|e| format!("Failed to write report: {}", e))?;
    out.flush().map_err(|e| e.to_string())?;

    Ok(report.exit_code())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}
