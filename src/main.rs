use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use graphdump::source::JsonlSource;
use graphdump::{DumpConfig, DumpGraph};
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "graphdump")]
#[command(about = "Dump a property graph into one file per vertex label")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump vertices with their incident edges, one file per label
    Dump(DumpArgs),
}

#[derive(Args)]
struct DumpArgs {
    /// Directory holding vertices*.jsonl and edges*.jsonl exports
    #[arg(short, long)]
    input: String,

    /// Output directory for table files
    #[arg(short, long)]
    output: String,

    /// Worker threads for fetching and writing (0 = one per core)
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Elements per fetched page
    #[arg(long, default_value_t = graphdump::config::PAGE_SIZE)]
    page_size: usize,

    /// Hide the progress spinner
    #[arg(long)]
    no_progress: bool,
}

fn run_dump(args: DumpArgs) -> Result<()> {
    if !Path::new(&args.input).is_dir() {
        bail!("Input directory does not exist: {}", args.input);
    }

    let source = JsonlSource::new(&args.input).with_page_size(args.page_size);
    let dump = DumpGraph::new(source).with_config(DumpConfig {
        threads: args.threads,
        progress: !args.no_progress,
    });

    info!(input = %args.input, output = %args.output, "Starting dump");
    let summary = dump.dump(&args.output)?;

    println!();
    println!("{}", summary);
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let result = match cli.command {
        Commands::Dump(args) => run_dump(args),
    };

    match result {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
