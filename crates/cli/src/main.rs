//! CodeAtlas CLI - build a code knowledge graph from a repository

use anyhow::{Context, Result};
use clap::Parser;
use codeatlas_core::{
    parse_repository_to_writer, AtlasOptions, Indent, OutputOptions, ScanFilter, WriteMode,
};
use colored::Colorize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "codeatlas")]
#[command(about = "Parse a repository into a code knowledge graph", long_about = None)]
#[command(version = codeatlas_core::VERSION)]
struct Cli {
    /// Repository root to parse (default: current directory)
    path: Option<PathBuf>,

    /// Only include files matching these globs
    #[arg(long, value_delimiter = ',')]
    include: Vec<String>,

    /// Skip paths matching these globs
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Maximum file size in bytes
    #[arg(long, default_value_t = 2 * 1024 * 1024)]
    max_file_size: u64,

    /// Parser worker count (default: number of cores)
    #[arg(long, default_value_t = 0)]
    workers: usize,

    /// Java/Kotlin package prefix treated as repository-local
    #[arg(long)]
    project_package: Option<String>,

    /// Write the artifact to this file instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Indent the JSON output
    #[arg(long)]
    pretty: bool,

    /// Stream the artifact instead of buffering it
    #[arg(long)]
    streaming: bool,

    /// Suppress the summary line
    #[arg(long, short)]
    quiet: bool,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let root = cli
        .path
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));

    let options = AtlasOptions {
        filter: ScanFilter {
            include_globs: cli.include.clone(),
            exclude_globs: cli.exclude.clone(),
            max_size_bytes: cli.max_file_size,
            ..ScanFilter::default()
        },
        worker_count: cli.workers,
        project_package: cli.project_package.clone(),
        timestamp: None,
    };

    let write_options = OutputOptions {
        indent: if cli.pretty {
            Indent::TwoSpace
        } else {
            Indent::None
        },
        mode: if cli.streaming {
            WriteMode::Streaming
        } else {
            WriteMode::Buffered
        },
    };

    let output = match &cli.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create {}", path.display()))?;
            let mut sink = BufWriter::new(file);
            parse_repository_to_writer(&root, &options, &mut sink, &write_options)?
        }
        None => {
            let stdout = io::stdout();
            let mut sink = BufWriter::new(stdout.lock());
            let output = parse_repository_to_writer(&root, &options, &mut sink, &write_options)?;
            drop(sink);
            writeln!(io::stdout())?;
            output
        }
    };

    if !cli.quiet {
        let symbols: usize = output.files.iter().map(|f| f.symbols.len()).sum();
        let meta = &output.metadata;
        let status = if meta.failure_count == 0 {
            format!("{}", "ok".green().bold())
        } else {
            format!("{}", "partial".yellow().bold())
        };
        eprintln!(
            "{status} {} files ({} failed), {} symbols, {} relationships, {} errors",
            meta.success_count,
            meta.failure_count,
            symbols,
            output.relationships.len(),
            meta.errors.len(),
        );
    }

    Ok(())
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
