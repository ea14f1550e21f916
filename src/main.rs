// Command-line entry point for the global trace builder.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use global_trace::application::GlobalTraceUsecase;
use global_trace::domain::{EdgeKind, GraphOptions};
use global_trace::infrastructure::{
    concurrency, load_records, logging, resolve_output_path, OutputFormat,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Build the global trace dependency graph of an MPM trace repository", long_about = None)]
struct Cli {
    /// Input trace repository (XMI, or JSON record store with a .json extension)
    #[arg(default_value = "src_artifacts/MPM_trace_example.xml")]
    input: PathBuf,

    /// Output file path (default: output_g_trace/<input stem>.<ext>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format (json, dot, text)
    #[arg(short, long, default_value = "json")]
    format: String,

    /// Worker threads for dependency inference (default: half the cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Leave model nodes and their edges out of the graph
    #[arg(long)]
    no_models: bool,

    /// Leave trace link nodes out of the graph
    #[arg(long)]
    no_links: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let format: OutputFormat = cli.format.parse()?;
    concurrency::init_thread_pool(cli.threads)?;

    let store = load_records(&cli.input)?;

    let exporter = format.exporter();
    let output = resolve_output_path(&cli.input, cli.output.as_deref(), exporter.extension());

    let usecase = GlobalTraceUsecase {
        exporter: exporter.as_ref(),
        options: GraphOptions {
            include_models: !cli.no_models,
            include_trace_links: !cli.no_links,
        },
    };

    let trace = usecase.run(&store, &output)?;

    println!("Global trace saved to: {} (format: {})", output.display(), cli.format);
    println!("Source: {}", cli.input.display());
    println!(
        "{} trace models, {} dependencies, {} evolution links, {} levels",
        trace.entities.trace_models.len(),
        trace.analysis.dependency_count(),
        trace.edges_of_kind(EdgeKind::Evolution).count(),
        trace.levels.levels_by_rank().len()
    );
    if !trace.diagnostics.is_empty() {
        eprintln!("{} diagnostics (run with -v for details)", trace.diagnostics.len());
    }

    Ok(())
}
