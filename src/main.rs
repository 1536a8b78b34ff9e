use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;

use javacha::ast::{NullProgressReporter, ProgressReporter, SourceFileProvider};
use javacha::config::BuildConfig;
use javacha::orchestrator::Build;
use javacha::reference_impl::{InMemoryBinder, InMemorySourceFileProvider, InMemoryTypeCalculator};

mod demo;

/// CLI arguments for the call-graph build demonstration binary.
///
/// This binary exists to exercise the pipeline end to end using the
/// in-memory reference implementations of `SourceFileProvider`/`Binder`/
/// `TypeCalculator`; it is not a production Java/Kotlin front end. A host
/// application links against the `javacha` library crate directly and
/// supplies its own collaborators backed by a real parser and compiler API.
#[derive(Parser, Debug)]
#[command(name = "javacha", about = "Whole-program Class Hierarchy Analysis call-graph construction.", version)]
struct Cli {
    /// Built-in demonstration scenario to build a call graph for.
    #[arg(long, value_enum, default_value_t = Scenario::Diamond)]
    demo: Scenario,
    /// Worker threads for Stages 1, 3, and 4. Defaults to `cores - 1`.
    #[arg(long, value_name = "N")]
    worker_threads: Option<usize>,
    /// Wall-clock budget, in seconds, for a single stage barrier.
    #[arg(long, value_name = "SECONDS", default_value_t = 300)]
    stage_timeout_secs: u64,
    /// Write the resulting summary as JSON to this path instead of stdout.
    #[arg(long, value_name = "PATH")]
    output: Option<std::path::PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Scenario {
    /// A single override of a base-class method.
    SingleOverride,
    /// A diamond interface hierarchy with one implementing class.
    Diamond,
    /// A chain of constructors relying on the synthetic default constructor.
    ConstructorChain,
    /// An anonymous class instance creation.
    Anonymous,
}

#[derive(Serialize)]
struct BuildSummary {
    classes: usize,
    methods: usize,
    edges: usize,
    extended_edges: usize,
    root_methods: usize,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:?}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    javacha::telemetry::init_logging();

    let config = BuildConfig {
        stage_timeout: Duration::from_secs(cli.stage_timeout_secs),
        worker_threads: cli.worker_threads,
        ..BuildConfig::default()
    };

    let binder = Arc::new(InMemoryBinder::new());
    let type_calculator = Arc::new(InMemoryTypeCalculator::default());
    let trees = match cli.demo {
        Scenario::SingleOverride => demo::single_override(&binder, &type_calculator),
        Scenario::Diamond => demo::diamond_interfaces(&binder, &type_calculator),
        Scenario::ConstructorChain => demo::constructor_chain(&binder, &type_calculator),
        Scenario::Anonymous => demo::anonymous_class(&binder, &type_calculator),
    };
    let source_files: Arc<dyn SourceFileProvider> = Arc::new(InMemorySourceFileProvider::new(trees));
    let progress: Arc<dyn ProgressReporter> = Arc::new(NullProgressReporter);

    let (artifacts, stats) = Build::new(config)
        .run(source_files, binder, type_calculator, progress)
        .context("call-graph build failed")?;

    let summary = BuildSummary {
        classes: stats.classes,
        methods: stats.methods,
        edges: artifacts.call_graph.size(),
        extended_edges: artifacts.call_graph.extended_edge_count(),
        root_methods: artifacts.call_graph.root_methods().len(),
    };

    let rendered = serde_json::to_string_pretty(&summary).context("serialize build summary")?;
    match cli.output {
        Some(path) => std::fs::write(&path, rendered).with_context(|| format!("write {}", path.display()))?,
        None => println!("{rendered}"),
    }
    Ok(())
}
