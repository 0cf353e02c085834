use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::filter::LevelFilter;

use funnel_web::core::ModuleAnalyzer;
use funnel_web::formatters::JsonExporter;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "funnel-web",
    version = "1.0.0",
    author = "funnel-web developers",
    about = "Generate an in-depth directed dependency graph for a given module"
)]
struct Cli {
    /// Root module to inspect: a source directory or a single source file
    #[arg(value_name = "MODULE")]
    module: PathBuf,

    /// Comma-separated list of languages to analyze
    #[arg(
        short,
        long,
        value_name = "LANGS",
        value_delimiter = ',',
        default_value = "rust,python"
    )]
    languages: Vec<String>,

    /// Write the completed graph as JSON to this file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Logging level
    #[arg(long, value_enum, default_value_t = Level::Info)]
    level: Level,

    /// Send logs to a file. Default is to log to stdout
    #[arg(long, value_name = "FILE")]
    logfile: Option<PathBuf>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum Level {
    Info,
    Warn,
    Error,
    Debug,
}

impl Level {
    fn as_filter(self) -> LevelFilter {
        match self {
            Level::Info => LevelFilter::INFO,
            Level::Warn => LevelFilter::WARN,
            Level::Error => LevelFilter::ERROR,
            Level::Debug => LevelFilter::DEBUG,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.level, cli.logfile.as_deref())?;
    run(cli)
}

fn init_logging(level: Level, logfile: Option<&Path>) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_max_level(level.as_filter())
        .with_target(false);

    match logfile {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("cannot open logfile {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => builder.init(),
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let start_time = Instant::now();

    let normalized_languages: Vec<String> = cli
        .languages
        .into_iter()
        .map(|lang| lang.trim().to_string())
        .filter(|lang| !lang.is_empty())
        .collect();
    let language_refs: Vec<&str> = normalized_languages.iter().map(String::as_str).collect();

    info!("scraping {}", cli.module.display());

    let mut analyzer = ModuleAnalyzer::new();
    let outcome = analyzer
        .build(&cli.module, &language_refs)
        .with_context(|| format!("failed to analyze {}", cli.module.display()))?;

    for warning in &outcome.warnings {
        warn!("{warning}");
    }

    let summary = outcome.graph.summary();
    info!("vertices: {}", summary.vertices);
    info!("edges: {}", summary.edges);
    info!("modules: {}", summary.modules);
    info!("classes: {}", summary.classes);
    info!("methods: {}", summary.methods);
    info!("functions: {}", summary.functions);
    info!("files: {}", summary.files);

    if let Some(output) = &cli.output {
        JsonExporter::new()
            .with_pretty(true)
            .export_to_file(&outcome.graph, output)
            .with_context(|| format!("cannot write graph to {}", output.display()))?;
        info!("graph written to {}", output.display());
    }

    info!(
        "analysis completed in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}
