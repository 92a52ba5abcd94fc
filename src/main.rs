use anyhow::{Context, Result, bail};
use case_oracle::config::Config;
use case_oracle::history::RunHistory;
use case_oracle::loader;
use case_oracle::oracle::Oracle;
use case_oracle::output::{self, RunDocument};
use case_oracle::registry::{self, SuiteLoad};
use case_oracle::runner::{self, AnalyzerCommand, PredictionSource, PredictionTable};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "case-oracle",
    about = "Ground-truth oracle for program-analysis benchmarks: parse @Case annotations, score analyzer predictions"
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, default_value = "case-oracle.toml")]
    config: PathBuf,

    /// Fixture source roots (overrides suite.sources)
    #[arg(short, long, global = true)]
    source: Vec<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
    Html,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Load the suite and report every case that fails to parse
    Check {
        /// Exit with an error if any case or source file is rejected
        #[arg(long)]
        strict: bool,
    },

    /// Print the parsed suite as JSON, keyed by method id
    Cases,

    /// Score predictions against the suite
    Evaluate {
        /// JSON file of precomputed predictions
        #[arg(long, conflicts_with = "analyzer", required_unless_present = "analyzer")]
        predictions: Option<PathBuf>,

        /// Run the configured analyzer once per case
        #[arg(long)]
        analyzer: bool,

        #[arg(long, value_enum, default_value = "text")]
        format: Format,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render an HTML report from a JSON run saved by `evaluate --format json`
    Render {
        report: PathBuf,

        #[arg(short, long, default_value = "case-oracle-report.html")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("case_oracle=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut cfg = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::default()
    };
    if !cli.source.is_empty() {
        cfg.suite.sources = cli.source;
    }
    cfg.validate()?;

    match cli.command {
        Command::Check { strict } => check(&cfg, strict),
        Command::Cases => {
            let suite = load_suite(&cfg);
            println!("{}", serde_json::to_string_pretty(&suite.registry)?);
            Ok(())
        }
        Command::Evaluate {
            predictions,
            analyzer,
            format,
            output,
        } => evaluate(&cfg, predictions, analyzer, format, output).await,
        Command::Render { report, output } => render(&report, &output),
    }
}

fn load_suite(cfg: &Config) -> SuiteLoad {
    let scan = loader::scan_sources(&cfg.suite.sources);
    for e in &scan.errors {
        warn!(error = %e, "fixture source rejected");
    }
    registry::load(scan.pairs())
}

fn check(cfg: &Config, strict: bool) -> Result<()> {
    let scan = loader::scan_sources(&cfg.suite.sources);
    let suite = registry::load(scan.pairs());

    println!(
        "{} methods, {} cases, {} rejected",
        suite.registry.all_signatures().len(),
        suite.registry.case_count(),
        suite.errors.len() + scan.errors.len()
    );
    for e in &scan.errors {
        println!("  {e}");
    }
    for e in &suite.errors {
        println!("  {e}");
    }

    if strict && !(scan.errors.is_empty() && suite.errors.is_empty()) {
        bail!("suite has rejected cases");
    }
    Ok(())
}

async fn evaluate(
    cfg: &Config,
    predictions: Option<PathBuf>,
    use_analyzer: bool,
    format: Format,
    out_path: Option<PathBuf>,
) -> Result<()> {
    let suite = load_suite(cfg);
    if suite.registry.is_empty() {
        bail!(
            "no cases found under {:?}",
            cfg.suite.sources.iter().map(|p| p.display().to_string()).collect::<Vec<_>>()
        );
    }

    let source = match predictions {
        Some(path) if !use_analyzer => PredictionSource::Table(PredictionTable::load(&path)?),
        _ => PredictionSource::Analyzer(AnalyzerCommand::from_config(&cfg.analyzer)?),
    };
    let label = source.label();
    let oracle = Oracle::new(cfg.scoring.rule, cfg.scoring.tolerance);

    let run = runner::run(&suite.registry, Arc::new(source), oracle, cfg.analyzer.jobs).await;
    let doc = RunDocument::new(&run, label.clone(), oracle.rule());

    let rendered = match format {
        Format::Text => output::render_text(&doc),
        Format::Json => doc.to_json()?,
        Format::Html => output::render_html(&doc)?,
    };
    match &out_path {
        Some(path) => {
            write_file(path, &rendered)?;
            info!(path = %path.display(), "report written");
        }
        None => print!("{rendered}"),
    }

    if cfg.history.enabled {
        let current = RunHistory::new(label, oracle.rule(), run.report);
        if let Some(previous) = RunHistory::load_latest(&cfg.history.dir)
            && let Some(delta) = current.score_delta(&previous)
        {
            eprintln!(
                "Average score {delta:+.3} since {}",
                previous.timestamp.format("%Y-%m-%d %H:%M UTC")
            );
        }
        if let Err(e) = current.save(&cfg.history.dir) {
            warn!(error = %e, "could not save run history");
        }
    }
    Ok(())
}

fn render(report: &Path, output_path: &Path) -> Result<()> {
    let json = std::fs::read_to_string(report)
        .with_context(|| format!("reading {}", report.display()))?;
    let doc = RunDocument::from_json(&json)?;
    let html = output::render_html(&doc)?;
    write_file(output_path, &html)?;

    println!(
        "Report rendered: {} ({} cases)",
        output_path.display(),
        doc.records.len()
    );
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}
