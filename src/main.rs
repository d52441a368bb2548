use anyhow::{Context, Result};
use clap::Parser;
use loadscope::analysis::{AnalysisReport, LoadAnalyzer};
use loadscope::classifier::ClassifierTables;
use loadscope::cli::{Cli, OutputFormat};
use loadscope::config::AnalysisConfig;
use loadscope::csv_output::{CsvRequestOutput, CsvWindowOutput};
use loadscope::input;
use loadscope::json_output::JsonOutput;
use loadscope::text_output;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber writing to stderr
///
/// `--debug` forces TRACE; otherwise `RUST_LOG` decides, defaulting to warnings.
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Merge the config file with command-line overrides
fn build_config(args: &Cli) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::from_toml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    if let Some(warmup) = args.warmup_seconds {
        config.warmup_seconds = warmup;
    }
    if let Some(window) = args.window_seconds {
        if window == 0 {
            anyhow::bail!("Invalid value for --window-seconds: 0 (must be >= 1)");
        }
        config.window_seconds = window;
    }
    if args.include_warmup {
        config.exclude_warmup = false;
    }

    config.validate()?;
    Ok(config)
}

fn load_tables(args: &Cli) -> Result<ClassifierTables> {
    let tables = match &args.classifier {
        Some(path) => ClassifierTables::from_toml_file(path)
            .with_context(|| format!("loading classifier tables {}", path.display()))?,
        None => ClassifierTables::embedded().context("loading embedded classifier tables")?,
    };
    Ok(tables)
}

fn render(report: &AnalysisReport, format: OutputFormat, include_requests: bool) -> Result<String> {
    let rendered = match format {
        OutputFormat::Text => text_output::render(report),
        OutputFormat::Json => JsonOutput::from_report(report, include_requests).to_json()?,
        OutputFormat::Csv if include_requests => report
            .requests
            .iter()
            .cloned()
            .collect::<CsvRequestOutput>()
            .to_csv(),
        OutputFormat::Csv => report
            .windows
            .iter()
            .cloned()
            .collect::<CsvWindowOutput>()
            .to_csv(),
    };
    Ok(rendered)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = build_config(&args)?;
    let tables = load_tables(&args)?;

    let entries = input::read_batch(&args.data_path)
        .with_context(|| format!("reading {}", args.data_path.display()))?;
    tracing::debug!(entries = entries.len(), "batch loaded");

    let report = LoadAnalyzer::new(config, tables).analyze(&entries);
    let rendered = render(&report, args.format, args.include_requests)?;

    match &args.output {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("writing report to {}", path.display()))?,
        None => print!("{rendered}"),
    }

    Ok(())
}
