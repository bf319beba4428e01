mod registry;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use rxsynth_core::DatasetKind;
use rxsynth_generate::{GenerateOptions, GenerationEngine, GenerationError, GenerationResult};
use rxsynth_plan::{
    PlanError, RunConfig, ValidationIssue, ValidationReport, config_json_schema,
    config_value_from_toml, render_config, validate_config, validate_semantics,
};
use registry::{RunRecord, init_logging, record_run, summarize};
use thiserror::Error;
use uuid::Uuid;

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("configuration error: {0}")]
    Plan(#[from] PlanError),
    #[error("generation error: {0}")]
    Generate(#[from] GenerationError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Parser, Debug)]
#[command(name = "rxsynth", version, about = "Synthetic pharmacy benefit dataset generator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate one dataset from reference files in the input directory.
    Generate(GenerateArgs),
    /// Generate every dataset in dependency order into one directory.
    Pipeline(RunArgs),
    /// Inspect or validate run configurations.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the default configuration as TOML.
    Default,
    /// Print the configuration JSON Schema.
    Schema,
    /// Validate a TOML configuration file.
    Validate {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Dataset to produce (e.g. drugs, formulary-drugs, claim-lines).
    #[arg(value_name = "DATASET")]
    dataset: DatasetKind,
    #[command(flatten)]
    run: RunArgs,
}

#[derive(Args, Debug, Clone, Default)]
struct RunArgs {
    /// TOML run configuration; defaults apply when omitted.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Run seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Directory holding upstream reference files.
    #[arg(long, value_name = "DIR")]
    input_dir: Option<PathBuf>,
    /// Directory receiving shards and reports.
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
    /// Record target for every dataset of the run.
    #[arg(long, value_name = "N")]
    target: Option<u64>,
    /// Shard size budget in MiB.
    #[arg(long, value_name = "N")]
    shard_mb: Option<u64>,
    /// Append JSON log events to this file.
    #[arg(long, value_name = "PATH")]
    log_json: Option<PathBuf>,
    /// Record run metadata under this directory.
    #[arg(long, value_name = "DIR")]
    run_dir: Option<PathBuf>,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Generate(args) => run_generate(Some(args.dataset), args.run),
        Command::Pipeline(args) => run_generate(None, args),
        Command::Config { command } => run_config(command),
    }
}

fn run_generate(dataset: Option<DatasetKind>, args: RunArgs) -> Result<(), CliError> {
    init_logging(args.log_json.as_deref())?;

    let mut config = resolve_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args)?;
    let mut options = GenerateOptions::from_config(&config);
    options.record_target = args.target;

    let command = match dataset {
        Some(kind) => format!("generate {kind}"),
        None => "pipeline".to_string(),
    };
    let run_id = Uuid::new_v4().to_string();
    let started_at = chrono::Utc::now();
    let timer = Instant::now();
    tracing::info!(event = "run_started", run_id = %run_id, command = %command, seed = options.seed);

    let engine = GenerationEngine::new(options, config);
    let results: Vec<GenerationResult> = match dataset {
        Some(kind) => vec![engine.run(kind)?],
        None => engine.run_pipeline(&DatasetKind::ALL)?,
    };

    for result in &results {
        let report = &result.report;
        println!(
            "{}: {} rows in {} shard(s), {} bytes -> {}",
            report.dataset,
            report.rows_written,
            report.shards.len(),
            report.bytes_written(),
            result.output_dir.display()
        );
    }

    if let Some(run_dir) = &args.run_dir {
        let record = RunRecord {
            run_id: run_id.clone(),
            command,
            started_at,
            finished_at: chrono::Utc::now(),
            seed: engine.options().seed,
            config_fingerprint: engine.config_fingerprint()?,
            datasets: summarize(&results),
        };
        let path = record_run(run_dir, &record, engine.config())?;
        tracing::info!(event = "run_recorded", path = %path.display());
    }

    let duration_ms = timer.elapsed().as_millis() as u64;
    tracing::info!(event = "run_finished", run_id = %run_id, status = "success", duration_ms);
    Ok(())
}

fn run_config(command: ConfigCommand) -> Result<(), CliError> {
    match command {
        ConfigCommand::Default => {
            print!("{}", render_config(&RunConfig::default())?);
        }
        ConfigCommand::Schema => {
            println!("{}", serde_json::to_string_pretty(&config_json_schema())?);
        }
        ConfigCommand::Validate { path } => {
            let text = std::fs::read_to_string(&path)?;
            let value = config_value_from_toml(&text)?;
            match validate_config(&value) {
                Ok(validated) => {
                    print_issues(&validated.warnings);
                    println!("{}: ok ({} warning(s))", path.display(), validated.warnings.len());
                }
                Err(report) => {
                    print_report(&report);
                    return Err(CliError::InvalidConfig(format!(
                        "{}: {} error(s)",
                        path.display(),
                        report.errors.len()
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Load and fully validate a configuration, or validate the defaults.
fn resolve_config(path: Option<&Path>) -> Result<RunConfig, CliError> {
    let Some(path) = path else {
        let report = validate_semantics(&RunConfig::default());
        return accept(report).map(|_| RunConfig::default());
    };

    let text = std::fs::read_to_string(path)?;
    let value = config_value_from_toml(&text)?;
    match validate_config(&value) {
        Ok(validated) => {
            for issue in &validated.warnings {
                tracing::warn!(code = %issue.code, path = %issue.path, "{}", issue.message);
            }
            Ok(validated.config)
        }
        Err(report) => {
            print_report(&report);
            Err(CliError::InvalidConfig(format!(
                "{}: {} error(s)",
                path.display(),
                report.errors.len()
            )))
        }
    }
}

fn accept(report: ValidationReport) -> Result<(), CliError> {
    for issue in &report.warnings {
        tracing::warn!(code = %issue.code, path = %issue.path, "{}", issue.message);
    }
    if report.is_ok() {
        return Ok(());
    }
    print_report(&report);
    Err(CliError::InvalidConfig(format!(
        "{} error(s) in configuration",
        report.errors.len()
    )))
}

/// Fold command-line overrides into the run settings.
fn apply_overrides(config: &mut RunConfig, args: &RunArgs) -> Result<(), CliError> {
    if let Some(seed) = args.seed {
        config.run.seed = seed;
    }
    if let Some(dir) = &args.input_dir {
        config.run.input_dir = dir.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.run.output_dir = dir.clone();
    }
    if let Some(mb) = args.shard_mb {
        if mb == 0 {
            return Err(CliError::InvalidConfig(
                "--shard-mb must be positive".to_string(),
            ));
        }
        config.run.shard_budget_bytes = mb.saturating_mul(MIB);
    }
    Ok(())
}

fn print_report(report: &ValidationReport) {
    print_issues(&report.errors);
    print_issues(&report.warnings);
}

fn print_issues(issues: &[ValidationIssue]) {
    for issue in issues {
        let severity = match issue.severity {
            rxsynth_plan::IssueSeverity::Error => "error",
            rxsynth_plan::IssueSeverity::Warning => "warning",
        };
        eprintln!("{severity}[{}] {}: {}", issue.code, issue.path, issue.message);
        if let Some(hint) = &issue.hint {
            eprintln!("  hint: {hint}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_run_settings() {
        let mut config = RunConfig::default();
        let args = RunArgs {
            seed: Some(7),
            output_dir: Some(PathBuf::from("out")),
            shard_mb: Some(2),
            ..RunArgs::default()
        };
        apply_overrides(&mut config, &args).expect("overrides");
        assert_eq!(config.run.seed, 7);
        assert_eq!(config.run.output_dir, PathBuf::from("out"));
        assert_eq!(config.run.shard_budget_bytes, 2 * MIB);
        assert_eq!(config.run.input_dir, RunConfig::default().run.input_dir);
    }

    #[test]
    fn zero_shard_size_is_rejected() {
        let mut config = RunConfig::default();
        let args = RunArgs {
            shard_mb: Some(0),
            ..RunArgs::default()
        };
        assert!(apply_overrides(&mut config, &args).is_err());
    }

    #[test]
    fn cli_parses_dataset_names() {
        let cli = Cli::try_parse_from(["rxsynth", "generate", "formulary-drugs", "--seed", "3"])
            .expect("parse");
        match cli.command {
            Command::Generate(args) => {
                assert_eq!(args.dataset, DatasetKind::FormularyDrugs);
                assert_eq!(args.run.seed, Some(3));
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(Cli::try_parse_from(["rxsynth", "generate", "plans"]).is_err());
    }
}
