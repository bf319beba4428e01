use std::env;
use std::path::PathBuf;

use rxsynth_core::DatasetKind;
use rxsynth_generate::{GenerateOptions, GenerationEngine};
use rxsynth_plan::{RunConfig, load_config};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = env::args().skip(1);
    let mut config_path: Option<PathBuf> = None;
    let mut out_dir: Option<PathBuf> = None;
    let mut dataset: Option<DatasetKind> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = args.next().map(PathBuf::from),
            "--out" => out_dir = args.next().map(PathBuf::from),
            _ => {
                if dataset.is_none() {
                    dataset = Some(arg.parse()?);
                } else {
                    return Err("unexpected argument".into());
                }
            }
        }
    }

    let config = match config_path {
        Some(path) => load_config(&path)?,
        None => RunConfig::default(),
    };
    let mut options = GenerateOptions::from_config(&config);
    if let Some(out_dir) = out_dir {
        options.input_dir = out_dir.clone();
        options.output_dir = out_dir;
    }

    let engine = GenerationEngine::new(options, config);
    let results = match dataset {
        Some(kind) => vec![engine.run(kind)?],
        None => engine.run_pipeline(&DatasetKind::ALL)?,
    };

    for result in results {
        println!(
            "{}={} rows in {}",
            result.report.dataset,
            result.report.rows_written,
            result.output_dir.display()
        );
    }
    Ok(())
}
