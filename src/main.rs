use anyhow::{Context, Result, bail};
use case_control::utils::logging::log_report;
use case_control::{MatchingSettings, Matcher, RecordBatchSink, load_population, write_csv};
use log::info;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

fn main() -> Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    let (Some(settings_path), Some(population_path)) = (args.next(), args.next()) else {
        bail!("usage: case-control <settings.json> <population.json> [output.csv]");
    };
    let output_path = args.next();

    let settings = MatchingSettings::from_path(&settings_path)
        .with_context(|| format!("Failed to read settings: {}", settings_path.display()))?;
    let config = settings
        .to_config()
        .with_context(|| format!("Invalid settings in {}", settings_path.display()))?;
    let exclusion = settings.exclusion_criteria()?;
    let covariates = settings.covariates()?;

    let patients = load_population(&population_path)
        .with_context(|| format!("Failed to load population: {}", population_path.display()))?;

    let matcher = Matcher::new(config, &exclusion, &covariates).with_progress(true);
    let mut sink = RecordBatchSink::new(
        matcher.rule_labels(),
        matcher.exclusion_labels(),
        matcher.covariate_labels(),
    );
    let result = matcher.perform_matching(&patients, &mut sink)?;
    log_report("Attrition:", &result.attrition);

    let batch = sink.to_record_batch()?;
    match &output_path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            write_csv(&batch, BufWriter::new(file))?;
            info!("Wrote {} records to {}", batch.num_rows(), path.display());
        }
        None => write_csv(&batch, io::stdout().lock())?,
    }

    Ok(())
}
