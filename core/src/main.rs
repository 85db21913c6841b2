use clap::Parser;
use dosepolice_core::cli::prompt::InteractivePrompt;
use dosepolice_core::cli::{Cli, OutputFormat};
use dosepolice_core::{
    DelimitedWorkbook, DoseVolumeHistogram, DvhLoader, EvaluationReport, EvaluationRunner,
    Prescription, PrescriptionSource, ReconciliationSummary, Result, StructureReconciler,
    TextReport,
};
use log::{error, info};
use std::process;

fn main() {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(cli.verbose);

    let workbook = match DelimitedWorkbook::open(&cli.workbook) {
        Ok(workbook) => workbook,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if cli.list_protocols {
        match workbook.protocols() {
            Ok(protocols) => protocols.iter().for_each(|p| println!("{}", p)),
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    let (Some(file), Some(protocol)) = (&cli.file, &cli.protocol) else {
        eprintln!("Error: a DVH file and --protocol are required");
        process::exit(1);
    };

    // Construction errors end the run before any evaluation
    let mut dvh = match DvhLoader::new(cli.loader_config()).load(file) {
        Ok(dvh) => dvh,
        Err(e) => {
            error!("Failed to load DVH: {}", e);
            eprintln!("Error: {}", e);
            if e.is_unit_mismatch() {
                eprintln!("Re-export the DVH in absolute dose, or pass --dose-unit/--volume-unit");
            }
            process::exit(1);
        }
    };

    let mut prescription = match Prescription::load(&workbook, protocol, &cli.window) {
        Ok(prescription) => prescription,
        Err(e) => {
            error!("Failed to load protocol {}: {}", protocol, e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let reconciliation = match reconcile(&cli, &prescription, &mut dvh) {
        Ok(summary) => summary,
        Err(e) => {
            error!("Reconciliation failed: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let runner = EvaluationRunner::new(cli.evaluation_config());
    let report = runner.run(&mut prescription, &dvh, &reconciliation.ignored);
    info!("Evaluation finished for plan {}", report.plan_name);

    output_report(&report, cli.format);
}

fn setup_logging(verbose: bool) {
    if verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }
}

/// Picks the answer source: mapping file, cache in front of the terminal, or terminal
fn reconcile(
    cli: &Cli,
    prescription: &Prescription,
    dvh: &mut DoseVolumeHistogram,
) -> Result<ReconciliationSummary> {
    #[cfg(feature = "json")]
    {
        use dosepolice_core::cli::cache::{CachedPrompt, MappingCache};
        use dosepolice_core::cli::prompt::MappingFilePrompt;

        if let Some(path) = &cli.mapping {
            return StructureReconciler::reconcile(
                prescription,
                dvh,
                &mut MappingFilePrompt::new(path),
            );
        }
        if !cli.no_cache {
            let cache = MappingCache::new(&cli.cache_dir);
            let mut prompt =
                CachedPrompt::new(&cache, dvh.cache_key(), InteractivePrompt::terminal());
            return StructureReconciler::reconcile(prescription, dvh, &mut prompt);
        }
    }
    #[cfg(not(feature = "json"))]
    {
        if cli.mapping.is_some() {
            return Err(dosepolice_core::DosePoliceError::Evaluation(
                "--mapping requires the 'json' feature".to_string(),
            ));
        }
    }

    StructureReconciler::reconcile(prescription, dvh, &mut InteractivePrompt::terminal())
}

fn output_report(report: &EvaluationReport, format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            let text = TextReport::new(report);
            println!("{}", text);
        }
        OutputFormat::Json => {
            #[cfg(feature = "json")]
            {
                match serde_json::to_string_pretty(report) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        error!("Failed to serialize to JSON: {}", e);
                        eprintln!("Error: Failed to serialize to JSON: {}", e);
                        process::exit(1);
                    }
                }
            }
            #[cfg(not(feature = "json"))]
            {
                eprintln!("Error: JSON output requires the 'json' feature");
                eprintln!("Rebuild with: cargo build --features json");
                process::exit(1);
            }
        }
    }
}
