use clap::{Parser, ValueEnum};
use dosepolice_core::cli::{DoseUnitArg, VolumeUnitArg};
use dosepolice_core::{
    round_tenth, DoseVolumeHistogram, DvhLoader, LoaderConfig, Structure, VolumeUnit,
    DEFAULT_NEAR_MAX_VOLUME_CC,
};
use log::error;
use std::fmt;
use std::path::PathBuf;
use std::process;

/// CLI tool for summarizing a DVH export
#[derive(Parser, Debug)]
#[command(name = "dvhsummary")]
#[command(about = "Print patient, plan and per-structure dose summary of a DVH export")]
#[command(version)]
struct Cli {
    /// Path to the DVH text export
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Volume unit of the DVH export
    #[arg(long, default_value = "cc")]
    volume_unit: VolumeUnitArg,

    /// Dose unit of the DVH export
    #[arg(long, default_value = "cgy")]
    dose_unit: DoseUnitArg,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable text format
    Text,
    /// JSON format
    Json,
}

/// Dose summary of one structure
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
struct StructureSummary {
    label: String,
    /// Absolute volume in cc, if known
    volume: Option<f64>,
    /// Mean dose in cGy
    mean_dose: Option<f64>,
    /// Dose at the near-maximum volume, in cGy
    max_dose: Option<f64>,
}

impl StructureSummary {
    fn from_structure(structure: &Structure) -> Self {
        let max_dose = structure
            .volume_to_curve_unit(DEFAULT_NEAR_MAX_VOLUME_CC, VolumeUnit::Absolute)
            .ok()
            .map(|volume| structure.dose_at(volume));

        Self {
            label: structure.label().to_string(),
            volume: structure.absolute_volume().map(round_tenth),
            mean_dose: structure.mean_dose().map(round_tenth),
            max_dose,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
struct DvhSummary {
    patient_id: String,
    plan_name: String,
    timestamp: String,
    structures: Vec<StructureSummary>,
}

impl DvhSummary {
    fn new(dvh: &DoseVolumeHistogram) -> Self {
        Self {
            patient_id: dvh.patient_id.clone(),
            plan_name: dvh.plan_name.clone(),
            timestamp: dvh.timestamp.clone(),
            structures: dvh
                .structures()
                .iter()
                .map(StructureSummary::from_structure)
                .collect(),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(cli.verbose);

    let config = LoaderConfig::default()
        .with_volume_unit(cli.volume_unit.clone().into())
        .with_dose_unit(cli.dose_unit.clone().into());

    let dvh = match DvhLoader::new(config).load(&cli.file) {
        Ok(dvh) => dvh,
        Err(e) => {
            error!("Failed to load DVH: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let summary = DvhSummary::new(&dvh);

    match cli.format {
        OutputFormat::Text => println!("{}", TextReport::new(&summary)),
        OutputFormat::Json => {
            #[cfg(feature = "json")]
            {
                match serde_json::to_string_pretty(&summary) {
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

/// Text report for a DVH summary
struct TextReport<'a> {
    summary: &'a DvhSummary,
}

impl<'a> TextReport<'a> {
    fn new(summary: &'a DvhSummary) -> Self {
        Self { summary }
    }
}

fn cell(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.1}", v))
        .unwrap_or_else(|| "-".to_string())
}

impl<'a> fmt::Display for TextReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DVH Summary")?;
        writeln!(f, "===========")?;
        writeln!(f)?;
        writeln!(f, "Patient:   {}", self.summary.patient_id)?;
        writeln!(f, "Plan:      {}", self.summary.plan_name)?;
        writeln!(f, "Exported:  {}", self.summary.timestamp)?;
        writeln!(f)?;
        writeln!(
            f,
            "{:<24} {:>12} {:>14} {:>14}",
            "Structure", "Volume[cc]", "Mean[cGy]", "Max[cGy]"
        )?;
        for s in &self.summary.structures {
            writeln!(
                f,
                "{:<24} {:>12} {:>14} {:>14}",
                s.label,
                cell(s.volume),
                cell(s.mean_dose),
                cell(s.max_dose)
            )?;
        }
        Ok(())
    }
}
