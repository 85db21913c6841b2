#[cfg(feature = "json")]
pub mod cache;
pub mod prompt;
pub mod report;

use crate::types::{DoseUnit, EvaluationConfig, LoaderConfig, SheetWindow, VolumeUnit};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Command-line arguments for dosepolice
#[derive(Parser, Debug)]
#[command(name = "dosepolice")]
#[command(about = "Check a radiotherapy plan's DVH against a clinical protocol")]
#[command(version)]
pub struct Cli {
    /// Path to the DVH text export
    #[arg(value_name = "FILE", required_unless_present = "list_protocols")]
    pub file: Option<PathBuf>,

    /// Directory holding one `<PROTOCOL>.tsv` sheet per protocol
    #[arg(short, long, value_name = "DIR")]
    pub workbook: PathBuf,

    /// Protocol to evaluate against
    #[arg(short, long, required_unless_present = "list_protocols")]
    pub protocol: Option<String>,

    /// List the protocols found in the workbook and exit
    #[arg(long)]
    pub list_protocols: bool,

    /// Cell window holding the protocol blocks
    #[arg(long, default_value = "A4:G45", value_parser = SheetWindow::parse)]
    pub window: SheetWindow,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Volume unit of the DVH export
    #[arg(long, default_value = "cc")]
    pub volume_unit: VolumeUnitArg,

    /// Dose unit of the DVH export
    #[arg(long, default_value = "cgy")]
    pub dose_unit: DoseUnitArg,

    /// Prescription structure to skip (repeatable)
    #[arg(long = "ignore", value_name = "LABEL")]
    pub ignore: Vec<String>,

    /// JSON file with the label/volume mapping; disables interactive prompting
    #[arg(short, long, value_name = "FILE")]
    pub mapping: Option<PathBuf>,

    /// Directory for cached reconciliation answers
    #[arg(long, value_name = "DIR", default_value = ".dosepolice")]
    pub cache_dir: PathBuf,

    /// Neither read nor write cached reconciliation answers
    #[arg(long)]
    pub no_cache: bool,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig::default()
            .with_volume_unit(self.volume_unit.clone().into())
            .with_dose_unit(self.dose_unit.clone().into())
    }

    pub fn evaluation_config(&self) -> EvaluationConfig {
        self.ignore
            .iter()
            .fold(EvaluationConfig::default(), |config, label| config.ignore(label))
    }
}

/// Output format options
#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    Text,
    /// JSON format
    Json,
}

/// Volume unit of the cumulative volume column
#[derive(Debug, Clone, ValueEnum)]
pub enum VolumeUnitArg {
    /// Absolute volume in cc
    Cc,
    /// Percent of the structure volume
    Percent,
}

impl From<VolumeUnitArg> for VolumeUnit {
    fn from(arg: VolumeUnitArg) -> Self {
        match arg {
            VolumeUnitArg::Cc => VolumeUnit::Absolute,
            VolumeUnitArg::Percent => VolumeUnit::Percent,
        }
    }
}

/// Dose unit of the dose column
#[derive(Debug, Clone, ValueEnum)]
pub enum DoseUnitArg {
    /// Centigray
    Cgy,
    /// Gray (converted to cGy on load)
    Gy,
    /// Percent of the prescription dose (rejected)
    Relative,
}

impl From<DoseUnitArg> for DoseUnit {
    fn from(arg: DoseUnitArg) -> Self {
        match arg {
            DoseUnitArg::Cgy => DoseUnit::CentiGray,
            DoseUnitArg::Gy => DoseUnit::Gray,
            DoseUnitArg::Relative => DoseUnit::Relative,
        }
    }
}
