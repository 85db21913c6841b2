pub mod api;
pub mod cli;
pub mod dvh;
pub mod error;
pub mod prescription;
pub mod reconcile;
pub mod types;

pub use api::{
    ConstraintReport, EvaluationReport, EvaluationRunner, ReportSummary, StructureReport,
    StructureStatus, Verdict,
};
pub use cli::report::TextReport;
pub use dvh::{round_tenth, DoseVolumeCurve, DoseVolumeHistogram, DvhLoader, Structure};
pub use error::{DosePoliceError, Result};
pub use prescription::{
    ConstraintRule, DelimitedWorkbook, Prescription, PrescriptionSource, Sheet, TargetDose,
    Threshold, TierResult,
};
pub use reconcile::{
    FixedAnswer, ReconciliationAnswer, ReconciliationPrompt, ReconciliationRequest,
    ReconciliationSummary, StructureReconciler,
};
pub use types::*;
