//! Clinical protocols and their constraint rules
//!
//! A protocol sheet holds two blocks: target doses, then per-structure
//! constraints with an ideal and an optional acceptable tier.

mod constraint;
mod protocol;
mod sheet;
mod workbook;

pub use constraint::{ConstraintRule, Threshold, TierResult};
pub use protocol::{Prescription, TargetDose};
pub use sheet::Sheet;
pub use workbook::{DelimitedWorkbook, PrescriptionSource};
