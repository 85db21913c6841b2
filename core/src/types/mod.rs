//! Core type definitions for dose-volume evaluation
//!
//! This module provides the fundamental types used throughout the dosepolice library:
//! - [`StructureLabel`]: Canonical, case-normalized structure name
//! - [`VolumeUnit`] / [`DoseUnit`]: Units a DVH export can declare
//! - [`ConstraintKind`]: The eight prescription constraint shapes
//! - [`Outcome`]: Tier reached by a verified constraint
//! - [`LoaderConfig`] / [`EvaluationConfig`]: Explicit run configuration
//! - [`CellRef`] / [`SheetWindow`]: Addressing inside a protocol sheet

mod cell;
mod config;
mod enums;
mod label;

pub use cell::{CellRef, SheetWindow};
pub use config::{
    EvaluationConfig, LoaderConfig, DEFAULT_EXCLUDED_LABELS, DEFAULT_NEAR_MAX_VOLUME_CC,
};
pub use enums::{ConstraintFamily, ConstraintKind, DoseUnit, Outcome, VolumeUnit};
pub use label::StructureLabel;
