//! Structure name and volume reconciliation
//!
//! Prescriptions and DVH exports are written by different people and
//! rarely agree on structure names. Before evaluation the
//! [`StructureReconciler`] asks a [`ReconciliationPrompt`] which DVH
//! structure each prescription label refers to, and for the absolute
//! volumes that percent-only curves cannot provide.

mod reconciler;
mod request;

pub use reconciler::{ReconciliationSummary, StructureReconciler};
pub use request::{FixedAnswer, ReconciliationAnswer, ReconciliationPrompt, ReconciliationRequest};
