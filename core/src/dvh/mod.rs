//! Dose-volume histogram model and loader
//!
//! A DVH export is parsed into a [`DoseVolumeHistogram`]: an ordered set of
//! [`Structure`]s, each wrapping a monotonic [`DoseVolumeCurve`] that can be
//! queried in both directions.

mod curve;
mod histogram;
mod loader;
mod structure;

pub use curve::{round_tenth, DoseVolumeCurve};
pub use histogram::DoseVolumeHistogram;
pub use loader::DvhLoader;
pub use structure::Structure;
