use crate::types::{DoseUnit, StructureLabel, VolumeUnit};
use std::collections::{HashMap, HashSet};

/// Structure labels that are never evaluated (couch, foam, markers, body contour)
pub const DEFAULT_EXCLUDED_LABELS: [&str; 7] = [
    "CAMILLA",
    "ESPUMA",
    "ISOCTSIM",
    "ISOAUTOCONTOUR",
    "ENCASTRE",
    "BODY",
    "EXTERNAL",
];

/// Near-maximum reference volume used by `Dmax`, in cc
pub const DEFAULT_NEAR_MAX_VOLUME_CC: f64 = 0.03;

/// Configuration for loading DVH text exports
///
/// # Example
///
/// ```
/// use dosepolice_core::{LoaderConfig, VolumeUnit};
///
/// let config = LoaderConfig::default()
///     .with_volume_unit(VolumeUnit::Percent)
///     .exclude_label("ring");
///
/// assert_eq!(config.volume_unit, VolumeUnit::Percent);
/// assert!(config.is_excluded("RING"));
/// assert!(config.is_excluded("Camilla"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderConfig {
    /// Unit of the cumulative volume column
    pub volume_unit: VolumeUnit,

    /// Unit of the dose column
    pub dose_unit: DoseUnit,

    /// Labels dropped before structure construction
    pub excluded_labels: HashSet<StructureLabel>,

    /// Renames applied at load time (raw label -> canonical label)
    pub label_aliases: HashMap<StructureLabel, StructureLabel>,

    /// Lines preceding the tabular body
    pub header_lines: usize,

    /// Lines following the tabular body
    pub trailer_lines: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        let mut label_aliases = HashMap::new();
        label_aliases.insert(
            StructureLabel::new("Paciente(Unsp.Tiss.)"),
            StructureLabel::new("PACIENTE"),
        );

        Self {
            volume_unit: VolumeUnit::Absolute,
            dose_unit: DoseUnit::CentiGray,
            excluded_labels: DEFAULT_EXCLUDED_LABELS
                .iter()
                .map(|s| StructureLabel::new(s))
                .collect(),
            label_aliases,
            header_lines: 3,
            trailer_lines: 3,
        }
    }
}

impl LoaderConfig {
    /// Builder: Set the volume unit of the export
    pub fn with_volume_unit(mut self, unit: VolumeUnit) -> Self {
        self.volume_unit = unit;
        self
    }

    /// Builder: Set the dose unit of the export
    ///
    /// # Example
    ///
    /// ```
    /// use dosepolice_core::{DoseUnit, LoaderConfig};
    ///
    /// let config = LoaderConfig::default().with_dose_unit(DoseUnit::Gray);
    /// assert_eq!(config.dose_unit, DoseUnit::Gray);
    /// ```
    pub fn with_dose_unit(mut self, unit: DoseUnit) -> Self {
        self.dose_unit = unit;
        self
    }

    /// Builder: Add a label to the denylist
    pub fn exclude_label(mut self, label: &str) -> Self {
        self.excluded_labels.insert(StructureLabel::new(label));
        self
    }

    /// Builder: Add a load-time alias
    pub fn with_alias(mut self, raw: &str, canonical: &str) -> Self {
        self.label_aliases
            .insert(StructureLabel::new(raw), StructureLabel::new(canonical));
        self
    }

    /// Checks whether a raw label is on the denylist
    pub fn is_excluded(&self, raw: &str) -> bool {
        self.excluded_labels.contains(&StructureLabel::new(raw))
    }

    /// Resolves a raw label to its canonical form, applying aliases
    pub fn canonical_label(&self, raw: &str) -> StructureLabel {
        let label = StructureLabel::new(raw);
        self.label_aliases.get(&label).cloned().unwrap_or(label)
    }
}

/// Configuration for constraint evaluation
///
/// # Example
///
/// ```
/// use dosepolice_core::EvaluationConfig;
///
/// let config = EvaluationConfig::default().ignore("ptv_boost_total");
/// assert!(config.is_ignored(&"PTV_BOOST_TOTAL".into()));
/// assert_eq!(config.near_max_volume_cc, 0.03);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationConfig {
    /// Absolute volume at which `Dmax` is read
    pub near_max_volume_cc: f64,

    /// Prescription labels skipped by the runner
    pub ignored: HashSet<StructureLabel>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            near_max_volume_cc: DEFAULT_NEAR_MAX_VOLUME_CC,
            ignored: HashSet::new(),
        }
    }
}

impl EvaluationConfig {
    /// Builder: Skip a prescription structure
    pub fn ignore(mut self, label: &str) -> Self {
        self.ignored.insert(StructureLabel::new(label));
        self
    }

    /// Builder: Override the near-maximum reference volume
    pub fn with_near_max_volume(mut self, volume_cc: f64) -> Self {
        self.near_max_volume_cc = volume_cc;
        self
    }

    pub fn is_ignored(&self, label: &StructureLabel) -> bool {
        self.ignored.contains(label)
    }
}
