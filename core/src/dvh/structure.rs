use crate::dvh::curve::DoseVolumeCurve;
use crate::error::{DosePoliceError, Result};
use crate::types::{StructureLabel, VolumeUnit};

/// One anatomical structure of a DVH export
///
/// Wraps a [`DoseVolumeCurve`] with the structure's identity and its
/// absolute volume. The label and volume are only changed by
/// reconciliation; the curve is fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    label: StructureLabel,
    absolute_volume: Option<f64>,
    curve: DoseVolumeCurve,
    mean_dose: Option<f64>,
}

impl Structure {
    /// Creates a structure from its curve
    ///
    /// Absolute curves carry their own total volume (the first point of
    /// the cumulative axis). Percent curves start with an unknown volume.
    pub fn new(label: StructureLabel, curve: DoseVolumeCurve) -> Self {
        let absolute_volume = match curve.unit() {
            VolumeUnit::Absolute if curve.total_volume() > 0.0 => Some(curve.total_volume()),
            _ => None,
        };
        let mean_dose = Self::mean_calculation(&curve);

        Self {
            label,
            absolute_volume,
            curve,
            mean_dose,
        }
    }

    /// Dose-weighted average over the differential volume
    fn mean_calculation(curve: &DoseVolumeCurve) -> Option<f64> {
        let total = curve.total_volume();
        if total <= 0.0 {
            return None;
        }
        let weighted: f64 = curve
            .dose_axis()
            .iter()
            .zip(curve.differential_volume_axis())
            .map(|(d, v)| d * v)
            .sum();
        Some(weighted / total)
    }

    pub fn label(&self) -> &StructureLabel {
        &self.label
    }

    pub fn curve(&self) -> &DoseVolumeCurve {
        &self.curve
    }

    /// Absolute volume in cc, if known
    pub fn absolute_volume(&self) -> Option<f64> {
        self.absolute_volume
    }

    /// Whether a positive absolute volume is available
    pub fn has_volume(&self) -> bool {
        self.absolute_volume.map(|v| v > 0.0).unwrap_or(false)
    }

    /// Mean dose in cGy, or `None` when the structure has no volume
    pub fn mean_dose(&self) -> Option<f64> {
        self.mean_dose
    }

    /// Sets the absolute volume (cc)
    pub fn update_volume(&mut self, volume: f64) {
        self.absolute_volume = Some(volume);
    }

    /// Changes the structure's label
    pub fn rename(&mut self, label: StructureLabel) {
        self.label = label;
    }

    /// Absolute volume, required for a unit conversion
    ///
    /// # Errors
    ///
    /// Returns [`DosePoliceError::UnitMismatch`] if the volume is unknown
    /// or not positive.
    pub fn require_volume(&self) -> Result<f64> {
        match self.absolute_volume {
            Some(v) if v > 0.0 => Ok(v),
            _ => Err(DosePoliceError::UnitMismatch(format!(
                "{} has no absolute volume; a volume in cc is needed to convert between % and cc",
                self.label
            ))),
        }
    }

    /// Converts a volume from the curve's unit to `unit`
    pub fn volume_from_curve_unit(&self, volume: f64, unit: VolumeUnit) -> Result<f64> {
        match (self.curve.unit(), unit) {
            (VolumeUnit::Absolute, VolumeUnit::Percent) => {
                Ok(volume / self.require_volume()? * 100.0)
            }
            (VolumeUnit::Percent, VolumeUnit::Absolute) => {
                Ok(volume * self.require_volume()? / 100.0)
            }
            _ => Ok(volume),
        }
    }

    /// Converts a volume given in `unit` to the curve's unit
    pub fn volume_to_curve_unit(&self, volume: f64, unit: VolumeUnit) -> Result<f64> {
        match (unit, self.curve.unit()) {
            (VolumeUnit::Absolute, VolumeUnit::Percent) => {
                Ok(volume * 100.0 / self.require_volume()?)
            }
            (VolumeUnit::Percent, VolumeUnit::Absolute) => {
                Ok(volume / 100.0 * self.require_volume()?)
            }
            _ => Ok(volume),
        }
    }

    /// Volume receiving at least `dose`, in the curve's unit
    pub fn volume_at(&self, dose: f64) -> f64 {
        self.curve.volume_at(dose)
    }

    /// Dose received by `volume`, given in the curve's unit
    pub fn dose_at(&self, volume: f64) -> f64 {
        self.curve.dose_at(volume)
    }
}
