use crate::dvh::{round_tenth, Structure};
use crate::error::{DosePoliceError, Result};
use crate::types::{
    ConstraintFamily, ConstraintKind, Outcome, StructureLabel, VolumeUnit,
    DEFAULT_NEAR_MAX_VOLUME_CC,
};
use log::debug;

/// Dose/volume pair of one constraint tier
///
/// Doses are in cGy. The volume unit is implied by the constraint kind.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct Threshold {
    pub dose: Option<f64>,
    pub volume: Option<f64>,
}

impl Threshold {
    pub fn new(dose: Option<f64>, volume: Option<f64>) -> Self {
        Self { dose, volume }
    }

    /// Threshold with a dose only (`Dmax`, `Dmedia`)
    pub fn dose(dose: f64) -> Self {
        Self::new(Some(dose), None)
    }

    /// Threshold with both a dose and a volume
    pub fn dose_volume(dose: f64, volume: f64) -> Self {
        Self::new(Some(dose), Some(volume))
    }
}

/// Result of evaluating one tier: pass flag and measured value
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct TierResult {
    pub pass: bool,
    /// Measured dose (cGy) or volume, rounded to one decimal
    pub measured: f64,
}

/// One dose/volume requirement on a structure
///
/// The ideal tier is always evaluated. The acceptable tier, when present,
/// is evaluated only if the ideal tier fails.
///
/// # Example
///
/// ```
/// use dosepolice_core::{
///     ConstraintKind, ConstraintRule, DoseVolumeCurve, Outcome, Structure, Threshold,
///     VolumeUnit,
/// };
///
/// let curve = DoseVolumeCurve::new(
///     vec![0.0, 6000.0, 7000.0],
///     vec![100.0, 30.0, 0.0],
///     VolumeUnit::Percent,
/// )
/// .unwrap();
/// let rectum = Structure::new("RECTUM".into(), curve);
///
/// let mut rule = ConstraintRule::new(
///     "RECTUM".into(),
///     ConstraintKind::VolumeBelowDosePercent,
///     Threshold::dose_volume(6000.0, 35.0),
///     None,
/// );
///
/// assert_eq!(rule.verify(&rectum).unwrap(), Outcome::IdealPass);
/// assert_eq!(rule.ideal_result().unwrap().measured, 30.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintRule {
    pub structure_label: StructureLabel,
    pub kind: ConstraintKind,
    pub ideal: Threshold,
    pub acceptable: Option<Threshold>,
    ideal_result: Option<TierResult>,
    acceptable_result: Option<TierResult>,
}

impl ConstraintRule {
    /// Creates an unverified rule
    pub fn new(
        structure_label: StructureLabel,
        kind: ConstraintKind,
        ideal: Threshold,
        acceptable: Option<Threshold>,
    ) -> Self {
        Self {
            structure_label,
            kind,
            ideal,
            acceptable,
            ideal_result: None,
            acceptable_result: None,
        }
    }

    pub fn ideal_dose(&self) -> Option<f64> {
        self.ideal.dose
    }

    pub fn ideal_volume(&self) -> Option<f64> {
        self.ideal.volume
    }

    pub fn acceptable_dose(&self) -> Option<f64> {
        self.acceptable.and_then(|t| t.dose)
    }

    pub fn acceptable_volume(&self) -> Option<f64> {
        self.acceptable.and_then(|t| t.volume)
    }

    /// Whether the rule has a second, acceptable tier
    pub fn has_acceptable_tier(&self) -> bool {
        self.acceptable.is_some()
    }

    pub fn ideal_result(&self) -> Option<TierResult> {
        self.ideal_result
    }

    pub fn acceptable_result(&self) -> Option<TierResult> {
        self.acceptable_result
    }

    /// Tier reached by the last verification, `None` if never verified
    pub fn outcome(&self) -> Option<Outcome> {
        let ideal = self.ideal_result?;
        if ideal.pass {
            return Some(Outcome::IdealPass);
        }
        match self.acceptable_result {
            Some(acceptable) if acceptable.pass => Some(Outcome::AcceptablePass),
            _ => Some(Outcome::Fail),
        }
    }

    /// Value measured for the tier reached
    ///
    /// The acceptable measurement when that tier was evaluated, otherwise
    /// the ideal one.
    pub fn measured(&self) -> Option<f64> {
        self.acceptable_result
            .or(self.ideal_result)
            .map(|r| r.measured)
    }

    /// Verifies the rule against a structure with the default `Dmax` volume
    pub fn verify(&mut self, structure: &Structure) -> Result<Outcome> {
        self.verify_with(structure, DEFAULT_NEAR_MAX_VOLUME_CC)
    }

    /// Verifies the rule against a structure
    ///
    /// Previous results are cleared first. On error the tiers that could
    /// not be evaluated stay unset.
    ///
    /// # Errors
    ///
    /// - [`DosePoliceError::UnknownConstraintKind`] for unrecognized kinds
    /// - [`DosePoliceError::MissingThreshold`] if a needed value is blank
    /// - [`DosePoliceError::UnitMismatch`] if a % <-> cc conversion needs an
    ///   absolute volume the structure does not have
    /// - [`DosePoliceError::UndefinedMeanDose`] for `Dmedia` on an empty structure
    pub fn verify_with(&mut self, structure: &Structure, near_max_volume_cc: f64) -> Result<Outcome> {
        self.ideal_result = None;
        self.acceptable_result = None;

        let ideal = self.evaluate(structure, &self.ideal, "ideal", near_max_volume_cc)?;
        self.ideal_result = Some(ideal);

        if !ideal.pass {
            if let Some(acceptable) = self.acceptable {
                self.acceptable_result = Some(self.evaluate(
                    structure,
                    &acceptable,
                    "acceptable",
                    near_max_volume_cc,
                )?);
            }
        }

        let outcome = self
            .outcome()
            .ok_or_else(|| DosePoliceError::Evaluation("ideal tier not evaluated".to_string()))?;
        debug!(
            "{} {}: {} (measured {:?})",
            self.structure_label,
            self.kind,
            outcome,
            self.measured()
        );
        Ok(outcome)
    }

    fn evaluate(
        &self,
        structure: &Structure,
        threshold: &Threshold,
        tier: &str,
        near_max_volume_cc: f64,
    ) -> Result<TierResult> {
        let family = self
            .kind
            .family()
            .ok_or_else(|| DosePoliceError::UnknownConstraintKind(self.kind.to_string()))?;

        let dose = self.required(threshold.dose, tier, "dose")?;

        match family {
            ConstraintFamily::VolumeAtDose { at_least, unit } => {
                let reference = self.required(threshold.volume, tier, "volume")?;
                let measured = round_tenth(
                    structure.volume_from_curve_unit(structure.volume_at(dose), unit)?,
                );
                let pass = if at_least {
                    measured >= reference
                } else {
                    measured <= reference
                };
                Ok(TierResult { pass, measured })
            }
            ConstraintFamily::DoseAtVolume { unit } => {
                let reference = self.required(threshold.volume, tier, "volume")?;
                let volume = structure.volume_to_curve_unit(reference, unit)?;
                let measured = structure.dose_at(volume);
                Ok(TierResult {
                    pass: measured <= dose,
                    measured,
                })
            }
            ConstraintFamily::MaxDose => {
                let volume =
                    structure.volume_to_curve_unit(near_max_volume_cc, VolumeUnit::Absolute)?;
                let measured = structure.dose_at(volume);
                Ok(TierResult {
                    pass: measured <= dose,
                    measured,
                })
            }
            ConstraintFamily::MeanDose => {
                let mean = structure.mean_dose().ok_or_else(|| {
                    DosePoliceError::UndefinedMeanDose(format!(
                        "{} has no volume to average over",
                        structure.label()
                    ))
                })?;
                let measured = round_tenth(mean);
                Ok(TierResult {
                    pass: measured <= dose,
                    measured,
                })
            }
        }
    }

    fn required(&self, value: Option<f64>, tier: &str, what: &str) -> Result<f64> {
        value.ok_or_else(|| {
            DosePoliceError::MissingThreshold(format!(
                "{} {}: {} {} is blank",
                self.structure_label, self.kind, tier, what
            ))
        })
    }
}
