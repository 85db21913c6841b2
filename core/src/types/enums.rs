use std::fmt;

/// Unit of a cumulative volume axis or of a reference volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "lowercase"))]
pub enum VolumeUnit {
    /// Absolute volume in cc (cm3)
    #[default]
    Absolute,
    /// Percent of the structure's total volume
    Percent,
}

impl VolumeUnit {
    /// Returns simple name for display
    pub fn simple_name(&self) -> &'static str {
        match self {
            VolumeUnit::Absolute => "cc",
            VolumeUnit::Percent => "%",
        }
    }
}

impl fmt::Display for VolumeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

/// Dose unit declared by a DVH export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "lowercase"))]
pub enum DoseUnit {
    /// Absolute dose in cGy (the unit constraints are written in)
    #[default]
    CentiGray,
    /// Absolute dose in Gy
    Gray,
    /// Percent of the prescribed dose
    Relative,
}

impl DoseUnit {
    /// Returns simple name for display
    pub fn simple_name(&self) -> &'static str {
        match self {
            DoseUnit::CentiGray => "cGy",
            DoseUnit::Gray => "Gy",
            DoseUnit::Relative => "%",
        }
    }

    /// Factor converting a value in this unit to cGy
    ///
    /// Relative doses have no absolute conversion.
    pub fn to_centigray(&self) -> Option<f64> {
        match self {
            DoseUnit::CentiGray => Some(1.0),
            DoseUnit::Gray => Some(100.0),
            DoseUnit::Relative => None,
        }
    }
}

impl fmt::Display for DoseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

/// Evaluation family a constraint kind belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintFamily {
    /// Volume receiving at least a dose, compared against a volume
    VolumeAtDose {
        /// `true` for `V(D)>V` kinds, `false` for `V(D)<V` kinds
        at_least: bool,
        unit: VolumeUnit,
    },
    /// Dose received by a volume, compared against a dose
    DoseAtVolume { unit: VolumeUnit },
    /// Near-maximum dose at a small fixed absolute volume
    MaxDose,
    /// Structure mean dose
    MeanDose,
}

/// Constraint kind as written in the prescription sheet
///
/// Eight kinds are recognized. Anything else is carried as
/// [`ConstraintKind::Unrecognized`] so that evaluation can report it
/// instead of failing the whole protocol load.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(from = "String", into = "String"))]
pub enum ConstraintKind {
    /// `V(D)>V_%`
    VolumeAboveDosePercent,
    /// `V(D)>V_cc`
    VolumeAboveDoseCc,
    /// `V(D)<V_%`
    VolumeBelowDosePercent,
    /// `V(D)<V_cc`
    VolumeBelowDoseCc,
    /// `D(V_%)<D`
    DoseAtVolumePercent,
    /// `D(V_cc)<D`
    DoseAtVolumeCc,
    /// `Dmax`
    MaxDose,
    /// `Dmedia`
    MeanDose,
    Unrecognized(String),
}

impl ConstraintKind {
    /// All recognized kinds, in sheet order
    pub const KNOWN: [ConstraintKind; 8] = [
        ConstraintKind::VolumeAboveDosePercent,
        ConstraintKind::VolumeAboveDoseCc,
        ConstraintKind::VolumeBelowDosePercent,
        ConstraintKind::VolumeBelowDoseCc,
        ConstraintKind::DoseAtVolumePercent,
        ConstraintKind::DoseAtVolumeCc,
        ConstraintKind::MaxDose,
        ConstraintKind::MeanDose,
    ];

    /// Parses a kind from its sheet notation
    ///
    /// Whitespace is ignored and the comparison is case-insensitive.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        Self::KNOWN
            .iter()
            .find(|kind| kind.notation().eq_ignore_ascii_case(&compact))
            .cloned()
            .unwrap_or(ConstraintKind::Unrecognized(s.trim().to_string()))
    }

    /// Returns the sheet notation
    pub fn notation(&self) -> &str {
        match self {
            ConstraintKind::VolumeAboveDosePercent => "V(D)>V_%",
            ConstraintKind::VolumeAboveDoseCc => "V(D)>V_cc",
            ConstraintKind::VolumeBelowDosePercent => "V(D)<V_%",
            ConstraintKind::VolumeBelowDoseCc => "V(D)<V_cc",
            ConstraintKind::DoseAtVolumePercent => "D(V_%)<D",
            ConstraintKind::DoseAtVolumeCc => "D(V_cc)<D",
            ConstraintKind::MaxDose => "Dmax",
            ConstraintKind::MeanDose => "Dmedia",
            ConstraintKind::Unrecognized(raw) => raw,
        }
    }

    /// Returns the evaluation family, or `None` for unrecognized kinds
    pub fn family(&self) -> Option<ConstraintFamily> {
        use ConstraintFamily::*;
        use VolumeUnit::*;

        match self {
            ConstraintKind::VolumeAboveDosePercent => Some(VolumeAtDose {
                at_least: true,
                unit: Percent,
            }),
            ConstraintKind::VolumeAboveDoseCc => Some(VolumeAtDose {
                at_least: true,
                unit: Absolute,
            }),
            ConstraintKind::VolumeBelowDosePercent => Some(VolumeAtDose {
                at_least: false,
                unit: Percent,
            }),
            ConstraintKind::VolumeBelowDoseCc => Some(VolumeAtDose {
                at_least: false,
                unit: Absolute,
            }),
            ConstraintKind::DoseAtVolumePercent => Some(DoseAtVolume { unit: Percent }),
            ConstraintKind::DoseAtVolumeCc => Some(DoseAtVolume { unit: Absolute }),
            ConstraintKind::MaxDose => Some(MaxDose),
            ConstraintKind::MeanDose => Some(MeanDose),
            ConstraintKind::Unrecognized(_) => None,
        }
    }

    /// Whether evaluating this kind needs the structure's absolute volume
    /// when the DVH curve is in percent
    pub fn needs_absolute_volume(&self) -> bool {
        matches!(
            self,
            ConstraintKind::VolumeAboveDoseCc
                | ConstraintKind::VolumeBelowDoseCc
                | ConstraintKind::DoseAtVolumeCc
                | ConstraintKind::MaxDose
        )
    }

    /// Whether the threshold columns are written volume first
    pub fn is_volume_first(&self) -> bool {
        matches!(
            self,
            ConstraintKind::DoseAtVolumePercent | ConstraintKind::DoseAtVolumeCc
        )
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ConstraintKind::Unrecognized(_))
    }
}

impl From<String> for ConstraintKind {
    fn from(s: String) -> Self {
        ConstraintKind::from_str(&s)
    }
}

impl From<ConstraintKind> for String {
    fn from(kind: ConstraintKind) -> Self {
        kind.notation().to_string()
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.notation())
    }
}

/// Tier a verified constraint reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "kebab-case"))]
pub enum Outcome {
    IdealPass,
    AcceptablePass,
    Fail,
}

impl Outcome {
    /// Returns simple name for display
    pub fn simple_name(&self) -> &'static str {
        match self {
            Outcome::IdealPass => "PASS IDEAL",
            Outcome::AcceptablePass => "PASS ACCEPTABLE",
            Outcome::Fail => "FAIL",
        }
    }

    pub fn is_pass(&self) -> bool {
        !matches!(self, Outcome::Fail)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}
