use crate::api::{ConstraintReport, EvaluationReport, StructureStatus, Verdict};
use crate::prescription::Threshold;
use crate::types::{ConstraintFamily, ConstraintKind};
use std::fmt;

/// Text report formatter for an evaluation
pub struct TextReport<'a> {
    report: &'a EvaluationReport,
}

impl<'a> TextReport<'a> {
    /// Creates a new text report
    pub fn new(report: &'a EvaluationReport) -> Self {
        Self { report }
    }
}

impl<'a> fmt::Display for TextReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "DVH Constraint Report")?;
        writeln!(f, "=====================")?;
        writeln!(f)?;
        writeln!(f, "Protocol:  {}", self.report.protocol_name)?;
        writeln!(f, "Patient:   {}", self.report.patient_id)?;
        writeln!(f, "Plan:      {}", self.report.plan_name)?;
        writeln!(f, "Exported:  {}", self.report.timestamp)?;
        writeln!(f)?;

        if !self.report.targets.is_empty() {
            writeln!(f, "Targets")?;
            writeln!(f, "-------")?;
            for (label, dose) in &self.report.targets {
                writeln!(
                    f,
                    "{:<16} {:.1} cGy total, {:.1} cGy/fx",
                    label.as_str(),
                    dose.total_dose,
                    dose.fraction_dose
                )?;
            }
            writeln!(f)?;
        }

        writeln!(f, "Constraints")?;
        writeln!(f, "-----------")?;
        for structure in &self.report.structures {
            match &structure.status {
                StructureStatus::Ignored => {
                    writeln!(f, "{} (ignored)", structure.label)?;
                }
                StructureStatus::Unresolved { message, .. } => {
                    writeln!(f, "{} ({})", structure.label, message)?;
                }
                StructureStatus::Evaluated(constraints) => {
                    writeln!(f, "{}", structure.label)?;
                    for constraint in constraints {
                        write_constraint(f, constraint)?;
                    }
                }
            }
        }
        writeln!(f)?;

        let summary = self.report.summary();
        writeln!(
            f,
            "Summary: {} ideal, {} acceptable, {} fail, {} error",
            summary.ideal, summary.acceptable, summary.fail, summary.error
        )?;

        Ok(())
    }
}

fn write_constraint(f: &mut fmt::Formatter<'_>, constraint: &ConstraintReport) -> fmt::Result {
    write!(
        f,
        "  {:<16} {:<10} ideal {}",
        constraint.verdict.simple_name(),
        constraint.kind.notation(),
        describe(&constraint.kind, &constraint.ideal)
    )?;
    if let Some(acceptable) = &constraint.acceptable {
        write!(f, ", acceptable {}", describe(&constraint.kind, acceptable))?;
    }
    match &constraint.verdict {
        Verdict::Error(message) => writeln!(f, " -> {}", message),
        verdict => match verdict.measured() {
            Some(measured) => writeln!(f, " -> {:.1} {}", measured, measured_unit(&constraint.kind)),
            None => writeln!(f),
        },
    }
}

/// Threshold in the kind's reading order
fn describe(kind: &ConstraintKind, threshold: &Threshold) -> String {
    let dose = value(threshold.dose);
    let volume = value(threshold.volume);
    match kind.family() {
        Some(ConstraintFamily::VolumeAtDose { unit, .. }) => {
            format!("{} cGy / {} {}", dose, volume, unit)
        }
        Some(ConstraintFamily::DoseAtVolume { unit }) => {
            format!("{} {} / {} cGy", volume, unit, dose)
        }
        Some(ConstraintFamily::MaxDose) | Some(ConstraintFamily::MeanDose) => {
            format!("{} cGy", dose)
        }
        None => format!("{} / {}", dose, volume),
    }
}

fn measured_unit(kind: &ConstraintKind) -> &'static str {
    match kind.family() {
        Some(ConstraintFamily::VolumeAtDose { unit, .. }) => unit.simple_name(),
        _ => "cGy",
    }
}

fn value(v: Option<f64>) -> String {
    v.map(|v| format!("{}", v)).unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::StructureReport;
    use crate::prescription::TargetDose;

    fn report() -> EvaluationReport {
        EvaluationReport {
            protocol_name: "PROSTATA".to_string(),
            patient_id: "20123478".to_string(),
            plan_name: "VMDMBOOST".to_string(),
            timestamp: "02/01/2024".to_string(),
            targets: vec![(
                "PTV".into(),
                TargetDose {
                    total_dose: 7000.0,
                    fraction_dose: 200.0,
                },
            )],
            structures: vec![
                StructureReport {
                    label: "RECTUM".into(),
                    status: StructureStatus::Evaluated(vec![
                        ConstraintReport {
                            kind: ConstraintKind::VolumeBelowDosePercent,
                            ideal: Threshold::dose_volume(6000.0, 25.0),
                            acceptable: Some(Threshold::dose_volume(6000.0, 35.0)),
                            verdict: Verdict::Acceptable(30.0),
                        },
                        ConstraintReport {
                            kind: ConstraintKind::MaxDose,
                            ideal: Threshold::dose(7500.0),
                            acceptable: None,
                            verdict: Verdict::Fail(9999.6),
                        },
                    ]),
                },
                StructureReport {
                    label: "BOWEL".into(),
                    status: StructureStatus::Ignored,
                },
                StructureReport {
                    label: "BLADDER".into(),
                    status: StructureStatus::Unresolved {
                        message: "Unresolved structure: BLADDER not found in the DVH".to_string(),
                        constraints: vec![ConstraintReport {
                            kind: ConstraintKind::MeanDose,
                            ideal: Threshold::dose(4000.0),
                            acceptable: None,
                            verdict: Verdict::Error("Unresolved structure".to_string()),
                        }],
                    },
                },
            ],
        }
    }

    #[test]
    fn test_text_report_format() {
        let output = format!("{}", TextReport::new(&report()));

        assert!(output.contains("Protocol:  PROSTATA"));
        assert!(output.contains("Patient:   20123478"));
        assert!(output.contains("7000.0 cGy total, 200.0 cGy/fx"));
        assert!(output.contains("PASS ACCEPTABLE"));
        assert!(output.contains("ideal 6000 cGy / 25 %, acceptable 6000 cGy / 35 %"));
        assert!(output.contains("-> 30.0 %"));
        assert!(output.contains("ideal 7500 cGy -> 9999.6 cGy"));
        assert!(output.contains("BOWEL (ignored)"));
        assert!(output.contains("BLADDER (Unresolved structure: BLADDER not found in the DVH)"));
        assert!(output.contains("Summary: 0 ideal, 1 acceptable, 1 fail, 1 error"));
    }

    #[test]
    fn test_describe_dose_at_volume_reads_volume_first() {
        assert_eq!(
            describe(&ConstraintKind::DoseAtVolumeCc, &Threshold::dose_volume(7500.0, 0.03)),
            "0.03 cc / 7500 cGy"
        );
        assert_eq!(
            describe(&ConstraintKind::MaxDose, &Threshold::default()),
            "- cGy"
        );
    }
}
