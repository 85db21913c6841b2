use crate::dvh::DoseVolumeHistogram;
use crate::error::DosePoliceError;
use crate::prescription::{ConstraintRule, Prescription, TargetDose, Threshold};
use crate::types::{ConstraintKind, EvaluationConfig, Outcome, StructureLabel};
use log::{debug, info, warn};
use std::collections::BTreeSet;

/// Runs every prescription constraint against a reconciled DVH
///
/// # Example
///
/// ```
/// use dosepolice_core::{
///     ConstraintKind, ConstraintRule, DoseVolumeCurve, DoseVolumeHistogram, EvaluationConfig,
///     EvaluationRunner, Prescription, Structure, Threshold, Verdict, VolumeUnit,
/// };
///
/// let curve = DoseVolumeCurve::new(
///     vec![0.0, 2000.0, 4000.0],
///     vec![50.0, 25.0, 0.0],
///     VolumeUnit::Absolute,
/// )
/// .unwrap();
/// let dvh = DoseVolumeHistogram::new(
///     "1".to_string(),
///     "PLAN".to_string(),
///     String::new(),
///     vec![Structure::new("PAROTID".into(), curve)],
/// );
///
/// let mut prescription = Prescription::new("H&N");
/// prescription.add_constraint(ConstraintRule::new(
///     "parotid".into(),
///     ConstraintKind::MeanDose,
///     Threshold::dose(2600.0),
///     None,
/// ));
///
/// let runner = EvaluationRunner::new(EvaluationConfig::default());
/// let report = runner.run(&mut prescription, &dvh, &Default::default());
/// assert_eq!(report.verdicts()[0], &Verdict::Ideal(1000.0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct EvaluationRunner {
    config: EvaluationConfig,
}

impl EvaluationRunner {
    pub fn new(config: EvaluationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    /// Verifies every rule of `prescription` in prescription order
    ///
    /// `ignored` adds to the labels already ignored by the configuration,
    /// typically the ones a reconciliation answer asked to skip. Evaluation
    /// errors are recorded per constraint and never stop the run.
    pub fn run(
        &self,
        prescription: &mut Prescription,
        dvh: &DoseVolumeHistogram,
        ignored: &BTreeSet<StructureLabel>,
    ) -> EvaluationReport {
        let mut structures = Vec::with_capacity(prescription.structures().len());

        for (label, rules) in prescription.structures_mut().iter_mut() {
            let label = &*label;
            let status = if self.config.is_ignored(label) || ignored.contains(label) {
                debug!("Skipping ignored structure {}", label);
                StructureStatus::Ignored
            } else {
                match dvh.get(label) {
                    Some(structure) => StructureStatus::Evaluated(
                        rules
                            .iter_mut()
                            .map(|rule| {
                                let verdict = match rule
                                    .verify_with(structure, self.config.near_max_volume_cc)
                                {
                                    Ok(outcome) => Verdict::from_rule(outcome, rule),
                                    Err(e) => {
                                        warn!("{} {}: {}", label, rule.kind, e);
                                        Verdict::Error(e.to_string())
                                    }
                                };
                                ConstraintReport::new(rule, verdict)
                            })
                            .collect(),
                    ),
                    None => {
                        let e = DosePoliceError::UnresolvedStructure(format!(
                            "{} not found in the DVH",
                            label
                        ));
                        warn!("{}", e);
                        StructureStatus::Unresolved {
                            message: e.to_string(),
                            constraints: rules
                                .iter()
                                .map(|rule| ConstraintReport::new(rule, Verdict::Error(e.to_string())))
                                .collect(),
                        }
                    }
                }
            };
            structures.push(StructureReport {
                label: label.clone(),
                status,
            });
        }

        let report = EvaluationReport {
            protocol_name: prescription.protocol_name.clone(),
            patient_id: dvh.patient_id.clone(),
            plan_name: dvh.plan_name.clone(),
            timestamp: dvh.timestamp.clone(),
            targets: prescription.targets().to_vec(),
            structures,
        };

        let summary = report.summary();
        info!(
            "Evaluated {}: {} ideal, {} acceptable, {} fail, {} error",
            report.protocol_name, summary.ideal, summary.acceptable, summary.fail, summary.error
        );
        report
    }
}

/// Result of one constraint
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(
    feature = "json",
    serde(tag = "tier", content = "value", rename_all = "lowercase")
)]
pub enum Verdict {
    /// Ideal tier met; measured value of the ideal tier
    Ideal(f64),
    /// Only the acceptable tier met; measured value of that tier
    Acceptable(f64),
    /// No tier met; measured value of the last tier evaluated
    Fail(f64),
    /// The constraint could not be evaluated
    Error(String),
}

impl Verdict {
    fn from_rule(outcome: Outcome, rule: &ConstraintRule) -> Self {
        let measured = rule.measured().unwrap_or(f64::NAN);
        match outcome {
            Outcome::IdealPass => Verdict::Ideal(measured),
            Outcome::AcceptablePass => Verdict::Acceptable(measured),
            Outcome::Fail => Verdict::Fail(measured),
        }
    }

    /// Tier reached, `None` on error
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Verdict::Ideal(_) => Some(Outcome::IdealPass),
            Verdict::Acceptable(_) => Some(Outcome::AcceptablePass),
            Verdict::Fail(_) => Some(Outcome::Fail),
            Verdict::Error(_) => None,
        }
    }

    pub fn measured(&self) -> Option<f64> {
        match self {
            Verdict::Ideal(v) | Verdict::Acceptable(v) | Verdict::Fail(v) => Some(*v),
            Verdict::Error(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Verdict::Error(_))
    }

    /// Label used in reports
    pub fn simple_name(&self) -> &'static str {
        match self.outcome() {
            Some(outcome) => outcome.simple_name(),
            None => "ERROR",
        }
    }
}

/// One evaluated constraint with its thresholds
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ConstraintReport {
    pub kind: ConstraintKind,
    pub ideal: Threshold,
    pub acceptable: Option<Threshold>,
    pub verdict: Verdict,
}

impl ConstraintReport {
    fn new(rule: &ConstraintRule, verdict: Verdict) -> Self {
        Self {
            kind: rule.kind.clone(),
            ideal: rule.ideal,
            acceptable: rule.acceptable,
            verdict,
        }
    }
}

/// How a prescription structure was handled
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(
    feature = "json",
    serde(tag = "status", content = "detail", rename_all = "lowercase")
)]
pub enum StructureStatus {
    Evaluated(Vec<ConstraintReport>),
    Ignored,
    /// No DVH structure carries this label; every constraint is an error
    Unresolved {
        message: String,
        constraints: Vec<ConstraintReport>,
    },
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct StructureReport {
    pub label: StructureLabel,
    pub status: StructureStatus,
}

impl StructureReport {
    /// Constraint reports, empty for ignored structures
    pub fn constraints(&self) -> &[ConstraintReport] {
        match &self.status {
            StructureStatus::Evaluated(constraints) => constraints,
            StructureStatus::Unresolved { constraints, .. } => constraints,
            StructureStatus::Ignored => &[],
        }
    }
}

/// Ordered evaluation result for one plan against one protocol
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct EvaluationReport {
    pub protocol_name: String,
    pub patient_id: String,
    pub plan_name: String,
    pub timestamp: String,
    pub targets: Vec<(StructureLabel, TargetDose)>,
    pub structures: Vec<StructureReport>,
}

impl EvaluationReport {
    /// All verdicts in report order
    pub fn verdicts(&self) -> Vec<&Verdict> {
        self.structures
            .iter()
            .flat_map(|s| s.constraints())
            .map(|c| &c.verdict)
            .collect()
    }

    /// Counts verdicts by tier
    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary::default();
        for structure in &self.structures {
            match structure.status {
                StructureStatus::Ignored => summary.ignored_structures += 1,
                StructureStatus::Unresolved { .. } => summary.unresolved_structures += 1,
                StructureStatus::Evaluated(_) => {}
            }
        }
        for verdict in self.verdicts() {
            match verdict {
                Verdict::Ideal(_) => summary.ideal += 1,
                Verdict::Acceptable(_) => summary.acceptable += 1,
                Verdict::Fail(_) => summary.fail += 1,
                Verdict::Error(_) => summary.error += 1,
            }
        }
        summary
    }
}

/// Verdict counts of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ReportSummary {
    pub ideal: usize,
    pub acceptable: usize,
    pub fail: usize,
    pub error: usize,
    pub ignored_structures: usize,
    pub unresolved_structures: usize,
}

impl ReportSummary {
    /// Whether every evaluated constraint passed one of its tiers
    pub fn all_passed(&self) -> bool {
        self.fail == 0 && self.error == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dvh::{DoseVolumeCurve, DvhLoader, Structure};
    use crate::prescription::Sheet;
    use crate::reconcile::{FixedAnswer, ReconciliationAnswer, StructureReconciler};
    use crate::types::{LoaderConfig, SheetWindow, VolumeUnit};

    /// PTV with dose 0..=10000 cGy in steps of 100 and volume 800..=0 cc in steps of 8
    fn ptv() -> Structure {
        let dose: Vec<f64> = (0..=100).map(|i| i as f64 * 100.0).collect();
        let volume: Vec<f64> = (0..=100).map(|i| 800.0 - i as f64 * 8.0).collect();
        Structure::new(
            "PTV".into(),
            DoseVolumeCurve::new(dose, volume, VolumeUnit::Absolute).unwrap(),
        )
    }

    fn rectum_percent() -> Structure {
        Structure::new(
            "RECTUM".into(),
            DoseVolumeCurve::new(
                vec![0.0, 6000.0, 7000.0],
                vec![100.0, 30.0, 0.0],
                VolumeUnit::Percent,
            )
            .unwrap(),
        )
    }

    fn dvh() -> DoseVolumeHistogram {
        DoseVolumeHistogram::new(
            "20123478".to_string(),
            "VMDMBOOST".to_string(),
            "Tue Jan 02 10:00:00 2024".to_string(),
            vec![ptv(), rectum_percent()],
        )
    }

    fn rule(label: &str, kind: ConstraintKind, ideal: Threshold, acceptable: Option<Threshold>) -> ConstraintRule {
        ConstraintRule::new(label.into(), kind, ideal, acceptable)
    }

    #[test]
    fn test_ptv_max_dose_fails_at_near_max_point() {
        let mut p = Prescription::new("PROSTATA");
        p.add_target("PTV".into(), TargetDose { total_dose: 7000.0, fraction_dose: 200.0 });
        p.add_constraint(rule("PTV", ConstraintKind::MaxDose, Threshold::dose(7500.0), None));

        let report = EvaluationRunner::default().run(&mut p, &dvh(), &BTreeSet::new());

        // dose_at(0.03) = 10000 - 0.03 / 8 * 100 = 9999.625
        assert_eq!(report.verdicts(), vec![&Verdict::Fail(9999.6)]);
        assert_eq!(report.targets.len(), 1);
        assert_eq!(report.patient_id, "20123478");
        assert!(!report.summary().all_passed());
    }

    #[test]
    fn test_acceptable_tier_reported() {
        let mut p = Prescription::new("PROSTATA");
        p.add_constraint(rule(
            "RECTUM",
            ConstraintKind::VolumeBelowDosePercent,
            Threshold::dose_volume(6000.0, 25.0),
            Some(Threshold::dose_volume(6000.0, 35.0)),
        ));
        p.add_constraint(rule(
            "RECTUM",
            ConstraintKind::VolumeBelowDosePercent,
            Threshold::dose_volume(6000.0, 35.0),
            None,
        ));

        let report = EvaluationRunner::default().run(&mut p, &dvh(), &BTreeSet::new());
        assert_eq!(
            report.verdicts(),
            vec![&Verdict::Acceptable(30.0), &Verdict::Ideal(30.0)]
        );
        assert!(report.summary().all_passed());
    }

    #[test]
    fn test_errors_stay_local() {
        let mut p = Prescription::new("PROSTATA");
        p.add_constraint(rule(
            "RECTUM",
            ConstraintKind::VolumeBelowDoseCc,
            Threshold::dose_volume(6000.0, 20.0),
            None,
        ));
        p.add_constraint(rule(
            "RECTUM",
            ConstraintKind::Unrecognized("D(V)=D".to_string()),
            Threshold::dose(6000.0),
            None,
        ));
        p.add_constraint(rule("RECTUM", ConstraintKind::MeanDose, Threshold::dose(7000.0), None));
        p.add_constraint(rule("BLADDER", ConstraintKind::MeanDose, Threshold::dose(4000.0), None));

        let report = EvaluationRunner::default().run(&mut p, &dvh(), &BTreeSet::new());
        let verdicts = report.verdicts();

        assert!(matches!(verdicts[0], Verdict::Error(m) if m.starts_with("Unit mismatch")));
        assert!(matches!(verdicts[1], Verdict::Error(m) if m.starts_with("Unknown constraint kind")));
        assert_eq!(verdicts[2].outcome(), Some(Outcome::IdealPass));
        assert!(matches!(verdicts[3], Verdict::Error(m) if m.contains("BLADDER")));

        let summary = report.summary();
        assert_eq!(summary.error, 3);
        assert_eq!(summary.ideal, 1);
        assert_eq!(summary.unresolved_structures, 1);
    }

    #[test]
    fn test_ignored_structures_skipped() {
        let mut p = Prescription::new("PROSTATA");
        p.add_constraint(rule("PTV", ConstraintKind::MaxDose, Threshold::dose(7500.0), None));
        p.add_constraint(rule("BOWEL", ConstraintKind::MaxDose, Threshold::dose(5000.0), None));

        let runner = EvaluationRunner::new(EvaluationConfig::default().ignore("ptv"));
        let ignored: BTreeSet<StructureLabel> = [StructureLabel::new("BOWEL")].into_iter().collect();
        let report = runner.run(&mut p, &dvh(), &ignored);

        assert!(report.verdicts().is_empty());
        assert_eq!(report.summary().ignored_structures, 2);
        assert!(report
            .structures
            .iter()
            .all(|s| s.status == StructureStatus::Ignored));
    }

    #[test]
    fn test_report_keeps_prescription_order() {
        let mut p = Prescription::new("PROSTATA");
        p.add_constraint(rule("RECTUM", ConstraintKind::MeanDose, Threshold::dose(7000.0), None));
        p.add_constraint(rule("PTV", ConstraintKind::MaxDose, Threshold::dose(7500.0), None));
        let report = EvaluationRunner::default().run(&mut p, &dvh(), &BTreeSet::new());
        let labels: Vec<&str> = report.structures.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["RECTUM", "PTV"]);
    }

    const RECTUM_SHEET: &str = "\
Protocolo\tPROSTATA
\t
\t
Target\tDosis total\tDosis diaria
PTV\t7000\t200

\tConstraints
#\tEstructura\tTipo\tIdeal 1\tIdeal 2\tAceptable 1\tAceptable 2
1\tRectum\tV(D)<V_%\t4000\t40\t4000\t55
2\t\tD(V_cc)<D\t2\t7500
3\t\tDmax\t7500
4\t\tDmedia\t2500
5\tBladder\tDmedia\t4500
";

    fn percent_export() -> String {
        let sep = "                    ";
        let mut text = String::from("Patient ID: 20123478 Lapera,Roy Plan Name: VMDmBOOST\n");
        text.push_str("Structure  Dose[cGy]  Volume[%]\n---\n");
        for (label, dose, volume) in [
            ("PTV", 0.0, 100.0),
            ("PTV", 7000.0, 100.0),
            ("PTV", 8000.0, 0.0),
            ("Recto", 0.0, 100.0),
            ("Recto", 4000.0, 50.0),
            ("Recto", 8000.0, 0.0),
        ] {
            text.push_str(&format!("{label}{sep}{dose}{sep}{volume}\n"));
        }
        text.push_str("---\nExported\n2024-05-02 10:00:00\n");
        text
    }

    #[test]
    fn test_percent_export_evaluated_after_reconciliation() {
        let mut dvh = DvhLoader::new(LoaderConfig::default().with_volume_unit(VolumeUnit::Percent))
            .parse(&percent_export())
            .unwrap();
        let mut prescription = Prescription::from_sheet(
            "prostata",
            &Sheet::from_delimited(RECTUM_SHEET, '\t'),
            &SheetWindow::default(),
        )
        .unwrap();

        let answer = ReconciliationAnswer::default()
            .map("RECTUM", "RECTO")
            .volume("RECTUM", 80.0)
            .ignore("BLADDER");
        let reconciled =
            StructureReconciler::reconcile(&prescription, &mut dvh, &mut FixedAnswer(Some(answer)))
                .unwrap();
        assert_eq!(
            reconciled.renamed,
            vec![(StructureLabel::new("RECTO"), StructureLabel::new("RECTUM"))]
        );
        assert_eq!(reconciled.volumes_set, vec![StructureLabel::new("RECTUM")]);

        let report = EvaluationRunner::default().run(&mut prescription, &dvh, &reconciled.ignored);

        // 2 cc of 80 cc is 2.5 %, dose_at(2.5) = 8000 - 2.5 / 50 * 4000
        // 0.03 cc is 0.0375 %, dose_at(0.0375) = 8000 - 0.0375 / 50 * 4000
        assert_eq!(
            report.verdicts(),
            vec![
                &Verdict::Acceptable(50.0),
                &Verdict::Fail(7800.0),
                &Verdict::Fail(7997.0),
                &Verdict::Ideal(2000.0),
            ]
        );
        assert_eq!(report.structures[0].label, StructureLabel::new("RECTUM"));
        assert_eq!(report.structures[1].status, StructureStatus::Ignored);
        assert_eq!(report.plan_name, "VMDmBOOST");
        assert_eq!(report.targets.len(), 1);
    }

    #[test]
    fn test_percent_export_without_answer_reports_errors() {
        let mut dvh = DvhLoader::new(LoaderConfig::default().with_volume_unit(VolumeUnit::Percent))
            .parse(&percent_export())
            .unwrap();
        let mut prescription = Prescription::from_sheet(
            "prostata",
            &Sheet::from_delimited(RECTUM_SHEET, '\t'),
            &SheetWindow::default(),
        )
        .unwrap();

        let reconciled =
            StructureReconciler::reconcile(&prescription, &mut dvh, &mut FixedAnswer(None)).unwrap();
        let report = EvaluationRunner::default().run(&mut prescription, &dvh, &reconciled.ignored);

        let summary = report.summary();
        assert_eq!(summary.unresolved_structures, 2);
        assert_eq!(summary.error, 5);
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_report_json_shape() {
        let mut p = Prescription::new("PROSTATA");
        p.add_constraint(rule("PTV", ConstraintKind::MaxDose, Threshold::dose(7500.0), None));
        let report = EvaluationRunner::default().run(&mut p, &dvh(), &BTreeSet::new());
        let json = serde_json::to_value(&report).unwrap();
        let constraint = &json["structures"][0]["status"];
        assert_eq!(constraint["status"], "evaluated");
    }
}
