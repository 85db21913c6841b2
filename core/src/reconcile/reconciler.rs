use crate::dvh::DoseVolumeHistogram;
use crate::error::Result;
use crate::prescription::Prescription;
use crate::reconcile::request::{ReconciliationAnswer, ReconciliationPrompt, ReconciliationRequest};
use crate::types::StructureLabel;
use log::{debug, info, warn};
use std::collections::{BTreeSet, HashSet};

/// What an applied reconciliation changed
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ReconciliationSummary {
    /// `(old, new)` label pairs, in DVH order
    pub renamed: Vec<(StructureLabel, StructureLabel)>,

    /// Structures that received a supplied volume
    pub volumes_set: Vec<StructureLabel>,

    /// Prescription labels the answer asked to skip
    pub ignored: BTreeSet<StructureLabel>,
}

/// Aligns DVH structure labels and volumes with a prescription
///
/// # Example
///
/// ```
/// use dosepolice_core::{
///     DoseVolumeCurve, DoseVolumeHistogram, ReconciliationAnswer, Structure,
///     StructureLabel, StructureReconciler, VolumeUnit,
/// };
///
/// let curve = |total: f64| {
///     DoseVolumeCurve::new(vec![0.0, 5000.0], vec![total, 0.0], VolumeUnit::Absolute).unwrap()
/// };
/// let mut dvh = DoseVolumeHistogram::new(
///     "1".to_string(),
///     "PLAN".to_string(),
///     String::new(),
///     vec![
///         Structure::new("RECTO".into(), curve(80.0)),
///         Structure::new("RECTUM".into(), curve(60.0)),
///     ],
/// );
///
/// let answer = ReconciliationAnswer::default().map("RECTUM", "RECTO");
/// StructureReconciler::apply(&mut dvh, &[StructureLabel::new("RECTUM")], &answer);
///
/// let labels: Vec<String> = dvh.labels().iter().map(|l| l.to_string()).collect();
/// assert_eq!(labels, vec!["RECTUM", "RECTUM__2"]);
/// assert_eq!(dvh.get(&"RECTUM".into()).unwrap().absolute_volume(), Some(80.0));
/// ```
pub struct StructureReconciler;

impl StructureReconciler {
    /// Builds the request describing which labels and volumes are missing
    pub fn request(prescription: &Prescription, dvh: &DoseVolumeHistogram) -> ReconciliationRequest {
        let prescription_labels = prescription.labels();
        let dvh_labels = dvh.labels();

        let unmatched = prescription_labels
            .iter()
            .filter(|label| !dvh.contains(label))
            .cloned()
            .collect();

        let needs_volume = prescription
            .structures()
            .iter()
            .filter(|(_, rules)| rules.iter().any(|r| r.kind.needs_absolute_volume()))
            .filter(|(label, _)| dvh.get(label).map_or(true, |s| !s.has_volume()))
            .map(|(label, _)| label.clone())
            .collect();

        ReconciliationRequest {
            prescription_labels,
            dvh_labels,
            unmatched,
            needs_volume,
        }
    }

    /// Asks `prompt` for the missing labels and volumes and applies the answer
    ///
    /// The prompt is only consulted when something is actually missing. If
    /// it gives no answer the DVH is left untouched and unmatched
    /// structures surface later as unresolved.
    pub fn reconcile(
        prescription: &Prescription,
        dvh: &mut DoseVolumeHistogram,
        prompt: &mut dyn ReconciliationPrompt,
    ) -> Result<ReconciliationSummary> {
        let request = Self::request(prescription, dvh);
        if !request.is_needed() {
            info!("All prescription structures found in the DVH with usable volumes");
            return Ok(ReconciliationSummary::default());
        }

        info!(
            "Reconciliation needed: {} unmatched, {} missing volume",
            request.unmatched.len(),
            request.needs_volume.len()
        );

        match prompt.resolve(&request)? {
            Some(answer) => Ok(Self::apply(dvh, &request.prescription_labels, &answer)),
            None => {
                warn!(
                    "No reconciliation answer; unmatched structures: {}",
                    join(&request.unmatched)
                );
                Ok(ReconciliationSummary::default())
            }
        }
    }

    /// Renames DVH structures to prescription labels and sets supplied volumes
    ///
    /// Structures claimed by a prescription label take that label first.
    /// Any other structure whose own label is already taken gets a numeric
    /// suffix (`RECTUM__2`, `RECTUM__3`, ...). When two prescription labels
    /// resolve to the same DVH structure, the first one in prescription
    /// order wins.
    pub fn apply(
        dvh: &mut DoseVolumeHistogram,
        prescription_labels: &[StructureLabel],
        answer: &ReconciliationAnswer,
    ) -> ReconciliationSummary {
        let dvh_labels = dvh.labels();
        let mut claimed: Vec<Option<StructureLabel>> = vec![None; dvh_labels.len()];

        for label in prescription_labels {
            if answer.ignored.contains(label) {
                continue;
            }
            let target = answer.resolve(label);
            let Some(index) = dvh_labels.iter().position(|l| l == target) else {
                if target != label {
                    warn!("{} mapped to {}, which is not in the DVH", label, target);
                }
                continue;
            };
            match &claimed[index] {
                Some(first) => warn!(
                    "{} and {} both map to {}; keeping {}",
                    first, label, target, first
                ),
                None => claimed[index] = Some(label.clone()),
            }
        }

        let mut taken: HashSet<StructureLabel> = claimed.iter().flatten().cloned().collect();
        let final_labels: Vec<StructureLabel> = dvh_labels
            .iter()
            .zip(&claimed)
            .map(|(own, claim)| match claim {
                Some(label) => label.clone(),
                None if taken.contains(own) => {
                    let mut n = 2;
                    let mut candidate = own.with_suffix(n);
                    while taken.contains(&candidate) {
                        n += 1;
                        candidate = own.with_suffix(n);
                    }
                    warn!("Label collision on {}; renaming the other one to {}", own, candidate);
                    taken.insert(candidate.clone());
                    candidate
                }
                None => {
                    taken.insert(own.clone());
                    own.clone()
                }
            })
            .collect();

        let mut summary = ReconciliationSummary {
            ignored: answer.ignored.clone(),
            ..Default::default()
        };

        for (structure, label) in dvh.structures_mut().iter_mut().zip(final_labels) {
            if structure.label() != &label {
                debug!("Renaming {} to {}", structure.label(), label);
                summary
                    .renamed
                    .push((structure.label().clone(), label.clone()));
                structure.rename(label);
            }
        }

        for (label, &volume) in &answer.volumes {
            if !volume.is_finite() || volume <= 0.0 {
                warn!("Ignoring non-positive volume {} for {}", volume, label);
                continue;
            }
            match dvh.get_mut(label) {
                Some(structure) => {
                    structure.update_volume(volume);
                    summary.volumes_set.push(label.clone());
                }
                None => warn!("Volume supplied for {}, which is not in the DVH", label),
            }
        }

        info!(
            "Reconciliation applied: {} renamed, {} volumes set, {} ignored",
            summary.renamed.len(),
            summary.volumes_set.len(),
            summary.ignored.len()
        );
        summary
    }
}

fn join(labels: &[StructureLabel]) -> String {
    labels
        .iter()
        .map(StructureLabel::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
