use crate::error::Result;
use crate::types::StructureLabel;
use std::collections::{BTreeMap, BTreeSet};

/// What the reconciler needs from the outside before evaluation
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ReconciliationRequest {
    /// Prescription labels, in prescription order
    pub prescription_labels: Vec<StructureLabel>,

    /// DVH labels, in export order
    pub dvh_labels: Vec<StructureLabel>,

    /// Prescription labels with no same-named DVH structure
    pub unmatched: Vec<StructureLabel>,

    /// Prescription labels whose rules need an absolute volume the DVH
    /// does not provide
    pub needs_volume: Vec<StructureLabel>,
}

impl ReconciliationRequest {
    /// Whether any label must be matched or any volume supplied
    pub fn is_needed(&self) -> bool {
        !self.unmatched.is_empty() || !self.needs_volume.is_empty()
    }

    pub fn needs_match(&self, label: &StructureLabel) -> bool {
        self.unmatched.contains(label)
    }

    pub fn needs_volume(&self, label: &StructureLabel) -> bool {
        self.needs_volume.contains(label)
    }
}

/// Answer to a [`ReconciliationRequest`]
///
/// All maps are keyed by prescription label. Labels absent from
/// `label_map` resolve to the same-named DVH structure.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(default))]
pub struct ReconciliationAnswer {
    /// Prescription label -> DVH label
    pub label_map: BTreeMap<StructureLabel, StructureLabel>,

    /// Prescription label -> absolute volume (cc)
    pub volumes: BTreeMap<StructureLabel, f64>,

    /// Prescription labels to leave out of the evaluation
    pub ignored: BTreeSet<StructureLabel>,
}

impl ReconciliationAnswer {
    /// Builder: Map a prescription label onto a DVH label
    pub fn map(mut self, prescription: &str, dvh: &str) -> Self {
        self.label_map
            .insert(StructureLabel::new(prescription), StructureLabel::new(dvh));
        self
    }

    /// Builder: Supply the absolute volume of a prescription structure
    pub fn volume(mut self, prescription: &str, volume_cc: f64) -> Self {
        self.volumes.insert(StructureLabel::new(prescription), volume_cc);
        self
    }

    /// Builder: Leave a prescription structure out of the evaluation
    pub fn ignore(mut self, prescription: &str) -> Self {
        self.ignored.insert(StructureLabel::new(prescription));
        self
    }

    /// DVH label a prescription label resolves to
    pub fn resolve<'a>(&'a self, prescription: &'a StructureLabel) -> &'a StructureLabel {
        self.label_map.get(prescription).unwrap_or(prescription)
    }
}

/// External collaborator that answers reconciliation requests
///
/// Implementations may ask a user, read a mapping file, or replay a cached
/// answer. `Ok(None)` means no answer was given.
pub trait ReconciliationPrompt {
    fn resolve(&mut self, request: &ReconciliationRequest) -> Result<Option<ReconciliationAnswer>>;
}

/// Prompt that always replays one fixed answer
#[derive(Debug, Clone, Default)]
pub struct FixedAnswer(pub Option<ReconciliationAnswer>);

impl ReconciliationPrompt for FixedAnswer {
    fn resolve(&mut self, _request: &ReconciliationRequest) -> Result<Option<ReconciliationAnswer>> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults_to_identity() {
        let answer = ReconciliationAnswer::default().map("rectum", "Recto");
        let rectum = StructureLabel::new("RECTUM");
        let bladder = StructureLabel::new("BLADDER");
        assert_eq!(answer.resolve(&rectum).as_str(), "RECTO");
        assert_eq!(answer.resolve(&bladder).as_str(), "BLADDER");
    }

    #[test]
    fn test_request_needed() {
        let mut request = ReconciliationRequest::default();
        assert!(!request.is_needed());
        request.needs_volume.push("PTV".into());
        assert!(request.is_needed());
        assert!(request.needs_volume(&"ptv".into()));
        assert!(!request.needs_match(&"ptv".into()));
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_answer_json_normalizes_labels() {
        let answer: ReconciliationAnswer = serde_json::from_str(
            r#"{"label_map": {"rectum": "recto"}, "volumes": {"ptv ": 512.5}}"#,
        )
        .unwrap();
        assert_eq!(answer, ReconciliationAnswer::default().map("RECTUM", "RECTO").volume("PTV", 512.5));
        assert!(answer.ignored.is_empty());
    }
}
