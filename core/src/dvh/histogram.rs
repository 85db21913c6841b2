use crate::dvh::structure::Structure;
use crate::types::StructureLabel;

/// Parsed DVH export for one plan
///
/// Structures keep the order in which they first appear in the export.
#[derive(Debug, Clone, PartialEq)]
pub struct DoseVolumeHistogram {
    /// Patient identifier from the header line
    pub patient_id: String,

    /// Plan name from the header line
    pub plan_name: String,

    /// Export timestamp (last line of the file)
    pub timestamp: String,

    structures: Vec<Structure>,
}

impl DoseVolumeHistogram {
    /// Creates a DVH from already-built structures
    pub fn new(
        patient_id: String,
        plan_name: String,
        timestamp: String,
        structures: Vec<Structure>,
    ) -> Self {
        Self {
            patient_id,
            plan_name,
            timestamp,
            structures,
        }
    }

    /// Looks up a structure by label
    pub fn get(&self, label: &StructureLabel) -> Option<&Structure> {
        self.structures.iter().find(|s| s.label() == label)
    }

    /// Looks up a structure by label for mutation
    pub fn get_mut(&mut self, label: &StructureLabel) -> Option<&mut Structure> {
        self.structures.iter_mut().find(|s| s.label() == label)
    }

    pub fn contains(&self, label: &StructureLabel) -> bool {
        self.get(label).is_some()
    }

    /// Structure labels in export order
    pub fn labels(&self) -> Vec<StructureLabel> {
        self.structures.iter().map(|s| s.label().clone()).collect()
    }

    pub fn structures(&self) -> &[Structure] {
        &self.structures
    }

    pub fn structures_mut(&mut self) -> &mut [Structure] {
        &mut self.structures
    }

    pub fn len(&self) -> usize {
        self.structures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }

    /// Key identifying this export across runs (`PLAN_PATIENT`)
    pub fn cache_key(&self) -> String {
        format!("{}_{}", self.plan_name, self.patient_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dvh::curve::DoseVolumeCurve;
    use crate::types::VolumeUnit;

    fn structure(label: &str) -> Structure {
        let curve =
            DoseVolumeCurve::new(vec![0.0, 100.0], vec![10.0, 0.0], VolumeUnit::Absolute).unwrap();
        Structure::new(StructureLabel::new(label), curve)
    }

    #[test]
    fn test_lookup_and_order() {
        let mut dvh = DoseVolumeHistogram::new(
            "20123478".to_string(),
            "PARARRECTAL".to_string(),
            "2023-12-11 15:12:30".to_string(),
            vec![structure("rectum"), structure("bladder")],
        );

        assert_eq!(dvh.len(), 2);
        assert!(dvh.contains(&StructureLabel::new("Bladder")));
        assert!(!dvh.contains(&StructureLabel::new("femur")));
        assert_eq!(
            dvh.labels(),
            vec![StructureLabel::new("RECTUM"), StructureLabel::new("BLADDER")]
        );

        dvh.get_mut(&StructureLabel::new("rectum"))
            .unwrap()
            .update_volume(42.0);
        assert_eq!(
            dvh.get(&StructureLabel::new("RECTUM"))
                .unwrap()
                .absolute_volume(),
            Some(42.0)
        );
        assert_eq!(dvh.cache_key(), "PARARRECTAL_20123478");
    }
}
