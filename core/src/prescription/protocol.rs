use crate::error::{DosePoliceError, Result};
use crate::prescription::constraint::{ConstraintRule, Threshold};
use crate::prescription::sheet::Sheet;
use crate::prescription::workbook::PrescriptionSource;
use crate::types::{ConstraintKind, SheetWindow, StructureLabel};
use log::{info, warn};

/// Header rows above the target rows in block 1
const TARGET_HEADER_ROWS: usize = 1;

/// Header rows above the constraint rows in block 2
const CONSTRAINT_HEADER_ROWS: usize = 2;

/// Prescribed total and per-fraction dose of a target, in cGy
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetDose {
    pub total_dose: f64,
    pub fraction_dose: f64,
}

/// Named clinical protocol: target doses plus per-structure constraints
///
/// Structures and their rules keep sheet order.
#[derive(Debug, Clone, PartialEq)]
pub struct Prescription {
    pub protocol_name: String,
    target_structures: Vec<(StructureLabel, TargetDose)>,
    structures: Vec<(StructureLabel, Vec<ConstraintRule>)>,
}

impl Prescription {
    /// Creates an empty prescription
    pub fn new(protocol_name: &str) -> Self {
        Self {
            protocol_name: protocol_name.trim().to_uppercase(),
            target_structures: Vec::new(),
            structures: Vec::new(),
        }
    }

    /// Loads a protocol from a tabular source
    ///
    /// # Errors
    ///
    /// Returns an error if the source has no such protocol or its sheet
    /// does not hold the two-block layout
    pub fn load(
        source: &dyn PrescriptionSource,
        protocol_name: &str,
        window: &SheetWindow,
    ) -> Result<Self> {
        let sheet = source.sheet(protocol_name)?;
        Self::from_sheet(protocol_name, &sheet, window)
    }

    /// Builds a prescription from a protocol sheet
    ///
    /// The cells inside `window` must form exactly two blocks separated by
    /// blank rows: target doses, then constraints.
    pub fn from_sheet(protocol_name: &str, sheet: &Sheet, window: &SheetWindow) -> Result<Self> {
        let blocks = sheet.window(window).blocks();
        if blocks.len() != 2 {
            return Err(DosePoliceError::MalformedPrescription(format!(
                "protocol {}: expected 2 blocks in {}, found {}",
                protocol_name,
                window,
                blocks.len()
            )));
        }

        let mut prescription = Self::new(protocol_name);
        prescription.read_targets(&blocks[0])?;
        prescription.read_constraints(&blocks[1])?;

        info!(
            "Loaded protocol {}: {} targets, {} structures, {} constraints",
            prescription.protocol_name,
            prescription.target_structures.len(),
            prescription.structures.len(),
            prescription.constraint_count()
        );
        Ok(prescription)
    }

    /// Rows: `[target, total dose, fraction dose, ...]`
    fn read_targets(&mut self, block: &Sheet) -> Result<()> {
        for (i, row) in block.rows().iter().enumerate().skip(TARGET_HEADER_ROWS) {
            let context = format!("target row {}", i + 1);
            let name = cell(row, 0).ok_or_else(|| {
                DosePoliceError::MalformedPrescription(format!("{}: target name is blank", context))
            })?;
            let total_dose = number(cell(row, 1), &context)?.ok_or_else(|| {
                DosePoliceError::MalformedPrescription(format!("{}: total dose is blank", context))
            })?;
            let fraction_dose = number(cell(row, 2), &context)?.ok_or_else(|| {
                DosePoliceError::MalformedPrescription(format!(
                    "{}: fraction dose is blank",
                    context
                ))
            })?;
            self.add_target(
                StructureLabel::new(name),
                TargetDose {
                    total_dose,
                    fraction_dose,
                },
            );
        }
        Ok(())
    }

    /// Rows: `[index, structure, kind, ideal 1, ideal 2, acceptable 1, acceptable 2]`
    ///
    /// A blank structure continues the previous structure's rule list.
    fn read_constraints(&mut self, block: &Sheet) -> Result<()> {
        let mut current: Option<StructureLabel> = None;

        for (i, row) in block.rows().iter().enumerate().skip(CONSTRAINT_HEADER_ROWS) {
            let context = format!("constraint row {}", i + 1);

            if let Some(name) = cell(row, 1) {
                current = Some(StructureLabel::new(name));
            }
            let label = current.clone().ok_or_else(|| {
                DosePoliceError::MalformedPrescription(format!(
                    "{}: no structure named before this rule",
                    context
                ))
            })?;

            let kind = match cell(row, 2) {
                Some(raw) => ConstraintKind::from_str(raw),
                None => {
                    return Err(DosePoliceError::MalformedPrescription(format!(
                        "{}: constraint type is blank",
                        context
                    )))
                }
            };
            if !kind.is_known() {
                warn!("{}: unknown constraint type '{}' for {}", context, kind, label);
            }

            let ideal = threshold(
                &kind,
                number(cell(row, 3), &context)?,
                number(cell(row, 4), &context)?,
            );
            let acceptable_cells = (
                number(cell(row, 5), &context)?,
                number(cell(row, 6), &context)?,
            );
            let acceptable = match acceptable_cells {
                (None, None) => None,
                (first, second) => Some(threshold(&kind, first, second)),
            };

            self.add_constraint(ConstraintRule::new(label, kind, ideal, acceptable));
        }
        Ok(())
    }

    /// Adds a target dose entry
    pub fn add_target(&mut self, label: StructureLabel, dose: TargetDose) {
        match self.target_structures.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = dose,
            None => self.target_structures.push((label, dose)),
        }
    }

    /// Appends a rule under its own structure label
    pub fn add_constraint(&mut self, rule: ConstraintRule) {
        match self
            .structures
            .iter_mut()
            .find(|(l, _)| *l == rule.structure_label)
        {
            Some((_, rules)) => rules.push(rule),
            None => self
                .structures
                .push((rule.structure_label.clone(), vec![rule])),
        }
    }

    /// Target doses in sheet order
    pub fn targets(&self) -> &[(StructureLabel, TargetDose)] {
        &self.target_structures
    }

    pub fn target(&self, label: &StructureLabel) -> Option<&TargetDose> {
        self.target_structures
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, d)| d)
    }

    /// Structure labels in sheet order
    pub fn labels(&self) -> Vec<StructureLabel> {
        self.structures.iter().map(|(l, _)| l.clone()).collect()
    }

    pub fn structures(&self) -> &[(StructureLabel, Vec<ConstraintRule>)] {
        &self.structures
    }

    pub fn structures_mut(&mut self) -> &mut [(StructureLabel, Vec<ConstraintRule>)] {
        &mut self.structures
    }

    pub fn constraints(&self, label: &StructureLabel) -> Option<&[ConstraintRule]> {
        self.structures
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, rules)| rules.as_slice())
    }

    pub fn constraint_count(&self) -> usize {
        self.structures.iter().map(|(_, rules)| rules.len()).sum()
    }
}

fn cell(row: &[Option<String>], col: usize) -> Option<&str> {
    row.get(col).and_then(|c| c.as_deref())
}

fn number(cell: Option<&str>, context: &str) -> Result<Option<f64>> {
    match cell {
        None => Ok(None),
        Some(raw) => match raw.replace(',', ".").parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Some(value)),
            _ => Err(DosePoliceError::MalformedPrescription(format!(
                "{}: '{}' is not a number",
                context, raw
            ))),
        },
    }
}

/// Maps two threshold cells onto dose/volume in the kind's reading order
fn threshold(kind: &ConstraintKind, first: Option<f64>, second: Option<f64>) -> Threshold {
    if kind.is_volume_first() {
        Threshold::new(second, first)
    } else {
        Threshold::new(first, second)
    }
}
