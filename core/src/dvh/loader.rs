use crate::dvh::curve::DoseVolumeCurve;
use crate::dvh::histogram::DoseVolumeHistogram;
use crate::dvh::structure::Structure;
use crate::error::{DosePoliceError, Result};
use crate::types::{DoseUnit, LoaderConfig, StructureLabel};
use log::{debug, info, warn};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::OnceLock;

/// Whitespace token holding the patient id on the header line
const PATIENT_ID_TOKEN: usize = 2;

/// Whitespace token holding the plan name on the header line
const PLAN_NAME_TOKEN: usize = 6;

/// Loader for tabular DVH text exports
///
/// # Layout
///
/// - line 1: header; patient id at whitespace token 2, plan name at token 6
/// - next `header_lines - 1` lines: column titles
/// - body: `label  dose  cumulative-volume` rows, columns separated by
///   runs of two or more spaces (or tabs), repeated per structure
/// - last `trailer_lines` lines: trailer, the final one is the timestamp
///
/// # Example
///
/// ```
/// use dosepolice_core::{DvhLoader, LoaderConfig};
///
/// let text = "\
/// Patient ID: 20123478 Doe,John Plan Name: PROSTATA
/// Structure                    Dose[cGy]                    Volume[cm3]
/// ---
/// Recto                    0.0                    80.0
/// Recto                    5000.0                    20.0
/// Recto                    7000.0                    0.0
/// Camilla                    0.0                    900.0
/// ---
/// Exported
/// 2024-05-02 10:00:00
/// ";
///
/// let dvh = DvhLoader::new(LoaderConfig::default()).parse(text).unwrap();
/// assert_eq!(dvh.patient_id, "20123478");
/// assert_eq!(dvh.plan_name, "PROSTATA");
/// assert_eq!(dvh.len(), 1);
/// assert_eq!(dvh.labels()[0].as_str(), "RECTO");
/// ```
#[derive(Debug, Clone, Default)]
pub struct DvhLoader {
    config: LoaderConfig,
}

impl DvhLoader {
    /// Creates a loader with the given configuration
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Reads and parses a DVH export from disk
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<DoseVolumeHistogram> {
        let path = path.as_ref();
        info!("Loading DVH export: {}", path.display());
        let text = std::fs::read_to_string(path)?;
        self.parse(&text)
    }

    /// Parses the text of a DVH export
    ///
    /// # Errors
    ///
    /// - [`DosePoliceError::UnitMismatch`] if the export is declared in
    ///   relative dose
    /// - [`DosePoliceError::MalformedDvh`] if the header tokens are
    ///   missing, a row does not have three columns, or a cell is not
    ///   numeric
    /// - [`DosePoliceError::MalformedCurve`] if a structure's rows do not
    ///   form a monotonic curve
    pub fn parse(&self, text: &str) -> Result<DoseVolumeHistogram> {
        let dose_factor = self.config.dose_unit.to_centigray().ok_or_else(|| {
            DosePoliceError::UnitMismatch(format!(
                "DVH dose unit is {}; export the DVH in absolute dose (cGy or Gy)",
                DoseUnit::Relative
            ))
        })?;

        let lines: Vec<&str> = text.lines().collect();
        let framing = self.config.header_lines + self.config.trailer_lines;
        if lines.len() <= framing {
            return Err(DosePoliceError::MalformedDvh(format!(
                "expected more than {} lines, found {}",
                framing,
                lines.len()
            )));
        }

        let header: Vec<&str> = lines[0].split_whitespace().collect();
        let patient_id = header_token(&header, PATIENT_ID_TOKEN, "patient id")?;
        let plan_name = header_token(&header, PLAN_NAME_TOKEN, "plan name")?;
        let timestamp = lines[lines.len() - 1].trim().to_string();

        let body = &lines[self.config.header_lines..lines.len() - self.config.trailer_lines];
        // Rows are grouped by the label as written; each raw label gets its own final label
        let mut order: Vec<StructureLabel> = Vec::new();
        let mut assigned: HashMap<&str, StructureLabel> = HashMap::new();
        let mut columns: HashMap<StructureLabel, (Vec<f64>, Vec<f64>)> = HashMap::new();
        let mut excluded: HashSet<&str> = HashSet::new();

        for (offset, line) in body.iter().enumerate() {
            let line_number = self.config.header_lines + offset + 1;
            if line.trim().is_empty() {
                continue;
            }

            let (raw_label, dose, volume) = parse_row(line, line_number)?;
            if self.config.is_excluded(raw_label) {
                if excluded.insert(raw_label) {
                    warn!("Skipping excluded structure {}", raw_label);
                }
                continue;
            }

            let label = match assigned.get(raw_label) {
                Some(label) => label.clone(),
                None => {
                    let label = self.unique_label(raw_label, &columns);
                    assigned.insert(raw_label, label.clone());
                    order.push(label.clone());
                    columns.insert(label.clone(), (Vec::new(), Vec::new()));
                    label
                }
            };
            if let Some(entry) = columns.get_mut(&label) {
                entry.0.push(dose * dose_factor);
                entry.1.push(volume);
            }
        }

        if order.is_empty() {
            return Err(DosePoliceError::MalformedDvh(
                "no structure rows in the export body".to_string(),
            ));
        }

        let mut structures = Vec::with_capacity(order.len());
        for label in order {
            let (dose_axis, volume_axis) = columns.remove(&label).unwrap_or_default();
            let curve = DoseVolumeCurve::new(dose_axis, volume_axis, self.config.volume_unit)
                .map_err(|e| match e {
                    DosePoliceError::MalformedCurve(msg) => {
                        DosePoliceError::MalformedCurve(format!("{}: {}", label, msg))
                    }
                    other => other,
                })?;
            debug!(
                "Structure {}: {} points, total {} {}",
                label,
                curve.len(),
                curve.total_volume(),
                curve.unit()
            );
            structures.push(Structure::new(label, curve));
        }

        info!(
            "Loaded {} structures for patient {} plan {}",
            structures.len(),
            patient_id,
            plan_name
        );

        Ok(DoseVolumeHistogram::new(
            patient_id,
            plan_name,
            timestamp,
            structures,
        ))
    }
}

impl DvhLoader {
    /// Canonical label for `raw_label`, suffixed with `__N` when another
    /// raw label already claimed it
    fn unique_label<V>(
        &self,
        raw_label: &str,
        taken: &HashMap<StructureLabel, V>,
    ) -> StructureLabel {
        let label = self.config.canonical_label(raw_label);
        if !taken.contains_key(&label) {
            return label;
        }
        let renamed = (2..)
            .map(|n| label.with_suffix(n))
            .find(|candidate| !taken.contains_key(candidate))
            .unwrap_or_else(|| label.clone());
        warn!(
            "Structure {} collides with {}, loaded as {}",
            raw_label, label, renamed
        );
        renamed
    }
}

fn header_token(tokens: &[&str], index: usize, what: &str) -> Result<String> {
    tokens
        .get(index)
        .map(|s| s.to_string())
        .ok_or_else(|| {
            DosePoliceError::MalformedDvh(format!(
                "header line has no {} at token {}",
                what, index
            ))
        })
}

/// Splits one body row into (label, dose, cumulative volume)
fn parse_row(line: &str, line_number: usize) -> Result<(&str, f64, f64)> {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    let re = SEPARATOR.get_or_init(|| Regex::new(r"\t+|\s{2,}").expect("Failed to compile regex"));

    let fields: Vec<&str> = re.split(line.trim()).collect();
    if fields.len() != 3 {
        return Err(DosePoliceError::MalformedDvh(format!(
            "line {}: expected 3 columns (structure, dose, volume), found {}",
            line_number,
            fields.len()
        )));
    }

    let number = |cell: &str, what: &str| -> Result<f64> {
        cell.trim().parse::<f64>().map_err(|_| {
            DosePoliceError::MalformedDvh(format!(
                "line {}: non-numeric {} '{}'",
                line_number, what, cell
            ))
        })
    };

    Ok((fields[0], number(fields[1], "dose")?, number(fields[2], "volume")?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VolumeUnit;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SEP: &str = "                    ";

    fn export(rows: &[(&str, f64, f64)]) -> String {
        let mut text = String::new();
        text.push_str("Patient ID: 20123478 Lapera,Roy Plan Name: VMDmBOOST\n");
        text.push_str("Structure                    Dose[cGy]                    Volume[cm3]\n");
        text.push_str("-------------------------------------------------\n");
        for (label, dose, volume) in rows {
            text.push_str(&format!("{}{}{}{}{}\n", label, SEP, dose, SEP, volume));
        }
        text.push_str("-------------------------------------------------\n");
        text.push_str("Monaco DVH export\n");
        text.push_str("2023-12-11-Mon  15:12:30\n");
        text
    }

    fn sample_rows() -> Vec<(&'static str, f64, f64)> {
        vec![
            ("PTV", 0.0, 800.0),
            ("PTV", 5000.0, 400.0),
            ("PTV", 10000.0, 0.0),
            ("Recto", 0.0, 60.0),
            ("Recto", 4000.0, 30.0),
            ("Recto", 7000.0, 0.0),
            ("Camilla", 0.0, 5000.0),
            ("Camilla", 10.0, 0.0),
            ("Paciente(Unsp.Tiss.)", 0.0, 20000.0),
            ("Paciente(Unsp.Tiss.)", 100.0, 0.0),
        ]
    }

    #[test]
    fn test_parse_header_and_trailer() {
        let dvh = DvhLoader::default().parse(&export(&sample_rows())).unwrap();
        assert_eq!(dvh.patient_id, "20123478");
        assert_eq!(dvh.plan_name, "VMDmBOOST");
        assert_eq!(dvh.timestamp, "2023-12-11-Mon  15:12:30");
        assert_eq!(dvh.cache_key(), "VMDmBOOST_20123478");
    }

    #[test]
    fn test_groups_rows_and_applies_denylist_and_aliases() {
        let dvh = DvhLoader::default().parse(&export(&sample_rows())).unwrap();
        let labels: Vec<String> = dvh.labels().iter().map(|l| l.to_string()).collect();
        assert_eq!(labels, vec!["PTV", "RECTO", "PACIENTE"]);

        let ptv = dvh.get(&StructureLabel::new("ptv")).unwrap();
        assert_eq!(ptv.curve().len(), 3);
        assert_eq!(ptv.absolute_volume(), Some(800.0));
        assert_eq!(ptv.volume_at(2500.0), 600.0);
    }

    #[test]
    fn test_percent_export_has_unknown_volume() {
        let loader = DvhLoader::new(LoaderConfig::default().with_volume_unit(VolumeUnit::Percent));
        let dvh = loader
            .parse(&export(&[("Recto", 0.0, 100.0), ("Recto", 100.0, 50.0)]))
            .unwrap();
        let recto = dvh.get(&StructureLabel::new("RECTO")).unwrap();
        assert_eq!(recto.curve().unit(), VolumeUnit::Percent);
        assert_eq!(recto.absolute_volume(), None);
    }

    #[test]
    fn test_gray_export_converted_to_centigray() {
        let loader = DvhLoader::new(LoaderConfig::default().with_dose_unit(DoseUnit::Gray));
        let dvh = loader
            .parse(&export(&[("Recto", 0.0, 10.0), ("Recto", 70.0, 0.0)]))
            .unwrap();
        let recto = dvh.get(&StructureLabel::new("RECTO")).unwrap();
        assert_eq!(recto.curve().dose_axis(), &[0.0, 7000.0]);
    }

    #[test]
    fn test_relative_dose_rejected() {
        let loader = DvhLoader::new(LoaderConfig::default().with_dose_unit(DoseUnit::Relative));
        let err = loader.parse(&export(&sample_rows())).unwrap_err();
        assert!(err.is_unit_mismatch());
    }

    #[test]
    fn test_missing_header_tokens() {
        let mut text = export(&sample_rows());
        text = text.replacen("Patient ID: 20123478 Lapera,Roy Plan Name: VMDmBOOST", "DVH", 1);
        let err = DvhLoader::default().parse(&text).unwrap_err();
        assert!(matches!(err, DosePoliceError::MalformedDvh(ref m) if m.contains("patient id")));
    }

    #[test]
    fn test_non_numeric_cell() {
        let mut text = export(&sample_rows());
        text = text.replacen("5000", "abc", 1);
        let err = DvhLoader::default().parse(&text).unwrap_err();
        assert!(
            matches!(err, DosePoliceError::MalformedDvh(ref m) if m.contains("line 5") && m.contains("dose"))
        );
    }

    #[test]
    fn test_missing_column() {
        let text = export(&[]).replacen(
            "-------------------------------------------------\n",
            &format!("-------------------------------------------------\nRecto{}0.0\n", SEP),
            1,
        );
        let err = DvhLoader::default().parse(&text).unwrap_err();
        assert!(matches!(err, DosePoliceError::MalformedDvh(ref m) if m.contains("3 columns")));
    }

    #[test]
    fn test_empty_body() {
        let err = DvhLoader::default().parse(&export(&[])).unwrap_err();
        assert!(matches!(err, DosePoliceError::MalformedDvh(_)));
    }

    #[test]
    fn test_too_short() {
        let err = DvhLoader::default().parse("only\none line\n").unwrap_err();
        assert!(matches!(err, DosePoliceError::MalformedDvh(_)));
    }

    #[test]
    fn test_non_monotonic_structure() {
        let err = DvhLoader::default()
            .parse(&export(&[("Recto", 0.0, 10.0), ("Recto", 100.0, 20.0)]))
            .unwrap_err();
        assert!(matches!(err, DosePoliceError::MalformedCurve(ref m) if m.starts_with("RECTO")));
    }

    #[test]
    fn test_case_variant_labels_get_suffix() {
        let dvh = DvhLoader::default()
            .parse(&export(&[
                ("Recto", 0.0, 50.0),
                ("Recto", 100.0, 0.0),
                ("RECTO", 0.0, 40.0),
                ("RECTO", 100.0, 0.0),
            ]))
            .unwrap();
        let labels: Vec<String> = dvh.labels().iter().map(|l| l.to_string()).collect();
        assert_eq!(labels, vec!["RECTO", "RECTO__2"]);
        assert_eq!(
            dvh.get(&StructureLabel::new("RECTO__2")).unwrap().absolute_volume(),
            Some(40.0)
        );
    }

    #[test]
    fn test_alias_onto_existing_label_gets_suffix() {
        let dvh = DvhLoader::default()
            .parse(&export(&[
                ("Paciente", 0.0, 18000.0),
                ("Paciente", 100.0, 0.0),
                ("Paciente(Unsp.Tiss.)", 0.0, 20000.0),
                ("Paciente(Unsp.Tiss.)", 100.0, 0.0),
            ]))
            .unwrap();
        assert_eq!(
            dvh.get(&StructureLabel::new("PACIENTE")).unwrap().absolute_volume(),
            Some(18000.0)
        );
        assert_eq!(
            dvh.get(&StructureLabel::new("PACIENTE__2")).unwrap().absolute_volume(),
            Some(20000.0)
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(export(&sample_rows()).as_bytes()).unwrap();
        let dvh = DvhLoader::default().load(file.path()).unwrap();
        assert_eq!(dvh.len(), 3);
    }

    #[test]
    fn test_load_missing_file() {
        let err = DvhLoader::default()
            .load("/nonexistent/dvh.txt")
            .unwrap_err();
        assert!(matches!(err, DosePoliceError::Io(_)));
    }
}
