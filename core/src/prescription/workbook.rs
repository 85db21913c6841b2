use crate::error::{DosePoliceError, Result};
use crate::prescription::sheet::Sheet;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Source of protocol sheets, one sheet per protocol name
pub trait PrescriptionSource {
    /// Protocol names available in the source, sorted
    fn protocols(&self) -> Result<Vec<String>>;

    /// Returns the sheet of a protocol (name matched case-insensitively)
    fn sheet(&self, protocol: &str) -> Result<Sheet>;
}

/// Workbook stored as a directory of delimited text files
///
/// Each `<PROTOCOL>.tsv` file holds one protocol sheet, as written by a
/// spreadsheet's per-sheet text export.
#[derive(Debug, Clone)]
pub struct DelimitedWorkbook {
    dir: PathBuf,
    extension: String,
    delimiter: char,
}

impl DelimitedWorkbook {
    /// Opens a directory of tab-separated sheets
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(DosePoliceError::MalformedPrescription(format!(
                "workbook directory {} does not exist",
                dir.display()
            )));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            extension: "tsv".to_string(),
            delimiter: '\t',
        })
    }

    /// Uses a different file extension and cell delimiter (e.g. `csv`, `,`)
    pub fn with_format(mut self, extension: &str, delimiter: char) -> Self {
        self.extension = extension.trim_start_matches('.').to_string();
        self.delimiter = delimiter;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn sheet_files(&self) -> Result<Vec<(String, PathBuf)>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let matches_extension = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension));
            if !matches_extension {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                files.push((stem.to_uppercase(), path));
            }
        }
        files.sort();
        Ok(files)
    }
}

impl PrescriptionSource for DelimitedWorkbook {
    fn protocols(&self) -> Result<Vec<String>> {
        Ok(self
            .sheet_files()?
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    fn sheet(&self, protocol: &str) -> Result<Sheet> {
        let wanted = protocol.trim().to_uppercase();
        let path = self
            .sheet_files()?
            .into_iter()
            .find(|(name, _)| *name == wanted)
            .map(|(_, path)| path)
            .ok_or_else(|| {
                DosePoliceError::MalformedPrescription(format!(
                    "protocol {} not found in {}",
                    wanted,
                    self.dir.display()
                ))
            })?;

        debug!("Reading protocol sheet {}", path.display());
        let text = fs::read_to_string(&path)?;
        Ok(Sheet::from_delimited(&text, self.delimiter))
    }
}
