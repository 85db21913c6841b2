use thiserror::Error;

/// Result type for dosepolice operations
pub type Result<T> = std::result::Result<T, DosePoliceError>;

/// Error types for dosepolice operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DosePoliceError {
    /// DVH export could not be parsed
    #[error("Malformed DVH: {0}")]
    MalformedDvh(String),

    /// Dose/volume axes violate the curve invariants
    #[error("Malformed curve: {0}")]
    MalformedCurve(String),

    /// Prescription sheet could not be turned into a protocol
    #[error("Malformed prescription: {0}")]
    MalformedPrescription(String),

    /// Relative units where an absolute measurement is required
    #[error("Unit mismatch: {0}")]
    UnitMismatch(String),

    /// Prescription structure with no DVH counterpart
    #[error("Unresolved structure: {0}")]
    UnresolvedStructure(String),

    /// Constraint kind outside the known taxonomy
    #[error("Unknown constraint kind: {0}")]
    UnknownConstraintKind(String),

    /// A threshold the constraint kind needs is blank
    #[error("Missing threshold: {0}")]
    MissingThreshold(String),

    /// Mean dose requested for a structure without volume
    #[error("Undefined mean dose: {0}")]
    UndefinedMeanDose(String),

    /// Reconciliation cache could not be read or written
    #[error("Cache error: {0}")]
    Cache(String),

    /// Generic evaluation error
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(String),
}

// Helper conversions
impl From<String> for DosePoliceError {
    fn from(s: String) -> Self {
        DosePoliceError::Evaluation(s)
    }
}

impl From<&str> for DosePoliceError {
    fn from(s: &str) -> Self {
        DosePoliceError::Evaluation(s.to_string())
    }
}

impl From<std::io::Error> for DosePoliceError {
    fn from(e: std::io::Error) -> Self {
        DosePoliceError::Io(format!("{}", e))
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for DosePoliceError {
    fn from(e: serde_json::Error) -> Self {
        DosePoliceError::Cache(format!("{}", e))
    }
}

impl DosePoliceError {
    /// Whether this error belongs to the unit-mismatch category
    ///
    /// Unit mismatches are user-actionable (supply a volume, re-export
    /// the DVH in absolute dose) and are reported separately from
    /// malformed input.
    pub fn is_unit_mismatch(&self) -> bool {
        matches!(self, DosePoliceError::UnitMismatch(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DosePoliceError::UnknownConstraintKind("V(D)=V".to_string());
        assert_eq!(err.to_string(), "Unknown constraint kind: V(D)=V");
    }

    #[test]
    fn test_string_conversion() {
        let err: DosePoliceError = "boom".into();
        assert_eq!(err, DosePoliceError::Evaluation("boom".to_string()));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.txt");
        let err: DosePoliceError = io.into();
        assert!(matches!(err, DosePoliceError::Io(ref m) if m.contains("missing.txt")));
        assert!(!err.is_unit_mismatch());
    }
}
