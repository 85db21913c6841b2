use std::fmt;

/// Canonical structure label
///
/// Labels are trimmed and upper-cased on construction, so two labels
/// compare equal whenever their source strings match case-insensitively
/// after trimming.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(from = "String", into = "String"))]
pub struct StructureLabel(String);

impl StructureLabel {
    /// Creates a canonical label from free-form text
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_uppercase())
    }

    /// Returns the canonical text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns this label disambiguated with a numeric suffix (`RECTUM__2`)
    pub fn with_suffix(&self, n: usize) -> Self {
        Self(format!("{}__{}", self.0, n))
    }
}

impl fmt::Display for StructureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StructureLabel {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StructureLabel {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

impl From<StructureLabel> for String {
    fn from(label: StructureLabel) -> Self {
        label.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        assert_eq!(StructureLabel::new("  Rectum ").as_str(), "RECTUM");
        assert_eq!(StructureLabel::new("rectum"), StructureLabel::new("RECTUM"));
        assert_eq!(StructureLabel::new(" PTV_Boost\t"), StructureLabel::new("ptv_boost"));
        assert_eq!(StructureLabel::new("   ").as_str(), "");
    }

    #[test]
    fn test_suffix() {
        let label = StructureLabel::new("rectum");
        assert_eq!(label.with_suffix(2).as_str(), "RECTUM__2");
    }
}
