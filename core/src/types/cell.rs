use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Spreadsheet cell coordinate (zero-based row and column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    /// Creates a new zero-based CellRef
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Parses an A1-style reference
    ///
    /// Accepts formats like:
    /// - "A4"
    /// - "g45"
    /// - "AA10"
    /// - "$B$2"
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid A1 reference
    pub fn parse(s: &str) -> Result<Self, String> {
        static REGEX: OnceLock<Regex> = OnceLock::new();
        let re = REGEX.get_or_init(|| {
            Regex::new(r"^\$?([A-Za-z]{1,3})\$?([0-9]+)$").expect("Failed to compile regex")
        });

        let caps = re
            .captures(s.trim())
            .ok_or_else(|| format!("Failed to parse cell reference from '{}'", s))?;

        let col = caps[1]
            .to_ascii_uppercase()
            .bytes()
            .fold(0usize, |acc, b| acc * 26 + (b - b'A' + 1) as usize)
            - 1;

        let row: usize = caps[2]
            .parse()
            .map_err(|e| format!("Failed to parse row number: {}", e))?;
        if row == 0 {
            return Err(format!("Row numbers start at 1 in '{}'", s));
        }

        Ok(CellRef { row: row - 1, col })
    }

    fn column_name(&self) -> String {
        let mut n = self.col + 1;
        let mut name = Vec::new();
        while n > 0 {
            let rem = (n - 1) % 26;
            name.push(b'A' + rem as u8);
            n = (n - 1) / 26;
        }
        name.reverse();
        String::from_utf8_lossy(&name).into_owned()
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column_name(), self.row + 1)
    }
}

/// Rectangular, inclusive cell window a protocol is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetWindow {
    pub top_left: CellRef,
    pub bottom_right: CellRef,
}

impl SheetWindow {
    /// Creates a window from two corners
    ///
    /// # Errors
    ///
    /// Returns an error if `bottom_right` lies above or left of `top_left`
    pub fn new(top_left: CellRef, bottom_right: CellRef) -> Result<Self, String> {
        if bottom_right.row < top_left.row || bottom_right.col < top_left.col {
            return Err(format!(
                "Window corner {} lies before {}",
                bottom_right, top_left
            ));
        }
        Ok(Self {
            top_left,
            bottom_right,
        })
    }

    /// Parses a range like "A4:G45"
    pub fn parse(s: &str) -> Result<Self, String> {
        let (start, end) = s
            .split_once(':')
            .ok_or_else(|| format!("Failed to parse cell range from '{}'", s))?;
        Self::new(CellRef::parse(start)?, CellRef::parse(end)?)
    }
}

impl Default for SheetWindow {
    /// Protocol sheets keep their two blocks inside A4:G45
    fn default() -> Self {
        Self {
            top_left: CellRef::new(3, 0),
            bottom_right: CellRef::new(44, 6),
        }
    }
}

impl fmt::Display for SheetWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.top_left, self.bottom_right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        assert_eq!(CellRef::parse("A4").unwrap(), CellRef::new(3, 0));
        assert_eq!(CellRef::parse("g45").unwrap(), CellRef::new(44, 6));
    }

    #[test]
    fn test_parse_multi_letter_column() {
        assert_eq!(CellRef::parse("AA1").unwrap(), CellRef::new(0, 26));
        assert_eq!(CellRef::parse("$B$2").unwrap(), CellRef::new(1, 1));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(CellRef::parse("").is_err());
        assert!(CellRef::parse("4A").is_err());
        assert!(CellRef::parse("A0").is_err());
        assert!(CellRef::parse("A").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(CellRef::new(44, 6).to_string(), "G45");
        assert_eq!(CellRef::new(0, 27).to_string(), "AB1");
    }

    #[test]
    fn test_default_window() {
        let window = SheetWindow::default();
        assert_eq!(window, SheetWindow::parse("A4:G45").unwrap());
        assert_eq!(window.to_string(), "A4:G45");
    }

    #[test]
    fn test_window_invalid() {
        assert!(SheetWindow::parse("G45:A4").is_err());
        assert!(SheetWindow::parse("A4").is_err());
    }
}
