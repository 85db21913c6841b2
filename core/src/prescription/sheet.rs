use crate::types::{CellRef, SheetWindow};

/// Rectangular grid of optional text cells
///
/// Cells are trimmed on construction; empty cells and the literal `None`
/// (what spreadsheet exports write for blank cells) become `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    rows: Vec<Vec<Option<String>>>,
}

impl Sheet {
    /// Creates a sheet from raw rows
    pub fn new<S: AsRef<str>>(rows: &[Vec<S>]) -> Self {
        Self {
            rows: rows
                .iter()
                .map(|row| row.iter().map(|cell| normalize(cell.as_ref())).collect())
                .collect(),
        }
    }

    /// Parses delimiter-separated text, one row per line
    ///
    /// A cell wrapped in double quotes may contain the delimiter, and `""`
    /// inside it stands for one quote, so `"0,03"` in a comma-separated
    /// export stays a single cell.
    pub fn from_delimited(text: &str, delimiter: char) -> Self {
        let rows: Vec<Vec<String>> = text
            .lines()
            .map(|line| split_record(line, delimiter))
            .collect();
        Self::new(&rows)
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Returns the text of a cell, `None` when blank or out of range
    pub fn cell(&self, at: CellRef) -> Option<&str> {
        self.rows
            .get(at.row)
            .and_then(|row| row.get(at.col))
            .and_then(|cell| cell.as_deref())
    }

    /// Copies the cells inside `window`, padding with blanks
    pub fn window(&self, window: &SheetWindow) -> Sheet {
        let rows = (window.top_left.row..=window.bottom_right.row)
            .map(|row| {
                (window.top_left.col..=window.bottom_right.col)
                    .map(|col| self.cell(CellRef::new(row, col)).map(str::to_string))
                    .collect()
            })
            .collect();
        Sheet { rows }
    }

    /// Splits into runs of rows separated by fully blank rows
    pub fn blocks(&self) -> Vec<Sheet> {
        let mut blocks = Vec::new();
        let mut current: Vec<Vec<Option<String>>> = Vec::new();

        for row in &self.rows {
            if row.iter().all(Option::is_none) {
                if !current.is_empty() {
                    blocks.push(Sheet {
                        rows: std::mem::take(&mut current),
                    });
                }
            } else {
                current.push(row.clone());
            }
        }
        if !current.is_empty() {
            blocks.push(Sheet { rows: current });
        }

        blocks
    }
}

fn split_record(line: &str, delimiter: char) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                cell.push('"');
                chars.next();
            }
            '"' if quoted => quoted = false,
            '"' if cell.trim().is_empty() => {
                cell.clear();
                quoted = true;
            }
            c if c == delimiter && !quoted => cells.push(std::mem::take(&mut cell)),
            c => cell.push(c),
        }
    }
    cells.push(cell);
    cells
}

fn normalize(cell: &str) -> Option<String> {
    let cell = cell.trim();
    if cell.is_empty() || cell == "None" {
        None
    } else {
        Some(cell.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Sheet {
        Sheet::from_delimited(
            "Protocol\tPROSTATA\n\
             \n\
             \n\
             Target\tTotal\tFraction\n\
             PTV\t7000\t200\n\
             \t\t\n\
             #\tStructure\tType\n\
             1\tRectum\tDmax\t7500\n",
            '\t',
        )
    }

    #[test]
    fn test_normalizes_cells() {
        let sheet = Sheet::new(&[vec![" a ", "", "None", "b"]]);
        assert_eq!(
            sheet.rows()[0],
            vec![Some("a".to_string()), None, None, Some("b".to_string())]
        );
    }

    #[test]
    fn test_cell_lookup() {
        let sheet = grid();
        assert_eq!(sheet.cell(CellRef::parse("B1").unwrap()), Some("PROSTATA"));
        assert_eq!(sheet.cell(CellRef::parse("A2").unwrap()), None);
        assert_eq!(sheet.cell(CellRef::parse("Z99").unwrap()), None);
        assert_eq!(sheet.height(), 8);
    }

    #[test]
    fn test_window_pads_and_crops() {
        let window = SheetWindow::parse("A4:E10").unwrap();
        let sub = grid().window(&window);
        assert_eq!(sub.height(), 7);
        assert!(sub.rows().iter().all(|r| r.len() == 5));
        assert_eq!(sub.cell(CellRef::new(0, 0)), Some("Target"));
        assert_eq!(sub.cell(CellRef::new(4, 3)), Some("7500"));
    }

    #[test]
    fn test_blocks_split_on_blank_rows() {
        let blocks = grid().window(&SheetWindow::default()).blocks();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].height(), 2);
        assert_eq!(blocks[1].height(), 2);
        assert_eq!(blocks[1].cell(CellRef::new(1, 1)), Some("Rectum"));
    }

    #[test]
    fn test_quoted_cells_keep_delimiter() {
        let sheet = Sheet::from_delimited(
            "1,Recto,\"D(V_cc)<D\",\"0,03\",7500\n2,\"Say \"\"hi\"\"\",,\"\"\n",
            ',',
        );
        assert_eq!(sheet.cell(CellRef::parse("C1").unwrap()), Some("D(V_cc)<D"));
        assert_eq!(sheet.cell(CellRef::parse("D1").unwrap()), Some("0,03"));
        assert_eq!(sheet.cell(CellRef::parse("E1").unwrap()), Some("7500"));
        assert_eq!(sheet.cell(CellRef::parse("B2").unwrap()), Some("Say \"hi\""));
        assert_eq!(sheet.cell(CellRef::parse("C2").unwrap()), None);
        assert_eq!(sheet.cell(CellRef::parse("D2").unwrap()), None);
        assert_eq!(sheet.rows()[1].len(), 4);
    }

    #[test]
    fn test_blocks_of_empty_sheet() {
        assert!(Sheet::default().blocks().is_empty());
    }
}
