//! The grid formulas are evaluated against
//!
//! A [`Grid`] is a read-only snapshot of spreadsheet state during
//! evaluation. Cells live in a dense row-major block; individual cells can
//! also be placed by address, which takes precedence over the dense block.
//! Reads outside the populated area resolve to [`CellValue::Empty`].

use crate::cell::{CellAddress, CellRange, CellValue};
use crate::error::{Error, Result};
use ahash::AHashMap;

/// Ranges with more cells than this are read only up to the populated area
pub const MAX_DENSE_RANGE_CELLS: u64 = 1 << 20;

/// A single grid cell
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cell {
    /// Last computed (or literal) value
    pub value: CellValue,
    /// Formula text, when the cell is formula-bearing
    pub formula: Option<String>,
}

impl Cell {
    /// A literal cell
    pub fn new(value: impl Into<CellValue>) -> Self {
        Self {
            value: value.into(),
            formula: None,
        }
    }

    /// A formula cell with its cached display value
    pub fn with_formula(formula: impl Into<String>, value: impl Into<CellValue>) -> Self {
        Self {
            value: value.into(),
            formula: Some(formula.into()),
        }
    }

    /// Whether this cell carries a formula.
    ///
    /// Hosts that store raw formula text as the value (`"=A1+1"`) count too.
    pub fn is_formula(&self) -> bool {
        self.formula.is_some()
            || matches!(&self.value, CellValue::String(s) if s.starts_with('='))
    }
}

/// Spreadsheet grid
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
    #[cfg_attr(feature = "serde", serde(with = "sparse", default))]
    cells: AHashMap<(u32, u32), Cell>,
}

impl Grid {
    /// Create an empty grid
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a grid from rows of values (row 0 is spreadsheet row 1)
    ///
    /// ```
    /// use gridcalc_core::{CellValue, Grid};
    ///
    /// let grid = Grid::from_values(vec![
    ///     vec![CellValue::from("Name"), CellValue::from("Sales")],
    ///     vec![CellValue::from("Alice"), CellValue::from(100.0)],
    /// ]);
    /// assert_eq!(grid.value(1, 1), CellValue::Number(100.0));
    /// ```
    pub fn from_values<R, V>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(Cell::new).collect())
            .collect();
        Self {
            rows,
            cells: AHashMap::new(),
        }
    }

    /// Build a grid from rows of cells
    pub fn from_cells(rows: Vec<Vec<Cell>>) -> Self {
        Self {
            rows,
            cells: AHashMap::new(),
        }
    }

    /// Number of rows in the dense block
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get a cell by 0-based row/column
    pub fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        if let Some(cell) = self.cells.get(&(row, col)) {
            return Some(cell);
        }
        self.rows
            .get(row as usize)
            .and_then(|r| r.get(col as usize))
    }

    /// The value formulas see at a position
    pub fn value(&self, row: u32, col: u32) -> CellValue {
        self.cell(row, col)
            .map(|c| c.value.normalized())
            .unwrap_or_default()
    }

    /// Set a literal value at a position
    pub fn set_value(&mut self, row: u32, col: u32, value: impl Into<CellValue>) {
        self.put(row, col, Cell::new(value));
    }

    /// Set a formula cell (with its cached value) at a position
    pub fn set_formula(
        &mut self,
        row: u32,
        col: u32,
        formula: impl Into<String>,
        value: impl Into<CellValue>,
    ) {
        self.put(row, col, Cell::with_formula(formula, value));
    }

    /// Place a cell by A1 address
    pub fn insert_cell(&mut self, address: &str, cell: Cell) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.cells.insert((addr.row, addr.col), cell);
        Ok(())
    }

    fn put(&mut self, row: u32, col: u32, cell: Cell) {
        // Addressed cells shadow the dense block, so keep one source of truth
        self.cells.remove(&(row, col));

        let (r, c) = (row as usize, col as usize);
        if self.rows.len() <= r {
            self.rows.resize_with(r + 1, Vec::new);
        }
        let row_cells = &mut self.rows[r];
        if row_cells.len() <= c {
            row_cells.resize_with(c + 1, Cell::default);
        }
        row_cells[c] = cell;
    }

    /// Resolve a single A1 address to its value
    pub fn resolve_cell(&self, address: &str) -> Result<CellValue> {
        let addr = CellAddress::parse(address)?;
        Ok(self.value(addr.row, addr.col))
    }

    /// Resolve a range to its values, flattened row-major
    pub fn resolve_range(&self, range: &str) -> Result<Vec<CellValue>> {
        let range = CellRange::parse(range).map_err(|_| Error::InvalidRange(range.to_string()))?;
        Ok(self
            .clip(&range)
            .cells()
            .map(|addr| self.value(addr.row, addr.col))
            .collect())
    }

    /// Values of a range, keeping their 2-D shape
    ///
    /// Ranges above [`MAX_DENSE_RANGE_CELLS`] lose their trailing rows and
    /// columns past the populated area; those would all read as Empty.
    pub fn range_values(&self, range: &CellRange) -> Vec<Vec<CellValue>> {
        let range = self.clip(range);
        (range.start.row..=range.end.row)
            .map(|row| {
                (range.start.col..=range.end.col)
                    .map(|col| self.value(row, col))
                    .collect()
            })
            .collect()
    }

    /// Last populated `(row, col)`, or `None` for an empty grid
    pub fn used_extent(&self) -> Option<(u32, u32)> {
        let dense_row = self.rows.iter().rposition(|r| !r.is_empty());
        let dense_col = self.rows.iter().map(Vec::len).max().filter(|&n| n > 0);
        let dense = dense_row
            .zip(dense_col)
            .map(|(r, c)| (r as u32, (c - 1) as u32));

        self.cells
            .keys()
            .copied()
            .chain(dense)
            .reduce(|(r1, c1), (r2, c2)| (r1.max(r2), c1.max(c2)))
    }

    fn clip(&self, range: &CellRange) -> CellRange {
        if range.cell_count() <= MAX_DENSE_RANGE_CELLS {
            return *range;
        }
        let (last_row, last_col) = self.used_extent().unwrap_or((0, 0));
        CellRange::from_indices(
            range.start.row,
            range.start.col,
            range.end.row.min(last_row.max(range.start.row)),
            range.end.col.min(last_col.max(range.start.col)),
        )
    }
}

#[cfg(feature = "serde")]
mod sparse {
    use super::Cell;
    use ahash::AHashMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        cells: &AHashMap<(u32, u32), Cell>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut entries: Vec<_> = cells.iter().collect();
        entries.sort_by_key(|(pos, _)| **pos);
        entries.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<AHashMap<(u32, u32), Cell>, D::Error> {
        let entries: Vec<((u32, u32), Cell)> = Vec::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellError;
    use pretty_assertions::assert_eq;

    fn sample() -> Grid {
        Grid::from_values(vec![
            vec![CellValue::from(1.0), CellValue::from("a")],
            vec![CellValue::from(true), CellValue::Empty],
            vec![CellValue::from(3.0), CellValue::from("#N/A")],
        ])
    }

    #[test]
    fn test_resolve_cell() {
        let grid = sample();
        assert_eq!(grid.resolve_cell("A1").unwrap(), CellValue::Number(1.0));
        assert_eq!(grid.resolve_cell("$B$1").unwrap(), CellValue::string("a"));
        assert_eq!(grid.resolve_cell("A2").unwrap(), CellValue::Boolean(true));
    }

    #[test]
    fn test_out_of_bounds_is_empty() {
        let grid = sample();
        assert_eq!(grid.resolve_cell("Z100").unwrap(), CellValue::Empty);
        assert_eq!(grid.value(u32::MAX, u32::MAX), CellValue::Empty);
    }

    #[test]
    fn test_malformed_address() {
        let grid = sample();
        assert!(matches!(
            grid.resolve_cell("1A"),
            Err(Error::InvalidAddress(_))
        ));
        assert!(matches!(
            grid.resolve_range("A1:??"),
            Err(Error::InvalidRange(_))
        ));
    }

    #[test]
    fn test_resolve_range_row_major() {
        let grid = sample();
        assert_eq!(
            grid.resolve_range("A1:B2").unwrap(),
            vec![
                CellValue::Number(1.0),
                CellValue::string("a"),
                CellValue::Boolean(true),
                CellValue::Empty,
            ]
        );
    }

    #[test]
    fn test_whole_sheet_ranges_stop_at_used_extent() {
        let mut grid = sample();
        assert_eq!(grid.used_extent(), Some((2, 1)));

        let sheet = CellRange::parse("A1:XFD1048576").unwrap();
        assert_eq!(grid.range_values(&sheet).len(), 3);
        assert_eq!(grid.resolve_range("A1:XFD1048576").unwrap().len(), 6);

        grid.insert_cell("E7", Cell::new(1.0)).unwrap();
        assert_eq!(grid.used_extent(), Some((6, 4)));
        let values = grid.range_values(&sheet);
        assert_eq!((values.len(), values[0].len()), (7, 5));

        // Small ranges keep their full shape
        let small = CellRange::parse("A1:C20").unwrap();
        assert_eq!(grid.range_values(&small).len(), 20);
        assert_eq!(Grid::new().used_extent(), None);
    }

    #[test]
    fn test_error_text_reads_as_error() {
        let grid = sample();
        assert_eq!(
            grid.resolve_cell("B3").unwrap(),
            CellValue::Error(CellError::Na)
        );
    }

    #[test]
    fn test_addressed_cells_take_precedence() {
        let mut grid = sample();
        grid.insert_cell("A1", Cell::new(99.0)).unwrap();
        grid.insert_cell("D10", Cell::with_formula("=A1*2", 198.0))
            .unwrap();

        assert_eq!(grid.value(0, 0), CellValue::Number(99.0));
        assert_eq!(grid.resolve_cell("D10").unwrap(), CellValue::Number(198.0));
        assert!(grid.cell(9, 3).is_some_and(Cell::is_formula));

        grid.set_value(0, 0, 5.0);
        assert_eq!(grid.value(0, 0), CellValue::Number(5.0));
    }

    #[test]
    fn test_set_grows_grid() {
        let mut grid = Grid::new();
        grid.set_formula(2, 3, "=1+1", 2.0);
        assert_eq!(grid.row_count(), 3);
        assert_eq!(grid.resolve_cell("D3").unwrap(), CellValue::Number(2.0));
        assert_eq!(grid.resolve_cell("C3").unwrap(), CellValue::Empty);
    }

    #[test]
    fn test_formula_detection() {
        assert!(Cell::new("=SUM(A1:A3)").is_formula());
        assert!(!Cell::new("plain").is_formula());
        assert!(Cell::with_formula("=1", 1.0).is_formula());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_round_trip() {
        let mut grid = sample();
        grid.insert_cell("C7", Cell::with_formula("=A1", 1.0)).unwrap();

        let json = serde_json::to_string(&grid).unwrap();
        let back: Grid = serde_json::from_str(&json).unwrap();
        assert_eq!(back.resolve_range("A1:B3").unwrap(), grid.resolve_range("A1:B3").unwrap());
        assert_eq!(back.cell(6, 2), grid.cell(6, 2));
    }
}
