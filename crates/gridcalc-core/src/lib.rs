//! # gridcalc-core
//!
//! Core data structures for the gridcalc formula engine.
//!
//! This crate provides the read-only spreadsheet snapshot that formulas are
//! evaluated against:
//! - [`CellValue`] and [`CellError`] - cell values and the closed set of error codes
//! - [`CellAddress`] and [`CellRange`] - A1-style addressing and ranges
//! - [`Cell`] and [`Grid`] - the 2-D grid and reference resolution
//!
//! ## Example
//!
//! ```rust
//! use gridcalc_core::{CellValue, Grid};
//!
//! let mut grid = Grid::new();
//! grid.set_value(0, 0, 42.0);
//! grid.set_value(0, 1, "hello");
//!
//! assert_eq!(grid.resolve_cell("A1").unwrap(), CellValue::Number(42.0));
//! assert_eq!(grid.resolve_cell("Z99").unwrap(), CellValue::Empty);
//! ```

pub mod cell;
pub mod error;
pub mod grid;

pub use cell::{CellAddress, CellError, CellRange, CellValue};
pub use error::{Error, Result};
pub use grid::{Cell, Grid};
