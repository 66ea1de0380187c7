//! # gridcalc
//!
//! An Excel-compatible spreadsheet formula engine.
//!
//! gridcalc evaluates a formula string against a read-only [`Grid`] of cell
//! values and returns a [`FormulaValue`]: a number, text, boolean, array or
//! one of the standard error codes (`#VALUE!`, `#N/A`, ...).
//!
//! ## Features
//!
//! - Logical and information functions (`IF`, `IFS`, `SWITCH`, `ISBLANK`, `CELL`, ...)
//! - Database functions with criteria tables (`DSUM`, `DAVERAGE`, `DGET`, ...)
//! - Financial functions (`PMT`, `RATE`, `IRR`, `XIRR`, `DB`, `VDB`, ...)
//! - Engineering functions (`DEC2BIN`, `CONVERT`, `BITAND`, `ERF`, ...)
//! - Complex numbers (`COMPLEX`, `IMSUM`, `IMPOWER`, `IMSIN`, ...)
//! - Function metadata for UI display ([`function_catalog`])
//!
//! ## Example
//!
//! ```rust
//! use gridcalc::prelude::*;
//!
//! let grid = Grid::from_values(vec![
//!     vec![CellValue::from("Department"), CellValue::from("Salary")],
//!     vec![CellValue::from("Sales"), CellValue::from(50000.0)],
//!     vec![CellValue::from("Engineering"), CellValue::from(65000.0)],
//!     vec![CellValue::from("Sales"), CellValue::from(45000.0)],
//! ]);
//!
//! assert_eq!(
//!     calculate("=IF(B2>B4,\"Yes\",\"No\")", &grid, 0, 2),
//!     FormulaValue::String("Yes".into())
//! );
//! assert_eq!(calculate("=PMT(0,10,1000)", &grid, 0, 2), FormulaValue::Number(-100.0));
//! assert_eq!(calculate("=1/0", &grid, 0, 2).to_string(), "#DIV/0!");
//! ```

pub mod prelude;

// Re-export core types
pub use gridcalc_core::{Cell, CellAddress, CellError, CellRange, CellValue, Error, Grid, Result};

// Re-export formula types
pub use gridcalc_formula::{
    calculate, calculate_with_options, evaluate, function_catalog, function_info, parse_formula,
    EvaluationContext, EvaluationOptions, FormulaError, FormulaExpr, FormulaResult, FormulaValue,
    FunctionCategory, FunctionInfo,
};
