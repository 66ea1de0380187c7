//! # gridcalc-formula
//!
//! Formula parser and evaluator for gridcalc.
//!
//! This crate provides:
//! - Formula parsing (text → AST) with a recursive-descent parser
//! - Formula evaluation (AST → value) against a [`gridcalc_core::Grid`]
//! - A function registry covering the logical, information, database,
//!   financial, engineering and complex-number families
//!
//! ## Example
//!
//! ```rust
//! use gridcalc_core::Grid;
//! use gridcalc_formula::{calculate, FormulaValue};
//!
//! let grid = Grid::from_values(vec![vec![10000.0, 1000.0, 5.0]]);
//! assert_eq!(calculate("=SLN(A1,B1,C1)", &grid, 0, 3), FormulaValue::Number(1800.0));
//! ```

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod parser;

pub use ast::{BinaryOperator, FormulaExpr, UnaryOperator};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{
    calculate, calculate_with_options, evaluate, function_catalog, function_info,
    EvaluationContext, EvaluationOptions, FormulaValue,
};
pub use functions::{FunctionCategory, FunctionInfo};
pub use parser::parse_formula;
