//! Prelude module - common imports for gridcalc users
//!
//! ```rust
//! use gridcalc::prelude::*;
//! ```

pub use crate::{
    // Entry points
    calculate,
    calculate_with_options,
    function_catalog,
    function_info,

    // Grid types
    Cell,
    CellAddress,
    CellError,
    CellRange,
    CellValue,
    Grid,

    // Evaluation types
    EvaluationOptions,
    FormulaValue,
    FunctionCategory,
    FunctionInfo,
};
