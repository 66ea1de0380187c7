//! Formula error types

use gridcalc_core::CellError;
use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Internal failures raised while parsing or evaluating a formula
///
/// These never reach the host directly: the evaluator turns them into a
/// [`CellError`] with [`FormulaError::to_cell_error`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormulaError {
    /// Formula parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Formula evaluation error
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// Unknown function
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Reference to invalid cell
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// A spreadsheet error raised by a function body
    #[error("{0}")]
    Cell(#[from] CellError),

    /// Nesting deeper than the configured limit
    #[error("Formula nesting exceeds the limit of {0}")]
    DepthExceeded(usize),
}

impl FormulaError {
    /// The spreadsheet error this failure surfaces as
    pub fn to_cell_error(&self) -> CellError {
        match self {
            FormulaError::Cell(e) => *e,
            FormulaError::UnknownFunction(_) => CellError::Name,
            FormulaError::InvalidReference(_) => CellError::Ref,
            _ => CellError::Value,
        }
    }
}

impl From<gridcalc_core::Error> for FormulaError {
    fn from(e: gridcalc_core::Error) -> Self {
        FormulaError::InvalidReference(e.to_string())
    }
}
