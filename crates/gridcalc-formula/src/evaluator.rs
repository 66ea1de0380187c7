//! Formula evaluator
//!
//! Evaluates formula ASTs against a [`Grid`] to produce values.

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::{FunctionImpl, FunctionInfo, FunctionRegistry};
use crate::parser::parse_formula;
use gridcalc_core::{Cell, CellAddress, CellError, CellRange, CellValue, Grid};
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

/// Global function registry (lazily initialized)
static FUNCTION_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

pub(crate) fn get_function_registry() -> &'static FunctionRegistry {
    FUNCTION_REGISTRY.get_or_init(FunctionRegistry::new)
}

/// Value types during formula evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Number(f64),
    String(String),
    Boolean(bool),
    Error(CellError),
    /// Range or array literal, rows of columns
    Array(Vec<Vec<FormulaValue>>),
    Empty,
}

static EMPTY: FormulaValue = FormulaValue::Empty;

/// Parse text as a number the way formulas coerce it ("12", " 1.5e3 ")
pub(crate) fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

impl FormulaValue {
    /// Convert to number, if possible
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FormulaValue::Number(n) => Some(*n),
            FormulaValue::Boolean(true) => Some(1.0),
            FormulaValue::Boolean(false) => Some(0.0),
            FormulaValue::String(s) => parse_number(s),
            FormulaValue::Empty => Some(0.0),
            FormulaValue::Array(_) => self.scalar().as_number(),
            FormulaValue::Error(_) => None,
        }
    }

    /// Force conversion to number; errors propagate as themselves
    pub fn to_number(&self) -> FormulaResult<f64> {
        match self.scalar() {
            FormulaValue::Error(e) => Err(FormulaError::Cell(*e)),
            v => v.as_number().ok_or(FormulaError::Cell(CellError::Value)),
        }
    }

    /// Convert to boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FormulaValue::Boolean(b) => Some(*b),
            FormulaValue::Number(n) => Some(*n != 0.0),
            FormulaValue::String(s) => {
                if s.eq_ignore_ascii_case("TRUE") {
                    Some(true)
                } else if s.eq_ignore_ascii_case("FALSE") {
                    Some(false)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Convert to string
    pub fn as_string(&self) -> String {
        match self {
            FormulaValue::Number(n) => format_number(*n),
            FormulaValue::String(s) => s.clone(),
            FormulaValue::Boolean(true) => "TRUE".to_string(),
            FormulaValue::Boolean(false) => "FALSE".to_string(),
            FormulaValue::Error(e) => e.to_string(),
            FormulaValue::Empty => String::new(),
            FormulaValue::Array(_) => self.scalar().as_string(),
        }
    }

    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        matches!(self, FormulaValue::Error(_))
    }

    /// Get the error if this is one
    pub fn get_error(&self) -> Option<CellError> {
        match self {
            FormulaValue::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// The single value a range stands for where one value is expected:
    /// its top-left element (empty ranges read as empty)
    pub fn scalar(&self) -> &FormulaValue {
        match self {
            FormulaValue::Array(rows) => rows
                .first()
                .and_then(|r| r.first())
                .map_or(&EMPTY, FormulaValue::scalar),
            v => v,
        }
    }

    /// Iterate over every leaf value, flattening arrays row-major
    pub fn values(&self) -> Box<dyn Iterator<Item = &FormulaValue> + '_> {
        match self {
            FormulaValue::Array(rows) => Box::new(rows.iter().flatten().flat_map(|v| v.values())),
            v => Box::new(std::iter::once(v)),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        // -0 prints as 0
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for FormulaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl From<CellValue> for FormulaValue {
    fn from(value: CellValue) -> Self {
        match value.normalized() {
            CellValue::Empty => FormulaValue::Empty,
            CellValue::Number(n) => FormulaValue::Number(n),
            CellValue::String(s) => FormulaValue::String(s),
            CellValue::Boolean(b) => FormulaValue::Boolean(b),
            CellValue::Error(e) => FormulaValue::Error(e),
        }
    }
}

impl From<FormulaValue> for CellValue {
    fn from(value: FormulaValue) -> Self {
        match value {
            FormulaValue::Empty => CellValue::Empty,
            FormulaValue::Number(n) => CellValue::Number(n),
            FormulaValue::String(s) => CellValue::String(s),
            FormulaValue::Boolean(b) => CellValue::Boolean(b),
            FormulaValue::Error(e) => CellValue::Error(e),
            FormulaValue::Array(_) => CellValue::Error(CellError::Value),
        }
    }
}

/// Evaluation options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationOptions {
    /// Deepest function-call nesting evaluated before giving up with #VALUE!
    pub max_depth: usize,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self { max_depth: 64 }
    }
}

/// Context for formula evaluation
#[derive(Clone, Copy)]
pub struct EvaluationContext<'a> {
    /// Grid cell references resolve against
    pub grid: &'a Grid,
    /// Row of the cell holding the formula (0-based)
    pub current_row: u32,
    /// Column of the cell holding the formula (0-based)
    pub current_col: u32,
    /// Function-call nesting depth of the expression being evaluated
    pub depth: usize,
    pub options: EvaluationOptions,
}

impl<'a> EvaluationContext<'a> {
    /// Create a new evaluation context
    pub fn new(grid: &'a Grid, row: u32, col: u32) -> Self {
        Self::with_options(grid, row, col, EvaluationOptions::default())
    }

    /// Create a context with explicit options
    pub fn with_options(grid: &'a Grid, row: u32, col: u32, options: EvaluationOptions) -> Self {
        Self {
            grid,
            current_row: row,
            current_col: col,
            depth: 0,
            options,
        }
    }

    /// Get a cell value from the grid
    pub fn get_cell_value(&self, address: &CellAddress) -> FormulaValue {
        self.grid.value(address.row, address.col).into()
    }

    /// Get the raw cell (value plus formula) at an address
    pub fn get_cell(&self, address: &CellAddress) -> Option<&'a Cell> {
        self.grid.cell(address.row, address.col)
    }

    /// Get a range of cell values as an array
    pub fn get_range_values(&self, range: &CellRange) -> FormulaValue {
        FormulaValue::Array(
            self.grid
                .range_values(range)
                .into_iter()
                .map(|row| row.into_iter().map(FormulaValue::from).collect())
                .collect(),
        )
    }

    /// Context one function call deeper
    fn deeper(&self) -> Self {
        Self {
            depth: self.depth + 1,
            ..*self
        }
    }

    /// Evaluate an expression, turning internal failures into error values
    pub fn evaluate(&self, expr: &FormulaExpr) -> FormulaValue {
        evaluate(expr, self).unwrap_or_else(|e| FormulaValue::Error(e.to_cell_error()))
    }
}

/// Evaluate a formula string against a grid
///
/// `row`/`col` locate the cell holding the formula (0-based). The leading
/// `=` is optional. Failures never escape: they come back as error values.
///
/// ```
/// use gridcalc_core::Grid;
/// use gridcalc_formula::{calculate, FormulaValue};
///
/// let grid = Grid::from_values(vec![vec![10.0, 5.0]]);
/// assert_eq!(
///     calculate("=IF(A1>B1,\"Yes\",\"No\")", &grid, 0, 2),
///     FormulaValue::String("Yes".into())
/// );
/// ```
pub fn calculate(formula: &str, grid: &Grid, row: u32, col: u32) -> FormulaValue {
    calculate_with_options(formula, grid, row, col, EvaluationOptions::default())
}

/// [`calculate`] with explicit [`EvaluationOptions`]
pub fn calculate_with_options(
    formula: &str,
    grid: &Grid,
    row: u32,
    col: u32,
    options: EvaluationOptions,
) -> FormulaValue {
    let ast = match parse_formula(formula) {
        Ok(ast) => ast,
        Err(e) => {
            log::debug!("failed to parse {:?}: {}", formula, e);
            return FormulaValue::Error(unknown_name_or_value(formula, &e));
        }
    };
    let ctx = EvaluationContext::with_options(grid, row, col, options);
    ctx.evaluate(&ast)
}

/// Parse failures are #VALUE!, except a call to a name nobody registered
fn unknown_name_or_value(formula: &str, err: &FormulaError) -> CellError {
    if let FormulaError::DepthExceeded(_) = err {
        return CellError::Value;
    }
    let text = formula.trim().trim_start_matches('=').trim_start();
    let name: String = text
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '_')
        .collect();
    let is_call = text[name.len()..].trim_start().starts_with('(');
    if is_call && !name.is_empty() && get_function_registry().get(&name).is_none() {
        CellError::Name
    } else {
        CellError::Value
    }
}

/// Metadata for a registered function, for UI display
pub fn function_info(name: &str) -> Option<FunctionInfo> {
    get_function_registry().get(name).map(FunctionInfo::from)
}

/// Metadata for every registered function, sorted by name
pub fn function_catalog() -> Vec<FunctionInfo> {
    get_function_registry().catalog()
}

/// Evaluate a formula expression
pub fn evaluate(expr: &FormulaExpr, ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    match expr {
        // === Literals ===
        FormulaExpr::Number(n) => Ok(FormulaValue::Number(*n)),
        FormulaExpr::String(s) => Ok(FormulaValue::String(s.clone())),
        FormulaExpr::Boolean(b) => Ok(FormulaValue::Boolean(*b)),
        FormulaExpr::Error(e) => Ok(FormulaValue::Error(*e)),
        FormulaExpr::Missing => Ok(FormulaValue::Empty),

        // === References ===
        FormulaExpr::CellRef(address) => Ok(ctx.get_cell_value(address)),
        FormulaExpr::RangeRef(range) => Ok(ctx.get_range_values(range)),
        FormulaExpr::NameRef(_) => Ok(FormulaValue::Error(CellError::Name)),

        // === Operators ===
        FormulaExpr::BinaryOp { op, left, right } => evaluate_binary_op(*op, left, right, ctx),
        FormulaExpr::UnaryOp { op, operand } => evaluate_unary_op(*op, operand, ctx),

        // === Functions ===
        FormulaExpr::Function { name, args } => Ok(evaluate_function(name, args, ctx)),

        // === Arrays ===
        FormulaExpr::Array(rows) => {
            let mut result_rows = Vec::with_capacity(rows.len());
            for row in rows {
                let mut result_row = Vec::with_capacity(row.len());
                for expr in row {
                    result_row.push(evaluate(expr, ctx)?);
                }
                result_rows.push(result_row);
            }
            Ok(FormulaValue::Array(result_rows))
        }
    }
}

/// Reduce an operand to a single value; multi-cell ranges are #VALUE!
fn operand(value: FormulaValue) -> FormulaValue {
    match value {
        FormulaValue::Array(rows) => match rows.as_slice() {
            [row] if row.len() == 1 => row[0].clone(),
            _ => FormulaValue::Error(CellError::Value),
        },
        v => v,
    }
}

/// Evaluate a binary operation
fn evaluate_binary_op(
    op: BinaryOperator,
    left: &FormulaExpr,
    right: &FormulaExpr,
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    if op == BinaryOperator::Range {
        // Only reference:reference forms a range, and the parser builds those itself
        return Ok(FormulaValue::Error(CellError::Ref));
    }

    let left_val = operand(evaluate(left, ctx)?);
    let right_val = operand(evaluate(right, ctx)?);

    if let Some(e) = left_val.get_error() {
        return Ok(FormulaValue::Error(e));
    }
    if let Some(e) = right_val.get_error() {
        return Ok(FormulaValue::Error(e));
    }

    let result = match op {
        BinaryOperator::Add
        | BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Power => {
            let (l, r) = match (left_val.as_number(), right_val.as_number()) {
                (Some(l), Some(r)) => (l, r),
                _ => return Ok(FormulaValue::Error(CellError::Value)),
            };
            arithmetic(op, l, r)
        }

        BinaryOperator::Equal => {
            FormulaValue::Boolean(compare_values(&left_val, &right_val) == Ordering::Equal)
        }
        BinaryOperator::NotEqual => {
            FormulaValue::Boolean(compare_values(&left_val, &right_val) != Ordering::Equal)
        }
        BinaryOperator::LessThan => {
            FormulaValue::Boolean(compare_values(&left_val, &right_val) == Ordering::Less)
        }
        BinaryOperator::LessEqual => {
            FormulaValue::Boolean(compare_values(&left_val, &right_val) != Ordering::Greater)
        }
        BinaryOperator::GreaterThan => {
            FormulaValue::Boolean(compare_values(&left_val, &right_val) == Ordering::Greater)
        }
        BinaryOperator::GreaterEqual => {
            FormulaValue::Boolean(compare_values(&left_val, &right_val) != Ordering::Less)
        }

        BinaryOperator::Concat => {
            FormulaValue::String(left_val.as_string() + &right_val.as_string())
        }

        BinaryOperator::Range => FormulaValue::Error(CellError::Ref),
    };

    Ok(result)
}

fn arithmetic(op: BinaryOperator, l: f64, r: f64) -> FormulaValue {
    let result = match op {
        BinaryOperator::Add => l + r,
        BinaryOperator::Subtract => l - r,
        BinaryOperator::Multiply => l * r,
        BinaryOperator::Divide => {
            if r == 0.0 {
                return FormulaValue::Error(CellError::Div0);
            }
            l / r
        }
        BinaryOperator::Power => {
            if l == 0.0 && r < 0.0 {
                return FormulaValue::Error(CellError::Div0);
            }
            l.powf(r)
        }
        _ => return FormulaValue::Error(CellError::Value),
    };

    if result.is_finite() {
        FormulaValue::Number(result)
    } else {
        FormulaValue::Error(CellError::Num)
    }
}

/// Compare two values: numerically when both sides read as numbers,
/// otherwise as case-insensitive text
pub(crate) fn compare_values(left: &FormulaValue, right: &FormulaValue) -> Ordering {
    if let (Some(l), Some(r)) = (left.as_number(), right.as_number()) {
        return l.partial_cmp(&r).unwrap_or(Ordering::Equal);
    }
    left.as_string()
        .to_lowercase()
        .cmp(&right.as_string().to_lowercase())
}

/// Evaluate a unary operation
fn evaluate_unary_op(
    op: UnaryOperator,
    operand_expr: &FormulaExpr,
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let val = operand(evaluate(operand_expr, ctx)?);

    if let Some(e) = val.get_error() {
        return Ok(FormulaValue::Error(e));
    }

    let n = match val.as_number() {
        Some(n) => n,
        None => return Ok(FormulaValue::Error(CellError::Value)),
    };

    Ok(match op {
        UnaryOperator::Negate => FormulaValue::Number(-n),
        UnaryOperator::Percent => FormulaValue::Number(n / 100.0),
    })
}

/// Evaluate a function call
///
/// Every failure inside the call is normalized to an error value here, so
/// a failing argument never aborts the enclosing formula.
fn evaluate_function(name: &str, args: &[FormulaExpr], ctx: &EvaluationContext) -> FormulaValue {
    if ctx.depth >= ctx.options.max_depth {
        log::warn!(
            "formula nesting exceeded {} levels at {}",
            ctx.options.max_depth,
            name
        );
        return FormulaValue::Error(CellError::Value);
    }

    match call_function(name, args, &ctx.deeper()) {
        Ok(value) => value,
        Err(e) => {
            log::debug!("{} failed: {}", name, e);
            FormulaValue::Error(e.to_cell_error())
        }
    }
}

fn call_function(
    name: &str,
    args: &[FormulaExpr],
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let registry = get_function_registry();

    let func = registry
        .get(name)
        .ok_or_else(|| FormulaError::UnknownFunction(name.to_string()))?;

    if args.len() < func.min_args {
        return Err(FormulaError::ArgumentCount {
            function: name.to_string(),
            expected: format!("at least {}", func.min_args),
            actual: args.len(),
        });
    }

    if let Some(max) = func.max_args {
        if args.len() > max {
            return Err(FormulaError::ArgumentCount {
                function: name.to_string(),
                expected: format!("at most {}", max),
                actual: args.len(),
            });
        }
    }

    match func.implementation {
        FunctionImpl::Eager(implementation) => {
            let evaluated_args: Vec<FormulaValue> =
                args.iter().map(|arg| ctx.evaluate(arg)).collect();
            implementation(&evaluated_args, ctx)
        }
        FunctionImpl::Lazy(implementation) => implementation(args, ctx),
    }
}
