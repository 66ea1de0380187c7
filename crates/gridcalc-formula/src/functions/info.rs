//! Information functions

use super::{number_arg, opt_bool_arg, text_arg};
use crate::ast::FormulaExpr;
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use gridcalc_core::{CellAddress, CellError};

/// The single value a predicate inspects; ranges contribute their top-left cell
fn subject(args: &[FormulaValue]) -> &FormulaValue {
    args[0].scalar()
}

fn predicate(args: &[FormulaValue], test: fn(&FormulaValue) -> bool) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(test(subject(args))))
}

/// ISBLANK(value) - blank cells and empty text
pub fn fn_isblank(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    predicate(args, |v| match v {
        FormulaValue::Empty => true,
        FormulaValue::String(s) => s.is_empty(),
        _ => false,
    })
}

/// ISERROR(value)
pub fn fn_iserror(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    predicate(args, FormulaValue::is_error)
}

/// ISERR(value) - any error except #N/A
pub fn fn_iserr(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    predicate(args, |v| matches!(v, FormulaValue::Error(e) if *e != CellError::Na))
}

/// ISNA(value)
pub fn fn_isna(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    predicate(args, |v| matches!(v, FormulaValue::Error(CellError::Na)))
}

/// ISTEXT(value)
pub fn fn_istext(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    predicate(args, |v| matches!(v, FormulaValue::String(_)))
}

/// ISNONTEXT(value)
pub fn fn_isnontext(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    predicate(args, |v| !matches!(v, FormulaValue::String(_)))
}

/// ISNUMBER(value)
pub fn fn_isnumber(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    predicate(args, |v| matches!(v, FormulaValue::Number(_)))
}

/// ISLOGICAL(value)
pub fn fn_islogical(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    predicate(args, |v| matches!(v, FormulaValue::Boolean(_)))
}

/// Parity of `floor(|x|)`; booleans and non-numeric text are #VALUE!
fn is_even(args: &[FormulaValue]) -> FormulaResult<bool> {
    let n = match subject(args) {
        FormulaValue::Boolean(_) => return Err(CellError::Value.into()),
        v => v.to_number()?,
    };
    Ok(n.abs().floor() % 2.0 == 0.0)
}

/// ISEVEN(number)
pub fn fn_iseven(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(is_even(args)?))
}

/// ISODD(number)
pub fn fn_isodd(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(!is_even(args)?))
}

/// ISREF(value) - whether the argument is written as a reference
pub fn fn_isref(args: &[FormulaExpr], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(args[0].is_reference()))
}

/// ISFORMULA(reference)
pub fn fn_isformula(args: &[FormulaExpr], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let Some(range) = args[0].as_range() else {
        return Ok(FormulaValue::Error(CellError::Na));
    };
    let has_formula = ctx
        .get_cell(&range.start)
        .is_some_and(|cell| cell.is_formula());
    Ok(FormulaValue::Boolean(has_formula))
}

/// ISBETWEEN(value, lower, upper, [lower_inclusive], [upper_inclusive])
pub fn fn_isbetween(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let value = number_arg(args, 0)?;
    let lower = number_arg(args, 1)?;
    let upper = number_arg(args, 2)?;
    let lower_inclusive = opt_bool_arg(args, 3, true)?;
    let upper_inclusive = opt_bool_arg(args, 4, true)?;

    let above = if lower_inclusive { value >= lower } else { value > lower };
    let below = if upper_inclusive { value <= upper } else { value < upper };
    Ok(FormulaValue::Boolean(above && below))
}

/// TYPE(value) - 1 number, 2 text, 4 logical, 16 error, 64 array
pub fn fn_type(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let code = match &args[0] {
        FormulaValue::Number(_) | FormulaValue::Empty => 1.0,
        FormulaValue::String(_) => 2.0,
        FormulaValue::Boolean(_) => 4.0,
        FormulaValue::Error(_) => 16.0,
        FormulaValue::Array(_) => 64.0,
    };
    Ok(FormulaValue::Number(code))
}

/// N(value)
pub fn fn_n(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(match subject(args) {
        FormulaValue::Number(n) => FormulaValue::Number(*n),
        FormulaValue::Boolean(b) => FormulaValue::Number(if *b { 1.0 } else { 0.0 }),
        FormulaValue::Error(e) => FormulaValue::Error(*e),
        _ => FormulaValue::Number(0.0),
    })
}

/// NA()
pub fn fn_na(_args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Error(CellError::Na))
}

/// ERROR.TYPE(error_val)
pub fn fn_error_type(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(match subject(args) {
        FormulaValue::Error(e) => FormulaValue::Number(f64::from(e.type_code())),
        _ => FormulaValue::Error(CellError::Na),
    })
}

/// CELL(info_type, [reference])
///
/// The reference defaults to A1.
pub fn fn_cell(args: &[FormulaExpr], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let info_type = match ctx.evaluate(&args[0]).scalar() {
        FormulaValue::Error(e) => return Ok(FormulaValue::Error(*e)),
        v => v.as_string().to_ascii_lowercase(),
    };

    let address = match args.get(1) {
        None => CellAddress::new(0, 0),
        Some(expr) => match expr.as_range() {
            Some(range) => range.start,
            None => return Ok(FormulaValue::Error(CellError::Value)),
        },
    };
    let value = ctx.get_cell_value(&address);

    let result = match info_type.as_str() {
        "address" => FormulaValue::String(
            CellAddress::absolute(address.row, address.col).to_a1_string(),
        ),
        "col" => FormulaValue::Number(f64::from(address.col) + 1.0),
        "row" => FormulaValue::Number(f64::from(address.row) + 1.0),
        "color" | "parentheses" => FormulaValue::Number(0.0),
        "contents" => match value {
            FormulaValue::Empty => FormulaValue::String(String::new()),
            v => v,
        },
        "filename" => FormulaValue::String("spreadsheet.xlsx".to_string()),
        "format" => FormulaValue::String("G".to_string()),
        "prefix" => FormulaValue::String(String::new()),
        "protect" => FormulaValue::Number(1.0),
        "type" => FormulaValue::String(
            match value {
                FormulaValue::Empty => "b",
                FormulaValue::String(_) => "l",
                _ => "v",
            }
            .to_string(),
        ),
        "width" => FormulaValue::Number(10.0),
        _ => FormulaValue::Error(CellError::Value),
    };
    Ok(result)
}

/// INFO(type_text)
pub fn fn_info(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let key = text_arg(args, 0)?.to_ascii_lowercase();
    Ok(match key.as_str() {
        "directory" => FormulaValue::String("/".to_string()),
        "numfile" => FormulaValue::Number(1.0),
        "origin" => FormulaValue::String("$A$1".to_string()),
        "osversion" | "system" => FormulaValue::String("Web".to_string()),
        "recalc" => FormulaValue::String("Automatic".to_string()),
        "release" => FormulaValue::String("1.0".to_string()),
        _ => FormulaValue::Error(CellError::Value),
    })
}

/// SHEET([value]) - a grid is always sheet 1
pub fn fn_sheet(_args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(1.0))
}

/// SHEETS([reference])
pub fn fn_sheets(_args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(1.0))
}
