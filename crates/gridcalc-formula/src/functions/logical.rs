//! Logical functions

use crate::ast::FormulaExpr;
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use gridcalc_core::CellError;

/// Boolean reading of a value
///
/// Numbers are true when non-zero. Text reads `"true"`/`"1"` as true,
/// `"false"`/`"0"`/`""` as false and anything else as true. How a blank
/// cell reads is up to the caller: AND, OR and NOT treat it as true.
pub(crate) fn truthy(value: &FormulaValue, empty: bool) -> FormulaResult<bool> {
    match value {
        FormulaValue::Boolean(b) => Ok(*b),
        FormulaValue::Number(n) => Ok(*n != 0.0),
        FormulaValue::Empty => Ok(empty),
        FormulaValue::Error(e) => Err((*e).into()),
        FormulaValue::String(s) => Ok(!matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "false" | "0" | ""
        )),
        FormulaValue::Array(_) => truthy(value.scalar(), empty),
    }
}

/// Every leaf value of every argument, read as a boolean
fn truth_values(args: &[FormulaValue], empty: bool) -> FormulaResult<Vec<bool>> {
    args.iter()
        .flat_map(|arg| arg.values())
        .map(|v| truthy(v, empty))
        .collect()
}

/// IF(condition, value_if_true, value_if_false)
///
/// Only the selected branch is evaluated.
pub fn fn_if(args: &[FormulaExpr], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let condition = ctx.evaluate(&args[0]);
    if let Some(e) = condition.scalar().get_error() {
        return Ok(FormulaValue::Error(e));
    }

    let branch = if truthy(&condition, false)? {
        &args[1]
    } else {
        &args[2]
    };
    Ok(ctx.evaluate(branch))
}

/// IFS(condition1, value1, [condition2, value2], ...)
pub fn fn_ifs(args: &[FormulaExpr], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    if args.len() % 2 != 0 {
        return Ok(FormulaValue::Error(CellError::Value));
    }

    for pair in args.chunks(2) {
        let condition = ctx.evaluate(&pair[0]);
        if let Some(e) = condition.scalar().get_error() {
            return Ok(FormulaValue::Error(e));
        }
        if truthy(&condition, false)? {
            return Ok(ctx.evaluate(&pair[1]));
        }
    }

    Ok(FormulaValue::Error(CellError::Na))
}

/// IFERROR(value, value_if_error)
pub fn fn_iferror(args: &[FormulaExpr], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let value = ctx.evaluate(&args[0]);
    if value.is_error() {
        Ok(ctx.evaluate(&args[1]))
    } else {
        Ok(value)
    }
}

/// IFNA(value, value_if_na)
///
/// Errors other than #N/A pass through.
pub fn fn_ifna(args: &[FormulaExpr], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let value = ctx.evaluate(&args[0]);
    if value == FormulaValue::Error(CellError::Na) {
        Ok(ctx.evaluate(&args[1]))
    } else {
        Ok(value)
    }
}

/// SWITCH(expression, value1, result1, [value2, result2], ..., [default])
///
/// With an odd number of arguments after the expression, the last one is
/// the default.
pub fn fn_switch(args: &[FormulaExpr], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let expression = ctx.evaluate(&args[0]).scalar().clone();
    if let FormulaValue::Error(e) = expression {
        return Ok(FormulaValue::Error(e));
    }

    let cases = &args[1..];
    let mut pairs = cases.chunks_exact(2);
    for pair in pairs.by_ref() {
        let candidate = ctx.evaluate(&pair[0]);
        let candidate = candidate.scalar();
        if let FormulaValue::Error(e) = candidate {
            return Ok(FormulaValue::Error(*e));
        }
        if values_match(&expression, candidate) {
            return Ok(ctx.evaluate(&pair[1]));
        }
    }

    match pairs.remainder() {
        [default] => Ok(ctx.evaluate(default)),
        _ => Ok(FormulaValue::Error(CellError::Na)),
    }
}

/// SWITCH equality: same type required, text compared case-insensitively
fn values_match(a: &FormulaValue, b: &FormulaValue) -> bool {
    match (a, b) {
        (FormulaValue::Number(x), FormulaValue::Number(y)) => x == y,
        (FormulaValue::Boolean(x), FormulaValue::Boolean(y)) => x == y,
        (FormulaValue::String(x), FormulaValue::String(y)) => x.eq_ignore_ascii_case(y),
        (FormulaValue::Empty, FormulaValue::Empty) => true,
        _ => false,
    }
}

/// AND(logical1, [logical2], ...)
pub fn fn_and(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let values = truth_values(args, true)?;
    Ok(FormulaValue::Boolean(values.iter().all(|b| *b)))
}

/// OR(logical1, [logical2], ...)
pub fn fn_or(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let values = truth_values(args, true)?;
    Ok(FormulaValue::Boolean(values.iter().any(|b| *b)))
}

/// XOR(logical1, [logical2], ...) - TRUE when an odd number of arguments are true
pub fn fn_xor(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let values = truth_values(args, false)?;
    let true_count = values.iter().filter(|b| **b).count();
    Ok(FormulaValue::Boolean(true_count % 2 == 1))
}

/// NOT(logical)
pub fn fn_not(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(!truthy(&args[0], true)?))
}

/// TRUE()
pub fn fn_true(_args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(true))
}

/// FALSE()
pub fn fn_false(_args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(false))
}
