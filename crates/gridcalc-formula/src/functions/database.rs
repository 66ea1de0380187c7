//! Database functions (DSUM, DAVERAGE, DGET, ...)
//!
//! Every function takes `(database, field, criteria)`. The first row of
//! `database` names the fields and each later row is a record. The first
//! row of `criteria` names fields too; each later criteria row is one
//! alternative, satisfied when all of its non-blank cells match.

use super::criteria::CriteriaMatcher;
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use gridcalc_core::CellError;

/// Rows of an array argument; scalars are not tables
fn table(value: &FormulaValue) -> FormulaResult<&[Vec<FormulaValue>]> {
    match value {
        FormulaValue::Array(rows) => Ok(rows),
        FormulaValue::Error(e) => Err((*e).into()),
        _ => Err(CellError::Value.into()),
    }
}

fn same_name(header: &FormulaValue, name: &str) -> bool {
    header.as_string().trim().eq_ignore_ascii_case(name.trim())
}

/// Resolve `field` to a 0-based column: a 1-based number or a header name
fn field_index(headers: &[FormulaValue], field: &FormulaValue) -> FormulaResult<usize> {
    match field.scalar() {
        FormulaValue::Error(e) => Err((*e).into()),
        FormulaValue::Number(n) => {
            let n = n.trunc();
            if n >= 1.0 && n <= headers.len() as f64 {
                Ok(n as usize - 1)
            } else {
                Err(CellError::Value.into())
            }
        }
        FormulaValue::String(name) => {
            let name = name.trim().trim_matches('"');
            headers
                .iter()
                .position(|h| same_name(h, name))
                .ok_or_else(|| CellError::Value.into())
        }
        _ => Err(CellError::Value.into()),
    }
}

/// One criteria row: (database column, matcher) per non-blank cell.
/// A column naming no database field is `None` and never matches.
type CriteriaRow = Vec<(Option<usize>, CriteriaMatcher)>;

fn compile_criteria(headers: &[FormulaValue], criteria: &[Vec<FormulaValue>]) -> Vec<CriteriaRow> {
    let Some((criteria_headers, rows)) = criteria.split_first() else {
        return Vec::new();
    };

    let columns: Vec<Option<usize>> = criteria_headers
        .iter()
        .map(|ch| {
            let name = ch.as_string();
            headers.iter().position(|h| same_name(h, &name))
        })
        .collect();

    rows.iter()
        .map(|row| {
            row.iter()
                .zip(&columns)
                .map(|(cell, column)| (*column, CriteriaMatcher::new(cell)))
                .filter(|(_, matcher)| !matcher.is_wildcard())
                .collect()
        })
        .collect()
}

fn record_matches(record: &[FormulaValue], criteria: &[CriteriaRow]) -> bool {
    // A criteria range holding only headers selects every record
    if criteria.is_empty() {
        return true;
    }
    criteria.iter().any(|row| {
        row.iter().all(|(column, matcher)| match column {
            Some(c) => matcher.matches(record.get(*c).unwrap_or(&FormulaValue::Empty)),
            None => false,
        })
    })
}

/// The `field` values of every record selected by `criteria`
fn selected_values(args: &[FormulaValue]) -> FormulaResult<Vec<FormulaValue>> {
    let database = table(&args[0])?;
    let (headers, records) = match database.split_first() {
        Some((headers, records)) if !records.is_empty() => (headers, records),
        _ => return Err(CellError::Value.into()),
    };

    let column = field_index(headers, &args[1])?;
    let criteria = compile_criteria(headers, table(&args[2])?);

    let values = records
        .iter()
        .filter(|record| record_matches(record, &criteria))
        .map(|record| record.get(column).cloned().unwrap_or(FormulaValue::Empty))
        .collect::<Vec<_>>();
    log::trace!("database criteria selected {} of {} records", values.len(), records.len());
    Ok(values)
}

/// Numbers among the selected values; errors propagate
fn selected_numbers(args: &[FormulaValue]) -> FormulaResult<Vec<f64>> {
    super::range_numbers(&FormulaValue::Array(vec![selected_values(args)?]))
}

/// Sample (`ddof = 1`) or population (`ddof = 0`) variance
fn variance(numbers: &[f64], ddof: usize) -> FormulaResult<f64> {
    if numbers.len() <= ddof || numbers.is_empty() {
        return Err(CellError::Div0.into());
    }
    let n = numbers.len() as f64;
    let mean = numbers.iter().sum::<f64>() / n;
    let squares: f64 = numbers.iter().map(|x| (x - mean).powi(2)).sum();
    Ok(squares / (n - ddof as f64))
}

/// DSUM(database, field, criteria)
pub fn fn_dsum(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let numbers = selected_numbers(args)?;
    Ok(FormulaValue::Number(numbers.iter().sum()))
}

/// DAVERAGE(database, field, criteria)
pub fn fn_daverage(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let numbers = selected_numbers(args)?;
    if numbers.is_empty() {
        return Ok(FormulaValue::Error(CellError::Div0));
    }
    Ok(FormulaValue::Number(
        numbers.iter().sum::<f64>() / numbers.len() as f64,
    ))
}

/// DCOUNT(database, field, criteria) - numeric cells only
pub fn fn_dcount(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let count = selected_values(args)?
        .iter()
        .filter(|v| matches!(v, FormulaValue::Number(_)))
        .count();
    Ok(FormulaValue::Number(count as f64))
}

/// DCOUNTA(database, field, criteria) - any non-blank cell
pub fn fn_dcounta(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let count = selected_values(args)?
        .iter()
        .filter(|v| !matches!(v, FormulaValue::Empty))
        .count();
    Ok(FormulaValue::Number(count as f64))
}

/// DMAX(database, field, criteria)
pub fn fn_dmax(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let numbers = selected_numbers(args)?;
    Ok(FormulaValue::Number(
        numbers.into_iter().reduce(f64::max).unwrap_or(0.0),
    ))
}

/// DMIN(database, field, criteria)
pub fn fn_dmin(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let numbers = selected_numbers(args)?;
    Ok(FormulaValue::Number(
        numbers.into_iter().reduce(f64::min).unwrap_or(0.0),
    ))
}

/// DPRODUCT(database, field, criteria)
pub fn fn_dproduct(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let numbers = selected_numbers(args)?;
    if numbers.is_empty() {
        return Ok(FormulaValue::Number(0.0));
    }
    super::num_result(numbers.iter().product())
}

/// DGET(database, field, criteria) - exactly one record must match
pub fn fn_dget(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let mut values = selected_values(args)?;
    match values.len() {
        1 => Ok(values.remove(0)),
        _ => Ok(FormulaValue::Error(CellError::Num)),
    }
}

/// DSTDEV(database, field, criteria)
pub fn fn_dstdev(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(variance(&selected_numbers(args)?, 1)?.sqrt()))
}

/// DSTDEVP(database, field, criteria)
pub fn fn_dstdevp(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(variance(&selected_numbers(args)?, 0)?.sqrt()))
}

/// DVAR(database, field, criteria)
pub fn fn_dvar(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(variance(&selected_numbers(args)?, 1)?))
}

/// DVARP(database, field, criteria)
pub fn fn_dvarp(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(variance(&selected_numbers(args)?, 0)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::test_support::{assert_close, eval_number, eval_on};
    use gridcalc_core::{CellValue, Grid};
    use pretty_assertions::assert_eq;

    /// Employees in A1:C5, criteria from E1
    fn employees(criteria: Vec<Vec<CellValue>>) -> Grid {
        let mut grid = Grid::from_values(vec![
            vec![CellValue::from("Name"), CellValue::from("Department"), CellValue::from("Salary")],
            vec![CellValue::from("Alice"), CellValue::from("Sales"), CellValue::from(50000.0)],
            vec![CellValue::from("Bob"), CellValue::from("Engineering"), CellValue::from(75000.0)],
            vec![CellValue::from("Carol"), CellValue::from("Sales"), CellValue::from(45000.0)],
            vec![CellValue::from("Dan"), CellValue::from("Support"), CellValue::from(40000.0)],
        ]);
        for (r, row) in criteria.into_iter().enumerate() {
            for (c, value) in row.into_iter().enumerate() {
                grid.set_value(r as u32, 4 + c as u32, value);
            }
        }
        grid
    }

    fn by_department(department: &str) -> Grid {
        employees(vec![
            vec![CellValue::from("Department")],
            vec![CellValue::from(department)],
        ])
    }

    #[test]
    fn test_dsum_by_department() {
        let grid = by_department("Sales");
        assert_eq!(
            eval_on("=DSUM(A1:C5,\"Salary\",E1:E2)", &grid),
            FormulaValue::Number(95000.0)
        );
        assert_eq!(
            eval_on("=DSUM(A1:C5,3,E1:E2)", &grid),
            FormulaValue::Number(95000.0)
        );
        assert_eq!(
            eval_on("=DSUM(A1:C5,\"salary\",E1:E2)", &grid),
            FormulaValue::Number(95000.0)
        );
    }

    #[test]
    fn test_numeric_criterion() {
        let grid = employees(vec![
            vec![CellValue::from("Salary")],
            vec![CellValue::from(">44000")],
        ]);
        assert_eq!(eval_number("=DSUM(A1:C5,\"Salary\",E1:E2)", &grid), 170000.0);
        assert_eq!(eval_number("=DCOUNT(A1:C5,\"Salary\",E1:E2)", &grid), 3.0);
        assert_eq!(eval_number("=DMAX(A1:C5,\"Salary\",E1:E2)", &grid), 75000.0);
        assert_eq!(eval_number("=DMIN(A1:C5,\"Salary\",E1:E2)", &grid), 45000.0);
    }

    #[test]
    fn test_and_within_row_or_across_rows() {
        let grid = employees(vec![
            vec![CellValue::from("Department"), CellValue::from("Salary")],
            vec![CellValue::from("Sales"), CellValue::from(">=50000")],
            vec![CellValue::from("Support"), CellValue::Empty],
        ]);
        assert_eq!(eval_number("=DSUM(A1:C5,\"Salary\",E1:F3)", &grid), 90000.0);
        assert_eq!(eval_number("=DCOUNTA(A1:C5,\"Name\",E1:F3)", &grid), 2.0);
    }

    #[test]
    fn test_wildcard_criterion() {
        let grid = by_department("S*");
        assert_eq!(eval_number("=DCOUNTA(A1:C5,1,E1:E2)", &grid), 3.0);
        assert_eq!(eval_number("=DAVERAGE(A1:C5,3,E1:E2)", &grid), 45000.0);
    }

    #[test]
    fn test_header_only_criteria_selects_everything() {
        let grid = employees(vec![vec![CellValue::from("Department")]]);
        assert_eq!(eval_number("=DSUM(A1:C5,3,E1:E1)", &grid), 210000.0);
    }

    #[test]
    fn test_unknown_criteria_header_never_matches() {
        let grid = employees(vec![
            vec![CellValue::from("Region")],
            vec![CellValue::from("West")],
        ]);
        assert_eq!(eval_number("=DCOUNT(A1:C5,3,E1:E2)", &grid), 0.0);
    }

    #[test]
    fn test_dget() {
        let grid = by_department("Engineering");
        assert_eq!(
            eval_on("=DGET(A1:C5,\"Name\",E1:E2)", &grid),
            FormulaValue::String("Bob".into())
        );

        let two = by_department("Sales");
        assert_eq!(
            eval_on("=DGET(A1:C5,\"Name\",E1:E2)", &two),
            FormulaValue::Error(CellError::Num)
        );

        let none = by_department("Legal");
        assert_eq!(
            eval_on("=DGET(A1:C5,\"Name\",E1:E2)", &none),
            FormulaValue::Error(CellError::Num)
        );
    }

    #[test]
    fn test_zero_matches() {
        let grid = by_department("Legal");
        for (formula, expected) in [
            ("=DSUM(A1:C5,3,E1:E2)", FormulaValue::Number(0.0)),
            ("=DMAX(A1:C5,3,E1:E2)", FormulaValue::Number(0.0)),
            ("=DMIN(A1:C5,3,E1:E2)", FormulaValue::Number(0.0)),
            ("=DPRODUCT(A1:C5,3,E1:E2)", FormulaValue::Number(0.0)),
            ("=DCOUNT(A1:C5,3,E1:E2)", FormulaValue::Number(0.0)),
            ("=DCOUNTA(A1:C5,3,E1:E2)", FormulaValue::Number(0.0)),
            ("=DAVERAGE(A1:C5,3,E1:E2)", FormulaValue::Error(CellError::Div0)),
            ("=DVAR(A1:C5,3,E1:E2)", FormulaValue::Error(CellError::Div0)),
            ("=DVARP(A1:C5,3,E1:E2)", FormulaValue::Error(CellError::Div0)),
            ("=DSTDEV(A1:C5,3,E1:E2)", FormulaValue::Error(CellError::Div0)),
            ("=DSTDEVP(A1:C5,3,E1:E2)", FormulaValue::Error(CellError::Div0)),
        ] {
            assert_eq!(eval_on(formula, &grid), expected, "{}", formula);
        }
    }

    #[test]
    fn test_variance_family() {
        let grid = by_department("Sales");
        assert_close(eval_number("=DVAR(A1:C5,3,E1:E2)", &grid), 12_500_000.0, 1e-6);
        assert_close(eval_number("=DVARP(A1:C5,3,E1:E2)", &grid), 6_250_000.0, 1e-6);
        assert_close(eval_number("=DSTDEV(A1:C5,3,E1:E2)", &grid), 3535.533905932738, 1e-6);
        assert_close(eval_number("=DSTDEVP(A1:C5,3,E1:E2)", &grid), 2500.0, 1e-6);
        assert_eq!(eval_number("=DPRODUCT(A1:C5,3,E1:E2)", &grid), 2_250_000_000.0);

        let single = by_department("Support");
        assert_eq!(
            eval_on("=DVAR(A1:C5,3,E1:E2)", &single),
            FormulaValue::Error(CellError::Div0)
        );
        assert_eq!(eval_number("=DVARP(A1:C5,3,E1:E2)", &single), 0.0);
    }

    #[test]
    fn test_invalid_arguments() {
        let grid = by_department("Sales");
        for formula in [
            "=DSUM(A1:C5,\"Bonus\",E1:E2)",
            "=DSUM(A1:C5,0,E1:E2)",
            "=DSUM(A1:C5,4,E1:E2)",
            "=DSUM(A1:C1,3,E1:E2)",
            "=DSUM(5,3,E1:E2)",
        ] {
            assert_eq!(eval_on(formula, &grid), FormulaValue::Error(CellError::Value), "{}", formula);
        }
        assert_eq!(
            eval_on("=DSUM(A1:C5,1/0,E1:E2)", &grid),
            FormulaValue::Error(CellError::Div0)
        );
    }

    #[test]
    fn test_field_from_cell_reference() {
        let mut grid = by_department("Sales");
        grid.set_value(6, 0, "Salary");
        assert_eq!(eval_number("=DSUM(A1:C5,A7,E1:E2)", &grid), 95000.0);
    }
}
