//! Financial functions
//!
//! Time-value-of-money functions solve the annuity relation
//!
//! ```text
//! pv·(1+r)^n + pmt·(1+r·type)·((1+r)^n − 1)/r + fv = 0
//! ```
//!
//! for whichever variable is asked for, falling back to the linear form at
//! `r = 0`. RATE, IRR and XIRR have no closed form and use Newton-Raphson
//! with analytic derivatives.

use super::{num_result, number_arg, opt_bool_arg, opt_number_arg, range_numbers};
use crate::ast::FormulaExpr;
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use chrono::NaiveDate;
use gridcalc_core::CellError;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

type FinResult<T> = Result<T, CellError>;

const MAX_ITERATIONS: usize = 100;
const RATE_TOLERANCE: f64 = 1e-8;
const XIRR_TOLERANCE: f64 = 1e-10;
/// Longest period-by-period schedule VDB will walk
const MAX_SCHEDULE_PERIODS: f64 = 1_000_000.0;

/// Newton-Raphson over rates, confined to `(-1, 100)`
pub(crate) fn newton_raphson<F, DF>(guess: f64, tolerance: f64, f: F, df: DF) -> Option<f64>
where
    F: Fn(f64) -> Option<f64>,
    DF: Fn(f64) -> Option<f64>,
{
    let mut x = guess;
    for iteration in 0..MAX_ITERATIONS {
        let fx = f(x)?;
        let dfx = df(x)?;
        if dfx == 0.0 {
            return None;
        }

        let next = x - fx / dfx;
        log::trace!("newton iteration {}: {} -> {}", iteration, x, next);
        if !next.is_finite() || next <= -1.0 || next >= 100.0 {
            return None;
        }
        if (next - x).abs() <= tolerance {
            return Some(next);
        }
        x = next;
    }

    None
}

/// `((1+rate)^nper, (1+rate)^nper − 1)`, accurate for small rates
fn pow1p(rate: f64, nper: f64) -> Option<(f64, f64)> {
    let ln1p = rate.ln_1p();
    if !ln1p.is_finite() {
        return None;
    }
    let g_minus_1 = (nper * ln1p).exp_m1();
    let g = g_minus_1 + 1.0;
    if !g.is_finite() || !g_minus_1.is_finite() {
        return None;
    }
    Some((g, g_minus_1))
}

/// `(1+r·type)·((1+r)^n − 1)/r`
fn annuity_factor(rate: f64, nper: f64, typ: f64) -> FinResult<(f64, f64)> {
    let (g, g_minus_1) = pow1p(rate, nper).ok_or(CellError::Num)?;
    Ok((g, (1.0 + rate * typ) * g_minus_1 / rate))
}

pub(crate) fn pv(rate: f64, nper: f64, pmt: f64, fv: f64, typ: f64) -> FinResult<f64> {
    if rate == 0.0 {
        return Ok(-fv - pmt * nper);
    }
    if rate == -1.0 {
        return Err(CellError::Div0);
    }
    let (g, factor) = annuity_factor(rate, nper, typ)?;
    if g == 0.0 {
        return Err(CellError::Div0);
    }
    Ok(-(fv + pmt * factor) / g)
}

pub(crate) fn fv(rate: f64, nper: f64, pmt: f64, pv: f64, typ: f64) -> FinResult<f64> {
    if rate == 0.0 {
        return Ok(-(pv + pmt * nper));
    }
    let (g, factor) = annuity_factor(rate, nper, typ)?;
    Ok(-(pv * g + pmt * factor))
}

pub(crate) fn pmt(rate: f64, nper: f64, pv: f64, fv: f64, typ: f64) -> FinResult<f64> {
    if nper == 0.0 {
        return Err(CellError::Div0);
    }
    if rate == 0.0 {
        return Ok(-(pv + fv) / nper);
    }
    let (g, factor) = annuity_factor(rate, nper, typ)?;
    if factor == 0.0 {
        return Err(CellError::Div0);
    }
    Ok(-(pv * g + fv) / factor)
}

pub(crate) fn nper(rate: f64, pmt: f64, pv: f64, fv: f64, typ: f64) -> FinResult<f64> {
    if rate == 0.0 {
        if pmt == 0.0 {
            return Err(CellError::Num);
        }
        return Ok(-(pv + fv) / pmt);
    }

    let ln1p = rate.ln_1p();
    if !ln1p.is_finite() || ln1p == 0.0 {
        return Err(CellError::Num);
    }

    let a = pmt * (1.0 + rate * typ) / rate;
    if pv + a == 0.0 {
        return Err(CellError::Num);
    }
    let g = (a - fv) / (pv + a);
    if g <= 0.0 {
        return Err(CellError::Num);
    }
    Ok(g.ln() / ln1p)
}

pub(crate) fn ipmt(rate: f64, per: f64, nper: f64, pv: f64, fv_value: f64, typ: f64) -> FinResult<f64> {
    if per < 1.0 || per > nper {
        return Err(CellError::Num);
    }
    if rate == 0.0 {
        return Ok(0.0);
    }

    let payment = pmt(rate, nper, pv, fv_value, typ)?;
    if typ == 1.0 {
        if per == 1.0 {
            return Ok(0.0);
        }
        let balance = fv(rate, per - 1.0, payment, pv, 1.0)?;
        Ok(balance * rate / (1.0 + rate))
    } else {
        let balance = fv(rate, per - 1.0, payment, pv, 0.0)?;
        Ok(balance * rate)
    }
}

pub(crate) fn ppmt(rate: f64, per: f64, nper: f64, pv: f64, fv_value: f64, typ: f64) -> FinResult<f64> {
    let payment = pmt(rate, nper, pv, fv_value, typ)?;
    Ok(payment - ipmt(rate, per, nper, pv, fv_value, typ)?)
}

fn rate_equation(rate: f64, nper: f64, pmt: f64, pv: f64, fv: f64, typ: f64) -> Option<f64> {
    if rate <= -1.0 {
        return None;
    }
    if rate == 0.0 {
        return Some(pv + pmt * nper + fv);
    }
    let (g, g_minus_1) = pow1p(rate, nper)?;
    Some(pv * g + pmt * (1.0 + rate * typ) * g_minus_1 / rate + fv)
}

fn rate_derivative(rate: f64, nper: f64, pmt: f64, pv: f64, typ: f64) -> Option<f64> {
    if rate <= -1.0 {
        return None;
    }
    if rate == 0.0 {
        let df = nper * pv + pmt * (nper * (nper - 1.0) / 2.0 + typ * nper);
        return (df.is_finite() && df != 0.0).then_some(df);
    }

    let (g, g_minus_1) = pow1p(rate, nper)?;
    // d/dr (1+r)^n = n·(1+r)^(n−1)
    let dg = nper * g / (1.0 + rate);
    let annuity = g_minus_1 / rate;
    let dannuity = (dg * rate - g_minus_1) / (rate * rate);
    let df = pv * dg + pmt * (typ * annuity + (1.0 + rate * typ) * dannuity);
    (df.is_finite() && df != 0.0).then_some(df)
}

pub(crate) fn rate(nper: f64, pmt: f64, pv: f64, fv: f64, typ: f64, guess: f64) -> FinResult<f64> {
    if nper <= 0.0 || guess <= -1.0 {
        return Err(CellError::Num);
    }
    newton_raphson(
        guess,
        RATE_TOLERANCE,
        |r| rate_equation(r, nper, pmt, pv, fv, typ),
        |r| rate_derivative(r, nper, pmt, pv, typ),
    )
    .ok_or(CellError::Num)
}

/// Net present value of flows at periods 0, 1, 2, ... and its derivative
fn npv_at(rate: f64, values: &[f64]) -> Option<(f64, f64)> {
    let base = 1.0 + rate;
    if base <= 0.0 {
        return None;
    }
    let mut npv = 0.0;
    let mut dnpv = 0.0;
    for (i, v) in values.iter().enumerate() {
        let t = i as f64;
        npv += v / base.powf(t);
        dnpv -= t * v / base.powf(t + 1.0);
    }
    (npv.is_finite() && dnpv.is_finite()).then_some((npv, dnpv))
}

fn has_sign_change(values: &[f64]) -> bool {
    values.iter().any(|v| *v > 0.0) && values.iter().any(|v| *v < 0.0)
}

pub(crate) fn irr(values: &[f64], guess: f64) -> FinResult<f64> {
    if !has_sign_change(values) {
        return Err(CellError::Num);
    }
    newton_raphson(
        guess,
        RATE_TOLERANCE,
        |r| npv_at(r, values).map(|(f, _)| f),
        |r| npv_at(r, values).map(|(_, df)| df),
    )
    .ok_or(CellError::Num)
}

/// Present value of dated flows; `years[i]` is `(date_i − date_0) / 365`
fn xnpv_at(rate: f64, values: &[f64], years: &[f64]) -> Option<(f64, f64)> {
    let base = 1.0 + rate;
    if base <= 0.0 {
        return None;
    }
    let mut npv = 0.0;
    let mut dnpv = 0.0;
    for (v, t) in values.iter().zip(years) {
        npv += v / base.powf(*t);
        dnpv -= t * v / base.powf(t + 1.0);
    }
    (npv.is_finite() && dnpv.is_finite()).then_some((npv, dnpv))
}

/// Sum-of-years' digits depreciation
pub(crate) fn syd(cost: f64, salvage: f64, life: f64, per: f64) -> FinResult<f64> {
    if life <= 0.0 || per < 1.0 || per > life || salvage < 0.0 {
        return Err(CellError::Num);
    }
    Ok((cost - salvage) * (life - per + 1.0) * 2.0 / (life * (life + 1.0)))
}

/// Round to three decimals the way the fixed-declining rate is published
fn round3(x: f64) -> FinResult<f64> {
    Decimal::from_f64(x)
        .map(|d| d.round_dp(3))
        .and_then(|d| d.to_f64())
        .ok_or(CellError::Num)
}

/// Fixed-declining balance depreciation
pub(crate) fn db(cost: f64, salvage: f64, life: f64, period: f64, month: f64) -> FinResult<f64> {
    let month = month.trunc();
    let period = period.trunc();
    if cost < 0.0 || salvage < 0.0 || life <= 0.0 || period < 1.0 || !(1.0..=12.0).contains(&month) {
        return Err(CellError::Num);
    }
    if period > life + 1.0 || (period > life && month == 12.0) {
        return Err(CellError::Num);
    }
    if cost == 0.0 {
        return Ok(0.0);
    }

    let rate = round3(1.0 - (salvage / cost).powf(1.0 / life))?;
    let first = cost * rate * month / 12.0;
    if period == 1.0 {
        return Ok(first);
    }

    // Full periods after the first shrink the book value geometrically
    let book = (cost - first) * (1.0 - rate).powf(period - 2.0);
    let depreciation = if period == life.trunc() + 1.0 {
        book * rate * (12.0 - month) / 12.0
    } else {
        book * rate
    };
    if !depreciation.is_finite() {
        return Err(CellError::Num);
    }
    Ok(depreciation)
}

/// Declining balance depreciation of one period, never dropping below salvage
fn ddb_period(cost: f64, salvage: f64, life: f64, period: f64, factor: f64) -> f64 {
    let mut rate = factor / life;
    let old_value = if rate >= 1.0 {
        rate = 1.0;
        if period == 1.0 {
            cost
        } else {
            0.0
        }
    } else {
        cost * (1.0 - rate).powf(period - 1.0)
    };
    let new_value = cost * (1.0 - rate).powf(period);

    let depreciation = if new_value < salvage {
        old_value - salvage
    } else {
        old_value - new_value
    };
    depreciation.max(0.0)
}

pub(crate) fn ddb(cost: f64, salvage: f64, life: f64, period: f64, factor: f64) -> FinResult<f64> {
    if cost < 0.0 || salvage < 0.0 || life <= 0.0 || period <= 0.0 || period > life || factor <= 0.0 {
        return Err(CellError::Num);
    }
    Ok(ddb_period(cost, salvage, life, period, factor))
}

/// Declining balance switching to straight-line once that is larger,
/// over the first `period` periods of an asset with `life_left` to go
fn vdb_switching(cost: f64, salvage: f64, life: f64, life_left: f64, period: f64, factor: f64) -> f64 {
    let end = period.ceil();
    let mut total = 0.0;
    let mut remaining = cost - salvage;
    let mut straight_line = 0.0;
    let mut switched = false;

    let mut i = 1.0;
    while i <= end {
        let mut term = if switched {
            straight_line
        } else {
            let declining = ddb_period(cost, salvage, life, i, factor);
            straight_line = remaining / (life_left - (i - 1.0));
            if straight_line > declining {
                switched = true;
                straight_line
            } else {
                remaining -= declining;
                declining
            }
        };
        if i == end {
            term *= period + 1.0 - end;
        }
        total += term;
        i += 1.0;
    }
    total
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-12 * a.abs().max(b.abs()).max(1.0)
}

pub(crate) fn vdb(
    cost: f64,
    salvage: f64,
    life: f64,
    start: f64,
    end: f64,
    factor: f64,
    no_switch: bool,
) -> FinResult<f64> {
    if start < 0.0 || end < start || end > life || cost < 0.0 || salvage > cost || factor <= 0.0 {
        return Err(CellError::Num);
    }
    if end.ceil() > MAX_SCHEDULE_PERIODS {
        return Err(CellError::Num);
    }

    let int_start = start.floor();
    let int_end = end.ceil();

    if no_switch {
        let mut total = 0.0;
        let mut i = int_start + 1.0;
        while i <= int_end {
            let mut term = ddb_period(cost, salvage, life, i, factor);
            if i == int_start + 1.0 {
                term *= end.min(int_start + 1.0) - start;
            } else if i == int_end {
                term *= end + 1.0 - int_end;
            }
            total += term;
            i += 1.0;
        }
        return Ok(total);
    }

    // Partial first and last periods are computed whole, then trimmed
    let mut part = 0.0;
    if !approx_eq(start, int_start) {
        let value = cost - vdb_switching(cost, salvage, life, life, int_start, factor);
        part += (start - int_start)
            * vdb_switching(value, salvage, life, life - int_start, 1.0, factor);
    }
    if !approx_eq(end, int_end) {
        let tail_start = int_end - 1.0;
        let value = cost - vdb_switching(cost, salvage, life, life, tail_start, factor);
        part += (int_end - end)
            * vdb_switching(value, salvage, life, life - tail_start, 1.0, factor);
    }

    let value = cost - vdb_switching(cost, salvage, life, life, int_start, factor);
    let whole = vdb_switching(value, salvage, life, life - int_start, int_end - int_start, factor);
    Ok(whole - part)
}

/// Optional `type` argument: 0 (end of period) or 1 (beginning)
fn payment_type(args: &[FormulaValue], index: usize) -> FormulaResult<f64> {
    match opt_number_arg(args, index, 0.0)? {
        t if t == 0.0 || t == 1.0 => Ok(t),
        _ => Err(CellError::Value.into()),
    }
}

fn number(result: FinResult<f64>) -> FormulaResult<FormulaValue> {
    num_result(result?)
}

/// PMT(rate, nper, pv, [fv], [type])
pub fn fn_pmt(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    number(pmt(
        number_arg(args, 0)?,
        number_arg(args, 1)?,
        number_arg(args, 2)?,
        opt_number_arg(args, 3, 0.0)?,
        payment_type(args, 4)?,
    ))
}

/// PV(rate, nper, pmt, [fv], [type])
pub fn fn_pv(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    number(pv(
        number_arg(args, 0)?,
        number_arg(args, 1)?,
        number_arg(args, 2)?,
        opt_number_arg(args, 3, 0.0)?,
        payment_type(args, 4)?,
    ))
}

/// FV(rate, nper, pmt, [pv], [type])
pub fn fn_fv(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    number(fv(
        number_arg(args, 0)?,
        number_arg(args, 1)?,
        number_arg(args, 2)?,
        opt_number_arg(args, 3, 0.0)?,
        payment_type(args, 4)?,
    ))
}

/// NPER(rate, pmt, pv, [fv], [type])
pub fn fn_nper(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    number(nper(
        number_arg(args, 0)?,
        number_arg(args, 1)?,
        number_arg(args, 2)?,
        opt_number_arg(args, 3, 0.0)?,
        payment_type(args, 4)?,
    ))
}

/// IPMT(rate, per, nper, pv, [fv], [type])
pub fn fn_ipmt(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    number(ipmt(
        number_arg(args, 0)?,
        number_arg(args, 1)?,
        number_arg(args, 2)?,
        number_arg(args, 3)?,
        opt_number_arg(args, 4, 0.0)?,
        payment_type(args, 5)?,
    ))
}

/// PPMT(rate, per, nper, pv, [fv], [type])
pub fn fn_ppmt(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    number(ppmt(
        number_arg(args, 0)?,
        number_arg(args, 1)?,
        number_arg(args, 2)?,
        number_arg(args, 3)?,
        opt_number_arg(args, 4, 0.0)?,
        payment_type(args, 5)?,
    ))
}

/// RATE(nper, pmt, pv, [fv], [type], [guess])
pub fn fn_rate(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    number(rate(
        number_arg(args, 0)?,
        number_arg(args, 1)?,
        number_arg(args, 2)?,
        opt_number_arg(args, 3, 0.0)?,
        payment_type(args, 4)?,
        opt_number_arg(args, 5, 0.1)?,
    ))
}

/// NPV(rate, value1, [value2], ...)
///
/// Values typed directly into the call count when they read as numbers;
/// inside ranges only actual numbers count.
pub fn fn_npv(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let rate = number_arg(args, 0)?;
    if rate == -1.0 {
        return Ok(FormulaValue::Error(CellError::Div0));
    }

    let mut flows = Vec::new();
    for arg in &args[1..] {
        match arg {
            FormulaValue::Array(_) => flows.extend(range_numbers(arg)?),
            FormulaValue::Empty => {}
            v => flows.push(v.to_number()?),
        }
    }

    let base = 1.0 + rate;
    let npv: f64 = flows
        .iter()
        .enumerate()
        .map(|(i, v)| v / base.powf(i as f64 + 1.0))
        .sum();
    num_result(npv)
}

/// IRR(values, [guess])
pub fn fn_irr(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let values = range_numbers(&args[0])?;
    number(irr(&values, opt_number_arg(args, 1, 0.1)?))
}

/// Excel serial of a date cell: a serial number or `YYYY-MM-DD` text
pub(crate) fn date_serial(value: &FormulaValue) -> FormulaResult<f64> {
    match value {
        FormulaValue::Number(n) => Ok(n.trunc()),
        FormulaValue::Error(e) => Err((*e).into()),
        FormulaValue::String(s) => {
            let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|_| CellError::Value)?;
            let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).ok_or(CellError::Value)?;
            Ok((date - epoch).num_days() as f64)
        }
        _ => Err(CellError::Value.into()),
    }
}

/// Cash flows with their offsets in years from the first date
fn dated_flows(
    values: &FormulaExpr,
    dates: &FormulaExpr,
    ctx: &EvaluationContext,
) -> FormulaResult<(Vec<f64>, Vec<f64>)> {
    let values_range = values.as_range().ok_or(CellError::Ref)?;
    let dates_range = dates.as_range().ok_or(CellError::Ref)?;

    let values = ctx.get_range_values(&values_range);
    let dates = ctx.get_range_values(&dates_range);
    let values: Vec<&FormulaValue> = values.values().collect();
    let dates: Vec<&FormulaValue> = dates.values().collect();
    if values.is_empty() || values.len() != dates.len() {
        return Err(CellError::Value.into());
    }

    let flows = values
        .iter()
        .map(|v| match v {
            FormulaValue::Number(n) => Ok(*n),
            FormulaValue::Error(e) => Err((*e).into()),
            _ => Err(CellError::Value.into()),
        })
        .collect::<FormulaResult<Vec<f64>>>()?;

    let serials = dates
        .iter()
        .map(|d| date_serial(d))
        .collect::<FormulaResult<Vec<f64>>>()?;
    let first = serials[0];
    if serials.iter().any(|d| *d < first) {
        return Err(CellError::Num.into());
    }
    let years = serials.iter().map(|d| (d - first) / 365.0).collect();

    Ok((flows, years))
}

/// XNPV(rate, values, dates)
pub fn fn_xnpv(args: &[FormulaExpr], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let rate = ctx.evaluate(&args[0]).to_number()?;
    let (flows, years) = dated_flows(&args[1], &args[2], ctx)?;
    match xnpv_at(rate, &flows, &years) {
        Some((npv, _)) => num_result(npv),
        None => Ok(FormulaValue::Error(CellError::Num)),
    }
}

/// XIRR(values, dates, [guess])
pub fn fn_xirr(args: &[FormulaExpr], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (flows, years) = dated_flows(&args[0], &args[1], ctx)?;
    let guess = match args.get(2).map(|g| ctx.evaluate(g)) {
        None | Some(FormulaValue::Empty) => 0.1,
        Some(g) => g.to_number()?,
    };
    if !has_sign_change(&flows) || guess <= -1.0 {
        return Ok(FormulaValue::Error(CellError::Num));
    }

    let result = newton_raphson(
        guess,
        XIRR_TOLERANCE,
        |r| xnpv_at(r, &flows, &years).map(|(f, _)| f),
        |r| xnpv_at(r, &flows, &years).map(|(_, df)| df),
    );
    number(result.ok_or(CellError::Num))
}

/// MIRR(values, finance_rate, reinvest_rate)
pub fn fn_mirr(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let values = range_numbers(&args[0])?;
    let finance_rate = number_arg(args, 1)?;
    let reinvest_rate = number_arg(args, 2)?;
    if !has_sign_change(&values) {
        return Ok(FormulaValue::Error(CellError::Div0));
    }

    let n = values.len() as f64;
    let mut negative = 0.0;
    let mut positive = 0.0;
    for (i, v) in values.iter().enumerate() {
        let t = i as f64;
        if *v < 0.0 {
            negative += v / (1.0 + finance_rate).powf(t);
        } else {
            positive += v / (1.0 + reinvest_rate).powf(t);
        }
    }

    let ratio = -positive * (1.0 + reinvest_rate).powf(n) / (negative * (1.0 + finance_rate));
    num_result(ratio.powf(1.0 / (n - 1.0)) - 1.0)
}

/// SLN(cost, salvage, life)
pub fn fn_sln(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let cost = number_arg(args, 0)?;
    let salvage = number_arg(args, 1)?;
    let life = number_arg(args, 2)?;
    if life <= 0.0 {
        return Ok(FormulaValue::Error(CellError::Num));
    }
    num_result((cost - salvage) / life)
}

/// SYD(cost, salvage, life, per)
pub fn fn_syd(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    number(syd(
        number_arg(args, 0)?,
        number_arg(args, 1)?,
        number_arg(args, 2)?,
        number_arg(args, 3)?,
    ))
}

/// DB(cost, salvage, life, period, [month])
pub fn fn_db(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    number(db(
        number_arg(args, 0)?,
        number_arg(args, 1)?,
        number_arg(args, 2)?,
        number_arg(args, 3)?,
        opt_number_arg(args, 4, 12.0)?,
    ))
}

/// DDB(cost, salvage, life, period, [factor])
pub fn fn_ddb(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    number(ddb(
        number_arg(args, 0)?,
        number_arg(args, 1)?,
        number_arg(args, 2)?,
        number_arg(args, 3)?,
        opt_number_arg(args, 4, 2.0)?,
    ))
}

/// VDB(cost, salvage, life, start_period, end_period, [factor], [no_switch])
pub fn fn_vdb(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    number(vdb(
        number_arg(args, 0)?,
        number_arg(args, 1)?,
        number_arg(args, 2)?,
        number_arg(args, 3)?,
        number_arg(args, 4)?,
        opt_number_arg(args, 5, 2.0)?,
        opt_bool_arg(args, 6, false)?,
    ))
}

/// PDURATION(rate, pv, fv)
pub fn fn_pduration(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let rate = number_arg(args, 0)?;
    let pv = number_arg(args, 1)?;
    let fv = number_arg(args, 2)?;
    if rate <= 0.0 || pv <= 0.0 || fv <= 0.0 {
        return Ok(FormulaValue::Error(CellError::Num));
    }
    num_result((fv.ln() - pv.ln()) / rate.ln_1p())
}

/// RRI(nper, pv, fv)
pub fn fn_rri(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let nper = number_arg(args, 0)?;
    let pv = number_arg(args, 1)?;
    let fv = number_arg(args, 2)?;
    if nper <= 0.0 || pv == 0.0 {
        return Ok(FormulaValue::Error(CellError::Num));
    }
    num_result((fv / pv).powf(1.0 / nper) - 1.0)
}

/// ISPMT(rate, per, nper, pv)
pub fn fn_ispmt(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let rate = number_arg(args, 0)?;
    let per = number_arg(args, 1)?;
    let nper = number_arg(args, 2)?;
    let pv = number_arg(args, 3)?;
    if nper == 0.0 {
        return Ok(FormulaValue::Error(CellError::Div0));
    }
    num_result(pv * rate * (per / nper - 1.0))
}

/// EFFECT(nominal_rate, npery)
pub fn fn_effect(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let nominal = number_arg(args, 0)?;
    let npery = number_arg(args, 1)?.trunc();
    if nominal <= 0.0 || npery < 1.0 {
        return Ok(FormulaValue::Error(CellError::Num));
    }
    num_result((1.0 + nominal / npery).powf(npery) - 1.0)
}

/// NOMINAL(effect_rate, npery)
pub fn fn_nominal(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let effect = number_arg(args, 0)?;
    let npery = number_arg(args, 1)?.trunc();
    if effect <= 0.0 || npery < 1.0 {
        return Ok(FormulaValue::Error(CellError::Num));
    }
    num_result(npery * ((1.0 + effect).powf(1.0 / npery) - 1.0))
}

/// FVSCHEDULE(principal, schedule)
pub fn fn_fvschedule(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let mut value = number_arg(args, 0)?;
    for rate in args[1].values() {
        match rate {
            FormulaValue::Empty => {}
            FormulaValue::Number(r) => value *= 1.0 + r,
            FormulaValue::Error(e) => return Ok(FormulaValue::Error(*e)),
            _ => return Ok(FormulaValue::Error(CellError::Value)),
        }
    }
    num_result(value)
}

/// Shared validation of CUMIPMT/CUMPRINC
fn cumulative_args(args: &[FormulaValue]) -> FormulaResult<(f64, f64, f64, f64, f64, f64)> {
    let rate = number_arg(args, 0)?;
    let nper = number_arg(args, 1)?;
    let pv = number_arg(args, 2)?;
    let start = number_arg(args, 3)?.trunc();
    let end = number_arg(args, 4)?.trunc();
    let typ = number_arg(args, 5)?;

    if rate <= 0.0
        || nper <= 0.0
        || pv <= 0.0
        || start < 1.0
        || end < start
        || end > nper
        || (typ != 0.0 && typ != 1.0)
    {
        return Err(CellError::Num.into());
    }
    Ok((rate, nper, pv, start, end, typ))
}

/// Interest paid over periods `start..=end` of a loan with no balloon.
///
/// The balance after `k` payments is `a + b·(1+r)^k`, so the per-period
/// interest sums as a geometric series.
fn cumulative_interest(rate: f64, nper: f64, pv: f64, start: f64, end: f64, typ: f64) -> FinResult<f64> {
    let payment = pmt(rate, nper, pv, 0.0, typ)?;
    let a = payment * (1.0 + rate * typ) / rate;
    let b = -(pv + a);

    // Interest for period p accrues on the balance after p − 1 payments;
    // a payment due at the start of period 1 carries none
    let first = if typ == 1.0 { (start - 1.0).max(1.0) } else { start - 1.0 };
    let last = end - 1.0;
    if last < first {
        return Ok(0.0);
    }

    let (_, high) = pow1p(rate, last + 1.0).ok_or(CellError::Num)?;
    let (_, low) = pow1p(rate, first).ok_or(CellError::Num)?;
    let balances = (last - first + 1.0) * a + b * (high - low) / rate;
    let interest = if typ == 1.0 {
        balances * rate / (1.0 + rate)
    } else {
        balances * rate
    };
    if !interest.is_finite() {
        return Err(CellError::Num);
    }
    Ok(interest)
}

/// CUMIPMT(rate, nper, pv, start_period, end_period, type)
pub fn fn_cumipmt(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (rate, nper, pv, start, end, typ) = cumulative_args(args)?;
    num_result(cumulative_interest(rate, nper, pv, start, end, typ)?)
}

/// CUMPRINC(rate, nper, pv, start_period, end_period, type)
pub fn fn_cumprinc(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (rate, nper, pv, start, end, typ) = cumulative_args(args)?;
    let payment = pmt(rate, nper, pv, 0.0, typ)?;
    let interest = cumulative_interest(rate, nper, pv, start, end, typ)?;
    num_result(payment * (end - start + 1.0) - interest)
}

/// `10^ceil(log10(fraction))`, the power of ten a fraction is written over
fn fraction_scale(args: &[FormulaValue]) -> FormulaResult<(f64, f64, f64)> {
    let dollar = number_arg(args, 0)?;
    let fraction = number_arg(args, 1)?.trunc();
    if fraction < 0.0 {
        return Err(CellError::Num.into());
    }
    if fraction == 0.0 {
        return Err(CellError::Div0.into());
    }
    Ok((dollar, fraction, 10f64.powf(fraction.log10().ceil())))
}

/// DOLLARDE(fractional_dollar, fraction)
pub fn fn_dollarde(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (dollar, fraction, scale) = fraction_scale(args)?;
    let whole = dollar.trunc();
    num_result(whole + (dollar - whole) * scale / fraction)
}

/// DOLLARFR(decimal_dollar, fraction)
pub fn fn_dollarfr(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (dollar, fraction, scale) = fraction_scale(args)?;
    let whole = dollar.trunc();
    num_result(whole + (dollar - whole) * fraction / scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::test_support::{assert_close, eval, eval_number, eval_on};
    use gridcalc_core::{CellValue, Grid};
    use pretty_assertions::assert_eq;

    fn n(formula: &str) -> f64 {
        eval_number(formula, &Grid::new())
    }

    #[test]
    fn test_annuity_functions() {
        assert_close(n("=PMT(0.08/12,10,10000)"), -1037.03, 1e-2);
        assert_close(n("=PMT(0,10,1000)"), -100.0, 1e-12);
        assert_close(n("=PV(0.08/12,240,500)"), -59777.15, 1e-2);
        assert_close(n("=FV(0.06/12,10,-200,-500,1)"), 2581.40, 1e-2);
        assert_close(n("=NPER(0.12/12,-100,-1000,10000,1)"), 59.6738657, 1e-6);
        assert_close(n("=RATE(48,-200,8000)"), 0.0077014725, 1e-9);
    }

    #[test]
    fn test_annuity_errors() {
        assert_eq!(eval("=PMT(0.1,0,1000)"), FormulaValue::Error(CellError::Div0));
        assert_eq!(eval("=PMT(0.1,10,1000,0,2)"), FormulaValue::Error(CellError::Value));
        assert_eq!(eval("=PMT(\"abc\",10,1000)"), FormulaValue::Error(CellError::Value));
        assert_eq!(eval("=NPER(0,0,100)"), FormulaValue::Error(CellError::Num));
        assert_eq!(eval("=RATE(0,-200,8000)"), FormulaValue::Error(CellError::Num));
        assert_eq!(eval("=RATE(10,100,100)"), FormulaValue::Error(CellError::Num));
    }

    #[test]
    fn test_interest_and_principal() {
        assert_close(n("=IPMT(0.1/12,1,36,8000)"), -66.6666667, 1e-6);
        assert_close(n("=PPMT(0.1/12,1,24,2000)"), -75.6231860, 1e-6);
        assert_close(n("=IPMT(0.1/12,1,36,8000,0,1)"), 0.0, 1e-12);
        assert_eq!(eval("=IPMT(0.1,0,10,100)"), FormulaValue::Error(CellError::Num));
        assert_eq!(eval("=PPMT(0.1,11,10,100)"), FormulaValue::Error(CellError::Num));

        let sum = n("=PPMT(0.05,3,10,1000)+IPMT(0.05,3,10,1000)");
        assert_close(sum, n("=PMT(0.05,10,1000)"), 1e-9);
    }

    #[test]
    fn test_npv() {
        assert_close(n("=NPV(0.1,-10000,3000,4200,6800)"), 1188.44, 1e-2);
        assert_close(n("=NPV(0.1,{-10000,3000},{4200,6800})"), 1188.44, 1e-2);
        assert_eq!(eval("=NPV(-1,100)"), FormulaValue::Error(CellError::Div0));
        assert_eq!(eval("=NPV(0.1,\"x\")"), FormulaValue::Error(CellError::Value));

        let grid = Grid::from_values(vec![vec![
            CellValue::from(100.0),
            CellValue::from("label"),
            CellValue::Empty,
            CellValue::from(100.0),
        ]]);
        assert_close(eval_number("=NPV(0,A1:D1)", &grid), 200.0, 1e-12);
    }

    #[test]
    fn test_irr_and_mirr() {
        assert_close(
            n("=IRR({-70000,12000,15000,18000,21000,26000})"),
            0.0866309480,
            1e-8,
        );
        assert_close(n("=IRR({-70000,12000,15000,18000,21000},-0.1)"), -0.0212, 1e-4);
        assert_eq!(eval("=IRR({100,200})"), FormulaValue::Error(CellError::Num));

        assert_close(
            n("=MIRR({-120000,39000,30000,21000,37000,46000},0.1,0.12)"),
            0.1260941,
            1e-6,
        );
        assert_eq!(eval("=MIRR({1,2,3},0.1,0.1)"), FormulaValue::Error(CellError::Div0));
    }

    fn dated_grid() -> Grid {
        Grid::from_values(vec![
            vec![CellValue::from(-10000.0), CellValue::from("2008-01-01")],
            vec![CellValue::from(2750.0), CellValue::from("2008-03-01")],
            vec![CellValue::from(4250.0), CellValue::from("2008-10-30")],
            vec![CellValue::from(3250.0), CellValue::from("2009-02-15")],
            vec![CellValue::from(2750.0), CellValue::from("2009-04-01")],
        ])
    }

    #[test]
    fn test_xnpv_and_xirr() {
        let grid = dated_grid();
        assert_close(eval_number("=XNPV(0.09,A1:A5,B1:B5)", &grid), 2086.65, 1e-2);
        assert_close(eval_number("=XIRR(A1:A5,B1:B5)", &grid), 0.373362535, 1e-6);
    }

    #[test]
    fn test_xnpv_with_serial_dates() {
        let grid = Grid::from_values(vec![
            vec![CellValue::from(-1000.0), CellValue::from(39448.0)],
            vec![CellValue::from(1100.0), CellValue::from(39813.0)],
        ]);
        // 365 days apart, so exactly one year of discounting
        assert_close(eval_number("=XNPV(0.1,A1:A2,B1:B2)", &grid), 0.0, 1e-9);
    }

    #[test]
    fn test_dated_flow_errors() {
        let grid = dated_grid();
        assert_eq!(
            eval_on("=XNPV(0.09,A1:A5,B1:B4)", &grid),
            FormulaValue::Error(CellError::Value)
        );
        assert_eq!(
            eval_on("=XNPV(0.09,{1,2},{3,4})", &grid),
            FormulaValue::Error(CellError::Ref)
        );
        assert_eq!(
            eval_on("=XIRR(A2:A5,B2:B5)", &grid),
            FormulaValue::Error(CellError::Num)
        );
    }

    #[test]
    fn test_straight_line_and_syd() {
        assert_eq!(n("=SLN(10000,1000,5)"), 1800.0);
        assert_eq!(eval("=SLN(10000,1000,0)"), FormulaValue::Error(CellError::Num));
        assert_eq!(eval("=SLN(10000,1000,-5)"), FormulaValue::Error(CellError::Num));
        assert_close(n("=SYD(30000,7500,10,1)"), 4090.9090909, 1e-6);
        assert_close(n("=SYD(30000,7500,10,10)"), 409.0909091, 1e-6);
        assert_eq!(eval("=SYD(30000,7500,10,11)"), FormulaValue::Error(CellError::Num));
    }

    #[test]
    fn test_db() {
        assert_close(n("=DB(1000000,100000,6,1,7)"), 186083.33, 1e-2);
        assert_close(n("=DB(1000000,100000,6,2,7)"), 259639.42, 1e-2);
        assert_close(n("=DB(1000000,100000,6,7,7)"), 15845.10, 1e-2);
        assert_eq!(eval("=DB(1000000,100000,6,7)"), FormulaValue::Error(CellError::Num));
        assert_eq!(eval("=DB(1000000,100000,6,1,13)"), FormulaValue::Error(CellError::Num));
        assert_eq!(n("=DB(0,0,6,1)"), 0.0);
    }

    #[test]
    fn test_ddb() {
        assert_close(n("=DDB(2400,300,10*365,1)"), 1.3150685, 1e-6);
        assert_close(n("=DDB(2400,300,10*12,1,2)"), 40.0, 1e-9);
        assert_close(n("=DDB(2400,300,10,1,2)"), 480.0, 1e-9);
        assert_close(n("=DDB(2400,300,10,2,1.5)"), 306.0, 1e-9);
        assert_close(n("=DDB(2400,300,10,10)"), 22.1225472, 1e-6);
        assert_eq!(eval("=DDB(2400,300,10,11)"), FormulaValue::Error(CellError::Num));
    }

    #[test]
    fn test_vdb() {
        assert_close(n("=VDB(2400,300,10*365,0,1)"), 1.3150685, 1e-6);
        assert_close(n("=VDB(2400,300,10*12,0,1)"), 40.0, 1e-9);
        assert_close(n("=VDB(2400,300,10,0,1)"), 480.0, 1e-9);
        assert_close(n("=VDB(2400,300,10*12,6,18)"), 396.31, 1e-2);
        assert_close(n("=VDB(2400,300,10*12,6,18,1.5)"), 311.81, 1e-2);
        assert_close(n("=VDB(2400,300,10,0,0.875,1.5)"), 315.0, 1e-9);
        assert_close(n("=VDB(2400,300,10,0,10)"), 2100.0, 1e-6);
        assert_eq!(eval("=VDB(2400,300,10,5,4)"), FormulaValue::Error(CellError::Num));
        assert_eq!(eval("=VDB(2400,300,10,0,11)"), FormulaValue::Error(CellError::Num));
    }

    #[test]
    fn test_vdb_without_switching() {
        let ddb_total: f64 = (1..=10)
            .map(|p| n(&format!("=DDB(2400,300,10,{})", p)))
            .sum();
        assert_close(n("=VDB(2400,300,10,0,10,2,TRUE)"), ddb_total, 1e-9);
        assert_close(n("=VDB(2400,300,10,0.5,1,2,TRUE)"), 240.0, 1e-9);
    }

    #[test]
    fn test_rate_conversions() {
        assert_close(n("=PDURATION(0.025,2000,2200)"), 3.8598661, 1e-6);
        assert_eq!(eval("=PDURATION(0,2000,2200)"), FormulaValue::Error(CellError::Num));
        assert_close(n("=RRI(96,10000,11000)"), 0.0009933, 1e-7);
        assert_close(n("=ISPMT(0.1/12,1,36,8000000)"), -64814.8148148, 1e-6);
        assert_close(n("=EFFECT(0.0525,4)"), 0.0535426673, 1e-9);
        assert_close(n("=NOMINAL(0.053543,4)"), 0.0525, 1e-6);
        assert_eq!(eval("=EFFECT(0.05,0.5)"), FormulaValue::Error(CellError::Num));
        assert_close(n("=FVSCHEDULE(1,{0.09,0.11,0.1})"), 1.33089, 1e-9);
    }

    #[test]
    fn test_cumulative_payments() {
        assert_close(n("=CUMIPMT(0.09/12,30*12,125000,13,24,0)"), -11135.23, 1e-2);
        assert_close(n("=CUMIPMT(0.09/12,30*12,125000,1,1,0)"), -937.5, 1e-9);
        assert_close(n("=CUMPRINC(0.09/12,30*12,125000,13,24,0)"), -934.107, 1e-3);
        assert_eq!(
            eval("=CUMIPMT(0.09/12,360,125000,13,24,2)"),
            FormulaValue::Error(CellError::Num)
        );
        assert_eq!(
            eval("=CUMPRINC(0.09/12,360,125000,24,13,0)"),
            FormulaValue::Error(CellError::Num)
        );
    }

    #[test]
    fn test_cumulative_matches_period_sums() {
        for typ in [0, 1] {
            let per_period: f64 = (2..=5)
                .map(|per| n(&format!("=IPMT(0.05,{per},10,1000,0,{typ})")))
                .sum();
            assert_close(n(&format!("=CUMIPMT(0.05,10,1000,2,5,{typ})")), per_period, 1e-9);

            let principal: f64 = (1..=10)
                .map(|per| n(&format!("=PPMT(0.05,{per},10,1000,0,{typ})")))
                .sum();
            assert_close(n(&format!("=CUMPRINC(0.05,10,1000,1,10,{typ})")), -1000.0, 1e-9);
            assert_close(principal, -1000.0, 1e-9);
        }
        assert_eq!(n("=CUMIPMT(0.05,10,1000,1,1,1)"), 0.0);
    }

    #[test]
    fn test_huge_schedules_do_not_walk_every_period() {
        match eval("=CUMIPMT(0.01,1e12,1000,1,1e12,0)") {
            FormulaValue::Number(x) => assert!(x.is_finite()),
            FormulaValue::Error(e) => assert_eq!(e, CellError::Num),
            other => panic!("unexpected {:?}", other),
        }
        assert_close(n("=CUMPRINC(1e-9,1e9,1000,1,1e9,0)"), -1000.0, 1e-6);
        assert!(n("=DB(1000,100,1e12,1e12)") >= 0.0);
        assert_eq!(
            eval("=VDB(2400,300,1e12,0,1e12)"),
            FormulaValue::Error(CellError::Num)
        );
        assert_eq!(
            eval("=VDB(2400,300,1e12,0,1e12,2,TRUE)"),
            FormulaValue::Error(CellError::Num)
        );
    }

    #[test]
    fn test_dollar_fractions() {
        assert_close(n("=DOLLARDE(1.02,16)"), 1.125, 1e-12);
        assert_close(n("=DOLLARDE(1.1,32)"), 1.3125, 1e-12);
        assert_close(n("=DOLLARFR(1.125,16)"), 1.02, 1e-12);
        assert_close(n("=DOLLARFR(1.125,32)"), 1.04, 1e-12);
        assert_eq!(eval("=DOLLARDE(1.02,0)"), FormulaValue::Error(CellError::Div0));
        assert_eq!(eval("=DOLLARDE(1.02,-1)"), FormulaValue::Error(CellError::Num));
    }
}
