//! Bessel functions of integer order
//!
//! `J` and `Y` come from libm. The modified functions are computed here:
//! `I` by its power series and `K` by polynomial approximations of `K0`
//! and `K1` followed by upward recurrence.

use super::{num_result, number_arg};
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use gridcalc_core::CellError;

/// Past this, `I0(x)` no longer fits in an f64
const MAX_MODIFIED_ARG: f64 = 713.0;
const MAX_SERIES_TERMS: usize = 1_000;

/// `(x, n)` with the order truncated; negative orders are #NUM!
fn bessel_args(args: &[FormulaValue]) -> FormulaResult<(f64, i32)> {
    let x = number_arg(args, 0)?;
    let n = number_arg(args, 1)?.trunc();
    if n < 0.0 || n > f64::from(i32::MAX) {
        return Err(CellError::Num.into());
    }
    Ok((x, n as i32))
}

/// `I_n(x)` by its power series
fn bessel_i(x: f64, n: i32) -> f64 {
    let half = x / 2.0;
    let mut term = 1.0;
    for i in 1..=n {
        term *= half / f64::from(i);
        if term == 0.0 {
            return 0.0;
        }
    }

    let quarter = half * half;
    let mut sum = term;
    for k in 1..MAX_SERIES_TERMS {
        let k = k as f64;
        term *= quarter / (k * (k + f64::from(n)));
        sum += term;
        if term.abs() <= sum.abs() * f64::EPSILON {
            break;
        }
    }
    sum
}

fn bessel_k0(x: f64) -> f64 {
    if x <= 2.0 {
        let y = x * x / 4.0;
        -(x / 2.0).ln() * bessel_i(x, 0)
            + (-0.57721566
                + y * (0.42278420
                    + y * (0.23069756
                        + y * (0.3488590e-1 + y * (0.262698e-2 + y * (0.10750e-3 + y * 0.74e-5))))))
    } else {
        let y = 2.0 / x;
        (-x).exp() / x.sqrt()
            * (1.25331414
                + y * (-0.7832358e-1
                    + y * (0.2189568e-1
                        + y * (-0.1062446e-1
                            + y * (0.587872e-2 + y * (-0.251540e-2 + y * 0.53208e-3))))))
    }
}

fn bessel_k1(x: f64) -> f64 {
    if x <= 2.0 {
        let y = x * x / 4.0;
        (x / 2.0).ln() * bessel_i(x, 1)
            + (1.0 / x)
                * (1.0
                    + y * (0.15443144
                        + y * (-0.67278579
                            + y * (-0.18156897
                                + y * (-0.1919402e-1 + y * (-0.110404e-2 + y * -0.4686e-4))))))
    } else {
        let y = 2.0 / x;
        (-x).exp() / x.sqrt()
            * (1.25331414
                + y * (0.23498619
                    + y * (-0.3655620e-1
                        + y * (0.1504268e-1
                            + y * (-0.780353e-2 + y * (0.325614e-2 + y * -0.68245e-3))))))
    }
}

/// `K_n(x)` for `x > 0`; infinite once the recurrence overflows
fn bessel_k(x: f64, n: i32) -> f64 {
    let k0 = bessel_k0(x);
    if n == 0 {
        return k0;
    }
    let mut previous = k0;
    let mut current = bessel_k1(x);
    for j in 1..n {
        let next = previous + 2.0 * f64::from(j) / x * current;
        if !next.is_finite() {
            return f64::INFINITY;
        }
        previous = current;
        current = next;
    }
    current
}

/// BESSELJ(x, n)
pub fn fn_besselj(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (x, n) = bessel_args(args)?;
    num_result(libm::jn(n, x))
}

/// BESSELY(x, n), defined for `x > 0`
pub fn fn_bessely(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (x, n) = bessel_args(args)?;
    if x <= 0.0 {
        return Err(CellError::Num.into());
    }
    num_result(libm::yn(n, x))
}

/// BESSELI(x, n)
pub fn fn_besseli(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (x, n) = bessel_args(args)?;
    if x.abs() > MAX_MODIFIED_ARG {
        return Err(CellError::Num.into());
    }
    num_result(bessel_i(x, n))
}

/// BESSELK(x, n), defined for `x > 0`
pub fn fn_besselk(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (x, n) = bessel_args(args)?;
    if x <= 0.0 {
        return Err(CellError::Num.into());
    }
    num_result(bessel_k(x, n))
}

#[cfg(test)]
mod tests {
    use crate::evaluator::FormulaValue;
    use crate::functions::test_support::{assert_close, eval, eval_number};
    use gridcalc_core::{CellError, Grid};
    use pretty_assertions::assert_eq;

    fn n(formula: &str) -> f64 {
        eval_number(formula, &Grid::new())
    }

    #[test]
    fn test_bessel_j_and_y() {
        assert_close(n("=BESSELJ(1.9,2)"), 0.329925728, 1e-8);
        assert_close(n("=BESSELJ(0,0)"), 1.0, 1e-12);
        assert_close(n("=BESSELJ(-1.9,1)"), -n("=BESSELJ(1.9,1)"), 1e-12);
        assert_close(n("=BESSELY(2.5,1)"), 0.145918138, 1e-8);
        // Fractional orders truncate
        assert_close(n("=BESSELJ(1.9,2.9)"), 0.329925728, 1e-8);
    }

    #[test]
    fn test_modified_bessel() {
        assert_close(n("=BESSELI(1.5,1)"), 0.981666428, 1e-8);
        assert_close(n("=BESSELI(0,0)"), 1.0, 1e-12);
        assert_close(n("=BESSELI(-1.5,1)"), -0.981666428, 1e-8);
        assert_close(n("=BESSELK(1.5,1)"), 0.277387804, 1e-6);
        assert_close(n("=BESSELK(3,0)"), 0.034739504, 1e-6);
        assert_close(n("=BESSELK(1,2)"), 1.624838899, 1e-6);
    }

    #[test]
    fn test_bessel_domain_errors() {
        assert_eq!(eval("=BESSELJ(1,-1)"), FormulaValue::Error(CellError::Num));
        assert_eq!(eval("=BESSELY(0,1)"), FormulaValue::Error(CellError::Num));
        assert_eq!(eval("=BESSELK(-1,1)"), FormulaValue::Error(CellError::Num));
        assert_eq!(eval("=BESSELI(800,0)"), FormulaValue::Error(CellError::Num));
        assert_eq!(eval("=BESSELK(0.001,500)"), FormulaValue::Error(CellError::Num));
        assert_eq!(eval("=BESSELJ(\"x\",1)"), FormulaValue::Error(CellError::Value));
    }
}
