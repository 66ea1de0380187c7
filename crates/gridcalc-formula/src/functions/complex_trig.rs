//! Trigonometric and hyperbolic functions of complex numbers
//!
//! Each is expanded by the sum-of-angle identities for `z = a + bi`.
//! Quotient forms fail with #NUM! when their real denominator is below
//! 1e-15 in magnitude.

use super::complex::unary;
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use gridcalc_core::CellError;
use num_complex::Complex64;

const MIN_DENOMINATOR: f64 = 1e-15;

/// `numerator / denominator` for a real denominator
fn quotient(numerator: Complex64, denominator: f64) -> FormulaResult<Complex64> {
    if denominator.abs() < MIN_DENOMINATOR {
        return Err(CellError::Num.into());
    }
    Ok(numerator / denominator)
}

fn sin(z: Complex64) -> Complex64 {
    Complex64::new(z.re.sin() * z.im.cosh(), z.re.cos() * z.im.sinh())
}

fn cos(z: Complex64) -> Complex64 {
    Complex64::new(z.re.cos() * z.im.cosh(), -z.re.sin() * z.im.sinh())
}

fn sinh(z: Complex64) -> Complex64 {
    Complex64::new(z.re.sinh() * z.im.cos(), z.re.cosh() * z.im.sin())
}

fn cosh(z: Complex64) -> Complex64 {
    Complex64::new(z.re.cosh() * z.im.cos(), z.re.sinh() * z.im.sin())
}

/// IMSIN(inumber)
pub fn fn_imsin(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    unary(args, |z| Ok(sin(z)))
}

/// IMCOS(inumber)
pub fn fn_imcos(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    unary(args, |z| Ok(cos(z)))
}

/// IMTAN(inumber) = (sin 2a + i·sinh 2b) / (cos 2a + cosh 2b)
pub fn fn_imtan(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    unary(args, |z| {
        let (a2, b2) = (2.0 * z.re, 2.0 * z.im);
        quotient(Complex64::new(a2.sin(), b2.sinh()), a2.cos() + b2.cosh())
    })
}

/// IMCOT(inumber) = (sin 2a − i·sinh 2b) / (cosh 2b − cos 2a)
pub fn fn_imcot(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    unary(args, |z| {
        let (a2, b2) = (2.0 * z.re, 2.0 * z.im);
        quotient(Complex64::new(a2.sin(), -b2.sinh()), b2.cosh() - a2.cos())
    })
}

/// IMCSC(inumber) = conj(sin z) / |sin z|²
pub fn fn_imcsc(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    unary(args, |z| {
        let s = sin(z);
        quotient(s.conj(), s.norm_sqr())
    })
}

/// IMSEC(inumber) = conj(cos z) / |cos z|²
pub fn fn_imsec(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    unary(args, |z| {
        let c = cos(z);
        quotient(c.conj(), c.norm_sqr())
    })
}

/// IMSINH(inumber)
pub fn fn_imsinh(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    unary(args, |z| Ok(sinh(z)))
}

/// IMCOSH(inumber)
pub fn fn_imcosh(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    unary(args, |z| Ok(cosh(z)))
}

/// IMTANH(inumber) = (sinh 2a + i·sin 2b) / (cosh 2a + cos 2b)
pub fn fn_imtanh(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    unary(args, |z| {
        let (a2, b2) = (2.0 * z.re, 2.0 * z.im);
        quotient(Complex64::new(a2.sinh(), b2.sin()), a2.cosh() + b2.cos())
    })
}

/// IMCOTH(inumber) = (sinh 2a − i·sin 2b) / (cosh 2a − cos 2b)
pub fn fn_imcoth(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    unary(args, |z| {
        let (a2, b2) = (2.0 * z.re, 2.0 * z.im);
        quotient(Complex64::new(a2.sinh(), -b2.sin()), a2.cosh() - b2.cos())
    })
}

/// IMCSCH(inumber) = conj(sinh z) / |sinh z|²
pub fn fn_imcsch(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    unary(args, |z| {
        let s = sinh(z);
        quotient(s.conj(), s.norm_sqr())
    })
}

/// IMSECH(inumber) = conj(cosh z) / |cosh z|²
pub fn fn_imsech(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    unary(args, |z| {
        let c = cosh(z);
        quotient(c.conj(), c.norm_sqr())
    })
}

#[cfg(test)]
mod tests {
    use crate::functions::complex::tests::assert_complex;
    use crate::functions::test_support::eval;
    use crate::evaluator::FormulaValue;
    use gridcalc_core::CellError;
    use num_complex::Complex64;
    use pretty_assertions::assert_eq;

    const TOL: f64 = 1e-9;

    #[test]
    fn test_sin_cos() {
        assert_complex("=IMSIN(\"4+3i\")", -7.619231720321, -6.548120040911, TOL);
        assert_complex("=IMCOS(\"1+i\")", 0.833730025131, -0.988897705763, TOL);
        assert_eq!(eval("=IMSIN(\"0\")"), FormulaValue::String("0".into()));
        assert_eq!(eval("=IMCOS(\"0\")"), FormulaValue::String("1".into()));
    }

    #[test]
    fn test_quotient_forms_match_num_complex() {
        let z = Complex64::new(4.0, 3.0);
        let tan = z.tan();
        assert_complex("=IMTAN(\"4+3i\")", tan.re, tan.im, TOL);
        let cot = z.tan().inv();
        assert_complex("=IMCOT(\"4+3i\")", cot.re, cot.im, TOL);
        let csc = z.sin().inv();
        assert_complex("=IMCSC(\"4+3i\")", csc.re, csc.im, TOL);
        let sec = z.cos().inv();
        assert_complex("=IMSEC(\"4+3i\")", sec.re, sec.im, TOL);
    }

    #[test]
    fn test_hyperbolic() {
        let z = Complex64::new(4.0, 3.0);
        for (formula, expected) in [
            ("=IMSINH(\"4+3i\")", z.sinh()),
            ("=IMCOSH(\"4+3i\")", z.cosh()),
            ("=IMTANH(\"4+3i\")", z.tanh()),
            ("=IMCOTH(\"4+3i\")", z.tanh().inv()),
            ("=IMCSCH(\"4+3i\")", z.sinh().inv()),
            ("=IMSECH(\"4+3i\")", z.cosh().inv()),
        ] {
            assert_complex(formula, expected.re, expected.im, 1e-6);
        }
    }

    #[test]
    fn test_vanishing_denominators() {
        for formula in ["=IMCSC(\"0\")", "=IMCOT(\"0\")", "=IMCSCH(\"0\")", "=IMCOTH(\"0\")"] {
            assert_eq!(eval(formula), FormulaValue::Error(CellError::Num), "{}", formula);
        }
        assert_eq!(eval("=IMSEC(\"0\")"), FormulaValue::String("1".into()));
        assert_eq!(eval("=IMSECH(\"0\")"), FormulaValue::String("1".into()));
        assert_eq!(eval("=IMTAN(\"x\")"), FormulaValue::Error(CellError::Num));
    }
}
