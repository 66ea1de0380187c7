//! Complex-number functions
//!
//! Complex numbers cross the formula boundary as text (`"3+4i"`, `"-2j"`,
//! `"i"`, `"1.5e3-2i"`) and are [`Complex64`] inside. Results are rounded
//! to 12 decimal places and parts smaller than 1e-10 print as zero.

use super::{number_arg, text_arg};
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use gridcalc_core::CellError;
use lazy_regex::{regex_captures, regex_is_match};
use num_complex::Complex64;

const SNAP: f64 = 1e-10;
const ROUNDING: f64 = 1e12;

/// A parsed complex argument; `suffix` is `None` for plain reals
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ComplexArg {
    pub value: Complex64,
    pub suffix: Option<char>,
}

impl ComplexArg {
    fn real(re: f64) -> Self {
        Self {
            value: Complex64::new(re, 0.0),
            suffix: None,
        }
    }
}

fn parse_part(text: &str) -> Result<f64, CellError> {
    text.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or(CellError::Num)
}

fn suffix_char(text: &str) -> Option<char> {
    text.chars().next()
}

/// Parse complex-number text
pub(crate) fn parse_complex(text: &str) -> Result<ComplexArg, CellError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(ComplexArg::real(0.0));
    }

    if regex_is_match!(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?$", text) {
        return Ok(ComplexArg::real(parse_part(text)?));
    }

    if let Some((_, sign, coefficient, suffix)) = regex_captures!(
        r"^([+-]?)((?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?)?([ij])$",
        text
    ) {
        let magnitude = if coefficient.is_empty() {
            1.0
        } else {
            parse_part(coefficient)?
        };
        let im = if sign == "-" { -magnitude } else { magnitude };
        return Ok(ComplexArg {
            value: Complex64::new(0.0, im),
            suffix: suffix_char(suffix),
        });
    }

    if let Some((_, real, sign, coefficient, suffix)) = regex_captures!(
        r"^([+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?)\s*([+-])\s*((?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?)?([ij])$",
        text
    ) {
        let magnitude = if coefficient.is_empty() {
            1.0
        } else {
            parse_part(coefficient)?
        };
        let im = if sign == "-" { -magnitude } else { magnitude };
        return Ok(ComplexArg {
            value: Complex64::new(parse_part(real)?, im),
            suffix: suffix_char(suffix),
        });
    }

    Err(CellError::Num)
}

/// Read a complex argument: text is parsed, numbers are real, blanks are 0
pub(crate) fn complex_value(value: &FormulaValue) -> FormulaResult<ComplexArg> {
    match value.scalar() {
        FormulaValue::Number(n) => Ok(ComplexArg::real(*n)),
        FormulaValue::Empty => Ok(ComplexArg::real(0.0)),
        FormulaValue::String(s) => Ok(parse_complex(s)?),
        FormulaValue::Error(e) => Err((*e).into()),
        FormulaValue::Boolean(_) | FormulaValue::Array(_) => Err(CellError::Value.into()),
    }
}

pub(crate) fn complex_arg(args: &[FormulaValue], index: usize) -> FormulaResult<ComplexArg> {
    match args.get(index) {
        Some(value) => complex_value(value),
        None => Err(CellError::Value.into()),
    }
}

/// The suffix shared by several arguments; mixing `i` and `j` is #VALUE!
pub(crate) fn common_suffix<I>(suffixes: I) -> FormulaResult<Option<char>>
where
    I: IntoIterator<Item = Option<char>>,
{
    let mut common = None;
    for suffix in suffixes.into_iter().flatten() {
        match common {
            None => common = Some(suffix),
            Some(c) if c != suffix => return Err(CellError::Value.into()),
            Some(_) => {}
        }
    }
    Ok(common)
}

fn tidy(x: f64) -> f64 {
    if x.abs() < SNAP {
        return 0.0;
    }
    let scaled = x * ROUNDING;
    if !scaled.is_finite() {
        return x;
    }
    // Adding 0.0 turns -0 into 0
    scaled.round() / ROUNDING + 0.0
}

fn format_part(x: f64) -> String {
    FormulaValue::Number(x).as_string()
}

/// Render a complex number the way the IM* functions print it
pub(crate) fn format_complex(z: Complex64, suffix: char) -> String {
    let re = tidy(z.re);
    let im = tidy(z.im);

    if im == 0.0 {
        return format_part(re);
    }

    let coefficient = match im.abs() {
        m if m == 1.0 => String::new(),
        m => format_part(m),
    };
    let sign = if im < 0.0 { "-" } else { "+" };

    if re == 0.0 {
        let sign = if im < 0.0 { "-" } else { "" };
        format!("{}{}{}", sign, coefficient, suffix)
    } else {
        format!("{}{}{}{}", format_part(re), sign, coefficient, suffix)
    }
}

/// A complex result; infinities and NaN become #NUM!
pub(crate) fn complex_result(z: Complex64, suffix: Option<char>) -> FormulaResult<FormulaValue> {
    if !z.re.is_finite() || !z.im.is_finite() {
        return Err(CellError::Num.into());
    }
    Ok(FormulaValue::String(format_complex(z, suffix.unwrap_or('i'))))
}

/// Apply `f` to a single complex argument
pub(crate) fn unary(
    args: &[FormulaValue],
    f: impl Fn(Complex64) -> FormulaResult<Complex64>,
) -> FormulaResult<FormulaValue> {
    let z = complex_arg(args, 0)?;
    complex_result(f(z.value)?, z.suffix)
}

/// COMPLEX(real_num, i_num, [suffix])
pub fn fn_complex(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let re = number_arg(args, 0)?;
    let im = number_arg(args, 1)?;
    let suffix = match args.get(2) {
        None => 'i',
        Some(_) => match text_arg(args, 2)?.as_str() {
            "" | "i" => 'i',
            "j" => 'j',
            _ => return Err(CellError::Value.into()),
        },
    };
    complex_result(Complex64::new(re, im), Some(suffix))
}

/// IMREAL(inumber)
pub fn fn_imreal(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(complex_arg(args, 0)?.value.re))
}

/// IMAGINARY(inumber)
pub fn fn_imaginary(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(complex_arg(args, 0)?.value.im))
}

/// IMABS(inumber)
pub fn fn_imabs(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(complex_arg(args, 0)?.value.norm()))
}

/// IMARGUMENT(inumber) - the angle in radians, in (-π, π]
pub fn fn_imargument(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let z = complex_arg(args, 0)?.value;
    if z.re == 0.0 && z.im == 0.0 {
        return Ok(FormulaValue::Error(CellError::Div0));
    }
    Ok(FormulaValue::Number(z.arg()))
}

/// IMCONJUGATE(inumber)
pub fn fn_imconjugate(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    unary(args, |z| Ok(z.conj()))
}

/// Every complex value among the arguments, ranges flattened, blanks skipped
fn complex_values(args: &[FormulaValue]) -> FormulaResult<Vec<ComplexArg>> {
    args.iter()
        .flat_map(|arg| arg.values())
        .filter(|v| !matches!(v, FormulaValue::Empty))
        .map(complex_value)
        .collect()
}

fn fold(
    args: &[FormulaValue],
    identity: Complex64,
    op: fn(Complex64, Complex64) -> Complex64,
) -> FormulaResult<FormulaValue> {
    let values = complex_values(args)?;
    let suffix = common_suffix(values.iter().map(|z| z.suffix))?;
    let result = values.iter().fold(identity, |acc, z| op(acc, z.value));
    complex_result(result, suffix)
}

/// IMSUM(inumber1, [inumber2], ...)
pub fn fn_imsum(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    fold(args, Complex64::new(0.0, 0.0), |a, b| a + b)
}

/// IMPRODUCT(inumber1, [inumber2], ...)
pub fn fn_improduct(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    fold(args, Complex64::new(1.0, 0.0), |a, b| a * b)
}

fn binary(
    args: &[FormulaValue],
    op: impl Fn(Complex64, Complex64) -> FormulaResult<Complex64>,
) -> FormulaResult<FormulaValue> {
    let a = complex_arg(args, 0)?;
    let b = complex_arg(args, 1)?;
    let suffix = common_suffix([a.suffix, b.suffix])?;
    complex_result(op(a.value, b.value)?, suffix)
}

/// IMSUB(inumber1, inumber2)
pub fn fn_imsub(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    binary(args, |a, b| Ok(a - b))
}

/// IMDIV(inumber1, inumber2)
pub fn fn_imdiv(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    binary(args, |a, b| {
        if b.norm_sqr() == 0.0 {
            return Err(CellError::Num.into());
        }
        Ok(a / b)
    })
}

/// IMPOWER(inumber, number)
///
/// The power may itself be complex: `z^w = exp(w·ln z)`.
pub fn fn_impower(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let z = complex_arg(args, 0)?;
    let w = complex_arg(args, 1)?.value;

    let is_zero = z.value.norm_sqr() == 0.0;
    let result = if w.im == 0.0 {
        let n = w.re;
        if is_zero {
            if n <= 0.0 {
                return Err(CellError::Num.into());
            }
            Complex64::new(0.0, 0.0)
        } else if n.fract() == 0.0 && n.abs() <= i32::MAX as f64 {
            z.value.powi(n as i32)
        } else {
            z.value.powf(n)
        }
    } else {
        if is_zero {
            return Err(CellError::Num.into());
        }
        (w * z.value.ln()).exp()
    };
    complex_result(result, z.suffix)
}

/// IMSQRT(inumber) - the principal square root
pub fn fn_imsqrt(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    unary(args, |z| Ok(z.sqrt()))
}

/// IMEXP(inumber)
pub fn fn_imexp(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    unary(args, |z| Ok(z.exp()))
}

fn logarithm(args: &[FormulaValue], base: f64) -> FormulaResult<FormulaValue> {
    unary(args, |z| {
        if z.norm_sqr() == 0.0 {
            return Err(CellError::Num.into());
        }
        Ok(z.ln() / base.ln())
    })
}

/// IMLN(inumber)
pub fn fn_imln(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    logarithm(args, std::f64::consts::E)
}

/// IMLOG2(inumber)
pub fn fn_imlog2(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    logarithm(args, 2.0)
}

/// IMLOG10(inumber)
pub fn fn_imlog10(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    logarithm(args, 10.0)
}
