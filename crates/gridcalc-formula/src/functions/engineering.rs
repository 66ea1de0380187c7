//! Engineering functions: radix conversion, unit conversion, bitwise
//! operations and the error function

use super::{num_result, number_arg, opt_number_arg, text_arg};
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use ahash::AHashMap;
use gridcalc_core::CellError;
use once_cell::sync::Lazy;

/// Fixed-width two's complement bases used by BIN2*, OCT2*, HEX2* and DEC2*
///
/// Every base is limited to ten digits. A ten-digit input whose sign bit
/// is set decodes as negative; shorter inputs are always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FixedBase {
    Bin,
    Oct,
    Hex,
}

const MAX_DIGITS: usize = 10;

impl FixedBase {
    const fn radix(self) -> u32 {
        match self {
            FixedBase::Bin => 2,
            FixedBase::Oct => 8,
            FixedBase::Hex => 16,
        }
    }

    const fn bits(self) -> u32 {
        match self {
            FixedBase::Bin => 10,
            FixedBase::Oct => 30,
            FixedBase::Hex => 40,
        }
    }

    pub(crate) const fn min(self) -> i64 {
        -(1i64 << (self.bits() - 1))
    }

    pub(crate) const fn max(self) -> i64 {
        (1i64 << (self.bits() - 1)) - 1
    }
}

pub(crate) fn fixed_to_decimal(text: &str, base: FixedBase) -> Result<i64, CellError> {
    let text = text.trim();
    if text.is_empty() || text.len() > MAX_DIGITS || text.starts_with(['+', '-']) {
        return Err(CellError::Num);
    }

    let unsigned = u64::from_str_radix(text, base.radix()).map_err(|_| CellError::Num)?;
    let sign_bit = 1u64 << (base.bits() - 1);
    if text.len() == MAX_DIGITS && unsigned & sign_bit != 0 {
        Ok(unsigned as i64 - (1i64 << base.bits()))
    } else if unsigned >= 1u64 << base.bits() {
        Err(CellError::Num)
    } else {
        Ok(unsigned as i64)
    }
}

pub(crate) fn decimal_to_fixed(
    value: i64,
    base: FixedBase,
    places: Option<usize>,
) -> Result<String, CellError> {
    if value < base.min() || value > base.max() {
        return Err(CellError::Num);
    }
    if matches!(places, Some(p) if p == 0 || p > MAX_DIGITS) {
        return Err(CellError::Num);
    }

    if value < 0 {
        // Negative values always use every digit; `places` is ignored
        let unsigned = (value + (1i64 << base.bits())) as u64;
        return Ok(format!("{:0>width$}", to_radix(unsigned, base), width = MAX_DIGITS));
    }

    let digits = to_radix(value as u64, base);
    match places {
        None => Ok(digits),
        Some(p) if digits.len() > p => Err(CellError::Num),
        Some(p) => Ok(format!("{:0>width$}", digits, width = p)),
    }
}

fn to_radix(value: u64, base: FixedBase) -> String {
    match base {
        FixedBase::Bin => format!("{:b}", value),
        FixedBase::Oct => format!("{:o}", value),
        FixedBase::Hex => format!("{:X}", value),
    }
}

/// Optional `places` argument, truncated
fn places_arg(args: &[FormulaValue], index: usize) -> FormulaResult<Option<usize>> {
    match args.get(index).map(FormulaValue::scalar) {
        None | Some(FormulaValue::Empty) => Ok(None),
        Some(v) => {
            let places = v.to_number()?.trunc();
            if places < 1.0 || places > MAX_DIGITS as f64 {
                Err(CellError::Num.into())
            } else {
                Ok(Some(places as usize))
            }
        }
    }
}

fn to_decimal(args: &[FormulaValue], from: FixedBase) -> FormulaResult<FormulaValue> {
    let text = text_arg(args, 0)?;
    Ok(FormulaValue::Number(fixed_to_decimal(&text, from)? as f64))
}

fn from_decimal(args: &[FormulaValue], to: FixedBase) -> FormulaResult<FormulaValue> {
    let value = number_arg(args, 0)?.trunc();
    if value < to.min() as f64 || value > to.max() as f64 {
        return Err(CellError::Num.into());
    }
    let places = places_arg(args, 1)?;
    Ok(FormulaValue::String(decimal_to_fixed(value as i64, to, places)?))
}

fn between(args: &[FormulaValue], from: FixedBase, to: FixedBase) -> FormulaResult<FormulaValue> {
    let text = text_arg(args, 0)?;
    let value = fixed_to_decimal(&text, from)?;
    let places = places_arg(args, 1)?;
    Ok(FormulaValue::String(decimal_to_fixed(value, to, places)?))
}

/// BIN2DEC(number)
pub fn fn_bin2dec(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    to_decimal(args, FixedBase::Bin)
}

/// OCT2DEC(number)
pub fn fn_oct2dec(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    to_decimal(args, FixedBase::Oct)
}

/// HEX2DEC(number)
pub fn fn_hex2dec(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    to_decimal(args, FixedBase::Hex)
}

/// DEC2BIN(number, [places])
pub fn fn_dec2bin(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    from_decimal(args, FixedBase::Bin)
}

/// DEC2OCT(number, [places])
pub fn fn_dec2oct(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    from_decimal(args, FixedBase::Oct)
}

/// DEC2HEX(number, [places])
pub fn fn_dec2hex(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    from_decimal(args, FixedBase::Hex)
}

pub fn fn_bin2oct(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    between(args, FixedBase::Bin, FixedBase::Oct)
}

pub fn fn_bin2hex(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    between(args, FixedBase::Bin, FixedBase::Hex)
}

pub fn fn_oct2bin(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    between(args, FixedBase::Oct, FixedBase::Bin)
}

pub fn fn_oct2hex(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    between(args, FixedBase::Oct, FixedBase::Hex)
}

pub fn fn_hex2bin(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    between(args, FixedBase::Hex, FixedBase::Bin)
}

pub fn fn_hex2oct(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    between(args, FixedBase::Hex, FixedBase::Oct)
}

// === CONVERT ===

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dimension {
    Length,
    Mass,
    Time,
    Temperature,
    Area,
    Volume,
    Speed,
    Pressure,
    Energy,
    Force,
    Power,
    Magnetism,
    Information,
}

/// Which prefixes a unit accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prefixes {
    None,
    Metric,
    /// Metric and binary (`ki`, `Mi`, ...)
    Data,
}

/// `base = value * scale + offset`
#[derive(Debug, Clone, Copy)]
struct Unit {
    dimension: Dimension,
    scale: f64,
    offset: f64,
    prefixes: Prefixes,
}

const INCH: f64 = 0.0254;
const FOOT: f64 = 0.3048;
const YARD: f64 = 0.9144;
const MILE: f64 = 1609.344;
const NAUTICAL_MILE: f64 = 1852.0;

#[rustfmt::skip]
static UNITS: Lazy<AHashMap<&'static str, Unit>> = Lazy::new(|| {
    use Dimension::*;
    let table: &[(&[&str], Dimension, f64, f64, Prefixes)] = &[
        // Length, in metres
        (&["m"], Length, 1.0, 0.0, Prefixes::Metric),
        (&["mi"], Length, MILE, 0.0, Prefixes::None),
        (&["Nmi"], Length, NAUTICAL_MILE, 0.0, Prefixes::None),
        (&["in"], Length, INCH, 0.0, Prefixes::None),
        (&["ft"], Length, FOOT, 0.0, Prefixes::None),
        (&["yd"], Length, YARD, 0.0, Prefixes::None),
        (&["ang"], Length, 1e-10, 0.0, Prefixes::Metric),
        (&["ell"], Length, 1.143, 0.0, Prefixes::None),
        (&["ly"], Length, 9.460_730_472_580_8e15, 0.0, Prefixes::Metric),
        (&["parsec", "pc"], Length, 3.085_677_581_491_367e16, 0.0, Prefixes::Metric),
        (&["Pica", "Picapt"], Length, INCH / 72.0, 0.0, Prefixes::None),
        (&["pica"], Length, INCH / 6.0, 0.0, Prefixes::None),
        (&["survey_mi"], Length, 1609.347_218_694_437, 0.0, Prefixes::None),
        // Mass, in grams
        (&["g"], Mass, 1.0, 0.0, Prefixes::Metric),
        (&["sg"], Mass, 14_593.902_937_206_4, 0.0, Prefixes::None),
        (&["lbm"], Mass, 453.592_37, 0.0, Prefixes::None),
        (&["u"], Mass, 1.660_539_066_6e-24, 0.0, Prefixes::Metric),
        (&["ozm"], Mass, 28.349_523_125, 0.0, Prefixes::None),
        (&["grain"], Mass, 0.064_798_91, 0.0, Prefixes::None),
        (&["cwt", "shweight"], Mass, 45_359.237, 0.0, Prefixes::None),
        (&["uk_cwt", "lcwt", "hweight"], Mass, 50_802.345_44, 0.0, Prefixes::None),
        (&["stone"], Mass, 6_350.293_18, 0.0, Prefixes::None),
        (&["ton"], Mass, 907_184.74, 0.0, Prefixes::None),
        (&["uk_ton", "LTON", "brton"], Mass, 1_016_046.908_8, 0.0, Prefixes::None),
        // Time, in seconds
        (&["yr"], Time, 31_557_600.0, 0.0, Prefixes::None),
        (&["day", "d"], Time, 86_400.0, 0.0, Prefixes::None),
        (&["hr"], Time, 3_600.0, 0.0, Prefixes::None),
        (&["mn", "min"], Time, 60.0, 0.0, Prefixes::None),
        (&["sec", "s"], Time, 1.0, 0.0, Prefixes::Metric),
        // Temperature, in kelvin
        (&["C", "cel"], Temperature, 1.0, 273.15, Prefixes::None),
        (&["F", "fah"], Temperature, 5.0 / 9.0, 273.15 - 32.0 * 5.0 / 9.0, Prefixes::None),
        (&["K", "kel"], Temperature, 1.0, 0.0, Prefixes::Metric),
        (&["Rank"], Temperature, 5.0 / 9.0, 0.0, Prefixes::None),
        (&["Reau"], Temperature, 1.25, 273.15, Prefixes::None),
        // Area, in square metres
        (&["m2", "m^2"], Area, 1.0, 0.0, Prefixes::Metric),
        (&["mi2", "mi^2"], Area, MILE * MILE, 0.0, Prefixes::None),
        (&["Nmi2", "Nmi^2"], Area, NAUTICAL_MILE * NAUTICAL_MILE, 0.0, Prefixes::None),
        (&["in2", "in^2"], Area, INCH * INCH, 0.0, Prefixes::None),
        (&["ft2", "ft^2"], Area, FOOT * FOOT, 0.0, Prefixes::None),
        (&["yd2", "yd^2"], Area, YARD * YARD, 0.0, Prefixes::None),
        (&["ha"], Area, 10_000.0, 0.0, Prefixes::None),
        (&["ar"], Area, 100.0, 0.0, Prefixes::Metric),
        (&["uk_acre"], Area, 4_046.856_422_4, 0.0, Prefixes::None),
        (&["us_acre"], Area, 4_046.872_609_874_252, 0.0, Prefixes::None),
        // Volume, in cubic metres
        (&["m3", "m^3"], Volume, 1.0, 0.0, Prefixes::Metric),
        (&["l", "L", "lt"], Volume, 1e-3, 0.0, Prefixes::Metric),
        (&["tsp"], Volume, 4.928_921_593_75e-6, 0.0, Prefixes::None),
        (&["tbs"], Volume, 1.478_676_478_125e-5, 0.0, Prefixes::None),
        (&["oz"], Volume, 2.957_352_956_25e-5, 0.0, Prefixes::None),
        (&["cup"], Volume, 2.365_882_365e-4, 0.0, Prefixes::None),
        (&["pt", "us_pt"], Volume, 4.731_764_73e-4, 0.0, Prefixes::None),
        (&["uk_pt"], Volume, 5.682_612_5e-4, 0.0, Prefixes::None),
        (&["qt"], Volume, 9.463_529_46e-4, 0.0, Prefixes::None),
        (&["uk_qt"], Volume, 1.136_522_5e-3, 0.0, Prefixes::None),
        (&["gal"], Volume, 3.785_411_784e-3, 0.0, Prefixes::None),
        (&["uk_gal"], Volume, 4.546_09e-3, 0.0, Prefixes::None),
        (&["in3", "in^3"], Volume, INCH * INCH * INCH, 0.0, Prefixes::None),
        (&["ft3", "ft^3"], Volume, FOOT * FOOT * FOOT, 0.0, Prefixes::None),
        (&["yd3", "yd^3"], Volume, YARD * YARD * YARD, 0.0, Prefixes::None),
        (&["barrel"], Volume, 0.158_987_294_928, 0.0, Prefixes::None),
        (&["bushel"], Volume, 0.035_239_070_166_88, 0.0, Prefixes::None),
        // Speed, in metres per second
        (&["m/s", "m/sec"], Speed, 1.0, 0.0, Prefixes::Metric),
        (&["m/h", "m/hr"], Speed, 1.0 / 3_600.0, 0.0, Prefixes::Metric),
        (&["mph"], Speed, MILE / 3_600.0, 0.0, Prefixes::None),
        (&["kn"], Speed, NAUTICAL_MILE / 3_600.0, 0.0, Prefixes::None),
        (&["admkn"], Speed, 1853.184 / 3_600.0, 0.0, Prefixes::None),
        // Pressure, in pascals
        (&["Pa", "p"], Pressure, 1.0, 0.0, Prefixes::Metric),
        (&["atm", "at"], Pressure, 101_325.0, 0.0, Prefixes::Metric),
        (&["mmHg"], Pressure, 133.322, 0.0, Prefixes::Metric),
        (&["psi"], Pressure, 6_894.757_293_168, 0.0, Prefixes::None),
        (&["Torr"], Pressure, 101_325.0 / 760.0, 0.0, Prefixes::None),
        // Energy, in joules
        (&["J"], Energy, 1.0, 0.0, Prefixes::Metric),
        (&["e"], Energy, 1e-7, 0.0, Prefixes::Metric),
        (&["c"], Energy, 4.184, 0.0, Prefixes::Metric),
        (&["cal"], Energy, 4.1868, 0.0, Prefixes::Metric),
        (&["eV", "ev"], Energy, 1.602_176_634e-19, 0.0, Prefixes::Metric),
        (&["HPh", "hh"], Energy, 2_684_519.537_696_172_7, 0.0, Prefixes::None),
        (&["Wh", "wh"], Energy, 3_600.0, 0.0, Prefixes::Metric),
        (&["flb"], Energy, 1.355_817_948_331_400_4, 0.0, Prefixes::None),
        (&["BTU", "btu"], Energy, 1_055.055_852_62, 0.0, Prefixes::None),
        // Force, in newtons
        (&["N"], Force, 1.0, 0.0, Prefixes::Metric),
        (&["dyn", "dy"], Force, 1e-5, 0.0, Prefixes::Metric),
        (&["lbf"], Force, 4.448_221_615_260_5, 0.0, Prefixes::None),
        (&["pond"], Force, 9.806_65e-3, 0.0, Prefixes::Metric),
        // Power, in watts
        (&["W", "w"], Power, 1.0, 0.0, Prefixes::Metric),
        (&["HP", "h"], Power, 745.699_871_582_270_2, 0.0, Prefixes::None),
        (&["PS"], Power, 735.498_75, 0.0, Prefixes::None),
        // Magnetism, in tesla
        (&["T"], Magnetism, 1.0, 0.0, Prefixes::Metric),
        (&["ga"], Magnetism, 1e-4, 0.0, Prefixes::Metric),
        // Information, in bits
        (&["bit"], Information, 1.0, 0.0, Prefixes::Data),
        (&["byte"], Information, 8.0, 0.0, Prefixes::Data),
    ];

    let mut units = AHashMap::new();
    for (names, dimension, scale, offset, prefixes) in table {
        for name in *names {
            units.insert(*name, Unit { dimension: *dimension, scale: *scale, offset: *offset, prefixes: *prefixes });
        }
    }
    units
});

/// Longest prefixes first, so `da` wins over `d`
const METRIC_PREFIXES: &[(&str, f64)] = &[
    ("da", 1e1), ("Y", 1e24), ("Z", 1e21), ("E", 1e18), ("P", 1e15),
    ("T", 1e12), ("G", 1e9), ("M", 1e6), ("k", 1e3), ("h", 1e2),
    ("e", 1e1), ("d", 1e-1), ("c", 1e-2), ("m", 1e-3), ("u", 1e-6),
    ("n", 1e-9), ("p", 1e-12), ("f", 1e-15), ("a", 1e-18), ("z", 1e-21),
    ("y", 1e-24),
];

const BINARY_PREFIXES: &[(&str, f64)] = &[
    ("ki", 1024.0), ("Mi", 1_048_576.0), ("Gi", 1_073_741_824.0),
    ("Ti", 1_099_511_627_776.0), ("Pi", 1_125_899_906_842_624.0),
    ("Ei", 1_152_921_504_606_846_976.0),
    ("Zi", 1_180_591_620_717_411_303_424.0),
    ("Yi", 1_208_925_819_614_629_174_706_176.0),
];

/// Look a unit up by its exact, case-sensitive name, then with a prefix
fn lookup_unit(name: &str) -> Option<Unit> {
    if let Some(unit) = UNITS.get(name) {
        return Some(*unit);
    }

    for (prefix, factor) in BINARY_PREFIXES {
        let Some(base) = name.strip_prefix(prefix).and_then(|rest| UNITS.get(rest)) else {
            continue;
        };
        if base.prefixes == Prefixes::Data {
            return Some(Unit { scale: base.scale * factor, ..*base });
        }
    }

    for (prefix, factor) in METRIC_PREFIXES {
        let Some(rest) = name.strip_prefix(prefix) else {
            continue;
        };
        let Some(base) = UNITS.get(rest) else {
            continue;
        };
        if base.prefixes == Prefixes::None {
            continue;
        }
        // Square and cubic units scale the prefix too: 1 km2 = 1e6 m2
        let power = match base.dimension {
            Dimension::Area if rest != "ar" => 2,
            Dimension::Volume if rest.starts_with('m') => 3,
            _ => 1,
        };
        return Some(Unit { scale: base.scale * factor.powi(power), ..*base });
    }

    None
}

pub(crate) fn convert(value: f64, from: &str, to: &str) -> Result<f64, CellError> {
    let from = lookup_unit(from).ok_or(CellError::Na)?;
    let to = lookup_unit(to).ok_or(CellError::Na)?;
    if from.dimension != to.dimension {
        return Err(CellError::Na);
    }

    let base = value * from.scale + from.offset;
    Ok((base - to.offset) / to.scale)
}

/// CONVERT(number, from_unit, to_unit)
pub fn fn_convert(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let value = number_arg(args, 0)?;
    let from = text_arg(args, 1)?;
    let to = text_arg(args, 2)?;
    num_result(convert(value, &from, &to)?)
}

/// DELTA(number1, [number2])
pub fn fn_delta(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let a = number_arg(args, 0)?;
    let b = opt_number_arg(args, 1, 0.0)?;
    Ok(FormulaValue::Number(if a == b { 1.0 } else { 0.0 }))
}

/// GESTEP(number, [step])
pub fn fn_gestep(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = number_arg(args, 0)?;
    let step = opt_number_arg(args, 1, 0.0)?;
    Ok(FormulaValue::Number(if n >= step { 1.0 } else { 0.0 }))
}

// === Bitwise ===

const BIT_LIMIT: f64 = 281_474_976_710_656.0; // 2^48
const MAX_SHIFT: f64 = 53.0;

fn bit_operand(args: &[FormulaValue], index: usize) -> FormulaResult<u64> {
    let n = number_arg(args, index)?;
    if n < 0.0 || n >= BIT_LIMIT || n.fract() != 0.0 {
        return Err(CellError::Num.into());
    }
    Ok(n as u64)
}

fn bitwise(args: &[FormulaValue], op: fn(u64, u64) -> u64) -> FormulaResult<FormulaValue> {
    let a = bit_operand(args, 0)?;
    let b = bit_operand(args, 1)?;
    Ok(FormulaValue::Number(op(a, b) as f64))
}

pub fn fn_bitand(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    bitwise(args, |a, b| a & b)
}

pub fn fn_bitor(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    bitwise(args, |a, b| a | b)
}

pub fn fn_bitxor(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    bitwise(args, |a, b| a ^ b)
}

/// Shift left by `shift` bits (negative shifts go right); the result must
/// stay below 2^48
fn shift(args: &[FormulaValue], direction: f64) -> FormulaResult<FormulaValue> {
    let n = bit_operand(args, 0)?;
    let amount = number_arg(args, 1)?.trunc() * direction;
    if amount.abs() > MAX_SHIFT {
        return Err(CellError::Num.into());
    }

    let result = if amount >= 0.0 {
        (n as f64) * 2f64.powi(amount as i32)
    } else {
        (n >> (-amount as u32)) as f64
    };
    if result >= BIT_LIMIT {
        return Err(CellError::Num.into());
    }
    Ok(FormulaValue::Number(result))
}

/// BITLSHIFT(number, shift_amount)
pub fn fn_bitlshift(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    shift(args, 1.0)
}

/// BITRSHIFT(number, shift_amount)
pub fn fn_bitrshift(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    shift(args, -1.0)
}

// === Error function ===

/// ERF(lower_limit, [upper_limit])
///
/// With two limits, the integral between them: `erf(upper) − erf(lower)`.
pub fn fn_erf(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let lower = number_arg(args, 0)?;
    match args.get(1).map(FormulaValue::scalar) {
        None | Some(FormulaValue::Empty) => num_result(libm::erf(lower)),
        Some(upper) => num_result(libm::erf(upper.to_number()?) - libm::erf(lower)),
    }
}

/// ERF.PRECISE(x)
pub fn fn_erf_precise(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    num_result(libm::erf(number_arg(args, 0)?))
}

/// ERFC(x), also registered as ERFC.PRECISE
pub fn fn_erfc(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    num_result(libm::erfc(number_arg(args, 0)?))
}
