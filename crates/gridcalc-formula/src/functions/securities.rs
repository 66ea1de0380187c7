//! Securities: coupon schedules, coupon bonds, discounted and
//! interest-at-maturity securities, Treasury bills and bonds with an odd
//! first or last period
//!
//! Dates are Excel serials (or `YYYY-MM-DD` text). Regular coupon dates
//! fall every `12 / frequency` months counting back from maturity and stay
//! pinned to month end when maturity is a month end. A bond's price is the
//! discounted value of its remaining [`CashFlows`] less accrued interest;
//! yields invert that price numerically.

use super::financial::{date_serial, newton_raphson};
use super::{num_result, number_arg, opt_bool_arg, opt_number_arg};
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use chrono::{Datelike, Days, NaiveDate};
use gridcalc_core::CellError;

const YIELD_TOLERANCE: f64 = 1e-10;
const BISECTION_STEPS: usize = 200;
/// 9999-12-31
const MAX_DATE_SERIAL: f64 = 2_958_465.0;

// === Dates ===

fn epoch() -> FormulaResult<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 30).ok_or_else(|| CellError::Num.into())
}

fn serial_to_date(serial: f64) -> FormulaResult<NaiveDate> {
    if !(0.0..=MAX_DATE_SERIAL).contains(&serial) {
        return Err(CellError::Num.into());
    }
    epoch()?
        .checked_add_days(Days::new(serial as u64))
        .ok_or_else(|| CellError::Num.into())
}

fn date_to_serial(date: NaiveDate) -> FormulaResult<f64> {
    Ok(date.signed_duration_since(epoch()?).num_days() as f64)
}

fn date_arg(args: &[FormulaValue], index: usize) -> FormulaResult<NaiveDate> {
    let value = args.get(index).ok_or(CellError::Value)?;
    serial_to_date(date_serial(value.scalar())?)
}

fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?
        .pred_opt()
        .map(|d| d.day())
}

fn is_month_end(date: NaiveDate) -> bool {
    last_day_of_month(date.year(), date.month()) == Some(date.day())
}

/// `anchor` moved by `months`, clamped to the target month's length, or
/// pinned to its last day when `month_end` is set
fn shift_months(anchor: NaiveDate, months: i64, month_end: bool) -> FormulaResult<NaiveDate> {
    let total = i64::from(anchor.year()) * 12 + i64::from(anchor.month0()) + months;
    let year = i32::try_from(total.div_euclid(12)).map_err(|_| CellError::Num)?;
    let month = total.rem_euclid(12) as u32 + 1;
    let last = last_day_of_month(year, month).ok_or(CellError::Num)?;
    let day = if month_end { last } else { anchor.day().min(last) };
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| CellError::Num.into())
}

/// Smallest `n >= 1` such that stepping `n` periods back from `anchor`
/// lands on or before `date`
fn periods_back(anchor: NaiveDate, date: NaiveDate, months: i64, month_end: bool) -> FormulaResult<i64> {
    let month_gap = i64::from(anchor.year() - date.year()) * 12 + i64::from(anchor.month())
        - i64::from(date.month());
    let mut n = (month_gap / months).max(1);
    while shift_months(anchor, -n * months, month_end)? > date {
        n += 1;
    }
    while n > 1 && shift_months(anchor, -(n - 1) * months, month_end)? <= date {
        n -= 1;
    }
    Ok(n)
}

// === Day counts ===

/// Day-count convention selected by the `basis` argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Basis {
    /// 0: US (NASD) 30/360
    UsThirty360,
    /// 1: actual/actual
    ActualActual,
    /// 2: actual/360
    Actual360,
    /// 3: actual/365
    Actual365,
    /// 4: European 30/360
    EuropeanThirty360,
}

impl Basis {
    fn from_arg(args: &[FormulaValue], index: usize) -> FormulaResult<Self> {
        match opt_number_arg(args, index, 0.0)?.trunc() {
            b if b == 0.0 => Ok(Basis::UsThirty360),
            b if b == 1.0 => Ok(Basis::ActualActual),
            b if b == 2.0 => Ok(Basis::Actual360),
            b if b == 3.0 => Ok(Basis::Actual365),
            b if b == 4.0 => Ok(Basis::EuropeanThirty360),
            _ => Err(CellError::Num.into()),
        }
    }

    fn is_thirty_360(self) -> bool {
        matches!(self, Basis::UsThirty360 | Basis::EuropeanThirty360)
    }

    /// Days from `start` to `end` under this convention
    fn days(self, start: NaiveDate, end: NaiveDate) -> f64 {
        match self {
            Basis::UsThirty360 => days_360(start, end, false),
            Basis::EuropeanThirty360 => days_360(start, end, true),
            _ => actual_days(start, end),
        }
    }

    /// Length of the coupon period `(pcd, ncd]`
    fn period_days(self, pcd: NaiveDate, ncd: NaiveDate, frequency: f64) -> f64 {
        match self {
            Basis::ActualActual => actual_days(pcd, ncd),
            Basis::Actual365 => 365.0 / frequency,
            _ => 360.0 / frequency,
        }
    }

    /// Days from `date` to the end of the coupon period `(pcd, ncd]`
    fn days_to_next(self, pcd: NaiveDate, ncd: NaiveDate, date: NaiveDate, frequency: f64) -> f64 {
        if self.is_thirty_360() {
            self.period_days(pcd, ncd, frequency) - self.days(pcd, date)
        } else {
            actual_days(date, ncd)
        }
    }

    /// Years between two dates, as YEARFRAC counts them
    fn year_fraction(self, start: NaiveDate, end: NaiveDate) -> FormulaResult<f64> {
        Ok(match self {
            Basis::UsThirty360 | Basis::EuropeanThirty360 => self.days(start, end) / 360.0,
            Basis::Actual360 => actual_days(start, end) / 360.0,
            Basis::Actual365 => actual_days(start, end) / 365.0,
            Basis::ActualActual => actual_year_fraction(start, end)?,
        })
    }
}

fn actual_days(start: NaiveDate, end: NaiveDate) -> f64 {
    end.signed_duration_since(start).num_days() as f64
}

fn is_last_of_february(date: NaiveDate) -> bool {
    date.month() == 2 && is_month_end(date)
}

fn days_360(start: NaiveDate, end: NaiveDate, european: bool) -> f64 {
    let (mut d1, mut d2) = (start.day(), end.day());
    if european {
        d1 = d1.min(30);
        d2 = d2.min(30);
    } else {
        let start_feb_end = is_last_of_february(start);
        if start_feb_end && is_last_of_february(end) {
            d2 = 30;
        }
        if start_feb_end || d1 == 31 {
            d1 = 30;
        }
        if d2 == 31 && d1 >= 30 {
            d2 = 30;
        }
    }
    f64::from(end.year() - start.year()) * 360.0
        + (f64::from(end.month()) - f64::from(start.month())) * 30.0
        + (f64::from(d2) - f64::from(d1))
}

fn days_in_year(year: i32) -> f64 {
    if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
        366.0
    } else {
        365.0
    }
}

/// Actual days over the length of the year(s) spanned: 366 within a year
/// that touches a February 29, the average year length over longer spans
fn actual_year_fraction(start: NaiveDate, end: NaiveDate) -> FormulaResult<f64> {
    let days = actual_days(start, end);
    if days == 0.0 {
        return Ok(0.0);
    }

    let year_length = if end <= shift_months(start, 12, false)? {
        let leap_day = |year: i32| NaiveDate::from_ymd_opt(year, 2, 29);
        let spans_leap_day = if start.year() == end.year() {
            leap_day(start.year()).is_some()
        } else {
            leap_day(start.year()).is_some_and(|d| start <= d)
                || leap_day(end.year()).is_some_and(|d| end >= d)
        };
        if spans_leap_day {
            366.0
        } else {
            365.0
        }
    } else {
        let years = start.year()..=end.year();
        let count = f64::from(end.year() - start.year() + 1);
        years.map(days_in_year).sum::<f64>() / count
    };
    Ok(days / year_length)
}

// === Coupon schedule ===

fn frequency_arg(args: &[FormulaValue], index: usize) -> FormulaResult<f64> {
    let frequency = number_arg(args, index)?.trunc();
    if frequency == 1.0 || frequency == 2.0 || frequency == 4.0 {
        Ok(frequency)
    } else {
        Err(CellError::Num.into())
    }
}

fn months_per_period(frequency: f64) -> i64 {
    12 / frequency as i64
}

/// The coupon period a settlement date falls in
#[derive(Debug, Clone, Copy)]
struct CouponPeriod {
    /// Previous coupon date, on or before settlement
    pcd: NaiveDate,
    /// Next coupon date, after settlement
    ncd: NaiveDate,
    /// Coupons payable between settlement and maturity
    remaining: i64,
    /// Days from the previous coupon to settlement
    accrued_days: f64,
    /// Days in the coupon period
    period_days: f64,
    /// Days from settlement to the next coupon
    days_to_next: f64,
}

impl CouponPeriod {
    fn locate(settlement: NaiveDate, maturity: NaiveDate, frequency: f64, basis: Basis) -> FormulaResult<Self> {
        if settlement >= maturity {
            return Err(CellError::Num.into());
        }
        let months = months_per_period(frequency);
        let month_end = is_month_end(maturity);
        let n = periods_back(maturity, settlement, months, month_end)?;
        let pcd = shift_months(maturity, -n * months, month_end)?;
        let ncd = shift_months(maturity, -(n - 1) * months, month_end)?;

        Ok(Self {
            pcd,
            ncd,
            remaining: n,
            accrued_days: basis.days(pcd, settlement),
            period_days: basis.period_days(pcd, ncd, frequency),
            days_to_next: basis.days_to_next(pcd, ncd, settlement, frequency),
        })
    }

    fn from_args(args: &[FormulaValue]) -> FormulaResult<Self> {
        let settlement = date_arg(args, 0)?;
        let maturity = date_arg(args, 1)?;
        let frequency = frequency_arg(args, 2)?;
        let basis = Basis::from_arg(args, 3)?;
        Self::locate(settlement, maturity, frequency, basis)
    }
}

/// COUPDAYBS(settlement, maturity, frequency, [basis])
pub fn fn_coupdaybs(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    num_result(CouponPeriod::from_args(args)?.accrued_days)
}

/// COUPDAYS(settlement, maturity, frequency, [basis])
pub fn fn_coupdays(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    num_result(CouponPeriod::from_args(args)?.period_days)
}

/// COUPDAYSNC(settlement, maturity, frequency, [basis])
pub fn fn_coupdaysnc(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    num_result(CouponPeriod::from_args(args)?.days_to_next)
}

/// COUPNCD(settlement, maturity, frequency, [basis])
pub fn fn_coupncd(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    num_result(date_to_serial(CouponPeriod::from_args(args)?.ncd)?)
}

/// COUPPCD(settlement, maturity, frequency, [basis])
pub fn fn_couppcd(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    num_result(date_to_serial(CouponPeriod::from_args(args)?.pcd)?)
}

/// COUPNUM(settlement, maturity, frequency, [basis])
pub fn fn_coupnum(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    num_result(CouponPeriod::from_args(args)?.remaining as f64)
}

// === Pricing ===

/// Payments discounted at `(1 + yld/frequency)^-exponent`, where exponents
/// count coupon periods from settlement
struct CashFlows {
    flows: Vec<(f64, f64)>,
    accrued: f64,
    frequency: f64,
}

impl CashFlows {
    /// A regular coupon bond with at least two coupons left, per 100 face
    fn regular(period: &CouponPeriod, rate: f64, redemption: f64, frequency: f64) -> Self {
        let coupon = 100.0 * rate / frequency;
        let offset = period.days_to_next / period.period_days;
        let mut flows: Vec<(f64, f64)> = (0..period.remaining)
            .map(|k| (k as f64 + offset, coupon))
            .collect();
        flows.push(((period.remaining - 1) as f64 + offset, redemption));

        Self {
            flows,
            accrued: coupon * period.accrued_days / period.period_days,
            frequency,
        }
    }

    /// Price and its derivative with respect to the yield
    fn price(&self, yld: f64) -> Option<(f64, f64)> {
        let base = 1.0 + yld / self.frequency;
        if base <= 0.0 {
            return None;
        }
        let mut price = -self.accrued;
        let mut slope = 0.0;
        for &(exponent, amount) in &self.flows {
            let discounted = amount / base.powf(exponent);
            price += discounted;
            slope -= exponent / self.frequency * discounted / base;
        }
        (price.is_finite() && slope.is_finite()).then_some((price, slope))
    }

    /// Macaulay duration in years
    fn duration(&self, yld: f64) -> Option<f64> {
        let base = 1.0 + yld / self.frequency;
        if base <= 0.0 {
            return None;
        }
        let (weighted, total) = self.flows.iter().fold((0.0, 0.0), |(w, t), &(exponent, amount)| {
            let discounted = amount / base.powf(exponent);
            (w + exponent * discounted, t + discounted)
        });
        let duration = weighted / total / self.frequency;
        duration.is_finite().then_some(duration)
    }

    /// Yield at which the price equals `target`
    fn solve_yield(&self, target: f64) -> FormulaResult<f64> {
        let newton = newton_raphson(
            0.1,
            YIELD_TOLERANCE,
            |y| self.price(y).map(|(p, _)| p - target),
            |y| self.price(y).map(|(_, dp)| dp),
        );
        if let Some(yld) = newton {
            return Ok(yld);
        }

        log::debug!("yield for price {} falls back to bisection", target);
        // Price falls as the yield rises
        let excess = |y: f64| self.price(y).map(|(p, _)| p - target);
        let (mut lo, mut hi) = (-0.99, 100.0);
        match (excess(lo), excess(hi)) {
            (Some(a), Some(b)) if a >= 0.0 && b <= 0.0 => {}
            _ => return Err(CellError::Num.into()),
        }
        for _ in 0..BISECTION_STEPS {
            let mid = (lo + hi) / 2.0;
            match excess(mid) {
                Some(e) if e > 0.0 => lo = mid,
                Some(_) => hi = mid,
                None => return Err(CellError::Num.into()),
            }
            if hi - lo <= YIELD_TOLERANCE {
                break;
            }
        }
        Ok((lo + hi) / 2.0)
    }
}

/// Settlement, maturity, frequency and basis of a coupon bond, located at
/// the given argument positions
fn bond_period(
    args: &[FormulaValue],
    frequency_at: usize,
) -> FormulaResult<(CouponPeriod, f64)> {
    let settlement = date_arg(args, 0)?;
    let maturity = date_arg(args, 1)?;
    let frequency = frequency_arg(args, frequency_at)?;
    let basis = Basis::from_arg(args, frequency_at + 1)?;
    Ok((CouponPeriod::locate(settlement, maturity, frequency, basis)?, frequency))
}

/// PRICE(settlement, maturity, rate, yld, redemption, frequency, [basis])
pub fn fn_price(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let rate = number_arg(args, 2)?;
    let yld = number_arg(args, 3)?;
    let redemption = number_arg(args, 4)?;
    let (period, frequency) = bond_period(args, 5)?;
    if rate < 0.0 || yld < 0.0 || redemption <= 0.0 {
        return Err(CellError::Num.into());
    }

    if period.remaining == 1 {
        // One coupon left: simple interest to maturity
        let coupon = 100.0 * rate / frequency;
        let offset = period.days_to_next / period.period_days;
        let accrued = coupon * period.accrued_days / period.period_days;
        return num_result((redemption + coupon) / (1.0 + offset * yld / frequency) - accrued);
    }

    let flows = CashFlows::regular(&period, rate, redemption, frequency);
    let (price, _) = flows.price(yld).ok_or(CellError::Num)?;
    num_result(price)
}

/// YIELD(settlement, maturity, rate, pr, redemption, frequency, [basis])
pub fn fn_yield(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let rate = number_arg(args, 2)?;
    let pr = number_arg(args, 3)?;
    let redemption = number_arg(args, 4)?;
    let (period, frequency) = bond_period(args, 5)?;
    if rate < 0.0 || pr <= 0.0 || redemption <= 0.0 {
        return Err(CellError::Num.into());
    }

    if period.remaining == 1 {
        let coupon = rate / frequency;
        let dirty = pr / 100.0 + period.accrued_days / period.period_days * coupon;
        let payoff = redemption / 100.0 + coupon;
        let remaining_days = period.period_days - period.accrued_days;
        return num_result((payoff - dirty) / dirty * frequency * period.period_days / remaining_days);
    }

    let flows = CashFlows::regular(&period, rate, redemption, frequency);
    num_result(flows.solve_yield(pr)?)
}

fn bond_duration(args: &[FormulaValue]) -> FormulaResult<(f64, f64, f64)> {
    let coupon = number_arg(args, 2)?;
    let yld = number_arg(args, 3)?;
    let (period, frequency) = bond_period(args, 4)?;
    if coupon < 0.0 || yld < 0.0 {
        return Err(CellError::Num.into());
    }

    let flows = CashFlows::regular(&period, coupon, 100.0, frequency);
    let duration = flows.duration(yld).ok_or(CellError::Num)?;
    Ok((duration, yld, frequency))
}

/// DURATION(settlement, maturity, coupon, yld, frequency, [basis])
pub fn fn_duration(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (duration, _, _) = bond_duration(args)?;
    num_result(duration)
}

/// MDURATION(settlement, maturity, coupon, yld, frequency, [basis])
pub fn fn_mduration(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (duration, yld, frequency) = bond_duration(args)?;
    num_result(duration / (1.0 + yld / frequency))
}

// === Accrued interest ===

/// ACCRINT(issue, first_interest, settlement, rate, par, frequency, [basis], [calc_method])
///
/// Interest accrues from issue, or from the first interest date when
/// `calc_method` is FALSE and settlement comes after it.
pub fn fn_accrint(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let issue = date_arg(args, 0)?;
    let first_interest = date_arg(args, 1)?;
    let settlement = date_arg(args, 2)?;
    let rate = number_arg(args, 3)?;
    let par = opt_number_arg(args, 4, 1000.0)?;
    frequency_arg(args, 5)?;
    let basis = Basis::from_arg(args, 6)?;
    let from_issue = opt_bool_arg(args, 7, true)?;

    if issue >= settlement || issue >= first_interest || rate <= 0.0 || par <= 0.0 {
        return Err(CellError::Num.into());
    }
    let start = if from_issue || settlement <= first_interest {
        issue
    } else {
        first_interest
    };
    num_result(par * rate * basis.year_fraction(start, settlement)?)
}

/// ACCRINTM(issue, settlement, rate, [par], [basis])
pub fn fn_accrintm(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let issue = date_arg(args, 0)?;
    let settlement = date_arg(args, 1)?;
    let rate = number_arg(args, 2)?;
    let par = opt_number_arg(args, 3, 1000.0)?;
    let basis = Basis::from_arg(args, 4)?;

    if issue >= settlement || rate <= 0.0 || par <= 0.0 {
        return Err(CellError::Num.into());
    }
    num_result(par * rate * basis.year_fraction(issue, settlement)?)
}

// === Discounted securities ===

/// Settlement-to-maturity year fraction plus two positive amounts, the
/// argument shape shared by DISC, PRICEDISC, YIELDDISC, INTRATE and RECEIVED
fn discount_args(args: &[FormulaValue]) -> FormulaResult<(f64, f64, f64)> {
    let settlement = date_arg(args, 0)?;
    let maturity = date_arg(args, 1)?;
    let first = number_arg(args, 2)?;
    let second = number_arg(args, 3)?;
    let basis = Basis::from_arg(args, 4)?;
    if settlement >= maturity || first <= 0.0 || second <= 0.0 {
        return Err(CellError::Num.into());
    }
    Ok((basis.year_fraction(settlement, maturity)?, first, second))
}

/// DISC(settlement, maturity, pr, redemption, [basis])
pub fn fn_disc(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (years, pr, redemption) = discount_args(args)?;
    num_result((redemption - pr) / redemption / years)
}

/// PRICEDISC(settlement, maturity, discount, redemption, [basis])
pub fn fn_pricedisc(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (years, discount, redemption) = discount_args(args)?;
    let price = redemption * (1.0 - discount * years);
    if price <= 0.0 {
        return Err(CellError::Num.into());
    }
    num_result(price)
}

/// YIELDDISC(settlement, maturity, pr, redemption, [basis])
pub fn fn_yielddisc(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (years, pr, redemption) = discount_args(args)?;
    num_result((redemption - pr) / pr / years)
}

/// INTRATE(settlement, maturity, investment, redemption, [basis])
pub fn fn_intrate(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (years, investment, redemption) = discount_args(args)?;
    num_result((redemption - investment) / investment / years)
}

/// RECEIVED(settlement, maturity, investment, discount, [basis])
pub fn fn_received(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (years, investment, discount) = discount_args(args)?;
    let remaining = 1.0 - discount * years;
    if remaining <= 0.0 {
        return Err(CellError::Num.into());
    }
    num_result(investment / remaining)
}

/// Year fractions issue→maturity, issue→settlement and settlement→maturity
/// for a security paying interest at maturity
fn at_maturity_args(args: &[FormulaValue]) -> FormulaResult<(f64, f64, f64, f64, f64)> {
    let settlement = date_arg(args, 0)?;
    let maturity = date_arg(args, 1)?;
    let issue = date_arg(args, 2)?;
    let rate = number_arg(args, 3)?;
    let amount = number_arg(args, 4)?;
    let basis = Basis::from_arg(args, 5)?;
    if settlement >= maturity || issue > settlement || rate < 0.0 || amount < 0.0 {
        return Err(CellError::Num.into());
    }
    Ok((
        basis.year_fraction(issue, maturity)?,
        basis.year_fraction(issue, settlement)?,
        basis.year_fraction(settlement, maturity)?,
        rate,
        amount,
    ))
}

/// PRICEMAT(settlement, maturity, issue, rate, yld, [basis])
pub fn fn_pricemat(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (issue_to_maturity, issue_to_settlement, to_maturity, rate, yld) = at_maturity_args(args)?;
    let payoff = 100.0 * (1.0 + rate * issue_to_maturity);
    let accrued = 100.0 * rate * issue_to_settlement;
    num_result(payoff / (1.0 + yld * to_maturity) - accrued)
}

/// YIELDMAT(settlement, maturity, issue, rate, pr, [basis])
pub fn fn_yieldmat(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (issue_to_maturity, issue_to_settlement, to_maturity, rate, pr) = at_maturity_args(args)?;
    if pr == 0.0 {
        return Err(CellError::Num.into());
    }
    let payoff = 100.0 * (1.0 + rate * issue_to_maturity);
    let dirty = pr + 100.0 * rate * issue_to_settlement;
    num_result((payoff / dirty - 1.0) / to_maturity)
}

// === Treasury bills ===

/// Days from settlement to maturity, at most one year
fn bill_days(args: &[FormulaValue]) -> FormulaResult<(f64, f64)> {
    let settlement = date_arg(args, 0)?;
    let maturity = date_arg(args, 1)?;
    let value = number_arg(args, 2)?;
    if settlement >= maturity || maturity > shift_months(settlement, 12, false)? || value <= 0.0 {
        return Err(CellError::Num.into());
    }
    Ok((actual_days(settlement, maturity), value))
}

/// TBILLPRICE(settlement, maturity, discount)
pub fn fn_tbillprice(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (days, discount) = bill_days(args)?;
    let price = 100.0 * (1.0 - discount * days / 360.0);
    if price <= 0.0 {
        return Err(CellError::Num.into());
    }
    num_result(price)
}

/// TBILLYIELD(settlement, maturity, pr)
pub fn fn_tbillyield(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (days, pr) = bill_days(args)?;
    num_result((100.0 - pr) / pr * 360.0 / days)
}

/// TBILLEQ(settlement, maturity, discount)
///
/// Bills beyond half a year compare against a semiannual coupon bond, so
/// the equivalent yield solves `100/P = (1 + y/2)·(1 + (t − ½)·y)` with
/// `t` the term in years.
pub fn fn_tbilleq(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (days, discount) = bill_days(args)?;
    let price = 100.0 * (1.0 - discount * days / 360.0);
    if price <= 0.0 {
        return Err(CellError::Num.into());
    }
    if days <= 182.0 {
        return num_result(365.0 * discount / (360.0 - discount * days));
    }

    let term = days / 365.0;
    let discriminant = term * term - (2.0 * term - 1.0) * (1.0 - 100.0 / price);
    if discriminant < 0.0 {
        return Err(CellError::Num.into());
    }
    num_result((-term + discriminant.sqrt()) / (term - 0.5))
}

// === Odd first and last periods ===

/// Dates and amounts of a bond whose first coupon period is irregular
struct OddFirst {
    settlement: NaiveDate,
    maturity: NaiveDate,
    issue: NaiveDate,
    first_coupon: NaiveDate,
    rate: f64,
    redemption: f64,
    frequency: f64,
    basis: Basis,
}

impl OddFirst {
    /// Arguments in ODDFPRICE/ODDFYIELD order; `args[5]` is the yield or price
    fn from_args(args: &[FormulaValue]) -> FormulaResult<(Self, f64)> {
        let bond = Self {
            settlement: date_arg(args, 0)?,
            maturity: date_arg(args, 1)?,
            issue: date_arg(args, 2)?,
            first_coupon: date_arg(args, 3)?,
            rate: number_arg(args, 4)?,
            redemption: number_arg(args, 6)?,
            frequency: frequency_arg(args, 7)?,
            basis: Basis::from_arg(args, 8)?,
        };
        let value = number_arg(args, 5)?;
        if !(bond.maturity > bond.first_coupon
            && bond.first_coupon > bond.settlement
            && bond.settlement > bond.issue)
            || bond.rate < 0.0
            || value < 0.0
            || bond.redemption <= 0.0
        {
            return Err(CellError::Num.into());
        }
        Ok((bond, value))
    }

    /// The stub from issue to the first coupon is split into quasi-coupon
    /// periods, each weighted by its share of a regular period
    fn cash_flows(&self) -> FormulaResult<CashFlows> {
        let months = months_per_period(self.frequency);
        let month_end = is_month_end(self.first_coupon);
        let quasi = |j: i64| shift_months(self.first_coupon, -j * months, month_end);
        let basis = self.basis;

        let mut stub_share = 0.0;
        let mut accrued_share = 0.0;
        for j in 1..=periods_back(self.first_coupon, self.issue, months, month_end)? {
            let (start, end) = (quasi(j)?, quasi(j - 1)?);
            let length = basis.period_days(start, end, self.frequency);
            let from = start.max(self.issue);
            stub_share += basis.days(from, end) / length;
            if self.settlement > from {
                accrued_share += basis.days(from, self.settlement.min(end)) / length;
            }
        }

        let n = periods_back(self.first_coupon, self.settlement, months, month_end)?;
        let (pcd, ncd) = (quasi(n)?, quasi(n - 1)?);
        let offset = (n - 1) as f64
            + basis.days_to_next(pcd, ncd, self.settlement, self.frequency)
                / basis.period_days(pcd, ncd, self.frequency);

        let regular = periods_back(self.maturity, self.first_coupon, months, is_month_end(self.maturity))?;
        let coupon = 100.0 * self.rate / self.frequency;
        let mut flows = vec![(offset, coupon * stub_share)];
        flows.extend((1..=regular).map(|k| (k as f64 + offset, coupon)));
        flows.push((regular as f64 + offset, self.redemption));

        Ok(CashFlows {
            flows,
            accrued: coupon * accrued_share,
            frequency: self.frequency,
        })
    }
}

/// ODDFPRICE(settlement, maturity, issue, first_coupon, rate, yld, redemption, frequency, [basis])
pub fn fn_oddfprice(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (bond, yld) = OddFirst::from_args(args)?;
    let (price, _) = bond.cash_flows()?.price(yld).ok_or(CellError::Num)?;
    num_result(price)
}

/// ODDFYIELD(settlement, maturity, issue, first_coupon, rate, pr, redemption, frequency, [basis])
pub fn fn_oddfyield(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (bond, pr) = OddFirst::from_args(args)?;
    if pr == 0.0 {
        return Err(CellError::Num.into());
    }
    num_result(bond.cash_flows()?.solve_yield(pr)?)
}

/// Shares of a regular coupon period in the odd last period: coupon
/// accrued from the last interest date to maturity, accrued to settlement,
/// and outstanding from settlement to maturity
struct OddLast {
    coupon: f64,
    redemption: f64,
    frequency: f64,
    stub_share: f64,
    accrued_share: f64,
    remaining_share: f64,
}

impl OddLast {
    /// Arguments in ODDLPRICE/ODDLYIELD order; `args[4]` is the yield or price
    fn from_args(args: &[FormulaValue]) -> FormulaResult<(Self, f64)> {
        let settlement = date_arg(args, 0)?;
        let maturity = date_arg(args, 1)?;
        let last_interest = date_arg(args, 2)?;
        let rate = number_arg(args, 3)?;
        let value = number_arg(args, 4)?;
        let redemption = number_arg(args, 5)?;
        let frequency = frequency_arg(args, 6)?;
        let basis = Basis::from_arg(args, 7)?;
        if !(maturity > settlement && settlement > last_interest)
            || rate < 0.0
            || value < 0.0
            || redemption <= 0.0
        {
            return Err(CellError::Num.into());
        }

        let months = months_per_period(frequency);
        let month_end = is_month_end(last_interest);
        let mut stub_share = 0.0;
        let mut accrued_share = 0.0;
        let mut remaining_share = 0.0;
        let mut start = last_interest;
        let mut j = 1;
        while start < maturity {
            let end = shift_months(last_interest, j * months, month_end)?;
            let length = basis.period_days(start, end, frequency);
            let stop = end.min(maturity);
            stub_share += basis.days(start, stop) / length;
            if settlement > start {
                accrued_share += basis.days(start, settlement.min(end)) / length;
            }
            let from = settlement.max(start);
            if from < stop {
                remaining_share += basis.days(from, stop) / length;
            }
            start = end;
            j += 1;
        }

        let bond = Self {
            coupon: 100.0 * rate / frequency,
            redemption,
            frequency,
            stub_share,
            accrued_share,
            remaining_share,
        };
        Ok((bond, value))
    }

    fn accrued(&self) -> f64 {
        self.coupon * self.accrued_share
    }

    fn payoff(&self) -> f64 {
        self.redemption + self.coupon * self.stub_share
    }
}

/// ODDLPRICE(settlement, maturity, last_interest, rate, yld, redemption, frequency, [basis])
pub fn fn_oddlprice(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (bond, yld) = OddLast::from_args(args)?;
    let discount = 1.0 + bond.remaining_share * yld / bond.frequency;
    num_result(bond.payoff() / discount - bond.accrued())
}

/// ODDLYIELD(settlement, maturity, last_interest, rate, pr, redemption, frequency, [basis])
pub fn fn_oddlyield(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (bond, pr) = OddLast::from_args(args)?;
    let dirty = pr + bond.accrued();
    if dirty == 0.0 || bond.remaining_share == 0.0 {
        return Err(CellError::Num.into());
    }
    num_result((bond.payoff() - dirty) / dirty * bond.frequency / bond.remaining_share)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::test_support::{assert_close, eval, eval_number};
    use gridcalc_core::Grid;
    use pretty_assertions::assert_eq;

    fn n(formula: &str) -> f64 {
        eval_number(formula, &Grid::new())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_thirty_360_day_counts() {
        assert_eq!(days_360(date(2011, 1, 31), date(2011, 3, 31), false), 60.0);
        assert_eq!(days_360(date(2011, 2, 28), date(2011, 3, 31), false), 30.0);
        assert_eq!(days_360(date(2011, 1, 30), date(2011, 3, 31), true), 60.0);
        assert_eq!(days_360(date(2011, 1, 15), date(2011, 3, 31), true), 75.0);
    }

    #[test]
    fn test_actual_year_fraction() {
        assert_close(
            actual_year_fraction(date(2012, 1, 1), date(2012, 7, 1)).unwrap(),
            182.0 / 366.0,
            1e-12,
        );
        assert_close(
            actual_year_fraction(date(2011, 1, 1), date(2011, 7, 1)).unwrap(),
            181.0 / 365.0,
            1e-12,
        );
        // Two calendar years spanned: average of 365 and 366
        assert_close(
            actual_year_fraction(date(2011, 6, 1), date(2012, 12, 1)).unwrap(),
            549.0 / 365.5,
            1e-12,
        );
    }

    #[test]
    fn test_month_end_coupon_dates() {
        assert_eq!(shift_months(date(2011, 8, 31), -6, true).unwrap(), date(2011, 2, 28));
        assert_eq!(shift_months(date(2011, 2, 28), 6, true).unwrap(), date(2011, 8, 31));
        assert_eq!(shift_months(date(2011, 5, 15), -6, false).unwrap(), date(2010, 11, 15));
        assert_eq!(periods_back(date(2011, 11, 15), date(2011, 1, 25), 6, false).unwrap(), 2);
    }

    #[test]
    fn test_coupon_schedule() {
        let args = "\"2011-01-25\",\"2011-11-15\",2,1";
        assert_eq!(n(&format!("=COUPDAYBS({args})")), 71.0);
        assert_eq!(n(&format!("=COUPDAYS({args})")), 181.0);
        assert_eq!(n(&format!("=COUPDAYSNC({args})")), 110.0);
        assert_eq!(n(&format!("=COUPNUM({args})")), 2.0);
        // 2011-05-15 and 2010-11-15
        assert_eq!(n(&format!("=COUPNCD({args})")), 40678.0);
        assert_eq!(n(&format!("=COUPPCD({args})")), 40497.0);
        // Serial dates work the same as text
        assert_eq!(n("=COUPNUM(40568,40862,2,1)"), 2.0);
    }

    #[test]
    fn test_coupon_schedule_errors() {
        assert_eq!(
            eval("=COUPNUM(\"2011-11-15\",\"2011-01-25\",2)"),
            FormulaValue::Error(CellError::Num)
        );
        assert_eq!(
            eval("=COUPNUM(\"2011-01-25\",\"2011-11-15\",3)"),
            FormulaValue::Error(CellError::Num)
        );
        assert_eq!(
            eval("=COUPDAYS(\"2011-01-25\",\"2011-11-15\",2,5)"),
            FormulaValue::Error(CellError::Num)
        );
        assert_eq!(
            eval("=COUPDAYS(\"not a date\",\"2011-11-15\",2)"),
            FormulaValue::Error(CellError::Value)
        );
    }

    #[test]
    fn test_price_and_yield() {
        assert_close(
            n("=PRICE(\"2008-02-15\",\"2017-11-15\",0.0575,0.065,100,2,0)"),
            94.63436,
            1e-5,
        );
        assert_close(
            n("=YIELD(\"2008-02-15\",\"2016-11-15\",0.0575,95.04287,100,2,0)"),
            0.065,
            1e-7,
        );
        let price = n("=PRICE(\"2008-02-15\",\"2017-11-15\",0.0575,0.07,100,4,1)");
        assert_close(
            n(&format!("=YIELD(\"2008-02-15\",\"2017-11-15\",0.0575,{price},100,4,1)")),
            0.07,
            1e-9,
        );
    }

    #[test]
    fn test_single_coupon_price_and_yield_agree() {
        let price = n("=PRICE(\"2011-01-25\",\"2011-05-15\",0.06,0.05,100,2,0)");
        assert_close(
            n(&format!("=YIELD(\"2011-01-25\",\"2011-05-15\",0.06,{price},100,2,0)")),
            0.05,
            1e-12,
        );
        assert_eq!(
            eval("=PRICE(\"2011-01-25\",\"2011-05-15\",-0.06,0.05,100,2,0)"),
            FormulaValue::Error(CellError::Num)
        );
    }

    #[test]
    fn test_duration() {
        assert_close(
            n("=DURATION(\"2008-01-01\",\"2016-01-01\",0.08,0.09,2,1)"),
            5.993775,
            1e-6,
        );
        assert_close(
            n("=MDURATION(\"2008-01-01\",\"2016-01-01\",0.08,0.09,2,1)"),
            5.73567,
            1e-5,
        );
    }

    #[test]
    fn test_accrued_interest() {
        assert_close(
            n("=ACCRINT(\"2008-03-01\",\"2008-08-31\",\"2008-05-01\",0.1,1000,2,0)"),
            16.666667,
            1e-6,
        );
        assert_close(
            n("=ACCRINT(\"2008-03-05\",\"2008-08-31\",\"2008-05-01\",0.1,1000,2,0,FALSE)"),
            15.555556,
            1e-6,
        );
        // Settlement past the first interest date accrues from there when asked
        assert_close(
            n("=ACCRINT(\"2008-03-01\",\"2008-08-31\",\"2008-10-31\",0.1,1000,2,0,FALSE)"),
            1000.0 * 0.1 * 60.0 / 360.0,
            1e-9,
        );
        assert_close(n("=ACCRINTM(\"2008-04-01\",\"2008-06-15\",0.1,1000,3)"), 20.54794521, 1e-8);
        assert_close(n("=ACCRINTM(\"2008-04-01\",\"2008-06-15\",0.1,,3)"), 20.54794521, 1e-8);
        assert_eq!(
            eval("=ACCRINTM(\"2008-06-15\",\"2008-04-01\",0.1)"),
            FormulaValue::Error(CellError::Num)
        );
    }

    #[test]
    fn test_discounted_securities() {
        assert_close(n("=DISC(\"2007-01-25\",\"2007-06-15\",97.975,100,1)"), 0.052420213, 1e-9);
        assert_close(n("=PRICEDISC(\"2008-02-16\",\"2008-03-01\",0.0525,100,2)"), 99.79583333, 1e-8);
        assert_close(n("=YIELDDISC(\"2008-02-16\",\"2008-03-01\",99.795,100,2)"), 0.052823, 1e-6);
        assert_close(n("=INTRATE(\"2008-02-15\",\"2008-05-15\",1000000,1014420,2)"), 0.05768, 1e-9);
        assert_close(
            n("=RECEIVED(\"2008-02-15\",\"2008-05-15\",1000000,0.0575,2)"),
            1014584.654,
            1e-3,
        );
        assert_eq!(
            eval("=DISC(\"2007-01-25\",\"2007-06-15\",0,100)"),
            FormulaValue::Error(CellError::Num)
        );
    }

    #[test]
    fn test_interest_at_maturity() {
        assert_close(
            n("=PRICEMAT(\"2008-02-15\",\"2008-04-13\",\"2007-11-11\",0.061,0.061,0)"),
            99.98449888,
            1e-8,
        );
        assert_close(
            n("=YIELDMAT(\"2008-03-15\",\"2008-11-03\",\"2007-11-08\",0.0625,100.0123,0)"),
            0.060954,
            1e-6,
        );
        assert_eq!(
            eval("=PRICEMAT(\"2008-02-15\",\"2008-04-13\",\"2008-03-01\",0.061,0.061)"),
            FormulaValue::Error(CellError::Num)
        );
    }

    #[test]
    fn test_treasury_bills() {
        assert_close(n("=TBILLPRICE(\"2008-03-31\",\"2008-06-01\",0.09)"), 98.45, 1e-9);
        assert_close(n("=TBILLYIELD(\"2008-03-31\",\"2008-06-01\",98.45)"), 0.091417, 1e-6);
        assert_close(n("=TBILLEQ(\"2008-03-31\",\"2008-06-01\",0.0914)"), 0.094151, 1e-6);
        // Longer than half a year
        assert_close(n("=TBILLEQ(\"2008-03-31\",\"2009-01-31\",0.09)"), 0.0969136, 1e-6);
        assert_eq!(
            eval("=TBILLPRICE(\"2008-03-31\",\"2009-06-01\",0.09)"),
            FormulaValue::Error(CellError::Num)
        );
    }

    #[test]
    fn test_odd_first_period() {
        let price = n(
            "=ODDFPRICE(\"2008-11-11\",\"2021-03-01\",\"2008-10-15\",\"2009-03-01\",0.0785,0.0625,100,2,1)",
        );
        assert_close(price, 113.597717, 1e-6);
        assert_close(
            n(&format!(
                "=ODDFYIELD(\"2008-11-11\",\"2021-03-01\",\"2008-10-15\",\"2009-03-01\",0.0785,{price},100,2,1)"
            )),
            0.0625,
            1e-9,
        );
        // A long first period spanning several quasi-coupon periods
        let long = n(
            "=ODDFPRICE(\"2008-11-11\",\"2021-03-01\",\"2008-01-15\",\"2009-09-01\",0.0785,0.0625,100,2,0)",
        );
        assert_close(
            n(&format!(
                "=ODDFYIELD(\"2008-11-11\",\"2021-03-01\",\"2008-01-15\",\"2009-09-01\",0.0785,{long},100,2,0)"
            )),
            0.0625,
            1e-9,
        );
        assert_eq!(
            eval("=ODDFPRICE(\"2009-04-01\",\"2021-03-01\",\"2008-10-15\",\"2009-03-01\",0.0785,0.0625,100,2)"),
            FormulaValue::Error(CellError::Num)
        );
    }

    #[test]
    fn test_odd_last_period() {
        assert_close(
            n("=ODDLPRICE(\"2008-02-07\",\"2008-06-15\",\"2007-10-15\",0.0375,0.0405,100,2,0)"),
            99.878286,
            1e-6,
        );
        assert_close(
            n("=ODDLYIELD(\"2008-04-20\",\"2008-06-15\",\"2007-12-24\",0.0375,99.875,100,2,0)"),
            0.045192,
            1e-6,
        );
        assert_eq!(
            eval("=ODDLPRICE(\"2007-10-01\",\"2008-06-15\",\"2007-10-15\",0.0375,0.0405,100,2)"),
            FormulaValue::Error(CellError::Num)
        );
    }
}
