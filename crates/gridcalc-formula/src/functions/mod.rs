//! Built-in functions
//!
//! Every function is registered once, by name, into a process-wide
//! [`FunctionRegistry`]. Handlers come in two shapes (see [`FunctionImpl`]):
//! most take their arguments already evaluated, while short-circuiting and
//! reference-inspecting functions (`IF`, `IFERROR`, `ISREF`, `XNPV`, ...)
//! receive the argument expressions and evaluate them on demand.

pub mod bessel;
pub mod complex;
mod complex_trig;
pub mod criteria;
pub mod database;
pub mod engineering;
pub mod financial;
pub mod info;
pub mod logical;
pub mod securities;

use crate::ast::FormulaExpr;
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{EvaluationContext, FormulaValue};
use ahash::AHashMap;
use gridcalc_core::CellError;
use std::fmt;

/// Handler over evaluated arguments
pub type EagerFn = fn(&[FormulaValue], &EvaluationContext) -> FormulaResult<FormulaValue>;

/// Handler over unevaluated argument expressions
pub type LazyFn = fn(&[FormulaExpr], &EvaluationContext) -> FormulaResult<FormulaValue>;

/// Function implementation
#[derive(Clone, Copy)]
pub enum FunctionImpl {
    Eager(EagerFn),
    Lazy(LazyFn),
}

/// Function family, as shown in function pickers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FunctionCategory {
    Logical,
    Information,
    Database,
    Financial,
    Engineering,
}

impl fmt::Display for FunctionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FunctionCategory::Logical => "Logical",
            FunctionCategory::Information => "Information",
            FunctionCategory::Database => "Database",
            FunctionCategory::Financial => "Financial",
            FunctionCategory::Engineering => "Engineering",
        })
    }
}

/// Function definition
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
    pub category: FunctionCategory,
    /// Call signature, e.g. `IF(condition, value_if_true, value_if_false)`
    pub syntax: &'static str,
    pub description: &'static str,
}

/// Display metadata for a registered function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInfo {
    pub name: &'static str,
    pub category: FunctionCategory,
    pub syntax: &'static str,
    pub description: &'static str,
    pub min_args: usize,
    pub max_args: Option<usize>,
}

impl From<&FunctionDef> for FunctionInfo {
    fn from(def: &FunctionDef) -> Self {
        Self {
            name: def.name,
            category: def.category,
            syntax: def.syntax,
            description: def.description,
            min_args: def.min_args,
            max_args: def.max_args,
        }
    }
}

/// `(name, min_args, max_args, implementation, syntax, description)`
type Entry = (
    &'static str,
    usize,
    Option<usize>,
    FunctionImpl,
    &'static str,
    &'static str,
);

use self::FunctionImpl::{Eager, Lazy};

/// Function registry
pub struct FunctionRegistry {
    functions: AHashMap<String, FunctionDef>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: AHashMap::new(),
        };

        registry.register_logical_functions();
        registry.register_info_functions();
        registry.register_database_functions();
        registry.register_financial_functions();
        registry.register_securities_functions();
        registry.register_engineering_functions();
        registry.register_complex_functions();

        registry
    }

    /// Look up a function by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_ascii_uppercase())
    }

    /// Register a function
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name.to_ascii_uppercase(), def);
    }

    /// Metadata for every function, sorted by name
    pub fn catalog(&self) -> Vec<FunctionInfo> {
        let mut infos: Vec<FunctionInfo> = self.functions.values().map(FunctionInfo::from).collect();
        infos.sort_by_key(|info| info.name);
        infos
    }

    fn register_group(&mut self, category: FunctionCategory, entries: &[Entry]) {
        for &(name, min_args, max_args, implementation, syntax, description) in entries {
            self.register(FunctionDef {
                name,
                min_args,
                max_args,
                implementation,
                category,
                syntax,
                description,
            });
        }
    }

    #[rustfmt::skip]
    fn register_logical_functions(&mut self) {
        self.register_group(
            FunctionCategory::Logical,
            &[
                ("IF", 3, Some(3), Lazy(logical::fn_if),
                    "IF(condition, value_if_true, value_if_false)",
                    "Returns one value if a condition is true and another if it is false"),
                ("IFS", 2, None, Lazy(logical::fn_ifs),
                    "IFS(condition1, value1, [condition2, value2], ...)",
                    "Returns the value paired with the first true condition"),
                ("IFERROR", 2, Some(2), Lazy(logical::fn_iferror),
                    "IFERROR(value, value_if_error)",
                    "Returns value_if_error when value is an error"),
                ("IFNA", 2, Some(2), Lazy(logical::fn_ifna),
                    "IFNA(value, value_if_na)",
                    "Returns value_if_na when value is #N/A"),
                ("SWITCH", 3, None, Lazy(logical::fn_switch),
                    "SWITCH(expression, value1, result1, [value2, result2], ..., [default])",
                    "Returns the result paired with the first value equal to expression"),
                ("AND", 1, None, Eager(logical::fn_and),
                    "AND(logical1, [logical2], ...)",
                    "Returns TRUE if all arguments are true"),
                ("OR", 1, None, Eager(logical::fn_or),
                    "OR(logical1, [logical2], ...)",
                    "Returns TRUE if any argument is true"),
                ("XOR", 1, None, Eager(logical::fn_xor),
                    "XOR(logical1, [logical2], ...)",
                    "Returns TRUE if an odd number of arguments are true"),
                ("NOT", 1, Some(1), Eager(logical::fn_not),
                    "NOT(logical)",
                    "Reverses the logic of its argument"),
                ("TRUE", 0, Some(0), Eager(logical::fn_true),
                    "TRUE()",
                    "Returns the logical value TRUE"),
                ("FALSE", 0, Some(0), Eager(logical::fn_false),
                    "FALSE()",
                    "Returns the logical value FALSE"),
            ],
        );
    }

    #[rustfmt::skip]
    fn register_info_functions(&mut self) {
        self.register_group(
            FunctionCategory::Information,
            &[
                ("ISBLANK", 1, Some(1), Eager(info::fn_isblank),
                    "ISBLANK(value)", "Returns TRUE if the value is blank"),
                ("ISERROR", 1, Some(1), Eager(info::fn_iserror),
                    "ISERROR(value)", "Returns TRUE if the value is any error"),
                ("ISERR", 1, Some(1), Eager(info::fn_iserr),
                    "ISERR(value)", "Returns TRUE if the value is an error other than #N/A"),
                ("ISNA", 1, Some(1), Eager(info::fn_isna),
                    "ISNA(value)", "Returns TRUE if the value is #N/A"),
                ("ISTEXT", 1, Some(1), Eager(info::fn_istext),
                    "ISTEXT(value)", "Returns TRUE if the value is text"),
                ("ISNONTEXT", 1, Some(1), Eager(info::fn_isnontext),
                    "ISNONTEXT(value)", "Returns TRUE if the value is not text"),
                ("ISNUMBER", 1, Some(1), Eager(info::fn_isnumber),
                    "ISNUMBER(value)", "Returns TRUE if the value is a number"),
                ("ISLOGICAL", 1, Some(1), Eager(info::fn_islogical),
                    "ISLOGICAL(value)", "Returns TRUE if the value is a logical value"),
                ("ISEVEN", 1, Some(1), Eager(info::fn_iseven),
                    "ISEVEN(number)", "Returns TRUE if the number is even"),
                ("ISODD", 1, Some(1), Eager(info::fn_isodd),
                    "ISODD(number)", "Returns TRUE if the number is odd"),
                ("ISREF", 1, Some(1), Lazy(info::fn_isref),
                    "ISREF(value)", "Returns TRUE if the value is a reference"),
                ("ISFORMULA", 1, Some(1), Lazy(info::fn_isformula),
                    "ISFORMULA(reference)", "Returns TRUE if the referenced cell contains a formula"),
                ("ISBETWEEN", 3, Some(5), Eager(info::fn_isbetween),
                    "ISBETWEEN(value, lower, upper, [lower_inclusive], [upper_inclusive])",
                    "Returns TRUE if the value lies between two bounds"),
                ("TYPE", 1, Some(1), Eager(info::fn_type),
                    "TYPE(value)", "Returns a number indicating the data type of a value"),
                ("N", 1, Some(1), Eager(info::fn_n),
                    "N(value)", "Returns a value converted to a number"),
                ("NA", 0, Some(0), Eager(info::fn_na),
                    "NA()", "Returns the error value #N/A"),
                ("ERROR.TYPE", 1, Some(1), Eager(info::fn_error_type),
                    "ERROR.TYPE(error_val)", "Returns a number corresponding to an error type"),
                ("CELL", 1, Some(2), Lazy(info::fn_cell),
                    "CELL(info_type, [reference])",
                    "Returns information about the formatting, location or contents of a cell"),
                ("INFO", 1, Some(1), Eager(info::fn_info),
                    "INFO(type_text)", "Returns information about the operating environment"),
                ("SHEET", 0, Some(1), Eager(info::fn_sheet),
                    "SHEET([value])", "Returns the sheet number of the referenced sheet"),
                ("SHEETS", 0, Some(1), Eager(info::fn_sheets),
                    "SHEETS([reference])", "Returns the number of sheets in a reference"),
            ],
        );
    }

    #[rustfmt::skip]
    fn register_database_functions(&mut self) {
        self.register_group(
            FunctionCategory::Database,
            &[
                ("DSUM", 3, Some(3), Eager(database::fn_dsum),
                    "DSUM(database, field, criteria)",
                    "Adds the numbers in a field of matching records"),
                ("DAVERAGE", 3, Some(3), Eager(database::fn_daverage),
                    "DAVERAGE(database, field, criteria)",
                    "Averages the numbers in a field of matching records"),
                ("DCOUNT", 3, Some(3), Eager(database::fn_dcount),
                    "DCOUNT(database, field, criteria)",
                    "Counts the cells containing numbers in a field of matching records"),
                ("DCOUNTA", 3, Some(3), Eager(database::fn_dcounta),
                    "DCOUNTA(database, field, criteria)",
                    "Counts the nonblank cells in a field of matching records"),
                ("DMAX", 3, Some(3), Eager(database::fn_dmax),
                    "DMAX(database, field, criteria)",
                    "Returns the maximum value from matching records"),
                ("DMIN", 3, Some(3), Eager(database::fn_dmin),
                    "DMIN(database, field, criteria)",
                    "Returns the minimum value from matching records"),
                ("DPRODUCT", 3, Some(3), Eager(database::fn_dproduct),
                    "DPRODUCT(database, field, criteria)",
                    "Multiplies the values in a field of matching records"),
                ("DGET", 3, Some(3), Eager(database::fn_dget),
                    "DGET(database, field, criteria)",
                    "Extracts the single value matching the criteria"),
                ("DSTDEV", 3, Some(3), Eager(database::fn_dstdev),
                    "DSTDEV(database, field, criteria)",
                    "Estimates the standard deviation from a sample of matching records"),
                ("DSTDEVP", 3, Some(3), Eager(database::fn_dstdevp),
                    "DSTDEVP(database, field, criteria)",
                    "Standard deviation of the entire population of matching records"),
                ("DVAR", 3, Some(3), Eager(database::fn_dvar),
                    "DVAR(database, field, criteria)",
                    "Estimates variance from a sample of matching records"),
                ("DVARP", 3, Some(3), Eager(database::fn_dvarp),
                    "DVARP(database, field, criteria)",
                    "Variance of the entire population of matching records"),
            ],
        );
    }

    #[rustfmt::skip]
    fn register_financial_functions(&mut self) {
        self.register_group(
            FunctionCategory::Financial,
            &[
                ("PMT", 3, Some(5), Eager(financial::fn_pmt),
                    "PMT(rate, nper, pv, [fv], [type])",
                    "Returns the periodic payment for an annuity"),
                ("PV", 3, Some(5), Eager(financial::fn_pv),
                    "PV(rate, nper, pmt, [fv], [type])",
                    "Returns the present value of an investment"),
                ("FV", 3, Some(5), Eager(financial::fn_fv),
                    "FV(rate, nper, pmt, [pv], [type])",
                    "Returns the future value of an investment"),
                ("NPER", 3, Some(5), Eager(financial::fn_nper),
                    "NPER(rate, pmt, pv, [fv], [type])",
                    "Returns the number of periods for an investment"),
                ("IPMT", 4, Some(6), Eager(financial::fn_ipmt),
                    "IPMT(rate, per, nper, pv, [fv], [type])",
                    "Returns the interest payment for a given period"),
                ("PPMT", 4, Some(6), Eager(financial::fn_ppmt),
                    "PPMT(rate, per, nper, pv, [fv], [type])",
                    "Returns the principal payment for a given period"),
                ("RATE", 3, Some(6), Eager(financial::fn_rate),
                    "RATE(nper, pmt, pv, [fv], [type], [guess])",
                    "Returns the interest rate per period of an annuity"),
                ("NPV", 2, None, Eager(financial::fn_npv),
                    "NPV(rate, value1, [value2], ...)",
                    "Returns the net present value of periodic cash flows"),
                ("IRR", 1, Some(2), Eager(financial::fn_irr),
                    "IRR(values, [guess])",
                    "Returns the internal rate of return for periodic cash flows"),
                ("XNPV", 3, Some(3), Lazy(financial::fn_xnpv),
                    "XNPV(rate, values, dates)",
                    "Returns the net present value of dated cash flows"),
                ("XIRR", 2, Some(3), Lazy(financial::fn_xirr),
                    "XIRR(values, dates, [guess])",
                    "Returns the internal rate of return of dated cash flows"),
                ("MIRR", 3, Some(3), Eager(financial::fn_mirr),
                    "MIRR(values, finance_rate, reinvest_rate)",
                    "Returns the modified internal rate of return"),
                ("SLN", 3, Some(3), Eager(financial::fn_sln),
                    "SLN(cost, salvage, life)",
                    "Returns straight-line depreciation for one period"),
                ("SYD", 4, Some(4), Eager(financial::fn_syd),
                    "SYD(cost, salvage, life, per)",
                    "Returns sum-of-years' digits depreciation for a period"),
                ("DB", 4, Some(5), Eager(financial::fn_db),
                    "DB(cost, salvage, life, period, [month])",
                    "Returns fixed-declining balance depreciation for a period"),
                ("DDB", 4, Some(5), Eager(financial::fn_ddb),
                    "DDB(cost, salvage, life, period, [factor])",
                    "Returns double-declining balance depreciation for a period"),
                ("VDB", 5, Some(7), Eager(financial::fn_vdb),
                    "VDB(cost, salvage, life, start_period, end_period, [factor], [no_switch])",
                    "Returns declining balance depreciation over a partial period"),
                ("PDURATION", 3, Some(3), Eager(financial::fn_pduration),
                    "PDURATION(rate, pv, fv)",
                    "Returns the number of periods for an investment to reach a value"),
                ("RRI", 3, Some(3), Eager(financial::fn_rri),
                    "RRI(nper, pv, fv)",
                    "Returns an equivalent interest rate for the growth of an investment"),
                ("ISPMT", 4, Some(4), Eager(financial::fn_ispmt),
                    "ISPMT(rate, per, nper, pv)",
                    "Returns the interest paid in a period of a straight-principal loan"),
                ("EFFECT", 2, Some(2), Eager(financial::fn_effect),
                    "EFFECT(nominal_rate, npery)",
                    "Returns the effective annual interest rate"),
                ("NOMINAL", 2, Some(2), Eager(financial::fn_nominal),
                    "NOMINAL(effect_rate, npery)",
                    "Returns the nominal annual interest rate"),
                ("FVSCHEDULE", 2, Some(2), Eager(financial::fn_fvschedule),
                    "FVSCHEDULE(principal, schedule)",
                    "Returns the future value after a series of compound rates"),
                ("CUMIPMT", 6, Some(6), Eager(financial::fn_cumipmt),
                    "CUMIPMT(rate, nper, pv, start_period, end_period, type)",
                    "Returns the cumulative interest paid between two periods"),
                ("CUMPRINC", 6, Some(6), Eager(financial::fn_cumprinc),
                    "CUMPRINC(rate, nper, pv, start_period, end_period, type)",
                    "Returns the cumulative principal paid between two periods"),
                ("DOLLARDE", 2, Some(2), Eager(financial::fn_dollarde),
                    "DOLLARDE(fractional_dollar, fraction)",
                    "Converts a fractional dollar price to a decimal price"),
                ("DOLLARFR", 2, Some(2), Eager(financial::fn_dollarfr),
                    "DOLLARFR(decimal_dollar, fraction)",
                    "Converts a decimal dollar price to a fractional price"),
            ],
        );
    }

    #[rustfmt::skip]
    fn register_securities_functions(&mut self) {
        self.register_group(
            FunctionCategory::Financial,
            &[
                ("COUPDAYBS", 3, Some(4), Eager(securities::fn_coupdaybs),
                    "COUPDAYBS(settlement, maturity, frequency, [basis])",
                    "Returns the days from the start of the coupon period to settlement"),
                ("COUPDAYS", 3, Some(4), Eager(securities::fn_coupdays),
                    "COUPDAYS(settlement, maturity, frequency, [basis])",
                    "Returns the days in the coupon period containing settlement"),
                ("COUPDAYSNC", 3, Some(4), Eager(securities::fn_coupdaysnc),
                    "COUPDAYSNC(settlement, maturity, frequency, [basis])",
                    "Returns the days from settlement to the next coupon date"),
                ("COUPNCD", 3, Some(4), Eager(securities::fn_coupncd),
                    "COUPNCD(settlement, maturity, frequency, [basis])",
                    "Returns the next coupon date after settlement"),
                ("COUPNUM", 3, Some(4), Eager(securities::fn_coupnum),
                    "COUPNUM(settlement, maturity, frequency, [basis])",
                    "Returns the number of coupons payable between settlement and maturity"),
                ("COUPPCD", 3, Some(4), Eager(securities::fn_couppcd),
                    "COUPPCD(settlement, maturity, frequency, [basis])",
                    "Returns the coupon date on or before settlement"),
                ("PRICE", 6, Some(7), Eager(securities::fn_price),
                    "PRICE(settlement, maturity, rate, yld, redemption, frequency, [basis])",
                    "Returns the price per $100 face value of a periodic-interest security"),
                ("YIELD", 6, Some(7), Eager(securities::fn_yield),
                    "YIELD(settlement, maturity, rate, pr, redemption, frequency, [basis])",
                    "Returns the yield of a periodic-interest security"),
                ("DURATION", 5, Some(6), Eager(securities::fn_duration),
                    "DURATION(settlement, maturity, coupon, yld, frequency, [basis])",
                    "Returns the Macaulay duration of a security"),
                ("MDURATION", 5, Some(6), Eager(securities::fn_mduration),
                    "MDURATION(settlement, maturity, coupon, yld, frequency, [basis])",
                    "Returns the modified duration of a security"),
                ("ACCRINT", 6, Some(8), Eager(securities::fn_accrint),
                    "ACCRINT(issue, first_interest, settlement, rate, par, frequency, [basis], [calc_method])",
                    "Returns the accrued interest of a periodic-interest security"),
                ("ACCRINTM", 3, Some(5), Eager(securities::fn_accrintm),
                    "ACCRINTM(issue, settlement, rate, [par], [basis])",
                    "Returns the accrued interest of a security paying interest at maturity"),
                ("DISC", 4, Some(5), Eager(securities::fn_disc),
                    "DISC(settlement, maturity, pr, redemption, [basis])",
                    "Returns the discount rate of a security"),
                ("PRICEDISC", 4, Some(5), Eager(securities::fn_pricedisc),
                    "PRICEDISC(settlement, maturity, discount, redemption, [basis])",
                    "Returns the price per $100 face value of a discounted security"),
                ("YIELDDISC", 4, Some(5), Eager(securities::fn_yielddisc),
                    "YIELDDISC(settlement, maturity, pr, redemption, [basis])",
                    "Returns the annual yield of a discounted security"),
                ("INTRATE", 4, Some(5), Eager(securities::fn_intrate),
                    "INTRATE(settlement, maturity, investment, redemption, [basis])",
                    "Returns the interest rate of a fully invested security"),
                ("RECEIVED", 4, Some(5), Eager(securities::fn_received),
                    "RECEIVED(settlement, maturity, investment, discount, [basis])",
                    "Returns the amount received at maturity for a fully invested security"),
                ("PRICEMAT", 5, Some(6), Eager(securities::fn_pricemat),
                    "PRICEMAT(settlement, maturity, issue, rate, yld, [basis])",
                    "Returns the price per $100 face value of a security paying interest at maturity"),
                ("YIELDMAT", 5, Some(6), Eager(securities::fn_yieldmat),
                    "YIELDMAT(settlement, maturity, issue, rate, pr, [basis])",
                    "Returns the annual yield of a security paying interest at maturity"),
                ("TBILLEQ", 3, Some(3), Eager(securities::fn_tbilleq),
                    "TBILLEQ(settlement, maturity, discount)",
                    "Returns the bond-equivalent yield of a Treasury bill"),
                ("TBILLPRICE", 3, Some(3), Eager(securities::fn_tbillprice),
                    "TBILLPRICE(settlement, maturity, discount)",
                    "Returns the price per $100 face value of a Treasury bill"),
                ("TBILLYIELD", 3, Some(3), Eager(securities::fn_tbillyield),
                    "TBILLYIELD(settlement, maturity, pr)",
                    "Returns the yield of a Treasury bill"),
                ("ODDFPRICE", 8, Some(9), Eager(securities::fn_oddfprice),
                    "ODDFPRICE(settlement, maturity, issue, first_coupon, rate, yld, redemption, frequency, [basis])",
                    "Returns the price per $100 face value of a security with an odd first period"),
                ("ODDFYIELD", 8, Some(9), Eager(securities::fn_oddfyield),
                    "ODDFYIELD(settlement, maturity, issue, first_coupon, rate, pr, redemption, frequency, [basis])",
                    "Returns the yield of a security with an odd first period"),
                ("ODDLPRICE", 7, Some(8), Eager(securities::fn_oddlprice),
                    "ODDLPRICE(settlement, maturity, last_interest, rate, yld, redemption, frequency, [basis])",
                    "Returns the price per $100 face value of a security with an odd last period"),
                ("ODDLYIELD", 7, Some(8), Eager(securities::fn_oddlyield),
                    "ODDLYIELD(settlement, maturity, last_interest, rate, pr, redemption, frequency, [basis])",
                    "Returns the yield of a security with an odd last period"),
            ],
        );
    }

    #[rustfmt::skip]
    fn register_engineering_functions(&mut self) {
        self.register_group(
            FunctionCategory::Engineering,
            &[
                ("BIN2DEC", 1, Some(1), Eager(engineering::fn_bin2dec),
                    "BIN2DEC(number)", "Converts a binary number to decimal"),
                ("BIN2HEX", 1, Some(2), Eager(engineering::fn_bin2hex),
                    "BIN2HEX(number, [places])", "Converts a binary number to hexadecimal"),
                ("BIN2OCT", 1, Some(2), Eager(engineering::fn_bin2oct),
                    "BIN2OCT(number, [places])", "Converts a binary number to octal"),
                ("DEC2BIN", 1, Some(2), Eager(engineering::fn_dec2bin),
                    "DEC2BIN(number, [places])", "Converts a decimal number to binary"),
                ("DEC2HEX", 1, Some(2), Eager(engineering::fn_dec2hex),
                    "DEC2HEX(number, [places])", "Converts a decimal number to hexadecimal"),
                ("DEC2OCT", 1, Some(2), Eager(engineering::fn_dec2oct),
                    "DEC2OCT(number, [places])", "Converts a decimal number to octal"),
                ("HEX2BIN", 1, Some(2), Eager(engineering::fn_hex2bin),
                    "HEX2BIN(number, [places])", "Converts a hexadecimal number to binary"),
                ("HEX2DEC", 1, Some(1), Eager(engineering::fn_hex2dec),
                    "HEX2DEC(number)", "Converts a hexadecimal number to decimal"),
                ("HEX2OCT", 1, Some(2), Eager(engineering::fn_hex2oct),
                    "HEX2OCT(number, [places])", "Converts a hexadecimal number to octal"),
                ("OCT2BIN", 1, Some(2), Eager(engineering::fn_oct2bin),
                    "OCT2BIN(number, [places])", "Converts an octal number to binary"),
                ("OCT2DEC", 1, Some(1), Eager(engineering::fn_oct2dec),
                    "OCT2DEC(number)", "Converts an octal number to decimal"),
                ("OCT2HEX", 1, Some(2), Eager(engineering::fn_oct2hex),
                    "OCT2HEX(number, [places])", "Converts an octal number to hexadecimal"),
                ("CONVERT", 3, Some(3), Eager(engineering::fn_convert),
                    "CONVERT(number, from_unit, to_unit)",
                    "Converts a number from one measurement system to another"),
                ("DELTA", 1, Some(2), Eager(engineering::fn_delta),
                    "DELTA(number1, [number2])", "Tests whether two values are equal"),
                ("GESTEP", 1, Some(2), Eager(engineering::fn_gestep),
                    "GESTEP(number, [step])", "Tests whether a number is greater than a threshold"),
                ("BITAND", 2, Some(2), Eager(engineering::fn_bitand),
                    "BITAND(number1, number2)", "Returns a bitwise AND of two numbers"),
                ("BITOR", 2, Some(2), Eager(engineering::fn_bitor),
                    "BITOR(number1, number2)", "Returns a bitwise OR of two numbers"),
                ("BITXOR", 2, Some(2), Eager(engineering::fn_bitxor),
                    "BITXOR(number1, number2)", "Returns a bitwise exclusive OR of two numbers"),
                ("BITLSHIFT", 2, Some(2), Eager(engineering::fn_bitlshift),
                    "BITLSHIFT(number, shift_amount)", "Returns a number shifted left"),
                ("BITRSHIFT", 2, Some(2), Eager(engineering::fn_bitrshift),
                    "BITRSHIFT(number, shift_amount)", "Returns a number shifted right"),
                ("ERF", 1, Some(2), Eager(engineering::fn_erf),
                    "ERF(lower_limit, [upper_limit])", "Returns the error function"),
                ("ERF.PRECISE", 1, Some(1), Eager(engineering::fn_erf_precise),
                    "ERF.PRECISE(x)", "Returns the error function"),
                ("ERFC", 1, Some(1), Eager(engineering::fn_erfc),
                    "ERFC(x)", "Returns the complementary error function"),
                ("ERFC.PRECISE", 1, Some(1), Eager(engineering::fn_erfc),
                    "ERFC.PRECISE(x)", "Returns the complementary error function"),
                ("BESSELJ", 2, Some(2), Eager(bessel::fn_besselj),
                    "BESSELJ(x, n)", "Returns the Bessel function Jn(x)"),
                ("BESSELY", 2, Some(2), Eager(bessel::fn_bessely),
                    "BESSELY(x, n)", "Returns the Bessel function Yn(x)"),
                ("BESSELI", 2, Some(2), Eager(bessel::fn_besseli),
                    "BESSELI(x, n)", "Returns the modified Bessel function In(x)"),
                ("BESSELK", 2, Some(2), Eager(bessel::fn_besselk),
                    "BESSELK(x, n)", "Returns the modified Bessel function Kn(x)"),
            ],
        );
    }

    #[rustfmt::skip]
    fn register_complex_functions(&mut self) {
        self.register_group(
            FunctionCategory::Engineering,
            &[
                ("COMPLEX", 2, Some(3), Eager(complex::fn_complex),
                    "COMPLEX(real_num, i_num, [suffix])",
                    "Converts real and imaginary coefficients into a complex number"),
                ("IMREAL", 1, Some(1), Eager(complex::fn_imreal),
                    "IMREAL(inumber)", "Returns the real coefficient of a complex number"),
                ("IMAGINARY", 1, Some(1), Eager(complex::fn_imaginary),
                    "IMAGINARY(inumber)", "Returns the imaginary coefficient of a complex number"),
                ("IMABS", 1, Some(1), Eager(complex::fn_imabs),
                    "IMABS(inumber)", "Returns the absolute value of a complex number"),
                ("IMARGUMENT", 1, Some(1), Eager(complex::fn_imargument),
                    "IMARGUMENT(inumber)", "Returns the argument theta, an angle in radians"),
                ("IMCONJUGATE", 1, Some(1), Eager(complex::fn_imconjugate),
                    "IMCONJUGATE(inumber)", "Returns the complex conjugate of a complex number"),
                ("IMSUM", 1, None, Eager(complex::fn_imsum),
                    "IMSUM(inumber1, [inumber2], ...)", "Returns the sum of complex numbers"),
                ("IMSUB", 2, Some(2), Eager(complex::fn_imsub),
                    "IMSUB(inumber1, inumber2)", "Returns the difference between two complex numbers"),
                ("IMPRODUCT", 1, None, Eager(complex::fn_improduct),
                    "IMPRODUCT(inumber1, [inumber2], ...)", "Returns the product of complex numbers"),
                ("IMDIV", 2, Some(2), Eager(complex::fn_imdiv),
                    "IMDIV(inumber1, inumber2)", "Returns the quotient of two complex numbers"),
                ("IMPOWER", 2, Some(2), Eager(complex::fn_impower),
                    "IMPOWER(inumber, number)", "Returns a complex number raised to a power"),
                ("IMSQRT", 1, Some(1), Eager(complex::fn_imsqrt),
                    "IMSQRT(inumber)", "Returns the square root of a complex number"),
                ("IMEXP", 1, Some(1), Eager(complex::fn_imexp),
                    "IMEXP(inumber)", "Returns the exponential of a complex number"),
                ("IMLN", 1, Some(1), Eager(complex::fn_imln),
                    "IMLN(inumber)", "Returns the natural logarithm of a complex number"),
                ("IMLOG2", 1, Some(1), Eager(complex::fn_imlog2),
                    "IMLOG2(inumber)", "Returns the base-2 logarithm of a complex number"),
                ("IMLOG10", 1, Some(1), Eager(complex::fn_imlog10),
                    "IMLOG10(inumber)", "Returns the base-10 logarithm of a complex number"),
                ("IMSIN", 1, Some(1), Eager(complex_trig::fn_imsin),
                    "IMSIN(inumber)", "Returns the sine of a complex number"),
                ("IMCOS", 1, Some(1), Eager(complex_trig::fn_imcos),
                    "IMCOS(inumber)", "Returns the cosine of a complex number"),
                ("IMTAN", 1, Some(1), Eager(complex_trig::fn_imtan),
                    "IMTAN(inumber)", "Returns the tangent of a complex number"),
                ("IMCSC", 1, Some(1), Eager(complex_trig::fn_imcsc),
                    "IMCSC(inumber)", "Returns the cosecant of a complex number"),
                ("IMSEC", 1, Some(1), Eager(complex_trig::fn_imsec),
                    "IMSEC(inumber)", "Returns the secant of a complex number"),
                ("IMCOT", 1, Some(1), Eager(complex_trig::fn_imcot),
                    "IMCOT(inumber)", "Returns the cotangent of a complex number"),
                ("IMSINH", 1, Some(1), Eager(complex_trig::fn_imsinh),
                    "IMSINH(inumber)", "Returns the hyperbolic sine of a complex number"),
                ("IMCOSH", 1, Some(1), Eager(complex_trig::fn_imcosh),
                    "IMCOSH(inumber)", "Returns the hyperbolic cosine of a complex number"),
                ("IMTANH", 1, Some(1), Eager(complex_trig::fn_imtanh),
                    "IMTANH(inumber)", "Returns the hyperbolic tangent of a complex number"),
                ("IMCSCH", 1, Some(1), Eager(complex_trig::fn_imcsch),
                    "IMCSCH(inumber)", "Returns the hyperbolic cosecant of a complex number"),
                ("IMSECH", 1, Some(1), Eager(complex_trig::fn_imsech),
                    "IMSECH(inumber)", "Returns the hyperbolic secant of a complex number"),
                ("IMCOTH", 1, Some(1), Eager(complex_trig::fn_imcoth),
                    "IMCOTH(inumber)", "Returns the hyperbolic cotangent of a complex number"),
            ],
        );
    }
}

// === Argument helpers shared by the function modules ===

/// Required numeric argument
pub(crate) fn number_arg(args: &[FormulaValue], index: usize) -> FormulaResult<f64> {
    args.get(index)
        .ok_or_else(|| FormulaError::Argument(format!("missing argument {}", index + 1)))?
        .to_number()
}

/// Optional numeric argument; missing or blank reads as `default`
pub(crate) fn opt_number_arg(
    args: &[FormulaValue],
    index: usize,
    default: f64,
) -> FormulaResult<f64> {
    match args.get(index).map(FormulaValue::scalar) {
        None | Some(FormulaValue::Empty) => Ok(default),
        Some(v) => v.to_number(),
    }
}

/// Required text argument; errors propagate, other scalars are stringified
pub(crate) fn text_arg(args: &[FormulaValue], index: usize) -> FormulaResult<String> {
    match args.get(index).map(FormulaValue::scalar) {
        None => Err(FormulaError::Argument(format!(
            "missing argument {}",
            index + 1
        ))),
        Some(FormulaValue::Error(e)) => Err((*e).into()),
        Some(v) => Ok(v.as_string()),
    }
}

/// Optional boolean argument; missing or blank reads as `default`
pub(crate) fn opt_bool_arg(
    args: &[FormulaValue],
    index: usize,
    default: bool,
) -> FormulaResult<bool> {
    match args.get(index).map(FormulaValue::scalar) {
        None | Some(FormulaValue::Empty) => Ok(default),
        Some(FormulaValue::Error(e)) => Err((*e).into()),
        Some(v) => v.as_bool().ok_or(FormulaError::Cell(CellError::Value)),
    }
}

/// Numbers found in ranges and arrays; text, logicals and blanks there
/// are skipped, errors propagate
pub(crate) fn range_numbers(value: &FormulaValue) -> FormulaResult<Vec<f64>> {
    let mut out = Vec::new();
    for v in value.values() {
        match v {
            FormulaValue::Number(n) => out.push(*n),
            FormulaValue::Error(e) => return Err((*e).into()),
            _ => {}
        }
    }
    Ok(out)
}

/// A numeric result; NaN and infinities become #NUM!
pub(crate) fn num_result(n: f64) -> FormulaResult<FormulaValue> {
    if n.is_finite() {
        Ok(FormulaValue::Number(n))
    } else {
        Err(CellError::Num.into())
    }
}
