//! Criteria matching for the database functions
//!
//! A criteria cell can be:
//! - Blank: matches anything
//! - A comparison: ">5", ">=10", "<100", "<=50" (numeric only), "<>0" or "<>text"
//! - An equality: "=5", "=apple", or "=" alone for blank cells
//! - A pattern: "*" matches any characters, "?" a single one, "~" escapes either
//! - Anything else: case-insensitive exact match, numerically for numbers

use crate::evaluator::{parse_number, FormulaValue};
use gridcalc_core::CellError;
use regex::Regex;

/// Matcher compiled from one criteria cell
#[derive(Debug)]
pub struct CriteriaMatcher {
    criteria_type: CriteriaType,
}

#[derive(Debug)]
enum CriteriaType {
    /// Blank criteria cell
    Any,
    /// Numeric comparison (operator, value)
    Comparison(ComparisonOp, f64),
    /// `<>text`
    NotText(String),
    /// Number equality
    Number(f64),
    /// Case-insensitive text equality
    Text(String),
    /// `=` with nothing after it
    Blank,
    Boolean(bool),
    Error(CellError),
    /// Anchored, case-insensitive wildcard pattern
    Pattern(Regex),
    /// A criterion that can never be satisfied
    Never,
}

#[derive(Debug, Clone, Copy)]
enum ComparisonOp {
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl CriteriaMatcher {
    /// Compile a criteria cell
    pub fn new(criteria: &FormulaValue) -> Self {
        let criteria_type = match criteria.scalar() {
            FormulaValue::Empty => CriteriaType::Any,
            FormulaValue::Number(n) => CriteriaType::Number(*n),
            FormulaValue::Boolean(b) => CriteriaType::Boolean(*b),
            FormulaValue::Error(e) => CriteriaType::Error(*e),
            FormulaValue::String(s) => Self::parse_string_criteria(s),
            FormulaValue::Array(_) => CriteriaType::Never,
        };

        Self { criteria_type }
    }

    /// Whether this criterion accepts every value
    pub fn is_wildcard(&self) -> bool {
        matches!(self.criteria_type, CriteriaType::Any)
    }

    fn parse_string_criteria(s: &str) -> CriteriaType {
        let s = s.trim();

        if s.is_empty() {
            return CriteriaType::Any;
        }

        // Longer operators first
        let comparison = [
            (">=", ComparisonOp::GreaterEqual),
            ("<=", ComparisonOp::LessEqual),
            ("<>", ComparisonOp::NotEqual),
            (">", ComparisonOp::GreaterThan),
            ("<", ComparisonOp::LessThan),
        ]
        .into_iter()
        .find_map(|(prefix, op)| s.strip_prefix(prefix).map(|rest| (op, rest.trim())));

        if let Some((op, rest)) = comparison {
            return match (op, parse_number(rest)) {
                (_, Some(n)) => CriteriaType::Comparison(op, n),
                (ComparisonOp::NotEqual, None) => CriteriaType::NotText(rest.to_lowercase()),
                _ => CriteriaType::Never,
            };
        }

        if let Some(rest) = s.strip_prefix('=') {
            let rest = rest.trim();
            return if rest.is_empty() {
                CriteriaType::Blank
            } else {
                Self::exact(rest)
            };
        }

        if s.contains(&['*', '?'][..]) {
            return wildcard_regex(s).map_or(CriteriaType::Never, CriteriaType::Pattern);
        }

        Self::exact(s)
    }

    fn exact(s: &str) -> CriteriaType {
        match parse_number(s) {
            Some(n) => CriteriaType::Number(n),
            None => CriteriaType::Text(s.to_lowercase()),
        }
    }

    /// Check if a value matches the criteria
    pub fn matches(&self, value: &FormulaValue) -> bool {
        match &self.criteria_type {
            CriteriaType::Any => true,

            CriteriaType::Comparison(op, criteria_num) => {
                let Some(n) = numeric(value) else {
                    // `<>5` is satisfied by anything that is not the number 5
                    return matches!(op, ComparisonOp::NotEqual);
                };
                match op {
                    ComparisonOp::NotEqual => n != *criteria_num,
                    ComparisonOp::LessThan => n < *criteria_num,
                    ComparisonOp::LessEqual => n <= *criteria_num,
                    ComparisonOp::GreaterThan => n > *criteria_num,
                    ComparisonOp::GreaterEqual => n >= *criteria_num,
                }
            }

            CriteriaType::NotText(text) => match value {
                FormulaValue::Empty => !text.is_empty(),
                v => v.as_string().to_lowercase() != *text,
            },

            CriteriaType::Number(criteria_num) => numeric(value) == Some(*criteria_num),

            CriteriaType::Text(text) => match value {
                FormulaValue::String(s) => s.to_lowercase() == *text,
                _ => false,
            },

            CriteriaType::Blank => match value {
                FormulaValue::Empty => true,
                FormulaValue::String(s) => s.is_empty(),
                _ => false,
            },

            CriteriaType::Boolean(b) => *value == FormulaValue::Boolean(*b),

            CriteriaType::Error(e) => *value == FormulaValue::Error(*e),

            CriteriaType::Pattern(regex) => match value {
                FormulaValue::String(s) => regex.is_match(s),
                FormulaValue::Number(_) => regex.is_match(&value.as_string()),
                _ => false,
            },

            CriteriaType::Never => false,
        }
    }
}

/// Numbers, and text that reads as a number
fn numeric(value: &FormulaValue) -> Option<f64> {
    match value {
        FormulaValue::Number(n) => Some(*n),
        FormulaValue::String(s) => parse_number(s),
        _ => None,
    }
}

/// Compile a `*`/`?` pattern into an anchored, case-insensitive regex
fn wildcard_regex(pattern: &str) -> Option<Regex> {
    let mut source = String::from("(?is)^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            '~' => match chars.next() {
                Some(escaped) => source.push_str(&regex::escape(&escaped.to_string())),
                None => source.push_str(&regex::escape("~")),
            },
            c => source.push_str(&regex::escape(&c.to_string())),
        }
    }
    source.push('$');
    Regex::new(&source).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(criteria: &str) -> CriteriaMatcher {
        CriteriaMatcher::new(&FormulaValue::String(criteria.to_string()))
    }

    fn text(s: &str) -> FormulaValue {
        FormulaValue::String(s.to_string())
    }

    #[test]
    fn test_numeric_comparisons() {
        let m = matcher(">50000");
        assert!(m.matches(&FormulaValue::Number(60000.0)));
        assert!(!m.matches(&FormulaValue::Number(50000.0)));
        assert!(!m.matches(&text("Sales")));
        assert!(!m.matches(&FormulaValue::Empty));

        assert!(matcher(">=10").matches(&FormulaValue::Number(10.0)));
        assert!(matcher("<= 10").matches(&text("7")));
        assert!(matcher("<3").matches(&FormulaValue::Number(-1.0)));
        assert!(!matcher(">abc").matches(&text("zzz")));
    }

    #[test]
    fn test_not_equal() {
        assert!(matcher("<>5").matches(&FormulaValue::Number(4.0)));
        assert!(!matcher("<>5").matches(&FormulaValue::Number(5.0)));
        assert!(matcher("<>5").matches(&text("five")));
        assert!(matcher("<>sales").matches(&text("Engineering")));
        assert!(!matcher("<>sales").matches(&text("SALES")));
        assert!(matcher("<>").matches(&text("x")));
        assert!(!matcher("<>").matches(&FormulaValue::Empty));
    }

    #[test]
    fn test_equality() {
        assert!(matcher("=sales").matches(&text("Sales")));
        assert!(!matcher("=sales").matches(&text("Sales Ops")));
        assert!(matcher("=100").matches(&FormulaValue::Number(100.0)));
        assert!(matcher("=").matches(&FormulaValue::Empty));
        assert!(!matcher("=").matches(&FormulaValue::Number(0.0)));
    }

    #[test]
    fn test_wildcards() {
        let m = matcher("s*s");
        assert!(m.matches(&text("Sales")));
        assert!(m.matches(&text("ss")));
        assert!(!m.matches(&text("Sale")));

        assert!(matcher("b?t").matches(&text("BAT")));
        assert!(!matcher("b?t").matches(&text("boat")));
        assert!(matcher("a.b*").matches(&text("a.bc")));
        assert!(!matcher("a.b*").matches(&text("axbc")));
        assert!(matcher("what~?").matches(&text("what?")));
        assert!(!matcher("what~?").matches(&text("whats")));
    }

    #[test]
    fn test_exact_and_blank() {
        assert!(matcher("Sales").matches(&text("sales")));
        assert!(!matcher("Sales").matches(&text("Sales Ops")));
        assert!(matcher("42").matches(&FormulaValue::Number(42.0)));
        assert!(CriteriaMatcher::new(&FormulaValue::Number(42.0)).matches(&text("42")));
        assert!(matcher("").is_wildcard());
        assert!(CriteriaMatcher::new(&FormulaValue::Empty).matches(&text("anything")));
        assert!(CriteriaMatcher::new(&FormulaValue::Boolean(true))
            .matches(&FormulaValue::Boolean(true)));
    }
}
