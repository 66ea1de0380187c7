//! Property tests for identities the function families must preserve

use gridcalc::prelude::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn eval(formula: &str) -> FormulaValue {
    calculate(formula, &Grid::new(), 0, 0)
}

fn eval_number(formula: &str) -> f64 {
    match eval(formula) {
        FormulaValue::Number(n) => n,
        other => panic!("{formula} gave {other:?}"),
    }
}

fn close(actual: f64, expected: f64, relative: f64) -> bool {
    (actual - expected).abs() <= relative * expected.abs().max(1.0)
}

proptest! {
    #[test]
    fn binary_round_trips_through_decimal(n in -512i64..=511) {
        prop_assert_eq!(
            eval(&format!("=BIN2DEC(DEC2BIN({n}))")),
            FormulaValue::Number(n as f64)
        );
    }

    #[test]
    fn octal_and_hex_round_trip(n in -536_870_912i64..=536_870_911) {
        prop_assert_eq!(
            eval(&format!("=OCT2DEC(DEC2OCT({n}))")),
            FormulaValue::Number(n as f64)
        );
        prop_assert_eq!(
            eval(&format!("=HEX2DEC(OCT2HEX(DEC2OCT({n})))")),
            FormulaValue::Number(n as f64)
        );
    }

    #[test]
    fn hex_round_trips_over_forty_bits(n in -549_755_813_888i64..=549_755_813_887) {
        prop_assert_eq!(
            eval(&format!("=HEX2DEC(DEC2HEX({n}))")),
            FormulaValue::Number(n as f64)
        );
    }

    #[test]
    fn sum_of_years_digits_depreciates_fully(
        cost in 1_000u32..1_000_000,
        salvage_share in 0u32..100,
        life in 1u32..40,
    ) {
        let salvage = f64::from(cost) * f64::from(salvage_share) / 100.0;
        let total: f64 = (1..=life)
            .map(|per| eval_number(&format!("=SYD({cost},{salvage},{life},{per})")))
            .sum();
        prop_assert!(close(total, f64::from(cost) - salvage, 1e-9));
    }

    #[test]
    fn payment_splits_into_principal_and_interest(
        rate_bp in 1u32..2_000,
        nper in 1u32..360,
        per_seed in 0u32..360,
        pv in 100u32..1_000_000,
    ) {
        let rate = f64::from(rate_bp) / 10_000.0;
        let per = per_seed % nper + 1;
        let pmt = eval_number(&format!("=PMT({rate},{nper},{pv})"));
        let ipmt = eval_number(&format!("=IPMT({rate},{per},{nper},{pv})"));
        let ppmt = eval_number(&format!("=PPMT({rate},{per},{nper},{pv})"));
        prop_assert!(close(ipmt + ppmt, pmt, 1e-9), "{} + {} != {}", ipmt, ppmt, pmt);
    }

    #[test]
    fn conjugate_product_is_squared_modulus(re in -1_000i32..1_000, im in -1_000i32..1_000) {
        let z = format!("COMPLEX({},{})", f64::from(re) / 10.0, f64::from(im) / 10.0);
        let product = format!("IMPRODUCT({z},IMCONJUGATE({z}))");
        let modulus = eval_number(&format!("=IMABS({z})"));

        let real_formula = format!("=IMREAL({product})");
        prop_assert!(close(eval_number(&real_formula), modulus * modulus, 1e-9));
        prop_assert_eq!(eval(&format!("=IMAGINARY({product})")), FormulaValue::Number(0.0));
    }

    #[test]
    fn column_letters_round_trip(col in 0u32..1_000_000) {
        let letters = CellAddress::column_to_letters(col);
        prop_assert_eq!(CellAddress::letters_to_column(&letters).unwrap(), col);
    }

    #[test]
    fn blank_criteria_sums_every_record(salaries in prop::collection::vec(0u32..200_000, 1..20)) {
        let mut rows = vec![vec![CellValue::from("Salary")]];
        rows.extend(salaries.iter().map(|s| vec![CellValue::from(f64::from(*s))]));
        let mut grid = Grid::from_values(rows);
        grid.set_value(0, 2, "Salary");

        let end = salaries.len() + 1;
        let total: u32 = salaries.iter().sum();
        prop_assert_eq!(
            calculate(&format!("=DSUM(A1:A{end},1,C1:C2)"), &grid, 0, 4),
            FormulaValue::Number(f64::from(total))
        );
    }
}

#[test]
fn out_of_range_radix_inputs_are_num_errors() {
    assert_eq!(eval("=DEC2BIN(512)"), FormulaValue::Error(CellError::Num));
    assert_eq!(eval("=DEC2BIN(-513)"), FormulaValue::Error(CellError::Num));
    assert_eq!(eval("=BIN2DEC(\"12\")"), FormulaValue::Error(CellError::Num));
}

#[test]
fn hex_boundaries_use_forty_bit_twos_complement() {
    assert_eq!(
        eval("=DEC2HEX(-549755813888)"),
        FormulaValue::String("8000000000".into())
    );
    assert_eq!(
        eval("=HEX2DEC(\"8000000000\")"),
        FormulaValue::Number(-549_755_813_888.0)
    );
    assert_eq!(
        eval("=DEC2HEX(549755813887)"),
        FormulaValue::String("7FFFFFFFFF".into())
    );
    assert_eq!(
        eval("=HEX2DEC(\"7FFFFFFFFF\")"),
        FormulaValue::Number(549_755_813_887.0)
    );
    assert_eq!(eval("=DEC2HEX(549755813888)"), FormulaValue::Error(CellError::Num));
    assert_eq!(eval("=DEC2HEX(-549755813889)"), FormulaValue::Error(CellError::Num));
}
