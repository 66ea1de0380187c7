use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gridcalc::prelude::*;
use gridcalc::{evaluate, parse_formula, EvaluationContext};

const DEPARTMENTS: [&str; 4] = ["Sales", "Engineering", "Support", "Finance"];

/// Employee table in A1:B{rows+1} with a `Department="Sales"` criteria block in D1:D2
fn employee_grid(rows: usize) -> Grid {
    let mut grid = Grid::new();
    grid.set_value(0, 0, "Department");
    grid.set_value(0, 1, "Salary");
    for i in 0..rows {
        let row = (i + 1) as u32;
        grid.set_value(row, 0, DEPARTMENTS[i % DEPARTMENTS.len()]);
        grid.set_value(row, 1, 40_000.0 + (i as f64) * 125.0);
    }
    grid.set_value(0, 3, "Department");
    grid.set_value(1, 3, "Sales");
    grid
}

/// Dated cash flows in A1:B{rows}: one outlay then monthly returns
fn cash_flow_grid(rows: usize) -> Grid {
    let mut grid = Grid::new();
    let start = first_of_month(2020, 1);
    grid.set_value(0, 0, -10_000.0);
    grid.set_value(0, 1, start);
    for i in 1..rows {
        let month = i as u32;
        grid.set_value(i as u32, 0, 450.0 + (i % 7) as f64 * 10.0);
        grid.set_value(i as u32, 1, first_of_month(2020 + month / 12, month % 12 + 1));
    }
    grid
}

fn first_of_month(year: u32, month: u32) -> String {
    format!("{year:04}-{month:02}-01")
}

fn bench_parse_formulas(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    group.bench_function("simple", |b| b.iter(|| parse_formula(black_box("=1+2"))));

    group.bench_function("database", |b| {
        b.iter(|| parse_formula(black_box("=DSUM(A1:B100,\"Salary\",D1:D2)")))
    });

    group.bench_function("nested", |b| {
        b.iter(|| {
            parse_formula(black_box(
                "=IF(AND(ISNUMBER(A1),A1>0),PMT(B1/12,C1*12,-A1),IFERROR(1/0,\"n/a\"))",
            ))
        })
    });

    group.finish();
}

fn bench_calculate(c: &mut Criterion) {
    let mut group = c.benchmark_group("calculate");
    let grid = Grid::from_values(vec![vec![250_000.0, 0.045, 30.0]]);

    group.bench_function("literal", |b| {
        b.iter(|| calculate(black_box("=1+2*3"), &grid, 0, 4))
    });

    group.bench_function("pmt", |b| {
        b.iter(|| calculate(black_box("=PMT(B1/12,C1*12,-A1)"), &grid, 0, 4))
    });

    group.bench_function("convert", |b| {
        b.iter(|| calculate(black_box("=CONVERT(100,\"km/h\",\"m/s\")"), &grid, 0, 4))
    });

    group.bench_function("radix", |b| {
        b.iter(|| calculate(black_box("=HEX2DEC(DEC2HEX(A1))"), &grid, 0, 4))
    });

    let ast = parse_formula("=VDB(A1,1000,C1,0,C1,2,FALSE)").unwrap();
    let ctx = EvaluationContext::new(&grid, 0, 4);
    group.bench_function("vdb_preparsed", |b| {
        b.iter(|| evaluate(black_box(&ast), &ctx))
    });

    group.finish();
}

fn bench_database(c: &mut Criterion) {
    let mut group = c.benchmark_group("database");

    for size in [10usize, 100, 1000] {
        let grid = employee_grid(size);
        let formula = format!("=DSUM(A1:B{},\"Salary\",D1:D2)", size + 1);
        group.bench_with_input(BenchmarkId::new("dsum", size), &size, |b, _| {
            b.iter(|| calculate(black_box(&formula), &grid, 0, 5))
        });
    }

    group.finish();
}

fn bench_solvers(c: &mut Criterion) {
    let mut group = c.benchmark_group("solvers");
    let grid = Grid::new();

    group.bench_function("rate", |b| {
        b.iter(|| calculate(black_box("=RATE(360,-1073.64,200000)"), &grid, 0, 0))
    });

    group.bench_function("irr", |b| {
        b.iter(|| calculate(black_box("=IRR({-70000,12000,15000,18000,21000,26000})"), &grid, 0, 0))
    });

    for size in [12usize, 60] {
        let flows = cash_flow_grid(size);
        let formula = format!("=XIRR(A1:A{size},B1:B{size})");
        group.bench_with_input(BenchmarkId::new("xirr", size), &size, |b, _| {
            b.iter(|| calculate(black_box(&formula), &flows, 0, 3))
        });
    }

    group.finish();
}

fn bench_complex(c: &mut Criterion) {
    let mut group = c.benchmark_group("complex");
    let grid = Grid::new();

    group.bench_function("improduct", |b| {
        b.iter(|| calculate(black_box("=IMPRODUCT(\"3+4i\",\"1-2i\",\"-0.5+i\")"), &grid, 0, 0))
    });

    group.bench_function("impower", |b| {
        b.iter(|| calculate(black_box("=IMPOWER(\"1+i\",\"0.5-2i\")"), &grid, 0, 0))
    });

    group.bench_function("imtanh", |b| {
        b.iter(|| calculate(black_box("=IMTANH(IMSUM(\"2+3i\",COMPLEX(1,-1)))"), &grid, 0, 0))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_parse_formulas,
    bench_calculate,
    bench_database,
    bench_solvers,
    bench_complex
);
criterion_main!(benches);
