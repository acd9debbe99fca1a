use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use perl_syntax_validator::validation::{line_range, parse_output, resolve_diagnostics};

const INPUT_PATH: &str = "/tmp/perl-syntax-1700000000000-bench.pl";

/// Perl source of `lines` lines with mixed indentation
fn generate_source(lines: usize) -> String {
    let mut content = String::new();
    for i in 0..lines {
        match i % 4 {
            0 => content.push_str(&format!("my $value_{} = {};\n", i, i * 2)),
            1 => content.push_str(&format!("    print \"line {}\\n\";\n", i)),
            2 => content.push_str(&format!("\t$total += $value_{};\n", i - 2)),
            3 => content.push_str("# comment\n"),
            _ => unreachable!(),
        }
    }
    content
}

/// Checker output reporting `count` diagnostics spread over `lines` lines
fn generate_output(count: usize, lines: usize) -> String {
    let mut output = String::new();
    for i in 0..count {
        let line = (i * 7) % lines + 1;
        match i % 3 {
            0 => output.push_str(&format!(
                "syntax error at {INPUT_PATH} line {line}, near \"= ;\"\n"
            )),
            1 => output.push_str(&format!(
                "Useless use of a constant (42) in void context at {INPUT_PATH} line {line}.\n"
            )),
            2 => output.push_str(&format!(
                "Global symbol \"$x\" requires explicit package name at {INPUT_PATH} line {line}.\n\
                 \t(Did you forget to declare \"my $x\"?)\n"
            )),
            _ => unreachable!(),
        }
    }
    output.push_str(&format!("{INPUT_PATH} had compilation errors.\n"));
    output
}

fn bench_parse_output(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_output");

    for count in [10, 100, 1000] {
        let output = generate_output(count, 500);
        group.throughput(Throughput::Bytes(output.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &output, |b, output| {
            b.iter(|| parse_output(black_box(output), INPUT_PATH, count))
        });
    }

    group.finish();
}

fn bench_resolve_diagnostics(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_diagnostics");

    for lines in [100, 1000, 10_000] {
        let source = generate_source(lines);
        let candidates = parse_output(&generate_output(100, lines), INPUT_PATH, 100);
        group.throughput(Throughput::Elements(candidates.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &source, |b, source| {
            b.iter(|| resolve_diagnostics(black_box(&candidates), black_box(source)))
        });
    }

    group.finish();
}

fn bench_line_range(c: &mut Criterion) {
    let source = generate_source(10_000);

    c.bench_function("line_range_last_line", |b| {
        b.iter(|| line_range(black_box(&source), black_box(10_000)))
    });
}

criterion_group!(
    benches,
    bench_parse_output,
    bench_resolve_diagnostics,
    bench_line_range
);
criterion_main!(benches);
