use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sysyc::compiler::AllocPolicy;
use sysyc::{CompileOptions, Compiler, Scanner};

const SOURCE: &str = r#"
int main() {
    const int k = 0x10;
    int a = 1 + 2 * 3, b = (a - k) / 2, c = a % 5 <= b || !a;
    {
        int a = b * c - 07;
        a + k;
    }
    return (a + b) * (c - k) + a * (b - c) - (a + c) / (k + 1);
}
"#;

fn lexer_benchmark(c: &mut Criterion) {
    c.bench_function("tokenize program", |b| {
        b.iter(|| Scanner::new(black_box(SOURCE)).scan_tokens().unwrap())
    });
}

fn pipeline_benchmark(c: &mut Criterion) {
    let compiler = Compiler::default();
    c.bench_function("emit ir", |b| {
        b.iter(|| compiler.emit_ir(black_box(SOURCE)).unwrap())
    });

    let ir = compiler.emit_ir(SOURCE).unwrap();
    for (name, alloc_policy) in [
        ("codegen spill-all", AllocPolicy::SpillAll),
        ("codegen live-range", AllocPolicy::LiveRange),
    ] {
        let compiler = Compiler::new(CompileOptions {
            alloc_policy,
            scratch_registers: 3,
        });
        c.bench_function(name, |b| b.iter(|| compiler.codegen(black_box(&ir)).unwrap()));
    }
}

criterion_group!(benches, lexer_benchmark, pipeline_benchmark);
criterion_main!(benches);
