//! Code generation tests: IR text -> RISC-V assembly, checked by simulation

mod common;

use common::{run_asm, run_source, STACK_TOP};
use sysyc::compiler::regalloc::AllocPolicy;
use sysyc::{CompileOptions, Compiler, Error};

fn options(alloc_policy: AllocPolicy, scratch_registers: usize) -> CompileOptions {
    CompileOptions {
        alloc_policy,
        scratch_registers,
    }
}

fn all_configs() -> Vec<CompileOptions> {
    let mut configs = Vec::new();
    for policy in [AllocPolicy::SpillAll, AllocPolicy::LiveRange] {
        for regs in [2, 3, 7] {
            configs.push(options(policy, regs));
        }
    }
    configs
}

const WIDE: &str = "int main() {
    int a = 1 + 2, b = 3 * 4, c = 5 - 6, d = 7 / 2, e = 9 % 4;
    return (a + b) * (c - d) + e * (a - e) - (b + c) / (d + 1);
}";

#[test]
fn test_end_to_end_value() {
    for config in all_configs() {
        let outcome = run_source("int main() { return (1+2)*3; }", config).unwrap();
        assert_eq!(outcome.a0, 9, "{:?}", config);
    }
}

#[test]
fn test_wide_expression_under_register_pressure() {
    // a=3 b=12 c=-1 d=3 e=1: 15 * -4 + 1 * 2 - 11 / 4 = -60
    for config in all_configs() {
        let outcome = run_source(WIDE, config).unwrap();
        assert_eq!(outcome.a0, -60, "{:?}", config);
    }
}

#[test]
fn test_pool_limit_is_respected() {
    let outcome = run_source(WIDE, options(AllocPolicy::LiveRange, 2)).unwrap();
    for reg in &outcome.written {
        assert!(
            ["a0", "sp", "t0", "t1"].contains(&reg.as_str()),
            "unexpected register {}",
            reg
        );
    }
}

#[test]
fn test_frame_and_epilogue_are_symmetric() {
    let asm = Compiler::default()
        .emit_asm("int main() { int x = 1 + 2; return x * x - 4; }")
        .unwrap();
    // three results, one word each
    assert!(asm.contains("  addi sp, sp, -12\n"));
    let epilogue = asm.lines().filter(|l| l.trim() == "addi sp, sp, 12").count();
    let rets = asm.lines().filter(|l| l.trim() == "ret").count();
    assert_eq!(epilogue, rets);

    let outcome = run_asm(&asm).unwrap();
    assert_eq!(outcome.a0, 5);
    assert_eq!(outcome.max_depth, 12);
}

#[test]
fn test_no_frame_without_results() {
    let asm = Compiler::default()
        .emit_asm("int main() { return 42; }")
        .unwrap();
    assert_eq!(asm, "  .text\n  .globl main\nmain:\n  li a0, 42\n  ret\n");
    assert_eq!(run_asm(&asm).unwrap().max_depth, 0);
}

#[test]
fn test_literals_never_touch_the_stack() {
    let asm = Compiler::default()
        .emit_asm("int main() { return 1 + 2; }")
        .unwrap();
    let body: Vec<&str> = asm.lines().map(str::trim).collect();
    let add = body.iter().position(|l| l.starts_with("add ")).unwrap();
    assert_eq!(body[add - 2], "li t0, 1");
    assert_eq!(body[add - 1], "li t1, 2");
    assert_eq!(body.iter().filter(|l| l.starts_with("lw")).count(), 1);
}

#[test]
fn test_spill_all_reloads_at_each_use() {
    let asm = Compiler::default()
        .emit_asm("int main() { int x = 6 * 7; int y = x + 1; return x + y; }")
        .unwrap();
    assert_eq!(asm.matches("  lw t0, 0(sp)\n").count(), 2);
    assert!(asm.contains("  lw t0, 0(sp)\n  lw t1, 4(sp)\n  add t0, t0, t1\n"));
    assert_eq!(run_asm(&asm).unwrap().a0, 85);
}

#[test]
fn test_division_semantics_match_hardware() {
    let cases = [
        ("-7 / 2", -3),
        ("-7 % 2", -1),
        ("7 % -3", 1),
        ("-2147483647 - 1", i32::MIN),
        ("2147483647 + 1", i32::MIN),
        ("65536 * 65536", 0),
    ];
    for (expr, expected) in cases {
        let source = format!("int main() {{ return {}; }}", expr);
        for config in all_configs() {
            assert_eq!(run_source(&source, config).unwrap().a0, expected, "{}", expr);
        }
    }
}

#[test]
fn test_relational_expansion_results() {
    let cases = [
        ("3 <= 3", 1),
        ("4 <= 3", 0),
        ("3 >= 4", 0),
        ("4 >= 4", 1),
        ("5 == 5", 1),
        ("5 != 5", 0),
        ("-1 < 0", 1),
        ("-1 > 0", 0),
    ];
    for (expr, expected) in cases {
        let source = format!("int main() {{ return {}; }}", expr);
        assert_eq!(
            run_source(&source, CompileOptions::default()).unwrap().a0,
            expected,
            "{}",
            expr
        );
    }
}

#[test]
fn test_large_frame_runs() {
    let mut source = String::from("int main() { int v0 = 1 + 0;");
    for i in 1..700 {
        source.push_str(&format!(" int v{} = v{} + 1;", i, i - 1));
    }
    source.push_str(" return v699 - 600; }");

    for policy in [AllocPolicy::SpillAll, AllocPolicy::LiveRange] {
        let asm = Compiler::new(options(policy, 7)).emit_asm(&source).unwrap();
        assert!(asm.contains("  li a1, -2804\n  add sp, sp, a1\n"));
        let outcome = run_asm(&asm).unwrap();
        assert_eq!(outcome.a0, 100);
        assert_eq!(outcome.max_depth, 2804);
    }
    assert!(STACK_TOP > 2804);
}

#[test]
fn test_codegen_rejects_bad_ir() {
    let err = Compiler::default()
        .codegen("fun @main(): i32 {\n%entry:\n  %0 = add %9, 1\n  ret %0\n}\n")
        .unwrap_err();
    assert!(matches!(err, Error::MalformedIr { line: 3, .. }));
}

#[test]
fn test_declaration_only_function() {
    let asm = Compiler::default()
        .codegen("decl @putint(): i32\n\nfun @main(): i32 {\n%entry:\n  ret 3\n}\n")
        .unwrap();
    assert_eq!(
        asm,
        "  .text\n  .globl putint\n\n  .globl main\nmain:\n  li a0, 3\n  ret\n"
    );
}

#[test]
fn test_invalid_options_rejected() {
    let err = Compiler::new(options(AllocPolicy::SpillAll, 0))
        .emit_asm("int main() { return 0; }")
        .unwrap_err();
    assert!(matches!(err, Error::InvalidOptions(_)));
}
