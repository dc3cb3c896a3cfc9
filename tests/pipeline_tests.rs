//! Whole-pipeline tests: library entry points and the `compiler` binary

mod common;

use common::{run_asm, run_source};
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use sysyc::compiler::raw;
use sysyc::{compile_to_asm, compile_to_ir, CompileOptions, Compiler, ErrorClass, Mode};

const PROGRAM: &str = "int main() { return (1+2)*3; }";

// =============================================================================
// LIBRARY
// =============================================================================

#[test]
fn test_program_to_ir_and_value() {
    assert_eq!(
        compile_to_ir(PROGRAM).unwrap(),
        "fun @main(): i32 {\n%entry:\n  %0 = add 1, 2\n  %1 = mul %0, 3\n  ret %1\n}\n"
    );
    let asm = compile_to_asm(PROGRAM).unwrap();
    assert_eq!(run_asm(&asm).unwrap().a0, 9);
}

#[test]
fn test_logical_not_end_to_end() {
    let source = "int main() { return !0; }";
    assert!(compile_to_ir(source).unwrap().contains("  %0 = eq 0, 0\n"));
    assert_eq!(run_source(source, CompileOptions::default()).unwrap().a0, 1);
}

#[test]
fn test_ir_text_round_trips() {
    for source in [
        PROGRAM,
        "int main() { return 5; }",
        "int main() { const int a = 3; int b = a * a; { int a = b - 1; return a % 5 >= 2 && b != 0; } }",
    ] {
        let text = compile_to_ir(source).unwrap();
        let program = raw::parse(&text).unwrap();
        assert_eq!(program.to_string(), text, "{}", source);
    }
}

#[test]
fn test_error_classes_across_stages() {
    let compiler = Compiler::default();
    let cases = [
        ("int main() { return 1 +; }", ErrorClass::Syntax),
        ("int main() { return @; }", ErrorClass::Syntax),
        ("int other() { return 1; }", ErrorClass::UnsupportedConstruct),
        ("int main() { return y; }", ErrorClass::UnsupportedConstruct),
    ];
    for (source, class) in cases {
        let err = compiler.run(Mode::EmitAsm, source).unwrap_err();
        assert_eq!(err.classify(), class, "{}", source);
    }

    let err = compiler.codegen("ret 1\n").unwrap_err();
    assert_eq!(err.classify(), ErrorClass::MalformedIr);
}

#[test]
fn test_compile_reports_both_texts() {
    let result = Compiler::default().compile(PROGRAM).unwrap();
    assert_eq!(result.ir, compile_to_ir(PROGRAM).unwrap());
    assert_eq!(result.asm, compile_to_asm(PROGRAM).unwrap());
    assert_eq!(result.ir_instruction_count, 3);
}

// =============================================================================
// COMMAND LINE
// =============================================================================

fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("sysyc-{}-{}", std::process::id(), name))
}

fn compiler_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_compiler"))
}

#[test]
fn test_cli_writes_ir_file() {
    let input = scratch_path("ir-input.c");
    let output = scratch_path("ir-output.koopa");
    fs::write(&input, PROGRAM).unwrap();

    let status = compiler_bin()
        .arg("-koopa")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .status()
        .unwrap();
    assert!(status.success());
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        compile_to_ir(PROGRAM).unwrap()
    );

    let _ = fs::remove_file(&input);
    let _ = fs::remove_file(&output);
}

#[test]
fn test_cli_writes_asm_with_options_file() {
    let input = scratch_path("asm-input.c");
    let options = scratch_path("asm-options.json");
    let output = scratch_path("asm-output.S");
    fs::write(&input, PROGRAM).unwrap();
    fs::write(&options, r#"{"alloc_policy": "live-range", "scratch_registers": 2}"#).unwrap();

    let status = compiler_bin()
        .arg("emit-asm")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("--options")
        .arg(&options)
        .status()
        .unwrap();
    assert!(status.success());
    let asm = fs::read_to_string(&output).unwrap();
    assert_eq!(run_asm(&asm).unwrap().a0, 9);

    for path in [input, options, output] {
        let _ = fs::remove_file(path);
    }
}

#[test]
fn test_cli_dump_tree_prints_to_stdout() {
    let input = scratch_path("tree-input.c");
    fs::write(&input, "int main() { return 0; }").unwrap();

    let out = compiler_bin().arg("-test").arg(&input).output().unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with("CompUnitAST"));

    let _ = fs::remove_file(&input);
}

#[test]
fn test_cli_unknown_mode_fails() {
    let out = compiler_bin()
        .args(["-perf", "in.c", "-o", "out.S"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("unknown mode: -perf"));
}

#[test]
fn test_cli_failed_compile_leaves_no_output() {
    let input = scratch_path("bad-input.c");
    let output = scratch_path("bad-output.S");
    fs::write(&input, "int main() {\n  return x;\n}").unwrap();
    let _ = fs::remove_file(&output);

    let out = compiler_bin()
        .arg("-riscv")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(!output.exists());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains(":2:10:"), "{}", stderr);

    let _ = fs::remove_file(&input);
}
