//! Command-line driver
//!
//! Usage: compiler <mode> <input> -o <output> [--options <file.json>]

use anyhow::{bail, Context};
use std::env;
use std::fs;
use std::process;
use sysyc::{CompileOptions, Compiler, Mode};

const USAGE: &str = "usage: compiler <mode> <input> -o <output> [--options <file.json>]
modes:
  dump-tree | -test     print the syntax tree
  emit-ir   | -koopa    write IR text
  emit-asm  | -riscv    write RISC-V assembly";

struct Args {
    mode: Mode,
    input: String,
    output: Option<String>,
    options: Option<String>,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = parse_args(env::args().skip(1))?;

    let options = match &args.options {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read options file '{}'", path))?;
            CompileOptions::from_json(&text)?
        }
        None => CompileOptions::default(),
    };

    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read '{}'", args.input))?;

    let compiler = Compiler::new(options);
    let text = compiler.run(args.mode, &source).map_err(|e| match e.location() {
        Some((line, col)) => anyhow::anyhow!("{}:{}:{}: {}", args.input, line, col, e),
        None => anyhow::anyhow!("{}: {}", args.input, e),
    })?;

    if !args.mode.writes_output() {
        println!("{}", text);
        return Ok(());
    }

    let output = args
        .output
        .as_deref()
        .context("missing '-o <output>'")?;
    fs::write(output, text).with_context(|| format!("failed to write '{}'", output))?;
    Ok(())
}

fn parse_args(mut argv: impl Iterator<Item = String>) -> anyhow::Result<Args> {
    let Some(mode) = argv.next() else {
        bail!("{}", USAGE);
    };
    let mode: Mode = match mode.parse() {
        Ok(mode) => mode,
        Err(message) => bail!("{}\n{}", message, USAGE),
    };

    let mut input = None;
    let mut output = None;
    let mut options = None;
    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "-o" => output = Some(argv.next().context("'-o' needs a file name")?),
            "--options" => options = Some(argv.next().context("'--options' needs a file name")?),
            _ if input.is_none() => input = Some(arg),
            other => bail!("unexpected argument '{}'\n{}", other, USAGE),
        }
    }

    let input = input.with_context(|| format!("missing input file\n{}", USAGE))?;
    if mode.writes_output() && output.is_none() {
        bail!("missing '-o <output>'\n{}", USAGE);
    }

    Ok(Args {
        mode,
        input,
        output,
        options,
    })
}
