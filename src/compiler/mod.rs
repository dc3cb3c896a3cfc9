//! # SysY Compiler - source to IR text to RISC-V assembly
//!
//! ## Architecture
//!
//! ```text
//! Source → Tokens → Syntax tree → IR (text) → Structured IR → RISC-V assembly
//! ```
//!
//! The IR text is the contract between the two halves: the backend never sees
//! the syntax tree, it reads the emitted text back with [`raw::parse`].
//!
//! ## Usage
//!
//! ```
//! use sysyc::compiler::{CompileOptions, Compiler};
//!
//! let compiler = Compiler::new(CompileOptions::default());
//! let ir = compiler.emit_ir("int main() { return 1 + 2; }")?;
//! assert!(ir.contains("%0 = add 1, 2"));
//! let asm = compiler.codegen(&ir)?;
//! assert!(asm.starts_with("  .text\n  .globl main\nmain:\n"));
//! # Ok::<(), sysyc::Error>(())
//! ```

pub mod debug;
pub mod ir;
pub mod raw;
pub mod regalloc;
pub mod riscv_codegen;

pub use ir::{IrGenerator, IrInstruction, IrProgram, Opcode, Operand, Temp};
pub use regalloc::{AllocPolicy, Location, RegisterAllocator, StackFrame};
pub use riscv_codegen::{AsmLine, RiscvCodegen, RiscvInstruction, RiscvReg};

use crate::lexer::Scanner;
use crate::parser::{dump_tree, CompUnit, Parser};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// What the compiler produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Print the syntax tree
    DumpTree,
    /// IR text
    EmitIr,
    /// RISC-V assembly
    EmitAsm,
}

impl Mode {
    /// Whether the mode writes an output file
    pub fn writes_output(self) -> bool {
        !matches!(self, Mode::DumpTree)
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "dump-tree" | "-test" => Ok(Mode::DumpTree),
            "emit-ir" | "-koopa" => Ok(Mode::EmitIr),
            "emit-asm" | "-riscv" => Ok(Mode::EmitAsm),
            other => Err(format!("unknown mode: {}", other)),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::DumpTree => write!(f, "dump-tree"),
            Mode::EmitIr => write!(f, "emit-ir"),
            Mode::EmitAsm => write!(f, "emit-asm"),
        }
    }
}

/// Compilation options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Register allocation policy of the backend
    pub alloc_policy: AllocPolicy,
    /// Number of scratch registers (`t0` upward) the backend may use
    pub scratch_registers: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            alloc_policy: AllocPolicy::SpillAll,
            scratch_registers: regalloc::SCRATCH_POOL.len(),
        }
    }
}

impl CompileOptions {
    /// Parse options from JSON; missing fields take their defaults
    pub fn from_json(text: &str) -> Result<Self> {
        let options: CompileOptions =
            serde_json::from_str(text).map_err(|e| Error::InvalidOptions(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Check ranges
    pub fn validate(&self) -> Result<()> {
        let max = regalloc::SCRATCH_POOL.len();
        if !(regalloc::MIN_SCRATCH..=max).contains(&self.scratch_registers) {
            return Err(Error::InvalidOptions(format!(
                "scratch_registers must be between {} and {}, got {}",
                regalloc::MIN_SCRATCH,
                max,
                self.scratch_registers
            )));
        }
        Ok(())
    }
}

/// Compilation result with metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileResult {
    /// IR text
    pub ir: String,
    /// Assembly text
    pub asm: String,
    /// Number of IR instructions
    pub ir_instruction_count: usize,
    /// Number of emitted machine instructions
    pub asm_instruction_count: usize,
}

/// SysY to RISC-V compiler
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    /// Create a new compiler with options
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    /// Options in use
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Tokenize and parse source text
    pub fn parse(&self, source: &str) -> Result<CompUnit> {
        let tokens = Scanner::new(source).scan_tokens()?;
        debug!("Scanned {} tokens", tokens.len());
        Parser::new(tokens).parse()
    }

    /// Lower a syntax tree to IR
    pub fn lower(&self, unit: &CompUnit) -> Result<IrProgram> {
        IrGenerator::new().generate(unit)
    }

    /// Source text to IR text
    pub fn emit_ir(&self, source: &str) -> Result<String> {
        let unit = self.parse(source)?;
        Ok(self.lower(&unit)?.to_string())
    }

    /// IR text to assembly text
    pub fn codegen(&self, ir_text: &str) -> Result<String> {
        self.options.validate()?;
        let program = raw::parse(ir_text)?;
        RiscvCodegen::new(self.options.alloc_policy, self.options.scratch_registers)
            .generate(&program)
    }

    /// Source text to assembly text, going through IR text in memory
    pub fn emit_asm(&self, source: &str) -> Result<String> {
        Ok(self.compile(source)?.asm)
    }

    /// Run the whole pipeline and collect metadata
    pub fn compile(&self, source: &str) -> Result<CompileResult> {
        self.options.validate()?;

        // Phase 1: Parse
        let unit = self.parse(source)?;

        // Phase 2: Lower
        let ir_program = self.lower(&unit)?;
        let ir_instruction_count = ir_program.instructions().count();
        let ir = ir_program.to_string();

        // Phase 3: Reconstruct
        let program = raw::parse(&ir)?;

        // Phase 4: Generate RISC-V
        let mut codegen =
            RiscvCodegen::new(self.options.alloc_policy, self.options.scratch_registers);
        let asm = codegen.generate(&program)?;
        let asm_instruction_count = codegen
            .lines()
            .iter()
            .filter(|l| matches!(l, AsmLine::Inst(_)))
            .count();

        info!(
            "Compiled: {} IR instructions, {} RISC-V instructions",
            ir_instruction_count, asm_instruction_count
        );

        Ok(CompileResult {
            ir,
            asm,
            ir_instruction_count,
            asm_instruction_count,
        })
    }

    /// Produce the text for `mode`
    pub fn run(&self, mode: Mode, source: &str) -> Result<String> {
        debug!("Running mode {}", mode);
        match mode {
            Mode::DumpTree => Ok(dump_tree(&self.parse(source)?)),
            Mode::EmitIr => self.emit_ir(source),
            Mode::EmitAsm => self.emit_asm(source),
        }
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(CompileOptions::default())
    }
}
