#![allow(missing_docs)]
//! # sysyc - a SysY to RISC-V compiler
//!
//! Compiles a fragment of SysY (a C subset) to RV32 assembly through a textual
//! single-assignment IR.
//!
//! ## Features
//!
//! - Integer expressions with the full SysY operator ladder, `const` and
//!   variable bindings, nested blocks, `return`
//! - IR text that round-trips through the bundled reader
//! - Two register allocation policies with stack spilling
//!
//! ## Quick Start
//!
//! ```rust
//! use sysyc::{compile_to_asm, compile_to_ir};
//!
//! # fn main() -> sysyc::Result<()> {
//! let source = "int main() { return (1 + 2) * 3; }";
//!
//! let ir = compile_to_ir(source)?;
//! assert_eq!(
//!     ir,
//!     "fun @main(): i32 {\n%entry:\n  %0 = add 1, 2\n  %1 = mul %0, 3\n  ret %1\n}\n"
//! );
//!
//! let asm = compile_to_asm(source)?;
//! assert!(asm.ends_with("  ret\n"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Stage by stage
//!
//! ```rust
//! use sysyc::compiler::raw;
//! use sysyc::{IrGenerator, Parser, Scanner};
//!
//! # fn main() -> sysyc::Result<()> {
//! let mut scanner = Scanner::new("int main() { const int x = 6; return x * 7; }");
//! let tokens = scanner.scan_tokens()?;
//! let unit = Parser::new(tokens).parse()?;
//! let ir = IrGenerator::new().generate(&unit)?.to_string();
//! let program = raw::parse(&ir)?;
//! assert_eq!(raw::evaluate(&program, "main")?, 42);
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! The library logs through `tracing` and never installs a subscriber.

// Allow specific clippy warnings that are intentional
#![allow(clippy::module_inception)]

/// Version of the compiler
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod compiler;
pub mod error;
pub mod lexer;
pub mod parser;

// Re-export main types
pub use compiler::{CompileOptions, CompileResult, Compiler, IrGenerator, Mode};
pub use error::{Error, ErrorClass, Result};
pub use lexer::{Scanner, Token, TokenKind};
pub use parser::{BinaryOp, CompUnit, Expr, Parser, Stmt, UnaryOp};

/// Source text to IR text with default options
pub fn compile_to_ir(source: &str) -> Result<String> {
    Compiler::default().emit_ir(source)
}

/// Source text to RISC-V assembly with default options
pub fn compile_to_asm(source: &str) -> Result<String> {
    Compiler::default().emit_asm(source)
}
