//! # Intermediate Representation (IR)
//!
//! The lowering engine turns the syntax tree into a textual, single-assignment
//! IR: one function, one `entry` block, binary instructions over immediates and
//! numbered temporaries, and a final `ret`.
//!
//! ## Module Structure
//!
//! ```text
//! ir/
//! ├── mod.rs          # This file - module definition and re-exports
//! ├── instruction.rs  # Temp, Operand, Opcode, IrInstruction
//! ├── program.rs      # BasicBlock, IrFunction, IrProgram
//! ├── printer.rs      # Display impls producing IR text
//! └── generator.rs    # IrGenerator (syntax tree -> IR)
//! ```
//!
//! ## Example
//!
//! `int main() { return (1+2)*3; }` lowers to
//!
//! ```text
//! fun @main(): i32 {
//! %entry:
//!   %0 = add 1, 2
//!   %1 = mul %0, 3
//!   ret %1
//! }
//! ```

mod generator;
mod instruction;
mod printer;
mod program;

pub use generator::{IrGenerator, ENTRY_FUNCTION};
pub use instruction::{IrInstruction, Opcode, Operand, Temp};
pub use program::{BasicBlock, IrFunction, IrProgram, IrType};
