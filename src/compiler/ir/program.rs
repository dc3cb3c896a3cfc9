//! IR program and basic block definitions

use super::instruction::IrInstruction;
use serde::{Deserialize, Serialize};

/// IR-level type of a function result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IrType {
    /// 32-bit integer (`i32`)
    I32,
}

/// Straight-line, single-entry instruction sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicBlock {
    /// Label identifying this basic block (without the leading `%`)
    pub label: String,
    /// IR instructions in this block
    pub instructions: Vec<IrInstruction>,
}

impl BasicBlock {
    /// Create a new basic block with the given label
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            instructions: Vec::new(),
        }
    }

    /// Whether the block already ends in a return
    pub fn is_terminated(&self) -> bool {
        matches!(self.instructions.last(), Some(IrInstruction::Return(_)))
    }
}

/// Lowered function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrFunction {
    /// Function name (without the leading `@`)
    pub name: String,
    /// Return type
    pub ret_ty: IrType,
    /// Basic blocks, entry first
    pub blocks: Vec<BasicBlock>,
}

/// Complete IR program
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IrProgram {
    /// Functions in definition order
    pub functions: Vec<IrFunction>,
}

impl IrProgram {
    /// Create a new empty IR program
    pub fn new() -> Self {
        Self::default()
    }

    /// All instructions of all functions in emission order
    pub fn instructions(&self) -> impl Iterator<Item = &IrInstruction> {
        self.functions
            .iter()
            .flat_map(|f| f.blocks.iter())
            .flat_map(|b| b.instructions.iter())
    }
}
