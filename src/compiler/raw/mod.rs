//! Structured IR
//!
//! The in-memory form of IR text after reconstruction. Each function owns an
//! arena of values; a value is identified by the [`ValueId`] it received when
//! it was created, and every map keyed by "this value" uses that id.
//!
//! Literal operands are values too. Each textual occurrence of a literal gets
//! its own `Integer` value that lives in the arena without being listed in any
//! block.

pub mod eval;
pub mod reader;

use super::ir::Opcode;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use eval::evaluate;
pub use reader::parse;

/// Stable index of a value inside its function's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueId(pub u32);

impl ValueId {
    /// Position of the value in the arena
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Types of the IR text format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    /// `i32`
    I32,
    /// No value
    Unit,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::I32 => write!(f, "i32"),
            Type::Unit => write!(f, "unit"),
        }
    }
}

/// Kind tag of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    /// Integer constant
    Integer(i32),
    /// Binary operation over two earlier values
    Binary {
        /// Opcode
        op: Opcode,
        /// Left operand
        lhs: ValueId,
        /// Right operand
        rhs: ValueId,
    },
    /// Function return
    Return(Option<ValueId>),
}

/// One arena entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueData {
    /// What the value computes
    pub kind: ValueKind,
    /// Name from the IR text (`%3`), for values that define one
    pub name: Option<String>,
}

impl ValueData {
    /// Type of the value's result
    pub fn ty(&self) -> Type {
        match self.kind {
            ValueKind::Integer(_) | ValueKind::Binary { .. } => Type::I32,
            ValueKind::Return(_) => Type::Unit,
        }
    }

    /// Whether the value produces a result that needs a home at run time
    pub fn has_result(&self) -> bool {
        matches!(self.kind, ValueKind::Binary { .. })
    }
}

/// Basic block: a label and the ordered instruction values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockData {
    /// Label without the leading `%`
    pub name: String,
    /// Instruction values in execution order
    pub insts: Vec<ValueId>,
}

/// Function with its value arena
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionData {
    /// Name without the leading `@`
    pub name: String,
    /// Return type
    pub ret_ty: Type,
    /// Value arena, indexed by [`ValueId`]
    pub values: Vec<ValueData>,
    /// Basic blocks, entry first; empty for a declaration
    pub blocks: Vec<BlockData>,
}

impl FunctionData {
    /// Create a function with an empty arena and no blocks
    pub fn new(name: &str, ret_ty: Type) -> Self {
        Self {
            name: name.to_string(),
            ret_ty,
            values: Vec::new(),
            blocks: Vec::new(),
        }
    }

    /// Add a value to the arena
    pub fn alloc(&mut self, kind: ValueKind, name: Option<String>) -> ValueId {
        let id = ValueId(self.values.len() as u32);
        self.values.push(ValueData { kind, name });
        id
    }

    /// Look up a value by id
    pub fn value(&self, id: ValueId) -> Option<&ValueData> {
        self.values.get(id.index())
    }

    /// A function without blocks only declares its symbol
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Instruction values of all blocks in order
    pub fn insts(&self) -> impl Iterator<Item = ValueId> + '_ {
        self.blocks.iter().flat_map(|b| b.insts.iter().copied())
    }

    fn fmt_operand(&self, id: ValueId, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value(id) {
            Some(ValueData {
                kind: ValueKind::Integer(n),
                ..
            }) => write!(f, "{}", n),
            Some(ValueData { name: Some(n), .. }) => write!(f, "{}", n),
            _ => write!(f, "%{}", id),
        }
    }

    fn fmt_inst(&self, id: ValueId, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(data) = self.value(id) else {
            return write!(f, "<dangling {}>", id);
        };
        match data.kind {
            ValueKind::Integer(n) => write!(f, "{}", n),
            ValueKind::Binary { op, lhs, rhs } => {
                match &data.name {
                    Some(name) => write!(f, "{} = {} ", name, op)?,
                    None => write!(f, "%{} = {} ", id, op)?,
                }
                self.fmt_operand(lhs, f)?;
                write!(f, ", ")?;
                self.fmt_operand(rhs, f)
            }
            ValueKind::Return(Some(v)) => {
                write!(f, "ret ")?;
                self.fmt_operand(v, f)
            }
            ValueKind::Return(None) => write!(f, "ret"),
        }
    }
}

impl fmt::Display for FunctionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ret = match self.ret_ty {
            Type::I32 => ": i32",
            Type::Unit => "",
        };
        if self.is_declaration() {
            return writeln!(f, "decl @{}(){}", self.name, ret);
        }
        writeln!(f, "fun @{}(){} {{", self.name, ret)?;
        for block in &self.blocks {
            writeln!(f, "%{}:", block.name)?;
            for &inst in &block.insts {
                write!(f, "  ")?;
                self.fmt_inst(inst, f)?;
                writeln!(f)?;
            }
        }
        writeln!(f, "}}")
    }
}

/// Structured program
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Program {
    /// Functions in text order
    pub funcs: Vec<FunctionData>,
}

impl Program {
    /// Find a function by name
    pub fn func(&self, name: &str) -> Option<&FunctionData> {
        self.funcs.iter().find(|f| f.name == name)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, func) in self.funcs.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", func)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_ids_follow_creation_order() {
        let mut func = FunctionData::new("main", Type::I32);
        let a = func.alloc(ValueKind::Integer(1), None);
        let b = func.alloc(ValueKind::Integer(1), None);
        let sum = func.alloc(
            ValueKind::Binary {
                op: Opcode::Add,
                lhs: a,
                rhs: b,
            },
            Some("%0".to_string()),
        );
        let ret = func.alloc(ValueKind::Return(Some(sum)), None);
        func.blocks.push(BlockData {
            name: "entry".to_string(),
            insts: vec![sum, ret],
        });

        assert_eq!((a, b, sum, ret), (ValueId(0), ValueId(1), ValueId(2), ValueId(3)));
        assert_ne!(a, b);
        assert!(func.value(sum).map(|v| v.has_result()).unwrap_or(false));
        assert_eq!(func.value(ret).map(|v| v.ty()), Some(Type::Unit));
        assert_eq!(
            func.to_string(),
            "fun @main(): i32 {\n%entry:\n  %0 = add 1, 1\n  ret %0\n}\n"
        );
    }

    #[test]
    fn test_declaration_display() {
        let func = FunctionData::new("getint", Type::I32);
        assert!(func.is_declaration());
        assert_eq!(func.to_string(), "decl @getint(): i32\n");
    }
}
