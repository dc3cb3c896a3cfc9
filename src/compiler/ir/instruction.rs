//! IR instruction definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Anonymous single-assignment temporary, printed as `%N`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Temp(pub u32);

impl Temp {
    /// Creates a temporary with the given number
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for Temp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Value produced by lowering an expression
///
/// Operands never denote storage: a name is bound once to the operand of its
/// initializer and reused as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operand {
    /// Immediate integer literal
    Imm(i32),
    /// Result of a previously emitted instruction
    Temp(Temp),
}

impl Operand {
    /// Temporary referenced by this operand, if any
    pub fn as_temp(&self) -> Option<Temp> {
        match self {
            Operand::Temp(t) => Some(*t),
            Operand::Imm(_) => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Imm(n) => write!(f, "{}", n),
            Operand::Temp(t) => write!(f, "{}", t),
        }
    }
}

/// Binary opcodes of the IR text format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    /// `ne`
    Ne,
    /// `eq`
    Eq,
    /// `gt`
    Gt,
    /// `lt`
    Lt,
    /// `ge`
    Ge,
    /// `le`
    Le,
    /// `add`
    Add,
    /// `sub`
    Sub,
    /// `mul`
    Mul,
    /// `div`
    Div,
    /// `mod`
    Mod,
    /// `and`
    And,
    /// `or`
    Or,
    /// `xor`
    Xor,
    /// `shl`
    Shl,
    /// `shr` (logical)
    Shr,
    /// `sar` (arithmetic)
    Sar,
}

impl Opcode {
    /// Mnemonic as written in IR text
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Ne => "ne",
            Opcode::Eq => "eq",
            Opcode::Gt => "gt",
            Opcode::Lt => "lt",
            Opcode::Ge => "ge",
            Opcode::Le => "le",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::Mod => "mod",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Xor => "xor",
            Opcode::Shl => "shl",
            Opcode::Shr => "shr",
            Opcode::Sar => "sar",
        }
    }

    /// Apply the opcode under 32-bit two's-complement semantics
    ///
    /// Returns `None` for division or remainder by zero.
    pub fn apply(self, lhs: i32, rhs: i32) -> Option<i32> {
        let value = match self {
            Opcode::Ne => (lhs != rhs) as i32,
            Opcode::Eq => (lhs == rhs) as i32,
            Opcode::Gt => (lhs > rhs) as i32,
            Opcode::Lt => (lhs < rhs) as i32,
            Opcode::Ge => (lhs >= rhs) as i32,
            Opcode::Le => (lhs <= rhs) as i32,
            Opcode::Add => lhs.wrapping_add(rhs),
            Opcode::Sub => lhs.wrapping_sub(rhs),
            Opcode::Mul => lhs.wrapping_mul(rhs),
            Opcode::Div => {
                if rhs == 0 {
                    return None;
                }
                lhs.wrapping_div(rhs)
            }
            Opcode::Mod => {
                if rhs == 0 {
                    return None;
                }
                lhs.wrapping_rem(rhs)
            }
            Opcode::And => lhs & rhs,
            Opcode::Or => lhs | rhs,
            Opcode::Xor => lhs ^ rhs,
            Opcode::Shl => lhs.wrapping_shl(rhs as u32),
            Opcode::Shr => ((lhs as u32).wrapping_shr(rhs as u32)) as i32,
            Opcode::Sar => lhs.wrapping_shr(rhs as u32),
        };
        Some(value)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

impl FromStr for Opcode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ne" => Ok(Opcode::Ne),
            "eq" => Ok(Opcode::Eq),
            "gt" => Ok(Opcode::Gt),
            "lt" => Ok(Opcode::Lt),
            "ge" => Ok(Opcode::Ge),
            "le" => Ok(Opcode::Le),
            "add" => Ok(Opcode::Add),
            "sub" => Ok(Opcode::Sub),
            "mul" => Ok(Opcode::Mul),
            "div" => Ok(Opcode::Div),
            "mod" => Ok(Opcode::Mod),
            "and" => Ok(Opcode::And),
            "or" => Ok(Opcode::Or),
            "xor" => Ok(Opcode::Xor),
            "shl" => Ok(Opcode::Shl),
            "shr" => Ok(Opcode::Shr),
            "sar" => Ok(Opcode::Sar),
            other => Err(format!("unknown opcode '{}'", other)),
        }
    }
}

/// IR instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IrInstruction {
    /// `dst = op lhs, rhs`
    Binary {
        /// Result temporary
        dst: Temp,
        /// Opcode
        op: Opcode,
        /// Left operand
        lhs: Operand,
        /// Right operand
        rhs: Operand,
    },
    /// `ret [operand]`
    Return(Option<Operand>),
}

impl IrInstruction {
    /// Temporary defined by this instruction
    pub fn def(&self) -> Option<Temp> {
        match self {
            IrInstruction::Binary { dst, .. } => Some(*dst),
            IrInstruction::Return(_) => None,
        }
    }

    /// Operands read by this instruction, left to right
    pub fn uses(&self) -> Vec<Operand> {
        match self {
            IrInstruction::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            IrInstruction::Return(value) => value.iter().copied().collect(),
        }
    }
}
