//! RISC-V code generator
//!
//! Walks structured IR and emits RV32IM assembly text. Per function:
//!
//! ```text
//!   .globl main
//! main:
//!   addi sp, sp, -N      # prologue, only when N > 0
//!   ...                  # one sequence per instruction
//!   addi sp, sp, N       # epilogue, before every ret
//!   ret
//! ```
//!
//! Operands are materialized left to right. Literals are loaded with `li`
//! and never touch the stack; results are placed by [`RegisterAllocator`].

use super::debug::{dump_arena, RegAllocTrace};
use super::ir::Opcode;
use super::raw::{FunctionData, Program, ValueId, ValueKind};
use super::regalloc::{AllocPolicy, Eviction, Location, RegisterAllocator};
use crate::{Error, Result};
use std::fmt;
use tracing::{debug, trace};

/// Smallest and largest value of a 12-bit signed immediate
const IMM12_MIN: i32 = -2048;
const IMM12_MAX: i32 = 2047;

// =============================================================================
// REGISTERS AND INSTRUCTIONS
// =============================================================================

/// RV32 registers used by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RiscvReg {
    /// Hard-wired zero
    Zero,
    /// Stack pointer
    Sp,
    /// Return value
    A0,
    /// Address scratch for out-of-range offsets
    A1,
    /// Temporaries
    T0,
    T1,
    T2,
    T3,
    T4,
    T5,
    T6,
}

impl RiscvReg {
    /// ABI name
    pub fn name(self) -> &'static str {
        match self {
            RiscvReg::Zero => "x0",
            RiscvReg::Sp => "sp",
            RiscvReg::A0 => "a0",
            RiscvReg::A1 => "a1",
            RiscvReg::T0 => "t0",
            RiscvReg::T1 => "t1",
            RiscvReg::T2 => "t2",
            RiscvReg::T3 => "t3",
            RiscvReg::T4 => "t4",
            RiscvReg::T5 => "t5",
            RiscvReg::T6 => "t6",
        }
    }
}

impl fmt::Display for RiscvReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Register-register ALU operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Sll,
    Srl,
    Sra,
    Slt,
    Sgt,
}

impl AluOp {
    /// Assembler mnemonic
    pub fn mnemonic(self) -> &'static str {
        match self {
            AluOp::Add => "add",
            AluOp::Sub => "sub",
            AluOp::Mul => "mul",
            AluOp::Div => "div",
            AluOp::Rem => "rem",
            AluOp::And => "and",
            AluOp::Or => "or",
            AluOp::Xor => "xor",
            AluOp::Sll => "sll",
            AluOp::Srl => "srl",
            AluOp::Sra => "sra",
            AluOp::Slt => "slt",
            AluOp::Sgt => "sgt",
        }
    }
}

/// Emitted instruction vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiscvInstruction {
    /// `li rd, imm`
    Li { rd: RiscvReg, imm: i32 },
    /// `mv rd, rs`
    Mv { rd: RiscvReg, rs: RiscvReg },
    /// `addi rd, rs, imm`
    Addi { rd: RiscvReg, rs: RiscvReg, imm: i32 },
    /// `<op> rd, rs1, rs2`
    Alu {
        op: AluOp,
        rd: RiscvReg,
        rs1: RiscvReg,
        rs2: RiscvReg,
    },
    /// `seqz rd, rs`
    Seqz { rd: RiscvReg, rs: RiscvReg },
    /// `snez rd, rs`
    Snez { rd: RiscvReg, rs: RiscvReg },
    /// `lw rd, offset(base)`
    Lw {
        rd: RiscvReg,
        offset: i32,
        base: RiscvReg,
    },
    /// `sw rs, offset(base)`
    Sw {
        rs: RiscvReg,
        offset: i32,
        base: RiscvReg,
    },
    /// `ret`
    Ret,
}

impl fmt::Display for RiscvInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiscvInstruction::Li { rd, imm } => write!(f, "li {}, {}", rd, imm),
            RiscvInstruction::Mv { rd, rs } => write!(f, "mv {}, {}", rd, rs),
            RiscvInstruction::Addi { rd, rs, imm } => write!(f, "addi {}, {}, {}", rd, rs, imm),
            RiscvInstruction::Alu { op, rd, rs1, rs2 } => {
                write!(f, "{} {}, {}, {}", op.mnemonic(), rd, rs1, rs2)
            }
            RiscvInstruction::Seqz { rd, rs } => write!(f, "seqz {}, {}", rd, rs),
            RiscvInstruction::Snez { rd, rs } => write!(f, "snez {}, {}", rd, rs),
            RiscvInstruction::Lw { rd, offset, base } => write!(f, "lw {}, {}({})", rd, offset, base),
            RiscvInstruction::Sw { rs, offset, base } => write!(f, "sw {}, {}({})", rs, offset, base),
            RiscvInstruction::Ret => write!(f, "ret"),
        }
    }
}

/// One line of assembly output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsmLine {
    /// Assembler directive such as `.text`
    Directive(String),
    /// Label definition
    Label(String),
    /// Instruction
    Inst(RiscvInstruction),
    /// Empty separator line
    Blank,
}

impl fmt::Display for AsmLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmLine::Directive(d) => write!(f, "  {}", d),
            AsmLine::Label(l) => write!(f, "{}:", l),
            AsmLine::Inst(i) => write!(f, "  {}", i),
            AsmLine::Blank => Ok(()),
        }
    }
}

fn fits_imm12(value: i32) -> bool {
    (IMM12_MIN..=IMM12_MAX).contains(&value)
}

// =============================================================================
// CODE GENERATOR
// =============================================================================

/// RISC-V code generator that turns structured IR into assembly text
pub struct RiscvCodegen {
    policy: AllocPolicy,
    scratch_registers: usize,
    lines: Vec<AsmLine>,
    trace: RegAllocTrace,
}

impl RiscvCodegen {
    /// Create a code generator with the given allocation settings
    pub fn new(policy: AllocPolicy, scratch_registers: usize) -> Self {
        Self {
            policy,
            scratch_registers,
            lines: Vec::new(),
            trace: RegAllocTrace::new(),
        }
    }

    /// Emitted lines of the last `generate` call
    pub fn lines(&self) -> &[AsmLine] {
        &self.lines
    }

    /// Allocation decisions of the last `generate` call
    pub fn alloc_trace(&self) -> &RegAllocTrace {
        &self.trace
    }

    /// Generate assembly text for a whole program
    pub fn generate(&mut self, program: &Program) -> Result<String> {
        self.lines.clear();
        self.trace = RegAllocTrace::new();
        self.lines.push(AsmLine::Directive(".text".to_string()));

        for (i, func) in program.funcs.iter().enumerate() {
            if i > 0 {
                self.lines.push(AsmLine::Blank);
            }
            if func.is_declaration() {
                debug!("'{}' has no blocks, emitting declaration only", func.name);
                self.lines.push(AsmLine::Directive(format!(".globl {}", func.name)));
                continue;
            }
            self.generate_function(func)?;
        }

        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.to_string());
            out.push('\n');
        }
        Ok(out)
    }

    fn generate_function(&mut self, func: &FunctionData) -> Result<()> {
        trace!("arena of '{}':\n{}", func.name, dump_arena(func));
        let mut alloc = RegisterAllocator::new(func, self.policy, self.scratch_registers)?;
        let frame_size = alloc.frame().size();
        debug!(
            "Generating '{}': frame {} bytes, policy {:?}",
            func.name,
            frame_size,
            alloc.policy()
        );

        self.lines.push(AsmLine::Directive(format!(".globl {}", func.name)));
        self.lines.push(AsmLine::Label(func.name.clone()));
        self.adjust_sp(-frame_size);

        let mut index = 0;
        for (bi, block) in func.blocks.iter().enumerate() {
            if bi > 0 {
                self.lines
                    .push(AsmLine::Label(format!(".L{}_{}", func.name, block.name)));
            }
            for &id in &block.insts {
                self.generate_value(func, &mut alloc, id, index, frame_size)?;
                index += 1;
            }
        }

        trace!("allocation of '{}':\n{}", func.name, self.trace.render());
        Ok(())
    }

    fn generate_value(
        &mut self,
        func: &FunctionData,
        alloc: &mut RegisterAllocator,
        id: ValueId,
        index: usize,
        frame_size: i32,
    ) -> Result<()> {
        match kind_of(func, id)? {
            // Literals are materialized at their uses
            ValueKind::Integer(_) => Ok(()),

            ValueKind::Binary { op, lhs, rhs } => {
                let l = self.materialize(func, alloc, lhs, &[])?;
                let r = self.materialize(func, alloc, rhs, &[l])?;
                alloc.release(index, &[l, r]);

                let (rd, eviction) = alloc.acquire(None, &[])?;
                self.spill(eviction);
                self.emit_binary(op, rd, l, r);

                self.trace.record_alloc(id, rd, "result");
                if let Some(offset) = alloc.define(id, rd)? {
                    self.store(rd, offset);
                }
                Ok(())
            }

            ValueKind::Return(value) => {
                if let Some(value) = value {
                    self.materialize_into(func, alloc, value, RiscvReg::A0)?;
                }
                self.adjust_sp(frame_size);
                self.emit(RiscvInstruction::Ret);
                Ok(())
            }
        }
    }

    /// Bring an operand into some scratch register
    fn materialize(
        &mut self,
        func: &FunctionData,
        alloc: &mut RegisterAllocator,
        id: ValueId,
        pinned: &[RiscvReg],
    ) -> Result<RiscvReg> {
        match kind_of(func, id)? {
            ValueKind::Integer(imm) => {
                let (reg, eviction) = alloc.acquire(None, pinned)?;
                self.spill(eviction);
                self.emit(RiscvInstruction::Li { rd: reg, imm });
                Ok(reg)
            }
            ValueKind::Binary { .. } => match alloc.location(id) {
                Some(Location::Reg(reg)) => Ok(reg),
                Some(Location::Stack(offset)) => {
                    let (reg, eviction) = alloc.acquire(Some(id), pinned)?;
                    self.spill(eviction);
                    self.load(reg, offset);
                    self.trace.record_reload(id, offset, reg);
                    Ok(reg)
                }
                None => Err(Error::codegen(format!("value {} used before definition", id))),
            },
            ValueKind::Return(_) => Err(Error::codegen(format!(
                "return {} used as an operand",
                id
            ))),
        }
    }

    /// Bring an operand into a fixed register outside the scratch pool
    fn materialize_into(
        &mut self,
        func: &FunctionData,
        alloc: &RegisterAllocator,
        id: ValueId,
        target: RiscvReg,
    ) -> Result<()> {
        match kind_of(func, id)? {
            ValueKind::Integer(imm) => self.emit(RiscvInstruction::Li { rd: target, imm }),
            ValueKind::Binary { .. } => match alloc.location(id) {
                Some(Location::Reg(reg)) => self.emit(RiscvInstruction::Mv { rd: target, rs: reg }),
                Some(Location::Stack(offset)) => self.load(target, offset),
                None => {
                    return Err(Error::codegen(format!("value {} used before definition", id)))
                }
            },
            ValueKind::Return(_) => {
                return Err(Error::codegen(format!("return {} used as an operand", id)))
            }
        }
        Ok(())
    }

    fn emit_binary(&mut self, op: Opcode, rd: RiscvReg, rs1: RiscvReg, rs2: RiscvReg) {
        let alu = |op| RiscvInstruction::Alu { op, rd, rs1, rs2 };
        match op {
            Opcode::Add => self.emit(alu(AluOp::Add)),
            Opcode::Sub => self.emit(alu(AluOp::Sub)),
            Opcode::Mul => self.emit(alu(AluOp::Mul)),
            Opcode::Div => self.emit(alu(AluOp::Div)),
            Opcode::Mod => self.emit(alu(AluOp::Rem)),
            Opcode::And => self.emit(alu(AluOp::And)),
            Opcode::Or => self.emit(alu(AluOp::Or)),
            Opcode::Xor => self.emit(alu(AluOp::Xor)),
            Opcode::Shl => self.emit(alu(AluOp::Sll)),
            Opcode::Shr => self.emit(alu(AluOp::Srl)),
            Opcode::Sar => self.emit(alu(AluOp::Sra)),
            Opcode::Lt => self.emit(alu(AluOp::Slt)),
            Opcode::Gt => self.emit(alu(AluOp::Sgt)),
            Opcode::Le => {
                self.emit(alu(AluOp::Sgt));
                self.emit(RiscvInstruction::Seqz { rd, rs: rd });
            }
            Opcode::Ge => {
                self.emit(alu(AluOp::Slt));
                self.emit(RiscvInstruction::Seqz { rd, rs: rd });
            }
            Opcode::Eq => {
                self.emit(alu(AluOp::Xor));
                self.emit(RiscvInstruction::Seqz { rd, rs: rd });
            }
            Opcode::Ne => {
                self.emit(alu(AluOp::Xor));
                self.emit(RiscvInstruction::Snez { rd, rs: rd });
            }
        }
    }

    /// Move `sp` by `delta` bytes; no-op for zero
    fn adjust_sp(&mut self, delta: i32) {
        if delta == 0 {
            return;
        }
        if fits_imm12(delta) {
            self.emit(RiscvInstruction::Addi {
                rd: RiscvReg::Sp,
                rs: RiscvReg::Sp,
                imm: delta,
            });
        } else {
            self.emit(RiscvInstruction::Li {
                rd: RiscvReg::A1,
                imm: delta,
            });
            self.emit(RiscvInstruction::Alu {
                op: AluOp::Add,
                rd: RiscvReg::Sp,
                rs1: RiscvReg::Sp,
                rs2: RiscvReg::A1,
            });
        }
    }

    /// Base register and offset addressing `offset(sp)`
    fn slot_address(&mut self, offset: i32) -> (RiscvReg, i32) {
        if fits_imm12(offset) {
            return (RiscvReg::Sp, offset);
        }
        self.emit(RiscvInstruction::Li {
            rd: RiscvReg::A1,
            imm: offset,
        });
        self.emit(RiscvInstruction::Alu {
            op: AluOp::Add,
            rd: RiscvReg::A1,
            rs1: RiscvReg::Sp,
            rs2: RiscvReg::A1,
        });
        (RiscvReg::A1, 0)
    }

    fn load(&mut self, rd: RiscvReg, offset: i32) {
        let (base, offset) = self.slot_address(offset);
        self.emit(RiscvInstruction::Lw { rd, offset, base });
    }

    fn store(&mut self, rs: RiscvReg, offset: i32) {
        let (base, offset) = self.slot_address(offset);
        self.emit(RiscvInstruction::Sw { rs, offset, base });
    }

    fn spill(&mut self, eviction: Option<Eviction>) {
        if let Some(ev) = eviction {
            self.store(ev.reg, ev.offset);
            self.trace.record_spill(ev.value, ev.offset);
        }
    }

    fn emit(&mut self, inst: RiscvInstruction) {
        self.lines.push(AsmLine::Inst(inst));
    }
}

fn kind_of(func: &FunctionData, id: ValueId) -> Result<ValueKind> {
    func.value(id)
        .map(|v| v.kind)
        .ok_or_else(|| Error::codegen(format!("dangling value {} in '{}'", id, func.name)))
}
