//! Shared helpers for integration tests
//!
//! A tiny RV32IM interpreter covering the instructions the backend emits. It
//! runs `main`, rejects reads of never-written stack slots, and checks that
//! `sp` is back at its entry value when `ret` executes.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};

/// Stack pointer value at entry
pub const STACK_TOP: u32 = 0x8000_0000;

/// Result of running `main`
#[derive(Debug)]
pub struct Outcome {
    /// Value in `a0` at `ret`
    pub a0: i32,
    /// Every register written during the run
    pub written: BTreeSet<String>,
    /// Deepest `sp` reached, as bytes below `STACK_TOP`
    pub max_depth: u32,
    /// Instructions executed
    pub steps: usize,
}

struct Machine {
    regs: HashMap<String, u32>,
    memory: HashMap<u32, u32>,
    written: BTreeSet<String>,
    max_depth: u32,
}

impl Machine {
    fn new() -> Self {
        let mut regs = HashMap::new();
        regs.insert("sp".to_string(), STACK_TOP);
        regs.insert("x0".to_string(), 0);
        regs.insert("zero".to_string(), 0);
        Self {
            regs,
            memory: HashMap::new(),
            written: BTreeSet::new(),
            max_depth: 0,
        }
    }

    fn get(&self, reg: &str) -> Result<u32, String> {
        self.regs
            .get(reg)
            .copied()
            .ok_or_else(|| format!("read of uninitialized register {}", reg))
    }

    fn set(&mut self, reg: &str, value: u32) -> Result<(), String> {
        match reg {
            "x0" | "zero" => Ok(()),
            "a0" | "a1" | "sp" | "t0" | "t1" | "t2" | "t3" | "t4" | "t5" | "t6" => {
                if reg == "sp" {
                    self.max_depth = self.max_depth.max(STACK_TOP.wrapping_sub(value));
                }
                self.regs.insert(reg.to_string(), value);
                self.written.insert(reg.to_string());
                Ok(())
            }
            other => Err(format!("write to unexpected register {}", other)),
        }
    }

    fn address(&self, operand: &str) -> Result<u32, String> {
        let (offset, rest) = operand
            .split_once('(')
            .ok_or_else(|| format!("bad memory operand {}", operand))?;
        let base = rest
            .strip_suffix(')')
            .ok_or_else(|| format!("bad memory operand {}", operand))?;
        let offset: i32 = offset.parse().map_err(|_| format!("bad offset {}", offset))?;
        let addr = self.get(base)?.wrapping_add(offset as u32);
        if addr % 4 != 0 {
            return Err(format!("misaligned access at {:#x}", addr));
        }
        Ok(addr)
    }
}

fn imm(text: &str) -> Result<i32, String> {
    text.parse().map_err(|_| format!("bad immediate {}", text))
}

fn alu(op: &str, a: u32, b: u32) -> Option<u32> {
    let (sa, sb) = (a as i32, b as i32);
    let value = match op {
        "add" => a.wrapping_add(b),
        "sub" => a.wrapping_sub(b),
        "mul" => a.wrapping_mul(b),
        "div" => {
            if sb == 0 {
                u32::MAX
            } else {
                sa.wrapping_div(sb) as u32
            }
        }
        "rem" => {
            if sb == 0 {
                a
            } else {
                sa.wrapping_rem(sb) as u32
            }
        }
        "and" => a & b,
        "or" => a | b,
        "xor" => a ^ b,
        "sll" => a.wrapping_shl(b & 31),
        "srl" => a.wrapping_shr(b & 31),
        "sra" => sa.wrapping_shr(b & 31) as u32,
        "slt" => (sa < sb) as u32,
        "sgt" => (sa > sb) as u32,
        _ => return None,
    };
    Some(value)
}

/// Run `main` from assembly text
pub fn run_asm(asm: &str) -> Result<Outcome, String> {
    let lines: Vec<&str> = asm.lines().collect();
    let start = lines
        .iter()
        .position(|l| l.trim() == "main:")
        .ok_or("no main label")?;

    let mut m = Machine::new();
    let mut steps = 0;
    for raw in &lines[start + 1..] {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('.') || line.ends_with(':') {
            continue;
        }
        steps += 1;

        let (mnemonic, rest) = line.split_once(' ').unwrap_or((line, ""));
        let ops: Vec<&str> = rest.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
        let arity = |n: usize| -> Result<(), String> {
            if ops.len() == n {
                Ok(())
            } else {
                Err(format!("'{}' expects {} operands", line, n))
            }
        };

        match mnemonic {
            "li" => {
                arity(2)?;
                m.set(ops[0], imm(ops[1])? as u32)?;
            }
            "mv" => {
                arity(2)?;
                let v = m.get(ops[1])?;
                m.set(ops[0], v)?;
            }
            "addi" => {
                arity(3)?;
                let v = m.get(ops[1])?.wrapping_add(imm(ops[2])? as u32);
                m.set(ops[0], v)?;
            }
            "seqz" | "snez" => {
                arity(2)?;
                let v = m.get(ops[1])?;
                let r = if mnemonic == "seqz" { v == 0 } else { v != 0 };
                m.set(ops[0], r as u32)?;
            }
            "lw" => {
                arity(2)?;
                let addr = m.address(ops[1])?;
                let v = *m
                    .memory
                    .get(&addr)
                    .ok_or_else(|| format!("load from unwritten slot {:#x}", addr))?;
                m.set(ops[0], v)?;
            }
            "sw" => {
                arity(2)?;
                let addr = m.address(ops[1])?;
                if addr >= STACK_TOP || addr < m.get("sp")? {
                    return Err(format!("store outside the frame at {:#x}", addr));
                }
                let v = m.get(ops[0])?;
                m.memory.insert(addr, v);
            }
            "ret" => {
                let sp = m.get("sp")?;
                if sp != STACK_TOP {
                    return Err(format!("sp not restored at ret: {:#x}", sp));
                }
                return Ok(Outcome {
                    a0: m.get("a0")? as i32,
                    written: m.written,
                    max_depth: m.max_depth,
                    steps,
                });
            }
            op => {
                arity(3)?;
                let a = m.get(ops[1])?;
                let b = m.get(ops[2])?;
                let v = alu(op, a, b).ok_or_else(|| format!("unknown instruction '{}'", line))?;
                m.set(ops[0], v)?;
            }
        }
    }
    Err("fell off the end of main".to_string())
}

/// Compile source with options and run it
pub fn run_source(source: &str, options: sysyc::CompileOptions) -> Result<Outcome, String> {
    let asm = sysyc::Compiler::new(options)
        .emit_asm(source)
        .map_err(|e| e.to_string())?;
    run_asm(&asm)
}

/// Numbers of every `%N = ...` definition in IR text, in order
pub fn defined_temps(ir: &str) -> Vec<u32> {
    ir.lines()
        .filter_map(|l| l.trim().strip_prefix('%'))
        .filter_map(|l| l.split_once(" = "))
        .filter_map(|(n, _)| n.parse().ok())
        .collect()
}
