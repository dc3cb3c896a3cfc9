//! Debug utilities for the backend
//!
//! Text dumps of value arenas and register allocation decisions. The code
//! generator feeds them to `trace!` so they show up with `RUST_LOG=trace`
//! style subscribers.

use super::raw::{FunctionData, ValueId, ValueKind};
use super::riscv_codegen::RiscvReg;
use std::fmt::Write;

/// Render every arena entry of a function, one per line
pub fn dump_arena(func: &FunctionData) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "@{} ({} values)", func.name, func.values.len());
    for index in 0..func.values.len() {
        let id = ValueId(index as u32);
        let block = func
            .blocks
            .iter()
            .find(|b| b.insts.contains(&id))
            .map(|b| format!("%{}", b.name))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(out, "  {:>6}  {:<8} {}", id.to_string(), block, format_value(func, id));
    }
    out
}

/// Format a single arena entry
pub fn format_value(func: &FunctionData, id: ValueId) -> String {
    let Some(data) = func.value(id) else {
        return format!("<dangling {}>", id);
    };
    let named = |s: String| match &data.name {
        Some(name) => format!("{}  ; {}", s, name),
        None => s,
    };
    match data.kind {
        ValueKind::Integer(n) => named(format!("integer {}", n)),
        ValueKind::Binary { op, lhs, rhs } => named(format!("{} {}, {}", op, lhs, rhs)),
        ValueKind::Return(Some(v)) => named(format!("ret {}", v)),
        ValueKind::Return(None) => named("ret".to_string()),
    }
}

/// Track register allocation decisions
#[derive(Debug, Default)]
pub struct RegAllocTrace {
    /// Value -> register assignments with reason
    pub allocations: Vec<(ValueId, RiscvReg, &'static str)>,
    /// Values stored to the stack with their slot offset
    pub spills: Vec<(ValueId, i32)>,
    /// Values reloaded from a slot into a register
    pub reloads: Vec<(ValueId, i32, RiscvReg)>,
}

impl RegAllocTrace {
    /// Create a new register allocation trace
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value-to-register assignment
    pub fn record_alloc(&mut self, value: ValueId, reg: RiscvReg, reason: &'static str) {
        self.allocations.push((value, reg, reason));
    }

    /// Record a store to a stack slot
    pub fn record_spill(&mut self, value: ValueId, offset: i32) {
        self.spills.push((value, offset));
    }

    /// Record a reload from a stack slot
    pub fn record_reload(&mut self, value: ValueId, offset: i32, into: RiscvReg) {
        self.reloads.push((value, offset, into));
    }

    /// Formatted trace
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "allocations:");
        for (value, reg, reason) in &self.allocations {
            let _ = writeln!(out, "  {} -> {} ({})", value, reg, reason);
        }
        let _ = writeln!(out, "spills:");
        for (value, offset) in &self.spills {
            let _ = writeln!(out, "  {} -> {}(sp)", value, offset);
        }
        let _ = writeln!(out, "reloads:");
        for (value, offset, into) in &self.reloads {
            let _ = writeln!(out, "  {} <- {}(sp) into {}", value, offset, into);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::raw::parse;

    #[test]
    fn test_dump_arena_marks_block_members() {
        let program = parse("fun @main(): i32 {\n%entry:\n  %0 = add 1, 2\n  ret %0\n}\n").unwrap();
        let dump = dump_arena(&program.funcs[0]);
        assert!(dump.starts_with("@main (4 values)\n"));
        assert!(dump.contains("v0  -        integer 1"));
        assert!(dump.contains("v2  %entry   add v0, v1  ; %0"));
        assert!(dump.contains("v3  %entry   ret v2"));
    }

    #[test]
    fn test_trace_render() {
        let mut trace = RegAllocTrace::new();
        trace.record_alloc(ValueId(2), RiscvReg::T0, "result");
        trace.record_spill(ValueId(2), 0);
        trace.record_reload(ValueId(2), 0, RiscvReg::T1);
        let text = trace.render();
        assert!(text.contains("  v2 -> t0 (result)\n"));
        assert!(text.contains("  v2 -> 0(sp)\n"));
        assert!(text.contains("  v2 <- 0(sp) into t1\n"));
    }
}
