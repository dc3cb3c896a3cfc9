//! Reference interpreter for structured IR

use super::{FunctionData, Program, ValueId, ValueKind};
use crate::{Error, Result};

/// Run function `name` and return its result
///
/// Arithmetic wraps at 32 bits, division truncates toward zero and shift
/// amounts use their low five bits. Division or remainder by zero is an error.
pub fn evaluate(program: &Program, name: &str) -> Result<i32> {
    let func = program
        .func(name)
        .ok_or_else(|| Error::EvalError(format!("no function named '@{}'", name)))?;
    let entry = func
        .blocks
        .first()
        .ok_or_else(|| Error::EvalError(format!("'@{}' is only declared", name)))?;

    let mut results: Vec<Option<i32>> = vec![None; func.values.len()];
    for &inst in &entry.insts {
        match kind_of(func, inst)? {
            ValueKind::Integer(_) => {}
            ValueKind::Binary { op, lhs, rhs } => {
                let l = operand(func, &results, lhs)?;
                let r = operand(func, &results, rhs)?;
                let value = op.apply(l, r).ok_or(Error::DivisionByZero)?;
                results[inst.index()] = Some(value);
            }
            ValueKind::Return(Some(v)) => return operand(func, &results, v),
            ValueKind::Return(None) => {
                return Err(Error::EvalError(format!("'@{}' returns no value", name)))
            }
        }
    }
    Err(Error::EvalError(format!(
        "block '%{}' of '@{}' ends without 'ret'",
        entry.name, name
    )))
}

fn kind_of(func: &FunctionData, id: ValueId) -> Result<ValueKind> {
    func.value(id)
        .map(|v| v.kind)
        .ok_or_else(|| Error::EvalError(format!("dangling value {}", id)))
}

fn operand(func: &FunctionData, results: &[Option<i32>], id: ValueId) -> Result<i32> {
    match kind_of(func, id)? {
        ValueKind::Integer(n) => Ok(n),
        _ => results
            .get(id.index())
            .copied()
            .flatten()
            .ok_or_else(|| Error::EvalError(format!("value {} used before definition", id))),
    }
}
