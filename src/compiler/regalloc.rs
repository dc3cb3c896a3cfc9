//! Register and stack-slot allocation for the RISC-V backend
//!
//! Every value with a result owns one 4-byte stack slot, handed out in
//! definition order. Where the value lives at any moment is tracked in a
//! `ValueId -> Location` map; the scratch pool is a busy/free table walked in
//! fixed priority order.
//!
//! Two policies share the same tables:
//!
//! - [`AllocPolicy::SpillAll`]: each result is stored to its slot as soon as it
//!   is computed and reloaded at every use. Registers never outlive the
//!   instruction that took them.
//! - [`AllocPolicy::LiveRange`]: a result stays in its register until its last
//!   use. When the pool runs dry the value with the most distant last use is
//!   stored to its slot and reloaded later.

use super::raw::{FunctionData, ValueId, ValueKind};
use super::riscv_codegen::RiscvReg;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::trace;

/// Bytes reserved per spilled value
pub const SLOT_SIZE: i32 = 4;

/// Scratch registers in allocation priority order
pub const SCRATCH_POOL: [RiscvReg; 7] = [
    RiscvReg::T0,
    RiscvReg::T1,
    RiscvReg::T2,
    RiscvReg::T3,
    RiscvReg::T4,
    RiscvReg::T5,
    RiscvReg::T6,
];

/// Smallest usable pool: one register per binary operand
pub const MIN_SCRATCH: usize = 2;

/// Where results are kept between definition and use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllocPolicy {
    /// Store every result, reload at each use
    #[default]
    SpillAll,
    /// Keep results in registers until their last use
    LiveRange,
}

/// Current home of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Held in a scratch register
    Reg(RiscvReg),
    /// Stored at `offset(sp)`
    Stack(i32),
}

/// Per-function stack frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackFrame {
    /// Total bytes reserved by the prologue
    size: i32,
    /// Next free slot offset
    top: i32,
}

impl StackFrame {
    /// Reserve one slot for every instruction that produces a result
    pub fn compute(func: &FunctionData) -> Self {
        let results = func
            .insts()
            .filter(|&id| func.value(id).is_some_and(|v| v.has_result()))
            .count() as i32;
        Self {
            size: results * SLOT_SIZE,
            top: 0,
        }
    }

    /// Bytes the prologue subtracts from `sp`
    pub fn size(&self) -> i32 {
        self.size
    }

    /// Next slot offset that would be handed out
    pub fn top(&self) -> i32 {
        self.top
    }

    /// Hand out the next slot
    pub fn alloc_slot(&mut self) -> Result<i32> {
        if self.top + SLOT_SIZE > self.size {
            return Err(Error::codegen(format!(
                "stack frame of {} bytes exhausted",
                self.size
            )));
        }
        let offset = self.top;
        self.top += SLOT_SIZE;
        Ok(offset)
    }
}

/// Store the caller must emit before reusing `reg`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eviction {
    /// Value being moved out
    pub value: ValueId,
    /// Register it occupied
    pub reg: RiscvReg,
    /// Slot it goes to
    pub offset: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Occupant {
    /// Short-lived register such as a loaded literal or a fresh result
    Scratch,
    /// Holds the value's current copy
    Value(ValueId),
}

/// Register allocator for one function
pub struct RegisterAllocator {
    policy: AllocPolicy,
    /// Usable registers, priority order
    pool: Vec<RiscvReg>,
    /// Busy table, parallel to `pool`
    busy: Vec<Option<Occupant>>,
    locations: HashMap<ValueId, Location>,
    slots: HashMap<ValueId, i32>,
    /// Instruction index of each value's last use
    last_use: HashMap<ValueId, usize>,
    frame: StackFrame,
}

impl RegisterAllocator {
    /// Set up allocation tables for `func`
    pub fn new(func: &FunctionData, policy: AllocPolicy, scratch_registers: usize) -> Result<Self> {
        if !(MIN_SCRATCH..=SCRATCH_POOL.len()).contains(&scratch_registers) {
            return Err(Error::InvalidOptions(format!(
                "scratch_registers must be between {} and {}, got {}",
                MIN_SCRATCH,
                SCRATCH_POOL.len(),
                scratch_registers
            )));
        }

        let mut last_use = HashMap::new();
        for (index, id) in func.insts().enumerate() {
            let operands = match func.value(id).map(|v| v.kind) {
                Some(ValueKind::Binary { lhs, rhs, .. }) => vec![lhs, rhs],
                Some(ValueKind::Return(Some(v))) => vec![v],
                _ => Vec::new(),
            };
            for operand in operands {
                if func.value(operand).is_some_and(|v| v.has_result()) {
                    last_use.insert(operand, index);
                }
            }
        }

        let frame = StackFrame::compute(func);
        trace!(
            "allocator for '{}': policy {:?}, {} registers, frame {} bytes",
            func.name,
            policy,
            scratch_registers,
            frame.size()
        );

        Ok(Self {
            policy,
            pool: SCRATCH_POOL[..scratch_registers].to_vec(),
            busy: vec![None; scratch_registers],
            locations: HashMap::new(),
            slots: HashMap::new(),
            last_use,
            frame,
        })
    }

    /// Active policy
    pub fn policy(&self) -> AllocPolicy {
        self.policy
    }

    /// Stack frame of the function
    pub fn frame(&self) -> &StackFrame {
        &self.frame
    }

    /// Current home of a value
    pub fn location(&self, id: ValueId) -> Option<Location> {
        self.locations.get(&id).copied()
    }

    /// Slot assigned to a value, once defined
    pub fn slot(&self, id: ValueId) -> Option<i32> {
        self.slots.get(&id).copied()
    }

    /// Number of registers currently busy
    pub fn busy_count(&self) -> usize {
        self.busy.iter().filter(|o| o.is_some()).count()
    }

    /// Take a register, for a reloaded value or as plain scratch
    ///
    /// Registers in `pinned` are never chosen as eviction victims. When an
    /// eviction is returned the caller must store the victim before writing
    /// the register.
    pub fn acquire(
        &mut self,
        reload: Option<ValueId>,
        pinned: &[RiscvReg],
    ) -> Result<(RiscvReg, Option<Eviction>)> {
        let occupant = match reload {
            Some(id) => Occupant::Value(id),
            None => Occupant::Scratch,
        };

        if let Some(index) = self.busy.iter().position(|o| o.is_none()) {
            return Ok((self.occupy(index, occupant), None));
        }

        let victim = self
            .busy
            .iter()
            .enumerate()
            .filter(|(i, _)| !pinned.contains(&self.pool[*i]))
            .filter_map(|(i, o)| match o {
                Some(Occupant::Value(v)) => Some((i, *v)),
                _ => None,
            })
            .max_by_key(|(_, v)| self.last_use.get(v).copied().unwrap_or(0));

        let (index, value) = victim
            .ok_or_else(|| Error::codegen("no scratch register available for eviction"))?;
        let offset = self
            .slots
            .get(&value)
            .copied()
            .ok_or_else(|| Error::codegen(format!("value {} has no stack slot", value)))?;
        let reg = self.pool[index];
        self.locations.insert(value, Location::Stack(offset));
        trace!("evict {} from {} to {}(sp)", value, reg, offset);

        Ok((
            self.occupy(index, occupant),
            Some(Eviction { value, reg, offset }),
        ))
    }

    /// Give back operand registers once instruction `index` has read them
    ///
    /// Values still needed later keep their register under `LiveRange`.
    pub fn release(&mut self, index: usize, regs: &[RiscvReg]) {
        for &reg in regs {
            let Some(i) = self.pool.iter().position(|&r| r == reg) else {
                continue;
            };
            match self.busy[i] {
                Some(Occupant::Scratch) => self.busy[i] = None,
                Some(Occupant::Value(v)) => {
                    let dead = self.last_use.get(&v).map_or(true, |&last| last <= index);
                    if self.policy == AllocPolicy::SpillAll {
                        self.busy[i] = None;
                        if let Some(&offset) = self.slots.get(&v) {
                            self.locations.insert(v, Location::Stack(offset));
                        }
                    } else if dead {
                        self.busy[i] = None;
                        self.locations.remove(&v);
                    }
                }
                None => {}
            }
        }
    }

    /// Record that `reg` now holds the freshly computed result `id`
    ///
    /// Returns the slot offset when the result must be stored right away.
    pub fn define(&mut self, id: ValueId, reg: RiscvReg) -> Result<Option<i32>> {
        let offset = self.frame.alloc_slot()?;
        self.slots.insert(id, offset);

        let index = self
            .pool
            .iter()
            .position(|&r| r == reg)
            .ok_or_else(|| Error::codegen(format!("{} is not a scratch register", reg)))?;

        let keep = self.policy == AllocPolicy::LiveRange && self.last_use.contains_key(&id);
        if keep {
            self.busy[index] = Some(Occupant::Value(id));
            self.locations.insert(id, Location::Reg(reg));
            Ok(None)
        } else {
            self.busy[index] = None;
            self.locations.insert(id, Location::Stack(offset));
            Ok(Some(offset))
        }
    }

    fn occupy(&mut self, index: usize, occupant: Occupant) -> RiscvReg {
        let reg = self.pool[index];
        self.busy[index] = Some(occupant);
        if let Occupant::Value(id) = occupant {
            self.locations.insert(id, Location::Reg(reg));
        }
        reg
    }
}
