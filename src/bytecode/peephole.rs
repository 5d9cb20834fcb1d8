//=====================================================
// File: bytecode/peephole.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Drop register stores that cannot change anything
// Objective: Track the last literal stored into each register along straight
//            line code and remove repeats, then re-link relative jumps
//=====================================================

use std::collections::{HashMap, HashSet};
use std::mem;

use crate::vm::codes::{OpCode, Register};
use crate::vm::instruction::{Instruction, Param};
use crate::vm::value::Value;

/// Optimizes `code` in place. `entries` are addresses reached from outside
/// the straight-line flow (routine entry points). Returns a table mapping
/// every old address, plus one past the end, to its new address; a removed
/// instruction maps to the next kept one.
pub fn optimize(code: &mut Vec<Instruction>, entries: &[usize]) -> Vec<usize> {
    let targets = flow_targets(code, entries);
    let mut cache: HashMap<Register, Value> = HashMap::new();
    let mut keep = Vec::with_capacity(code.len());

    for (address, inst) in code.iter().enumerate() {
        if targets.contains(&address) {
            cache.clear();
        }
        keep.push(!redundant_store(&mut cache, inst));
        invalidate(&mut cache, inst);
    }

    let map = address_map(&keep);
    let old = mem::take(code);
    *code = old
        .into_iter()
        .enumerate()
        .filter(|(address, _)| keep[*address])
        .map(|(address, inst)| relink_jump(inst, address, &map))
        .collect();
    map
}

/// Builds the old→new table for a keep mask. The table has one extra entry
/// for the address just past the end.
pub fn address_map(keep: &[bool]) -> Vec<usize> {
    let mut map = Vec::with_capacity(keep.len() + 1);
    let mut next = 0;
    for kept in keep {
        map.push(next);
        if *kept {
            next += 1;
        }
    }
    map.push(next);
    map
}

/// Rewrites a relative jump at `address` so it lands where it did before
/// instructions were removed. Other instructions pass through unchanged.
pub fn relink_jump(mut inst: Instruction, address: usize, map: &[usize]) -> Instruction {
    if inst.opcode != OpCode::Jump {
        return inst;
    }
    if let Param::Offset(offset) = inst.param1 {
        if let Some(target) = jump_target(address, offset) {
            if let (Some(from), Some(to)) = (map.get(address), map.get(target)) {
                inst.param1 = Param::Offset(*to as i64 - *from as i64);
            }
        }
    }
    inst
}

pub fn jump_target(address: usize, offset: i64) -> Option<usize> {
    usize::try_from(address as i64 + offset).ok()
}

fn flow_targets(code: &[Instruction], entries: &[usize]) -> HashSet<usize> {
    let mut targets: HashSet<usize> = entries.iter().copied().collect();
    for (address, inst) in code.iter().enumerate() {
        match (inst.opcode, &inst.param1) {
            (OpCode::Jump, Param::Offset(offset)) => {
                if let Some(target) = jump_target(address, *offset) {
                    targets.insert(target);
                }
            }
            (OpCode::Loop, _) | (OpCode::EndLoop, _) | (OpCode::Jsr, _) => {
                targets.insert(address + 1);
            }
            _ => {}
        }
    }
    targets
}

fn redundant_store(cache: &mut HashMap<Register, Value>, inst: &Instruction) -> bool {
    let Some((reg, value)) = inst.register_store() else {
        return false;
    };
    if reg == Register::UnitMode {
        return false;
    }
    if cache.get(&reg).is_some_and(|cached| same_literal(cached, value)) {
        return true;
    }
    cache.insert(reg, value.clone());
    false
}

/// Equal and of the same kind, so `1` and `true` are not merged.
fn same_literal(a: &Value, b: &Value) -> bool {
    mem::discriminant(a) == mem::discriminant(b) && a == b
}

fn invalidate(cache: &mut HashMap<Register, Value>, inst: &Instruction) {
    match inst.opcode {
        OpCode::Moveq | OpCode::Move | OpCode::Pop => match destination(inst) {
            Param::Register(Register::UnitMode) => cache.clear(),
            Param::Register(reg) if inst.register_store().is_none() => {
                cache.remove(reg);
            }
            _ => {}
        },
        OpCode::TimePattern => {
            cache.remove(&Register::Time);
        }
        OpCode::GetColor
        | OpCode::Disc
        | OpCode::Discm
        | OpCode::Dnext
        | OpCode::Dnextm
        | OpCode::Jsr
        | OpCode::End
        | OpCode::Jump
        | OpCode::Loop
        | OpCode::EndLoop
        | OpCode::Routine => cache.clear(),
        OpCode::Breakpoint
        | OpCode::Color
        | OpCode::Constant
        | OpCode::Nop
        | OpCode::Op
        | OpCode::Out
        | OpCode::Outq
        | OpCode::Param
        | OpCode::Pause
        | OpCode::Power
        | OpCode::Push
        | OpCode::Pushq
        | OpCode::Stop
        | OpCode::Wait => {}
    }
}

/// `POP` names its destination in the first parameter, the moves in the
/// second.
fn destination(inst: &Instruction) -> &Param {
    match inst.opcode {
        OpCode::Pop => &inst.param0,
        _ => &inst.param1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::codes::JumpCondition;

    #[test]
    fn address_map_points_removed_slots_forward() {
        assert_eq!(address_map(&[true, false, true, false]), vec![0, 1, 1, 2, 2]);
    }

    #[test]
    fn backward_jump_is_relinked() {
        let mut code = vec![
            Instruction::set_reg(Register::Hue, 10),
            Instruction::bare(OpCode::Color),
            Instruction::set_reg(Register::Hue, 10),
            Instruction::bare(OpCode::Color),
            Instruction::jump(JumpCondition::Always, -4),
        ];
        optimize(&mut code, &[]);
        // Address 0 is a jump target, so only the store at 2 goes.
        assert_eq!(code.len(), 4);
        assert_eq!(code[3].param1, Param::Offset(-3));
    }

    #[test]
    fn results_of_different_kinds_are_not_merged() {
        let mut code = vec![
            Instruction::set_reg(Register::Result, 1),
            Instruction::set_reg(Register::Result, true),
        ];
        optimize(&mut code, &[]);
        assert_eq!(code.len(), 2);
    }
}

//=====================================================
// End of file
//=====================================================
