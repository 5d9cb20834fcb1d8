//=====================================================
// File: vm/loader.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Link a raw instruction stream into a runnable program
// Objective: Resolve routine entry points, pair loops with their exits and
//            keep relative jumps pointing at the same instructions
//=====================================================

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bytecode::peephole;
use crate::error::{VmError, VmResult};

use super::codes::OpCode;
use super::instruction::{Instruction, Param};
use super::symbol::{Symbol, SymbolTable};
use super::value::Value;

/// Compiler output as stored on disk: the instruction stream with `ROUTINE`
/// markers still in place, plus the symbols the compiler classified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawProgram {
    pub code: Vec<Instruction>,
    #[serde(default)]
    pub symbols: Vec<Symbol>,
}

impl RawProgram {
    pub fn symbol_table(&self) -> SymbolTable {
        self.symbols
            .iter()
            .map(|symbol| (symbol.name.clone(), symbol.clone()))
            .collect()
    }
}

/// A linked program. Immutable once produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub code: Vec<Instruction>,
    pub routines: HashMap<String, usize>,
    /// Bound into the global scope at the start of every run, in order.
    pub globals: Vec<(String, Value)>,
}

impl Program {
    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn entry(&self, routine: &str) -> Option<usize> {
        self.routines.get(routine).copied()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut labels: Vec<(&usize, &String)> =
            self.routines.iter().map(|(name, address)| (address, name)).collect();
        labels.sort();
        for (address, inst) in self.code.iter().enumerate() {
            for (_, name) in labels.iter().filter(|(entry, _)| **entry == address) {
                writeln!(f, "{name}:")?;
            }
            writeln!(f, "  {address:04}: {inst}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Loader {
    optimize: bool,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the peephole pass before loops are paired.
    pub fn with_peephole(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    pub fn load(&self, raw: Vec<Instruction>, symbols: &SymbolTable) -> VmResult<Program> {
        let (mut code, mut routines) = strip_routines(raw)?;
        validate_calls(&code, &routines)?;

        if self.optimize {
            let mut entries: Vec<usize> = routines.values().copied().collect();
            entries.sort_unstable();
            let before = code.len();
            let map = peephole::optimize(&mut code, &entries);
            for address in routines.values_mut() {
                *address = map[*address];
            }
            debug!(
                target: "lumascript::loader",
                "peephole removed {} instruction(s)",
                before - code.len()
            );
        }

        pair_loops(&mut code)?;

        let mut globals: Vec<(String, Value)> = symbols
            .values()
            .filter(|symbol| symbol.is_global_binding())
            .map(|symbol| (symbol.name.clone(), symbol.value.clone()))
            .collect();
        globals.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(Program {
            code,
            routines,
            globals,
        })
    }

    pub fn load_raw(&self, raw: RawProgram) -> VmResult<Program> {
        let symbols = raw.symbol_table();
        self.load(raw.code, &symbols)
    }
}

/// Links without optimizing.
pub fn load(raw: Vec<Instruction>, symbols: &SymbolTable) -> VmResult<Program> {
    Loader::new().load(raw, symbols)
}

/// Removes `ROUTINE` markers. Each routine's entry is the instruction that
/// followed its marker.
fn strip_routines(raw: Vec<Instruction>) -> VmResult<(Vec<Instruction>, HashMap<String, usize>)> {
    let mut routines = HashMap::new();
    let mut keep = Vec::with_capacity(raw.len());
    let mut kept = 0;
    for (address, inst) in raw.iter().enumerate() {
        if inst.opcode != OpCode::Routine {
            keep.push(true);
            kept += 1;
            continue;
        }
        keep.push(false);
        let Param::Routine(name) = &inst.param0 else {
            return Err(malformed(inst, address, "expected a routine name"));
        };
        if routines.insert(name.clone(), kept).is_some() {
            return Err(VmError::DuplicateRoutine(name.clone()));
        }
    }

    for (address, inst) in raw.iter().enumerate() {
        if let (OpCode::Jump, Param::Offset(offset)) = (inst.opcode, &inst.param1) {
            let in_bounds = peephole::jump_target(address, *offset).is_some_and(|target| target <= raw.len());
            if !in_bounds {
                return Err(malformed(inst, address, "jump leaves the program"));
            }
        }
    }

    let map = peephole::address_map(&keep);
    let code = raw
        .into_iter()
        .enumerate()
        .filter(|(address, _)| keep[*address])
        .map(|(address, inst)| peephole::relink_jump(inst, address, &map))
        .collect();
    Ok((code, routines))
}

fn validate_calls(code: &[Instruction], routines: &HashMap<String, usize>) -> VmResult<()> {
    for (address, inst) in code.iter().enumerate() {
        if inst.opcode != OpCode::Jsr {
            continue;
        }
        match &inst.param0 {
            Param::Routine(name) if routines.contains_key(name) => {}
            Param::Routine(name) => return Err(VmError::UnresolvedRoutine(name.clone())),
            _ => return Err(malformed(inst, address, "expected a routine name")),
        }
    }
    Ok(())
}

/// Fills each `LOOP` with the address of its `END_LOOP`.
fn pair_loops(code: &mut [Instruction]) -> VmResult<()> {
    let mut open = Vec::new();
    for address in 0..code.len() {
        match code[address].opcode {
            OpCode::Loop => open.push(address),
            OpCode::EndLoop => {
                let start = open.pop().ok_or(VmError::UnbalancedLoop(address))?;
                code[start].param1 = Param::Address(address);
            }
            _ => {}
        }
    }
    match open.pop() {
        Some(start) => Err(VmError::UnbalancedLoop(start)),
        None => Ok(()),
    }
}

fn malformed(inst: &Instruction, address: usize, detail: &str) -> VmError {
    VmError::MalformedInstruction {
        opcode: inst.opcode,
        address,
        detail: detail.to_string(),
    }
}


//=====================================================
// End of file
//=====================================================
