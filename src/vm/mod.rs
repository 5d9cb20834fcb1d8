//=====================================================
// File: vm/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: LumaScript virtual machine
// Objective: Instruction set, operand values, linker and the executing
//            machine with its register file and stacks
//=====================================================

pub mod call_stack;
pub mod codes;
pub mod discover;
pub mod instruction;
pub mod loader;
pub mod machine;
pub mod registers;
pub mod symbol;
pub mod value;
pub mod vm_math;

pub use codes::{JumpCondition, LoopVar, OpCode, Operand, Operator, Register, SetOp, UnitMode};
pub use instruction::{DiscoveryScope, Instruction, LoopSpec, Param, Source};
pub use loader::{Loader, Program, RawProgram};
pub use machine::{Machine, StopHandle};
pub use symbol::{Symbol, SymbolKind, SymbolTable};
pub use value::Value;

#[cfg(test)]
mod tests;

//=====================================================
// End of file
//=====================================================
