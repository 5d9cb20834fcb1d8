//=====================================================
// File: error.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Error types shared by the LumaScript VM
// Objective: Separate fatal program faults from transient device faults
//=====================================================

use thiserror::Error;

use crate::vm::codes::{LoopVar, OpCode, Register};

/// Result type used across the LumaScript core.
pub type VmResult<T> = std::result::Result<T, VmError>;

/// Faults that end the current run. A successfully compiled program should
/// never produce one of these.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VmError {
    #[error("unresolved routine \"{0}\"")]
    UnresolvedRoutine(String),
    #[error("routine \"{0}\" defined more than once")]
    DuplicateRoutine(String),
    #[error("unbalanced loop at address {0}")]
    UnbalancedLoop(usize),
    #[error("unresolved variable \"{0}\"")]
    UnresolvedVariable(String),
    #[error("constant \"{0}\" cannot be reassigned")]
    ConstantReassigned(String),
    #[error("frame mismatch: expected {expected} frame at address {address}")]
    FrameMismatch {
        expected: &'static str,
        address: usize,
    },
    #[error("call stack exceeded {0} frames")]
    StackOverflow(usize),
    #[error("expression stack underflow")]
    StackUnderflow,
    #[error("register {register:?} cannot hold {found}")]
    TypeMismatch { register: Register, found: String },
    #[error("{0} is not a valid destination")]
    InvalidDestination(String),
    #[error("loop variable {0:?} referenced outside of a loop")]
    NoActiveLoop(LoopVar),
    #[error("malformed {opcode:?} instruction at address {address}: {detail}")]
    MalformedInstruction {
        opcode: OpCode,
        address: usize,
        detail: String,
    },
}

/// Faults reported by a device-addressing collaborator. The machine logs
/// these and carries on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("device \"{0}\" did not respond")]
    Timeout(String),
    #[error("device \"{name}\" rejected the request: {reason}")]
    Rejected { name: String, reason: String },
    #[error("discovery failed: {0}")]
    Discovery(String),
}

//=====================================================
// End of file
//=====================================================
