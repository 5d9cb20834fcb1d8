//=====================================================
// File: vm/instruction.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: The three-field instruction record and its parameter forms
//=====================================================

use std::fmt;

use serde::{Deserialize, Serialize};

use super::codes::{JumpCondition, LoopVar, OpCode, Operand, Operator, Register, SetOp};
use super::value::Value;

/// Where a value is read from at run time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Source {
    Literal(Value),
    Register(Register),
    Var(String),
    LoopVar(LoopVar),
}

impl From<Value> for Source {
    fn from(value: Value) -> Self {
        Source::Literal(value)
    }
}

impl From<Register> for Source {
    fn from(reg: Register) -> Self {
        Source::Register(reg)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Literal(Value::Str(text)) => write!(f, "\"{text}\""),
            Source::Literal(value) => write!(f, "{value}"),
            Source::Register(reg) => write!(f, "%{}", reg.name()),
            Source::Var(name) => f.write_str(name),
            Source::LoopVar(var) => write!(f, "loop.{var:?}"),
        }
    }
}

/// Operand of a `LOOP` instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LoopSpec {
    /// Inclusive range; `var`, when present, is bound to the current value on
    /// every iteration.
    Counted {
        first: Source,
        last: Source,
        increment: Source,
        var: Option<String>,
    },
    /// Runs until the break flag is raised.
    Infinite,
}

/// Group or location whose members a `DISCM`/`DNEXTM` pass walks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryScope {
    pub kind: Operand,
    pub name: Source,
}

/// Opcode-specific instruction parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Param {
    #[default]
    None,
    Value(Value),
    Register(Register),
    Var(String),
    LoopVar(LoopVar),
    Condition(JumpCondition),
    Offset(i64),
    Operator(Operator),
    SetOp(SetOp),
    Operand(Operand),
    Routine(String),
    Loop(LoopSpec),
    Scope(DiscoveryScope),
    Address(usize),
}

impl Param {
    /// The parameter viewed as a readable value source, if it is one.
    pub fn as_source(&self) -> Option<Source> {
        match self {
            Param::Value(value) => Some(Source::Literal(value.clone())),
            Param::Register(reg) => Some(Source::Register(*reg)),
            Param::Var(name) => Some(Source::Var(name.clone())),
            Param::LoopVar(var) => Some(Source::LoopVar(*var)),
            _ => None,
        }
    }

    pub fn var(name: impl Into<String>) -> Self {
        Param::Var(name.into())
    }
}

impl From<Register> for Param {
    fn from(reg: Register) -> Self {
        Param::Register(reg)
    }
}

impl From<LoopVar> for Param {
    fn from(var: LoopVar) -> Self {
        Param::LoopVar(var)
    }
}

impl From<Value> for Param {
    fn from(value: Value) -> Self {
        Param::Value(value)
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::None => Ok(()),
            Param::Condition(condition) => write!(f, "{condition:?}"),
            Param::Offset(offset) => write!(f, "{offset:+}"),
            Param::Operator(operator) => f.write_str(operator.symbol()),
            Param::SetOp(op) => write!(f, "{op:?}"),
            Param::Operand(operand) => write!(f, "{operand:?}"),
            Param::Routine(name) => write!(f, "&{name}"),
            Param::Loop(LoopSpec::Infinite) => f.write_str("forever"),
            Param::Loop(LoopSpec::Counted {
                first,
                last,
                increment,
                var,
            }) => {
                write!(f, "{first}..={last} by {increment}")?;
                if let Some(var) = var {
                    write!(f, " as {var}")?;
                }
                Ok(())
            }
            Param::Scope(scope) => write!(f, "{:?} {}", scope.kind, scope.name),
            Param::Address(address) => write!(f, "@{address:04}"),
            other => match other.as_source() {
                Some(source) => write!(f, "{source}"),
                None => Ok(()),
            },
        }
    }
}

/// One machine instruction. Meaning of the parameters depends on the opcode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: OpCode,
    #[serde(default)]
    pub param0: Param,
    #[serde(default)]
    pub param1: Param,
}

impl Instruction {
    pub fn new(opcode: OpCode, param0: Param, param1: Param) -> Self {
        Self {
            opcode,
            param0,
            param1,
        }
    }

    pub fn bare(opcode: OpCode) -> Self {
        Self::new(opcode, Param::None, Param::None)
    }

    pub fn unary(opcode: OpCode, param0: Param) -> Self {
        Self::new(opcode, param0, Param::None)
    }

    /// `MOVEQ value -> register`.
    pub fn set_reg(reg: Register, value: impl Into<Value>) -> Self {
        Self::new(OpCode::Moveq, Param::Value(value.into()), Param::Register(reg))
    }

    /// `MOVEQ value -> variable`.
    pub fn assign(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(OpCode::Moveq, Param::Value(value.into()), Param::var(name))
    }

    pub fn mov(source: Param, destination: Param) -> Self {
        Self::new(OpCode::Move, source, destination)
    }

    pub fn jump(condition: JumpCondition, offset: i64) -> Self {
        Self::new(OpCode::Jump, Param::Condition(condition), Param::Offset(offset))
    }

    pub fn push(source: Param) -> Self {
        Self::unary(OpCode::Push, source)
    }

    pub fn pushq(value: impl Into<Value>) -> Self {
        Self::unary(OpCode::Pushq, Param::Value(value.into()))
    }

    pub fn pop(destination: Param) -> Self {
        Self::unary(OpCode::Pop, destination)
    }

    pub fn op(operator: Operator) -> Self {
        Self::unary(OpCode::Op, Param::Operator(operator))
    }

    pub fn routine(name: impl Into<String>) -> Self {
        Self::unary(OpCode::Routine, Param::Routine(name.into()))
    }

    pub fn jsr(name: impl Into<String>) -> Self {
        Self::unary(OpCode::Jsr, Param::Routine(name.into()))
    }

    pub fn param(name: impl Into<String>, value: Param) -> Self {
        Self::new(OpCode::Param, Param::var(name), value)
    }

    pub fn counted_loop(
        first: impl Into<Source>,
        last: impl Into<Source>,
        increment: impl Into<Source>,
        var: Option<&str>,
    ) -> Self {
        Self::unary(
            OpCode::Loop,
            Param::Loop(LoopSpec::Counted {
                first: first.into(),
                last: last.into(),
                increment: increment.into(),
                var: var.map(str::to_string),
            }),
        )
    }

    /// True for `MOVEQ` instructions that write a register.
    pub fn register_store(&self) -> Option<(Register, &Value)> {
        match (self.opcode, &self.param0, &self.param1) {
            (OpCode::Moveq, Param::Value(value), Param::Register(reg)) => Some((*reg, value)),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<12}", self.opcode.name())?;
        match (&self.param0, &self.param1) {
            (Param::None, Param::None) => Ok(()),
            (param0, Param::None) => write!(f, " {param0}"),
            (param0, param1) => write!(f, " {param0}, {param1}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_format() {
        let inst = Instruction::set_reg(Register::Hue, 120);
        assert_eq!(inst.to_string().trim_end(), "MOVEQ        120, %hue");
        let jump = Instruction::jump(JumpCondition::IfFalse, -4);
        assert_eq!(jump.to_string(), "JUMP         IfFalse, -4");
    }

    #[test]
    fn register_store_detection() {
        let inst = Instruction::set_reg(Register::Kelvin, 2700);
        assert_eq!(inst.register_store(), Some((Register::Kelvin, &Value::Int(2700))));
        assert_eq!(Instruction::assign("x", 1).register_store(), None);
    }
}

//=====================================================
// End of file
//=====================================================
