//=====================================================
// File: vm/codes.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Closed enumerations that make up the LumaScript instruction set
// Objective: Opcodes, registers, operators, addressing modes and unit modes
//=====================================================

use std::fmt;

use serde::{Deserialize, Serialize};

/// Every operation the machine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpCode {
    Breakpoint,
    Color,
    Constant,
    Disc,
    Discm,
    Dnext,
    Dnextm,
    End,
    EndLoop,
    GetColor,
    Jsr,
    Jump,
    Loop,
    Move,
    Moveq,
    Nop,
    Op,
    Out,
    Outq,
    Param,
    Pause,
    Pop,
    Power,
    Push,
    Pushq,
    Routine,
    Stop,
    TimePattern,
    Wait,
}

impl OpCode {
    pub fn name(self) -> &'static str {
        match self {
            OpCode::Breakpoint => "BREAKPOINT",
            OpCode::Color => "COLOR",
            OpCode::Constant => "CONSTANT",
            OpCode::Disc => "DISC",
            OpCode::Discm => "DISCM",
            OpCode::Dnext => "DNEXT",
            OpCode::Dnextm => "DNEXTM",
            OpCode::End => "END",
            OpCode::EndLoop => "END_LOOP",
            OpCode::GetColor => "GET_COLOR",
            OpCode::Jsr => "JSR",
            OpCode::Jump => "JUMP",
            OpCode::Loop => "LOOP",
            OpCode::Move => "MOVE",
            OpCode::Moveq => "MOVEQ",
            OpCode::Nop => "NOP",
            OpCode::Op => "OP",
            OpCode::Out => "OUT",
            OpCode::Outq => "OUTQ",
            OpCode::Param => "PARAM",
            OpCode::Pause => "PAUSE",
            OpCode::Pop => "POP",
            OpCode::Power => "POWER",
            OpCode::Push => "PUSH",
            OpCode::Pushq => "PUSHQ",
            OpCode::Routine => "ROUTINE",
            OpCode::Stop => "STOP",
            OpCode::TimePattern => "TIME_PATTERN",
            OpCode::Wait => "WAIT",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Slots of the register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Register {
    Brightness,
    Duration,
    FirstZone,
    Hue,
    LastZone,
    Kelvin,
    Name,
    Operand,
    Power,
    Result,
    Saturation,
    Time,
    UnitMode,
}

impl Register {
    pub const ALL: [Register; 13] = [
        Register::Brightness,
        Register::Duration,
        Register::FirstZone,
        Register::Hue,
        Register::LastZone,
        Register::Kelvin,
        Register::Name,
        Register::Operand,
        Register::Power,
        Register::Result,
        Register::Saturation,
        Register::Time,
        Register::UnitMode,
    ];

    /// Case-insensitive lookup used by tooling that reads register names.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        Self::ALL.into_iter().find(|reg| reg.name() == lower)
    }

    pub fn name(self) -> &'static str {
        match self {
            Register::Brightness => "brightness",
            Register::Duration => "duration",
            Register::FirstZone => "first_zone",
            Register::Hue => "hue",
            Register::LastZone => "last_zone",
            Register::Kelvin => "kelvin",
            Register::Name => "name",
            Register::Operand => "operand",
            Register::Power => "power",
            Register::Result => "result",
            Register::Saturation => "saturation",
            Register::Time => "time",
            Register::UnitMode => "unit_mode",
        }
    }

    pub fn is_color(self) -> bool {
        matches!(
            self,
            Register::Hue | Register::Saturation | Register::Brightness | Register::Kelvin
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JumpCondition {
    Always,
    IfFalse,
    IfTrue,
}

impl JumpCondition {
    pub fn taken(self, result: bool) -> bool {
        match self {
            JumpCondition::Always => true,
            JumpCondition::IfTrue => result,
            JumpCondition::IfFalse => !result,
        }
    }
}

/// Fields of the innermost loop frame that a program may address directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoopVar {
    Break,
    Counter,
    Current,
    ExitJmp,
    First,
    Incr,
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    Add,
    And,
    Div,
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
    Mod,
    Mul,
    Not,
    Noteq,
    Or,
    Pow,
    Sub,
    Uadd,
    Usub,
}

impl Operator {
    pub fn is_unary(self) -> bool {
        matches!(self, Operator::Not | Operator::Uadd | Operator::Usub)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add | Operator::Uadd => "+",
            Operator::And => "and",
            Operator::Div => "/",
            Operator::Eq => "==",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Mod => "%",
            Operator::Mul => "*",
            Operator::Not => "not",
            Operator::Noteq => "!=",
            Operator::Or => "or",
            Operator::Pow => "^",
            Operator::Sub | Operator::Usub => "-",
        }
    }
}

/// Addressing mode selecting which devices a dispatch targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operand {
    All,
    Light,
    Group,
    Location,
    MzLight,
    #[default]
    Null,
}

/// Used with `TIME_PATTERN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SetOp {
    Init,
    Union,
}

/// Numeric domain the color and time registers are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitMode {
    #[default]
    Logical,
    Raw,
    Rgb,
}

impl fmt::Display for UnitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            UnitMode::Logical => "logical",
            UnitMode::Raw => "raw",
            UnitMode::Rgb => "rgb",
        };
        f.write_str(text)
    }
}


//=====================================================
// End of file
//=====================================================
