//=====================================================
// File: vm/tests/expr_tests.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Expression evaluation driven through the machine
//=====================================================

use tracing_test::traced_test;

use super::Rig;
use crate::error::VmError;
use crate::fakes::FakeLightSet;
use crate::vm::codes::{JumpCondition, Operator, Register};
use crate::vm::instruction::{Instruction, Param};
use crate::vm::value::Value;

fn eval(code: Vec<Instruction>) -> Value {
    let mut rig = Rig::new(FakeLightSet::new());
    let mut program = code;
    program.push(Instruction::pop(Param::Register(Register::Result)));
    rig.run(program).expect("run");
    rig.machine.register(Register::Result)
}

#[test]
fn postfix_arithmetic() {
    let value = eval(vec![
        Instruction::pushq(12),
        Instruction::pushq(3),
        Instruction::op(Operator::Add),
        Instruction::pushq(4),
        Instruction::op(Operator::Mul),
    ]);
    assert_eq!(value, Value::Int(60));
}

#[test]
fn registers_and_variables_feed_the_stack() {
    let value = eval(vec![
        Instruction::set_reg(Register::Brightness, 50),
        Instruction::assign("boost", 1.5),
        Instruction::push(Param::Register(Register::Brightness)),
        Instruction::push(Param::var("boost")),
        Instruction::op(Operator::Mul),
    ]);
    assert_eq!(value, Value::Float(75.0));
}

#[test]
fn comparison_drives_a_conditional_jump() {
    let mut rig = Rig::new(FakeLightSet::new());
    rig.run(vec![
        Instruction::pushq(7),
        Instruction::pushq(2),
        Instruction::op(Operator::Mod),
        Instruction::pushq(1),
        Instruction::op(Operator::Eq),
        Instruction::pop(Param::Register(Register::Result)),
        Instruction::jump(JumpCondition::IfTrue, 2),
        Instruction::assign("parity", "even"),
        Instruction::jump(JumpCondition::IfFalse, 2),
        Instruction::assign("parity", "odd"),
    ])
    .expect("run");
    assert_eq!(rig.machine.variable("parity"), Ok(Value::Str("odd".into())));
}

#[test]
fn division_is_always_real() {
    let value = eval(vec![
        Instruction::pushq(7),
        Instruction::pushq(2),
        Instruction::op(Operator::Div),
    ]);
    assert_eq!(value, Value::Float(3.5));
}

#[test]
#[traced_test]
fn division_by_zero_is_logged_and_yields_zero() {
    let value = eval(vec![
        Instruction::pushq(1),
        Instruction::pushq(0),
        Instruction::op(Operator::Div),
    ]);
    assert_eq!(value, Value::Int(0));
    assert!(logs_contain("division by zero"));
}

#[test]
fn unary_minus_and_not() {
    let value = eval(vec![
        Instruction::pushq(5),
        Instruction::op(Operator::Usub),
        Instruction::pushq(-5),
        Instruction::op(Operator::Eq),
        Instruction::op(Operator::Not),
    ]);
    assert_eq!(value, Value::Bool(false));
}

#[test]
fn popping_an_empty_stack_fails() {
    let mut rig = Rig::new(FakeLightSet::new());
    let result = rig.run(vec![Instruction::op(Operator::Add)]);
    assert_eq!(result, Err(VmError::StackUnderflow));
}

#[test]
fn registers_reject_wrong_types() {
    let mut rig = Rig::new(FakeLightSet::new());
    let result = rig.run(vec![
        Instruction::pushq("bright"),
        Instruction::pop(Param::Register(Register::Hue)),
    ]);
    assert_eq!(
        result,
        Err(VmError::TypeMismatch {
            register: Register::Hue,
            found: "string".into(),
        })
    );
}

//=====================================================
// End of file
//=====================================================
