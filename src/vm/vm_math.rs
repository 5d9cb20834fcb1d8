//=====================================================
// File: vm/vm_math.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Postfix expression evaluation for the LumaScript machine
// Objective: Operand stack plus unary and binary operators with integer
//            preservation, float promotion and non-fatal arithmetic faults
//=====================================================

use std::cmp::Ordering;

use tracing::error;

use crate::error::{VmError, VmResult};

use super::codes::Operator;
use super::value::Value;

/// Operand stack for compiled sub-expressions.
#[derive(Debug, Default, Clone)]
pub struct ExprStack {
    stack: Vec<Value>,
}

impl ExprStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> VmResult<Value> {
        self.stack.pop().ok_or(VmError::StackUnderflow)
    }

    pub fn peek(&self) -> Option<&Value> {
        self.stack.last()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }

    /// Applies `operator` to the top one or two entries and pushes the result.
    pub fn op(&mut self, operator: Operator) -> VmResult<()> {
        let result = if operator.is_unary() {
            let operand = self.pop()?;
            unary(operator, &operand)
        } else {
            let rhs = self.pop()?;
            let lhs = self.pop()?;
            binary(operator, &lhs, &rhs)
        };
        self.push(result);
        Ok(())
    }
}

pub fn unary(operator: Operator, operand: &Value) -> Value {
    match (operator, operand) {
        (Operator::Not, value) => Value::Bool(!value.is_truthy()),
        (Operator::Uadd, value) if value.is_numeric() => numeric(value),
        (Operator::Usub, Value::Int(value)) => value
            .checked_neg()
            .map_or(Value::Float(-(*value as f64)), Value::Int),
        (Operator::Usub, Value::Bool(value)) => Value::Int(-i64::from(*value)),
        (Operator::Usub, Value::Float(value)) => Value::Float(-value),
        (operator, value) => undefined(operator, value.type_name(), None),
    }
}

/// Evaluates a binary operator. Both operands are always fully evaluated
/// before this is called; `and`/`or` never short-circuit.
pub fn binary(operator: Operator, lhs: &Value, rhs: &Value) -> Value {
    match operator {
        Operator::And => Value::Bool(lhs.is_truthy() && rhs.is_truthy()),
        Operator::Or => Value::Bool(lhs.is_truthy() || rhs.is_truthy()),
        Operator::Eq => Value::Bool(lhs == rhs),
        Operator::Noteq => Value::Bool(lhs != rhs),
        Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte => compare(operator, lhs, rhs),
        Operator::Add if matches!(lhs, Value::Str(_)) || matches!(rhs, Value::Str(_)) => {
            Value::Str(format!("{lhs}{rhs}"))
        }
        Operator::Add
        | Operator::Sub
        | Operator::Mul
        | Operator::Div
        | Operator::Mod
        | Operator::Pow => arithmetic(operator, lhs, rhs),
        Operator::Not | Operator::Uadd | Operator::Usub => {
            undefined(operator, lhs.type_name(), Some(rhs.type_name()))
        }
    }
}

/// Numeric addition used by loop control.
pub fn add_numbers(lhs: &Value, rhs: &Value) -> Value {
    arithmetic(Operator::Add, lhs, rhs)
}

fn numeric(value: &Value) -> Value {
    match value {
        Value::Bool(flag) => Value::Int(i64::from(*flag)),
        other => other.clone(),
    }
}

fn integral(value: &Value) -> Option<i64> {
    match value {
        Value::Int(value) => Some(*value),
        Value::Bool(value) => Some(i64::from(*value)),
        _ => None,
    }
}

fn arithmetic(operator: Operator, lhs: &Value, rhs: &Value) -> Value {
    if !lhs.is_numeric() || !rhs.is_numeric() {
        return undefined(operator, lhs.type_name(), Some(rhs.type_name()));
    }
    if matches!(operator, Operator::Div | Operator::Mod) && rhs.as_f64() == Some(0.0) {
        error!(target: "lumascript::vm", "division by zero in {lhs} {} {rhs}", operator.symbol());
        return Value::Int(0);
    }
    if let (Some(a), Some(b)) = (integral(lhs), integral(rhs)) {
        if let Some(value) = integer_arithmetic(operator, a, b) {
            return Value::Int(value);
        }
    }
    let (a, b) = match (lhs.as_f64(), rhs.as_f64()) {
        (Some(a), Some(b)) => (a, b),
        _ => return undefined(operator, lhs.type_name(), Some(rhs.type_name())),
    };
    Value::Float(float_arithmetic(operator, a, b))
}

/// Exact integer result, or `None` when the result needs a float.
fn integer_arithmetic(operator: Operator, a: i64, b: i64) -> Option<i64> {
    match operator {
        Operator::Add => a.checked_add(b),
        Operator::Sub => a.checked_sub(b),
        Operator::Mul => a.checked_mul(b),
        Operator::Mod => {
            let rem = a.checked_rem(b)?;
            if rem != 0 && (rem < 0) != (b < 0) {
                Some(rem + b)
            } else {
                Some(rem)
            }
        }
        Operator::Pow => u32::try_from(b).ok().and_then(|exp| a.checked_pow(exp)),
        _ => None,
    }
}

fn float_arithmetic(operator: Operator, a: f64, b: f64) -> f64 {
    match operator {
        Operator::Add => a + b,
        Operator::Sub => a - b,
        Operator::Mul => a * b,
        Operator::Div => a / b,
        Operator::Mod => a - b * (a / b).floor(),
        Operator::Pow => a.powf(b),
        _ => f64::NAN,
    }
}

fn compare(operator: Operator, lhs: &Value, rhs: &Value) -> Value {
    let ordering = match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (a, b) if a.is_numeric() && b.is_numeric() => a
            .as_f64()
            .zip(b.as_f64())
            .and_then(|(a, b)| a.partial_cmp(&b)),
        _ => None,
    };
    let Some(ordering) = ordering else {
        error!(
            target: "lumascript::vm",
            "cannot compare {} with {}",
            lhs.type_name(),
            rhs.type_name()
        );
        return Value::Bool(false);
    };
    Value::Bool(match operator {
        Operator::Lt => ordering == Ordering::Less,
        Operator::Lte => ordering != Ordering::Greater,
        Operator::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    })
}

fn undefined(operator: Operator, lhs: &str, rhs: Option<&str>) -> Value {
    match rhs {
        Some(rhs) => error!(
            target: "lumascript::vm",
            "operator {} is not defined for {lhs} and {rhs}",
            operator.symbol()
        ),
        None => error!(
            target: "lumascript::vm",
            "operator {} is not defined for {lhs}",
            operator.symbol()
        ),
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(program: &[Result<Value, Operator>]) -> Value {
        let mut stack = ExprStack::new();
        for step in program {
            match step {
                Ok(value) => stack.push(value.clone()),
                Err(operator) => stack.op(*operator).expect("operator"),
            }
        }
        stack.pop().expect("result")
    }

    #[test]
    fn postfix_arithmetic() {
        // (12 + 3) * 4
        let value = eval(&[
            Ok(Value::Int(12)),
            Ok(Value::Int(3)),
            Err(Operator::Add),
            Ok(Value::Int(4)),
            Err(Operator::Mul),
        ]);
        assert!(matches!(value, Value::Int(60)));
        // 2 ^ (1 + 6)
        let value = eval(&[
            Ok(Value::Int(2)),
            Ok(Value::Int(1)),
            Ok(Value::Int(6)),
            Err(Operator::Add),
            Err(Operator::Pow),
        ]);
        assert!(matches!(value, Value::Int(128)));
    }

    #[test]
    fn division_always_yields_float() {
        assert!(matches!(
            binary(Operator::Div, &Value::Int(7), &Value::Int(2)),
            Value::Float(v) if v == 3.5
        ));
        assert!(matches!(
            binary(Operator::Div, &Value::Int(6), &Value::Int(3)),
            Value::Float(v) if v == 2.0
        ));
    }

    #[test]
    fn modulo_follows_the_divisor_sign() {
        assert_eq!(binary(Operator::Mod, &Value::Int(-7), &Value::Int(3)), Value::Int(2));
        assert_eq!(binary(Operator::Mod, &Value::Int(7), &Value::Int(-3)), Value::Int(-2));
        assert_eq!(binary(Operator::Mod, &Value::Float(7.5), &Value::Int(2)), Value::Float(1.5));
    }

    #[test]
    fn overflow_promotes_to_float() {
        let value = binary(Operator::Mul, &Value::Int(i64::MAX), &Value::Int(2));
        assert!(matches!(value, Value::Float(_)));
        let value = binary(Operator::Pow, &Value::Int(2), &Value::Int(-1));
        assert_eq!(value, Value::Float(0.5));
    }

    #[test]
    fn logic_and_comparison() {
        assert_eq!(binary(Operator::And, &Value::Int(1), &Value::Int(0)), Value::Bool(false));
        assert_eq!(binary(Operator::Or, &Value::Null, &Value::from("x")), Value::Bool(true));
        assert_eq!(binary(Operator::Lte, &Value::Int(3), &Value::Float(3.0)), Value::Bool(true));
        assert_eq!(binary(Operator::Gt, &Value::from("b"), &Value::from("a")), Value::Bool(true));
        assert_eq!(unary(Operator::Not, &Value::Int(0)), Value::Bool(true));
        assert_eq!(unary(Operator::Usub, &Value::Int(5)), Value::Int(-5));
    }

    #[test]
    fn strings_concatenate() {
        assert_eq!(
            binary(Operator::Add, &Value::from("zone "), &Value::Int(3)),
            Value::from("zone 3")
        );
    }

    #[test]
    fn underflow_is_fatal() {
        let mut stack = ExprStack::new();
        stack.push(Value::Int(1));
        assert_eq!(stack.op(Operator::Add), Err(VmError::StackUnderflow));
    }
}

//=====================================================
// End of file
//=====================================================
