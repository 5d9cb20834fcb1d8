//=====================================================
// File: vm/call_stack.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Variable scopes, loop control and subroutine return addresses
// Objective: Tagged frames so a return address can only come from a
//            subroutine frame and loop state only from a loop frame
//=====================================================

use std::collections::HashMap;

use crate::error::{VmError, VmResult};

use super::codes::LoopVar;
use super::value::Value;
use super::vm_math;

#[derive(Debug, Clone, PartialEq)]
struct Binding {
    value: Value,
    constant: bool,
}

type Scope = HashMap<String, Binding>;

/// Iteration state of one active `LOOP`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopControl {
    pub first: Value,
    pub last: Value,
    pub increment: Value,
    pub counter: i64,
    pub current: Value,
    pub broken: bool,
    /// Address of the first instruction of the body.
    pub start: usize,
    /// Address of the matching `END_LOOP`.
    pub exit: usize,
    pub var: Option<String>,
    infinite: bool,
}

impl LoopControl {
    pub fn counted(
        first: Value,
        last: Value,
        increment: Value,
        start: usize,
        exit: usize,
        var: Option<String>,
    ) -> Self {
        Self {
            current: first.clone(),
            first,
            last,
            increment,
            counter: 0,
            broken: false,
            start,
            exit,
            var,
            infinite: false,
        }
    }

    pub fn infinite(start: usize, exit: usize) -> Self {
        Self {
            first: Value::Int(0),
            last: Value::Null,
            increment: Value::Int(1),
            counter: 0,
            current: Value::Int(0),
            broken: false,
            start,
            exit,
            var: None,
            infinite: true,
        }
    }

    pub fn is_infinite(&self) -> bool {
        self.infinite
    }

    /// True while `current` is still inside the inclusive range. The
    /// direction of the test follows the sign of the increment.
    pub fn in_range(&self) -> bool {
        if self.infinite {
            return true;
        }
        let (Some(current), Some(last)) = (self.current.as_f64(), self.last.as_f64()) else {
            return false;
        };
        if self.increment.as_f64().unwrap_or(0.0) < 0.0 {
            current >= last
        } else {
            current <= last
        }
    }

    /// Moves to the next iteration and reports whether it should run.
    pub fn advance(&mut self) -> bool {
        if self.broken {
            return false;
        }
        self.counter += 1;
        if self.infinite {
            self.current = Value::Int(self.counter);
            return true;
        }
        self.current = vm_math::add_numbers(&self.current, &self.increment);
        self.in_range()
    }

    pub fn get(&self, var: LoopVar) -> Value {
        match var {
            LoopVar::Break => Value::Bool(self.broken),
            LoopVar::Counter => Value::Int(self.counter),
            LoopVar::Current => self.current.clone(),
            LoopVar::ExitJmp => Value::Int(self.exit as i64),
            LoopVar::First => self.first.clone(),
            LoopVar::Incr => self.increment.clone(),
            LoopVar::Last => self.last.clone(),
        }
    }
}

/// One call-stack entry.
#[derive(Debug, Clone, PartialEq)]
enum Frame {
    Subroutine { return_address: usize, locals: Scope },
    Loop { control: LoopControl, locals: Scope },
}

impl Frame {
    fn locals(&self) -> &Scope {
        match self {
            Frame::Subroutine { locals, .. } | Frame::Loop { locals, .. } => locals,
        }
    }

    fn locals_mut(&mut self) -> &mut Scope {
        match self {
            Frame::Subroutine { locals, .. } | Frame::Loop { locals, .. } => locals,
        }
    }
}

/// Callee frame being assembled by `PARAM` instructions ahead of a `JSR`.
#[derive(Debug, Default, Clone, PartialEq)]
struct PendingCall {
    return_address: usize,
    locals: Scope,
}

#[derive(Debug, Clone)]
pub struct CallStack {
    globals: Scope,
    frames: Vec<Frame>,
    pending: Option<PendingCall>,
    max_frames: usize,
}

impl CallStack {
    pub fn new(max_frames: usize) -> Self {
        Self {
            globals: Scope::new(),
            frames: Vec::new(),
            pending: None,
            max_frames,
        }
    }

    pub fn reset(&mut self) {
        self.globals.clear();
        self.frames.clear();
        self.pending = None;
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_outermost(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn seed_global(&mut self, name: impl Into<String>, value: Value) {
        self.globals.insert(
            name.into(),
            Binding {
                value,
                constant: false,
            },
        );
    }

    fn lookup(&self, name: &str) -> Option<&Binding> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.locals().get(name))
            .or_else(|| self.globals.get(name))
    }

    fn lookup_mut(&mut self, name: &str) -> Option<&mut Binding> {
        for frame in self.frames.iter_mut().rev() {
            if let Some(binding) = frame.locals_mut().get_mut(name) {
                return Some(binding);
            }
        }
        self.globals.get_mut(name)
    }

    fn current_scope(&mut self) -> &mut Scope {
        match self.frames.last_mut() {
            Some(frame) => frame.locals_mut(),
            None => &mut self.globals,
        }
    }

    pub fn get_variable(&self, name: &str) -> VmResult<Value> {
        self.lookup(name)
            .map(|binding| binding.value.clone())
            .ok_or_else(|| VmError::UnresolvedVariable(name.to_string()))
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Updates the nearest existing binding, or creates one in the current
    /// frame.
    pub fn put_variable(&mut self, name: &str, value: Value) -> VmResult<()> {
        match self.lookup_mut(name) {
            Some(binding) if binding.constant => Err(VmError::ConstantReassigned(name.to_string())),
            Some(binding) => {
                binding.value = value;
                Ok(())
            }
            None => {
                self.bind_local(name, value);
                Ok(())
            }
        }
    }

    /// Binds in the current frame without looking outward.
    pub fn bind_local(&mut self, name: &str, value: Value) {
        self.current_scope().insert(
            name.to_string(),
            Binding {
                value,
                constant: false,
            },
        );
    }

    pub fn put_constant(&mut self, name: &str, value: Value) -> VmResult<()> {
        let scope = self.current_scope();
        if scope.get(name).is_some_and(|binding| binding.constant) {
            return Err(VmError::ConstantReassigned(name.to_string()));
        }
        scope.insert(
            name.to_string(),
            Binding {
                value,
                constant: true,
            },
        );
        Ok(())
    }

    pub fn put_param(&mut self, name: &str, value: Value) {
        self.pending.get_or_insert_with(PendingCall::default).locals.insert(
            name.to_string(),
            Binding {
                value,
                constant: false,
            },
        );
    }

    pub fn set_return(&mut self, address: usize) {
        self.pending.get_or_insert_with(PendingCall::default).return_address = address;
    }

    /// Return address of the innermost subroutine frame.
    pub fn get_return(&self) -> Option<usize> {
        self.frames.iter().rev().find_map(|frame| match frame {
            Frame::Subroutine { return_address, .. } => Some(*return_address),
            Frame::Loop { .. } => None,
        })
    }

    fn push_frame(&mut self, frame: Frame) -> VmResult<()> {
        if self.frames.len() >= self.max_frames {
            return Err(VmError::StackOverflow(self.max_frames));
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Pushes the pending callee frame built by `put_param`/`set_return`.
    pub fn push_current(&mut self) -> VmResult<()> {
        let pending = self.pending.take().unwrap_or_default();
        self.push_frame(Frame::Subroutine {
            return_address: pending.return_address,
            locals: pending.locals,
        })
    }

    /// Pops a subroutine frame and hands back its return address.
    pub fn pop_current(&mut self, at: usize) -> VmResult<usize> {
        match self.frames.pop() {
            Some(Frame::Subroutine { return_address, .. }) => Ok(return_address),
            Some(frame) => {
                self.frames.push(frame);
                Err(VmError::FrameMismatch {
                    expected: "subroutine",
                    address: at,
                })
            }
            None => Err(VmError::FrameMismatch {
                expected: "subroutine",
                address: at,
            }),
        }
    }

    pub fn enter_loop(&mut self, control: LoopControl) -> VmResult<()> {
        self.push_frame(Frame::Loop {
            control,
            locals: Scope::new(),
        })
    }

    pub fn exit_loop(&mut self, at: usize) -> VmResult<LoopControl> {
        match self.frames.pop() {
            Some(Frame::Loop { control, .. }) => Ok(control),
            Some(frame) => {
                self.frames.push(frame);
                Err(VmError::FrameMismatch {
                    expected: "loop",
                    address: at,
                })
            }
            None => Err(VmError::FrameMismatch {
                expected: "loop",
                address: at,
            }),
        }
    }

    /// Loop control of the top frame, which must be a loop frame.
    pub fn top_loop(&mut self, at: usize) -> VmResult<&mut LoopControl> {
        match self.frames.last_mut() {
            Some(Frame::Loop { control, .. }) => Ok(control),
            _ => Err(VmError::FrameMismatch {
                expected: "loop",
                address: at,
            }),
        }
    }

    /// Innermost loop visible from the current subroutine. The search never
    /// crosses a subroutine frame.
    pub fn active_loop(&self) -> Option<&LoopControl> {
        for frame in self.frames.iter().rev() {
            match frame {
                Frame::Loop { control, .. } => return Some(control),
                Frame::Subroutine { .. } => return None,
            }
        }
        None
    }

    fn active_loop_mut(&mut self) -> Option<&mut LoopControl> {
        for frame in self.frames.iter_mut().rev() {
            match frame {
                Frame::Loop { control, .. } => return Some(control),
                Frame::Subroutine { .. } => return None,
            }
        }
        None
    }

    pub fn loop_var(&self, var: LoopVar) -> VmResult<Value> {
        self.active_loop()
            .map(|control| control.get(var))
            .ok_or(VmError::NoActiveLoop(var))
    }

    /// Only the break flag is writable from a program.
    pub fn set_loop_var(&mut self, var: LoopVar, value: &Value) -> VmResult<()> {
        if var != LoopVar::Break {
            return Err(VmError::InvalidDestination(format!("loop.{var:?}")));
        }
        let control = self.active_loop_mut().ok_or(VmError::NoActiveLoop(var))?;
        control.broken = value.is_truthy();
        Ok(())
    }
}


//=====================================================
// End of file
//=====================================================
