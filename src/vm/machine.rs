//=====================================================
// File: vm/machine.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Fetch-execute loop of the LumaScript machine
// Objective: Drive the register file, call stack, expression stack and
//            discovery cursors; turn dispatch opcodes into device commands
//=====================================================

use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::bytecode::peephole;
use crate::clock::Clock;
use crate::config::VmConfig;
use crate::device::{DeviceResult, DiscoveryFilter, Light, LightSet};
use crate::error::{VmError, VmResult};
use crate::io::{KeyReader, StdinKeyReader, StdoutOutput, TextOutput};
use crate::units::{self, Color, RawColor};

use super::call_stack::{CallStack, LoopControl};
use super::codes::{OpCode, Operand, Register, SetOp, UnitMode};
use super::discover::VmDiscover;
use super::instruction::{DiscoveryScope, Instruction, LoopSpec, Param, Source};
use super::loader::Program;
use super::registers::{Registers, TimeValue};
use super::value::Value;
use super::vm_math::ExprStack;

const PAUSE_PROMPT: &str = "Press any key to continue, q to quit, ! to run without stopping again.";

/// Requests that a running machine stop at the next instruction boundary.
/// Clones share one flag, so a handle can be moved to another thread.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// What the loop does after an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Next,
    Jump(usize),
    Halt,
}

pub struct Machine {
    reg: Registers,
    call_stack: CallStack,
    math: ExprStack,
    discover: VmDiscover,
    pc: usize,
    print_buffer: String,
    enable_pause: bool,
    stop: StopHandle,
    config: VmConfig,
    lights: Arc<dyn LightSet>,
    clock: Box<dyn Clock>,
    output: Box<dyn TextOutput>,
    keys: Box<dyn KeyReader>,
}

impl Machine {
    pub fn new(clock: impl Clock + 'static, lights: Arc<dyn LightSet>) -> Self {
        let config = VmConfig::default();
        let mut machine = Self {
            reg: Registers::new(),
            call_stack: CallStack::new(config.max_frames),
            math: ExprStack::new(),
            discover: VmDiscover::new(config.discovery_timeout()),
            pc: 0,
            print_buffer: String::new(),
            enable_pause: config.enable_pause,
            stop: StopHandle::default(),
            config,
            lights,
            clock: Box::new(clock),
            output: Box::new(StdoutOutput),
            keys: Box::new(StdinKeyReader),
        };
        machine.reset();
        machine
    }

    pub fn with_config(mut self, config: VmConfig) -> Self {
        self.call_stack = CallStack::new(config.max_frames);
        self.discover = VmDiscover::new(config.discovery_timeout());
        self.config = config;
        self.reset();
        self
    }

    pub fn with_output(mut self, output: impl TextOutput + 'static) -> Self {
        self.output = Box::new(output);
        self
    }

    pub fn with_keys(mut self, keys: impl KeyReader + 'static) -> Self {
        self.keys = Box::new(keys);
        self
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn register(&self, reg: Register) -> Value {
        self.reg.get(reg)
    }

    pub fn registers(&self) -> &Registers {
        &self.reg
    }

    /// Color registers in the current unit mode.
    pub fn color(&self) -> Color {
        self.reg.color()
    }

    pub fn variable(&self, name: &str) -> VmResult<Value> {
        self.call_stack.get_variable(name)
    }

    /// Returns every piece of run state to its initial value.
    pub fn reset(&mut self) {
        self.reg.reset();
        self.reg.unit_mode = self.config.default_unit_mode;
        self.call_stack.reset();
        self.math.clear();
        self.discover.reset();
        self.pc = 0;
        self.print_buffer.clear();
        self.enable_pause = self.config.enable_pause;
        self.stop.clear();
    }

    /// Executes `program` from its first instruction until STOP, a final END,
    /// a stop request or the end of the code.
    pub fn run(&mut self, program: &Program) -> VmResult<()> {
        self.reset();
        for (name, value) in &program.globals {
            self.call_stack.seed_global(name.as_str(), value.clone());
        }
        self.clock.start();
        let outcome = self.execute(program);
        self.clock.stop();
        self.flush_line();
        if let Err(err) = &outcome {
            warn!(target: "lumascript::vm", "run aborted at {:04}: {err}", self.pc);
        }
        outcome
    }

    fn execute(&mut self, program: &Program) -> VmResult<()> {
        while let Some(inst) = program.code.get(self.pc) {
            if self.stop.is_stopped() {
                info!(target: "lumascript::vm", "stop requested at {:04}", self.pc);
                break;
            }
            if self.config.trace_instructions {
                debug!(target: "lumascript::vm", "{:04}: {inst}", self.pc);
            }
            match self.step(program, inst)? {
                Flow::Next => self.pc += 1,
                Flow::Jump(address) => self.pc = address,
                Flow::Halt => break,
            }
        }
        Ok(())
    }

    fn step(&mut self, program: &Program, inst: &Instruction) -> VmResult<Flow> {
        match inst.opcode {
            OpCode::Move => {
                let value = self.param_value(inst, &inst.param0)?;
                self.put_value(&inst.param1, value)?;
            }
            OpCode::Moveq => {
                let Param::Value(value) = &inst.param0 else {
                    return Err(self.malformed(inst, "expected a literal"));
                };
                self.put_value(&inst.param1, value.clone())?;
            }
            OpCode::Param => {
                let Param::Var(name) = &inst.param0 else {
                    return Err(self.malformed(inst, "expected a parameter name"));
                };
                let value = self.param_value(inst, &inst.param1)?;
                self.call_stack.put_param(name, value);
            }
            OpCode::Jsr => {
                let Param::Routine(name) = &inst.param0 else {
                    return Err(self.malformed(inst, "expected a routine name"));
                };
                let entry = program
                    .entry(name)
                    .ok_or_else(|| VmError::UnresolvedRoutine(name.clone()))?;
                self.call_stack.set_return(self.pc + 1);
                self.call_stack.push_current()?;
                return Ok(Flow::Jump(entry));
            }
            OpCode::End => {
                if self.call_stack.is_outermost() {
                    return Ok(Flow::Halt);
                }
                return self.call_stack.pop_current(self.pc).map(Flow::Jump);
            }
            OpCode::Jump => return self.jump(inst),
            OpCode::Loop => return self.enter_loop(inst),
            OpCode::EndLoop => return self.end_loop(),
            OpCode::Push => {
                let value = self.param_value(inst, &inst.param0)?;
                self.math.push(value);
            }
            OpCode::Pushq => {
                let Param::Value(value) = &inst.param0 else {
                    return Err(self.malformed(inst, "expected a literal"));
                };
                self.math.push(value.clone());
            }
            OpCode::Pop => {
                let value = self.math.pop()?;
                self.put_value(&inst.param0, value)?;
            }
            OpCode::Op => {
                let Param::Operator(operator) = inst.param0 else {
                    return Err(self.malformed(inst, "expected an operator"));
                };
                self.math.op(operator)?;
            }
            OpCode::Color => self.color_command(),
            OpCode::Power => self.power_command(),
            OpCode::GetColor => self.get_color(),
            OpCode::TimePattern => self.time_pattern(inst)?,
            OpCode::Wait => self.wait(),
            OpCode::Disc => {
                let Param::Operand(kind) = inst.param0 else {
                    return Err(self.malformed(inst, "expected a device kind"));
                };
                let key = inst.param1.to_string();
                let found = self.discover.disc(kind, &key, self.lights.as_ref());
                self.bind_discovered(&inst.param1, found)?;
            }
            OpCode::Discm => {
                let filter = self.scope_filter(inst, &inst.param0)?;
                let key = inst.param1.to_string();
                let found = self.discover.discm(filter, &key, self.lights.as_ref());
                self.bind_discovered(&inst.param1, found)?;
            }
            OpCode::Dnext => {
                let key = inst.param0.to_string();
                let found = self.discover.dnext(&key);
                self.bind_discovered(&inst.param0, found)?;
            }
            OpCode::Dnextm => {
                let filter = self.scope_filter(inst, &inst.param0)?;
                let key = inst.param1.to_string();
                let found = self.discover.dnextm(&filter, &key);
                self.bind_discovered(&inst.param1, found)?;
            }
            OpCode::Constant => {
                let Param::Var(name) = &inst.param0 else {
                    return Err(self.malformed(inst, "expected a constant name"));
                };
                let value = self.param_value(inst, &inst.param1)?;
                self.call_stack.put_constant(name, value)?;
            }
            OpCode::Out => {
                let value = self.param_value(inst, &inst.param0)?;
                self.print(&value);
            }
            OpCode::Outq => match &inst.param0 {
                Param::None
                | Param::Operand(Operand::Null)
                | Param::Value(Value::Null)
                | Param::Value(Value::Operand(Operand::Null)) => self.flush_line(),
                Param::Value(value) => self.print(value),
                _ => return Err(self.malformed(inst, "expected a literal")),
            },
            OpCode::Pause => {
                if self.pause() {
                    return Ok(Flow::Halt);
                }
            }
            OpCode::Breakpoint => self.output.write_line("At breakpoint."),
            OpCode::Routine => {
                debug!(target: "lumascript::vm", "unlinked routine marker at {:04}", self.pc);
            }
            OpCode::Nop => {}
            OpCode::Stop => return Ok(Flow::Halt),
        }
        Ok(Flow::Next)
    }

    // ---- operand access ----------------------------------------------------

    fn resolve(&self, source: &Source) -> VmResult<Value> {
        match source {
            Source::Literal(value) => Ok(value.clone()),
            Source::Register(reg) => Ok(self.reg.get(*reg)),
            Source::Var(name) => self.call_stack.get_variable(name),
            Source::LoopVar(var) => self.call_stack.loop_var(*var),
        }
    }

    fn param_value(&self, inst: &Instruction, param: &Param) -> VmResult<Value> {
        match param.as_source() {
            Some(source) => self.resolve(&source),
            None => Err(self.malformed(inst, "expected a value, register or variable")),
        }
    }

    fn put_value(&mut self, destination: &Param, value: Value) -> VmResult<()> {
        match destination {
            Param::Register(reg) => self.reg.set(*reg, value),
            Param::Var(name) => self.call_stack.put_variable(name, value),
            Param::LoopVar(var) => self.call_stack.set_loop_var(*var, &value),
            other => Err(VmError::InvalidDestination(format!("{other:?}"))),
        }
    }

    fn malformed(&self, inst: &Instruction, detail: &str) -> VmError {
        VmError::MalformedInstruction {
            opcode: inst.opcode,
            address: self.pc,
            detail: detail.to_string(),
        }
    }

    // ---- control flow ------------------------------------------------------

    fn jump(&self, inst: &Instruction) -> VmResult<Flow> {
        let (Param::Condition(condition), Param::Offset(offset)) = (&inst.param0, &inst.param1) else {
            return Err(self.malformed(inst, "expected a condition and an offset"));
        };
        if !condition.taken(self.reg.result.is_truthy()) {
            return Ok(Flow::Next);
        }
        peephole::jump_target(self.pc, *offset)
            .map(Flow::Jump)
            .ok_or_else(|| self.malformed(inst, "jump before the start of the program"))
    }

    fn enter_loop(&mut self, inst: &Instruction) -> VmResult<Flow> {
        let (Param::Loop(spec), Param::Address(exit)) = (&inst.param0, &inst.param1) else {
            return Err(self.malformed(inst, "loop is not linked"));
        };
        let start = self.pc + 1;
        let control = match spec {
            LoopSpec::Infinite => LoopControl::infinite(start, *exit),
            LoopSpec::Counted {
                first,
                last,
                increment,
                var,
            } => {
                let first = self.resolve(first)?;
                let last = self.resolve(last)?;
                let increment = self.resolve(increment)?;
                if !(first.is_numeric() && last.is_numeric() && increment.is_numeric()) {
                    warn!(
                        target: "lumascript::vm",
                        "loop bounds {first}, {last}, {increment} are not numbers; loop skipped"
                    );
                }
                LoopControl::counted(first, last, increment, start, *exit, var.clone())
            }
        };
        if !control.in_range() {
            return Ok(Flow::Jump(*exit + 1));
        }
        let binding = control.var.clone().map(|var| (var, control.current.clone()));
        self.call_stack.enter_loop(control)?;
        if let Some((var, current)) = binding {
            self.call_stack.bind_local(&var, current);
        }
        Ok(Flow::Next)
    }

    fn end_loop(&mut self) -> VmResult<Flow> {
        let control = self.call_stack.top_loop(self.pc)?;
        if !control.advance() {
            self.call_stack.exit_loop(self.pc)?;
            return Ok(Flow::Next);
        }
        let start = control.start;
        let binding = control.var.clone().map(|var| (var, control.current.clone()));
        if let Some((var, current)) = binding {
            self.call_stack.bind_local(&var, current);
        }
        Ok(Flow::Jump(start))
    }

    // ---- time --------------------------------------------------------------

    fn time_pattern(&mut self, inst: &Instruction) -> VmResult<()> {
        let (Param::SetOp(op), Param::Value(Value::Pattern(pattern))) = (&inst.param0, &inst.param1) else {
            return Err(self.malformed(inst, "expected a set operation and a time pattern"));
        };
        match &mut self.reg.time {
            TimeValue::Pattern(current) if *op == SetOp::Union => current.union(pattern),
            time => *time = TimeValue::Pattern(pattern.clone()),
        }
        Ok(())
    }

    fn wait(&mut self) {
        match &self.reg.time {
            TimeValue::Pattern(pattern) => self.clock.wait_until(pattern),
            TimeValue::Duration(time) if *time > 0.0 => {
                let seconds = if self.reg.unit_mode == UnitMode::Raw {
                    time / 1000.0
                } else {
                    *time
                };
                self.clock.pause_for(seconds);
            }
            TimeValue::Duration(_) => {}
        }
    }

    // ---- console -----------------------------------------------------------

    fn print(&mut self, value: &Value) {
        self.print_buffer.push_str(&value.to_string());
        self.print_buffer.push(' ');
        if self.print_buffer.len() > self.config.max_print_buffer {
            self.output.write_text(&self.print_buffer);
            self.print_buffer.clear();
        }
    }

    fn flush_line(&mut self) {
        if self.print_buffer.is_empty() {
            return;
        }
        self.output.write_line(self.print_buffer.trim_end());
        self.print_buffer.clear();
    }

    /// Returns true when the user asked to quit.
    fn pause(&mut self) -> bool {
        if !self.enable_pause {
            return false;
        }
        self.flush_line();
        self.output.write_line(PAUSE_PROMPT);
        match self.keys.read_char() {
            Some('q') => {
                self.stop.stop();
                true
            }
            Some(key) => {
                self.output.write_line("Running...");
                if key == '!' {
                    self.enable_pause = false;
                }
                false
            }
            None => {
                debug!(target: "lumascript::vm", "no keyboard input; pauses disabled");
                self.enable_pause = false;
                false
            }
        }
    }

    // ---- discovery ---------------------------------------------------------

    fn scope_filter(&self, inst: &Instruction, param: &Param) -> VmResult<DiscoveryFilter> {
        let Param::Scope(DiscoveryScope { kind, name }) = param else {
            return Err(self.malformed(inst, "expected a discovery scope"));
        };
        let name = self.resolve(name)?.to_string();
        match kind {
            Operand::Group => Ok(DiscoveryFilter::Group(name)),
            Operand::Location => Ok(DiscoveryFilter::Location(name)),
            _ => Err(self.malformed(inst, "scope must be a group or a location")),
        }
    }

    fn bind_discovered(&mut self, target: &Param, found: Option<String>) -> VmResult<()> {
        self.reg.result = Value::Bool(found.is_some());
        self.put_value(target, found.map_or(Value::Null, Value::Str))
    }

    // ---- devices -----------------------------------------------------------

    fn device_color(&self) -> (RawColor, u32) {
        let raw = units::convert_color(self.reg.color(), self.reg.unit_mode, UnitMode::Raw);
        let (color, color_clamped) = units::to_device_color(raw);
        let (duration, duration_clamped) = self.device_duration();
        if color_clamped && self.config.clamp_raw_values {
            warn!(target: "lumascript::vm", "color {raw:?} clamped to {color:?}");
        }
        if duration_clamped && self.config.clamp_raw_values {
            warn!(target: "lumascript::vm", "duration {} clamped to {duration}", self.reg.duration);
        }
        (color, duration)
    }

    fn device_duration(&self) -> (u32, bool) {
        units::to_device_duration(units::convert_time(
            self.reg.duration,
            self.reg.unit_mode,
            UnitMode::Raw,
        ))
    }

    fn report(result: DeviceResult<()>) {
        if let Err(err) = result {
            warn!(target: "lumascript::vm", "{err}");
        }
    }

    fn target_name(&self) -> Option<&str> {
        let name = self.reg.name.as_deref();
        if name.is_none() {
            warn!(target: "lumascript::vm", "no name given for {:?}; command skipped", self.reg.operand);
        }
        name
    }

    fn target_light(&self) -> Option<Arc<dyn Light>> {
        let name = self.target_name()?;
        let light = self.lights.get_light(name);
        if light.is_none() {
            warn!(target: "lumascript::vm", "Light \"{name}\" not found.");
        }
        light
    }

    fn multizone_light(&self) -> Option<Arc<dyn Light>> {
        let light = self.target_light()?;
        if !light.supports_multizone() {
            warn!(target: "lumascript::vm", "Light \"{}\" is not multi-zone.", light.label());
            return None;
        }
        Some(light)
    }

    /// Lights of the group or location named in the `name` register.
    fn collection(&self) -> Option<Vec<Arc<dyn Light>>> {
        let name = self.target_name()?;
        let (kind, members) = match self.reg.operand {
            Operand::Group => ("group", self.lights.get_group(name)),
            _ => ("location", self.lights.get_location(name)),
        };
        let Some(members) = members else {
            warn!(target: "lumascript::vm", "Unknown {kind}: {name}");
            return None;
        };
        Some(self.lights_named(&members))
    }

    fn lights_named(&self, names: &[String]) -> Vec<Arc<dyn Light>> {
        names
            .iter()
            .filter_map(|member| {
                let light = self.lights.get_light(member);
                if light.is_none() {
                    warn!(target: "lumascript::vm", "Light \"{member}\" not found.");
                }
                light
            })
            .collect()
    }

    fn zone_span(&self) -> Option<(usize, usize)> {
        let first = self.reg.first_zone;
        let last = self.reg.last_zone.unwrap_or(first);
        match (usize::try_from(first), usize::try_from(last)) {
            (Ok(first), Ok(last)) if first <= last => Some((first, last + 1)),
            _ => {
                warn!(target: "lumascript::vm", "invalid zone range {first}..={last}");
                None
            }
        }
    }

    /// Zone a single-zone read addresses. `last_zone` plays no part.
    fn first_zone(&self) -> Option<usize> {
        let first = self.reg.first_zone;
        let zone = usize::try_from(first).ok();
        if zone.is_none() {
            warn!(target: "lumascript::vm", "invalid zone {first}");
        }
        zone
    }

    fn color_command(&mut self) {
        let (color, duration) = self.device_color();
        match self.reg.operand {
            Operand::All => Self::report(self.lights.set_color_all(color, duration)),
            Operand::Light => {
                if let Some(light) = self.target_light() {
                    Self::report(light.set_color(color, duration));
                }
            }
            Operand::Group | Operand::Location => {
                for light in self.collection().unwrap_or_default() {
                    Self::report(light.set_color(color, duration));
                }
            }
            Operand::MzLight => {
                if let (Some(light), Some((first, end))) = (self.multizone_light(), self.zone_span()) {
                    Self::report(light.set_zone_color(first, end, color, duration));
                }
            }
            Operand::Null => warn!(target: "lumascript::vm", "COLOR without a target; skipped"),
        }
    }

    fn power_command(&mut self) {
        let power = self.reg.raw_power();
        let (duration, _) = self.device_duration();
        match self.reg.operand {
            Operand::All => Self::report(self.lights.set_power_all(power, duration)),
            Operand::Light | Operand::MzLight => {
                if let Some(light) = self.target_light() {
                    Self::report(light.set_power(power, duration));
                }
            }
            Operand::Group | Operand::Location => {
                for light in self.collection().unwrap_or_default() {
                    Self::report(light.set_power(power, duration));
                }
            }
            Operand::Null => warn!(target: "lumascript::vm", "POWER without a target; skipped"),
        }
    }

    fn get_color(&mut self) {
        let raw = match self.reg.operand {
            Operand::Light => self.target_light().and_then(|light| read_color(light.as_ref())),
            Operand::MzLight => {
                match (self.multizone_light(), self.first_zone()) {
                    (Some(light), Some(zone)) => match light.get_color_zones(zone, zone + 1) {
                        Ok(colors) => colors.first().copied(),
                        Err(err) => {
                            warn!(target: "lumascript::vm", "{err}");
                            None
                        }
                    },
                    _ => None,
                }
            }
            Operand::Group | Operand::Location => self
                .collection()
                .and_then(|lights| average_color(&lights)),
            Operand::All => average_color(&self.lights_named(&self.lights.light_names())),
            Operand::Null => {
                warn!(target: "lumascript::vm", "GET_COLOR without a target; skipped");
                None
            }
        };
        if let Some(raw) = raw {
            let color = units::from_device_color(raw);
            self.reg
                .store_color(units::convert_color(color, UnitMode::Raw, self.reg.unit_mode));
        }
    }
}

fn read_color(light: &dyn Light) -> Option<RawColor> {
    match light.get_color() {
        Ok(color) => Some(color),
        Err(err) => {
            warn!(target: "lumascript::vm", "{err}");
            None
        }
    }
}

/// Mean color of `lights`. Hue is averaged around the color wheel.
fn average_color(lights: &[Arc<dyn Light>]) -> Option<RawColor> {
    let colors: Vec<Color> = lights
        .iter()
        .filter_map(|light| read_color(light.as_ref()))
        .map(units::from_device_color)
        .collect();
    if colors.is_empty() {
        warn!(target: "lumascript::vm", "no colors to average");
        return None;
    }
    let count = colors.len() as f64;
    let steps = f64::from(u16::MAX) + 1.0;
    let (sin, cos) = colors.iter().fold((0.0, 0.0), |(sin, cos), color| {
        let angle = color[0] / steps * TAU;
        (sin + angle.sin(), cos + angle.cos())
    });
    let hue = if sin.abs() < 1e-9 && cos.abs() < 1e-9 {
        0.0
    } else {
        sin.atan2(cos).rem_euclid(TAU) / TAU * steps
    };
    let mean = |channel: usize| colors.iter().map(|color| color[channel]).sum::<f64>() / count;
    let (color, _) = units::to_device_color([hue, mean(1), mean(2), mean(3)]);
    Some(color)
}


//=====================================================
// End of file
//=====================================================
