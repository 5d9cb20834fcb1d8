//=====================================================
// File: vm/tests/machine_tests.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Device dispatch, unit modes, clock and console behaviour
//=====================================================

use std::thread;
use std::time::Duration;

use tracing_test::traced_test;

use super::{assert_close, Rig};
use crate::config::VmConfig;
use crate::device::Light;
use crate::fakes::{Action, ClockEvent, FakeLightSet};
use crate::time_pattern::TimePattern;
use crate::vm::codes::{OpCode, Operand, Operator, Register, SetOp, UnitMode};
use crate::vm::instruction::{Instruction, LoopSpec, Param};
use crate::vm::value::Value;

fn target(operand: Operand, name: &str) -> Vec<Instruction> {
    vec![
        Instruction::set_reg(Register::Operand, operand),
        Instruction::set_reg(Register::Name, name),
    ]
}

fn logical_color(hue: f64, saturation: f64, brightness: f64, kelvin: f64) -> Vec<Instruction> {
    vec![
        Instruction::set_reg(Register::Hue, hue),
        Instruction::set_reg(Register::Saturation, saturation),
        Instruction::set_reg(Register::Brightness, brightness),
        Instruction::set_reg(Register::Kelvin, kelvin),
    ]
}

fn pattern(text: &str) -> TimePattern {
    TimePattern::from_pattern_text(text).expect("pattern")
}

fn time_pattern(op: SetOp, text: &str) -> Instruction {
    Instruction::new(
        OpCode::TimePattern,
        Param::SetOp(op),
        Param::Value(Value::Pattern(pattern(text))),
    )
}

#[test]
fn color_reaches_one_light_in_device_units() {
    let mut code = target(Operand::Light, "Light 1");
    code.extend(logical_color(120.0, 100.0, 50.0, 3500.0));
    code.push(Instruction::set_reg(Register::Duration, 1.0));
    code.push(Instruction::bare(OpCode::Color));

    let mut rig = Rig::new(FakeLightSet::with_lights(2));
    rig.run(code).expect("run");

    assert_eq!(
        rig.lights.all_commands(),
        vec![(
            "Light 1".to_string(),
            Action::SetColor {
                color: [21845, 65535, 32768, 3500],
                duration: 1000,
            }
        )]
    );
}

#[test]
fn group_and_all_fan_out() {
    let mut code = target(Operand::Group, "Group 2");
    code.extend([
        Instruction::set_reg(Register::Power, true),
        Instruction::bare(OpCode::Power),
        Instruction::set_reg(Register::Operand, Operand::All),
        Instruction::bare(OpCode::Color),
    ]);

    let mut rig = Rig::new(FakeLightSet::with_lights(4));
    rig.run(code).expect("run");

    let powered: Vec<String> = rig
        .lights
        .all_commands()
        .into_iter()
        .filter(|(_, action)| matches!(action, Action::SetPower { .. }))
        .map(|(name, _)| name)
        .collect();
    assert_eq!(powered, vec!["Light 2".to_string(), "Light 4".to_string()]);
    for light in rig.lights.lights() {
        assert!(light.commands().iter().any(|action| matches!(action, Action::SetColor { .. })));
    }
}

#[test]
#[traced_test]
fn unknown_group_is_reported_and_skipped() {
    let mut code = target(Operand::Group, "Group1");
    code.extend([
        Instruction::bare(OpCode::Color),
        Instruction::assign("reached", true),
    ]);

    let mut rig = Rig::new(FakeLightSet::with_lights(4));
    rig.run(code).expect("run");

    assert!(rig.lights.all_commands().is_empty());
    assert_eq!(rig.machine.variable("reached"), Ok(Value::Bool(true)));
    assert!(logs_contain("Unknown group: Group1"));
}

#[test]
#[traced_test]
fn missing_light_is_reported() {
    let mut code = target(Operand::Light, "Porch");
    code.push(Instruction::bare(OpCode::Power));

    let mut rig = Rig::new(FakeLightSet::with_lights(1));
    rig.run(code).expect("run");

    assert!(rig.lights.all_commands().is_empty());
    assert!(logs_contain("Light \"Porch\" not found."));
}

#[test]
fn zones_are_addressed_inclusively() {
    let lights = FakeLightSet::new();
    lights.add_multizone_light("Strip", "Shelf", "Den", [0; 4]);
    let mut code = target(Operand::MzLight, "Strip");
    code.extend(logical_color(0.0, 0.0, 100.0, 2700.0));
    code.extend([
        Instruction::set_reg(Register::FirstZone, 2),
        Instruction::set_reg(Register::LastZone, 4),
        Instruction::bare(OpCode::Color),
    ]);

    let mut rig = Rig::new(lights);
    rig.run(code).expect("run");

    let strip = rig.lights.light("Strip").expect("strip");
    assert_eq!(
        strip.commands(),
        vec![Action::SetZoneColor {
            first: 2,
            end: 5,
            color: [0, 0, 65535, 2700],
            duration: 0,
        }]
    );
    let zones = strip.zone_colors().expect("zones");
    assert_eq!(zones[1], [0; 4]);
    assert_eq!(zones[4], [0, 0, 65535, 2700]);
}

#[test]
#[traced_test]
fn single_zone_lights_refuse_zone_commands() {
    let mut code = target(Operand::MzLight, "Light 1");
    code.push(Instruction::bare(OpCode::Color));

    let mut rig = Rig::new(FakeLightSet::with_lights(1));
    rig.run(code).expect("run");

    assert!(rig.lights.all_commands().is_empty());
    assert!(logs_contain("is not multi-zone"));
}

#[test]
fn get_color_loads_registers_in_the_current_mode() {
    let lights = FakeLightSet::new();
    lights.add_light("Lamp", "g", "l", [32768, 65535, 65535, 4000]);
    let mut code = target(Operand::Light, "Lamp");
    code.push(Instruction::bare(OpCode::GetColor));

    let mut rig = Rig::new(lights);
    rig.run(code).expect("run");

    let [hue, saturation, brightness, kelvin] = rig.machine.color();
    assert_close(hue, 180.0);
    assert_close(saturation, 100.0);
    assert_close(brightness, 100.0);
    assert_close(kelvin, 4000.0);
}

#[test]
fn get_color_reads_one_zone() {
    let lights = FakeLightSet::new();
    let strip = lights.add_multizone_light("Strip", "g", "l", [0; 4]);
    strip.set_zone_color(3, 4, [100, 200, 300, 400], 0).expect("zone");
    let mut code = target(Operand::MzLight, "Strip");
    code.extend([
        Instruction::set_reg(Register::UnitMode, UnitMode::Raw),
        Instruction::set_reg(Register::FirstZone, 3),
        Instruction::bare(OpCode::GetColor),
    ]);

    let mut rig = Rig::new(lights);
    rig.run(code).expect("run");

    assert_eq!(rig.machine.color(), [100.0, 200.0, 300.0, 400.0]);
}

#[test]
fn unit_mode_switch_converts_live_registers() {
    let mut rig = Rig::new(FakeLightSet::new());
    rig.run(vec![
        Instruction::pushq(90),
        Instruction::pop(Param::Register(Register::Hue)),
        Instruction::set_reg(Register::Duration, 2.5),
        Instruction::set_reg(Register::UnitMode, UnitMode::Raw),
        Instruction::mov(Param::Register(Register::Hue), Param::var("h")),
        Instruction::mov(Param::Register(Register::Duration), Param::var("d")),
    ])
    .expect("run");

    assert_eq!(rig.machine.variable("h"), Ok(Value::Float(16384.0)));
    assert_eq!(rig.machine.variable("d"), Ok(Value::Float(2500.0)));
    assert_eq!(rig.machine.register(Register::UnitMode), Value::UnitMode(UnitMode::Raw));
}

#[test]
fn rgb_mode_round_trips_through_logical() {
    let mut code = logical_color(0.0, 100.0, 100.0, 0.0);
    code.push(Instruction::set_reg(Register::UnitMode, UnitMode::Rgb));
    let mut rig = Rig::new(FakeLightSet::new());
    rig.run(code).expect("run");

    let [red, green, blue, _] = rig.machine.color();
    assert_close(red, 100.0);
    assert_close(green, 0.0);
    assert_close(blue, 0.0);
}

#[test]
fn wait_uses_the_time_register() {
    let mut rig = Rig::new(FakeLightSet::new());
    rig.run(vec![
        Instruction::set_reg(Register::Time, 1.5),
        Instruction::bare(OpCode::Wait),
        Instruction::set_reg(Register::UnitMode, UnitMode::Raw),
        Instruction::set_reg(Register::Time, 250),
        Instruction::bare(OpCode::Wait),
        Instruction::set_reg(Register::Time, 0),
        Instruction::bare(OpCode::Wait),
    ])
    .expect("run");

    assert_eq!(rig.clock.pauses(), vec![1.5, 0.25]);
    let events = rig.clock.events();
    assert_eq!(events.first(), Some(&ClockEvent::Start));
    assert_eq!(events.last(), Some(&ClockEvent::Stop));
}

#[test]
fn wait_for_a_pattern_union() {
    let mut rig = Rig::new(FakeLightSet::new());
    rig.run(vec![
        time_pattern(SetOp::Init, "8:00"),
        time_pattern(SetOp::Union, "21:30"),
        Instruction::bare(OpCode::Wait),
    ])
    .expect("run");

    let mut expected = pattern("8:00");
    expected.union(&pattern("21:30"));
    assert!(rig.clock.events().contains(&ClockEvent::WaitUntil(expected)));
}

#[test]
fn out_buffers_until_a_line_break() {
    let mut rig = Rig::new(FakeLightSet::new());
    rig.run(vec![
        Instruction::set_reg(Register::Hue, 12),
        Instruction::unary(OpCode::Outq, Param::Value("hue".into())),
        Instruction::unary(OpCode::Out, Param::Register(Register::Hue)),
        Instruction::bare(OpCode::Outq),
        Instruction::unary(OpCode::Outq, Param::Value(Value::Int(2))),
        Instruction::bare(OpCode::Breakpoint),
    ])
    .expect("run");

    assert_eq!(rig.output.lines(), vec!["hue 12.0", "At breakpoint.", "2"]);
}

#[test]
fn pause_waits_for_a_key() {
    let mut rig = Rig::new(FakeLightSet::new()).with_keys("x!");
    rig.run(vec![
        Instruction::bare(OpCode::Pause),
        Instruction::bare(OpCode::Pause),
        Instruction::bare(OpCode::Pause),
        Instruction::assign("done", true),
    ])
    .expect("run");

    let text = rig.output.text();
    assert_eq!(text.matches("Press any key").count(), 2);
    assert_eq!(text.matches("Running...").count(), 2);
    assert_eq!(rig.machine.variable("done"), Ok(Value::Bool(true)));
}

#[test]
fn quitting_from_a_pause_stops_the_run() {
    let mut rig = Rig::new(FakeLightSet::new()).with_keys("q");
    rig.run(vec![
        Instruction::bare(OpCode::Pause),
        Instruction::assign("done", true),
    ])
    .expect("run");

    assert!(rig.machine.variable("done").is_err());
    assert!(rig.machine.stop_handle().is_stopped());
}

#[test]
fn pauses_can_be_disabled_by_config() {
    let config = VmConfig {
        enable_pause: false,
        ..VmConfig::default()
    };
    let mut rig = Rig::with_config(FakeLightSet::new(), config);
    rig.run(vec![Instruction::bare(OpCode::Pause)]).expect("run");
    assert!(rig.output.text().is_empty());
}

#[test]
fn stop_request_ends_an_endless_loop() {
    let mut rig = Rig::new(FakeLightSet::new());
    let handle = rig.machine.stop_handle();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        handle.stop();
    });
    rig.run(vec![
        Instruction::unary(OpCode::Loop, Param::Loop(LoopSpec::Infinite)),
        Instruction::bare(OpCode::Nop),
        Instruction::bare(OpCode::EndLoop),
    ])
    .expect("run");
    stopper.join().expect("stopper thread");
    assert!(rig.machine.stop_handle().is_stopped());
}

#[test]
fn reset_returns_to_initial_state() {
    let mut code = target(Operand::Light, "Light 1");
    code.extend(logical_color(10.0, 20.0, 30.0, 4000.0));
    code.extend([
        Instruction::assign("x", 1),
        Instruction::pushq(5),
        Instruction::unary(OpCode::Outq, Param::Value("pending".into())),
    ]);
    let mut rig = Rig::new(FakeLightSet::with_lights(1));
    rig.run(code.clone()).expect("run");

    rig.machine.reset();
    let first = rig.machine.registers().clone();
    rig.machine.reset();
    assert_eq!(rig.machine.registers(), &first);
    assert_eq!(rig.machine.register(Register::Hue), Value::Float(0.0));
    assert_eq!(rig.machine.register(Register::Name), Value::Null);
    assert!(rig.machine.variable("x").is_err());
    assert_eq!(rig.machine.pc(), 0);

    rig.run(code).expect("second run");
    assert_eq!(rig.output.lines(), vec!["pending", "pending"]);
}

#[test]
fn repeated_runs_leave_identical_state() {
    let mut code = logical_color(200.0, 40.0, 60.0, 3200.0);
    code.extend([
        Instruction::set_reg(Register::Duration, 2),
        Instruction::set_reg(Register::FirstZone, 1),
        Instruction::set_reg(Register::LastZone, 5),
        Instruction::set_reg(Register::Name, "Light 1"),
        Instruction::assign("level", 3),
        Instruction::new(OpCode::Constant, Param::var("cap"), Param::Value(Value::Int(9))),
        Instruction::counted_loop(Value::Int(1), Value::Int(3), Value::Int(1), Some("i")),
        Instruction::push(Param::var("level")),
        Instruction::push(Param::var("i")),
        Instruction::op(Operator::Mul),
        Instruction::pop(Param::var("level")),
        Instruction::bare(OpCode::EndLoop),
        time_pattern(SetOp::Init, "6:45"),
        Instruction::set_reg(Register::UnitMode, UnitMode::Raw),
        Instruction::pushq(5),
    ]);
    let names = ["level", "cap"];
    let mut rig = Rig::new(FakeLightSet::with_lights(2));
    let program = super::link(code);
    let snapshot = |rig: &Rig| {
        let bindings: Vec<_> = names.iter().map(|name| rig.machine.variable(name)).collect();
        (rig.machine.registers().clone(), bindings)
    };

    rig.machine.run(&program).expect("first run");
    let first = snapshot(&rig);
    rig.machine.reset();
    rig.machine.run(&program).expect("second run");
    let second = snapshot(&rig);

    assert_eq!(first, second);
    assert_eq!(first.1[0], Ok(Value::Int(18)));
    assert_eq!(first.1[1], Ok(Value::Int(9)));
    assert_eq!(first.0.unit_mode, UnitMode::Raw);
    assert!(rig.lights.all_commands().is_empty());
}

#[test]
fn null_operand_flushes_like_an_empty_outq() {
    let mut rig = Rig::new(FakeLightSet::new());
    rig.run(vec![
        Instruction::unary(OpCode::Outq, Param::Value("one".into())),
        Instruction::unary(OpCode::Outq, Param::Operand(Operand::Null)),
        Instruction::unary(OpCode::Outq, Param::Value("two".into())),
        Instruction::unary(OpCode::Outq, Param::Value(Value::Operand(Operand::Null))),
        Instruction::unary(OpCode::Outq, Param::Value("three".into())),
    ])
    .expect("run");

    assert_eq!(rig.output.lines(), vec!["one", "two", "three"]);
}

#[test]
#[traced_test]
fn zone_read_ignores_a_stale_last_zone() {
    let lights = FakeLightSet::new();
    let strip = lights.add_multizone_light("Strip", "g", "l", [0; 4]);
    strip.set_zone_color(6, 7, [600, 700, 800, 900], 0).expect("zone");
    let mut code = target(Operand::MzLight, "Strip");
    code.extend([
        Instruction::set_reg(Register::UnitMode, UnitMode::Raw),
        Instruction::set_reg(Register::FirstZone, 6),
        Instruction::set_reg(Register::LastZone, 2),
        Instruction::bare(OpCode::GetColor),
    ]);

    let mut rig = Rig::new(lights);
    rig.run(code).expect("run");

    assert_eq!(rig.machine.color(), [600.0, 700.0, 800.0, 900.0]);
    assert!(!logs_contain("invalid zone"));
}

#[test]
fn default_unit_mode_comes_from_config() {
    let config = VmConfig {
        default_unit_mode: UnitMode::Raw,
        ..VmConfig::default()
    };
    let mut rig = Rig::with_config(FakeLightSet::with_lights(1), config);
    let mut code = target(Operand::Light, "Light 1");
    code.extend([
        Instruction::set_reg(Register::Hue, 1000),
        Instruction::set_reg(Register::Duration, 750),
        Instruction::bare(OpCode::Color),
    ]);
    rig.run(code).expect("run");

    assert_eq!(
        rig.lights.all_commands(),
        vec![(
            "Light 1".to_string(),
            Action::SetColor {
                color: [1000, 0, 0, 0],
                duration: 750,
            }
        )]
    );
}

//=====================================================
// End of file
//=====================================================
