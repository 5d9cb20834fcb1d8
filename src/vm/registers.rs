//=====================================================
// File: vm/registers.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: The machine's fixed register file
// Objective: Typed slots with by-enum access; unit-mode writes convert the
//            color and time slots in the same step
//=====================================================

use crate::error::{VmError, VmResult};
use crate::time_pattern::TimePattern;
use crate::units::{self, Color};

use super::codes::{Operand, Register, UnitMode};
use super::value::Value;

/// Contents of the `time` register.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeValue {
    Duration(f64),
    Pattern(TimePattern),
}

impl Default for TimeValue {
    fn default() -> Self {
        TimeValue::Duration(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Registers {
    pub hue: f64,
    pub saturation: f64,
    pub brightness: f64,
    pub kelvin: f64,
    pub duration: f64,
    pub first_zone: i64,
    pub last_zone: Option<i64>,
    pub power: bool,
    pub name: Option<String>,
    pub operand: Operand,
    pub time: TimeValue,
    pub result: Value,
    pub unit_mode: UnitMode,
}

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn color(&self) -> Color {
        [self.hue, self.saturation, self.brightness, self.kelvin]
    }

    pub fn store_color(&mut self, color: Color) {
        [self.hue, self.saturation, self.brightness, self.kelvin] = color;
    }

    pub fn raw_power(&self) -> u16 {
        units::power_raw(self.power)
    }

    pub fn get(&self, reg: Register) -> Value {
        match reg {
            Register::Hue => Value::Float(self.hue),
            Register::Saturation => Value::Float(self.saturation),
            Register::Brightness => Value::Float(self.brightness),
            Register::Kelvin => Value::Float(self.kelvin),
            Register::Duration => Value::Float(self.duration),
            Register::FirstZone => Value::Int(self.first_zone),
            Register::LastZone => self.last_zone.map_or(Value::Null, Value::Int),
            Register::Power => Value::Bool(self.power),
            Register::Name => self.name.clone().map_or(Value::Null, Value::Str),
            Register::Operand => Value::Operand(self.operand),
            Register::Time => match &self.time {
                TimeValue::Duration(seconds) => Value::Float(*seconds),
                TimeValue::Pattern(pattern) => Value::Pattern(pattern.clone()),
            },
            Register::Result => self.result.clone(),
            Register::UnitMode => Value::UnitMode(self.unit_mode),
        }
    }

    /// Writes a register. A unit-mode write converts the color, duration and
    /// time registers into the new mode before the mode itself changes.
    pub fn set(&mut self, reg: Register, value: Value) -> VmResult<()> {
        let mismatch = |value: &Value| VmError::TypeMismatch {
            register: reg,
            found: value.type_name().to_string(),
        };
        match reg {
            Register::Hue
            | Register::Saturation
            | Register::Brightness
            | Register::Kelvin
            | Register::Duration => {
                let number = value.as_f64().ok_or_else(|| mismatch(&value))?;
                match reg {
                    Register::Hue => self.hue = number,
                    Register::Saturation => self.saturation = number,
                    Register::Brightness => self.brightness = number,
                    Register::Kelvin => self.kelvin = number,
                    _ => self.duration = number,
                }
            }
            Register::FirstZone => {
                self.first_zone = value.as_i64().ok_or_else(|| mismatch(&value))?;
            }
            Register::LastZone => {
                self.last_zone = match value {
                    Value::Null => None,
                    other => Some(other.as_i64().ok_or_else(|| mismatch(&other))?),
                };
            }
            Register::Power => {
                self.power = match value {
                    Value::Bool(on) => on,
                    other if other.is_numeric() => other.is_truthy(),
                    other => return Err(mismatch(&other)),
                };
            }
            Register::Name => {
                self.name = match value {
                    Value::Null => None,
                    Value::Str(name) => Some(name),
                    other => return Err(mismatch(&other)),
                };
            }
            Register::Operand => {
                self.operand = match value {
                    Value::Null => Operand::Null,
                    Value::Operand(operand) => operand,
                    other => return Err(mismatch(&other)),
                };
            }
            Register::Time => {
                self.time = match value {
                    Value::Null => TimeValue::default(),
                    Value::Pattern(pattern) => TimeValue::Pattern(pattern),
                    other => TimeValue::Duration(other.as_f64().ok_or_else(|| mismatch(&other))?),
                };
            }
            Register::Result => self.result = value,
            Register::UnitMode => match value {
                Value::UnitMode(mode) => self.switch_unit_mode(mode),
                other => return Err(mismatch(&other)),
            },
        }
        Ok(())
    }

    pub fn switch_unit_mode(&mut self, to: UnitMode) {
        let from = self.unit_mode;
        if from == to {
            return;
        }
        self.store_color(units::convert_color(self.color(), from, to));
        self.duration = units::convert_time(self.duration, from, to);
        if let TimeValue::Duration(time) = self.time {
            self.time = TimeValue::Duration(units::convert_time(time, from, to));
        }
        self.unit_mode = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn by_enum_access_round_trips() {
        let mut reg = Registers::new();
        reg.set(Register::Hue, Value::Int(120)).expect("hue");
        reg.set(Register::Name, Value::from("Top")).expect("name");
        reg.set(Register::LastZone, Value::Int(7)).expect("zone");
        assert_eq!(reg.get(Register::Hue), Value::Int(120));
        assert_eq!(reg.get(Register::Name), Value::from("Top"));
        assert_eq!(reg.get(Register::LastZone), Value::Int(7));
        reg.set(Register::LastZone, Value::Null).expect("zone");
        assert_eq!(reg.last_zone, None);
    }

    #[test]
    fn rejects_wrong_types() {
        let mut reg = Registers::new();
        let err = reg.set(Register::Kelvin, Value::from("warm")).unwrap_err();
        assert_eq!(
            err,
            VmError::TypeMismatch {
                register: Register::Kelvin,
                found: "string".into()
            }
        );
        assert!(reg.set(Register::Operand, Value::Int(1)).is_err());
    }

    #[test]
    fn unit_mode_write_converts_everything_at_once() {
        let mut reg = Registers::new();
        reg.store_color([180.0, 100.0, 50.0, 2700.0]);
        reg.duration = 1.5;
        reg.time = TimeValue::Duration(2.0);
        reg.set(Register::UnitMode, Value::UnitMode(UnitMode::Raw))
            .expect("mode");
        assert_eq!(reg.color(), [32768.0, 65535.0, 32767.5, 2700.0]);
        assert_eq!(reg.duration, 1500.0);
        assert_eq!(reg.time, TimeValue::Duration(2000.0));
        assert_eq!(reg.unit_mode, UnitMode::Raw);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut reg = Registers::new();
        reg.power = true;
        reg.result = Value::Int(3);
        reg.switch_unit_mode(UnitMode::Rgb);
        reg.reset();
        assert_eq!(reg, Registers::default());
    }
}

//=====================================================
// End of file
//=====================================================
