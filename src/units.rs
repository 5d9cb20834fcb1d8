//=====================================================
// File: units.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Conversions between the LOGICAL, RAW and RGB unit domains
// Objective: Keep color and time registers consistent when the unit mode
//            changes and when values cross the device boundary
//=====================================================

//! Unit conversion.
//!
//! | domain  | hue     | saturation / brightness | kelvin | time |
//! |---------|---------|-------------------------|--------|------|
//! | LOGICAL | 0–360   | 0–100                   | as-is  | s    |
//! | RAW     | 0–65535 | 0–65535                 | as-is  | ms   |
//! | RGB     | red 0–100, green 0–100, blue 0–100 | –   | s    |
//!
//! Everything here is plain `f64` arithmetic. Rounding to device integers
//! happens once, in [`to_device_color`], right before a command is sent.

use crate::vm::codes::UnitMode;

/// Four color channels in whatever domain the caller is working in.
pub type Color = [f64; 4];

/// Color as the device interface receives it.
pub type RawColor = [u16; 4];

pub const RAW_MAX: f64 = 65535.0;
const HUE_STEPS: f64 = 65536.0;

pub const POWER_ON: u16 = 65535;
pub const POWER_OFF: u16 = 0;

pub fn power_raw(on: bool) -> u16 {
    if on { POWER_ON } else { POWER_OFF }
}

pub fn power_logical(raw: u16) -> bool {
    raw != POWER_OFF
}

pub fn time_raw(seconds: f64) -> f64 {
    seconds * 1000.0
}

pub fn time_logical(millis: f64) -> f64 {
    millis / 1000.0
}

pub fn logical_to_raw(color: Color) -> Color {
    let [hue, saturation, brightness, kelvin] = color;
    [
        hue.rem_euclid(360.0) * HUE_STEPS / 360.0,
        saturation * RAW_MAX / 100.0,
        brightness * RAW_MAX / 100.0,
        kelvin,
    ]
}

pub fn raw_to_logical(color: Color) -> Color {
    let [hue, saturation, brightness, kelvin] = color;
    [
        hue * 360.0 / HUE_STEPS,
        saturation * 100.0 / RAW_MAX,
        brightness * 100.0 / RAW_MAX,
        kelvin,
    ]
}

/// RGB has no color temperature, so kelvin is forced to zero.
pub fn rgb_to_raw(color: Color) -> Color {
    let [red, green, blue, _] = color;
    let (hue, saturation, value) = rgb_to_hsv(red / 100.0, green / 100.0, blue / 100.0);
    logical_to_raw([hue, saturation * 100.0, value * 100.0, 0.0])
}

/// The fourth channel passes through untouched; it is ignored in RGB mode.
pub fn raw_to_rgb(color: Color) -> Color {
    let [hue, saturation, brightness, kelvin] = raw_to_logical(color);
    let (red, green, blue) = hsv_to_rgb(hue, saturation / 100.0, brightness / 100.0);
    [red * 100.0, green * 100.0, blue * 100.0, kelvin]
}

pub fn logical_to_rgb(color: Color) -> Color {
    raw_to_rgb(logical_to_raw(color))
}

pub fn rgb_to_logical(color: Color) -> Color {
    raw_to_logical(rgb_to_raw(color))
}

/// Converts a color between any two modes.
pub fn convert_color(color: Color, from: UnitMode, to: UnitMode) -> Color {
    match (from, to) {
        (UnitMode::Logical, UnitMode::Raw) => logical_to_raw(color),
        (UnitMode::Logical, UnitMode::Rgb) => logical_to_rgb(color),
        (UnitMode::Raw, UnitMode::Logical) => raw_to_logical(color),
        (UnitMode::Raw, UnitMode::Rgb) => raw_to_rgb(color),
        (UnitMode::Rgb, UnitMode::Raw) => rgb_to_raw(color),
        (UnitMode::Rgb, UnitMode::Logical) => rgb_to_logical(color),
        _ => color,
    }
}

/// Only RAW counts time in milliseconds; LOGICAL and RGB both use seconds.
pub fn convert_time(value: f64, from: UnitMode, to: UnitMode) -> f64 {
    match (from == UnitMode::Raw, to == UnitMode::Raw) {
        (false, true) => time_raw(value),
        (true, false) => time_logical(value),
        _ => value,
    }
}

/// Rounds a RAW color to device integers. Hue wraps around the color wheel,
/// the other channels are clamped. The flag reports whether anything had to
/// be clamped.
pub fn to_device_color(color: Color) -> (RawColor, bool) {
    let [hue, saturation, brightness, kelvin] = color;
    let mut clamped = false;
    let mut channel = |value: f64| -> u16 {
        let rounded = value.round();
        if !(0.0..=RAW_MAX).contains(&rounded) {
            clamped = true;
        }
        rounded.clamp(0.0, RAW_MAX) as u16
    };
    let device = [
        hue.round().rem_euclid(HUE_STEPS) as u16,
        channel(saturation),
        channel(brightness),
        channel(kelvin),
    ];
    (device, clamped)
}

/// Rounds a RAW duration in milliseconds, clamped to what devices accept.
pub fn to_device_duration(millis: f64) -> (u32, bool) {
    let rounded = millis.round();
    let max = f64::from(u32::MAX);
    let clamped = !(0.0..=max).contains(&rounded);
    (rounded.clamp(0.0, max) as u32, clamped)
}

pub fn from_device_color(color: RawColor) -> Color {
    color.map(f64::from)
}

fn rgb_to_hsv(red: f64, green: f64, blue: f64) -> (f64, f64, f64) {
    let max = red.max(green).max(blue);
    let min = red.min(green).min(blue);
    let delta = max - min;
    let hue = if delta == 0.0 {
        0.0
    } else if max == red {
        60.0 * ((green - blue) / delta).rem_euclid(6.0)
    } else if max == green {
        60.0 * ((blue - red) / delta + 2.0)
    } else {
        60.0 * ((red - green) / delta + 4.0)
    };
    let saturation = if max == 0.0 { 0.0 } else { delta / max };
    (hue, saturation, max)
}

fn hsv_to_rgb(hue: f64, saturation: f64, value: f64) -> (f64, f64, f64) {
    let chroma = value * saturation;
    let sector = hue.rem_euclid(360.0) / 60.0;
    let x = chroma * (1.0 - (sector.rem_euclid(2.0) - 1.0).abs());
    let (red, green, blue) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let offset = value - chroma;
    (red + offset, green + offset, blue + offset)
}


//=====================================================
// End of file
//=====================================================
