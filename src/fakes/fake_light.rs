//=====================================================
// File: fakes/fake_light.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: In-memory lights for tests and the developer CLI
// Objective: Record every device call so tests can assert on exactly what a
//            program asked the lights to do
//=====================================================

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::info;

use crate::device::{DeviceResult, DiscoveryFilter, Light, LightSet};
use crate::error::DeviceError;
use crate::units::RawColor;

pub const DEFAULT_ZONES: usize = 16;

/// One recorded device call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SetColor {
        color: RawColor,
        duration: u32,
    },
    GetColor,
    SetPower {
        power: u16,
        duration: u32,
    },
    GetPower,
    SetZoneColor {
        first: usize,
        end: usize,
        color: RawColor,
        duration: u32,
    },
    GetZoneColor {
        first: usize,
        end: usize,
    },
}

impl Action {
    pub fn is_get(&self) -> bool {
        matches!(
            self,
            Action::GetColor | Action::GetPower | Action::GetZoneColor { .. }
        )
    }
}

#[derive(Debug)]
pub struct FakeLight {
    name: String,
    group: String,
    location: String,
    color: Mutex<RawColor>,
    power: Mutex<u16>,
    zones: Option<Mutex<Vec<RawColor>>>,
    calls: Mutex<Vec<Action>>,
}

impl FakeLight {
    pub fn new(name: &str, group: &str, location: &str, color: RawColor) -> Self {
        Self {
            name: name.to_string(),
            group: group.to_string(),
            location: location.to_string(),
            color: Mutex::new(color),
            power: Mutex::new(0),
            zones: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn multizone(name: &str, group: &str, location: &str, color: RawColor) -> Self {
        Self {
            zones: Some(Mutex::new(vec![color; DEFAULT_ZONES])),
            ..Self::new(name, group, location, color)
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Current color without logging a call.
    pub fn color(&self) -> RawColor {
        *self.color.lock()
    }

    pub fn power(&self) -> u16 {
        *self.power.lock()
    }

    pub fn zone_colors(&self) -> Option<Vec<RawColor>> {
        self.zones.as_ref().map(|zones| zones.lock().clone())
    }

    pub fn calls(&self) -> Vec<Action> {
        self.calls.lock().clone()
    }

    /// Calls that change the light, skipping queries.
    pub fn commands(&self) -> Vec<Action> {
        self.calls.lock().iter().filter(|call| !call.is_get()).cloned().collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn log(&self, action: Action) {
        self.calls.lock().push(action);
    }

    fn zone_range(&self, zones: &[RawColor], first: usize, end: usize) -> DeviceResult<()> {
        if first > end || end > zones.len() {
            return Err(DeviceError::Rejected {
                name: self.name.clone(),
                reason: format!("zones {first}..{end} out of range"),
            });
        }
        Ok(())
    }
}

impl Light for FakeLight {
    fn label(&self) -> String {
        self.name.clone()
    }

    fn set_color(&self, color: RawColor, duration_ms: u32) -> DeviceResult<()> {
        info!(target: "lumascript::fakes", "set color for \"{}\": {color:?}, {duration_ms}", self.name);
        *self.color.lock() = color;
        if let Some(zones) = &self.zones {
            zones.lock().fill(color);
        }
        self.log(Action::SetColor {
            color,
            duration: duration_ms,
        });
        Ok(())
    }

    fn get_color(&self) -> DeviceResult<RawColor> {
        self.log(Action::GetColor);
        Ok(self.color())
    }

    fn set_power(&self, power: u16, duration_ms: u32) -> DeviceResult<()> {
        *self.power.lock() = power;
        self.log(Action::SetPower {
            power,
            duration: duration_ms,
        });
        Ok(())
    }

    fn get_power(&self) -> DeviceResult<u16> {
        self.log(Action::GetPower);
        Ok(self.power())
    }

    fn supports_multizone(&self) -> bool {
        self.zones.is_some()
    }

    fn set_zone_color(
        &self,
        first: usize,
        end: usize,
        color: RawColor,
        duration_ms: u32,
    ) -> DeviceResult<()> {
        let Some(zones) = &self.zones else {
            return Err(DeviceError::Rejected {
                name: self.name.clone(),
                reason: "not a multi-zone light".into(),
            });
        };
        let mut zones = zones.lock();
        self.zone_range(&zones, first, end)?;
        zones[first..end].fill(color);
        self.log(Action::SetZoneColor {
            first,
            end,
            color,
            duration: duration_ms,
        });
        Ok(())
    }

    fn get_color_zones(&self, first: usize, end: usize) -> DeviceResult<Vec<RawColor>> {
        let Some(zones) = &self.zones else {
            return Err(DeviceError::Rejected {
                name: self.name.clone(),
                reason: "not a multi-zone light".into(),
            });
        };
        let zones = zones.lock();
        self.zone_range(&zones, first, end)?;
        self.log(Action::GetZoneColor { first, end });
        Ok(zones[first..end].to_vec())
    }
}

/// A light set living entirely in memory. Lights keep the order they were
/// added in.
#[derive(Debug, Default)]
pub struct FakeLightSet {
    lights: RwLock<Vec<Arc<FakeLight>>>,
    fail_discovery: Mutex<bool>,
}

impl FakeLightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// `count` lights named "Light 1".."Light N", split over two groups and
    /// two locations.
    pub fn with_lights(count: usize) -> Self {
        let set = Self::new();
        for index in 1..=count {
            let group = if index % 2 == 1 { "Group 1" } else { "Group 2" };
            let location = if index <= count.div_ceil(2) { "Upstairs" } else { "Downstairs" };
            set.add_light(&format!("Light {index}"), group, location, [0, 0, 0, 2700]);
        }
        set
    }

    pub fn add_light(&self, name: &str, group: &str, location: &str, color: RawColor) -> Arc<FakeLight> {
        self.insert(FakeLight::new(name, group, location, color))
    }

    pub fn add_multizone_light(
        &self,
        name: &str,
        group: &str,
        location: &str,
        color: RawColor,
    ) -> Arc<FakeLight> {
        self.insert(FakeLight::multizone(name, group, location, color))
    }

    fn insert(&self, light: FakeLight) -> Arc<FakeLight> {
        let light = Arc::new(light);
        let mut lights = self.lights.write();
        lights.retain(|existing| existing.name != light.name);
        lights.push(Arc::clone(&light));
        light
    }

    pub fn clear_lights(&self) {
        self.lights.write().clear();
    }

    /// Typed access for assertions.
    pub fn light(&self, name: &str) -> Option<Arc<FakeLight>> {
        self.lights.read().iter().find(|light| light.name == name).cloned()
    }

    pub fn lights(&self) -> Vec<Arc<FakeLight>> {
        self.lights.read().clone()
    }

    /// Every command sent to any light, in light order.
    pub fn all_commands(&self) -> Vec<(String, Action)> {
        self.lights
            .read()
            .iter()
            .flat_map(|light| light.commands().into_iter().map(|action| (light.name.clone(), action)))
            .collect()
    }

    /// Makes every later discovery pass fail as if the network timed out.
    pub fn fail_discovery(&self, fail: bool) {
        *self.fail_discovery.lock() = fail;
    }

    fn members(&self, matches: impl Fn(&FakeLight) -> bool) -> Option<Vec<String>> {
        let names: Vec<String> = self
            .lights
            .read()
            .iter()
            .filter(|light| matches(light))
            .map(|light| light.name.clone())
            .collect();
        (!names.is_empty()).then_some(names)
    }

    fn distinct(&self, key: impl Fn(&FakeLight) -> &str) -> Vec<String> {
        self.lights
            .read()
            .iter()
            .map(|light| key(light).to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl LightSet for FakeLightSet {
    fn get_light(&self, name: &str) -> Option<Arc<dyn Light>> {
        self.light(name).map(|light| light as Arc<dyn Light>)
    }

    fn get_group(&self, name: &str) -> Option<Vec<String>> {
        self.members(|light| light.group == name)
    }

    fn get_location(&self, name: &str) -> Option<Vec<String>> {
        self.members(|light| light.location == name)
    }

    fn light_names(&self) -> Vec<String> {
        self.lights.read().iter().map(|light| light.name.clone()).collect()
    }

    fn group_names(&self) -> Vec<String> {
        self.distinct(|light| light.group.as_str())
    }

    fn location_names(&self) -> Vec<String> {
        self.distinct(|light| light.location.as_str())
    }

    fn discover(
        &self,
        filter: Option<&DiscoveryFilter>,
        _timeout: Duration,
    ) -> DeviceResult<Vec<Arc<dyn Light>>> {
        if *self.fail_discovery.lock() {
            return Err(DeviceError::Discovery("no response before timeout".into()));
        }
        Ok(self
            .lights
            .read()
            .iter()
            .filter(|light| match filter {
                None => true,
                Some(DiscoveryFilter::Group(name)) => &light.group == name,
                Some(DiscoveryFilter::Location(name)) => &light.location == name,
            })
            .map(|light| Arc::clone(light) as Arc<dyn Light>)
            .collect())
    }

    fn set_color_all(&self, color: RawColor, duration_ms: u32) -> DeviceResult<()> {
        for light in self.lights() {
            light.set_color(color, duration_ms)?;
        }
        Ok(())
    }

    fn set_power_all(&self, power: u16, duration_ms: u32) -> DeviceResult<()> {
        for light in self.lights() {
            light.set_power(power, duration_ms)?;
        }
        Ok(())
    }
}


//=====================================================
// End of file
//=====================================================
