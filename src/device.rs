//=====================================================
// File: device.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Device-addressing interface the machine drives
// Objective: Small object-safe traits for a single light and for the set of
//            lights, groups and locations visible on the network
//=====================================================

//! Lights are addressed by name. Groups and locations are named collections of
//! light names. Every value crossing these traits is already in RAW units:
//! colors are four 16-bit channels and durations are milliseconds.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::DeviceError;
use crate::units::RawColor;

pub type DeviceResult<T> = Result<T, DeviceError>;

/// One addressable light.
pub trait Light: Send + Sync {
    fn label(&self) -> String;
    fn set_color(&self, color: RawColor, duration_ms: u32) -> DeviceResult<()>;
    fn get_color(&self) -> DeviceResult<RawColor>;
    fn set_power(&self, power: u16, duration_ms: u32) -> DeviceResult<()>;
    fn get_power(&self) -> DeviceResult<u16>;

    fn supports_multizone(&self) -> bool {
        false
    }

    /// Colors zones `first..end`.
    fn set_zone_color(
        &self,
        first: usize,
        end: usize,
        color: RawColor,
        duration_ms: u32,
    ) -> DeviceResult<()> {
        let _ = (first, end, color, duration_ms);
        Err(DeviceError::Rejected {
            name: self.label(),
            reason: "not a multi-zone light".into(),
        })
    }

    /// Colors of zones `first..end`.
    fn get_color_zones(&self, first: usize, end: usize) -> DeviceResult<Vec<RawColor>> {
        let _ = (first, end);
        Err(DeviceError::Rejected {
            name: self.label(),
            reason: "not a multi-zone light".into(),
        })
    }
}

/// Restricts a discovery pass to the members of one collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DiscoveryFilter {
    Group(String),
    Location(String),
}

impl fmt::Display for DiscoveryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryFilter::Group(name) => write!(f, "group \"{name}\""),
            DiscoveryFilter::Location(name) => write!(f, "location \"{name}\""),
        }
    }
}

/// Everything the machine can see on the network.
pub trait LightSet: Send + Sync {
    fn get_light(&self, name: &str) -> Option<Arc<dyn Light>>;

    /// Member names of a group, `None` if the group is unknown.
    fn get_group(&self, name: &str) -> Option<Vec<String>>;

    /// Member names of a location, `None` if the location is unknown.
    fn get_location(&self, name: &str) -> Option<Vec<String>>;

    fn light_names(&self) -> Vec<String>;
    fn group_names(&self) -> Vec<String>;
    fn location_names(&self) -> Vec<String>;

    /// Blocks until the lights matching `filter` have answered or `timeout`
    /// has elapsed, and returns them in a stable order.
    fn discover(
        &self,
        filter: Option<&DiscoveryFilter>,
        timeout: Duration,
    ) -> DeviceResult<Vec<Arc<dyn Light>>>;

    fn set_color_all(&self, color: RawColor, duration_ms: u32) -> DeviceResult<()>;
    fn set_power_all(&self, power: u16, duration_ms: u32) -> DeviceResult<()>;
}

//=====================================================
// End of file
//=====================================================
