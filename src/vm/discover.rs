//=====================================================
// File: vm/discover.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Device discovery cursors behind DISC/DISCM/DNEXT/DNEXTM
// Objective: Snapshot an enumeration once per pass and hand out one name per
//            step; collaborator failures become an empty enumeration
//=====================================================

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, warn};

use crate::device::{DiscoveryFilter, LightSet};

use super::codes::Operand;

#[derive(Debug, Clone, PartialEq)]
struct Cursor {
    filter: Option<DiscoveryFilter>,
    names: Vec<String>,
    position: usize,
}

impl Cursor {
    fn current(&self) -> Option<String> {
        self.names.get(self.position).cloned()
    }

    fn is_exhausted(&self) -> bool {
        self.position >= self.names.len()
    }
}

/// One cursor per binding target, so nested passes with different targets do
/// not disturb each other.
#[derive(Debug, Clone)]
pub struct VmDiscover {
    cursors: HashMap<String, Cursor>,
    timeout: Duration,
}

impl VmDiscover {
    pub fn new(timeout: Duration) -> Self {
        Self {
            cursors: HashMap::new(),
            timeout,
        }
    }

    pub fn reset(&mut self) {
        self.cursors.clear();
    }

    pub fn is_exhausted(&self, target: &str) -> bool {
        self.cursors.get(target).map_or(true, Cursor::is_exhausted)
    }

    /// Starts a pass over every light, group or location and returns the first
    /// name.
    pub fn disc(&mut self, kind: Operand, target: &str, lights: &dyn LightSet) -> Option<String> {
        let names = match kind {
            Operand::Light => self.discover_names(lights, None, false),
            Operand::MzLight => self.discover_names(lights, None, true),
            Operand::Group => lights.group_names(),
            Operand::Location => lights.location_names(),
            Operand::All | Operand::Null => {
                warn!(target: "lumascript::vm", "cannot discover devices of kind {kind:?}");
                Vec::new()
            }
        };
        self.start(target, None, names)
    }

    /// Starts a pass over the lights of one group or location.
    pub fn discm(
        &mut self,
        filter: DiscoveryFilter,
        target: &str,
        lights: &dyn LightSet,
    ) -> Option<String> {
        let names = self.discover_names(lights, Some(&filter), false);
        self.start(target, Some(filter), names)
    }

    pub fn dnext(&mut self, target: &str) -> Option<String> {
        let Some(cursor) = self.cursors.get_mut(target) else {
            warn!(target: "lumascript::vm", "no discovery in progress for \"{target}\"");
            return None;
        };
        if !cursor.is_exhausted() {
            cursor.position += 1;
        }
        cursor.current()
    }

    /// Advances a member pass. A scope that differs from the one the pass
    /// started with ends the pass.
    pub fn dnextm(&mut self, filter: &DiscoveryFilter, target: &str) -> Option<String> {
        match self.cursors.get(target) {
            Some(cursor) if cursor.filter.as_ref() != Some(filter) => {
                warn!(
                    target: "lumascript::vm",
                    "discovery for \"{target}\" was not started over {filter}"
                );
                None
            }
            _ => self.dnext(target),
        }
    }

    fn start(&mut self, target: &str, filter: Option<DiscoveryFilter>, names: Vec<String>) -> Option<String> {
        debug!(target: "lumascript::vm", "discovered {} device(s) for \"{target}\"", names.len());
        let cursor = Cursor {
            filter,
            names,
            position: 0,
        };
        let first = cursor.current();
        self.cursors.insert(target.to_string(), cursor);
        first
    }

    fn discover_names(
        &self,
        lights: &dyn LightSet,
        filter: Option<&DiscoveryFilter>,
        multizone_only: bool,
    ) -> Vec<String> {
        match lights.discover(filter, self.timeout) {
            Ok(found) => found
                .iter()
                .filter(|light| !multizone_only || light.supports_multizone())
                .map(|light| light.label())
                .collect(),
            Err(err) => {
                warn!(target: "lumascript::vm", "discovery failed: {err}");
                Vec::new()
            }
        }
    }
}


//=====================================================
// End of file
//=====================================================
