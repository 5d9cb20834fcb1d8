//=====================================================
// File: vm/tests/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Shared fixtures for machine-level tests
//=====================================================

use std::sync::Arc;

use crate::config::VmConfig;
use crate::fakes::{CollectedOutput, FakeClock, FakeLightSet, ScriptedKeys};
use crate::vm::instruction::Instruction;
use crate::vm::loader::{self, Program};
use crate::vm::machine::Machine;
use crate::vm::symbol::SymbolTable;

mod expr_tests;
mod machine_tests;

pub(super) struct Rig {
    pub machine: Machine,
    pub lights: Arc<FakeLightSet>,
    pub clock: FakeClock,
    pub output: CollectedOutput,
}

impl Rig {
    pub fn new(lights: FakeLightSet) -> Self {
        Self::with_config(lights, VmConfig::default())
    }

    pub fn with_config(lights: FakeLightSet, config: VmConfig) -> Self {
        let lights = Arc::new(lights);
        let clock = FakeClock::new();
        let output = CollectedOutput::new();
        let machine = Machine::new(clock.clone(), lights.clone())
            .with_config(config)
            .with_output(output.clone())
            .with_keys(ScriptedKeys::new(""));
        Self {
            machine,
            lights,
            clock,
            output,
        }
    }

    pub fn with_keys(mut self, keys: &str) -> Self {
        self.machine = self.machine.with_keys(ScriptedKeys::new(keys));
        self
    }

    /// Links and runs `code`, panicking on a link error.
    pub fn run(&mut self, code: Vec<Instruction>) -> crate::error::VmResult<()> {
        let program = link(code);
        self.machine.run(&program)
    }
}

pub(super) fn link(code: Vec<Instruction>) -> Program {
    loader::load(code, &SymbolTable::new()).expect("link program")
}

pub(super) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 0.01,
        "expected {expected}, got {actual}"
    );
}

//=====================================================
// End of file
//=====================================================
