//=====================================================
// File: fakes/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Simulated collaborators for tests and offline runs
//=====================================================

pub mod fake_clock;
pub mod fake_light;

pub use fake_clock::{ClockEvent, CollectedOutput, FakeClock, ScriptedKeys};
pub use fake_light::{Action, FakeLight, FakeLightSet};

//=====================================================
// End of file
//=====================================================
