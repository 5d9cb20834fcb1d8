//=====================================================
// File: lib.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: LumaScript crate root
// Objective: Expose the virtual machine, its device and clock seams, unit
//            conversion and the simulated collaborators used offline
//=====================================================

pub mod bytecode;
pub mod clock;
pub mod config;
pub mod device;
pub mod error;
pub mod fakes;
pub mod io;
pub mod logging;
pub mod time_pattern;
pub mod units;
pub mod vm;

pub use config::VmConfig;
pub use error::{DeviceError, VmError, VmResult};
pub use time_pattern::TimePattern;
pub use vm::{Instruction, Loader, Machine, Program, RawProgram, Value};

//=====================================================
// End of file
//=====================================================
