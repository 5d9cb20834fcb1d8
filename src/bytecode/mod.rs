//=====================================================
// File: bytecode/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Bytecode rewriting passes run at link time
//=====================================================

pub mod peephole;

//=====================================================
// End of file
//=====================================================
