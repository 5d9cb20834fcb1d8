//=====================================================
// File: vm/symbol.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Named entities the loader classifies before linking
//=====================================================

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SymbolKind {
    Extern,
    Macro,
    NoType,
    Param,
    Routine,
    Unknown,
    Var,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    #[serde(default)]
    pub value: Value,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, value: Value) -> Self {
        Self {
            name: name.into(),
            kind,
            value,
        }
    }

    pub fn routine(name: impl Into<String>, address: usize) -> Self {
        Self::new(name, SymbolKind::Routine, Value::Int(address as i64))
    }

    /// Entry address of a routine symbol.
    pub fn address(&self) -> Option<usize> {
        match (self.kind, &self.value) {
            (SymbolKind::Routine, Value::Int(address)) => usize::try_from(*address).ok(),
            _ => None,
        }
    }

    /// Symbols whose value is bound into the global scope at the start of a run.
    pub fn is_global_binding(&self) -> bool {
        matches!(self.kind, SymbolKind::Var | SymbolKind::Extern) && !matches!(self.value, Value::Null)
    }
}

/// Name → symbol table shared between the loader and its caller.
pub type SymbolTable = HashMap<String, Symbol>;


//=====================================================
// End of file
//=====================================================
