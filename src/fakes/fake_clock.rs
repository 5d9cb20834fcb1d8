//=====================================================
// File: fakes/fake_clock.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Non-blocking stand-ins for the clock and the console
//=====================================================

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::clock::Clock;
use crate::io::{KeyReader, TextOutput};
use crate::time_pattern::TimePattern;

#[derive(Debug, Clone, PartialEq)]
pub enum ClockEvent {
    Start,
    Stop,
    Pause(f64),
    WaitUntil(TimePattern),
}

/// Records what the machine asked of the clock and returns immediately.
/// Clones share one event log.
#[derive(Debug, Clone, Default)]
pub struct FakeClock {
    events: Arc<Mutex<Vec<ClockEvent>>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ClockEvent> {
        self.events.lock().clone()
    }

    pub fn pauses(&self) -> Vec<f64> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ClockEvent::Pause(seconds) => Some(*seconds),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: ClockEvent) {
        self.events.lock().push(event);
    }
}

impl Clock for FakeClock {
    fn start(&mut self) {
        self.record(ClockEvent::Start);
    }

    fn stop(&mut self) {
        self.record(ClockEvent::Stop);
    }

    fn pause_for(&mut self, seconds: f64) {
        self.record(ClockEvent::Pause(seconds));
    }

    fn wait_until(&mut self, pattern: &TimePattern) {
        self.record(ClockEvent::WaitUntil(pattern.clone()));
    }
}

/// Plays back a fixed sequence of keystrokes.
#[derive(Debug, Clone, Default)]
pub struct ScriptedKeys {
    keys: VecDeque<char>,
}

impl ScriptedKeys {
    pub fn new(keys: &str) -> Self {
        Self {
            keys: keys.chars().collect(),
        }
    }
}

impl KeyReader for ScriptedKeys {
    fn read_char(&mut self) -> Option<char> {
        self.keys.pop_front()
    }
}

/// Collects printed text in memory. Clones share one buffer.
#[derive(Debug, Clone, Default)]
pub struct CollectedOutput {
    text: Arc<Mutex<String>>,
}

impl CollectedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        self.text.lock().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.text.lock().lines().map(str::to_string).collect()
    }
}

impl TextOutput for CollectedOutput {
    fn write_text(&mut self, text: &str) {
        self.text.lock().push_str(text);
    }
}

//=====================================================
// End of file
//=====================================================
