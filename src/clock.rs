//=====================================================
// File: clock.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Time source behind WAIT
// Objective: A cue-based wall clock so consecutive pauses do not accumulate
//            drift, plus waiting for the next minute a time pattern accepts
//=====================================================

use std::thread;
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::{debug, warn};

use crate::time_pattern::TimePattern;

pub trait Clock: Send {
    fn start(&mut self);
    fn stop(&mut self);

    /// Sleeps `seconds` past the previous cue and advances the cue.
    fn pause_for(&mut self, seconds: f64);

    /// Sleeps until the next minute accepted by `pattern`.
    fn wait_until(&mut self, pattern: &TimePattern);
}

/// Wall clock backed by `std::thread::sleep` and the local time zone.
#[derive(Debug, Default)]
pub struct SystemClock {
    cue: Option<Instant>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }

    fn sleep_until(deadline: Instant) {
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        }
    }
}

impl Clock for SystemClock {
    fn start(&mut self) {
        self.cue = Some(Instant::now());
    }

    fn stop(&mut self) {
        self.cue = None;
    }

    fn pause_for(&mut self, seconds: f64) {
        if !seconds.is_finite() || seconds <= 0.0 {
            return;
        }
        let start = self.cue.unwrap_or_else(Instant::now);
        let Some(cue) = Duration::try_from_secs_f64(seconds)
            .ok()
            .and_then(|delay| start.checked_add(delay))
        else {
            warn!(target: "lumascript::clock", "pause of {seconds} s is out of range; skipped");
            return;
        };
        Self::sleep_until(cue);
        self.cue = Some(cue);
    }

    fn wait_until(&mut self, pattern: &TimePattern) {
        let now = Local::now().naive_local();
        let Some(next) = pattern.next_match(now) else {
            warn!(target: "lumascript::clock", "time pattern {pattern} never matches");
            return;
        };
        debug!(target: "lumascript::clock", "waiting until {next}");
        match (next - now).to_std() {
            Ok(delay) => thread::sleep(delay),
            Err(_) => warn!(target: "lumascript::clock", "next match {next} is in the past"),
        }
        self.cue = Some(Instant::now());
    }
}


//=====================================================
// End of file
//=====================================================
