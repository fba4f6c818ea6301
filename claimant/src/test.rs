#![allow(dead_code)]

use std::sync::Mutex;

use claimant_clock::{TestClock, UnixTime};

use crate::diagnostic::{Diagnostic, DiagnosticSink};

/// 2023-11-06T21:37:34+00:00
pub const TS: i64 = 1_699_306_654;

pub fn fixed_clock() -> TestClock {
    TestClock::new(UnixTime(TS))
}

/// Remembers the message of every diagnostic it receives
#[derive(Debug, Default)]
pub struct Recorder {
    seen: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn messages(&self) -> Vec<String> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl DiagnosticSink for Recorder {
    fn notice(&self, diagnostic: &Diagnostic<'_>) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(diagnostic.to_string());
        }
    }
}
