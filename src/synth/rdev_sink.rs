//! Key synthesis through rdev
//!
//! Native codes are passed as `Key::Unknown(code)`, which rdev forwards
//! untranslated: XTest keycodes on X11, virtual-key codes on Windows and
//! CGKeyCodes on macOS.

use super::KeySink;
use crate::error::SynthError;
use crate::hotkey::NativeKeyCode;
use rdev::{simulate, EventType, Key};

/// Posts key events with `rdev::simulate`
#[derive(Debug, Default)]
pub struct RdevSink;

impl RdevSink {
    pub fn new() -> Self {
        Self
    }

    fn post(&self, event_type: EventType) -> Result<(), SynthError> {
        simulate(&event_type).map_err(|_| {
            SynthError::Simulate(format!(
                "could not send {:?}. Is a display server available?",
                event_type
            ))
        })
    }
}

impl KeySink for RdevSink {
    fn press(&mut self, code: NativeKeyCode) -> Result<(), SynthError> {
        self.post(EventType::KeyPress(Key::Unknown(code.0)))
    }

    fn release(&mut self, code: NativeKeyCode) -> Result<(), SynthError> {
        self.post(EventType::KeyRelease(Key::Unknown(code.0)))
    }

    fn name(&self) -> &'static str {
        "rdev"
    }
}
