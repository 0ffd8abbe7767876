//! macOS key synthesis via the CGEvent API
//!
//! Each event carries explicit modifier flags for the modifiers this sink
//! currently holds, so Caps Lock or stuck physical modifiers cannot change
//! the chord the target application sees.
//!
//! Requires Accessibility permissions:
//!   System Settings > Privacy & Security > Accessibility

use super::KeySink;
use crate::error::SynthError;
use crate::hotkey::NativeKeyCode;
use core_graphics::event::{CGEvent, CGEventFlags, CGEventTapLocation, CGKeyCode};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};

// kVK_Command, kVK_Control, kVK_Option, kVK_Shift
const MODIFIER_FLAGS: [(u32, CGEventFlags); 4] = [
    (0x37, CGEventFlags::CGEventFlagCommand),
    (0x3B, CGEventFlags::CGEventFlagControl),
    (0x3A, CGEventFlags::CGEventFlagAlternate),
    (0x38, CGEventFlags::CGEventFlagShift),
];

/// CGEvent-based key sink
#[derive(Debug)]
pub struct CgEventSink {
    flags: CGEventFlags,
}

impl Default for CgEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl CgEventSink {
    pub fn new() -> Self {
        Self {
            flags: CGEventFlags::CGEventFlagNull,
        }
    }

    fn flag_for(code: NativeKeyCode) -> Option<CGEventFlags> {
        MODIFIER_FLAGS
            .iter()
            .find(|(c, _)| *c == code.0)
            .map(|(_, flag)| *flag)
    }

    fn post(&self, code: NativeKeyCode, key_down: bool) -> Result<(), SynthError> {
        let keycode = CGKeyCode::try_from(code.0)
            .map_err(|_| SynthError::Simulate(format!("key code {} out of range", code)))?;
        let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState)
            .map_err(|_| SynthError::Simulate("Failed to create CGEventSource".into()))?;
        let event = CGEvent::new_keyboard_event(source, keycode, key_down)
            .map_err(|_| SynthError::Simulate("Failed to create keyboard event".into()))?;

        // Always set flags explicitly, CGEventFlagNull when nothing is held
        event.set_flags(self.flags);
        event.post(CGEventTapLocation::HID);
        Ok(())
    }
}

impl KeySink for CgEventSink {
    fn press(&mut self, code: NativeKeyCode) -> Result<(), SynthError> {
        if let Some(flag) = Self::flag_for(code) {
            self.flags.insert(flag);
        }
        self.post(code, true)
    }

    fn release(&mut self, code: NativeKeyCode) -> Result<(), SynthError> {
        if let Some(flag) = Self::flag_for(code) {
            self.flags.remove(flag);
        }
        self.post(code, false)
    }

    fn name(&self) -> &'static str {
        "cgevent"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_flags() {
        assert_eq!(
            CgEventSink::flag_for(NativeKeyCode(0x37)),
            Some(CGEventFlags::CGEventFlagCommand)
        );
        assert_eq!(CgEventSink::flag_for(NativeKeyCode(0x09)), None);
    }
}
