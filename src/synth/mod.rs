//! Synthetic keystrokes
//!
//! Sends key combinations such as select-all, cut and paste to the
//! foreground application. A combo is pressed in a fixed order with short
//! settle pauses between events:
//!
//! ```text
//! press(mod1) settle press(mod2) settle press(key) settle chord-settle
//! release(key) settle release(mod2) settle release(mod1) settle trailing
//! ```
//!
//! Some input queues drop or reorder synthetic events that arrive together,
//! so the pauses are part of the contract. They are real blocking sleeps.

pub mod rdev_sink;

#[cfg(target_os = "macos")]
pub mod cgevent;

use crate::error::SynthError;
use crate::hotkey::{HotkeySpec, KeyCodeTable, Modifier, NativeKeyCode, Platform};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

/// Pause after every synthetic event
pub const MODIFIER_SETTLE: Duration = Duration::from_millis(10);

/// Pause after the main key goes down, so the OS sees the whole chord
pub const CHORD_SETTLE: Duration = Duration::from_millis(50);

/// Pause before `send` returns, unless an inter-operation delay is configured
pub const TRAILING_DELAY: Duration = Duration::from_millis(50);

/// Destination for synthetic key events
pub trait KeySink: Send {
    fn press(&mut self, code: NativeKeyCode) -> Result<(), SynthError>;

    fn release(&mut self, code: NativeKeyCode) -> Result<(), SynthError>;

    /// Block for `duration`
    fn pause(&mut self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

impl<S: KeySink + ?Sized> KeySink for Box<S> {
    fn press(&mut self, code: NativeKeyCode) -> Result<(), SynthError> {
        (**self).press(code)
    }

    fn release(&mut self, code: NativeKeyCode) -> Result<(), SynthError> {
        (**self).release(code)
    }

    fn pause(&mut self, duration: Duration) {
        (**self).pause(duration)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// One emitted step of a combo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthStep {
    Press(NativeKeyCode),
    Release(NativeKeyCode),
    Pause(Duration),
}

impl fmt::Display for SynthStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthStep::Press(code) => write!(f, "press   {}", code),
            SynthStep::Release(code) => write!(f, "release {}", code),
            SynthStep::Pause(d) => write!(f, "sleep   {}ms", d.as_millis()),
        }
    }
}

/// Records steps instead of sending them
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    steps: Vec<SynthStep>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[SynthStep] {
        &self.steps
    }

    /// Key events only, pauses dropped
    pub fn key_events(&self) -> Vec<SynthStep> {
        self.steps
            .iter()
            .copied()
            .filter(|s| !matches!(s, SynthStep::Pause(_)))
            .collect()
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }
}

impl KeySink for RecordingSink {
    fn press(&mut self, code: NativeKeyCode) -> Result<(), SynthError> {
        self.steps.push(SynthStep::Press(code));
        Ok(())
    }

    fn release(&mut self, code: NativeKeyCode) -> Result<(), SynthError> {
        self.steps.push(SynthStep::Release(code));
        Ok(())
    }

    fn pause(&mut self, duration: Duration) {
        self.steps.push(SynthStep::Pause(duration));
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Settle pauses used while sending a combo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthTiming {
    pub modifier_settle: Duration,
    pub chord_settle: Duration,
    pub trailing: Duration,
}

impl Default for SynthTiming {
    fn default() -> Self {
        Self {
            modifier_settle: MODIFIER_SETTLE,
            chord_settle: CHORD_SETTLE,
            trailing: TRAILING_DELAY,
        }
    }
}

/// Platform adaptation of combos before they are sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthOptions {
    /// Send a configured `ctrl` as Command, so `ctrl+v` pastes on macOS
    pub remap_control_to_command: bool,
}

impl SynthOptions {
    pub fn for_platform(platform: Platform) -> Self {
        Self {
            remap_control_to_command: platform.control_accepts_command(),
        }
    }
}

/// Emits modifier+key combinations through a [`KeySink`]
pub struct KeystrokeSynthesizer<S: KeySink> {
    sink: S,
    table: KeyCodeTable,
    timing: SynthTiming,
    options: SynthOptions,
}

impl<S: KeySink> KeystrokeSynthesizer<S> {
    pub fn new(sink: S, table: KeyCodeTable) -> Self {
        let options = SynthOptions::for_platform(table.platform());
        Self {
            sink,
            table,
            timing: SynthTiming::default(),
            options,
        }
    }

    pub fn with_timing(mut self, timing: SynthTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_options(mut self, options: SynthOptions) -> Self {
        self.options = options;
        self
    }

    pub fn timing(&self) -> SynthTiming {
        self.timing
    }

    pub fn table(&self) -> &KeyCodeTable {
        &self.table
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Modifiers to press for `spec`, in press order
    pub fn modifiers_for(&self, spec: &HotkeySpec) -> Vec<Modifier> {
        let mapped: BTreeSet<Modifier> = spec
            .required_modifiers()
            .iter()
            .map(|&m| match m {
                Modifier::Control if self.options.remap_control_to_command => Modifier::Command,
                other => other,
            })
            .collect();

        Modifier::CANONICAL_ORDER
            .iter()
            .copied()
            .filter(|m| mapped.contains(m))
            .collect()
    }

    /// Parse `combo` and send it
    pub fn send_str(&mut self, combo: &str) -> Result<(), SynthError> {
        let spec = HotkeySpec::parse_unchecked(combo)?;
        self.send(&spec)
    }

    /// Press and release one combo
    ///
    /// Nothing is emitted when the main key has no native code on this
    /// platform. If the sink fails part-way, keys already pressed are
    /// released before the error is returned.
    pub fn send(&mut self, spec: &HotkeySpec) -> Result<(), SynthError> {
        let main_code =
            self.table
                .code_for(&spec.main_key())
                .ok_or_else(|| SynthError::UnsupportedKey {
                    key: spec.main_key().to_string(),
                    platform: self.table.platform().to_string(),
                })?;
        let modifier_codes: Vec<NativeKeyCode> = self
            .modifiers_for(spec)
            .into_iter()
            .map(|m| self.table.modifier_code(m))
            .collect();

        tracing::trace!(combo = %spec, sink = self.sink.name(), "Sending keystroke");

        let mut held: Vec<NativeKeyCode> = Vec::with_capacity(modifier_codes.len() + 1);
        let result = self.emit(&modifier_codes, main_code, &mut held);
        if result.is_err() {
            for code in held.iter().rev() {
                let _ = self.sink.release(*code);
            }
        }
        result
    }

    fn emit(
        &mut self,
        modifier_codes: &[NativeKeyCode],
        main_code: NativeKeyCode,
        held: &mut Vec<NativeKeyCode>,
    ) -> Result<(), SynthError> {
        for &code in modifier_codes {
            self.sink.press(code)?;
            held.push(code);
            self.sink.pause(self.timing.modifier_settle);
        }

        self.sink.press(main_code)?;
        held.push(main_code);
        self.sink.pause(self.timing.modifier_settle);
        self.sink.pause(self.timing.chord_settle);

        while let Some(code) = held.pop() {
            if let Err(e) = self.sink.release(code) {
                held.push(code);
                return Err(e);
            }
            self.sink.pause(self.timing.modifier_settle);
        }

        self.sink.pause(self.timing.trailing);
        Ok(())
    }
}

/// Steps `send` would emit for `spec` on `table`'s platform
pub fn plan(
    spec: &HotkeySpec,
    table: KeyCodeTable,
    timing: SynthTiming,
) -> Result<Vec<SynthStep>, SynthError> {
    let mut synth = KeystrokeSynthesizer::new(RecordingSink::new(), table).with_timing(timing);
    synth.send(spec)?;
    Ok(synth.sink().steps().to_vec())
}

/// Sink that posts to the OS input queue of the current platform
pub fn create_sink() -> Box<dyn KeySink> {
    #[cfg(target_os = "macos")]
    {
        Box::new(cgevent::CgEventSink::new())
    }

    #[cfg(not(target_os = "macos"))]
    {
        Box::new(rdev_sink::RdevSink::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::KeyToken;

    fn synth(platform: Platform) -> KeystrokeSynthesizer<RecordingSink> {
        KeystrokeSynthesizer::new(RecordingSink::new(), KeyCodeTable::for_platform(platform))
    }

    #[test]
    fn test_ctrl_shift_g_event_order() {
        let mut s = synth(Platform::Linux);
        s.send_str("ctrl+shift+g").unwrap();

        let t = KeyCodeTable::for_platform(Platform::Linux);
        let ctrl = t.modifier_code(Modifier::Control);
        let shift = t.modifier_code(Modifier::Shift);
        let g = t.code_for(&KeyToken::Char('g')).unwrap();
        assert_eq!(
            s.sink().key_events(),
            vec![
                SynthStep::Press(ctrl),
                SynthStep::Press(shift),
                SynthStep::Press(g),
                SynthStep::Release(g),
                SynthStep::Release(shift),
                SynthStep::Release(ctrl),
            ]
        );
    }

    #[test]
    fn test_settle_delays() {
        let mut s = synth(Platform::Windows);
        s.send_str("ctrl+v").unwrap();

        let t = KeyCodeTable::for_platform(Platform::Windows);
        let ctrl = t.modifier_code(Modifier::Control);
        let v = t.code_for(&KeyToken::Char('v')).unwrap();
        assert_eq!(
            s.sink().steps(),
            &[
                SynthStep::Press(ctrl),
                SynthStep::Pause(MODIFIER_SETTLE),
                SynthStep::Press(v),
                SynthStep::Pause(MODIFIER_SETTLE),
                SynthStep::Pause(CHORD_SETTLE),
                SynthStep::Release(v),
                SynthStep::Pause(MODIFIER_SETTLE),
                SynthStep::Release(ctrl),
                SynthStep::Pause(MODIFIER_SETTLE),
                SynthStep::Pause(TRAILING_DELAY),
            ]
        );
    }

    #[test]
    fn test_canonical_order_ignores_spec_order() {
        let mut a = synth(Platform::Linux);
        let mut b = synth(Platform::Linux);
        a.send_str("shift+alt+ctrl+k").unwrap();
        b.send_str("ctrl+alt+shift+k").unwrap();
        assert_eq!(a.sink().steps(), b.sink().steps());

        let t = KeyCodeTable::for_platform(Platform::Linux);
        assert_eq!(
            a.sink().key_events()[..3],
            [
                SynthStep::Press(t.modifier_code(Modifier::Control)),
                SynthStep::Press(t.modifier_code(Modifier::Alt)),
                SynthStep::Press(t.modifier_code(Modifier::Shift)),
            ]
        );
    }

    #[test]
    fn test_macos_sends_control_as_command() {
        let mut s = synth(Platform::MacOs);
        s.send_str("ctrl+a").unwrap();
        let events = s.sink().key_events();
        assert_eq!(events[0], SynthStep::Press(NativeKeyCode(0x37)));
        assert_eq!(events[1], SynthStep::Press(NativeKeyCode(0x00)));
    }

    #[test]
    fn test_macos_remap_dedupes_command() {
        let s = synth(Platform::MacOs);
        let spec = HotkeySpec::parse_unchecked("cmd+ctrl+x").unwrap();
        assert_eq!(s.modifiers_for(&spec), vec![Modifier::Command]);
    }

    #[test]
    fn test_remap_can_be_disabled() {
        let mut s = synth(Platform::MacOs).with_options(SynthOptions {
            remap_control_to_command: false,
        });
        s.send_str("ctrl+a").unwrap();
        assert_eq!(s.sink().key_events()[0], SynthStep::Press(NativeKeyCode(0x3B)));
    }

    #[test]
    fn test_unsupported_key_emits_nothing() {
        let mut s = synth(Platform::MacOs);
        let err = s.send_str("ctrl+insert").unwrap_err();
        assert!(matches!(err, SynthError::UnsupportedKey { .. }));
        assert!(s.sink().steps().is_empty());
    }

    #[test]
    fn test_invalid_combo_is_reported() {
        let mut s = synth(Platform::Linux);
        assert!(matches!(
            s.send_str("ctrl+").unwrap_err(),
            SynthError::Combo(_)
        ));
        assert!(s.sink().steps().is_empty());
    }

    #[test]
    fn test_single_key_has_no_modifiers() {
        let mut s = synth(Platform::Linux);
        s.send_str("enter").unwrap();
        assert_eq!(s.sink().key_events().len(), 2);
    }

    struct FailingSink {
        fail_on: NativeKeyCode,
        released: Vec<NativeKeyCode>,
    }

    impl KeySink for FailingSink {
        fn press(&mut self, code: NativeKeyCode) -> Result<(), SynthError> {
            if code == self.fail_on {
                return Err(SynthError::Simulate("boom".into()));
            }
            Ok(())
        }

        fn release(&mut self, code: NativeKeyCode) -> Result<(), SynthError> {
            self.released.push(code);
            Ok(())
        }

        fn pause(&mut self, _duration: Duration) {}

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[test]
    fn test_failure_releases_held_modifiers() {
        let table = KeyCodeTable::for_platform(Platform::Linux);
        let v = table.code_for(&KeyToken::Char('v')).unwrap();
        let sink = FailingSink {
            fail_on: v,
            released: Vec::new(),
        };
        let mut s = KeystrokeSynthesizer::new(sink, table);
        assert!(s.send_str("ctrl+shift+v").is_err());
        assert_eq!(
            s.sink().released,
            vec![
                table.modifier_code(Modifier::Shift),
                table.modifier_code(Modifier::Control),
            ]
        );
    }

    #[test]
    fn test_plan_matches_send() {
        let table = KeyCodeTable::for_platform(Platform::Windows);
        let spec = HotkeySpec::parse("ctrl+x", &table).unwrap();
        let steps = plan(&spec, table, SynthTiming::default()).unwrap();
        assert_eq!(steps.len(), 10);
    }
}
