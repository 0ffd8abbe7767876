//! Keystroke synthesis ordering and timing, recorded instead of sent

use clipstamp::error::SynthError;
use clipstamp::hotkey::{HotkeySpec, KeyCodeTable, KeyToken, Modifier, NativeKeyCode, Platform};
use clipstamp::synth::{
    plan, KeySink, KeystrokeSynthesizer, RecordingSink, SynthOptions, SynthStep, SynthTiming,
    CHORD_SETTLE, MODIFIER_SETTLE,
};
use std::time::Duration;

fn spec(combo: &str) -> HotkeySpec {
    HotkeySpec::parse_unchecked(combo).unwrap()
}

fn key_events(steps: &[SynthStep]) -> Vec<SynthStep> {
    steps
        .iter()
        .copied()
        .filter(|s| !matches!(s, SynthStep::Pause(_)))
        .collect()
}

fn total_pause(steps: &[SynthStep]) -> Duration {
    steps
        .iter()
        .filter_map(|s| match s {
            SynthStep::Pause(d) => Some(*d),
            _ => None,
        })
        .sum()
}

#[test]
fn ctrl_shift_g_emits_six_ordered_events_on_every_platform() {
    for platform in [Platform::Linux, Platform::Windows, Platform::MacOs] {
        let table = KeyCodeTable::for_platform(platform);
        let steps = plan(&spec("ctrl+shift+g"), table, SynthTiming::default()).unwrap();

        // macOS sends the configured ctrl as Command
        let first = if platform == Platform::MacOs {
            Modifier::Command
        } else {
            Modifier::Control
        };
        let ctrl = table.modifier_code(first);
        let shift = table.modifier_code(Modifier::Shift);
        let g = table.code_for(&KeyToken::Char('g')).unwrap();

        assert_eq!(
            key_events(&steps),
            vec![
                SynthStep::Press(ctrl),
                SynthStep::Press(shift),
                SynthStep::Press(g),
                SynthStep::Release(g),
                SynthStep::Release(shift),
                SynthStep::Release(ctrl),
            ],
            "{}",
            platform
        );
    }
}

#[test]
fn settle_pauses_follow_every_event() {
    let table = KeyCodeTable::for_platform(Platform::Linux);
    let timing = SynthTiming {
        trailing: Duration::from_millis(100),
        ..SynthTiming::default()
    };
    let steps = plan(&spec("ctrl+shift+g"), table, timing).unwrap();

    // No two key events back to back
    for pair in steps.windows(2) {
        assert!(
            matches!(pair[0], SynthStep::Pause(_)) || matches!(pair[1], SynthStep::Pause(_)),
            "{} followed by {}",
            pair[0],
            pair[1]
        );
    }

    // Six settles, one chord settle, one trailing delay
    assert_eq!(
        total_pause(&steps),
        MODIFIER_SETTLE * 6 + CHORD_SETTLE + Duration::from_millis(100)
    );
    assert_eq!(steps.last(), Some(&SynthStep::Pause(Duration::from_millis(100))));
}

#[test]
fn chord_settle_sits_between_main_press_and_release() {
    let table = KeyCodeTable::for_platform(Platform::Windows);
    let v = table.code_for(&KeyToken::Char('v')).unwrap();
    let steps = plan(&spec("ctrl+v"), table, SynthTiming::default()).unwrap();

    let press = steps.iter().position(|s| *s == SynthStep::Press(v)).unwrap();
    let release = steps.iter().position(|s| *s == SynthStep::Release(v)).unwrap();
    let between: Vec<SynthStep> = steps[press + 1..release].to_vec();
    assert_eq!(
        between,
        vec![SynthStep::Pause(MODIFIER_SETTLE), SynthStep::Pause(CHORD_SETTLE)]
    );
}

#[test]
fn single_key_has_no_modifiers() {
    let table = KeyCodeTable::for_platform(Platform::MacOs);
    let enter = table.code_for(&spec("enter").main_key()).unwrap();
    let steps = plan(&spec("enter"), table, SynthTiming::default()).unwrap();
    assert_eq!(
        key_events(&steps),
        vec![SynthStep::Press(enter), SynthStep::Release(enter)]
    );
}

#[test]
fn ctrl_and_cmd_collapse_on_macos() {
    let table = KeyCodeTable::for_platform(Platform::MacOs);
    let synth = KeystrokeSynthesizer::new(RecordingSink::new(), table);
    assert_eq!(synth.modifiers_for(&spec("cmd+ctrl+v")), vec![Modifier::Command]);

    let synth = KeystrokeSynthesizer::new(RecordingSink::new(), table)
        .with_options(SynthOptions {
            remap_control_to_command: false,
        });
    assert_eq!(
        synth.modifiers_for(&spec("shift+alt+ctrl+cmd+v")),
        vec![
            Modifier::Command,
            Modifier::Control,
            Modifier::Alt,
            Modifier::Shift
        ]
    );
}

#[test]
fn unsupported_key_emits_nothing() {
    let table = KeyCodeTable::for_platform(Platform::MacOs);
    let mut synth = KeystrokeSynthesizer::new(RecordingSink::new(), table);

    let err = synth.send_str("ctrl+insert").unwrap_err();
    assert!(matches!(err, SynthError::UnsupportedKey { .. }));
    assert!(synth.sink().steps().is_empty());
}

#[test]
fn invalid_combo_is_reported() {
    let table = KeyCodeTable::for_platform(Platform::Linux);
    let mut synth = KeystrokeSynthesizer::new(RecordingSink::new(), table);
    assert!(matches!(
        synth.send_str("ctrl+shift").unwrap_err(),
        SynthError::Combo(_)
    ));
}

/// Fails the first press of `fail_on`, records everything else
struct FlakySink {
    fail_on: NativeKeyCode,
    events: Vec<SynthStep>,
}

impl KeySink for FlakySink {
    fn press(&mut self, code: NativeKeyCode) -> Result<(), SynthError> {
        if code == self.fail_on {
            return Err(SynthError::Simulate("queue full".to_string()));
        }
        self.events.push(SynthStep::Press(code));
        Ok(())
    }

    fn release(&mut self, code: NativeKeyCode) -> Result<(), SynthError> {
        self.events.push(SynthStep::Release(code));
        Ok(())
    }

    fn pause(&mut self, _duration: Duration) {}

    fn name(&self) -> &'static str {
        "flaky"
    }
}

#[test]
fn failed_press_releases_held_modifiers() {
    let table = KeyCodeTable::for_platform(Platform::Linux);
    let ctrl = table.modifier_code(Modifier::Control);
    let shift = table.modifier_code(Modifier::Shift);
    let x = table.code_for(&KeyToken::Char('x')).unwrap();

    let sink = FlakySink {
        fail_on: x,
        events: Vec::new(),
    };
    let mut synth = KeystrokeSynthesizer::new(sink, table);
    assert!(synth.send_str("ctrl+shift+x").is_err());

    assert_eq!(
        synth.sink().events,
        vec![
            SynthStep::Press(ctrl),
            SynthStep::Press(shift),
            SynthStep::Release(shift),
            SynthStep::Release(ctrl),
        ]
    );
}
