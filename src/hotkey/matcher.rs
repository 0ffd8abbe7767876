//! Hotkey detection state machine
//!
//! Combines a [`ModifierTracker`] with a [`TriggerGuard`] to decide when the
//! configured hotkey fires:
//!
//! ```text
//!            main key pressed, modifiers satisfied
//!   ┌──────┐ ─────────────────────────────────────▶ ┌─────────┐
//!   │ Idle │                                        │ Cooling │
//!   └──────┘ ◀───────────────────────────────────── └─────────┘
//!            modifier press/release or main-key release
//!            AND suppression interval elapsed
//! ```
//!
//! Key repeat of a held main key only produces presses, so it never re-arms
//! the guard and cannot fire twice. All state lives on the listener thread;
//! nothing here is shared.
//!
//! The callback blocks event delivery, so anything typed or injected during a
//! run is handled after it returns. The suppression interval is therefore
//! measured from the moment the callback returns, not from the press that
//! fired it. An auto-sent Enter that equals the trigger lands inside the
//! window, is not matched and reaches the application.

use super::keys::{KeyToken, Modifier, Platform};
use super::spec::HotkeySpec;
use super::tracker::ModifierTracker;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Minimum time between two successful fires
pub const SUPPRESSION_INTERVAL: Duration = Duration::from_millis(500);

/// Press or release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPhase {
    Press,
    Release,
}

/// A key as reported by the OS, classified for matching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKey {
    Modifier(Modifier),
    Key(KeyToken),
    /// Anything the matcher does not care about (mouse buttons, media keys)
    Other,
}

/// One raw key event, consumed once by the matcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: RawKey,
    pub phase: KeyPhase,
}

impl KeyEvent {
    pub fn press(key: RawKey) -> Self {
        Self {
            key,
            phase: KeyPhase::Press,
        }
    }

    pub fn release(key: RawKey) -> Self {
        Self {
            key,
            phase: KeyPhase::Release,
        }
    }
}

/// Source of the current time, read when the callback returns
pub type Clock = Box<dyn Fn() -> Instant + Send + 'static>;

/// Clock that only moves when told to
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new(start: Instant) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set(&self, at: Instant) {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = at;
    }

    pub fn advance(&self, by: Duration) {
        let next = self.now() + by;
        self.set(next);
    }

    /// A [`Clock`] reading this manual clock
    pub fn boxed(&self) -> Clock {
        let clock = self.clone();
        Box::new(move || clock.now())
    }
}

/// Re-trigger protection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerGuard {
    is_armed: bool,
    last_trigger_time: Option<Instant>,
}

impl Default for TriggerGuard {
    fn default() -> Self {
        Self {
            is_armed: true,
            last_trigger_time: None,
        }
    }
}

impl TriggerGuard {
    pub fn rearm(&mut self) {
        self.is_armed = true;
    }

    pub fn consume(&mut self, now: Instant) {
        self.is_armed = false;
        self.last_trigger_time = Some(now);
    }

    /// Restart the suppression window at `at` without touching the armed flag
    pub fn restart_window(&mut self, at: Instant) {
        self.last_trigger_time = Some(at);
    }

    pub fn is_armed(&self) -> bool {
        self.is_armed
    }

    pub fn last_trigger_time(&self) -> Option<Instant> {
        self.last_trigger_time
    }

    /// Armed and outside the suppression window of the previous fire
    pub fn can_fire(&self, now: Instant, interval: Duration) -> bool {
        self.is_armed
            && self
                .last_trigger_time
                .map_or(true, |last| now.saturating_duration_since(last) >= interval)
    }
}

/// Observable matcher state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherState {
    /// A matching main-key press would fire now
    Idle,
    /// Keys still held from the last fire, or inside the suppression window
    Cooling,
}

/// What the listener should do with the event that was just handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Deliver the event to the foreground application
    Pass,
    /// Drop the event (only honoured when the listener can intercept)
    Swallow,
}

/// Callback invoked on the listener thread when the hotkey fires
pub type HotkeyCallback = Box<dyn FnMut() + Send + 'static>;

/// Decides when a configured hotkey fires
pub struct HotkeyMatcher {
    spec: HotkeySpec,
    platform: Platform,
    interval: Duration,
    tracker: ModifierTracker,
    guard: TriggerGuard,
    callback: HotkeyCallback,
    clock: Clock,
    suppress_passthrough: bool,
    /// The main key is held after a swallowed press, so repeats and the
    /// release are swallowed too
    swallowed_press: bool,
    fire_count: u64,
}

impl HotkeyMatcher {
    pub fn new(spec: HotkeySpec, platform: Platform, callback: HotkeyCallback) -> Self {
        Self {
            spec,
            platform,
            interval: SUPPRESSION_INTERVAL,
            tracker: ModifierTracker::new(),
            guard: TriggerGuard::default(),
            callback,
            clock: Box::new(Instant::now),
            suppress_passthrough: false,
            swallowed_press: false,
            fire_count: 0,
        }
    }

    pub fn with_suppression_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_suppress_passthrough(mut self, suppress: bool) -> Self {
        self.suppress_passthrough = suppress;
        self
    }

    pub fn spec(&self) -> &HotkeySpec {
        &self.spec
    }

    pub fn tracker(&self) -> &ModifierTracker {
        &self.tracker
    }

    pub fn guard(&self) -> &TriggerGuard {
        &self.guard
    }

    pub fn fire_count(&self) -> u64 {
        self.fire_count
    }

    pub fn state(&self, now: Instant) -> MatcherState {
        if self.guard.can_fire(now, self.interval) {
            MatcherState::Idle
        } else {
            MatcherState::Cooling
        }
    }

    /// Required modifiers with platform aliasing applied against `held`
    ///
    /// On macOS a Control requirement is met by Command when Command is held.
    /// Alt and Option are one variant, so no rewrite is needed for them.
    /// The rule is one-way: a Command requirement never accepts Control.
    pub fn effective_required(&self, held: &BTreeSet<Modifier>) -> BTreeSet<Modifier> {
        self.spec
            .required_modifiers()
            .iter()
            .map(|&required| match required {
                Modifier::Control
                    if self.platform.control_accepts_command()
                        && held.contains(&Modifier::Command) =>
                {
                    Modifier::Command
                }
                other => other,
            })
            .collect()
    }

    pub fn modifiers_satisfied(&self, held: &BTreeSet<Modifier>) -> bool {
        self.effective_required(held).is_subset(held)
    }

    /// Feed one raw event. Fires the callback synchronously on a match.
    pub fn handle(&mut self, event: &KeyEvent, now: Instant) -> Verdict {
        match (event.key, event.phase) {
            (RawKey::Modifier(modifier), KeyPhase::Press) => {
                self.tracker.on_press(modifier);
                self.guard.rearm();
                Verdict::Pass
            }
            (RawKey::Modifier(modifier), KeyPhase::Release) => {
                self.tracker.on_release(modifier);
                self.guard.rearm();
                Verdict::Pass
            }
            (RawKey::Key(token), KeyPhase::Press) if token == self.spec.main_key() => {
                self.on_main_key_press(now)
            }
            (RawKey::Key(token), KeyPhase::Release) if token == self.spec.main_key() => {
                self.guard.rearm();
                if std::mem::take(&mut self.swallowed_press) && self.suppress_passthrough {
                    Verdict::Swallow
                } else {
                    Verdict::Pass
                }
            }
            _ => Verdict::Pass,
        }
    }

    fn on_main_key_press(&mut self, now: Instant) -> Verdict {
        // Repeats of a swallowed press stay swallowed until the release
        if self.swallowed_press && self.suppress_passthrough {
            return Verdict::Swallow;
        }

        let held = self.tracker.snapshot();
        if !self.modifiers_satisfied(&held) {
            tracing::trace!(?held, "Main key pressed without required modifiers");
            return Verdict::Pass;
        }

        if !self.guard.can_fire(now, self.interval) {
            tracing::trace!(hotkey = %self.spec, "Hotkey suppressed while cooling");
            return Verdict::Pass;
        }

        self.guard.consume(now);
        self.fire_count += 1;
        tracing::debug!(hotkey = %self.spec, "Hotkey matched");
        (self.callback)();

        let finished = (self.clock)().max(now);
        self.guard.restart_window(finished);
        if finished > now {
            tracing::trace!(
                busy_ms = finished.duration_since(now).as_millis() as u64,
                "Suppression window restarted after callback"
            );
        }

        if self.suppress_passthrough {
            self.swallowed_press = true;
            Verdict::Swallow
        } else {
            Verdict::Pass
        }
    }

    /// Drop all held-key state, used on listener shutdown
    pub fn reset(&mut self) {
        self.tracker.clear();
        self.guard.rearm();
        self.swallowed_press = false;
    }
}

impl std::fmt::Debug for HotkeyMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotkeyMatcher")
            .field("spec", &self.spec)
            .field("platform", &self.platform)
            .field("interval", &self.interval)
            .field("tracker", &self.tracker)
            .field("guard", &self.guard)
            .field("suppress_passthrough", &self.suppress_passthrough)
            .finish()
    }
}
