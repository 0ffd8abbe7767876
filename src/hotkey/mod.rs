//! Global hotkey detection
//!
//! Hotkey strings are parsed into a [`HotkeySpec`] against the native key
//! table of the current platform. A [`HotkeyMatcher`] consumes raw key
//! events on a dedicated listener thread and invokes a callback when the
//! combination is pressed.
//!
//! Listening uses rdev: X11 (XRecord) or evdev on Linux, a CGEventTap on
//! macOS (requires Accessibility permission), and a low-level keyboard hook
//! on Windows.

pub mod keys;
pub mod listener;
pub mod matcher;
pub mod permissions;
pub mod spec;
pub mod tracker;

pub use keys::{KeyCodeTable, KeyToken, Modifier, NamedKey, NativeKeyCode, Platform};
pub use listener::{start_listener, ListenerHandle};
pub use matcher::{
    Clock, HotkeyCallback, HotkeyMatcher, KeyEvent, KeyPhase, ManualClock, MatcherState, RawKey,
    TriggerGuard, Verdict, SUPPRESSION_INTERVAL,
};
pub use spec::HotkeySpec;
pub use tracker::ModifierTracker;
