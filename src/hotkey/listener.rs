//! Global key listener built on rdev
//!
//! Raw key events are delivered serially on one dedicated thread. That
//! thread owns the [`HotkeyMatcher`], so matcher state needs no locking.
//! The hotkey callback runs synchronously on this thread and blocks further
//! event processing until it returns.
//!
//! Without passthrough suppression the listener uses `rdev::listen`, which
//! only observes events. With suppression it uses `rdev::grab`, which can
//! drop the triggering keystroke before the foreground application sees it.

use super::keys::{KeyToken, Modifier, NamedKey};
use super::matcher::{HotkeyMatcher, KeyEvent, RawKey, Verdict};
use crate::error::HotkeyError;
use rdev::{Event, EventType, Key};
use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

/// Handle to a running listener thread
pub struct ListenerHandle {
    running: Arc<AtomicBool>,
    thread_handle: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    /// Whether events are still being matched
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop matching events
    ///
    /// rdev offers no way to unblock `listen`/`grab` from another thread, so
    /// the thread stays parked until the process exits. It stops matching,
    /// passes every event through and clears its modifier state on the next
    /// event it receives.
    pub fn stop(&mut self) {
        if self.running.swap(false, Ordering::SeqCst) {
            tracing::debug!("Hotkey listener stopped");
        }
        self.thread_handle.take();
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Start the listener thread for `matcher`
pub fn start_listener(
    matcher: HotkeyMatcher,
    suppress_passthrough: bool,
) -> Result<ListenerHandle, HotkeyError> {
    let running = Arc::new(AtomicBool::new(true));
    let thread_running = running.clone();
    let hotkey = matcher.spec().to_string();
    let matcher = matcher.with_suppress_passthrough(suppress_passthrough);

    let thread_handle = std::thread::Builder::new()
        .name("hotkey-listener".to_string())
        .spawn(move || {
            let result = if suppress_passthrough {
                run_grab(matcher, thread_running.clone())
            } else {
                run_listen(matcher, thread_running.clone())
            };
            if let Err(e) = result {
                tracing::error!("{}", e);
                tracing::warn!("Global hotkey capture is unavailable; the hotkey will not fire");
            }
            thread_running.store(false, Ordering::SeqCst);
        })
        .map_err(|e| HotkeyError::ThreadSpawn(e.to_string()))?;

    tracing::info!(
        hotkey = %hotkey,
        suppress_passthrough,
        "Listening for hotkey"
    );

    Ok(ListenerHandle {
        running,
        thread_handle: Some(thread_handle),
    })
}

fn run_listen(mut matcher: HotkeyMatcher, running: Arc<AtomicBool>) -> Result<(), HotkeyError> {
    let callback = move |event: Event| {
        dispatch(&mut matcher, &running, &event);
    };

    // Blocks until an error occurs or the process exits
    rdev::listen(callback).map_err(|e| HotkeyError::Listen(format!("{:?}", e)))
}

fn run_grab(matcher: HotkeyMatcher, running: Arc<AtomicBool>) -> Result<(), HotkeyError> {
    // grab takes a Fn callback; events still arrive one at a time
    let matcher = RefCell::new(matcher);
    let callback = move |event: Event| -> Option<Event> {
        let verdict = match matcher.try_borrow_mut() {
            Ok(mut matcher) => dispatch(&mut matcher, &running, &event),
            Err(_) => Verdict::Pass,
        };
        match verdict {
            Verdict::Pass => Some(event),
            Verdict::Swallow => None,
        }
    };

    rdev::grab(callback).map_err(|e| HotkeyError::Listen(format!("{:?}", e)))
}

fn dispatch(matcher: &mut HotkeyMatcher, running: &AtomicBool, event: &Event) -> Verdict {
    if !running.load(Ordering::SeqCst) {
        if !matcher.tracker().is_empty() {
            matcher.reset();
        }
        return Verdict::Pass;
    }

    match classify(&event.event_type, event.name.as_deref()) {
        Some(key_event) => matcher.handle(&key_event, Instant::now()),
        None => Verdict::Pass,
    }
}

/// Turn an rdev event into a matcher event, `None` for non-keyboard events
pub fn classify(event_type: &EventType, name: Option<&str>) -> Option<KeyEvent> {
    match event_type {
        EventType::KeyPress(key) => Some(KeyEvent::press(classify_key(*key, name))),
        EventType::KeyRelease(key) => Some(KeyEvent::release(classify_key(*key, name))),
        _ => None,
    }
}

/// Map a physical key to a modifier or key token
///
/// Physical positions are preferred so that Shift does not turn `/` into
/// `?`. Keys rdev does not know fall back to the typed character, if any.
fn classify_key(key: Key, name: Option<&str>) -> RawKey {
    if let Some(modifier) = modifier_for(key) {
        return RawKey::Modifier(modifier);
    }
    if let Some(token) = token_for(key) {
        return RawKey::Key(token);
    }

    let mut chars = name.unwrap_or_default().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if !c.is_control() && !c.is_whitespace() => {
            RawKey::Key(KeyToken::from_char(c))
        }
        _ => RawKey::Other,
    }
}

fn modifier_for(key: Key) -> Option<Modifier> {
    match key {
        Key::ControlLeft | Key::ControlRight => Some(Modifier::Control),
        Key::MetaLeft | Key::MetaRight => Some(Modifier::Command),
        Key::Alt | Key::AltGr => Some(Modifier::Alt),
        Key::ShiftLeft | Key::ShiftRight => Some(Modifier::Shift),
        _ => None,
    }
}

fn token_for(key: Key) -> Option<KeyToken> {
    let c = match key {
        Key::KeyA => 'a',
        Key::KeyB => 'b',
        Key::KeyC => 'c',
        Key::KeyD => 'd',
        Key::KeyE => 'e',
        Key::KeyF => 'f',
        Key::KeyG => 'g',
        Key::KeyH => 'h',
        Key::KeyI => 'i',
        Key::KeyJ => 'j',
        Key::KeyK => 'k',
        Key::KeyL => 'l',
        Key::KeyM => 'm',
        Key::KeyN => 'n',
        Key::KeyO => 'o',
        Key::KeyP => 'p',
        Key::KeyQ => 'q',
        Key::KeyR => 'r',
        Key::KeyS => 's',
        Key::KeyT => 't',
        Key::KeyU => 'u',
        Key::KeyV => 'v',
        Key::KeyW => 'w',
        Key::KeyX => 'x',
        Key::KeyY => 'y',
        Key::KeyZ => 'z',
        Key::Num0 => '0',
        Key::Num1 => '1',
        Key::Num2 => '2',
        Key::Num3 => '3',
        Key::Num4 => '4',
        Key::Num5 => '5',
        Key::Num6 => '6',
        Key::Num7 => '7',
        Key::Num8 => '8',
        Key::Num9 => '9',
        Key::BackQuote => '`',
        Key::Minus => '-',
        Key::Equal => '=',
        Key::LeftBracket => '[',
        Key::RightBracket => ']',
        Key::BackSlash => '\\',
        Key::SemiColon => ';',
        Key::Quote => '\'',
        Key::Comma => ',',
        Key::Dot => '.',
        Key::Slash => '/',
        other => return named_for(other).map(KeyToken::Named),
    };
    Some(KeyToken::Char(c))
}

fn named_for(key: Key) -> Option<NamedKey> {
    let named = match key {
        Key::Return | Key::KpReturn => NamedKey::Enter,
        Key::Tab => NamedKey::Tab,
        Key::Escape => NamedKey::Escape,
        Key::Space => NamedKey::Space,
        Key::Backspace => NamedKey::Backspace,
        Key::Delete => NamedKey::Delete,
        Key::Insert => NamedKey::Insert,
        Key::UpArrow => NamedKey::Up,
        Key::DownArrow => NamedKey::Down,
        Key::LeftArrow => NamedKey::Left,
        Key::RightArrow => NamedKey::Right,
        Key::Home => NamedKey::Home,
        Key::End => NamedKey::End,
        Key::PageUp => NamedKey::PageUp,
        Key::PageDown => NamedKey::PageDown,
        Key::F1 => NamedKey::F1,
        Key::F2 => NamedKey::F2,
        Key::F3 => NamedKey::F3,
        Key::F4 => NamedKey::F4,
        Key::F5 => NamedKey::F5,
        Key::F6 => NamedKey::F6,
        Key::F7 => NamedKey::F7,
        Key::F8 => NamedKey::F8,
        Key::F9 => NamedKey::F9,
        Key::F10 => NamedKey::F10,
        Key::F11 => NamedKey::F11,
        Key::F12 => NamedKey::F12,
        _ => return None,
    };
    Some(named)
}
