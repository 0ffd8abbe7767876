//! Logical key names and per-platform native key codes
//!
//! A hotkey string names keys logically (`ctrl`, `shift`, `g`, `enter`).
//! The [`KeyCodeTable`] resolves those names to the native codes each
//! platform's input API expects:
//!
//! - macOS: Carbon virtual key codes (`kVK_*` from HIToolbox Events.h)
//! - Windows: virtual-key codes (`VK_*`)
//! - Linux: X11 keycodes (evdev `KEY_*` code + 8), as consumed by XTest

use std::fmt;

/// Operating system family, selects key codes and modifier aliasing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    MacOs,
    Windows,
    Linux,
}

impl Platform {
    /// The platform this binary was compiled for
    pub fn current() -> Self {
        #[cfg(target_os = "macos")]
        return Platform::MacOs;
        #[cfg(target_os = "windows")]
        return Platform::Windows;
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        return Platform::Linux;
    }

    /// Whether a configured Control requirement may be met by Command
    pub fn control_accepts_command(&self) -> bool {
        matches!(self, Platform::MacOs)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::MacOs => write!(f, "macOS"),
            Platform::Windows => write!(f, "Windows"),
            Platform::Linux => write!(f, "Linux"),
        }
    }
}

/// A modifier key
///
/// Alt and Option are the same physical key and share one variant.
/// Command is the macOS Command key, the Windows key, or Super on Linux.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Modifier {
    Command,
    Control,
    Alt,
    Shift,
}

impl Modifier {
    /// Order in which modifiers are pressed when synthesizing a chord
    pub const CANONICAL_ORDER: [Modifier; 4] = [
        Modifier::Command,
        Modifier::Control,
        Modifier::Alt,
        Modifier::Shift,
    ];

    /// Parse a modifier token (already lowercased)
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "ctrl" | "control" | "ctl" => Some(Modifier::Control),
            "cmd" | "command" | "meta" | "super" | "win" | "windows" => Some(Modifier::Command),
            "alt" | "opt" | "option" => Some(Modifier::Alt),
            "shift" => Some(Modifier::Shift),
            _ => None,
        }
    }

    /// Canonical token used when a spec is written back out
    pub fn token(&self) -> &'static str {
        match self {
            Modifier::Command => "cmd",
            Modifier::Control => "ctrl",
            Modifier::Alt => "alt",
            Modifier::Shift => "shift",
        }
    }

    /// Name as shown to users of the given platform
    pub fn label(&self, platform: Platform) -> &'static str {
        match (self, platform) {
            (Modifier::Command, Platform::MacOs) => "Command",
            (Modifier::Command, Platform::Windows) => "Win",
            (Modifier::Command, Platform::Linux) => "Super",
            (Modifier::Control, _) => "Control",
            (Modifier::Alt, Platform::MacOs) => "Option",
            (Modifier::Alt, _) => "Alt",
            (Modifier::Shift, _) => "Shift",
        }
    }

    fn index(&self) -> usize {
        match self {
            Modifier::Command => 0,
            Modifier::Control => 1,
            Modifier::Alt => 2,
            Modifier::Shift => 3,
        }
    }
}

/// Non-character keys that can appear in a hotkey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Enter,
    Tab,
    Escape,
    Space,
    Backspace,
    Delete,
    Insert,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
}

impl NamedKey {
    pub const ALL: [NamedKey; 27] = [
        NamedKey::Enter,
        NamedKey::Tab,
        NamedKey::Escape,
        NamedKey::Space,
        NamedKey::Backspace,
        NamedKey::Delete,
        NamedKey::Insert,
        NamedKey::Up,
        NamedKey::Down,
        NamedKey::Left,
        NamedKey::Right,
        NamedKey::Home,
        NamedKey::End,
        NamedKey::PageUp,
        NamedKey::PageDown,
        NamedKey::F1,
        NamedKey::F2,
        NamedKey::F3,
        NamedKey::F4,
        NamedKey::F5,
        NamedKey::F6,
        NamedKey::F7,
        NamedKey::F8,
        NamedKey::F9,
        NamedKey::F10,
        NamedKey::F11,
        NamedKey::F12,
    ];

    fn from_name(name: &str) -> Option<Self> {
        let key = match name {
            "enter" | "return" => NamedKey::Enter,
            "tab" => NamedKey::Tab,
            "esc" | "escape" => NamedKey::Escape,
            "space" => NamedKey::Space,
            "backspace" => NamedKey::Backspace,
            "delete" | "del" => NamedKey::Delete,
            "insert" | "ins" => NamedKey::Insert,
            "up" => NamedKey::Up,
            "down" => NamedKey::Down,
            "left" => NamedKey::Left,
            "right" => NamedKey::Right,
            "home" => NamedKey::Home,
            "end" => NamedKey::End,
            "pageup" | "pgup" => NamedKey::PageUp,
            "pagedown" | "pgdn" => NamedKey::PageDown,
            "f1" => NamedKey::F1,
            "f2" => NamedKey::F2,
            "f3" => NamedKey::F3,
            "f4" => NamedKey::F4,
            "f5" => NamedKey::F5,
            "f6" => NamedKey::F6,
            "f7" => NamedKey::F7,
            "f8" => NamedKey::F8,
            "f9" => NamedKey::F9,
            "f10" => NamedKey::F10,
            "f11" => NamedKey::F11,
            "f12" => NamedKey::F12,
            _ => return None,
        };
        Some(key)
    }

    pub fn name(&self) -> &'static str {
        match self {
            NamedKey::Enter => "enter",
            NamedKey::Tab => "tab",
            NamedKey::Escape => "esc",
            NamedKey::Space => "space",
            NamedKey::Backspace => "backspace",
            NamedKey::Delete => "delete",
            NamedKey::Insert => "insert",
            NamedKey::Up => "up",
            NamedKey::Down => "down",
            NamedKey::Left => "left",
            NamedKey::Right => "right",
            NamedKey::Home => "home",
            NamedKey::End => "end",
            NamedKey::PageUp => "pageup",
            NamedKey::PageDown => "pagedown",
            NamedKey::F1 => "f1",
            NamedKey::F2 => "f2",
            NamedKey::F3 => "f3",
            NamedKey::F4 => "f4",
            NamedKey::F5 => "f5",
            NamedKey::F6 => "f6",
            NamedKey::F7 => "f7",
            NamedKey::F8 => "f8",
            NamedKey::F9 => "f9",
            NamedKey::F10 => "f10",
            NamedKey::F11 => "f11",
            NamedKey::F12 => "f12",
        }
    }
}

/// The main (non-modifier) key of a hotkey
///
/// Characters are stored lowercased, so `G` and `g` are the same token.
/// Named keys never compare equal to characters: `Enter` is not `'\n'`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyToken {
    Char(char),
    Named(NamedKey),
}

impl KeyToken {
    /// Parse a main-key token
    ///
    /// Accepts named keys and any single printable character. Whether the
    /// character can actually be typed is decided by a [`KeyCodeTable`].
    pub fn parse(token: &str) -> Option<Self> {
        let lower = token.trim().to_lowercase();
        if let Some(named) = NamedKey::from_name(&lower) {
            return Some(KeyToken::Named(named));
        }
        let mut chars = lower.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_whitespace() && !c.is_control() && c != '+' => {
                Some(KeyToken::Char(c))
            }
            _ => None,
        }
    }

    /// Build a token from a typed character, folding case
    pub fn from_char(c: char) -> Self {
        KeyToken::Char(c.to_lowercase().next().unwrap_or(c))
    }
}

impl fmt::Display for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyToken::Char(c) => write!(f, "{}", c),
            KeyToken::Named(named) => write!(f, "{}", named.name()),
        }
    }
}

/// A platform-native key code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeKeyCode(pub u32);

impl fmt::Display for NativeKeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// Raw per-platform code data
struct Codes {
    letters: [u32; 26],
    digits: [u32; 10],
    punctuation: &'static [(char, u32)],
    named: &'static [(NamedKey, u32)],
    /// Indexed by `Modifier::index`
    modifiers: [u32; 4],
}

// kVK_ANSI_* values, a..z and 0..9
static MAC_CODES: Codes = Codes {
    letters: [
        0x00, 0x0B, 0x08, 0x02, 0x0E, 0x03, 0x05, 0x04, 0x22, 0x26, 0x28, 0x25, 0x2E, 0x2D,
        0x1F, 0x23, 0x0C, 0x0F, 0x01, 0x11, 0x20, 0x09, 0x0D, 0x07, 0x10, 0x06,
    ],
    digits: [0x1D, 0x12, 0x13, 0x14, 0x15, 0x17, 0x16, 0x1A, 0x1C, 0x19],
    punctuation: &[
        ('`', 0x32),
        ('-', 0x1B),
        ('=', 0x18),
        ('[', 0x21),
        (']', 0x1E),
        ('\\', 0x2A),
        (';', 0x29),
        ('\'', 0x27),
        (',', 0x2B),
        ('.', 0x2F),
        ('/', 0x2C),
    ],
    // No Insert key on Mac keyboards
    named: &[
        (NamedKey::Enter, 0x24),
        (NamedKey::Tab, 0x30),
        (NamedKey::Escape, 0x35),
        (NamedKey::Space, 0x31),
        (NamedKey::Backspace, 0x33),
        (NamedKey::Delete, 0x75),
        (NamedKey::Up, 0x7E),
        (NamedKey::Down, 0x7D),
        (NamedKey::Left, 0x7B),
        (NamedKey::Right, 0x7C),
        (NamedKey::Home, 0x73),
        (NamedKey::End, 0x77),
        (NamedKey::PageUp, 0x74),
        (NamedKey::PageDown, 0x79),
        (NamedKey::F1, 0x7A),
        (NamedKey::F2, 0x78),
        (NamedKey::F3, 0x63),
        (NamedKey::F4, 0x76),
        (NamedKey::F5, 0x60),
        (NamedKey::F6, 0x61),
        (NamedKey::F7, 0x62),
        (NamedKey::F8, 0x64),
        (NamedKey::F9, 0x65),
        (NamedKey::F10, 0x6D),
        (NamedKey::F11, 0x67),
        (NamedKey::F12, 0x6F),
    ],
    // Command, Control, Option, Shift
    modifiers: [0x37, 0x3B, 0x3A, 0x38],
};

static WINDOWS_CODES: Codes = Codes {
    letters: [
        0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0x4A, 0x4B, 0x4C, 0x4D, 0x4E,
        0x4F, 0x50, 0x51, 0x52, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59, 0x5A,
    ],
    digits: [0x30, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39],
    // VK_OEM_* on a US layout
    punctuation: &[
        ('`', 0xC0),
        ('-', 0xBD),
        ('=', 0xBB),
        ('[', 0xDB),
        (']', 0xDD),
        ('\\', 0xDC),
        (';', 0xBA),
        ('\'', 0xDE),
        (',', 0xBC),
        ('.', 0xBE),
        ('/', 0xBF),
    ],
    named: &[
        (NamedKey::Enter, 0x0D),
        (NamedKey::Tab, 0x09),
        (NamedKey::Escape, 0x1B),
        (NamedKey::Space, 0x20),
        (NamedKey::Backspace, 0x08),
        (NamedKey::Delete, 0x2E),
        (NamedKey::Insert, 0x2D),
        (NamedKey::Up, 0x26),
        (NamedKey::Down, 0x28),
        (NamedKey::Left, 0x25),
        (NamedKey::Right, 0x27),
        (NamedKey::Home, 0x24),
        (NamedKey::End, 0x23),
        (NamedKey::PageUp, 0x21),
        (NamedKey::PageDown, 0x22),
        (NamedKey::F1, 0x70),
        (NamedKey::F2, 0x71),
        (NamedKey::F3, 0x72),
        (NamedKey::F4, 0x73),
        (NamedKey::F5, 0x74),
        (NamedKey::F6, 0x75),
        (NamedKey::F7, 0x76),
        (NamedKey::F8, 0x77),
        (NamedKey::F9, 0x78),
        (NamedKey::F10, 0x79),
        (NamedKey::F11, 0x7A),
        (NamedKey::F12, 0x7B),
    ],
    // VK_LWIN, VK_LCONTROL, VK_LMENU, VK_LSHIFT
    modifiers: [0x5B, 0xA2, 0xA4, 0xA0],
};

/// X11 keycodes are evdev codes shifted by this amount
const X11_OFFSET: u32 = 8;

const fn x11(evdev: u32) -> u32 {
    evdev + X11_OFFSET
}

static LINUX_CODES: Codes = Codes {
    letters: [
        x11(30),
        x11(48),
        x11(46),
        x11(32),
        x11(18),
        x11(33),
        x11(34),
        x11(35),
        x11(23),
        x11(36),
        x11(37),
        x11(38),
        x11(50),
        x11(49),
        x11(24),
        x11(25),
        x11(16),
        x11(19),
        x11(31),
        x11(20),
        x11(22),
        x11(47),
        x11(17),
        x11(45),
        x11(21),
        x11(44),
    ],
    digits: [
        x11(11),
        x11(2),
        x11(3),
        x11(4),
        x11(5),
        x11(6),
        x11(7),
        x11(8),
        x11(9),
        x11(10),
    ],
    punctuation: &[
        ('`', x11(41)),
        ('-', x11(12)),
        ('=', x11(13)),
        ('[', x11(26)),
        (']', x11(27)),
        ('\\', x11(43)),
        (';', x11(39)),
        ('\'', x11(40)),
        (',', x11(51)),
        ('.', x11(52)),
        ('/', x11(53)),
    ],
    named: &[
        (NamedKey::Enter, x11(28)),
        (NamedKey::Tab, x11(15)),
        (NamedKey::Escape, x11(1)),
        (NamedKey::Space, x11(57)),
        (NamedKey::Backspace, x11(14)),
        (NamedKey::Delete, x11(111)),
        (NamedKey::Insert, x11(110)),
        (NamedKey::Up, x11(103)),
        (NamedKey::Down, x11(108)),
        (NamedKey::Left, x11(105)),
        (NamedKey::Right, x11(106)),
        (NamedKey::Home, x11(102)),
        (NamedKey::End, x11(107)),
        (NamedKey::PageUp, x11(104)),
        (NamedKey::PageDown, x11(109)),
        (NamedKey::F1, x11(59)),
        (NamedKey::F2, x11(60)),
        (NamedKey::F3, x11(61)),
        (NamedKey::F4, x11(62)),
        (NamedKey::F5, x11(63)),
        (NamedKey::F6, x11(64)),
        (NamedKey::F7, x11(65)),
        (NamedKey::F8, x11(66)),
        (NamedKey::F9, x11(67)),
        (NamedKey::F10, x11(68)),
        (NamedKey::F11, x11(87)),
        (NamedKey::F12, x11(88)),
    ],
    // KEY_LEFTMETA, KEY_LEFTCTRL, KEY_LEFTALT, KEY_LEFTSHIFT
    modifiers: [x11(125), x11(29), x11(56), x11(42)],
};

/// Mapping from logical keys to native key codes for one platform
#[derive(Clone, Copy)]
pub struct KeyCodeTable {
    platform: Platform,
    codes: &'static Codes,
}

impl fmt::Debug for KeyCodeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyCodeTable")
            .field("platform", &self.platform)
            .finish()
    }
}

impl KeyCodeTable {
    pub fn for_platform(platform: Platform) -> Self {
        let codes = match platform {
            Platform::MacOs => &MAC_CODES,
            Platform::Windows => &WINDOWS_CODES,
            Platform::Linux => &LINUX_CODES,
        };
        Self { platform, codes }
    }

    /// Table for the platform this binary was compiled for
    pub fn current() -> Self {
        Self::for_platform(Platform::current())
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Native code of a main key, or `None` when the platform has no such key
    pub fn code_for(&self, token: &KeyToken) -> Option<NativeKeyCode> {
        let code = match *token {
            KeyToken::Char(c @ 'a'..='z') => self.codes.letters[(c as u8 - b'a') as usize],
            KeyToken::Char(c @ '0'..='9') => self.codes.digits[(c as u8 - b'0') as usize],
            KeyToken::Char(c) => self
                .codes
                .punctuation
                .iter()
                .find(|(p, _)| *p == c)
                .map(|(_, code)| *code)?,
            KeyToken::Named(named) => self
                .codes
                .named
                .iter()
                .find(|(n, _)| *n == named)
                .map(|(_, code)| *code)?,
        };
        Some(NativeKeyCode(code))
    }

    /// Native code of the left-hand variant of a modifier
    pub fn modifier_code(&self, modifier: Modifier) -> NativeKeyCode {
        NativeKeyCode(self.codes.modifiers[modifier.index()])
    }

    /// Every main key this table can resolve, for listings
    pub fn entries(&self) -> Vec<(KeyToken, NativeKeyCode)> {
        let letters = ('a'..='z').map(KeyToken::Char);
        let digits = ('0'..='9').map(KeyToken::Char);
        let punctuation = self.codes.punctuation.iter().map(|(c, _)| KeyToken::Char(*c));
        let named = NamedKey::ALL.iter().map(|n| KeyToken::Named(*n));

        letters
            .chain(digits)
            .chain(punctuation)
            .chain(named)
            .filter_map(|token| self.code_for(&token).map(|code| (token, code)))
            .collect()
    }
}
