//! Hotkey strings such as `"ctrl+shift+g"`
//!
//! Tokens are joined with `+`, compared case-insensitively and trimmed.
//! The last token is the main key; every earlier token must be a modifier.

use super::keys::{KeyCodeTable, KeyToken, Modifier};
use crate::error::HotkeyError;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A parsed hotkey: the modifiers that must be held plus one main key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HotkeySpec {
    required_modifiers: BTreeSet<Modifier>,
    main_key: KeyToken,
}

impl HotkeySpec {
    /// Parse and check that the main key exists in `table`
    pub fn parse(input: &str, table: &KeyCodeTable) -> Result<Self, HotkeyError> {
        let spec = Self::parse_unchecked(input)?;
        if table.code_for(&spec.main_key).is_none() {
            return Err(HotkeyError::invalid(
                input,
                format!(
                    "key '{}' does not exist on {}",
                    spec.main_key,
                    table.platform()
                ),
            ));
        }
        Ok(spec)
    }

    /// Parse the syntax only, without consulting a key table
    ///
    /// Used for combos that are synthesized rather than listened for, where
    /// a missing native code is reported later as an unsupported key.
    pub fn parse_unchecked(input: &str) -> Result<Self, HotkeyError> {
        let lowered = input.trim().to_lowercase();
        if lowered.is_empty() {
            return Err(HotkeyError::invalid(input, "empty hotkey"));
        }

        let tokens: Vec<&str> = lowered.split('+').map(str::trim).collect();
        let (main, modifier_tokens) = tokens
            .split_last()
            .ok_or_else(|| HotkeyError::invalid(input, "empty hotkey"))?;

        let mut required_modifiers = BTreeSet::new();
        for token in modifier_tokens {
            if token.is_empty() {
                return Err(HotkeyError::invalid(input, "empty token between '+'"));
            }
            let modifier = Modifier::from_token(token)
                .ok_or_else(|| HotkeyError::invalid(input, format!("unknown modifier '{}'", token)))?;
            required_modifiers.insert(modifier);
        }

        if main.is_empty() {
            return Err(HotkeyError::invalid(input, "missing main key"));
        }
        if Modifier::from_token(main).is_some() {
            return Err(HotkeyError::invalid(
                input,
                format!("main key '{}' is a modifier", main),
            ));
        }
        let main_key = KeyToken::parse(main)
            .ok_or_else(|| HotkeyError::invalid(input, format!("unknown key '{}'", main)))?;

        Ok(Self {
            required_modifiers,
            main_key,
        })
    }

    pub fn new(required_modifiers: impl IntoIterator<Item = Modifier>, main_key: KeyToken) -> Self {
        Self {
            required_modifiers: required_modifiers.into_iter().collect(),
            main_key,
        }
    }

    pub fn required_modifiers(&self) -> &BTreeSet<Modifier> {
        &self.required_modifiers
    }

    pub fn main_key(&self) -> KeyToken {
        self.main_key
    }

    /// Modifiers in the order they are pressed when synthesizing
    pub fn modifiers_in_canonical_order(&self) -> Vec<Modifier> {
        Modifier::CANONICAL_ORDER
            .iter()
            .copied()
            .filter(|m| self.required_modifiers.contains(m))
            .collect()
    }
}

impl FromStr for HotkeySpec {
    type Err = HotkeyError;

    /// Parse against the key table of the current platform
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, &KeyCodeTable::current())
    }
}

impl fmt::Display for HotkeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in self.modifiers_in_canonical_order() {
            write!(f, "{}+", modifier.token())?;
        }
        write!(f, "{}", self.main_key)
    }
}
