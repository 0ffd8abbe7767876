//! Error types for clipstamp
//!
//! Uses thiserror for ergonomic error definitions with clear messages
//! that guide users toward fixing common issues.

use thiserror::Error;

/// Top-level error type for the clipstamp application
#[derive(Error, Debug)]
pub enum ClipstampError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Hotkey error: {0}")]
    Hotkey(#[from] HotkeyError),

    #[error("Keystroke error: {0}")]
    Synth(#[from] SynthError),

    #[error("Clipboard error: {0}")]
    Clipboard(#[from] ClipboardError),

    #[error("Composition error: {0}")]
    Compose(#[from] ComposeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to hotkey parsing and the global key listener
#[derive(Error, Debug)]
pub enum HotkeyError {
    #[error("Invalid hotkey '{spec}': {reason}")]
    InvalidSpec { spec: String, reason: String },

    #[error("Global key events need extra privileges: {0}")]
    PermissionDenied(String),

    #[error("Hotkey listener is already running")]
    AlreadyRunning,

    #[error("Failed to spawn listener thread: {0}")]
    ThreadSpawn(String),

    #[error("Global key listener failed: {0}")]
    Listen(String),
}

impl HotkeyError {
    pub(crate) fn invalid(spec: &str, reason: impl Into<String>) -> Self {
        HotkeyError::InvalidSpec {
            spec: spec.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors related to synthetic keystrokes
#[derive(Error, Debug)]
pub enum SynthError {
    #[error("Key '{key}' has no native key code on {platform}")]
    UnsupportedKey { key: String, platform: String },

    #[error("Key event simulation failed: {0}")]
    Simulate(String),

    #[error("Invalid key combination: {0}")]
    Combo(#[from] HotkeyError),
}

/// Errors related to the system clipboard
#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),

    #[error("{0} not found in PATH. Install it via your package manager.")]
    ToolNotFound(&'static str),

    #[error("Unsupported clipboard image data: {0}")]
    Format(String),
}

/// Errors from the image composer collaborator
#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("No composer command configured. Set [composer] command in the config file.")]
    NotConfigured,

    #[error("Failed to spawn composer: {0}")]
    SpawnFailed(String),

    #[error("Failed to write composer request: {0}")]
    WriteFailed(String),

    #[error("Composer timed out after {0}ms")]
    Timeout(u64),

    #[error("Composer exited with code {code:?}: {stderr}")]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("Composer produced no output")]
    EmptyOutput,

    #[error("Composer output is not a PNG image")]
    NotPng,

    #[error("Composer IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using ClipstampError
pub type Result<T> = std::result::Result<T, ClipstampError>;

