//! Clipstamp: turn the selected text or image into a templated picture
//!
//! This library provides the core functionality for:
//! - Parsing hotkey strings and matching them against global key events (rdev)
//! - Synthesizing select-all / cut / paste / send keystrokes with settle delays
//! - Reading and writing text and PNG images on the system clipboard
//! - Delegating rendering to an external composer command
//!
//! # Architecture
//!
//! ```text
//!          ┌─────────────────────────────────────┐
//!          │               Daemon                │
//!          └─────────────────────────────────────┘
//!                             │
//!                             ▼
//!          ┌─────────────────────────────────────┐
//!          │  Hotkey listener thread (rdev)      │
//!          │  ModifierTracker ─▶ HotkeyMatcher   │
//!          └─────────────────────────────────────┘
//!                             │ fires (callback blocks the listener)
//!                             ▼
//!          ┌─────────────────────────────────────┐
//!          │          TriggerPipeline            │
//!          │ select all ─▶ cut ─▶ read clipboard │
//!          └─────────────────────────────────────┘
//!                   │                    │
//!                   ▼ text / image       │
//!          ┌──────────────┐              │
//!          │   Composer   │              │
//!          │  (command)   │              │
//!          └──────────────┘              │
//!                   │ PNG                │
//!                   ▼                    ▼
//!          ┌─────────────────────────────────────┐
//!          │  PlatformAdapter                    │
//!          │  clipboard ◀─ PNG, paste ─▶ send    │
//!          └─────────────────────────────────────┘
//! ```

pub mod cli;
pub mod clipboard;
pub mod compose;
pub mod config;
pub mod daemon;
pub mod error;
pub mod hotkey;
pub mod pipeline;
pub mod platform;
pub mod synth;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use daemon::Daemon;
pub use error::{ClipstampError, Result};
