// Command-line interface definitions for clipstamp
//
// This module is separate so it can be used by both the binary (main.rs)
// and build.rs for generating man pages.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "clipstamp")]
#[command(author, version, about = "Turn the selected text or image into a templated picture")]
#[command(long_about = "
Clipstamp stamps whatever you are typing onto a template picture.

Press the hotkey in any text field. Clipstamp selects and cuts the text
(or takes the image on the clipboard), renders it into the box of the
template image, copies the result and pastes it back.

SETUP:
  1. Write a config: clipstamp config --init
  2. Set [composer] command to the program that renders the picture
  3. Put base.png, base_overlay.png and font.ttf next to the config
  4. macOS: grant Accessibility permission to your terminal
  5. Run: clipstamp (to start the daemon)

USAGE:
  Press Ctrl+/ (default) in a text field. Run `clipstamp keys` to see
  the keys that can be used in hotkeys.
")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<std::path::PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Override the trigger hotkey (e.g., "ctrl+/", "ctrl+shift+g", "f5")
    #[arg(long, value_name = "HOTKEY")]
    pub hotkey: Option<String>,

    /// Keep the trigger keystroke from reaching the focused application
    #[arg(long)]
    pub block: bool,

    /// Only copy the picture, don't paste it
    #[arg(long)]
    pub no_paste: bool,

    /// Press the send key after pasting
    #[arg(long)]
    pub send: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the hotkey daemon (default if no command specified)
    Run,

    /// Show current configuration
    Config {
        /// Write a commented default config file if none exists
        #[arg(long)]
        init: bool,

        /// Save the effective configuration (file, environment and flags)
        #[arg(long, conflicts_with = "init")]
        save: bool,
    },

    /// Parse a hotkey and show the native key codes it uses
    Check {
        /// Hotkey string, e.g. "ctrl+shift+g"
        hotkey: String,
    },

    /// List the keys usable in hotkeys on this platform
    Keys,

    /// Send one key combination to the focused application
    Send {
        /// Key combination, e.g. "ctrl+v"
        combo: String,

        /// Wait before sending, to focus another window
        #[arg(long, value_name = "MS", default_value_t = 0)]
        delay_ms: u64,

        /// Print the events that would be sent instead of sending them
        #[arg(long)]
        dry_run: bool,
    },
}
