//! Configuration loading and types for clipstamp
//!
//! Configuration is loaded in layers:
//! 1. Built-in defaults
//! 2. Config file (~/.config/clipstamp/config.toml)
//! 3. Environment variables (CLIPSTAMP_*)
//! 4. CLI arguments (highest priority)

use crate::compose::{Align, ImageRequest, TextRequest, VAlign};
use crate::error::{ClipstampError, HotkeyError};
use crate::hotkey::{HotkeySpec, KeyCodeTable};
use crate::synth::{SynthTiming, TRAILING_DELAY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = r#"# Clipstamp Configuration
#
# Location: ~/.config/clipstamp/config.toml
# Relative paths are resolved against the directory of this file.

[hotkey]
# Hotkey that starts a run. Modifiers first, main key last, joined with "+".
# Case-insensitive. Modifiers: ctrl, cmd (win/super), alt (opt), shift.
# Examples: "ctrl+/", "ctrl+shift+g", "alt+enter", "f5"
# Run `clipstamp keys` to list the main keys of your platform.
trigger = "ctrl+/"

# Combos sent to the foreground application. These are synthesized, never
# listened for. On macOS "ctrl" is sent as Command.
select_all = "ctrl+a"
cut = "ctrl+x"
paste = "ctrl+v"
send = "enter"

# Keep the trigger keystroke from reaching the foreground application.
# Forced on when trigger and send are the same key, so an auto-sent
# Enter cannot start another run.
block = false

[timing]
# Pause between operations in seconds. Increase it if the selection or the
# paste is missed.
delay_secs = 0.1

# Pause after every synthetic key event, and after the main key of a chord
# modifier_settle_ms = 10
# chord_settle_ms = 50

[template]
# Base image that text or images are drawn onto
base_image = "base.png"

# Image drawn on top of the result, used to show occlusion
overlay = "base_overlay.png"
use_overlay = true

# Layout box corners in pixels, (0, 0) is the top-left of the base image
top_left = [119, 450]
bottom_right = [398, 625]

# Text rendering
font = "font.ttf"
text_color = [0, 0, 0]
max_font_height = 64

# Image placement: align = left | center | right, valign = top | middle | bottom
align = "center"
valign = "middle"
padding = 12
allow_upscale = true
keep_alpha = true

[output]
# Paste the generated image into the foreground application
auto_paste = true

# Press the send combo after pasting (only with auto_paste)
auto_send = false

[composer]
# Command that renders the image. Receives a JSON request on stdin and
# prints a PNG on stdout.
# command = "clipstamp-render"
# timeout_ms = 10000
"#;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub hotkey: HotkeyConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub template: TemplateConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub composer: ComposerConfig,
}

/// Hotkey configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HotkeyConfig {
    /// Hotkey that triggers a run
    #[serde(default = "default_trigger")]
    pub trigger: String,

    #[serde(default = "default_select_all")]
    pub select_all: String,

    #[serde(default = "default_cut")]
    pub cut: String,

    #[serde(default = "default_paste")]
    pub paste: String,

    #[serde(default = "default_send")]
    pub send: String,

    /// Swallow the trigger keystroke
    #[serde(default)]
    pub block: bool,
}

fn default_trigger() -> String {
    "ctrl+/".to_string()
}

fn default_select_all() -> String {
    "ctrl+a".to_string()
}

fn default_cut() -> String {
    "ctrl+x".to_string()
}

fn default_paste() -> String {
    "ctrl+v".to_string()
}

fn default_send() -> String {
    "enter".to_string()
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            trigger: default_trigger(),
            select_all: default_select_all(),
            cut: default_cut(),
            paste: default_paste(),
            send: default_send(),
            block: false,
        }
    }
}

/// Timing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimingConfig {
    /// Pause between operations, in seconds
    #[serde(default = "default_delay_secs")]
    pub delay_secs: f64,

    #[serde(default = "default_modifier_settle_ms")]
    pub modifier_settle_ms: u64,

    #[serde(default = "default_chord_settle_ms")]
    pub chord_settle_ms: u64,
}

fn default_delay_secs() -> f64 {
    0.1
}

fn default_modifier_settle_ms() -> u64 {
    10
}

fn default_chord_settle_ms() -> u64 {
    50
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            delay_secs: default_delay_secs(),
            modifier_settle_ms: default_modifier_settle_ms(),
            chord_settle_ms: default_chord_settle_ms(),
        }
    }
}

impl TimingConfig {
    /// Inter-operation delay; negative or non-finite values count as zero
    pub fn delay(&self) -> Duration {
        if self.delay_secs.is_finite() && self.delay_secs > 0.0 {
            Duration::from_secs_f64(self.delay_secs)
        } else {
            Duration::ZERO
        }
    }

    /// Synthesis timing; the trailing pause is the inter-operation delay
    pub fn synth_timing(&self) -> SynthTiming {
        let delay = self.delay();
        SynthTiming {
            modifier_settle: Duration::from_millis(self.modifier_settle_ms),
            chord_settle: Duration::from_millis(self.chord_settle_ms),
            trailing: if delay.is_zero() { TRAILING_DELAY } else { delay },
        }
    }
}

/// Template and layout configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TemplateConfig {
    #[serde(default = "default_base_image")]
    pub base_image: PathBuf,

    #[serde(default = "default_overlay")]
    pub overlay: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub use_overlay: bool,

    #[serde(default = "default_top_left")]
    pub top_left: (u32, u32),

    #[serde(default = "default_bottom_right")]
    pub bottom_right: (u32, u32),

    #[serde(default = "default_font")]
    pub font: Option<PathBuf>,

    #[serde(default)]
    pub text_color: [u8; 3],

    #[serde(default = "default_max_font_height")]
    pub max_font_height: u32,

    #[serde(default)]
    pub align: Align,

    #[serde(default)]
    pub valign: VAlign,

    #[serde(default = "default_padding")]
    pub padding: u32,

    #[serde(default = "default_true")]
    pub allow_upscale: bool,

    #[serde(default = "default_true")]
    pub keep_alpha: bool,
}

fn default_base_image() -> PathBuf {
    PathBuf::from("base.png")
}

fn default_overlay() -> Option<PathBuf> {
    Some(PathBuf::from("base_overlay.png"))
}

fn default_top_left() -> (u32, u32) {
    (119, 450)
}

fn default_bottom_right() -> (u32, u32) {
    (119 + 279, 450 + 175)
}

fn default_font() -> Option<PathBuf> {
    Some(PathBuf::from("font.ttf"))
}

fn default_max_font_height() -> u32 {
    64
}

fn default_padding() -> u32 {
    12
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            base_image: default_base_image(),
            overlay: default_overlay(),
            use_overlay: true,
            top_left: default_top_left(),
            bottom_right: default_bottom_right(),
            font: default_font(),
            text_color: [0, 0, 0],
            max_font_height: default_max_font_height(),
            align: Align::Center,
            valign: VAlign::Middle,
            padding: default_padding(),
            allow_upscale: true,
            keep_alpha: true,
        }
    }
}

impl TemplateConfig {
    /// Overlay to draw, if enabled
    pub fn active_overlay(&self) -> Option<PathBuf> {
        if self.use_overlay {
            self.overlay.clone()
        } else {
            None
        }
    }

    pub fn text_request(&self, text: &str) -> TextRequest {
        TextRequest {
            template: self.base_image.clone(),
            overlay: self.active_overlay(),
            top_left: self.top_left,
            bottom_right: self.bottom_right,
            text: text.to_string(),
            color: self.text_color,
            max_font_height: self.max_font_height,
            font: self.font.clone(),
        }
    }

    pub fn image_request(&self, content: Vec<u8>) -> ImageRequest {
        ImageRequest {
            template: self.base_image.clone(),
            overlay: self.active_overlay(),
            top_left: self.top_left,
            bottom_right: self.bottom_right,
            content,
            align: self.align,
            valign: self.valign,
            padding: self.padding,
            allow_upscale: self.allow_upscale,
            keep_alpha: self.keep_alpha,
        }
    }

    /// Make relative paths relative to `base`
    fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.base_image);
        if let Some(overlay) = self.overlay.as_mut() {
            resolve(overlay);
        }
        if let Some(font) = self.font.as_mut() {
            resolve(font);
        }
    }
}

/// What happens after the image is on the clipboard
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_true")]
    pub auto_paste: bool,

    #[serde(default)]
    pub auto_send: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            auto_paste: true,
            auto_send: false,
        }
    }
}

/// External composer command configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ComposerConfig {
    /// Shell command to execute
    #[serde(default)]
    pub command: String,

    /// Timeout in milliseconds (default: 10000 = 10 seconds)
    #[serde(default = "default_composer_timeout")]
    pub timeout_ms: u64,
}

fn default_composer_timeout() -> u64 {
    10000
}

fn default_true() -> bool {
    true
}

/// Every configured hotkey, parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeySet {
    pub trigger: HotkeySpec,
    pub select_all: HotkeySpec,
    pub cut: HotkeySpec,
    pub paste: HotkeySpec,
    pub send: HotkeySpec,
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get the config directory path
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "clipstamp")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the runtime directory for ephemeral files (lock file)
    pub fn runtime_dir() -> PathBuf {
        // Use XDG_RUNTIME_DIR if available, otherwise fall back to the temp dir
        std::env::var("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir())
            .join("clipstamp")
    }

    /// Path of the single-instance lock file
    pub fn lock_path() -> PathBuf {
        Self::runtime_dir().join("clipstamp.lock")
    }

    /// Parse every hotkey and check the layout box
    ///
    /// The trigger must exist in the key table of `table`'s platform, since
    /// it is listened for. Synthesized combos only need valid syntax; a key
    /// the platform cannot send is reported when it is sent.
    pub fn validate(&self, table: &KeyCodeTable) -> Result<HotkeySet, ClipstampError> {
        let trigger = HotkeySpec::parse(&self.hotkey.trigger, table)?;

        let synthesized = |combo: &str| -> Result<HotkeySpec, HotkeyError> {
            let spec = HotkeySpec::parse_unchecked(combo)?;
            if table.code_for(&spec.main_key()).is_none() {
                tracing::warn!(
                    "'{}' cannot be sent on {}: no key code for '{}'",
                    combo,
                    table.platform(),
                    spec.main_key()
                );
            }
            Ok(spec)
        };

        let set = HotkeySet {
            trigger,
            select_all: synthesized(&self.hotkey.select_all)?,
            cut: synthesized(&self.hotkey.cut)?,
            paste: synthesized(&self.hotkey.paste)?,
            send: synthesized(&self.hotkey.send)?,
        };

        let (x0, y0) = self.template.top_left;
        let (x1, y1) = self.template.bottom_right;
        if x1 <= x0 || y1 <= y0 {
            return Err(ClipstampError::Config(format!(
                "template box is empty: top_left ({}, {}) must be above and left of bottom_right ({}, {})",
                x0, y0, x1, y1
            )));
        }

        Ok(set)
    }

    /// Block mode, forced on when the trigger is also the send combo
    pub fn effective_block(&self, hotkeys: &HotkeySet) -> bool {
        self.hotkey.block || hotkeys.trigger == hotkeys.send
    }
}

/// Load configuration from file, with defaults for missing values
pub fn load_config(path: Option<&Path>) -> Result<Config, ClipstampError> {
    // Start with defaults
    let mut config = Config::default();

    // Determine config file path
    let config_path = path.map(PathBuf::from).or_else(Config::default_path);

    // Load from file if it exists
    if let Some(ref path) = config_path {
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            let contents = std::fs::read_to_string(path)
                .map_err(|e| ClipstampError::Config(format!("Failed to read config: {}", e)))?;

            config = toml::from_str(&contents)
                .map_err(|e| ClipstampError::Config(format!("Invalid config: {}", e)))?;

            if let Some(dir) = path.parent() {
                config.template.resolve_relative_to(dir);
            }
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
        }
    }

    apply_env_overrides(&mut config);
    Ok(config)
}

/// Override from environment variables
fn apply_env_overrides(config: &mut Config) {
    if let Ok(hotkey) = std::env::var("CLIPSTAMP_HOTKEY") {
        config.hotkey.trigger = hotkey;
    }
    if let Ok(delay) = std::env::var("CLIPSTAMP_DELAY") {
        match delay.trim().parse::<f64>() {
            Ok(secs) => config.timing.delay_secs = secs,
            Err(_) => tracing::warn!("Ignoring CLIPSTAMP_DELAY={:?}: not a number", delay),
        }
    }
    if let Ok(command) = std::env::var("CLIPSTAMP_COMPOSER") {
        config.composer.command = command;
    }
}

/// Save configuration to file
pub fn save_config(config: &Config, path: &Path) -> Result<(), ClipstampError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ClipstampError::Config(format!("Failed to create config dir: {}", e)))?;
    }

    let contents = toml::to_string_pretty(config)
        .map_err(|e| ClipstampError::Config(format!("Failed to serialize config: {}", e)))?;

    std::fs::write(path, contents)
        .map_err(|e| ClipstampError::Config(format!("Failed to write config: {}", e)))?;

    Ok(())
}
