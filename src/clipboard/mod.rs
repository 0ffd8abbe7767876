//! System clipboard access
//!
//! Images cross this boundary as encoded PNG bytes. Backends shell out to
//! the platform's clipboard tools:
//!
//! - Wayland: wl-paste / wl-copy (wl-clipboard)
//! - X11: xclip
//! - macOS: osascript, pbpaste / pbcopy
//! - Windows: powershell
//!
//! Every tool invocation runs under the backend's lock with a timeout and
//! `kill_on_drop`, so a stuck tool cannot hold the clipboard past the call.

#[cfg(target_os = "macos")]
pub mod macos;
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub mod wayland;
#[cfg(target_os = "windows")]
pub mod windows;
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub mod x11;

use crate::error::ClipboardError;
use std::io::Cursor;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::Mutex;

/// First eight bytes of every PNG file
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Upper bound for one clipboard tool invocation
pub const TOOL_TIMEOUT: Duration = Duration::from_secs(5);

/// Trait for clipboard implementations
#[async_trait::async_trait]
pub trait ClipboardAdapter: Send + Sync {
    /// PNG bytes of the clipboard image, `None` when there is no image
    /// or the clipboard cannot be read
    async fn get_image(&self) -> Option<Vec<u8>>;

    /// Replace the clipboard contents with a PNG image
    async fn set_image(&self, png: &[u8]) -> Result<(), ClipboardError>;

    /// Plain-text contents, `None` when empty or not text
    async fn get_text(&self) -> Option<String>;

    /// Replace the clipboard contents with text; empty text clears it
    async fn set_text(&self, text: &str) -> Result<(), ClipboardError>;

    /// Check if the backing tools are installed
    async fn is_available(&self) -> bool;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Clipboard backend for the current session
pub fn create_clipboard() -> Box<dyn ClipboardAdapter> {
    #[cfg(target_os = "macos")]
    {
        Box::new(macos::MacClipboard::new())
    }

    #[cfg(target_os = "windows")]
    {
        Box::new(windows::WindowsClipboard::new())
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        if std::env::var_os("WAYLAND_DISPLAY").is_some() && which::which("wl-paste").is_ok() {
            Box::new(wayland::WaylandClipboard::new())
        } else {
            Box::new(x11::XclipClipboard::new())
        }
    }
}

pub fn is_png(bytes: &[u8]) -> bool {
    bytes.starts_with(&PNG_SIGNATURE)
}

/// Re-encode any supported image payload as PNG
///
/// PNG input is returned unchanged. BMP/DIB, TIFF and JPEG are decoded and
/// re-encoded.
pub fn to_png(bytes: Vec<u8>) -> Result<Vec<u8>, ClipboardError> {
    if is_png(&bytes) {
        return Ok(bytes);
    }
    let decoded =
        image::load_from_memory(&bytes).map_err(|e| ClipboardError::Format(e.to_string()))?;
    let mut out = Cursor::new(Vec::new());
    decoded
        .write_to(&mut out, image::ImageFormat::Png)
        .map_err(|e| ClipboardError::Format(e.to_string()))?;
    Ok(out.into_inner())
}

/// MIME types of image payloads, preferred first
#[cfg_attr(any(target_os = "macos", target_os = "windows"), allow(dead_code))]
pub(crate) const IMAGE_MIME_TYPES: [&str; 5] = [
    "image/png",
    "image/bmp",
    "image/tiff",
    "image/jpeg",
    "image/jpg",
];

/// Pick the best image type from a list of offered targets
#[cfg_attr(any(target_os = "macos", target_os = "windows"), allow(dead_code))]
pub(crate) fn pick_image_type<'a>(offered: impl IntoIterator<Item = &'a str>) -> Option<&'static str> {
    let offered: Vec<&str> = offered.into_iter().map(str::trim).collect();
    IMAGE_MIME_TYPES
        .iter()
        .copied()
        .find(|mime| offered.contains(mime))
}

/// Runs clipboard tools one at a time
#[derive(Debug, Default)]
pub(crate) struct ToolRunner {
    lock: Mutex<()>,
}

impl ToolRunner {
    #[cfg(test)]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Run `tool` and capture stdout
    ///
    /// A non-zero exit is `Ok(None)`: the tools use it for "nothing of
    /// that type on the clipboard".
    pub(crate) async fn read(
        &self,
        tool: &'static str,
        args: &[&str],
    ) -> Result<Option<Vec<u8>>, ClipboardError> {
        let _guard = self.lock.lock().await;

        let child = Command::new(tool)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(tool, e))?;

        let output = tokio::time::timeout(TOOL_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| ClipboardError::Unavailable(format!("{} timed out", tool)))?
            .map_err(|e| ClipboardError::Unavailable(format!("{}: {}", tool, e)))?;

        if !output.status.success() {
            tracing::trace!(
                "{} exited with {:?}: {}",
                tool,
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(None);
        }
        Ok(Some(output.stdout))
    }

    /// Run `tool` with `input` on stdin
    ///
    /// Only the exit status is awaited. Tools such as wl-copy and xclip fork
    /// a child that keeps serving the selection after the parent exits.
    pub(crate) async fn write(
        &self,
        tool: &'static str,
        args: &[&str],
        input: &[u8],
    ) -> Result<(), ClipboardError> {
        let _guard = self.lock.lock().await;

        let mut child = Command::new(tool)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(tool, e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input)
                .await
                .map_err(|e| ClipboardError::Unavailable(format!("{}: {}", tool, e)))?;

            // Close stdin to signal EOF
            drop(stdin);
        }

        let status = tokio::time::timeout(TOOL_TIMEOUT, child.wait())
            .await
            .map_err(|_| ClipboardError::Unavailable(format!("{} timed out", tool)))?
            .map_err(|e| ClipboardError::Unavailable(format!("{}: {}", tool, e)))?;

        if !status.success() {
            return Err(ClipboardError::Unavailable(format!(
                "{} exited with code {:?}",
                tool,
                status.code()
            )));
        }
        Ok(())
    }
}

fn spawn_error(tool: &'static str, e: std::io::Error) -> ClipboardError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ClipboardError::ToolNotFound(tool)
    } else {
        ClipboardError::Unavailable(format!("{}: {}", tool, e))
    }
}

/// Log a failed read and turn it into "nothing there"
pub(crate) fn absent_on_error<T>(backend: &str, result: Result<Option<T>, ClipboardError>) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("{} clipboard read failed: {}", backend, e);
            None
        }
    }
}

/// Decode tool output as text, treating empty output as no text
pub(crate) fn non_empty_text(bytes: Vec<u8>) -> Option<String> {
    let text = String::from_utf8_lossy(&bytes).into_owned();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 0, 0, 255]));
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}
