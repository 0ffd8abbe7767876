//! macOS clipboard via osascript, pbpaste and pbcopy
//!
//! AppleScript exposes clipboard images as `«data PNGf…»` / `«data TIFF…»`
//! literals with the payload hex-encoded.

use super::{absent_on_error, non_empty_text, to_png, ClipboardAdapter, ToolRunner};
use crate::error::ClipboardError;
use std::io::Write;

/// macOS clipboard
#[derive(Debug, Default)]
pub struct MacClipboard {
    runner: ToolRunner,
}

impl MacClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_class(&self, class: &str) -> Result<Option<Vec<u8>>, ClipboardError> {
        let script = format!("the clipboard as «class {}»", class);
        let output = self.runner.read("osascript", &["-e", &script]).await?;
        Ok(output.and_then(|bytes| parse_applescript_data(&String::from_utf8_lossy(&bytes))))
    }

    async fn read_image(&self) -> Result<Option<Vec<u8>>, ClipboardError> {
        if let Some(png) = self.read_class("PNGf").await? {
            return Ok(Some(png));
        }
        // Screenshots and some apps only offer TIFF
        match self.read_class("TIFF").await? {
            Some(tiff) => to_png(tiff).map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait::async_trait]
impl ClipboardAdapter for MacClipboard {
    async fn get_image(&self) -> Option<Vec<u8>> {
        absent_on_error(self.name(), self.read_image().await)
    }

    async fn set_image(&self, png: &[u8]) -> Result<(), ClipboardError> {
        let mut file = tempfile::Builder::new()
            .prefix("clipstamp-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
        file.write_all(png)
            .and_then(|_| file.flush())
            .map_err(|e| ClipboardError::Unavailable(e.to_string()))?;

        let path = file.path().display().to_string();
        let escaped = path.replace('\\', "\\\\").replace('"', "\\\"");
        let script = format!(
            r#"set the clipboard to (read (POSIX file "{}") as «class PNGf»)"#,
            escaped
        );
        self.runner.write("osascript", &["-e", &script], b"").await
    }

    async fn get_text(&self) -> Option<String> {
        let result = self.runner.read("pbpaste", &[]).await;
        absent_on_error(self.name(), result).and_then(non_empty_text)
    }

    async fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        self.runner.write("pbcopy", &[], text.as_bytes()).await
    }

    async fn is_available(&self) -> bool {
        which::which("osascript").is_ok() && which::which("pbcopy").is_ok()
    }

    fn name(&self) -> &'static str {
        "osascript"
    }
}

/// Decode an AppleScript data literal such as `«data PNGf89504E47…»`
fn parse_applescript_data(output: &str) -> Option<Vec<u8>> {
    let body = output
        .trim()
        .strip_prefix("«data ")?
        .strip_suffix('»')?;
    // Four-character class code, then hex
    let hex = body.get(4..)?;
    if hex.is_empty() || hex.len() % 2 != 0 || !hex.is_ascii() {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}
