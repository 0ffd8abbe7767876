//! X11 clipboard via xclip
//!
//! Uses the CLIPBOARD selection (the standard clipboard), not PRIMARY.
//!
//! Requires: xclip package installed

use super::{absent_on_error, non_empty_text, pick_image_type, to_png, ClipboardAdapter, ToolRunner};
use crate::error::ClipboardError;

/// X11 clipboard using xclip
#[derive(Debug, Default)]
pub struct XclipClipboard {
    runner: ToolRunner,
}

impl XclipClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_image(&self) -> Result<Option<Vec<u8>>, ClipboardError> {
        let Some(targets) = self
            .runner
            .read("xclip", &["-selection", "clipboard", "-t", "TARGETS", "-o"])
            .await?
        else {
            return Ok(None);
        };
        let targets = String::from_utf8_lossy(&targets);
        let Some(mime) = pick_image_type(targets.lines()) else {
            return Ok(None);
        };

        match self
            .runner
            .read("xclip", &["-selection", "clipboard", "-t", mime, "-o"])
            .await?
        {
            Some(bytes) if !bytes.is_empty() => to_png(bytes).map(Some),
            _ => Ok(None),
        }
    }
}

#[async_trait::async_trait]
impl ClipboardAdapter for XclipClipboard {
    async fn get_image(&self) -> Option<Vec<u8>> {
        absent_on_error(self.name(), self.read_image().await)
    }

    async fn set_image(&self, png: &[u8]) -> Result<(), ClipboardError> {
        self.runner
            .write("xclip", &["-selection", "clipboard", "-t", "image/png", "-i"], png)
            .await
    }

    async fn get_text(&self) -> Option<String> {
        let result = self
            .runner
            .read("xclip", &["-selection", "clipboard", "-t", "UTF8_STRING", "-o"])
            .await;
        absent_on_error(self.name(), result).and_then(non_empty_text)
    }

    async fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        self.runner
            .write("xclip", &["-selection", "clipboard", "-i"], text.as_bytes())
            .await
    }

    async fn is_available(&self) -> bool {
        which::which("xclip").is_ok()
    }

    fn name(&self) -> &'static str {
        "xclip"
    }
}
