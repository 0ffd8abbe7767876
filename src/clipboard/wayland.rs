//! Wayland clipboard via wl-clipboard
//!
//! Requires: wl-clipboard package installed (wl-copy, wl-paste)

use super::{absent_on_error, non_empty_text, pick_image_type, to_png, ClipboardAdapter, ToolRunner};
use crate::error::ClipboardError;

/// Wayland clipboard using wl-paste and wl-copy
#[derive(Debug, Default)]
pub struct WaylandClipboard {
    runner: ToolRunner,
}

impl WaylandClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read_image(&self) -> Result<Option<Vec<u8>>, ClipboardError> {
        let Some(types) = self.runner.read("wl-paste", &["--list-types"]).await? else {
            return Ok(None);
        };
        let types = String::from_utf8_lossy(&types);
        let Some(mime) = pick_image_type(types.lines()) else {
            return Ok(None);
        };

        match self
            .runner
            .read("wl-paste", &["--no-newline", "--type", mime])
            .await?
        {
            Some(bytes) if !bytes.is_empty() => to_png(bytes).map(Some),
            _ => Ok(None),
        }
    }
}

#[async_trait::async_trait]
impl ClipboardAdapter for WaylandClipboard {
    async fn get_image(&self) -> Option<Vec<u8>> {
        absent_on_error(self.name(), self.read_image().await)
    }

    async fn set_image(&self, png: &[u8]) -> Result<(), ClipboardError> {
        self.runner
            .write("wl-copy", &["--type", "image/png"], png)
            .await
    }

    async fn get_text(&self) -> Option<String> {
        let result = self
            .runner
            .read("wl-paste", &["--no-newline", "--type", "text/plain"])
            .await;
        absent_on_error(self.name(), result).and_then(non_empty_text)
    }

    async fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        if text.is_empty() {
            return self.runner.write("wl-copy", &["--clear"], b"").await;
        }
        self.runner
            .write("wl-copy", &["--type", "text/plain;charset=utf-8"], text.as_bytes())
            .await
    }

    async fn is_available(&self) -> bool {
        which::which("wl-paste").is_ok() && which::which("wl-copy").is_ok()
    }

    fn name(&self) -> &'static str {
        "wl-clipboard"
    }
}
