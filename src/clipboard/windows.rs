//! Windows clipboard via PowerShell
//!
//! Images go through a temp PNG file. System.Windows.Forms hands the
//! clipboard DIB over as a System.Drawing image, which saves as PNG.

use super::{absent_on_error, non_empty_text, to_png, ClipboardAdapter, ToolRunner};
use crate::error::ClipboardError;

/// Windows clipboard using powershell
#[derive(Debug, Default)]
pub struct WindowsClipboard {
    runner: ToolRunner,
}

impl WindowsClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn temp_png() -> Result<tempfile::TempPath, ClipboardError> {
        tempfile::Builder::new()
            .prefix("clipstamp-")
            .suffix(".png")
            .tempfile()
            .map(|f| f.into_temp_path())
            .map_err(|e| ClipboardError::Unavailable(e.to_string()))
    }

    async fn read_image(&self) -> Result<Option<Vec<u8>>, ClipboardError> {
        let path = Self::temp_png()?;
        let script = format!(
            "Add-Type -AssemblyName System.Windows.Forms; \
             $img = [System.Windows.Forms.Clipboard]::GetImage(); \
             if ($img -eq $null) {{ exit 3 }}; \
             $img.Save('{}', [System.Drawing.Imaging.ImageFormat]::Png)",
            ps_quote(&path.display().to_string())
        );
        let status = self
            .runner
            .read("powershell", &["-NoProfile", "-STA", "-Command", &script])
            .await?;
        if status.is_none() {
            return Ok(None);
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
        if bytes.is_empty() {
            return Ok(None);
        }
        to_png(bytes).map(Some)
    }
}

#[async_trait::async_trait]
impl ClipboardAdapter for WindowsClipboard {
    async fn get_image(&self) -> Option<Vec<u8>> {
        absent_on_error(self.name(), self.read_image().await)
    }

    async fn set_image(&self, png: &[u8]) -> Result<(), ClipboardError> {
        let path = Self::temp_png()?;
        tokio::fs::write(&path, png)
            .await
            .map_err(|e| ClipboardError::Unavailable(e.to_string()))?;

        let script = format!(
            "Add-Type -AssemblyName System.Windows.Forms; \
             Add-Type -AssemblyName System.Drawing; \
             $img = [System.Drawing.Image]::FromFile('{}'); \
             [System.Windows.Forms.Clipboard]::SetImage($img); \
             $img.Dispose()",
            ps_quote(&path.display().to_string())
        );
        self.runner
            .write("powershell", &["-NoProfile", "-STA", "-Command", &script], b"")
            .await
    }

    async fn get_text(&self) -> Option<String> {
        let result = self
            .runner
            .read("powershell", &["-NoProfile", "-Command", GET_TEXT_SCRIPT])
            .await;
        absent_on_error(self.name(), result).and_then(utf8_text)
    }

    async fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        if text.is_empty() {
            return self
                .runner
                .write(
                    "powershell",
                    &["-NoProfile", "-Command", "Set-Clipboard -Value $null"],
                    b"",
                )
                .await;
        }
        // Read value from stdin to avoid quoting/escaping issues
        self.runner
            .write(
                "powershell",
                &["-NoProfile", "-Command", SET_TEXT_SCRIPT],
                text.as_bytes(),
            )
            .await
    }

    async fn is_available(&self) -> bool {
        which::which("powershell").is_ok()
    }

    fn name(&self) -> &'static str {
        "powershell"
    }
}

// Piped console streams default to the OEM code page; force BOM-less UTF-8
// both ways and write the text without a trailing newline.
const GET_TEXT_SCRIPT: &str = "[Console]::OutputEncoding = New-Object System.Text.UTF8Encoding $false; \
     $text = Get-Clipboard -Raw; \
     if ($text) { [Console]::Out.Write($text) }";

const SET_TEXT_SCRIPT: &str = "[Console]::InputEncoding = New-Object System.Text.UTF8Encoding $false; \
     Set-Clipboard -Value ([Console]::In.ReadToEnd())";

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Decode PowerShell output, dropping a UTF-8 byte order mark if one slipped through
fn utf8_text(bytes: Vec<u8>) -> Option<String> {
    match bytes.strip_prefix(UTF8_BOM) {
        Some(rest) => non_empty_text(rest.to_vec()),
        None => non_empty_text(bytes),
    }
}

/// Escape for a single-quoted PowerShell string
fn ps_quote(s: &str) -> String {
    s.replace('\'', "''")
}
