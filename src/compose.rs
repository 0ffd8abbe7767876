//! Image composition
//!
//! Rendering text or an image onto the template is delegated to an
//! [`ImageComposer`]. The bundled implementation runs an external command:
//!
//! ```toml
//! [composer]
//! command = "clipstamp-render"
//! timeout_ms = 10000
//! ```
//!
//! The command receives one JSON request on stdin and must print the
//! resulting PNG on stdout. For image requests the content image is passed
//! as a path to a temporary PNG file (`content_path`).
//!
//! ```json
//! {"kind":"text","template":"base.png","overlay":"base_overlay.png",
//!  "top_left":[119,450],"bottom_right":[398,625],"text":"hi",
//!  "color":[0,0,0],"max_font_height":64,"font":"font.ttf"}
//! ```

use crate::clipboard::is_png;
use crate::config::ComposerConfig;
use crate::error::ComposeError;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

/// Horizontal placement of content inside the layout box
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    #[default]
    Center,
    Right,
}

/// Vertical placement of content inside the layout box
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VAlign {
    Top,
    #[default]
    Middle,
    Bottom,
}

/// Request to draw text into the layout box
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextRequest {
    pub template: PathBuf,
    pub overlay: Option<PathBuf>,
    pub top_left: (u32, u32),
    pub bottom_right: (u32, u32),
    pub text: String,
    pub color: [u8; 3],
    pub max_font_height: u32,
    pub font: Option<PathBuf>,
}

/// Request to fit an image into the layout box
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRequest {
    pub template: PathBuf,
    pub overlay: Option<PathBuf>,
    pub top_left: (u32, u32),
    pub bottom_right: (u32, u32),
    /// PNG bytes of the content image
    #[serde(skip)]
    pub content: Vec<u8>,
    pub align: Align,
    pub valign: VAlign,
    pub padding: u32,
    pub allow_upscale: bool,
    pub keep_alpha: bool,
}

/// Produces the final PNG
#[async_trait::async_trait]
pub trait ImageComposer: Send + Sync {
    async fn render_text(&self, request: &TextRequest) -> Result<Vec<u8>, ComposeError>;

    async fn render_image(&self, request: &ImageRequest) -> Result<Vec<u8>, ComposeError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum WireRequest<'a> {
    Text(&'a TextRequest),
    Image {
        #[serde(flatten)]
        request: &'a ImageRequest,
        content_path: &'a Path,
    },
}

/// Composer that runs an external command
pub struct CommandComposer {
    command: String,
    timeout: Duration,
}

impl CommandComposer {
    pub fn new(config: &ComposerConfig) -> Self {
        Self {
            command: config.command.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    async fn execute(&self, request: &WireRequest<'_>) -> Result<Vec<u8>, ComposeError> {
        if self.command.trim().is_empty() {
            return Err(ComposeError::NotConfigured);
        }
        let payload =
            serde_json::to_vec(request).map_err(|e| ComposeError::WriteFailed(e.to_string()))?;

        // Spawn command via shell for proper parsing of complex commands
        let mut child = shell_command(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ComposeError::SpawnFailed(e.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(&payload).await {
                Ok(()) => {}
                // The command may not read its request at all
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    tracing::trace!("Composer closed stdin early");
                }
                Err(e) => return Err(ComposeError::WriteFailed(e.to_string())),
            }
            // Close stdin to signal EOF
            drop(stdin);
        }

        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ComposeError::Timeout(self.timeout.as_millis() as u64))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ComposeError::NonZeroExit {
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }
        if output.stdout.is_empty() {
            return Err(ComposeError::EmptyOutput);
        }
        if !is_png(&output.stdout) {
            return Err(ComposeError::NotPng);
        }
        Ok(output.stdout)
    }
}

#[async_trait::async_trait]
impl ImageComposer for CommandComposer {
    async fn render_text(&self, request: &TextRequest) -> Result<Vec<u8>, ComposeError> {
        self.execute(&WireRequest::Text(request)).await
    }

    async fn render_image(&self, request: &ImageRequest) -> Result<Vec<u8>, ComposeError> {
        let mut content = tempfile::Builder::new()
            .prefix("clipstamp-content-")
            .suffix(".png")
            .tempfile()?;
        content.write_all(&request.content)?;
        content.flush()?;

        self.execute(&WireRequest::Image {
            request,
            content_path: content.path(),
        })
        .await
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

#[cfg(not(windows))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.args(["-c", command]);
    cmd
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", command]);
    cmd
}
