//! The run started by the hotkey
//!
//! 1. Clear the text clipboard, then select all and cut in the foreground app
//! 2. Read the cut text and any clipboard image
//! 3. Render the image (preferred) or the text onto the template
//! 4. Put the PNG on the clipboard, optionally paste it and press send
//!
//! A failed run is logged and abandoned. It never takes the listener down.

use crate::compose::ImageComposer;
use crate::config::{Config, HotkeySet, OutputConfig, TemplateConfig};
use crate::error::ClipstampError;
use crate::hotkey::{HotkeyCallback, HotkeySpec};
use crate::platform::PlatformAdapter;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

/// What a run captured from the clipboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    Image,
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing was selected and the clipboard held no image
    NoContent,
    /// The rendered PNG is on the clipboard
    Stamped {
        source: ContentKind,
        pasted: bool,
        sent: bool,
    },
}

/// Clipboard capture, rendering and paste-back for one hotkey press
pub struct TriggerPipeline<A: PlatformAdapter, C: ImageComposer> {
    adapter: Arc<A>,
    composer: C,
    hotkeys: HotkeySet,
    template: TemplateConfig,
    output: OutputConfig,
    delay: Duration,
    runs: AtomicU64,
}

impl<A: PlatformAdapter, C: ImageComposer> TriggerPipeline<A, C> {
    pub fn new(adapter: Arc<A>, composer: C, config: &Config, hotkeys: HotkeySet) -> Self {
        Self {
            adapter,
            composer,
            hotkeys,
            template: config.template.clone(),
            output: config.output.clone(),
            delay: config.timing.delay(),
            runs: AtomicU64::new(0),
        }
    }

    pub fn adapter(&self) -> &Arc<A> {
        &self.adapter
    }

    pub fn composer(&self) -> &C {
        &self.composer
    }

    pub fn hotkeys(&self) -> &HotkeySet {
        &self.hotkeys
    }

    /// Number of runs started so far
    pub fn run_count(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    /// Execute one run
    pub async fn run(&self) -> Result<RunOutcome, ClipstampError> {
        let run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(run, "Hotkey pressed, capturing selection");

        // Clear old text so a failed cut cannot return stale content
        if let Err(e) = self.adapter.set_text("").await {
            tracing::warn!("Failed to clear clipboard: {}", e);
        }

        self.send("select all", &self.hotkeys.select_all);
        self.send("cut", &self.hotkeys.cut);
        self.pause().await;

        let text = self.adapter.get_text().await;
        let image = self.adapter.get_image().await;

        let started = Instant::now();
        let (source, png) = match (image, text) {
            (Some(content), _) => {
                tracing::info!(bytes = content.len(), "Rendering clipboard image");
                let request = self.template.image_request(content);
                (ContentKind::Image, self.composer.render_image(&request).await?)
            }
            (None, Some(text)) => {
                tracing::info!(chars = text.chars().count(), "Rendering text");
                tracing::debug!("Text: {:?}", text);
                let request = self.template.text_request(&text);
                (ContentKind::Text, self.composer.render_text(&request).await?)
            }
            (None, None) => {
                tracing::info!("No text or image to render");
                return Ok(RunOutcome::NoContent);
            }
        };
        tracing::debug!(
            composer = self.composer.name(),
            bytes = png.len(),
            "Rendered in {:.2}s",
            started.elapsed().as_secs_f32()
        );

        self.adapter.set_image(&png).await?;

        let mut pasted = false;
        let mut sent = false;
        if self.output.auto_paste {
            pasted = self.send("paste", &self.hotkeys.paste);
            self.pause().await;

            if self.output.auto_send {
                sent = self.send("send", &self.hotkeys.send);
            }
        }

        tracing::info!(run, ?source, pasted, sent, "Image ready");
        Ok(RunOutcome::Stamped {
            source,
            pasted,
            sent,
        })
    }

    /// Execute one run and log its failure
    pub async fn run_logged(&self) {
        if let Err(e) = self.run().await {
            tracing::error!("Run failed: {}", e);
        }
    }

    /// Best-effort keystroke; a failure is reported and the run goes on
    fn send(&self, what: &str, spec: &HotkeySpec) -> bool {
        match self.adapter.send_keystroke(spec) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Skipping {} ({}): {}", what, spec, e);
                false
            }
        }
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

impl<A, C> TriggerPipeline<A, C>
where
    A: PlatformAdapter + 'static,
    C: ImageComposer + 'static,
{
    /// Hotkey callback that runs the pipeline on the listener thread
    ///
    /// The listener thread blocks until the run completes, so runs never
    /// overlap. `runtime` must not be the calling thread's own runtime.
    pub fn into_callback(self: Arc<Self>, runtime: Handle) -> HotkeyCallback {
        Box::new(move || {
            let pipeline = Arc::clone(&self);
            runtime.block_on(async move { pipeline.run_logged().await });
        })
    }
}
