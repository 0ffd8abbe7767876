//! Full runs against a simulated desktop
//!
//! The simulated desktop has one focused text field and a clipboard. Its key
//! sink reacts to the synthesized select-all, cut, paste and send combos the
//! way a text editor would, so a run can be checked by its visible effect.

use clipstamp::clipboard::{is_png, ClipboardAdapter};
use clipstamp::compose::{ImageComposer, ImageRequest, TextRequest};
use clipstamp::config::Config;
use clipstamp::error::{ClipboardError, ComposeError, SynthError};
use clipstamp::hotkey::listener::classify;
use clipstamp::hotkey::{
    HotkeyMatcher, KeyCodeTable, KeyToken, Modifier, NamedKey, NativeKeyCode, Platform,
};
use clipstamp::pipeline::{ContentKind, RunOutcome, TriggerPipeline};
use clipstamp::platform::OsAdapter;
use clipstamp::synth::{KeySink, KeystrokeSynthesizer, SynthTiming};
use rdev::{EventType, Key};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([0, 128, 255, 255]));
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

#[derive(Debug, Default)]
struct Desktop {
    field: String,
    /// Rich editors hold images alongside text
    field_image: Option<Vec<u8>>,
    selected: bool,
    clipboard_text: Option<String>,
    clipboard_image: Option<Vec<u8>>,
    pasted: Vec<Vec<u8>>,
    sent: usize,
}

type Shared = Arc<Mutex<Desktop>>;

/// Key sink that edits the simulated text field
struct DesktopSink {
    desktop: Shared,
    table: KeyCodeTable,
    ctrl_held: bool,
}

impl DesktopSink {
    fn is(&self, code: NativeKeyCode, c: char) -> bool {
        self.table.code_for(&KeyToken::Char(c)) == Some(code)
    }
}

impl KeySink for DesktopSink {
    fn press(&mut self, code: NativeKeyCode) -> Result<(), SynthError> {
        if code == self.table.modifier_code(Modifier::Control) {
            self.ctrl_held = true;
            return Ok(());
        }

        let mut desktop = self.desktop.lock().unwrap();
        if self.ctrl_held && self.is(code, 'a') {
            desktop.selected = true;
        } else if self.ctrl_held && self.is(code, 'x') {
            if desktop.selected && (!desktop.field.is_empty() || desktop.field_image.is_some()) {
                let text = std::mem::take(&mut desktop.field);
                desktop.clipboard_text = (!text.is_empty()).then_some(text);
                desktop.clipboard_image = desktop.field_image.take();
            }
            desktop.selected = false;
        } else if self.ctrl_held && self.is(code, 'v') {
            if let Some(image) = desktop.clipboard_image.clone() {
                desktop.pasted.push(image);
            }
        } else if self.table.code_for(&KeyToken::Named(NamedKey::Enter)) == Some(code) {
            desktop.sent += 1;
        }
        Ok(())
    }

    fn release(&mut self, code: NativeKeyCode) -> Result<(), SynthError> {
        if code == self.table.modifier_code(Modifier::Control) {
            self.ctrl_held = false;
        }
        Ok(())
    }

    fn pause(&mut self, _duration: Duration) {}

    fn name(&self) -> &'static str {
        "desktop"
    }
}

struct DesktopClipboard {
    desktop: Shared,
}

#[async_trait::async_trait]
impl ClipboardAdapter for DesktopClipboard {
    async fn get_image(&self) -> Option<Vec<u8>> {
        self.desktop.lock().unwrap().clipboard_image.clone()
    }

    async fn set_image(&self, png: &[u8]) -> Result<(), ClipboardError> {
        let mut desktop = self.desktop.lock().unwrap();
        desktop.clipboard_image = Some(png.to_vec());
        desktop.clipboard_text = None;
        Ok(())
    }

    async fn get_text(&self) -> Option<String> {
        self.desktop.lock().unwrap().clipboard_text.clone()
    }

    async fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut desktop = self.desktop.lock().unwrap();
        desktop.clipboard_text = (!text.is_empty()).then(|| text.to_string());
        desktop.clipboard_image = None;
        Ok(())
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "desktop"
    }
}

/// Composer that answers with a PNG whose width encodes the input
#[derive(Default)]
struct StubComposer {
    texts: Mutex<Vec<TextRequest>>,
    images: Mutex<Vec<ImageRequest>>,
}

#[async_trait::async_trait]
impl ImageComposer for StubComposer {
    async fn render_text(&self, request: &TextRequest) -> Result<Vec<u8>, ComposeError> {
        self.texts.lock().unwrap().push(request.clone());
        Ok(png(request.text.chars().count() as u32, 1))
    }

    async fn render_image(&self, request: &ImageRequest) -> Result<Vec<u8>, ComposeError> {
        self.images.lock().unwrap().push(request.clone());
        Ok(png(7, 7))
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

fn config() -> Config {
    let mut config = Config::default();
    config.timing.delay_secs = 0.0;
    config
}

fn adapter(desktop: &Shared) -> Arc<OsAdapter<DesktopSink>> {
    let table = KeyCodeTable::for_platform(Platform::Linux);
    let sink = DesktopSink {
        desktop: desktop.clone(),
        table,
        ctrl_held: false,
    };
    let synth = KeystrokeSynthesizer::new(sink, table).with_timing(SynthTiming {
        modifier_settle: Duration::ZERO,
        chord_settle: Duration::ZERO,
        trailing: Duration::ZERO,
    });
    Arc::new(OsAdapter::new(
        synth,
        Box::new(DesktopClipboard {
            desktop: desktop.clone(),
        }),
    ))
}

fn pipeline<C: ImageComposer>(
    desktop: &Shared,
    composer: C,
    config: &Config,
) -> TriggerPipeline<OsAdapter<DesktopSink>, C> {
    let hotkeys = config
        .validate(&KeyCodeTable::for_platform(Platform::Linux))
        .unwrap();
    TriggerPipeline::new(adapter(desktop), composer, config, hotkeys)
}

fn desktop_with_text(text: &str) -> Shared {
    Arc::new(Mutex::new(Desktop {
        field: text.to_string(),
        clipboard_text: Some("stale clipboard".to_string()),
        ..Default::default()
    }))
}

#[tokio::test]
async fn typed_text_is_replaced_by_its_picture() {
    let desktop = desktop_with_text("hello world");
    let p = pipeline(&desktop, StubComposer::default(), &config());

    let outcome = p.run().await.unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Stamped {
            source: ContentKind::Text,
            pasted: true,
            sent: false
        }
    );

    let desktop = desktop.lock().unwrap();
    assert!(desktop.field.is_empty());
    assert_eq!(desktop.pasted.len(), 1);
    assert!(is_png(&desktop.pasted[0]));
    assert_eq!(desktop.sent, 0);
}

#[tokio::test]
async fn text_request_carries_template_settings() {
    let desktop = desktop_with_text("hi");
    let mut config = config();
    config.template.use_overlay = false;
    config.template.max_font_height = 48;
    let p = pipeline(&desktop, StubComposer::default(), &config);
    p.run().await.unwrap();

    let requests = p.composer().texts.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].text, "hi");
    assert_eq!(requests[0].overlay, None);
    assert_eq!(requests[0].max_font_height, 48);
    assert_eq!(requests[0].top_left, (119, 450));
    assert_eq!(requests[0].bottom_right, (398, 625));

    let pasted = desktop.lock().unwrap().pasted[0].clone();
    assert_eq!(image::load_from_memory(&pasted).unwrap().width(), 2);
}

#[tokio::test]
async fn cut_image_wins_over_cut_text() {
    let desktop = desktop_with_text("caption");
    let content = png(40, 30);
    desktop.lock().unwrap().field_image = Some(content.clone());
    let p = pipeline(&desktop, StubComposer::default(), &config());

    let outcome = p.run().await.unwrap();
    assert!(matches!(
        outcome,
        RunOutcome::Stamped {
            source: ContentKind::Image,
            ..
        }
    ));
    assert!(p.composer().texts.lock().unwrap().is_empty());

    let requests = p.composer().images.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].content, content);
    assert_eq!(requests[0].padding, 12);
    assert!(requests[0].allow_upscale && requests[0].keep_alpha);
}

#[tokio::test]
async fn empty_field_and_no_image_does_nothing() {
    let desktop = desktop_with_text("");
    let p = pipeline(&desktop, StubComposer::default(), &config());

    assert_eq!(p.run().await.unwrap(), RunOutcome::NoContent);
    let desktop = desktop.lock().unwrap();
    assert!(desktop.pasted.is_empty());
    // The stale text was cleared before the cut
    assert_eq!(desktop.clipboard_text, None);
}

#[tokio::test]
async fn auto_send_presses_enter_after_paste() {
    let desktop = desktop_with_text("ship it");
    let mut config = config();
    config.output.auto_send = true;
    let p = pipeline(&desktop, StubComposer::default(), &config);

    p.run().await.unwrap();
    let desktop = desktop.lock().unwrap();
    assert_eq!(desktop.pasted.len(), 1);
    assert_eq!(desktop.sent, 1);
}

#[tokio::test]
async fn no_paste_leaves_picture_on_clipboard() {
    let desktop = desktop_with_text("keep");
    let mut config = config();
    config.output.auto_paste = false;
    let p = pipeline(&desktop, StubComposer::default(), &config);

    p.run().await.unwrap();
    let desktop = desktop.lock().unwrap();
    assert!(desktop.pasted.is_empty());
    assert!(desktop.clipboard_image.as_deref().map_or(false, is_png));
}

#[test]
fn hotkey_press_runs_pipeline_on_listener_thread() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap();

    let desktop = desktop_with_text("from hotkey");
    let config = config();
    let p = Arc::new(pipeline(&desktop, StubComposer::default(), &config));
    let trigger = p.hotkeys().trigger.clone();
    let callback = Arc::clone(&p).into_callback(runtime.handle().clone());

    let mut matcher = HotkeyMatcher::new(trigger, Platform::Linux, callback);
    let t0 = Instant::now();
    for (event, offset) in [
        (EventType::KeyPress(Key::ControlLeft), 0),
        (EventType::KeyPress(Key::Slash), 10),
        (EventType::KeyRelease(Key::Slash), 60),
        (EventType::KeyRelease(Key::ControlLeft), 70),
    ] {
        let key_event = classify(&event, None).unwrap();
        matcher.handle(&key_event, t0 + Duration::from_millis(offset));
    }

    assert_eq!(matcher.fire_count(), 1);
    assert_eq!(p.run_count(), 1);
    assert_eq!(desktop.lock().unwrap().pasted.len(), 1);
}

#[cfg(unix)]
#[tokio::test]
async fn external_composer_output_reaches_the_field() {
    use clipstamp::compose::CommandComposer;
    use clipstamp::config::ComposerConfig;

    let dir = tempfile::tempdir().unwrap();
    let fixture = dir.path().join("out.png");
    std::fs::write(&fixture, png(3, 2)).unwrap();

    let composer = CommandComposer::new(&ComposerConfig {
        command: format!("cat > /dev/null; cat '{}'", fixture.display()),
        timeout_ms: 5000,
    });
    let desktop = desktop_with_text("via command");
    let p = pipeline(&desktop, composer, &config());

    p.run().await.unwrap();
    let pasted = desktop.lock().unwrap().pasted[0].clone();
    assert_eq!(pasted, std::fs::read(&fixture).unwrap());
}
