//! The OS capability set used by the trigger pipeline
//!
//! [`PlatformAdapter`] bundles keystroke synthesis, clipboard access and the
//! global hotkey listener. The implementation for the running OS is chosen
//! once at startup by [`create_adapter`]; nothing above this module
//! branches on the platform.

use crate::clipboard::{create_clipboard, ClipboardAdapter};
use crate::error::{ClipboardError, HotkeyError, SynthError};
use crate::hotkey::{
    start_listener, HotkeyCallback, HotkeyMatcher, HotkeySpec, KeyCodeTable, ListenerHandle,
    Platform,
};
use crate::synth::{create_sink, KeySink, KeystrokeSynthesizer, SynthTiming};
use std::sync::Mutex;

/// Everything the pipeline needs from the operating system
#[async_trait::async_trait]
pub trait PlatformAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    fn key_table(&self) -> &KeyCodeTable;

    /// Press and release one combo in the foreground application
    ///
    /// Blocks for the settle pauses and the trailing delay.
    fn send_keystroke(&self, spec: &HotkeySpec) -> Result<(), SynthError>;

    async fn get_image(&self) -> Option<Vec<u8>>;

    async fn set_image(&self, png: &[u8]) -> Result<(), ClipboardError>;

    async fn get_text(&self) -> Option<String>;

    async fn set_text(&self, text: &str) -> Result<(), ClipboardError>;

    /// Start listening for `spec` on a dedicated thread
    ///
    /// `callback` runs on the listener thread each time the hotkey fires.
    /// With `suppress_passthrough` the triggering keystroke is kept from
    /// the foreground application.
    fn start_hotkey_listener(
        &self,
        spec: HotkeySpec,
        callback: HotkeyCallback,
        suppress_passthrough: bool,
    ) -> Result<ListenerHandle, HotkeyError>;
}

/// Adapter backed by real OS facilities
pub struct OsAdapter<S: KeySink = Box<dyn KeySink>> {
    table: KeyCodeTable,
    synth: Mutex<KeystrokeSynthesizer<S>>,
    clipboard: Box<dyn ClipboardAdapter>,
}

impl<S: KeySink> OsAdapter<S> {
    pub fn new(synth: KeystrokeSynthesizer<S>, clipboard: Box<dyn ClipboardAdapter>) -> Self {
        Self {
            table: *synth.table(),
            synth: Mutex::new(synth),
            clipboard,
        }
    }

    pub fn clipboard_name(&self) -> &'static str {
        self.clipboard.name()
    }

    pub async fn clipboard_available(&self) -> bool {
        self.clipboard.is_available().await
    }

    /// Run `f` with exclusive access to the synthesizer
    pub fn with_synth<R>(&self, f: impl FnOnce(&mut KeystrokeSynthesizer<S>) -> R) -> Option<R> {
        self.synth.lock().ok().map(|mut synth| f(&mut synth))
    }
}

#[async_trait::async_trait]
impl<S: KeySink> PlatformAdapter for OsAdapter<S> {
    fn platform(&self) -> Platform {
        self.table.platform()
    }

    fn key_table(&self) -> &KeyCodeTable {
        &self.table
    }

    fn send_keystroke(&self, spec: &HotkeySpec) -> Result<(), SynthError> {
        let mut synth = self
            .synth
            .lock()
            .map_err(|_| SynthError::Simulate("synthesizer lock poisoned".to_string()))?;
        synth.send(spec)
    }

    async fn get_image(&self) -> Option<Vec<u8>> {
        self.clipboard.get_image().await
    }

    async fn set_image(&self, png: &[u8]) -> Result<(), ClipboardError> {
        self.clipboard.set_image(png).await
    }

    async fn get_text(&self) -> Option<String> {
        self.clipboard.get_text().await
    }

    async fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        self.clipboard.set_text(text).await
    }

    fn start_hotkey_listener(
        &self,
        spec: HotkeySpec,
        callback: HotkeyCallback,
        suppress_passthrough: bool,
    ) -> Result<ListenerHandle, HotkeyError> {
        let matcher = HotkeyMatcher::new(spec, self.platform(), callback);
        start_listener(matcher, suppress_passthrough)
    }
}

/// Adapter for the current OS and session
pub fn create_adapter(timing: SynthTiming) -> OsAdapter {
    let table = KeyCodeTable::current();
    let synth = KeystrokeSynthesizer::new(create_sink(), table).with_timing(timing);
    let clipboard = create_clipboard();
    tracing::debug!(
        platform = %table.platform(),
        clipboard = clipboard.name(),
        sink = synth.sink().name(),
        "Platform adapter ready"
    );
    OsAdapter::new(synth, clipboard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::sample_png;
    use crate::synth::{RecordingSink, SynthStep};
    use std::time::Duration;
    use tokio::sync::Mutex as AsyncMutex;

    #[derive(Default)]
    struct MemoryClipboard {
        image: AsyncMutex<Option<Vec<u8>>>,
        text: AsyncMutex<Option<String>>,
    }

    #[async_trait::async_trait]
    impl ClipboardAdapter for MemoryClipboard {
        async fn get_image(&self) -> Option<Vec<u8>> {
            self.image.lock().await.clone()
        }

        async fn set_image(&self, png: &[u8]) -> Result<(), ClipboardError> {
            *self.image.lock().await = Some(png.to_vec());
            *self.text.lock().await = None;
            Ok(())
        }

        async fn get_text(&self) -> Option<String> {
            self.text.lock().await.clone()
        }

        async fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
            *self.image.lock().await = None;
            *self.text.lock().await = (!text.is_empty()).then(|| text.to_string());
            Ok(())
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn name(&self) -> &'static str {
            "memory"
        }
    }

    fn adapter(platform: Platform) -> OsAdapter<RecordingSink> {
        let synth = KeystrokeSynthesizer::new(
            RecordingSink::new(),
            KeyCodeTable::for_platform(platform),
        )
        .with_timing(SynthTiming {
            modifier_settle: Duration::ZERO,
            chord_settle: Duration::ZERO,
            trailing: Duration::ZERO,
        });
        OsAdapter::new(synth, Box::new(MemoryClipboard::default()))
    }

    #[test]
    fn test_send_keystroke_goes_through_synth() {
        let adapter = adapter(Platform::Linux);
        let table = KeyCodeTable::for_platform(Platform::Linux);
        let spec = HotkeySpec::parse("ctrl+a", &table).unwrap();
        adapter.send_keystroke(&spec).unwrap();

        let ctrl = table.modifier_code(crate::hotkey::Modifier::Control);
        let a = table.code_for(&spec.main_key()).unwrap();
        let events = adapter.with_synth(|s| s.sink().key_events()).unwrap();
        assert_eq!(
            events,
            vec![
                SynthStep::Press(ctrl),
                SynthStep::Press(a),
                SynthStep::Release(a),
                SynthStep::Release(ctrl),
            ]
        );
    }

    #[test]
    fn test_unsupported_key_sends_nothing() {
        let adapter = adapter(Platform::MacOs);
        let spec = HotkeySpec::parse_unchecked("insert").unwrap();
        let err = adapter.send_keystroke(&spec).unwrap_err();
        assert!(matches!(err, SynthError::UnsupportedKey { .. }));
        assert!(adapter.with_synth(|s| s.sink().steps().is_empty()).unwrap());
    }

    #[test]
    fn test_platform_follows_table() {
        assert_eq!(adapter(Platform::Windows).platform(), Platform::Windows);
        assert_eq!(adapter(Platform::MacOs).clipboard_name(), "memory");
    }

    #[tokio::test]
    async fn test_clipboard_delegation() {
        let adapter = adapter(Platform::Linux);
        assert_eq!(adapter.get_image().await, None);

        adapter.set_text("hello").await.unwrap();
        assert_eq!(adapter.get_text().await.as_deref(), Some("hello"));
        assert_eq!(adapter.get_image().await, None);

        let png = sample_png(3, 3);
        adapter.set_image(&png).await.unwrap();
        assert_eq!(adapter.get_image().await, Some(png));
        assert_eq!(adapter.get_text().await, None);
    }
}
