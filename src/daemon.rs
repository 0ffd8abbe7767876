//! Daemon module - startup, hotkey listener and shutdown
//!
//! Validates the configuration, takes the single-instance lock, starts the
//! hotkey listener with the trigger pipeline as its callback and waits for
//! Ctrl+C or SIGTERM.

use crate::compose::CommandComposer;
use crate::config::{Config, HotkeySet};
use crate::error::{ClipstampError, HotkeyError, Result};
use crate::hotkey::{permissions, KeyCodeTable};
use crate::pipeline::TriggerPipeline;
use crate::platform::{create_adapter, PlatformAdapter};
use pidlock::Pidlock;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

/// How often the daemon checks that the listener thread is alive
const LISTENER_POLL: Duration = Duration::from_secs(1);

/// Take the single-instance lock in the runtime directory
fn acquire_lock() -> Result<Pidlock> {
    let lock_path = Config::lock_path();
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut lock = Pidlock::new(&lock_path.to_string_lossy());
    match lock.acquire() {
        Ok(_) => {
            tracing::debug!("Acquired lock {:?}", lock_path);
            Ok(lock)
        }
        Err(_) => Err(HotkeyError::AlreadyRunning.into()),
    }
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).map_err(|e| {
        ClipstampError::Config(format!("Failed to set up SIGTERM handler: {}", e))
    })?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => Ok("SIGINT"),
        _ = sigterm.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("Ctrl+C")
}

/// Long-running hotkey daemon
pub struct Daemon {
    config: Config,
    hotkeys: HotkeySet,
}

impl Daemon {
    /// Validate `config`; every hotkey must parse before anything starts
    pub fn new(config: Config) -> Result<Self> {
        let hotkeys = config.validate(&KeyCodeTable::current())?;
        Ok(Self { config, hotkeys })
    }

    pub fn hotkeys(&self) -> &HotkeySet {
        &self.hotkeys
    }

    pub async fn run(&mut self) -> Result<()> {
        tracing::info!("Starting clipstamp daemon");

        let mut lock = acquire_lock()?;

        let block = self.config.effective_block(&self.hotkeys);
        if block && !self.config.hotkey.block {
            tracing::info!(
                "Trigger '{}' is also the send key, blocking it so auto-send cannot retrigger",
                self.hotkeys.trigger
            );
        }

        // Degraded mode: warn and try anyway
        if let Err(e) = permissions::check(block) {
            tracing::warn!("{}", e);
        }

        let adapter = Arc::new(create_adapter(self.config.timing.synth_timing()));
        if !adapter.clipboard_available().await {
            tracing::warn!(
                "Clipboard tool '{}' not found, runs will fail until it is installed",
                adapter.clipboard_name()
            );
        }

        let composer = CommandComposer::new(&self.config.composer);
        if self.config.composer.command.trim().is_empty() {
            tracing::warn!("No composer command configured, set [composer] command in the config file");
        }

        tracing::info!(
            "Template: {:?}, box {:?} to {:?}",
            self.config.template.base_image,
            self.config.template.top_left,
            self.config.template.bottom_right
        );
        tracing::debug!(
            "Auto paste: {}, auto send: {}, delay: {:?}",
            self.config.output.auto_paste,
            self.config.output.auto_send,
            self.config.timing.delay()
        );

        let pipeline = Arc::new(TriggerPipeline::new(
            Arc::clone(&adapter),
            composer,
            &self.config,
            self.hotkeys.clone(),
        ));
        let callback = pipeline.into_callback(Handle::current());
        let mut listener =
            adapter.start_hotkey_listener(self.hotkeys.trigger.clone(), callback, block)?;

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(LISTENER_POLL);

        let result = loop {
            tokio::select! {
                signal = &mut shutdown => {
                    match signal {
                        Ok(name) => {
                            tracing::info!("Received {}, shutting down...", name);
                            break Ok(());
                        }
                        Err(e) => break Err(e),
                    }
                }

                _ = ticker.tick() => {
                    if !listener.is_running() {
                        break Err(HotkeyError::Listen("listener thread exited".to_string()).into());
                    }
                }
            }
        };

        // Cleanup
        listener.stop();
        if let Err(e) = lock.release() {
            tracing::warn!("Failed to release lock: {:?}", e);
        }

        tracing::info!("Daemon stopped");
        result
    }
}
