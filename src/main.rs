//! Clipstamp - turn the selected text or image into a templated picture
//!
//! Run with `clipstamp` or `clipstamp run` to start the daemon.
//! Use `clipstamp check <hotkey>` to test a hotkey string.
//! Use `clipstamp send <combo>` to try keystroke synthesis.

use clap::Parser;
use clipstamp::cli::{Cli, Commands};
use clipstamp::config::{self, Config};
use clipstamp::hotkey::{HotkeySpec, KeyCodeTable, Modifier, SUPPRESSION_INTERVAL};
use clipstamp::synth::{self, KeystrokeSynthesizer};
use clipstamp::Daemon;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("clipstamp={},warn", log_level))),
        )
        .with_target(false)
        .init();

    // Load configuration
    let mut config = config::load_config(cli.config.as_deref())?;

    // Apply CLI overrides
    if let Some(hotkey) = cli.hotkey {
        config.hotkey.trigger = hotkey;
    }
    if cli.block {
        config.hotkey.block = true;
    }
    if cli.no_paste {
        config.output.auto_paste = false;
    }
    if cli.send {
        config.output.auto_send = true;
    }

    // Run the appropriate command
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let mut daemon = Daemon::new(config)?;
            daemon.run().await?;
        }

        Commands::Config { init, save } => {
            let path = cli
                .config
                .or_else(Config::default_path)
                .ok_or_else(|| anyhow::anyhow!("Could not determine the config directory"))?;
            if init {
                init_config(&path)?;
            } else if save {
                config::save_config(&config, &path)?;
                println!("Saved configuration to {:?}", path);
            } else {
                show_config(&config, &path)?;
            }
        }

        Commands::Check { hotkey } => {
            check_hotkey(&hotkey)?;
        }

        Commands::Keys => {
            list_keys();
        }

        Commands::Send {
            combo,
            delay_ms,
            dry_run,
        } => {
            send_combo(&config, &combo, delay_ms, dry_run).await?;
        }
    }

    Ok(())
}

/// Write the commented default config
fn init_config(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        println!("Config file already exists: {:?}", path);
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, config::DEFAULT_CONFIG)?;
    println!("Wrote default config to {:?}", path);
    Ok(())
}

fn show_config(config: &Config, path: &Path) -> anyhow::Result<()> {
    println!("Current Configuration\n");
    println!("=====================\n");
    println!("{}", toml::to_string_pretty(config)?);

    println!("---");
    match config.validate(&KeyCodeTable::current()) {
        Ok(hotkeys) => {
            println!("Trigger: {}", hotkeys.trigger);
            println!(
                "Block trigger: {}{}",
                config.effective_block(&hotkeys),
                if !config.hotkey.block && config.effective_block(&hotkeys) {
                    " (trigger is the send key)"
                } else {
                    ""
                }
            );
        }
        Err(e) => println!("Invalid: {}", e),
    }
    println!(
        "Config file: {:?}{}",
        path,
        if path.exists() { "" } else { " (not found, using defaults)" }
    );
    Ok(())
}

/// Print how a hotkey string is understood on this platform
fn check_hotkey(input: &str) -> anyhow::Result<()> {
    let table = KeyCodeTable::current();
    let platform = table.platform();
    let spec = HotkeySpec::parse(input, &table)?;

    println!("Hotkey:    {}", spec);
    println!("Platform:  {}", platform);
    for modifier in spec.modifiers_in_canonical_order() {
        let also = if modifier == Modifier::Control && platform.control_accepts_command() {
            " (Command also matches)"
        } else {
            ""
        };
        println!(
            "Modifier:  {:<8} code {}{}",
            modifier.label(platform),
            table.modifier_code(modifier),
            also
        );
    }
    if let Some(code) = table.code_for(&spec.main_key()) {
        println!("Main key:  {:<8} code {}", spec.main_key().to_string(), code);
    }
    println!(
        "Repeat:    fires at most once per {}ms",
        SUPPRESSION_INTERVAL.as_millis()
    );
    Ok(())
}

fn list_keys() {
    let table = KeyCodeTable::current();
    let platform = table.platform();
    println!("Keys on {}\n", platform);

    println!("Modifiers:");
    for modifier in Modifier::CANONICAL_ORDER {
        println!(
            "  {:<10} {:<10} code {}",
            modifier.token(),
            modifier.label(platform),
            table.modifier_code(modifier)
        );
    }

    println!("\nKeys:");
    for (token, code) in table.entries() {
        println!("  {:<10} code {}", token.to_string(), code);
    }
}

/// Synthesize one combo, or print the events with `--dry-run`
async fn send_combo(
    config: &Config,
    combo: &str,
    delay_ms: u64,
    dry_run: bool,
) -> anyhow::Result<()> {
    let table = KeyCodeTable::current();
    let spec = HotkeySpec::parse_unchecked(combo)?;
    let timing = config.timing.synth_timing();

    if dry_run {
        for step in synth::plan(&spec, table, timing)? {
            println!("{}", step);
        }
        return Ok(());
    }

    if delay_ms > 0 {
        println!("Sending {} in {}ms...", spec, delay_ms);
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    // Settle pauses are blocking sleeps
    tokio::task::spawn_blocking(move || {
        KeystrokeSynthesizer::new(synth::create_sink(), table)
            .with_timing(timing)
            .send(&spec)
    })
    .await??;
    Ok(())
}
