//! Renders clipstamp man pages from the clap definitions in src/cli.rs
//!
//! Pages land in `$OUT_DIR/man` for release builds, or for any build with
//! CLIPSTAMP_GEN_MANPAGES set (`cargo xtask man` sets it). Each subcommand
//! gets its own page named after its full command path, e.g.
//! `clipstamp-send.1`.

use clap::{Command, CommandFactory};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

include!("src/cli.rs");

const GEN_ENV: &str = "CLIPSTAMP_GEN_MANPAGES";

fn main() -> io::Result<()> {
    println!("cargo:rerun-if-changed=src/cli.rs");
    println!("cargo:rerun-if-env-changed={}", GEN_ENV);

    let release = env::var("PROFILE").map_or(false, |profile| profile == "release");
    if !release && env::var_os(GEN_ENV).is_none() {
        return Ok(());
    }

    let man_dir = env::var_os("OUT_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("target"))
        .join("man");
    fs::create_dir_all(&man_dir)?;

    let pages = render_tree(&Cli::command(), "clipstamp", &man_dir)?;
    println!(
        "cargo:warning={} man pages generated in: {}",
        pages,
        man_dir.display()
    );

    Ok(())
}

/// Write `<page>.1` for `cmd`, then recurse into visible subcommands
fn render_tree(cmd: &Command, page: &str, dir: &Path) -> io::Result<usize> {
    let mut roff = Vec::new();
    Man::new(cmd.clone()).title(page).render(&mut roff)?;
    fs::write(dir.join(format!("{}.1", page)), roff)?;

    let mut pages = 1;
    for sub in cmd
        .get_subcommands()
        .filter(|sub| sub.get_name() != "help" && !sub.is_hide_set())
    {
        pages += render_tree(sub, &format!("{}-{}", page, sub.get_name()), dir)?;
    }
    Ok(pages)
}
