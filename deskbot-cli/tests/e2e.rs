//! End-to-end tests that run the built `deskbot` binary
//!
//! Gated behind the `integration` feature flag. Run with:
//!
//! ```sh
//! cargo test -p deskbot-cli --features integration
//! ```

#![cfg(feature = "integration")]

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

/// Run the binary with its project config isolated in `dir`
fn deskbot(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_deskbot"))
        .args(args)
        .env("DESKBOT_PROJECT_CONFIG_DIR", dir)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run deskbot")
}

fn isolated() -> TempDir {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("deskbot.db");
    std::fs::write(
        dir.path().join("config.toml"),
        format!("[storage]\npath = {:?}\n", db.to_string_lossy()),
    )
    .unwrap();
    dir
}

#[test]
fn help_lists_commands() {
    let dir = isolated();
    let output = deskbot(dir.path(), &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["serve", "knowledge", "responses", "channels", "config", "stats", "auth"] {
        assert!(stdout.contains(command), "missing {command} in help");
    }
}

#[test]
fn config_show_merges_project_config() {
    let dir = isolated();
    let output = deskbot(dir.path(), &["config", "show"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[server]"));
    assert!(stdout.contains("deskbot.db"));
}

#[test]
fn channels_pause_list_resume() {
    let dir = isolated();

    let paused = deskbot(dir.path(), &["channels", "pause", "c42", "--name", "suporte"]);
    assert!(paused.status.success());

    let listed = deskbot(dir.path(), &["channels", "list"]);
    assert!(String::from_utf8_lossy(&listed.stdout).contains("c42"));

    let resumed = deskbot(dir.path(), &["channels", "resume", "c42"]);
    assert!(String::from_utf8_lossy(&resumed.stdout).contains("Resumed c42"));

    let listed = deskbot(dir.path(), &["channels", "list"]);
    assert!(String::from_utf8_lossy(&listed.stdout).contains("No paused channels"));
}

#[test]
fn bot_settings_round_trip_through_the_database() {
    let dir = isolated();

    let set = deskbot(
        dir.path(),
        &["config", "bot", "set", "--require-approval", "true", "--max-tokens", "700"],
    );
    assert!(set.status.success());

    let shown = deskbot(dir.path(), &["config", "bot", "show"]);
    let stdout = String::from_utf8_lossy(&shown.stdout);
    assert!(stdout.contains("Max Tokens: 700"));
    assert!(stdout.contains("Requer Aprovação: ✅ Sim"));
}

#[test]
fn stats_on_empty_database() {
    let dir = isolated();
    let output = deskbot(dir.path(), &["stats"]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Total de Tickets: 0"));
}
