//! End-to-end test suite for flickerwatch
//!
//! These tests drive a real browser against a real development server,
//! so they are ignored by default. Run them with a server listening on
//! localhost:5173 and Chrome or Chromium installed:
//!
//! ```sh
//! cargo test --test e2e -- --ignored
//! ```

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Get the flickerwatch binary path
fn binary_path() -> PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());

    let debug = PathBuf::from(&manifest_dir).join("target/debug/flickerwatch");
    if debug.exists() {
        return debug;
    }

    PathBuf::from(&manifest_dir).join("target/release/flickerwatch")
}

/// Create a temporary output directory for one run
fn temp_output_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("flickerwatch-e2e-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// E2E: full choreography against a live dev server, headless.
///
/// The run blocks on the operator hold at the end, so we feed a newline
/// on stdin to release it.
#[test]
#[ignore = "requires Chrome and a dev server on localhost:5173"]
fn test_e2e_full_inspection_run() {
    let binary = binary_path();
    let output_dir = temp_output_dir();

    let mut child = Command::new(&binary)
        .arg("--headless")
        .arg("--output-dir")
        .arg(&output_dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn flickerwatch");

    child
        .stdin
        .as_mut()
        .expect("stdin piped")
        .write_all(b"\n")
        .expect("Failed to release the operator hold");

    let output = child.wait_with_output().expect("Failed to wait");
    println!("stdout: {}", String::from_utf8_lossy(&output.stdout));
    println!("stderr: {}", String::from_utf8_lossy(&output.stderr));

    assert!(output.status.success(), "Inspection run should succeed");

    for name in ["start_page.png", "question_page.png", "after_refresh.png"] {
        let path = output_dir.join(name);
        assert!(path.exists(), "Missing milestone screenshot {name}");
        let len = fs::metadata(&path).unwrap().len();
        assert!(len > 0, "Screenshot {name} is empty");
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1. Loading initial page"));
    assert!(stdout.contains("5. Console messages"));
    assert!(stdout.contains("Press Enter to close the browser"));

    fs::remove_dir_all(&output_dir).ok();
}

/// E2E: with no server listening, the run fails instead of hanging.
#[test]
#[ignore = "requires Chrome"]
fn test_e2e_unreachable_server_fails() {
    let binary = binary_path();

    let output = Command::new(&binary)
        .arg("--headless")
        .arg("--target")
        .arg("http://localhost:59999")
        .output()
        .expect("Failed to run flickerwatch");

    assert!(
        !output.status.success(),
        "Run against a dead server should fail"
    );
}
