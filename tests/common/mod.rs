//! Shared test infrastructure for integration tests.
//!
//! Each workspace gets its own temp data directory, so tests never touch a
//! real profile and can run in parallel.

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

pub struct Workspace {
    data_dir: TempDir,
    pub out_dir: TempDir,
}

impl Default for Workspace {
    fn default() -> Workspace {
        Workspace::new()
    }
}

impl Workspace {
    pub fn new() -> Workspace {
        Workspace {
            data_dir: TempDir::new().expect("create data dir"),
            out_dir: TempDir::new().expect("create out dir"),
        }
    }

    /// Run the built binary against this workspace's data directory.
    pub fn lapor(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_lapor"))
            .args(args)
            .env("LAPOR_DATA_DIR", self.data_dir.path())
            .output()
            .expect("run lapor")
    }

    /// Run and require success, returning stdout.
    pub fn lapor_ok(&self, args: &[&str]) -> String {
        let output = self.lapor(args);
        assert!(
            output.status.success(),
            "lapor {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    /// Parse `list --json` output.
    pub fn history(&self) -> serde_json::Value {
        let stdout = self.lapor_ok(&["list", "--json"]);
        serde_json::from_str(&stdout).expect("parse list --json")
    }

    /// Plant a raw blob at the well-known ledger key, bypassing the store.
    pub fn seed_ledger_blob(&self, raw: &str) {
        let path = self.key_path("kokurikulum_report_draft");
        fs::write(path, raw).expect("seed ledger blob");
    }

    pub fn key_path(&self, key: &str) -> PathBuf {
        self.data_dir.path().join(format!("{key}.json"))
    }
}
