//! Common utilities for integration tests.
//!
//! Every test gets its own scratch directory, which doubles as the working
//! directory of the spawned binary so no stray `powerlan.toml` is picked up.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn get_bin() -> &'static str {
    env!("CARGO_BIN_EXE_powerlan")
}

/// Scratch directory removed again on drop.
pub struct Scratch(pub PathBuf);

impl Scratch {
    pub fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!(
            "powerlan_it_{name}_{}",
            std::process::id()
        ));
        drop(fs::remove_dir_all(&dir));
        fs::create_dir_all(&dir).expect("failed to create scratch dir");
        Self(dir)
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.0.join(file)
    }

    pub fn write(&self, file: &str, content: &str) -> PathBuf {
        let path = self.path(file);
        fs::write(&path, content).expect("failed to write scratch file");
        path
    }

    pub fn read(&self, file: &str) -> String {
        fs::read_to_string(self.path(file)).expect("failed to read scratch file")
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        drop(fs::remove_dir_all(&self.0));
    }
}

/// Runs the binary inside `dir` and waits for it.
pub fn run_powerlan(dir: &Path, args: &[&str]) -> Output {
    Command::new(get_bin())
        .args(args)
        .current_dir(dir)
        .env("POWERLAN_INTEGRATION_TEST", "1")
        .env_remove("POWERLAN_CONFIG")
        .env_remove("POWERLAN_ROSTER")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run powerlan")
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}
