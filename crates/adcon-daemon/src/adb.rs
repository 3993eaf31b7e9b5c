//! Device bridge invocation helpers

use std::ffi::OsStr;

use adcon_core::prelude::*;

use crate::runner::{run, CommandOutput, RunOptions};

/// Handle to the `adb` executable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adb {
    path: String,
}

impl Adb {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Run `adb <args>`
    pub async fn run<I, S>(&self, args: I, options: &RunOptions) -> CommandOutput
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        run(&self.path, args, options).await
    }

    /// Run `adb -s <serial> <args>`
    pub async fn run_on<I, S>(&self, serial: &str, args: I, options: &RunOptions) -> CommandOutput
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut full: Vec<std::ffi::OsString> = vec!["-s".into(), serial.into()];
        full.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        run(&self.path, full, options).await
    }

    /// Run `adb -s <serial> <args>` and map failure to [`Error::Upstream`],
    /// returning trimmed stdout on success
    pub async fn checked_on<I, S>(&self, serial: &str, args: I, fallback: &str) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = self
            .run_on(serial, args, &RunOptions::default())
            .await
            .into_result(fallback)?;
        Ok(output.stdout_text())
    }

    /// `adb version` banner, or the error text if the bridge is unusable
    pub async fn version(&self) -> std::result::Result<String, String> {
        let output = self.run(["version"], &RunOptions::default()).await;
        if output.ok() {
            Ok(output.stdout_text())
        } else {
            Err(output.failure_message("adb version failed"))
        }
    }
}
