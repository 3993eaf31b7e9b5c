//! Test utilities for tool invocation
//!
//! Provides fake executables so device bridge behaviour can be exercised
//! without an Android SDK.

use std::path::Path;

/// Write an executable `sh` script named `name` into `dir` and return its path.
///
/// # Arguments
/// * `dir` - Directory to place the script in (usually a `tempdir`)
/// * `name` - File name, e.g. `"adb"`
/// * `body` - Script body; `$@` holds the arguments the tool was called with
#[cfg(unix)]
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> String {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("write fake tool");
    let mut perms = std::fs::metadata(&path).expect("stat fake tool").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod fake tool");
    path.to_string_lossy().into_owned()
}
