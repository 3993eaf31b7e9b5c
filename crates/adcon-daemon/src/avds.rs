//! Android Virtual Device (AVD) discovery
//!
//! Names come from `avdmanager list avd`, which prints `Name: <avd>` rows on
//! stdout or stderr depending on the SDK version. When `avdmanager` is not
//! installed, `emulator -list-avds` (one name per line) is used instead.

use std::sync::LazyLock;

use adcon_core::prelude::*;
use regex::Regex;

use crate::runner::{run, CommandOutput, RunOptions};
use crate::tools::AndroidTools;

/// `    Name: Pixel_7_API_34`
static NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*Name:[ \t]*(.+?)[ \t\r]*$").expect("Invalid AVD name regex")
});

/// List configured AVD names
pub async fn list_avds(tools: &AndroidTools) -> Result<Vec<String>> {
    let output = run(&tools.avdmanager, ["list", "avd"], &RunOptions::default()).await;

    if avdmanager_missing(&output) {
        debug!("avdmanager unavailable, falling back to emulator -list-avds");
        let output = run(&tools.emulator, ["-list-avds"], &RunOptions::default())
            .await
            .into_result("emulator -list-avds failed")?;
        return Ok(parse_avd_list(&String::from_utf8_lossy(&output.stdout)));
    }

    let output = output.into_result("avdmanager list avd failed")?;
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push('\n');
    text.push_str(&String::from_utf8_lossy(&output.stderr));

    Ok(parse_avd_names(&text))
}

fn avdmanager_missing(output: &CommandOutput) -> bool {
    output
        .error
        .as_deref()
        .is_some_and(|e| e.contains("not found"))
}

/// Extract names from `avdmanager list avd` output. Other rows are ignored.
pub fn parse_avd_names(output: &str) -> Vec<String> {
    NAME_PATTERN
        .captures_iter(output)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Parse `emulator -list-avds` output: one name per line.
///
/// Newer emulators print `INFO |` diagnostics on the same stream; those are
/// skipped.
pub fn parse_avd_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.contains('|'))
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const AVDMANAGER_OUTPUT: &str = "Available Android Virtual Devices:
    Name: Pixel_7_API_34
  Device: pixel_7 (Google)
    Path: /home/dev/.android/avd/Pixel_7_API_34.avd
  Target: Google APIs (Google Inc.)
          Based on: Android 14.0 (UpsideDownCake) Tag/ABI: google_apis/arm64-v8a
---------
    Name: Small_Phone
    Path: /home/dev/.android/avd/Small_Phone.avd
";

    #[test]
    fn test_parse_avd_names() {
        assert_eq!(
            parse_avd_names(AVDMANAGER_OUTPUT),
            vec!["Pixel_7_API_34", "Small_Phone"]
        );
    }

    #[test]
    fn test_parse_avd_names_ignores_unmatched_lines() {
        let output = "Error: could not parse config\nName:\n  Name: Tablet \n";
        assert_eq!(parse_avd_names(output), vec!["Tablet"]);
    }

    #[test]
    fn test_parse_avd_list() {
        let output = "Pixel_7_API_34\n\nINFO    | Storing crashdata in: /tmp\nSmall_Phone\n";
        assert_eq!(parse_avd_list(output), vec!["Pixel_7_API_34", "Small_Phone"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_avds_reads_stderr_too() {
        use crate::test_utils::fake_tool;

        let dir = tempfile::tempdir().unwrap();
        let tools = AndroidTools {
            avdmanager: fake_tool(
                dir.path(),
                "avdmanager",
                "echo '    Name: OnStdout'; echo '    Name: OnStderr' >&2",
            ),
            ..AndroidTools::default()
        };

        let avds = list_avds(&tools).await.unwrap();
        assert_eq!(avds, vec!["OnStdout", "OnStderr"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_avds_falls_back_to_emulator() {
        use crate::test_utils::fake_tool;

        let dir = tempfile::tempdir().unwrap();
        let tools = AndroidTools {
            avdmanager: "/no/such/avdmanager".into(),
            emulator: fake_tool(dir.path(), "emulator", "echo Pixel_Fold"),
            ..AndroidTools::default()
        };

        assert_eq!(list_avds(&tools).await.unwrap(), vec!["Pixel_Fold"]);
    }
}
