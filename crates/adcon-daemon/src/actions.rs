//! One-shot device actions
//!
//! Each action is one or more `adb -s <serial> …` invocations with no state
//! of its own. Constructors validate raw request parameters and return
//! [`Error::Validation`] with a client-facing message; [`DeviceAction::apply`]
//! maps a tool failure to [`Error::Upstream`] carrying the tool's text.

use adcon_core::prelude::*;

use crate::adb::Adb;
use crate::runner::RunOptions;

/// Hardware/navigation key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Back,
    Home,
    Overview,
    Power,
    VolumeUp,
    VolumeDown,
}

impl KeyAction {
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "back" => Some(Self::Back),
            "home" => Some(Self::Home),
            "overview" => Some(Self::Overview),
            "power" => Some(Self::Power),
            "vol_up" => Some(Self::VolumeUp),
            "vol_down" => Some(Self::VolumeDown),
            _ => None,
        }
    }

    pub fn keycode(self) -> &'static str {
        match self {
            Self::Back => "KEYCODE_BACK",
            Self::Home => "KEYCODE_HOME",
            Self::Overview => "KEYCODE_APP_SWITCH",
            Self::Power => "KEYCODE_POWER",
            Self::VolumeUp => "KEYCODE_VOLUME_UP",
            Self::VolumeDown => "KEYCODE_VOLUME_DOWN",
        }
    }
}

/// A stateless device command
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceAction {
    Rotate { landscape: bool },
    Wifi { enabled: bool },
    MobileData { enabled: bool },
    /// Emulator GPS fix
    Geo { lat: f64, lon: f64 },
    Battery { level: u8, charging: bool },
    BatteryReset,
    Theme { dark: bool },
    Locale(String),
    FontScale(f64),
    Key(KeyAction),
    Install { apk: String },
    Launch { package: String },
    ClearData { package: String },
    DeepLink { url: String },
}

impl DeviceAction {
    /// `mode=portrait|landscape` (default portrait)
    pub fn rotate(mode: Option<&str>) -> Self {
        Self::Rotate {
            landscape: mode == Some("landscape"),
        }
    }

    /// `enabled=1|0` for wifi
    pub fn wifi(enabled: Option<&str>) -> Result<Self> {
        Ok(Self::Wifi {
            enabled: parse_toggle(enabled)?,
        })
    }

    /// `enabled=1|0` for mobile data
    pub fn mobile_data(enabled: Option<&str>) -> Result<Self> {
        Ok(Self::MobileData {
            enabled: parse_toggle(enabled)?,
        })
    }

    pub fn geo(lat: Option<&str>, lon: Option<&str>) -> Result<Self> {
        match (parse_number(lat), parse_number(lon)) {
            (Some(lat), Some(lon)) => Ok(Self::Geo { lat, lon }),
            _ => Err(Error::validation("Missing ?lat=<number>&lon=<number>")),
        }
    }

    /// `level=0..100&charging=0|1`, or `mode=reset`
    pub fn battery(mode: Option<&str>, level: Option<&str>, charging: Option<&str>) -> Result<Self> {
        if mode == Some("reset") {
            return Ok(Self::BatteryReset);
        }
        match parse_number(level) {
            Some(level) if (0.0..=100.0).contains(&level) => Ok(Self::Battery {
                level: level.round() as u8,
                charging: charging == Some("1"),
            }),
            _ => Err(Error::validation("Missing ?level=0..100 (or ?mode=reset)")),
        }
    }

    /// `mode=dark|light` (default dark)
    pub fn theme(mode: Option<&str>) -> Self {
        Self::Theme {
            dark: mode != Some("light"),
        }
    }

    pub fn locale(locale: Option<&str>) -> Result<Self> {
        Ok(Self::Locale(required("locale", locale)?))
    }

    pub fn font_scale(scale: Option<&str>) -> Result<Self> {
        match parse_number(scale) {
            Some(scale) if (0.75..=2.0).contains(&scale) => Ok(Self::FontScale(scale)),
            _ => Err(Error::validation("Missing ?scale=0.75..2.0")),
        }
    }

    pub fn key(action: Option<&str>) -> Result<Self> {
        action
            .and_then(KeyAction::parse)
            .map(Self::Key)
            .ok_or_else(|| Error::validation("Invalid action"))
    }

    pub fn launch(package: Option<&str>) -> Result<Self> {
        Ok(Self::Launch {
            package: required_package(package)?,
        })
    }

    pub fn clear_data(package: Option<&str>) -> Result<Self> {
        Ok(Self::ClearData {
            package: required_package(package)?,
        })
    }

    pub fn deep_link(url: Option<&str>) -> Result<Self> {
        Ok(Self::DeepLink {
            url: required("url", url)?,
        })
    }

    /// Argument lists, each run as `adb -s <serial> <args>`
    pub fn adb_commands(&self) -> Vec<Vec<String>> {
        fn cmd(parts: &[&str]) -> Vec<String> {
            parts.iter().map(|s| s.to_string()).collect()
        }

        match self {
            Self::Rotate { landscape } => vec![
                cmd(&["shell", "settings", "put", "system", "accelerometer_rotation", "0"]),
                cmd(&[
                    "shell",
                    "settings",
                    "put",
                    "system",
                    "user_rotation",
                    if *landscape { "1" } else { "0" },
                ]),
            ],
            Self::Wifi { enabled } => vec![cmd(&["shell", "svc", "wifi", enable_word(*enabled)])],
            Self::MobileData { enabled } => {
                vec![cmd(&["shell", "svc", "data", enable_word(*enabled)])]
            }
            // geo fix takes longitude first
            Self::Geo { lat, lon } => vec![cmd(&[
                "emu",
                "geo",
                "fix",
                &lon.to_string(),
                &lat.to_string(),
            ])],
            Self::Battery { level, charging } => vec![
                cmd(&["shell", "dumpsys", "battery", "set", "level", &level.to_string()]),
                // 2 = charging, 3 = discharging
                cmd(&[
                    "shell",
                    "dumpsys",
                    "battery",
                    "set",
                    "status",
                    if *charging { "2" } else { "3" },
                ]),
            ],
            Self::BatteryReset => vec![cmd(&["shell", "dumpsys", "battery", "reset"])],
            Self::Theme { dark } => vec![cmd(&[
                "shell",
                "cmd",
                "uimode",
                "night",
                if *dark { "yes" } else { "no" },
            ])],
            Self::Locale(locale) => vec![cmd(&["shell", "cmd", "locale", "set", locale])],
            Self::FontScale(scale) => vec![cmd(&[
                "shell",
                "settings",
                "put",
                "system",
                "font_scale",
                &scale.to_string(),
            ])],
            Self::Key(key) => vec![cmd(&["shell", "input", "keyevent", key.keycode()])],
            Self::Install { apk } => vec![cmd(&["install", "-r", apk])],
            Self::Launch { package } => vec![cmd(&[
                "shell",
                "monkey",
                "-p",
                package,
                "-c",
                "android.intent.category.LAUNCHER",
                "1",
            ])],
            Self::ClearData { package } => vec![cmd(&["shell", "pm", "clear", package])],
            Self::DeepLink { url } => vec![cmd(&[
                "shell",
                "am",
                "start",
                "-a",
                "android.intent.action.VIEW",
                "-d",
                url,
            ])],
        }
    }

    /// Message used when a failing tool prints nothing
    pub fn failure_fallback(&self) -> &'static str {
        match self {
            Self::Rotate { .. } => "Rotate failed",
            Self::Wifi { .. } => "Wi-Fi toggle failed",
            Self::MobileData { .. } => "Mobile data toggle failed",
            Self::Geo { .. } => "Geo set failed",
            Self::Battery { .. } => "Battery set failed",
            Self::BatteryReset => "Battery reset failed",
            Self::Theme { .. } => "Theme set failed",
            Self::Locale(_) => "Locale set failed",
            Self::FontScale(_) => "Font scale failed",
            Self::Key(_) => "Key event failed",
            Self::Install { .. } => "Install failed",
            Self::Launch { .. } => "Launch failed",
            Self::ClearData { .. } => "Clear failed",
            Self::DeepLink { .. } => "Deep link failed",
        }
    }

    /// Whether the tool's stdout is meaningful to the caller
    pub fn reports_output(&self) -> bool {
        matches!(
            self,
            Self::Install { .. } | Self::Launch { .. } | Self::ClearData { .. } | Self::DeepLink { .. }
        )
    }

    /// Run every command for this action against `serial`.
    ///
    /// All commands are attempted; the first failure is returned. On success
    /// the trimmed stdout of the last command is returned.
    pub async fn apply(&self, adb: &Adb, serial: &str) -> Result<String> {
        let mut first_error = None;
        let mut stdout = String::new();

        for args in self.adb_commands() {
            let output = adb.run_on(serial, &args, &RunOptions::default()).await;
            if output.ok() {
                stdout = output.stdout_text();
            } else if first_error.is_none() {
                first_error = Some(output.failure_message(self.failure_fallback()));
            }
        }

        match first_error {
            Some(message) => {
                warn!("{} on {}: {}", self.failure_fallback(), serial, message);
                Err(Error::upstream(message))
            }
            None => {
                debug!("Applied {:?} to {}", self, serial);
                Ok(stdout)
            }
        }
    }
}

fn enable_word(enabled: bool) -> &'static str {
    if enabled {
        "enable"
    } else {
        "disable"
    }
}

fn parse_toggle(value: Option<&str>) -> Result<bool> {
    match value {
        Some("1") => Ok(true),
        Some("0") => Ok(false),
        _ => Err(Error::validation("Missing ?enabled=1|0")),
    }
}

/// Finite decimal number, or `None`
fn parse_number(value: Option<&str>) -> Option<f64> {
    value
        .map(str::trim)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn required(name: &str, value: Option<&str>) -> Result<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(Error::validation(format!("Missing ?{}=", name))),
    }
}

fn required_package(value: Option<&str>) -> Result<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(Error::validation("Missing ?pkg=com.example.app")),
    }
}
