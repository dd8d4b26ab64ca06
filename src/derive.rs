//! User-agent classification for the header and input networks.
//!
//! Both classifiers are ordered rule tables evaluated top-down; the first rule
//! that fires decides. Rule order encodes precedence and must not change.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::constants::nodes::{
    BROWSER_HTTP_NODE, BROWSER_NODE, DEVICE_NODE, OPERATING_SYSTEM_NODE,
};
use crate::constants::tokens::MISSING_VALUE_TOKEN;
use crate::encode::Cell;
use crate::types::{BrowserHttpKey, BrowserLabel};

/// Device class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Device {
    /// Anything without a mobile token.
    Desktop,
    /// Phone, android or mobile user-agents.
    Mobile,
}

impl Device {
    /// Lower-case wire label.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operating-system class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperatingSystem {
    /// Windows desktop.
    Windows,
    /// macOS desktop.
    MacOs,
    /// Linux desktop.
    Linux,
    /// iPhone and iPad.
    Ios,
    /// Android phones and tablets.
    Android,
}

impl OperatingSystem {
    /// Lower-case wire label.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::MacOs => "macos",
            Self::Linux => "linux",
            Self::Ios => "ios",
            Self::Android => "android",
        }
    }
}

impl fmt::Display for OperatingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tokens that mark a user-agent as mobile (`/phone|android|mobile/i`).
const MOBILE_TOKENS: [&str; 3] = ["phone", "android", "mobile"];

/// Token that sets the tentative OS before device-specific rules run.
const TENTATIVE_WINDOWS_TOKEN: &str = "windows";

struct OsRule {
    device: Device,
    any_of: &'static [&'static str],
    os: OperatingSystem,
}

const OS_RULES: [OsRule; 4] = [
    OsRule {
        device: Device::Mobile,
        any_of: &["iphone", "mac"],
        os: OperatingSystem::Ios,
    },
    OsRule {
        device: Device::Mobile,
        any_of: &["android"],
        os: OperatingSystem::Android,
    },
    OsRule {
        device: Device::Desktop,
        any_of: &["linux"],
        os: OperatingSystem::Linux,
    },
    OsRule {
        device: Device::Desktop,
        any_of: &["mac"],
        os: OperatingSystem::MacOs,
    },
];

/// True when the user-agent carries a phone/android/mobile token (case-insensitive).
pub fn is_mobile_user_agent(user_agent: &str) -> bool {
    let lowered = user_agent.to_lowercase();
    MOBILE_TOKENS.iter().any(|token| lowered.contains(token))
}

/// Classify device and operating system.
///
/// `windows` sets a tentative OS; the first matching device-specific rule
/// overrides it, otherwise the tentative value (possibly none) stands.
pub fn classify_device_os(user_agent: &str) -> (Device, Option<OperatingSystem>) {
    let lowered = user_agent.to_lowercase();
    let tentative = lowered
        .contains(TENTATIVE_WINDOWS_TOKEN)
        .then_some(OperatingSystem::Windows);
    let device = if is_mobile_user_agent(user_agent) {
        Device::Mobile
    } else {
        Device::Desktop
    };
    let os = OS_RULES
        .iter()
        .filter(|rule| rule.device == device)
        .find(|rule| rule.any_of.iter().any(|token| lowered.contains(token)))
        .map(|rule| rule.os)
        .or(tentative);
    (device, os)
}

#[derive(Clone, Copy)]
enum BrowserOutcome {
    Unsupported,
    Family(&'static str),
    Canonical,
}

const BROWSER_RULES: [(&str, BrowserOutcome); 3] = [
    (
        r"(?i)(opr/|opera|yabrowser|yaapp_|yandex|samsungbrowser|ucbrowser|ucweb|vivaldi)",
        BrowserOutcome::Unsupported,
    ),
    (
        r"(?i)(edg|edga|edgios|edge)/([0-9.]*)",
        BrowserOutcome::Family("edge"),
    ),
    (
        r"(?i)(firefox|fxios|chrome|crios|safari)/([0-9.]*)",
        BrowserOutcome::Canonical,
    ),
];

fn browser_rules() -> &'static [(Regex, BrowserOutcome)] {
    static RULES: OnceLock<Vec<(Regex, BrowserOutcome)>> = OnceLock::new();
    RULES.get_or_init(|| {
        BROWSER_RULES
            .iter()
            .map(|(pattern, outcome)| (Regex::new(pattern).expect("valid browser rule"), *outcome))
            .collect()
    })
}

fn canonical_browser_name(name: &str) -> String {
    match name.to_lowercase().as_str() {
        "fxios" => "firefox".to_string(),
        "crios" => "chrome".to_string(),
        other => other.to_string(),
    }
}

/// Classify `name/version`, or `None` for unsupported or unrecognized browsers.
///
/// Only the leftmost match of the first firing rule is used, so Chrome wins
/// over the trailing `Safari/` token of a Chrome user-agent.
pub fn classify_browser_version(user_agent: &str) -> Option<BrowserLabel> {
    for (regex, outcome) in browser_rules() {
        let Some(captures) = regex.captures(user_agent) else {
            continue;
        };
        return match outcome {
            BrowserOutcome::Unsupported => None,
            BrowserOutcome::Family(family) => {
                let version = captures.get(2).map(|m| m.as_str()).unwrap_or_default();
                Some(format!("{family}/{version}"))
            }
            BrowserOutcome::Canonical => {
                let name = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
                let version = captures.get(2).map(|m| m.as_str()).unwrap_or_default();
                Some(format!("{}/{version}", canonical_browser_name(name)))
            }
        };
    }
    None
}

/// Major HTTP version from an injected `_<httpVersion>_` token.
pub fn http_major(http_version_token: &str) -> &'static str {
    if http_version_token.starts_with("_1") {
        "1"
    } else {
        "2"
    }
}

/// Categorical attributes derived from one user-agent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DerivedAttributes {
    /// `name/version`, or `None` when the browser is unsupported.
    pub browser: Option<BrowserLabel>,
    /// Operating system, when a rule matched.
    pub operating_system: Option<OperatingSystem>,
    /// Device class.
    pub device: Device,
    /// `browser|httpMajor` key.
    pub browser_http: BrowserHttpKey,
}

impl DerivedAttributes {
    /// Derive all synthetic attributes for a header-path record.
    pub fn from_user_agent(user_agent: &str, http_version_token: &str) -> Self {
        let browser = classify_browser_version(user_agent);
        let (device, operating_system) = classify_device_os(user_agent);
        let browser_http = format!(
            "{}|{}",
            browser.as_deref().unwrap_or(MISSING_VALUE_TOKEN),
            http_major(http_version_token)
        );
        Self {
            browser,
            operating_system,
            device,
            browser_http,
        }
    }
}

/// Columns the pipeline produces itself rather than reading from a capture.
///
/// These are excluded from projection and merged back afterwards, so they are
/// always present on header and input datasets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyntheticAttribute {
    /// `*BROWSER`.
    Browser,
    /// `*OPERATING_SYSTEM`.
    OperatingSystem,
    /// `*DEVICE`.
    Device,
    /// `*BROWSER_HTTP`.
    BrowserHttp,
}

impl SyntheticAttribute {
    /// Every synthetic column, in merge order.
    pub const ALL: [SyntheticAttribute; 4] = [
        Self::Browser,
        Self::OperatingSystem,
        Self::Device,
        Self::BrowserHttp,
    ];

    /// Network node name the column is stored under.
    pub const fn node_name(&self) -> &'static str {
        match self {
            Self::Browser => BROWSER_NODE,
            Self::OperatingSystem => OPERATING_SYSTEM_NODE,
            Self::Device => DEVICE_NODE,
            Self::BrowserHttp => BROWSER_HTTP_NODE,
        }
    }

    /// True if `name` is produced by one of the synthetic producers.
    pub fn is_synthetic(name: &str) -> bool {
        Self::ALL.iter().any(|attribute| attribute.node_name() == name)
    }

    /// Produce this column's cell.
    pub fn produce(&self, derived: &DerivedAttributes) -> Cell {
        match self {
            Self::Browser => derived
                .browser
                .as_ref()
                .map(|browser| Cell::text(browser.as_str()))
                .unwrap_or(Cell::Missing),
            Self::OperatingSystem => derived
                .operating_system
                .map(|os| Cell::text(os.as_str()))
                .unwrap_or(Cell::Missing),
            Self::Device => Cell::text(derived.device.as_str()),
            Self::BrowserHttp => Cell::text(derived.browser_http.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 16_5 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.5 Mobile/15E148 Safari/604.1";
    const CHROME_ANDROID: &str = "Mozilla/5.0 (Linux; Android 13; Pixel 7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.5735.196 Mobile Safari/537.36";
    const CRIOS_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 16_5 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) CriOS/114.0 Mobile/15E148 Safari/604.1";
    const OPERA_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36 OPR/100.0.0.0";
    const EDGE_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36 Edg/114.0.1823.51";
    const FIREFOX_LINUX: &str =
        "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/115.0";
    const FXIOS_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 16_5 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) FxiOS/115.0 Mobile/15E148 Safari/605.1.15";
    const SAFARI_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.5 Safari/605.1.15";

    #[test]
    fn chrome_wins_over_trailing_safari_token() {
        assert_eq!(
            classify_browser_version(CHROME_WINDOWS).as_deref(),
            Some("chrome/114.0.0.0")
        );
    }

    #[test]
    fn ios_variants_are_canonicalized() {
        assert_eq!(
            classify_browser_version(CRIOS_IPHONE).as_deref(),
            Some("chrome/114.0")
        );
        assert_eq!(
            classify_browser_version(FXIOS_IPHONE).as_deref(),
            Some("firefox/115.0")
        );
    }

    #[test]
    fn unsupported_and_unknown_browsers_are_missing() {
        assert_eq!(classify_browser_version(OPERA_WINDOWS), None);
        assert_eq!(classify_browser_version("curl/8.0.1"), None);
    }

    #[test]
    fn edge_family_takes_precedence_over_chrome() {
        assert_eq!(
            classify_browser_version(EDGE_WINDOWS).as_deref(),
            Some("edge/114.0.1823.51")
        );
        assert_eq!(
            classify_browser_version("Mozilla/5.0 (Linux; Android 10) EdgA/114.0.1823.41")
                .as_deref(),
            Some("edge/114.0.1823.41")
        );
    }

    #[test]
    fn device_and_os_follow_rule_order() {
        assert_eq!(
            classify_device_os(SAFARI_IPHONE),
            (Device::Mobile, Some(OperatingSystem::Ios))
        );
        assert_eq!(
            classify_device_os(CHROME_WINDOWS),
            (Device::Desktop, Some(OperatingSystem::Windows))
        );
        assert_eq!(
            classify_device_os(CHROME_ANDROID),
            (Device::Mobile, Some(OperatingSystem::Android))
        );
        assert_eq!(
            classify_device_os(FIREFOX_LINUX),
            (Device::Desktop, Some(OperatingSystem::Linux))
        );
        assert_eq!(
            classify_device_os(SAFARI_MAC),
            (Device::Desktop, Some(OperatingSystem::MacOs))
        );
        assert_eq!(classify_device_os("curl/8.0.1"), (Device::Desktop, None));
    }

    #[test]
    fn windows_phone_keeps_tentative_windows() {
        let ua = "Mozilla/5.0 (Windows Phone 10.0; Android 6.0.1) Edge/15.15063";
        // `android` outranks the tentative value on mobile.
        assert_eq!(
            classify_device_os(ua),
            (Device::Mobile, Some(OperatingSystem::Android))
        );
        let ua = "Mozilla/5.0 (Windows Phone 8.1; ARM; Trident/7.0)";
        assert_eq!(
            classify_device_os(ua),
            (Device::Mobile, Some(OperatingSystem::Windows))
        );
    }

    #[test]
    fn browser_http_uses_major_version_token() {
        let derived = DerivedAttributes::from_user_agent(CHROME_WINDOWS, "_2.0_");
        assert_eq!(derived.browser_http, "chrome/114.0.0.0|2");
        let derived = DerivedAttributes::from_user_agent(CHROME_WINDOWS, "_1.1_");
        assert_eq!(derived.browser_http, "chrome/114.0.0.0|1");
        let derived = DerivedAttributes::from_user_agent(OPERA_WINDOWS, "_1.1_");
        assert_eq!(derived.browser_http, "*MISSING_VALUE*|1");
    }

    #[test]
    fn synthetic_producers_render_cells() {
        let derived = DerivedAttributes::from_user_agent("curl/8.0.1", "_2_");
        assert_eq!(SyntheticAttribute::Browser.produce(&derived), Cell::Missing);
        assert_eq!(
            SyntheticAttribute::OperatingSystem.produce(&derived),
            Cell::Missing
        );
        assert_eq!(
            SyntheticAttribute::Device.produce(&derived),
            Cell::Plain("desktop".into())
        );
        assert!(SyntheticAttribute::is_synthetic("*BROWSER_HTTP"));
        assert!(!SyntheticAttribute::is_synthetic("*HTTP_VERSION"));
    }
}
