use indexmap::IndexMap;

/// Attribute (column / network node) name.
/// Examples: `accept-language`, `*HTTP_VERSION`, `screen`, `*BROWSER`
pub type AttributeName = String;
/// Raw user-agent string as captured.
/// Example: `Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 ...`
pub type UserAgent = String;
/// Canonical browser label.
/// Examples: `chrome/114.0.0.0`, `edge/114.0.1823.51`, `firefox/115.0`
pub type BrowserLabel = String;
/// Composite browser/http key.
/// Examples: `chrome/114.0.0.0|2`, `*MISSING_VALUE*|1`
pub type BrowserHttpKey = String;
/// Robot pattern source text, compiled case-insensitively.
/// Example: `Googlebot\/`
pub type RobotPatternText = String;
/// Flat string-valued record handed to a trainer.
pub type WireRecord = IndexMap<AttributeName, String>;
