/// Reserved cell tokens shared by every dataset the pipeline produces.
pub mod tokens {
    /// Sentinel written for any absent, null, or empty attribute value.
    pub const MISSING_VALUE_TOKEN: &str = "*MISSING_VALUE*";
    /// Prefix marking a cell whose payload is JSON text of a non-string value.
    pub const STRINGIFIED_PREFIX: &str = "*STRINGIFIED*";
}

/// Node names used by the header and input networks.
pub mod nodes {
    /// Injected header-path attribute carrying the `_<httpVersion>_` token.
    pub const HTTP_VERSION_NODE: &str = "*HTTP_VERSION";
    /// Synthetic browser (`name/version`) column.
    pub const BROWSER_NODE: &str = "*BROWSER";
    /// Synthetic operating-system column.
    pub const OPERATING_SYSTEM_NODE: &str = "*OPERATING_SYSTEM";
    /// Synthetic device (`desktop`/`mobile`) column.
    pub const DEVICE_NODE: &str = "*DEVICE";
    /// Synthetic `<browser>|<httpMajor>` column.
    pub const BROWSER_HTTP_NODE: &str = "*BROWSER_HTTP";
}

/// Attribute keys read from raw capture records.
pub mod capture {
    /// Lower-case request header carrying the user-agent.
    pub const USER_AGENT_HEADER: &str = "user-agent";
    /// Title-case request header carrying the user-agent.
    pub const USER_AGENT_HEADER_TITLE: &str = "User-Agent";
    /// HTTP version that triggers the duplicate user-agent guard.
    pub const HTTP_1_1: &str = "1.1";
    /// Fingerprint attribute holding the plugin list.
    pub const PLUGINS_KEY: &str = "plugins";
    /// Fingerprint attribute holding the mime-type list.
    pub const MIME_TYPES_KEY: &str = "mimeTypes";
    /// Nested attribute that receives plugins and mime types.
    pub const PLUGINS_DATA_KEY: &str = "pluginsData";
}

/// Constants used by the record filter.
pub mod filter {
    /// Smallest screen width accepted for a landscape desktop capture.
    pub const MIN_DESKTOP_WIDTH: u64 = 1280;
}

/// Constants used by robot-pattern retrieval.
pub mod robots {
    /// Public crawler user-agent list fetched when no other source is configured.
    pub const DEFAULT_ROBOT_PATTERNS_URL: &str =
        "https://raw.githubusercontent.com/monperrus/crawler-user-agents/master/crawler-user-agents.json";
}

/// Default artifact locations used by the command-line runner.
pub mod files {
    /// Default input dataset path.
    pub const DEFAULT_DATASET_PATH: &str = "dataset.json";
    /// Default directory holding the model-structure files.
    pub const DEFAULT_STRUCTURES_DIR: &str = "network_structures";
    /// Default directory receiving trained model definitions.
    pub const DEFAULT_OUTPUT_DIR: &str = "network_definitions";
    /// Input network structure/definition filename.
    pub const INPUT_NETWORK_FILENAME: &str = "input-network-definition.json";
    /// Header network structure/definition filename.
    pub const HEADER_NETWORK_FILENAME: &str = "header-network-definition.json";
    /// Fingerprint network structure/definition filename.
    pub const FINGERPRINT_NETWORK_FILENAME: &str = "fingerprint-network-definition.json";
    /// Filename of the deduplicated `*BROWSER_HTTP` helper artifact.
    pub const BROWSER_HELPER_FILENAME: &str = "browser-helper-file.json";
}
