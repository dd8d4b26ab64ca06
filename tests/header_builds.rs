use std::fs;
use std::path::Path;

use serde_json::{Value, json};
use tempfile::tempdir;

use fingerprint_networks::constants::files::{
    BROWSER_HELPER_FILENAME, FINGERPRINT_NETWORK_FILENAME, HEADER_NETWORK_FILENAME,
    INPUT_NETWORK_FILENAME,
};
use fingerprint_networks::{
    BayesianNetwork, BuildConfig, DatasetKind, PipelineError, ProbabilisticModel,
    RobotSourceConfig, run_builds,
};

const WINDOWS_CHROME: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";
const MAC_FIREFOX: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:109.0) Gecko/20100101 Firefox/115.0";
const ANDROID_CHROME: &str = "Mozilla/5.0 (Linux; Android 13; Pixel 7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.5735.196 Mobile Safari/537.36";
const OPERA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36 OPR/100.0.0.0";

fn capture(user_agent: &str, headers: Value, http_version: &str, width: u64, height: u64) -> Value {
    json!({
        "requestFingerprint": { "headers": headers, "httpVersion": http_version },
        "browserFingerprint": {
            "userAgent": user_agent,
            "screen": { "width": width, "height": height }
        }
    })
}

fn write_structure(path: &Path, names: &[&str]) {
    let nodes: Vec<Value> = names
        .iter()
        .map(|name| json!({ "name": name, "parentNames": [], "possibleValues": [], "conditionalProbabilities": {} }))
        .collect();
    fs::write(path, json!({ "nodes": nodes }).to_string()).unwrap();
}

fn node_values(network: &BayesianNetwork, name: &str) -> Vec<String> {
    network
        .node(name)
        .map(|node| node.possible_values.clone())
        .unwrap_or_default()
}

fn setup(root: &Path) -> BuildConfig {
    let structures = root.join("structures");
    fs::create_dir_all(&structures).unwrap();
    write_structure(
        &structures.join(INPUT_NETWORK_FILENAME),
        &["*BROWSER_HTTP", "*BROWSER", "*OPERATING_SYSTEM", "*DEVICE", "*HTTP_VERSION"],
    );
    write_structure(
        &structures.join(HEADER_NETWORK_FILENAME),
        &["*BROWSER", "*DEVICE", "*HTTP_VERSION", "User-Agent", "accept-language", "dnt"],
    );
    write_structure(
        &structures.join(FINGERPRINT_NETWORK_FILENAME),
        &["userAgent", "screen"],
    );

    let dataset = json!([
        capture(
            WINDOWS_CHROME,
            json!({ "User-Agent": WINDOWS_CHROME, "accept-language": "en-US" }),
            "2.0",
            1920,
            1080
        ),
        capture(
            MAC_FIREFOX,
            json!({ "User-Agent": MAC_FIREFOX, "dnt": "1" }),
            "1.1",
            2560,
            1440
        ),
        capture(
            ANDROID_CHROME,
            json!({ "user-agent": ANDROID_CHROME }),
            "2.0",
            412,
            915
        ),
        // HTTP/1.1 with a lower-case user-agent header is dropped on the header path.
        capture(
            WINDOWS_CHROME,
            json!({ "user-agent": WINDOWS_CHROME }),
            "1.1",
            1920,
            1080
        ),
        capture(
            OPERA,
            json!({ "User-Agent": OPERA }),
            "2.0",
            1920,
            1080
        ),
        capture(
            "Mozilla/5.0 (compatible; bingbot/2.0)",
            json!({ "User-Agent": "Mozilla/5.0 (compatible; bingbot/2.0)" }),
            "2.0",
            1920,
            1080
        ),
    ]);
    let dataset_path = root.join("dataset.json");
    fs::write(&dataset_path, dataset.to_string()).unwrap();

    let robots_path = root.join("robots.json");
    fs::write(&robots_path, r#"[{"pattern":"bingbot"}]"#).unwrap();

    BuildConfig::new(dataset_path, &structures, root.join("out"))
        .with_robot_source(RobotSourceConfig::File(robots_path))
}

#[test]
fn input_and_header_networks_carry_synthetic_columns() {
    let temp = tempdir().unwrap();
    let config = setup(temp.path());

    let summaries = run_builds(&config, &[DatasetKind::Input, DatasetKind::Header]).unwrap();
    assert_eq!(summaries.len(), 2);
    for summary in &summaries {
        assert_eq!(summary.captured, 6);
        assert_eq!(summary.retained, 4);
        assert_eq!(summary.rejected, 2);
    }

    let input = BayesianNetwork::load(&config.input.output).unwrap();
    assert_eq!(
        node_values(&input, "*BROWSER"),
        vec!["chrome/114.0.0.0", "firefox/115.0", "chrome/114.0.5735.196", "*MISSING_VALUE*"]
    );
    assert_eq!(
        node_values(&input, "*OPERATING_SYSTEM"),
        vec!["windows", "macos", "android"]
    );
    assert_eq!(node_values(&input, "*DEVICE"), vec!["desktop", "mobile"]);
    assert_eq!(
        node_values(&input, "*HTTP_VERSION"),
        vec!["_2.0_", "_1.1_"]
    );

    let header = BayesianNetwork::load(&config.header.output).unwrap();
    assert_eq!(
        node_values(&header, "User-Agent"),
        vec![WINDOWS_CHROME, MAC_FIREFOX, "*MISSING_VALUE*", OPERA]
    );
    assert_eq!(
        node_values(&header, "dnt"),
        vec!["*MISSING_VALUE*", "1"]
    );

    let helper: Vec<String> =
        serde_json::from_str(&fs::read_to_string(&config.browser_helper_path).unwrap()).unwrap();
    assert_eq!(
        helper,
        vec![
            "chrome/114.0.0.0|2",
            "firefox/115.0|1",
            "chrome/114.0.5735.196|2",
            "*MISSING_VALUE*|2"
        ]
    );
    assert!(config.browser_helper_path.ends_with(BROWSER_HELPER_FILENAME));
    assert!(!config.fingerprint.output.exists());
}

#[test]
fn fingerprint_path_keeps_http_1_1_lower_case_records() {
    let temp = tempdir().unwrap();
    let config = setup(temp.path());

    let summaries = run_builds(&config, &[DatasetKind::Fingerprint]).unwrap();
    assert_eq!(summaries[0].retained, 5);
    assert!(summaries[0].browser_helper_path.is_none());
}

#[test]
fn missing_structure_file_fails_the_build() {
    let temp = tempdir().unwrap();
    let config = setup(temp.path());
    fs::remove_file(&config.header.structure).unwrap();

    let err = run_builds(&config, &[DatasetKind::Header]).unwrap_err();
    assert!(matches!(err, PipelineError::Io(_)));
    assert!(!config.header.output.exists());
    assert!(!config.browser_helper_path.exists());
}

#[test]
fn malformed_robot_payload_aborts_every_build() {
    let temp = tempdir().unwrap();
    let config = setup(temp.path());
    let robots_path = temp.path().join("robots.json");
    fs::write(&robots_path, "{\"oops\": true}").unwrap();

    let err = run_builds(&config, &DatasetKind::ALL).unwrap_err();
    assert!(matches!(err, PipelineError::RobotPatterns { .. }));
    assert!(!config.input.output.exists());
}
