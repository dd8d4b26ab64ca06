use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, ValueEnum, error::ErrorKind};
use tracing_subscriber::EnvFilter;

use crate::builder::DatasetKind;
use crate::config::{BuildConfig, RobotSourceConfig};
use crate::constants::files::{DEFAULT_DATASET_PATH, DEFAULT_OUTPUT_DIR, DEFAULT_STRUCTURES_DIR};
use crate::pipeline::{BuildSummary, run_builds};

const DEFAULT_LOG_DIRECTIVE: &str = "info";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum NetworkArg {
    Input,
    Header,
    Fingerprint,
}

impl From<NetworkArg> for DatasetKind {
    fn from(value: NetworkArg) -> Self {
        match value {
            NetworkArg::Input => DatasetKind::Input,
            NetworkArg::Header => DatasetKind::Header,
            NetworkArg::Fingerprint => DatasetKind::Fingerprint,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "build_networks",
    disable_help_subcommand = true,
    about = "Build generator network definitions from browser captures",
    long_about = "Filter capture records, reconcile their attribute schema, and train the input, header, and fingerprint networks.",
    after_help = "Robot patterns are fetched from the public crawler list unless --robots-file is given. They are re-read for every network build."
)]
struct BuildNetworksCli {
    #[arg(
        long,
        value_name = "PATH",
        default_value = DEFAULT_DATASET_PATH,
        help = "JSON array of capture records"
    )]
    dataset: PathBuf,
    #[arg(
        long = "structures-dir",
        value_name = "DIR",
        default_value = DEFAULT_STRUCTURES_DIR,
        help = "Directory holding the network structure files"
    )]
    structures_dir: PathBuf,
    #[arg(
        long = "output-dir",
        value_name = "DIR",
        default_value = DEFAULT_OUTPUT_DIR,
        help = "Directory receiving trained network definitions"
    )]
    output_dir: PathBuf,
    #[arg(
        long = "robots-url",
        value_name = "URL",
        help = "Override the robot pattern list url"
    )]
    robots_url: Option<String>,
    #[arg(
        long = "robots-file",
        value_name = "PATH",
        conflicts_with = "robots_url",
        help = "Read robot patterns from a local JSON file instead of fetching them"
    )]
    robots_file: Option<PathBuf>,
    #[arg(
        long = "browser-helper-path",
        value_name = "PATH",
        help = "Optional path for the deduplicated browser/http helper file"
    )]
    browser_helper_path: Option<PathBuf>,
    #[arg(
        long,
        value_enum,
        help = "Build a single network instead of all three"
    )]
    only: Option<NetworkArg>,
}

impl BuildNetworksCli {
    fn into_config(self) -> (BuildConfig, Vec<DatasetKind>) {
        let mut config = BuildConfig::new(self.dataset, &self.structures_dir, &self.output_dir);
        if let Some(path) = self.robots_file {
            config = config.with_robot_source(RobotSourceConfig::File(path));
        } else if let Some(url) = self.robots_url {
            config = config.with_robot_source(RobotSourceConfig::Remote { url });
        }
        if let Some(path) = self.browser_helper_path {
            config = config.with_browser_helper_path(path);
        }
        let kinds = match self.only {
            Some(network) => vec![network.into()],
            None => DatasetKind::ALL.to_vec(),
        };
        (config, kinds)
    }
}

/// Parse `args_iter` (program name excluded) and run the requested builds.
pub fn run_build_networks<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let Some(cli) = parse_cli::<BuildNetworksCli, _>(
        std::iter::once("build_networks".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };

    let (config, kinds) = cli.into_config();
    let summaries = run_builds(&config, &kinds)?;
    for summary in &summaries {
        print_summary(summary);
    }
    Ok(())
}

/// Log filter for the binaries: `directives` (usually `RUST_LOG`) when they
/// parse, `info` otherwise.
pub fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_DIRECTIVE))
}

fn print_summary(summary: &BuildSummary) {
    println!(
        "{} network: kept {} of {} records ({} rejected), {} attributes -> {}",
        summary.kind,
        summary.retained,
        summary.captured,
        summary.rejected,
        summary.schema_attributes,
        summary.model_path.display()
    );
    if let Some(path) = &summary.browser_helper_path {
        println!("  browser helper -> {}", path.display());
    }
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}
