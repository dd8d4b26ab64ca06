use std::error::Error;

use fingerprint_networks::apps::{log_filter, run_build_networks};

fn main() -> Result<(), Box<dyn Error>> {
    let directives = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(directives.as_deref()))
        .init();

    run_build_networks(std::env::args().skip(1))
}
