//! Tracing subscriber setup shared by the `harvest` and `harvest-extract` binaries.

use tracing_subscriber::EnvFilter;

/// Builds the filter for a verbosity level
///
/// `RUST_LOG` wins when it is set; otherwise `quiet` limits output to errors
/// and each `-v` lowers the crate's threshold by one level.
pub fn build_filter(verbose: u8, quiet: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    if quiet {
        return EnvFilter::new("error");
    }

    match verbose {
        0 => EnvFilter::new("harvest=info,warn"),
        1 => EnvFilter::new("harvest=debug,info"),
        2 => EnvFilter::new("harvest=trace,debug"),
        _ => EnvFilter::new("trace"),
    }
}

/// Installs the global fmt subscriber
pub fn setup_logging(verbose: u8, quiet: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(verbose, quiet))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
