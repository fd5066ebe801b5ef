//! Diagnostic logging.
//!
//! Logs go to stderr so they never interleave with the transcript on stdout.
//! `RUST_LOG` wins when set; otherwise `--verbose` selects `debug` for this
//! crate and the default is `warn`.

use tracing_subscriber::EnvFilter;

const CRATE_TARGET: &str = "ragchat";

/// Install the global subscriber. Safe to call more than once.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

fn default_directive(verbose: bool) -> String {
    if verbose {
        format!("warn,{CRATE_TARGET}=debug")
    } else {
        "warn".to_string()
    }
}
