//! glyx-examples
//!
//! Helpers shared by the example binaries: logging setup, command-line
//! parsing and two activity sinks.

use tracing_subscriber::EnvFilter;

pub mod cli;
pub mod sinks;

pub use cli::Invocation;
pub use sinks::{JsonlFileSink, StderrSink};

/// Install a `fmt` subscriber on stderr, filtered by `RUST_LOG` (default `info`)
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
