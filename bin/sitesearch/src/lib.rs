//! sitesearch CLI Library
//!
//! Command implementations behind the `sitesearch` binary, exposed as a library
//! so they can be documented and driven from other tools.
//!
//! # Modules
//!
//! - [`cmd`] - Command implementations (sync, check)
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use sitesearch::cmd;
//!
//! // Validate configuration and content without touching the index
//! cmd::check::run(Path::new("sitesearch.toml"), false).unwrap();
//! ```

pub mod cmd;

// Re-export core types for convenience
pub use sitesearch_core::{Config, DocumentDescriptor};
pub use sitesearch_sync::{DocumentCollector, SyncReport, Synchronizer};

/// Initialize tracing with the specified verbosity level.
///
/// # Arguments
///
/// * `verbose` - Verbosity level (0 = WARN, 1 = INFO, 2 = DEBUG, 3+ = TRACE)
///
/// `RUST_LOG` directives are honoured on top of the level.
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}
