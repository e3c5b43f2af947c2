//! sitesearch core library
//!
//! Configuration, frontmatter, document descriptors, and error handling shared by
//! the record generator, the index clients and the synchronizer.

pub mod config;
pub mod document;
pub mod error;
pub mod frontmatter;

pub use config::Config;
pub use document::{DocumentDescriptor, SkipReason};
pub use error::{CoreError, Result};
pub use frontmatter::Frontmatter;
