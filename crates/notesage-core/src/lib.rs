//! NoteSage Core: configuration, data directory layout, shared errors.

pub mod config;
pub mod error;

pub use config::{DataPaths, Limits, NoteSageConfig};
pub use error::{Error, Result};
