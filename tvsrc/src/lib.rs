//! tvsrc library crate.
//!
//! Discovers live-TV stream URLs for a channel catalog, ranks them by
//! reachability and quality, and publishes a result list atomically.

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod probe;
pub mod providers;
pub mod utils;

pub use error::{Error, Result};
