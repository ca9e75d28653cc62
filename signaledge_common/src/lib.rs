//! SignalEdge Common Library
//!
//! Shared constants and configuration loading utilities for the
//! SignalEdge workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Numeric limits and default paths
//! - [`config`] - Configuration loading traits and types
//!
//! # Usage
//!
//! Add to your `Cargo.toml` with an alias for shorter imports:
//! ```toml
//! [dependencies]
//! signaledge = { package = "signaledge_common", path = "../signaledge_common" }
//! ```
//!
//! Then import:
//! ```rust
//! use signaledge_common::consts::*;
//! use signaledge_common::config::{ConfigLoader, NodeConfig};
//! ```

pub mod config;
pub mod consts;
