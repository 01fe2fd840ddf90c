//! fogbugz-mcp - FogBugz for AI agents
//!
//! Exposes the FogBugz XML API as Model Context Protocol tools: case search
//! and editing, milestones, areas, attachments and a cached people
//! directory.

pub mod attachments;
pub mod client;
pub mod config;
pub mod error;
pub mod mcp;
pub mod normalize;
pub mod outline;
pub mod people;
pub mod tracker;
pub mod types;
pub mod xml;

pub use client::{ApiRequest, Gateway, HttpGateway};
pub use config::Config;
pub use error::{FogbugzError, Result};
pub use tracker::Tracker;
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
