//! Warden: real-time moderation, starboard and support-thread engine.
//!
//! Chat events enter through [`Warden::ingest`] and are routed per
//! (guild, channel) lane to the verdict engine, the action executor, the
//! starboard and the help-thread resolver. The platform, the AI oracle and
//! the stores are injected through [`Components`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use warden::{Components, Warden, WardenConfig};
//! use warden::interface::dry_run::{DryRunPlatform, StaticOracle};
//!
//! # async fn run() -> warden::WardenResult<()> {
//! let config = WardenConfig::load(None)?;
//! let components = Components::in_memory(
//!     Arc::new(DryRunPlatform::new()),
//!     Arc::new(StaticOracle::new()),
//!     &config,
//! );
//! let warden = Warden::start(config, components).await?;
//! // feed events with warden.ingest(event)
//! warden.shutdown(Duration::from_secs(5)).await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod cli;
mod config;
mod pipeline;

pub use config::{BlocklistConfig, ENV_PREFIX, IngestConfig, WardenConfig};
pub use pipeline::{Components, Warden};

pub use warden_core as core;
pub use warden_enforcement as enforcement;
pub use warden_error::{
    ConfigError, ConfigErrorKind, PipelineError, PipelineErrorKind, WardenError, WardenErrorKind,
    WardenResult,
};
pub use warden_interface as interface;
pub use warden_moderation as moderation;
pub use warden_rate_limit as rate_limit;
pub use warden_starboard as starboard;
pub use warden_storage as storage;
pub use warden_support as support;
