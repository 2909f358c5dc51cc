//! Starboard aggregator of the Warden engine.
//!
//! Star reactions are folded into one [`warden_core::StarboardEntry`] per
//! message. The star count is always the size of the distinct reactor set, so
//! re-delivered events never double count. Crossing the threshold creates a
//! showcase post; later changes edit it, and, when retraction is enabled,
//! falling below the threshold deletes it.

#![warn(missing_docs)]

mod aggregator;
mod config;
mod lock;
mod render;

pub use aggregator::{PostChange, StarboardAggregator, StarboardOutcome};
pub use config::StarboardConfig;
pub use lock::{KeyedGuard, KeyedLocks};
pub use render::render_post;
