//! streamts - univariate timeseries engine over an append-only keyed stream store
//!
//! Each series lives under one key and stores, in strict composite-id order,
//! entries mapping `(timestamp, sequence)` ids to small ordered field/value
//! records. The engine exposes a single dispatched command surface - `add`,
//! `get`, `range`, `copy`, `merge`, aggregations and friends - that is
//! parsed, validated, filtered, aggregated and materialised atomically
//! against the underlying stream primitive.
//!
//! The stream primitive itself is a collaborator behind the
//! [`store::SeriesStore`] trait; [`store::MemoryStore`] is the bundled
//! reference implementation.
//!
//! # Example
//!
//! ```rust
//! use streamts::{Engine, MemoryStore, Reply};
//!
//! let engine = Engine::new(MemoryStore::new());
//! engine.dispatch(&["cpu"], "add", &["100", "load", "0.75"]).unwrap();
//! engine.dispatch(&["cpu"], "add", &["200", "load", "0.9"]).unwrap();
//!
//! let span = engine.dispatch(&["cpu"], "span", &[]).unwrap();
//! assert_eq!(
//!     span,
//!     Reply::Array(vec![
//!         Reply::Bulk("100-0".to_string()),
//!         Reply::Bulk("200-0".to_string()),
//!     ])
//! );
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregate;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod merge;
pub mod pipeline;
pub mod query;
pub mod reply;
pub mod sink;
pub mod store;
pub mod types;
pub mod value;

// Re-export the main types
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, Result, StoreError};
pub use reply::{OutputFormat, Reply};
pub use store::{MemoryStore, SeriesStore};
pub use types::{Entry, EntryId, RangeBound};
pub use value::Value;
