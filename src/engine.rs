//! Engine facade
//!
//! Binds a stream store collaborator to the command surface. One
//! [`Engine::dispatch`] call is one atomic scripted invocation: strictly
//! sequential, no suspension points, no internal parallelism.
//!
//! # Example
//!
//! ```rust
//! use streamts::{Engine, MemoryStore, Reply};
//!
//! let engine = Engine::new(MemoryStore::new());
//!
//! engine.dispatch(&["temps"], "add", &["1000", "value", "21.5"]).unwrap();
//! engine.dispatch(&["temps"], "add", &["2000", "value", "23"]).unwrap();
//!
//! assert_eq!(engine.dispatch(&["temps"], "size", &[]).unwrap(), Reply::Int(2));
//!
//! let reply = engine
//!     .dispatch(&["temps"], "range", &["-", "+", "FILTER", "value>22"])
//!     .unwrap();
//! assert!(matches!(reply, Reply::Array(rows) if rows.len() == 1));
//! ```

use crate::commands;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::reply::Reply;
use crate::store::SeriesStore;

/// The timeseries engine over one stream store collaborator
pub struct Engine<S> {
    store: S,
    config: EngineConfig,
}

impl<S: SeriesStore> Engine<S> {
    /// Create an engine with the default configuration
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: EngineConfig::default(),
        }
    }

    /// Create an engine with a validated configuration
    pub fn with_config(store: S, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    /// Access the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume the engine, returning the store
    pub fn into_store(self) -> S {
        self.store
    }

    /// Execute one command invocation: `(keys..., command_name, args...)`.
    ///
    /// The command name is case-insensitive. Key arity is per command:
    /// `copy` takes two keys, `merge` three, everything else one.
    pub fn dispatch(&self, keys: &[&str], command: &str, args: &[&str]) -> Result<Reply> {
        commands::dispatch(&self.store, &self.config, keys, command, args)
    }
}
