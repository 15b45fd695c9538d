//! Query compiler
//!
//! Turns the textual tail of a command invocation into validated, typed
//! query forms:
//!
//! - [`filter`] compiles the `FILTER` condition DSL into a predicate AST
//! - [`options`] parses the keyword-driven option grammar into a
//!   [`QuerySpec`]
//! - [`projection`] applies `LABELS` / `REDACT` to ordered records

pub mod filter;
pub mod options;
pub mod projection;

pub use filter::Predicate;
pub use options::{OptionMask, QueryOptions, QuerySpec};
pub use projection::Projection;
