//! Detection and alias bookkeeping for veil
//!
//! - [`PatternRegistry`]: thread-safe store of detectors
//! - [`catalog`]: the built-in detectors
//! - [`AliasGenerator`]: per-category placeholder counters
//! - [`MappingSession`]: alias <-> original store shared by both directions

pub mod alias;
pub mod catalog;
pub mod registry;
pub mod session;

pub use alias::{AliasGenerator, MAX_COUNTER_DIGITS, alias_tokens};
pub use catalog::{BUILTIN_PATTERNS, BuiltinPattern, builtin_patterns};
pub use registry::PatternRegistry;
pub use session::{DEFAULT_SESSION_DURATION, MappingSession};
