//! Sanitize / desanitize orchestration
//!
//! [`SanitizationEngine`] pulls enabled patterns from a
//! [`veil_security::PatternRegistry`] and swaps detected values for aliases
//! recorded in a [`veil_security::MappingSession`]. [`DesanitizationEngine`]
//! uses the same session to restore them.

pub mod desanitize;
pub mod sanitize;

pub use desanitize::DesanitizationEngine;
pub use sanitize::SanitizationEngine;
