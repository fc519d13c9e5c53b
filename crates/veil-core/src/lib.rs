//! Core domain models for veil
//!
//! This crate contains:
//! - Sensitive-data categories and their alias prefixes
//! - Patterns (regex detectors with priority and a match budget)
//! - Sanitization options, results and the match ledger

pub mod category;
pub mod error;
pub mod pattern;
pub mod sanitization;

pub use category::{Category, DEFAULT_ALIAS_PREFIX, PolicyClass};
pub use error::{Error, PatternError, Result};
pub use pattern::{DEFAULT_MATCH_TIMEOUT, Pattern, SEARCH_WINDOW, Span};
pub use sanitization::{
    SanitizationMatch, SanitizationMode, SanitizationOptions, SanitizationResult,
};
