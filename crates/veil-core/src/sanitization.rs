//! Sanitization request/response models

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::category::{Category, PolicyClass};

/// How the caller intends to use sanitized output.
///
/// Carried for callers and configuration; the engine does not consult it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanitizationMode {
    #[default]
    Unrestricted,
    SanitizedOnly,
    Blocked,
}

/// Which policy classes a sanitize call processes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizationOptions {
    #[serde(default)]
    pub mode: SanitizationMode,

    #[serde(default = "enabled")]
    pub enable_infrastructure: bool,

    #[serde(default = "enabled")]
    pub enable_pii: bool,

    #[serde(default = "enabled")]
    pub enable_custom_patterns: bool,
}

fn enabled() -> bool {
    true
}

impl Default for SanitizationOptions {
    fn default() -> Self {
        Self {
            mode: SanitizationMode::default(),
            enable_infrastructure: true,
            enable_pii: true,
            enable_custom_patterns: true,
        }
    }
}

impl SanitizationOptions {
    pub fn allows_class(&self, class: PolicyClass) -> bool {
        match class {
            PolicyClass::Infrastructure => self.enable_infrastructure,
            PolicyClass::Pii => self.enable_pii,
            PolicyClass::Custom => self.enable_custom_patterns,
        }
    }

    pub fn allows(&self, category: Category) -> bool {
        self.allows_class(category.policy_class())
    }
}

/// One substitution performed during a sanitize call.
///
/// `start_index` and `length` are byte offsets into the working text as it
/// stood when the owning pattern ran. Once several patterns contribute they
/// no longer line up with the final output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizationMatch {
    pub original: String,
    pub alias: String,
    pub category: Category,
    pub pattern_name: String,
    pub start_index: usize,
    pub length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizationResult {
    pub sanitized_content: String,
    pub was_sanitized: bool,
    pub matches: Vec<SanitizationMatch>,
    /// Patterns that contributed nothing because their evaluation was
    /// abandoned (timeout or unusable source). Detection was degraded for
    /// these.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_patterns: Vec<String>,
    /// Tokens in the input that already spell an alias of the session.
    /// They were left as they are and will be restored to that alias's
    /// original by desanitize.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ambiguous_aliases: Vec<String>,
}

impl SanitizationResult {
    /// Result for content that needed no changes
    pub fn unchanged(content: impl Into<String>) -> Self {
        Self {
            sanitized_content: content.into(),
            was_sanitized: false,
            matches: Vec::new(),
            skipped_patterns: Vec::new(),
            ambiguous_aliases: Vec::new(),
        }
    }

    pub fn distinct_aliases(&self) -> BTreeSet<&str> {
        self.matches.iter().map(|m| m.alias.as_str()).collect()
    }

    pub fn is_degraded(&self) -> bool {
        !self.skipped_patterns.is_empty()
    }
}
