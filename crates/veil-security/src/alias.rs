use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use regex::Regex;
use veil_core::Category;

/// Longest counter a generated alias can carry (`u64::MAX` has 20 digits)
pub const MAX_COUNTER_DIGITS: usize = 20;

lazy_static! {
    static ref ALIAS_TOKEN: Regex = {
        let prefixes: Vec<String> = Category::ALL
            .iter()
            .map(|c| regex::escape(c.alias_prefix()))
            .collect();
        Regex::new(&format!("(?:{})[0-9]+", prefixes.join("|")))
            .expect("escaped alias prefixes form a valid regex")
    };
}

/// Every generated-alias-shaped string that occurs in `text`.
///
/// Desanitize matches aliases as plain substrings, so `DATABASE_12` in the
/// text also yields `DATABASE_1`: both would be picked up on restore.
pub fn alias_tokens(text: &str) -> HashSet<String> {
    let mut tokens = HashSet::new();
    for m in ALIAS_TOKEN.find_iter(text) {
        let token = m.as_str();
        let digits_at = token.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        let last = token.len().min(digits_at + MAX_COUNTER_DIGITS);
        for end in digits_at + 1..=last {
            tokens.insert(token[..end].to_string());
        }
    }
    tokens
}

/// Mints placeholder tokens of the form `{prefix}{counter}`.
///
/// Counters are per category and start at 0. The generator is plain data;
/// [`crate::MappingSession`] keeps one behind its lock so that lookup and
/// minting happen in the same critical section.
#[derive(Debug, Clone, Default)]
pub struct AliasGenerator {
    counters: HashMap<Category, u64>,
}

impl AliasGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next alias for `category`; advances that category's counter
    pub fn generate(&mut self, category: Category) -> String {
        let counter = self.counters.entry(category).or_insert(0);
        let alias = format!("{}{}", category.alias_prefix(), counter);
        *counter += 1;
        alias
    }

    /// Counter value the next `generate` call will use
    pub fn peek(&self, category: Category) -> u64 {
        self.counters.get(&category).copied().unwrap_or(0)
    }

    pub fn reset(&mut self) {
        self.counters.clear();
    }
}
