use std::collections::HashMap;

use veil_security::MappingSession;

/// Reverse transformation: puts original values back in place of aliases.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesanitizationEngine;

impl DesanitizationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Replace every alias known to `session` with its original value.
    ///
    /// Plain substring matching, no regex. At each position the longest alias
    /// wins, so `DATABASE_10` is never read as `DATABASE_1` followed by `0`.
    /// Restored text is emitted as-is and never rescanned. Alias-shaped
    /// tokens the session does not know are left untouched.
    pub fn desanitize(&self, content: &str, session: &MappingSession) -> String {
        let mappings = session.get_all_mappings();
        if mappings.is_empty() || content.is_empty() {
            return content.to_string();
        }

        // Alias lengths per leading byte, longest first.
        let mut lengths: HashMap<u8, Vec<usize>> = HashMap::new();
        for alias in mappings.keys() {
            if let Some(&first) = alias.as_bytes().first() {
                lengths.entry(first).or_default().push(alias.len());
            }
        }
        for lens in lengths.values_mut() {
            lens.sort_unstable_by(|a, b| b.cmp(a));
            lens.dedup();
        }

        let mut restored = String::with_capacity(content.len());
        let mut rest = content;
        let mut replaced = 0usize;

        while let Some(ch) = rest.chars().next() {
            let found = lengths.get(&rest.as_bytes()[0]).and_then(|lens| {
                lens.iter().find_map(|&len| {
                    let alias = rest.get(..len)?;
                    mappings.get(alias).map(|original| (len, original))
                })
            });
            match found {
                Some((len, original)) => {
                    restored.push_str(original);
                    rest = &rest[len..];
                    replaced += 1;
                }
                None => {
                    restored.push(ch);
                    rest = &rest[ch.len_utf8()..];
                }
            }
        }

        tracing::debug!(session = session.id(), count = replaced, "Restored aliases");
        restored
    }
}
