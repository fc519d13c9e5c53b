use std::cmp::Reverse;
use std::sync::Arc;

use veil_core::{
    Pattern, PatternError, Result, SanitizationMatch, SanitizationOptions, SanitizationResult,
    Span,
};
use veil_security::{MappingSession, PatternRegistry, alias_tokens};

/// Forward transformation: replaces detected values with session aliases.
pub struct SanitizationEngine {
    registry: Arc<PatternRegistry>,
}

impl SanitizationEngine {
    pub fn new(registry: Arc<PatternRegistry>) -> Self {
        Self { registry }
    }

    /// Engine over a fresh registry holding the built-in catalog
    pub fn with_builtins() -> Result<Self> {
        Ok(Self::new(Arc::new(PatternRegistry::with_builtins()?)))
    }

    pub fn registry(&self) -> &Arc<PatternRegistry> {
        &self.registry
    }

    /// Enabled patterns allowed by `options`, highest priority first.
    /// Equal priorities keep registry (name) order.
    pub fn active_patterns(&self, options: &SanitizationOptions) -> Vec<Arc<Pattern>> {
        let mut patterns: Vec<_> = self
            .registry
            .get_patterns(None)
            .into_iter()
            .filter(|p| options.allows(p.category()))
            .collect();
        patterns.sort_by_key(|p| Reverse(p.priority()));
        patterns
    }

    /// Sanitize `content`, recording every alias in `session`.
    ///
    /// Each pattern runs against the text as left by the patterns before it,
    /// so a higher-priority detector claims overlapping text first. A pattern
    /// whose evaluation is abandoned contributes nothing and is listed in
    /// [`SanitizationResult::skipped_patterns`]; the call itself still
    /// succeeds. The only error is a session that has been disposed.
    ///
    /// Alias-shaped tokens already in `content` are reserved in the session,
    /// and the ones that are bound aliases are reported in
    /// [`SanitizationResult::ambiguous_aliases`].
    pub fn sanitize(
        &self,
        content: &str,
        options: &SanitizationOptions,
        session: &MappingSession,
    ) -> Result<SanitizationResult> {
        if content.is_empty() {
            return Ok(SanitizationResult::unchanged(content));
        }

        let ambiguous_aliases = session.reserve_literals(alias_tokens(content))?;
        if !ambiguous_aliases.is_empty() {
            tracing::warn!(
                count = ambiguous_aliases.len(),
                "Input already contains aliases of this session; desanitize will restore them"
            );
        }

        let mut working = content.to_string();
        let mut inserted = InsertedAliases::default();
        let mut matches = Vec::new();
        let mut skipped_patterns = Vec::new();

        for pattern in self.active_patterns(options) {
            let spans = match pattern.find_spans(&working) {
                Ok(spans) => spans,
                Err(PatternError::Timeout { limit, .. }) => {
                    tracing::warn!(
                        pattern = pattern.name(),
                        ?limit,
                        "Pattern evaluation timed out; its matches were skipped"
                    );
                    skipped_patterns.push(pattern.name().to_string());
                    continue;
                }
                Err(PatternError::Compile(err)) => {
                    tracing::error!(pattern = pattern.name(), error = %err, "Pattern is unusable");
                    skipped_patterns.push(pattern.name().to_string());
                    continue;
                }
            };

            let mut replacements: Vec<(Span, String)> = Vec::new();
            let mut limit = working.len();

            // Resolve right to left, so the text after each span is final.
            for span in spans.into_iter().rev() {
                // Text already claimed by a higher-priority pattern.
                if inserted.overlaps(span) {
                    continue;
                }

                let digits = digit_run(&working, span.end, limit);
                let (span, alias) = match self.resolve(&working, span, digits, &pattern, session)? {
                    Some(resolved) => resolved,
                    None => continue,
                };

                matches.push(SanitizationMatch {
                    original: working[span.start..span.end].to_string(),
                    alias: alias.clone(),
                    category: pattern.category(),
                    pattern_name: pattern.name().to_string(),
                    start_index: span.start,
                    length: span.len(),
                });
                limit = span.start;
                replacements.push((span, alias));
            }

            if replacements.is_empty() {
                continue;
            }
            replacements.reverse();
            working = splice(&working, &replacements);
            inserted.apply(&replacements);

            tracing::debug!(
                pattern = pattern.name(),
                category = %pattern.category(),
                count = replacements.len(),
                "Replaced matches"
            );
        }

        Ok(SanitizationResult {
            sanitized_content: working,
            was_sanitized: !matches.is_empty(),
            matches,
            skipped_patterns,
            ambiguous_aliases,
        })
    }

    /// Alias for the text at `span`, which the working text follows with the
    /// ASCII digits `digits`. If the alias already bound to that text would
    /// read as another alias in front of the digits, the span grows to take
    /// them in. `None` when the text is itself an alias of the session.
    fn resolve(
        &self,
        working: &str,
        span: Span,
        digits: Span,
        pattern: &Pattern,
        session: &MappingSession,
    ) -> Result<Option<(Span, String)>> {
        let original = &working[span.start..span.end];
        // Already an alias from this session (e.g. re-sanitizing output).
        if session.contains_alias(original) {
            return Ok(None);
        }

        let following = &working[digits.start..digits.end];
        if let Some(alias) = session.resolve_alias_before(original, pattern.category(), following)? {
            return Ok(Some((span, alias)));
        }

        let span = Span {
            start: span.start,
            end: digits.end,
        };
        let original = &working[span.start..span.end];
        if session.contains_alias(original) {
            return Ok(None);
        }
        tracing::debug!(
            pattern = pattern.name(),
            digits = digits.len(),
            "Took trailing digits into the match"
        );
        let alias = session.resolve_alias(original, pattern.category())?;
        Ok(Some((span, alias)))
    }
}

/// ASCII digits starting at `from`, stopping at `limit`
fn digit_run(text: &str, from: usize, limit: usize) -> Span {
    let len = text.as_bytes()[from..limit]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    Span {
        start: from,
        end: from + len,
    }
}

/// `text` with each span replaced; `replacements` are ascending and disjoint.
fn splice(text: &str, replacements: &[(Span, String)]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (span, alias) in replacements {
        out.push_str(&text[last..span.start]);
        out.push_str(alias);
        last = span.end;
    }
    out.push_str(&text[last..]);
    out
}

/// Byte ranges of aliases written into the working text during one call,
/// sorted and disjoint, kept in step with later replacements.
#[derive(Debug, Default)]
struct InsertedAliases {
    ranges: Vec<Span>,
}

impl InsertedAliases {
    fn overlaps(&self, span: Span) -> bool {
        let i = self.ranges.partition_point(|r| r.end <= span.start);
        self.ranges.get(i).is_some_and(|r| r.start < span.end)
    }

    /// Record `replacements` (ascending, none overlapping a recorded range)
    /// and move every range to its offset in the spliced text.
    fn apply(&mut self, replacements: &[(Span, String)]) {
        let mut ranges = Vec::with_capacity(self.ranges.len() + replacements.len());
        let mut old = self.ranges.iter().copied().peekable();
        let (mut removed, mut added) = (0usize, 0usize);
        let shift = |r: Span, removed: usize, added: usize| Span {
            start: r.start - removed + added,
            end: r.end - removed + added,
        };

        for (span, alias) in replacements {
            while let Some(r) = old.next_if(|r| r.end <= span.start) {
                ranges.push(shift(r, removed, added));
            }
            let start = span.start - removed + added;
            ranges.push(Span {
                start,
                end: start + alias.len(),
            });
            removed += span.len();
            added += alias.len();
        }
        ranges.extend(old.map(|r| shift(r, removed, added)));
        self.ranges = ranges;
    }
}
