//! Named, prioritized detectors

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use regex::{Regex, RegexBuilder};

use crate::category::Category;
use crate::error::{Error, PatternError, Result};

/// Evaluation budget applied to every pattern unless overridden
pub const DEFAULT_MATCH_TIMEOUT: Duration = Duration::from_millis(100);

/// Upper bound on the compiled program, rejects pathological sources up front
const COMPILED_SIZE_LIMIT: usize = 2 * (1 << 20);

/// Capture group that narrows a match to the sensitive part
/// (e.g. only the value of `password = hunter22`).
pub const VALUE_GROUP: &str = "value";

/// Bytes searched between two deadline checks
pub const SEARCH_WINDOW: usize = 64 * 1024;

/// How far a window reaches back into its predecessor when it found nothing
pub const WINDOW_OVERLAP: usize = 16 * 1024;

/// Byte range of a detected value inside the scanned text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A detector: regex source tagged with a category and a priority.
///
/// The matcher is compiled on first use and cached for the lifetime of the
/// pattern. A malformed source therefore surfaces as
/// [`Error::InvalidPattern`] from [`Pattern::compile`], not from `new`.
#[derive(Debug, Clone)]
pub struct Pattern {
    name: String,
    source: String,
    category: Category,
    priority: i32,
    enabled: bool,
    timeout: Duration,
    compiled: OnceLock<Regex>,
}

impl Pattern {
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        category: Category,
    ) -> Result<Self> {
        let name = name.into();
        let source = source.into();

        if name.trim().is_empty() {
            return Err(Error::InvalidArgument("pattern name must not be empty".to_string()));
        }
        if source.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "pattern '{}' has an empty regex source",
                name
            )));
        }

        Ok(Self {
            name,
            source,
            category,
            priority: 0,
            enabled: true,
            timeout: DEFAULT_MATCH_TIMEOUT,
            compiled: OnceLock::new(),
        })
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Compile (once) and return the cached matcher
    pub fn compile(&self) -> Result<&Regex> {
        if let Some(regex) = self.compiled.get() {
            return Ok(regex);
        }

        let regex = RegexBuilder::new(&self.source)
            .case_insensitive(false)
            .size_limit(COMPILED_SIZE_LIMIT)
            .dfa_size_limit(COMPILED_SIZE_LIMIT)
            .build()
            .map_err(|error| Error::InvalidPattern {
                source_pattern: self.source.clone(),
                error,
            })?;

        // A concurrent caller may have won the race; either copy is equivalent.
        Ok(self.compiled.get_or_init(|| regex))
    }

    /// Whether the pattern occurs anywhere in `text`
    pub fn matches(&self, text: &str) -> Result<bool> {
        if text.is_empty() {
            return Ok(false);
        }
        Ok(self.compile()?.is_match(text))
    }

    /// All non-overlapping spans, left to right.
    ///
    /// The text is searched in windows of [`SEARCH_WINDOW`] bytes and the
    /// deadline is checked before every search, so a long stretch without
    /// matches is bounded as well as a long run of them. Once the deadline passes
    /// the whole evaluation is abandoned with [`PatternError::Timeout`]
    /// rather than returning a partial list.
    ///
    /// A match is only accepted when it ends inside its window (or at the end
    /// of the text), so boundary assertions never fire on a window edge.
    /// A window that finds nothing hands over to the next one
    /// [`WINDOW_OVERLAP`] bytes before its edge, so a match is only missed
    /// if it is longer than that and starts in such a window.
    pub fn find_spans(&self, text: &str) -> std::result::Result<Vec<Span>, PatternError> {
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let regex = self.compile()?;
        let deadline = Instant::now() + self.timeout;
        let narrow = regex.capture_names().any(|n| n == Some(VALUE_GROUP));
        let mut spans = Vec::new();
        let mut pos = 0;
        let mut window = SEARCH_WINDOW;

        while pos < text.len() {
            self.check_deadline(deadline)?;

            let end = floor_char_boundary(text, pos.saturating_add(window).min(text.len()));
            let at_end = end == text.len();

            match search_at(regex, &text[..end], pos, narrow) {
                Some((whole, target)) if whole.end < end || at_end => {
                    if !target.is_empty() {
                        spans.push(target);
                    }
                    pos = if whole.is_empty() {
                        next_char_boundary(text, whole.end)
                    } else {
                        whole.end
                    };
                    window = SEARCH_WINDOW;
                }
                // Ran into the window edge: look again from where it starts.
                Some((whole, _)) if whole.start > pos => pos = whole.start,
                // One match as long as the window: widen it.
                Some(_) => window = window.saturating_mul(2),
                None if at_end => break,
                None => {
                    let back = floor_char_boundary(text, end - WINDOW_OVERLAP);
                    if back > pos {
                        pos = back;
                        window = SEARCH_WINDOW;
                    } else {
                        window = window.saturating_mul(2);
                    }
                }
            }
        }

        Ok(spans)
    }

    fn check_deadline(&self, deadline: Instant) -> std::result::Result<(), PatternError> {
        if Instant::now() >= deadline {
            return Err(PatternError::Timeout {
                pattern: self.name.clone(),
                limit: self.timeout,
            });
        }
        Ok(())
    }
}

/// First match at or after `start`: the whole match and the part to replace
fn search_at(regex: &Regex, haystack: &str, start: usize, narrow: bool) -> Option<(Span, Span)> {
    if narrow {
        let caps = regex.captures_at(haystack, start)?;
        let whole = caps.get(0)?;
        let target = caps.name(VALUE_GROUP).unwrap_or(whole);
        Some((
            Span { start: whole.start(), end: whole.end() },
            Span { start: target.start(), end: target.end() },
        ))
    } else {
        let m = regex.find_at(haystack, start)?;
        let span = Span { start: m.start(), end: m.end() };
        Some((span, span))
    }
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Smallest char boundary strictly after `index`
fn next_char_boundary(text: &str, index: usize) -> usize {
    let mut next = index + 1;
    while next < text.len() && !text.is_char_boundary(next) {
        next += 1;
    }
    next.min(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_name_and_source() {
        assert!(matches!(
            Pattern::new("", r"\d+", Category::Custom),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            Pattern::new("digits", "", Category::Custom),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_invalid_regex_fails_at_compile_not_construction() {
        let pattern = Pattern::new("broken", r"(unclosed", Category::Custom).unwrap();

        match pattern.compile() {
            Err(Error::InvalidPattern { source_pattern, .. }) => {
                assert_eq!(source_pattern, "(unclosed");
            }
            other => panic!("expected InvalidPattern, got {:?}", other),
        }
        assert!(pattern.matches("anything").is_err());
    }

    #[test]
    fn test_builder_defaults() {
        let pattern = Pattern::new("digits", r"\d+", Category::Custom).unwrap();
        assert_eq!(pattern.priority(), 0);
        assert!(pattern.is_enabled());
        assert_eq!(pattern.timeout(), DEFAULT_MATCH_TIMEOUT);

        let pattern = pattern.with_priority(42).with_enabled(false);
        assert_eq!(pattern.priority(), 42);
        assert!(!pattern.is_enabled());
    }

    #[test]
    fn test_case_sensitive_by_default() {
        let pattern = Pattern::new("db", r"ProdDB", Category::Database).unwrap();
        assert!(pattern.matches("use ProdDB").unwrap());
        assert!(!pattern.matches("use proddb").unwrap());
    }

    #[test]
    fn test_empty_input_never_matches() {
        // Even a pattern that can never compile reports no match for empty text.
        let broken = Pattern::new("broken", r"(", Category::Custom).unwrap();
        assert!(!broken.matches("").unwrap());
        assert!(broken.find_spans("").unwrap().is_empty());
    }

    #[test]
    fn test_compiled_matcher_is_cached() {
        let pattern = Pattern::new("digits", r"\d+", Category::Custom).unwrap();
        let first = pattern.compile().unwrap() as *const Regex;
        let second = pattern.compile().unwrap() as *const Regex;
        assert_eq!(first, second);
    }

    #[test]
    fn test_value_group_narrows_span() {
        let pattern = Pattern::new(
            "password",
            r"password\s*=\s*(?P<value>\S+)",
            Category::Password,
        )
        .unwrap();

        let text = "password = hunter22";
        let spans = pattern.find_spans(text).unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(&text[spans[0].start..spans[0].end], "hunter22");
    }

    #[test]
    fn test_zero_timeout_abandons_evaluation() {
        let pattern = Pattern::new("digits", r"\d", Category::Custom)
            .unwrap()
            .with_timeout(Duration::ZERO);

        match pattern.find_spans("1 2 3") {
            Err(PatternError::Timeout { pattern, .. }) => assert_eq!(pattern, "digits"),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_long_match_free_input_times_out() {
        let pattern = Pattern::new(
            "internal_hostname",
            r"(?i)\b(?:[a-z0-9](?:[a-z0-9\-]{0,61}[a-z0-9])?\.)+(?:internal|local|corp|lan|intranet)\b",
            Category::Hostname,
        )
        .unwrap()
        .with_timeout(Duration::from_millis(1));
        let input = "ж".repeat(3_000_000);

        let start = Instant::now();
        let result = pattern.find_spans(&input);
        let elapsed = start.elapsed();

        assert!(matches!(result, Err(PatternError::Timeout { .. })));
        assert!(elapsed < Duration::from_millis(500), "took {:?}", elapsed);
    }

    #[test]
    fn test_windowed_search_matches_full_scan() {
        let pattern = Pattern::new("ip", r"\b10\.0\.\d{1,3}\.\d{1,3}\b", Category::IpAddress)
            .unwrap()
            .with_timeout(Duration::from_secs(30));
        // Several windows worth, with matches straddling every window edge.
        let text: String = (0..20_000)
            .map(|i| format!("node ж{} at 10.0.{}.{};\n", i, i % 256, i % 199))
            .collect();
        assert!(text.len() > 4 * SEARCH_WINDOW);

        let expected: Vec<Span> = pattern
            .compile()
            .unwrap()
            .find_iter(&text)
            .map(|m| Span { start: m.start(), end: m.end() })
            .collect();

        assert_eq!(pattern.find_spans(&text).unwrap(), expected);
    }

    #[test]
    fn test_gap_longer_than_window() {
        let pattern = Pattern::new("db", r"\bOrdersDB\b", Category::Database)
            .unwrap()
            .with_timeout(Duration::from_secs(30));
        let text = format!("OrdersDB{}OrdersDB", " ".repeat(3 * SEARCH_WINDOW));

        let spans = pattern.find_spans(&text).unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[1].end, text.len());
    }

    #[test]
    fn test_match_longer_than_window_is_found_whole() {
        let pattern = Pattern::new("run", r"\ba+\b", Category::Custom)
            .unwrap()
            .with_timeout(Duration::from_secs(30));
        let text = format!("x {} y", "a".repeat(2 * SEARCH_WINDOW));

        let spans = pattern.find_spans(&text).unwrap();
        assert_eq!(spans, vec![Span { start: 2, end: text.len() - 2 }]);
    }

    #[test]
    fn test_pathological_input_stays_within_budget() {
        let pattern = Pattern::new("nested", r"(a+)+$", Category::Custom).unwrap();
        let input = format!("{}!", "a".repeat(50_000));

        let start = Instant::now();
        let result = pattern.find_spans(&input);
        let elapsed = start.elapsed();

        assert!(result.is_ok());
        assert!(elapsed < Duration::from_secs(2), "took {:?}", elapsed);
    }
}
