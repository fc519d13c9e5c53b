//! Session-scoped alias <-> original store

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use time::OffsetDateTime;
use veil_core::{Category, Error, Result};
use zeroize::Zeroize;

use crate::alias::{AliasGenerator, MAX_COUNTER_DIGITS};

/// Lifetime given to sessions created with [`MappingSession::new`]
pub const DEFAULT_SESSION_DURATION: Duration = Duration::from_secs(60 * 60);

struct SessionState {
    alias_to_original: HashMap<String, String>,
    original_to_alias: HashMap<String, String>,
    generator: AliasGenerator,
    /// Alias-shaped text seen in input or written before a digit; never minted
    reserved: HashSet<String>,
    expires_at: OffsetDateTime,
    disposed: bool,
}

impl SessionState {
    fn ensure_active(&self) -> Result<()> {
        if self.disposed {
            return Err(Error::SessionDisposed);
        }
        Ok(())
    }

    fn insert(&mut self, original: String, alias: String) {
        self.original_to_alias.insert(original.clone(), alias.clone());
        self.alias_to_original.insert(alias, original);
    }

    /// True if `alias` followed by a prefix of `digits` spells a bound alias
    fn spells_bound_alias(&self, alias: &str, digits: &str) -> bool {
        (1..=digits.len().min(MAX_COUNTER_DIGITS))
            .any(|k| self.alias_to_original.contains_key(&format!("{}{}", alias, &digits[..k])))
    }

    /// `alias` is about to sit in front of `digits`: whatever that spells
    /// can no longer be handed out.
    fn reserve_followers(&mut self, alias: &str, digits: &str) {
        for k in 1..=digits.len().min(MAX_COUNTER_DIGITS) {
            self.reserved.insert(format!("{}{}", alias, &digits[..k]));
        }
    }

    fn mint(&mut self, original: &str, category: Category, digits: &str) -> String {
        let alias = loop {
            let candidate = self.generator.generate(category);
            let usable = !self.alias_to_original.contains_key(&candidate)
                && !self.reserved.contains(&candidate)
                && !self.spells_bound_alias(&candidate, digits);
            if usable {
                break candidate;
            }
        };
        self.insert(original.to_string(), alias.clone());
        alias
    }

    /// Overwrite every stored string before releasing it
    fn wipe(&mut self) -> usize {
        let count = self.alias_to_original.len();
        for (mut alias, mut original) in self.alias_to_original.drain() {
            alias.zeroize();
            original.zeroize();
        }
        for (mut original, mut alias) in self.original_to_alias.drain() {
            original.zeroize();
            alias.zeroize();
        }
        count
    }
}

/// Bidirectional, time-bounded mapping between aliases and the values they
/// stand for.
///
/// Every operation runs under one mutex. The session owns the
/// [`AliasGenerator`] used to mint aliases, so [`MappingSession::resolve_alias`]
/// looks up and registers in a single critical section: concurrent sanitize
/// calls sharing a session can never bind one original to two aliases.
///
/// `expires_at` is advisory. Nothing is evicted when it passes; callers check
/// [`MappingSession::is_expired`] themselves.
pub struct MappingSession {
    id: String,
    created_at: OffsetDateTime,
    state: Mutex<SessionState>,
}

impl MappingSession {
    pub fn new() -> Self {
        Self::with_duration(DEFAULT_SESSION_DURATION)
    }

    pub fn with_duration(duration: Duration) -> Self {
        let created_at = OffsetDateTime::now_utc();
        let session = Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at,
            state: Mutex::new(SessionState {
                alias_to_original: HashMap::new(),
                original_to_alias: HashMap::new(),
                generator: AliasGenerator::new(),
                reserved: HashSet::new(),
                expires_at: add_saturating(created_at, duration),
                disposed: false,
            }),
        };
        tracing::debug!(session = %session.id, ?duration, "Created mapping session");
        session
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    pub fn expires_at(&self) -> OffsetDateTime {
        self.lock().expires_at
    }

    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() >= self.expires_at()
    }

    /// Time left before `expires_at`, zero once it has passed
    pub fn remaining(&self) -> Duration {
        (self.expires_at() - OffsetDateTime::now_utc())
            .try_into()
            .unwrap_or(Duration::ZERO)
    }

    /// Record `original <-> alias`.
    ///
    /// Idempotent by original: if `original` already has an alias the call
    /// changes nothing. An alias that is already bound to some other value is
    /// rejected with [`Error::AliasConflict`].
    pub fn add_mapping(&self, original: &str, alias: &str, category: Category) -> Result<()> {
        if original.is_empty() || alias.is_empty() {
            return Err(Error::InvalidArgument(
                "original and alias must not be empty".to_string(),
            ));
        }

        let mut state = self.lock();
        state.ensure_active()?;

        if state.original_to_alias.contains_key(original) {
            return Ok(());
        }
        if state.alias_to_original.contains_key(alias) {
            return Err(Error::AliasConflict(alias.to_string()));
        }

        state.insert(original.to_string(), alias.to_string());
        tracing::debug!(session = %self.id, %alias, %category, "Added mapping");
        Ok(())
    }

    /// Alias for `original`, minting and registering one if needed.
    ///
    /// Minted aliases skip names that are already taken, e.g. ones preloaded
    /// through [`MappingSession::add_mapping`], and names reserved by
    /// [`MappingSession::reserve_literals`].
    pub fn resolve_alias(&self, original: &str, category: Category) -> Result<String> {
        if original.is_empty() {
            return Err(Error::InvalidArgument("original must not be empty".to_string()));
        }

        let mut state = self.lock();
        state.ensure_active()?;

        if let Some(alias) = state.original_to_alias.get(original) {
            return Ok(alias.clone());
        }
        Ok(state.mint(original, category, ""))
    }

    /// Alias for `original` that will be written directly in front of the
    /// ASCII digit run `following_digits`.
    ///
    /// Aliases end in digits, so the written text must not read as a longer
    /// alias. A new alias is minted so that it doesn't; the texts it forms with
    /// the digits are reserved so no later alias takes them. If `original`
    /// already has an alias that would run into another one, `None` is
    /// returned and the caller has to replace the digits along with it.
    pub fn resolve_alias_before(
        &self,
        original: &str,
        category: Category,
        following_digits: &str,
    ) -> Result<Option<String>> {
        if original.is_empty() {
            return Err(Error::InvalidArgument("original must not be empty".to_string()));
        }
        debug_assert!(following_digits.bytes().all(|b| b.is_ascii_digit()));

        let mut state = self.lock();
        state.ensure_active()?;

        let alias = match state.original_to_alias.get(original).cloned() {
            Some(alias) if state.spells_bound_alias(&alias, following_digits) => return Ok(None),
            Some(alias) => alias,
            None => state.mint(original, category, following_digits),
        };
        state.reserve_followers(&alias, following_digits);
        Ok(Some(alias))
    }

    /// Mark alias-shaped `tokens` found in input text as unavailable for
    /// minting. Returns, sorted, the ones that already name an alias of this
    /// session: desanitize will replace those with their originals.
    pub fn reserve_literals(&self, tokens: impl IntoIterator<Item = String>) -> Result<Vec<String>> {
        let mut state = self.lock();
        state.ensure_active()?;

        let mut bound = Vec::new();
        for token in tokens {
            if state.alias_to_original.contains_key(&token) {
                bound.push(token.clone());
            }
            state.reserved.insert(token);
        }
        bound.sort();
        Ok(bound)
    }

    pub fn get_original(&self, alias: &str) -> Option<String> {
        self.lock().alias_to_original.get(alias).cloned()
    }

    pub fn get_alias(&self, original: &str) -> Option<String> {
        self.lock().original_to_alias.get(original).cloned()
    }

    pub fn contains_alias(&self, alias: &str) -> bool {
        self.lock().alias_to_original.contains_key(alias)
    }

    /// Copy of every alias -> original pair
    pub fn get_all_mappings(&self) -> HashMap<String, String> {
        self.lock().alias_to_original.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().alias_to_original.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().alias_to_original.is_empty()
    }

    /// Zero and drop every mapping. Alias counters and reservations are kept,
    /// so aliases handed out before the clear are never reissued.
    pub fn clear(&self) {
        let count = self.lock().wipe();
        tracing::debug!(session = %self.id, count, "Cleared mapping session");
    }

    /// Push `expires_at` forward by `duration`; returns the new expiry
    pub fn extend(&self, duration: Duration) -> Result<OffsetDateTime> {
        let mut state = self.lock();
        state.ensure_active()?;
        state.expires_at = add_saturating(state.expires_at, duration);
        Ok(state.expires_at)
    }

    /// Clear and retire the session. Further mutations fail with
    /// [`Error::SessionDisposed`]; reads see an empty session.
    pub fn dispose(&self) {
        let mut state = self.lock();
        let count = state.wipe();
        for mut token in std::mem::take(&mut state.reserved) {
            token.zeroize();
        }
        state.disposed = true;
        tracing::debug!(session = %self.id, count, "Disposed mapping session");
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }
}

impl Default for MappingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MappingSession {
    fn drop(&mut self) {
        self.state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .wipe();
    }
}

impl fmt::Debug for MappingSession {
    // Never print mapped values.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("MappingSession")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("expires_at", &state.expires_at)
            .field("mappings", &state.alias_to_original.len())
            .field("reserved", &state.reserved.len())
            .field("disposed", &state.disposed)
            .finish()
    }
}

fn add_saturating(at: OffsetDateTime, duration: Duration) -> OffsetDateTime {
    let duration = time::Duration::try_from(duration).unwrap_or(time::Duration::MAX);
    at.saturating_add(duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_add_and_lookup() {
        let session = MappingSession::new();
        session
            .add_mapping("ProductionDB", "DATABASE_0", Category::Database)
            .unwrap();

        assert_eq!(session.get_original("DATABASE_0").as_deref(), Some("ProductionDB"));
        assert_eq!(session.get_alias("ProductionDB").as_deref(), Some("DATABASE_0"));
        assert!(session.get_original("DATABASE_1").is_none());
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn test_add_mapping_is_idempotent_by_original() {
        let session = MappingSession::new();
        session.add_mapping("x", "CUSTOM_0", Category::Custom).unwrap();
        session.add_mapping("x", "CUSTOM_9", Category::Custom).unwrap();

        assert_eq!(session.get_alias("x").as_deref(), Some("CUSTOM_0"));
        assert!(session.get_original("CUSTOM_9").is_none());
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn test_add_mapping_rejects_alias_conflict() {
        let session = MappingSession::new();
        session.add_mapping("a", "CUSTOM_0", Category::Custom).unwrap();

        let err = session.add_mapping("b", "CUSTOM_0", Category::Custom).unwrap_err();
        assert!(matches!(err, Error::AliasConflict(alias) if alias == "CUSTOM_0"));
        assert_eq!(session.get_original("CUSTOM_0").as_deref(), Some("a"));
    }

    #[test]
    fn test_add_mapping_rejects_empty_values() {
        let session = MappingSession::new();
        assert!(matches!(
            session.add_mapping("", "CUSTOM_0", Category::Custom),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_resolve_alias_reuses_and_mints() {
        let session = MappingSession::new();

        let first = session.resolve_alias("ProductionDB", Category::Database).unwrap();
        let again = session.resolve_alias("ProductionDB", Category::Database).unwrap();
        let other = session.resolve_alias("StagingDB", Category::Database).unwrap();

        assert_eq!(first, "DATABASE_0");
        assert_eq!(again, "DATABASE_0");
        assert_eq!(other, "DATABASE_1");
    }

    #[test]
    fn test_resolve_alias_skips_preloaded_aliases() {
        let session = MappingSession::new();
        session
            .add_mapping("ProductionDB", "DATABASE_0", Category::Database)
            .unwrap();

        let alias = session.resolve_alias("StagingDB", Category::Database).unwrap();
        assert_eq!(alias, "DATABASE_1");
    }

    #[test]
    fn test_reserved_literals_are_never_minted() {
        let session = MappingSession::new();
        let tokens = ["DATABASE_0", "DATABASE_1", "DATABASE_3"].map(String::from);

        let bound = session.reserve_literals(tokens).unwrap();
        assert!(bound.is_empty());

        let alias = session.resolve_alias("ProductionDB", Category::Database).unwrap();
        assert_eq!(alias, "DATABASE_2");

        // Reservations outlive a clear.
        session.clear();
        let alias = session.resolve_alias("StagingDB", Category::Database).unwrap();
        assert_eq!(alias, "DATABASE_4");
    }

    #[test]
    fn test_reserve_literals_reports_bound_aliases() {
        let session = MappingSession::new();
        session.resolve_alias("ProductionDB", Category::Database).unwrap();
        session.resolve_alias("hunter22", Category::Password).unwrap();

        let tokens = ["PASSWORD_0", "DATABASE_0", "DATABASE_7"].map(String::from);
        let bound = session.reserve_literals(tokens).unwrap();

        assert_eq!(bound, vec!["DATABASE_0", "PASSWORD_0"]);
        // Reporting leaves the mapping alone.
        assert_eq!(session.get_original("DATABASE_0").as_deref(), Some("ProductionDB"));
    }

    #[test]
    fn test_resolve_before_digits_skips_aliases_it_would_spell() {
        let session = MappingSession::new();
        session.resolve_alias("z", Category::Custom).unwrap();
        session.add_mapping("q", "CUSTOM_10", Category::Custom).unwrap();

        // CUSTOM_1 + "0" would read as CUSTOM_10.
        let alias = session.resolve_alias_before("a", Category::Custom, "0").unwrap();
        assert_eq!(alias.as_deref(), Some("CUSTOM_2"));
    }

    #[test]
    fn test_resolve_before_digits_reserves_what_it_spells() {
        let session = MappingSession::new();
        session.resolve_alias("z", Category::Custom).unwrap();

        // Written as "CUSTOM_10", so CUSTOM_10 must never be minted.
        let alias = session.resolve_alias_before("a", Category::Custom, "0").unwrap();
        assert_eq!(alias.as_deref(), Some("CUSTOM_1"));

        let later: Vec<_> = (0..9)
            .map(|i| session.resolve_alias(&format!("v{}", i), Category::Custom).unwrap())
            .collect();
        assert_eq!(later.last().map(String::as_str), Some("CUSTOM_11"));
        assert!(!later.iter().any(|a| a == "CUSTOM_10"));
    }

    #[test]
    fn test_resolve_before_digits_refuses_conflicting_existing_alias() {
        let session = MappingSession::new();
        session.add_mapping("a", "CUSTOM_1", Category::Custom).unwrap();
        session.add_mapping("q", "CUSTOM_10", Category::Custom).unwrap();

        let alias = session.resolve_alias_before("a", Category::Custom, "05").unwrap();
        assert!(alias.is_none());

        let alias = session.resolve_alias_before("a", Category::Custom, "2").unwrap();
        assert_eq!(alias.as_deref(), Some("CUSTOM_1"));
        // Without digits there is nothing to run into.
        let alias = session.resolve_alias_before("a", Category::Custom, "").unwrap();
        assert_eq!(alias.as_deref(), Some("CUSTOM_1"));
    }

    #[test]
    fn test_get_all_mappings_is_a_copy() {
        let session = MappingSession::new();
        session.resolve_alias("a", Category::Custom).unwrap();

        let mut copy = session.get_all_mappings();
        copy.clear();

        assert_eq!(session.get_all_mappings().len(), 1);
    }

    #[test]
    fn test_clear_wipes_state_but_keeps_counters() {
        let session = MappingSession::new();
        let alias = session.resolve_alias("secret", Category::Password).unwrap();

        session.clear();

        assert!(session.get_all_mappings().is_empty());
        assert!(session.get_original(&alias).is_none());
        assert!(session.get_alias("secret").is_none());

        // Still usable, and the old alias is not reissued.
        let next = session.resolve_alias("secret", Category::Password).unwrap();
        assert_eq!(next, "PASSWORD_1");
    }

    #[test]
    fn test_extend_never_shrinks() {
        let session = MappingSession::with_duration(Duration::from_secs(60));
        let before = session.expires_at();

        let after = session.extend(Duration::from_secs(120)).unwrap();
        assert!(after > before);
        assert_eq!(session.expires_at(), after);

        let unchanged = session.extend(Duration::ZERO).unwrap();
        assert_eq!(unchanged, after);
    }

    #[test]
    fn test_expiry_is_advisory() {
        let session = MappingSession::with_duration(Duration::ZERO);
        assert!(session.is_expired());
        assert_eq!(session.remaining(), Duration::ZERO);

        // Expired sessions keep working.
        session.resolve_alias("x", Category::Custom).unwrap();
        assert_eq!(session.get_original("CUSTOM_0").as_deref(), Some("x"));

        let fresh = MappingSession::new();
        assert!(!fresh.is_expired());
        assert!(fresh.remaining() > Duration::from_secs(60 * 59));
    }

    #[test]
    fn test_dispose_is_terminal() {
        let session = MappingSession::new();
        session.resolve_alias("x", Category::Custom).unwrap();

        session.dispose();

        assert!(session.is_disposed());
        assert!(session.is_empty());
        assert!(matches!(
            session.resolve_alias("y", Category::Custom),
            Err(Error::SessionDisposed)
        ));
        assert!(matches!(
            session.add_mapping("y", "CUSTOM_5", Category::Custom),
            Err(Error::SessionDisposed)
        ));
        assert!(matches!(session.extend(Duration::from_secs(1)), Err(Error::SessionDisposed)));
        assert!(matches!(
            session.reserve_literals(["CUSTOM_0".to_string()]),
            Err(Error::SessionDisposed)
        ));
    }

    #[test]
    fn test_debug_does_not_leak_values() {
        let session = MappingSession::new();
        session.resolve_alias("hunter22", Category::Password).unwrap();

        let debug = format!("{:?}", session);
        assert!(!debug.contains("hunter22"));
        assert!(debug.contains("mappings: 1"));
    }

    #[test]
    fn test_concurrent_resolution_keeps_bijection() {
        let session = Arc::new(MappingSession::new());
        let originals: Vec<String> = (0..20).map(|i| format!("host-{}", i)).collect();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let session = Arc::clone(&session);
                let originals = originals.clone();
                std::thread::spawn(move || {
                    originals
                        .iter()
                        .map(|o| session.resolve_alias(o, Category::Hostname).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let results: Vec<Vec<String>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        // Every thread saw the same alias for each original.
        for result in &results[1..] {
            assert_eq!(result, &results[0]);
        }

        let mappings = session.get_all_mappings();
        assert_eq!(mappings.len(), originals.len());
        let distinct: HashSet<_> = mappings.values().collect();
        assert_eq!(distinct.len(), originals.len());
        for (alias, original) in &mappings {
            assert_eq!(session.get_alias(original).as_ref(), Some(alias));
        }
    }
}
