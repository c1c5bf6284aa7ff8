//! Replay protection for lock issuance.
//!
//! Tracks request ids that currently hold a live token, keyed by id and
//! expiring with the token. In-memory only; the index is empty after a restart.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

const MAX_ENTRIES: usize = 10_000;

pub struct IssuedTokenIndex {
    issued: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl Default for IssuedTokenIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl IssuedTokenIndex {
    pub fn new() -> Self {
        Self {
            issued: Mutex::new(HashMap::new()),
        }
    }

    /// `true` if `request_id` was issued a token that is still live at `now`.
    pub fn holds_live_token(&self, request_id: &str, now: DateTime<Utc>) -> bool {
        let issued = self
            .issued
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        issued
            .get(request_id)
            .is_some_and(|expires_at| now < *expires_at)
    }

    /// Atomically record a freshly issued token.
    ///
    /// Returns `true` if recorded, `false` if another live token already
    /// exists for the same id (the caller lost a race and must not hand out
    /// its token).
    pub fn try_record(
        &self,
        request_id: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> bool {
        let mut issued = self
            .issued
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if issued.len() > MAX_ENTRIES {
            issued.retain(|_, exp| now < *exp);
        }
        if let Some(existing) = issued.get(request_id)
            && now < *existing
        {
            return false;
        }
        issued.insert(request_id.to_string(), expires_at);
        true
    }

    pub fn len(&self) -> usize {
        self.issued
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for IssuedTokenIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedTokenIndex")
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn new_request_id_is_recorded() {
        let index = IssuedTokenIndex::new();
        assert!(!index.holds_live_token("r1", t0()));
        assert!(index.try_record("r1", t0() + Duration::seconds(60), t0()));
        assert!(index.holds_live_token("r1", t0()));
    }

    #[test]
    fn duplicate_live_id_is_refused() {
        let index = IssuedTokenIndex::new();
        assert!(index.try_record("r1", t0() + Duration::seconds(60), t0()));
        assert!(!index.try_record("r1", t0() + Duration::seconds(120), t0()));
    }

    #[test]
    fn id_is_reusable_after_expiry() {
        let index = IssuedTokenIndex::new();
        let later = t0() + Duration::seconds(60);
        assert!(index.try_record("r1", later, t0()));
        assert!(!index.holds_live_token("r1", later));
        assert!(index.try_record("r1", later + Duration::seconds(60), later));
    }

    #[test]
    fn expired_entries_are_dropped_once_index_overflows() {
        let index = IssuedTokenIndex::new();
        for i in 0..=MAX_ENTRIES {
            index.try_record(&format!("old-{i}"), t0() + Duration::seconds(10), t0());
        }
        index.try_record("live", t0() + Duration::seconds(100), t0());
        assert_eq!(index.len(), MAX_ENTRIES + 2);

        let later = t0() + Duration::seconds(50);
        assert!(index.try_record("fresh", later + Duration::seconds(60), later));
        assert_eq!(index.len(), 2);
        assert!(index.holds_live_token("live", later));
    }

    #[test]
    fn concurrent_records_admit_exactly_one() {
        let index = Arc::new(IssuedTokenIndex::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let index = Arc::clone(&index);
                std::thread::spawn(move || {
                    index.try_record("shared", t0() + Duration::seconds(60), t0())
                })
            })
            .collect();
        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(admitted, 1);
    }
}
