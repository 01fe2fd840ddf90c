//! People directory cache
//!
//! `listPeople` returns the whole directory, so user searches are served
//! from one cached snapshot that expires five minutes after it was fetched.
//! The snapshot is only ever replaced wholesale. Two searches racing on an
//! empty cache may both fetch; the last one to finish wins.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::Result;

/// How long a fetched directory stays fresh
pub const PEOPLE_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Person fields searched by [`matches_person`]
pub const SEARCH_FIELDS: &[&str] = &[
    "sFullName",
    "sEmail",
    "sName",
    "sPerson",
    "sFirstName",
    "sLastName",
    "sUsername",
    "sLogin",
];

/// One fetched copy of the directory
#[derive(Debug, Clone, PartialEq)]
pub struct PeopleSnapshot {
    pub people: Vec<Value>,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PeopleSnapshot {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// A snapshot plus whether it came from the cache
#[derive(Debug, Clone)]
pub struct PeopleLookup {
    pub snapshot: Arc<PeopleSnapshot>,
    pub from_cache: bool,
}

/// Cache state: nothing yet, or the latest snapshot
#[derive(Debug, Default)]
enum CacheState {
    #[default]
    Empty,
    Populated(Arc<PeopleSnapshot>),
}

/// Time-bounded cache for the people directory
#[derive(Debug)]
pub struct PeopleCache {
    ttl: Duration,
    state: Mutex<CacheState>,
}

impl Default for PeopleCache {
    fn default() -> Self {
        Self::new(PEOPLE_CACHE_TTL)
    }
}

impl PeopleCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: Mutex::new(CacheState::Empty),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Drop the cached snapshot
    pub fn invalidate(&self) {
        *self.state.lock() = CacheState::Empty;
    }

    /// The fresh snapshot, if there is one
    pub fn current(&self) -> Option<Arc<PeopleSnapshot>> {
        match &*self.state.lock() {
            CacheState::Populated(snapshot) if snapshot.is_fresh(Utc::now()) => {
                Some(Arc::clone(snapshot))
            }
            _ => None,
        }
    }

    /// Serve the cached directory or fetch a new one.
    ///
    /// `force` empties the cache before fetching regardless of the TTL. The
    /// lock is never held across `fetch`.
    pub async fn get_or_fetch<F, Fut>(&self, force: bool, fetch: F) -> Result<PeopleLookup>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Value>>>,
    {
        if force {
            self.invalidate();
        } else if let Some(snapshot) = self.current() {
            tracing::debug!(people = snapshot.people.len(), "People directory served from cache");
            return Ok(PeopleLookup {
                snapshot,
                from_cache: true,
            });
        }

        let people = fetch().await?;
        let fetched_at = Utc::now();
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::zero());
        let snapshot = Arc::new(PeopleSnapshot {
            people,
            fetched_at,
            expires_at: fetched_at + ttl,
        });
        *self.state.lock() = CacheState::Populated(Arc::clone(&snapshot));
        tracing::debug!(
            people = snapshot.people.len(),
            forced = force,
            "People directory fetched"
        );

        Ok(PeopleLookup {
            snapshot,
            from_cache: false,
        })
    }
}

/// Case-insensitive substring match over [`SEARCH_FIELDS`].
///
/// `needle` must already be lowercase; an empty needle matches everyone.
pub fn matches_person(person: &Value, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    SEARCH_FIELDS.iter().any(|key| match person.get(*key) {
        Some(Value::String(s)) => s.to_lowercase().contains(needle),
        Some(Value::Number(n)) => n.to_string().contains(needle),
        Some(Value::Bool(b)) => b.to_string().contains(needle),
        _ => false,
    })
}
