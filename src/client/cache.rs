use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;
use uuid::Uuid;

use crate::goals::{Goal, GoalCategory};

/// Which goal list an entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheKey {
    All,
    Category(GoalCategory),
}

impl CacheKey {
    pub fn for_category(category: Option<GoalCategory>) -> Self {
        category.map_or(CacheKey::All, CacheKey::Category)
    }

    pub fn category(&self) -> Option<GoalCategory> {
        match self {
            CacheKey::All => None,
            CacheKey::Category(c) => Some(*c),
        }
    }

    /// The entries a goal of `category` can appear in.
    pub fn holding(category: GoalCategory) -> Vec<CacheKey> {
        vec![CacheKey::All, CacheKey::Category(category)]
    }

    pub fn every() -> Vec<CacheKey> {
        std::iter::once(CacheKey::All)
            .chain(GoalCategory::ALL.into_iter().map(CacheKey::Category))
            .collect()
    }
}

#[derive(Debug, Default)]
struct Entry {
    data: Option<Vec<Goal>>,
    stale: bool,
    epoch: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<CacheKey, Entry>,
    pending: HashMap<CacheKey, usize>,
}

impl Inner {
    fn entry(&mut self, key: CacheKey) -> &mut Entry {
        self.entries.entry(key).or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Saved {
    data: Option<Vec<Goal>>,
    stale: bool,
}

/// Pre-mutation contents of a set of entries.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    entries: BTreeMap<CacheKey, Saved>,
}

impl Snapshot {
    pub fn keys(&self) -> impl Iterator<Item = CacheKey> + '_ {
        self.entries.keys().copied()
    }
}

/// Goal lists keyed by category, plus one for all goals.
///
/// Every method takes the lock once and releases it before returning, so
/// each call is atomic and none is ever held across an `.await`.
#[derive(Debug, Default)]
pub struct GoalCache {
    inner: Mutex<Inner>,
}

impl GoalCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: CacheKey) -> Option<Vec<Goal>> {
        self.lock().entries.get(&key).and_then(|e| e.data.clone())
    }

    /// Cached list if present and not invalidated.
    pub fn fresh(&self, key: CacheKey) -> Option<Vec<Goal>> {
        self.lock()
            .entries
            .get(&key)
            .filter(|e| !e.stale)
            .and_then(|e| e.data.clone())
    }

    pub fn is_stale(&self, key: CacheKey) -> bool {
        self.lock().entries.get(&key).map_or(false, |e| e.stale)
    }

    pub fn set(&self, key: CacheKey, goals: Vec<Goal>) {
        let mut inner = self.lock();
        let entry = inner.entry(key);
        entry.data = Some(goals);
        entry.stale = false;
    }

    pub fn remove(&self, key: CacheKey) {
        if let Some(entry) = self.lock().entries.get_mut(&key) {
            entry.data = None;
            entry.stale = false;
        }
    }

    /// Keys that currently hold data, in canonical order.
    pub fn keys(&self) -> Vec<CacheKey> {
        let inner = self.lock();
        let mut keys: Vec<_> = inner
            .entries
            .iter()
            .filter(|(_, e)| e.data.is_some())
            .map(|(k, _)| *k)
            .collect();
        keys.sort();
        keys
    }

    pub fn find(&self, id: Uuid) -> Option<Goal> {
        let inner = self.lock();
        let mut entries: Vec<_> = inner.entries.iter().collect();
        entries.sort_by_key(|(k, _)| **k);
        entries
            .into_iter()
            .filter_map(|(_, e)| e.data.as_ref())
            .flatten()
            .find(|g| g.id == id)
            .cloned()
    }

    /// Applies `f` to the list under `key`. Entries without data are left
    /// alone; returns whether `f` ran.
    pub fn update<F>(&self, key: CacheKey, f: F) -> bool
    where
        F: FnOnce(&mut Vec<Goal>),
    {
        match self.lock().entries.get_mut(&key).and_then(|e| e.data.as_mut()) {
            Some(goals) => {
                f(goals);
                true
            }
            None => false,
        }
    }

    /// Removes the goal from every list holding it.
    pub fn drop_goal(&self, id: Uuid) {
        let mut inner = self.lock();
        for entry in inner.entries.values_mut() {
            if let Some(goals) = entry.data.as_mut() {
                goals.retain(|g| g.id != id);
            }
        }
    }

    /// Drops any fetch for `keys` that is still in flight: its result is
    /// refused when it lands.
    pub fn cancel(&self, keys: &[CacheKey]) {
        let mut inner = self.lock();
        for key in keys {
            inner.entry(*key).epoch += 1;
        }
    }

    pub fn begin_fetch(&self, key: CacheKey) -> u64 {
        self.lock().entry(key).epoch
    }

    /// Stores a fetched list unless the fetch was cancelled or a mutation on
    /// `key` is still being reconciled.
    pub fn finish_fetch(&self, key: CacheKey, epoch: u64, goals: Vec<Goal>) -> bool {
        let mut inner = self.lock();
        if inner.pending.get(&key).copied().unwrap_or(0) > 0 {
            debug!(?key, "fetch dropped, mutation pending");
            return false;
        }
        let entry = inner.entry(key);
        if entry.epoch != epoch {
            debug!(?key, epoch, current = entry.epoch, "fetch dropped, cancelled");
            return false;
        }
        entry.data = Some(goals);
        entry.stale = false;
        true
    }

    pub fn snapshot(&self, keys: &[CacheKey]) -> Snapshot {
        let inner = self.lock();
        let entries = keys
            .iter()
            .map(|key| {
                let saved = inner.entries.get(key).map_or(
                    Saved {
                        data: None,
                        stale: false,
                    },
                    |e| Saved {
                        data: e.data.clone(),
                        stale: e.stale,
                    },
                );
                (*key, saved)
            })
            .collect();
        Snapshot { entries }
    }

    pub fn rollback(&self, snapshot: Snapshot) {
        let mut inner = self.lock();
        for (key, saved) in snapshot.entries {
            let entry = inner.entry(key);
            entry.data = saved.data;
            entry.stale = saved.stale;
        }
    }

    /// Marks entries stale so the next read refetches them.
    pub fn invalidate(&self, keys: &[CacheKey]) {
        let mut inner = self.lock();
        for key in keys {
            if let Some(entry) = inner.entries.get_mut(key) {
                if entry.data.is_some() {
                    entry.stale = true;
                }
            }
        }
    }

    pub fn is_pending(&self, key: CacheKey) -> bool {
        self.lock().pending.get(&key).copied().unwrap_or(0) > 0
    }

    /// Holds `keys` as under reconciliation until the guard is dropped.
    pub fn mark_pending(&self, keys: &[CacheKey]) -> PendingGuard<'_> {
        let mut inner = self.lock();
        for key in keys {
            *inner.pending.entry(*key).or_insert(0) += 1;
        }
        PendingGuard {
            cache: self,
            keys: keys.to_vec(),
        }
    }

    fn release(&self, keys: &[CacheKey]) {
        let mut inner = self.lock();
        for key in keys {
            if let Some(count) = inner.pending.get_mut(key) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    inner.pending.remove(key);
                }
            }
        }
    }

    /// Forgets every list. Fetches in flight are dropped when they land.
    pub fn reset(&self) {
        let mut inner = self.lock();
        for entry in inner.entries.values_mut() {
            entry.data = None;
            entry.stale = false;
            entry.epoch += 1;
        }
        debug!("goal cache reset");
    }
}

/// Releases pending marks on drop.
#[must_use = "keys are released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct PendingGuard<'a> {
    cache: &'a GoalCache,
    keys: Vec<CacheKey>,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.cache.release(&self.keys);
    }
}
