use std::{future::Future, sync::Arc};

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{
    api::GoalsApi,
    cache::{CacheKey, GoalCache, Snapshot},
    error::SyncError,
    session::Session,
};
use crate::goals::{
    dto::{GoalCreate, GoalUpdate},
    summarize, Goal, GoalCategory, GoalSummary,
};

/// Applies goal mutations to the cache optimistically and reconciles them
/// with the API: invalidate on success, roll back on failure.
pub struct GoalSync {
    api: Arc<dyn GoalsApi>,
    cache: Arc<GoalCache>,
    session: Arc<Session>,
}

/// The pre-mutation snapshot of a mutation awaiting its API answer. Dropped
/// while still armed, it restores the snapshot and marks the keys stale.
struct InFlight<'a> {
    op: &'static str,
    cache: &'a GoalCache,
    keys: &'a [CacheKey],
    snapshot: Option<Snapshot>,
}

impl InFlight<'_> {
    fn disarm(&mut self) -> Option<Snapshot> {
        self.snapshot.take()
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.cache.rollback(snapshot);
            self.cache.invalidate(self.keys);
            warn!(op = self.op, "mutation abandoned before the api answered");
        }
    }
}

/// Writes `goal` into every list in `keys` that is loaded: replaced in place,
/// inserted at the head of lists it now belongs to, removed from the rest.
fn place(cache: &GoalCache, keys: &[CacheKey], goal: &Goal) {
    for key in keys {
        cache.update(*key, |goals| {
            let belongs = key.category().map_or(true, |c| c == goal.category);
            let position = goals.iter().position(|g| g.id == goal.id);
            match (belongs, position) {
                (true, Some(i)) => goals[i] = goal.clone(),
                (true, None) => goals.insert(0, goal.clone()),
                (false, Some(i)) => {
                    goals.remove(i);
                }
                (false, None) => {}
            }
        });
    }
}

impl GoalSync {
    pub fn new(api: Arc<dyn GoalsApi>, session: Arc<Session>) -> Self {
        Self::with_cache(api, Arc::new(GoalCache::new()), session)
    }

    pub fn with_cache(api: Arc<dyn GoalsApi>, cache: Arc<GoalCache>, session: Arc<Session>) -> Self {
        Self {
            api,
            cache,
            session,
        }
    }

    pub fn cache(&self) -> &Arc<GoalCache> {
        &self.cache
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Goals of one category, or all of them. Served from the cache unless
    /// the entry is missing or has been invalidated.
    pub async fn goals(&self, category: Option<GoalCategory>) -> Result<Vec<Goal>, SyncError> {
        let key = CacheKey::for_category(category);
        match self.cache.fresh(key) {
            Some(goals) => Ok(goals),
            None => self.refetch(key).await,
        }
    }

    /// Loads `key` from the API. A result that lands after the entry was
    /// cancelled is not stored; the caller then gets the cached list.
    pub async fn refetch(&self, key: CacheKey) -> Result<Vec<Goal>, SyncError> {
        let epoch = self.cache.begin_fetch(key);
        let goals = match self.api.list(key.category()).await {
            Ok(goals) => goals,
            Err(e) => return Err(self.escalate(e, None)),
        };
        if self.cache.finish_fetch(key, epoch, goals.clone()) {
            Ok(goals)
        } else {
            Ok(self.cache.get(key).unwrap_or(goals))
        }
    }

    pub async fn summary(&self) -> Result<GoalSummary, SyncError> {
        let goals = self.goals(None).await?;
        Ok(summarize(&goals)?)
    }

    #[instrument(skip(self, data), fields(category = %data.category))]
    pub async fn create_goal(&self, data: GoalCreate) -> Result<Goal, SyncError> {
        data.validate().map_err(SyncError::InvalidInput)?;

        let owner = self.session.user().map_or(Uuid::nil(), |u| u.id);
        let provisional = Goal::provisional(&data, owner);
        let keys = CacheKey::holding(data.category);

        let created = self
            .reconcile(
                "create",
                &keys,
                None,
                |cache| place(cache, &keys, &provisional),
                self.api.create(&data),
            )
            .await?;
        info!(goal_id = %created.id, "goal created");
        Ok(created)
    }

    /// Merges the present fields of `update`. A category change moves the
    /// goal between the per-category lists.
    #[instrument(skip(self, update))]
    pub async fn update_goal(&self, id: Uuid, update: GoalUpdate) -> Result<Goal, SyncError> {
        update.validate().map_err(SyncError::InvalidInput)?;

        let current = self.cache.find(id);
        let keys = match &current {
            Some(goal) => {
                let mut keys = CacheKey::holding(goal.category);
                if let Some(to) = update.category.filter(|c| *c != goal.category) {
                    keys.push(CacheKey::Category(to));
                }
                keys
            }
            None => CacheKey::every(),
        };
        let merged = current.map(|goal| goal.merged(&update));

        self.reconcile(
            "update",
            &keys,
            Some(id),
            |cache| {
                if let Some(goal) = &merged {
                    place(cache, &keys, goal);
                }
            },
            self.api.update(id, &update),
        )
        .await
    }

    /// Sets the saved amount, clamped to `[0, target]` before it is sent.
    #[instrument(skip(self))]
    pub async fn update_saved(&self, id: Uuid, amount: f64) -> Result<Goal, SyncError> {
        if !amount.is_finite() {
            return Err(SyncError::InvalidInput("Amount must be a finite number".into()));
        }

        let current = self.cache.find(id);
        let amount = match &current {
            Some(goal) => goal.clamp_saved_amount(amount),
            None => amount.max(0.0),
        };
        let keys = current
            .as_ref()
            .map_or_else(CacheKey::every, |g| CacheKey::holding(g.category));
        let updated = current.map(|mut goal| {
            goal.saved = amount;
            goal
        });

        self.reconcile(
            "update_saved",
            &keys,
            Some(id),
            |cache| {
                if let Some(goal) = &updated {
                    place(cache, &keys, goal);
                }
            },
            self.api.update_saved(id, amount),
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn delete_goal(&self, id: Uuid) -> Result<(), SyncError> {
        let keys = self
            .cache
            .find(id)
            .map_or_else(CacheKey::every, |g| CacheKey::holding(g.category));

        self.reconcile(
            "delete",
            &keys,
            Some(id),
            |cache| {
                for key in &keys {
                    cache.update(*key, |goals| goals.retain(|g| g.id != id));
                }
            },
            self.api.delete(id),
        )
        .await?;
        info!(goal_id = %id, "goal deleted");
        Ok(())
    }

    /// Signs out locally: drops every cached list and the session.
    pub fn reset(&self) {
        self.cache.reset();
        self.session.reset();
    }

    async fn reconcile<T, A, F>(
        &self,
        op: &'static str,
        keys: &[CacheKey],
        goal_id: Option<Uuid>,
        apply: A,
        dispatch: F,
    ) -> Result<T, SyncError>
    where
        A: FnOnce(&GoalCache),
        F: Future<Output = Result<T, SyncError>>,
    {
        let _pending = self.cache.mark_pending(keys);
        self.cache.cancel(keys);
        let mut in_flight = InFlight {
            op,
            cache: self.cache.as_ref(),
            keys,
            snapshot: Some(self.cache.snapshot(keys)),
        };
        apply(self.cache.as_ref());

        let outcome = dispatch.await;
        let snapshot = in_flight.disarm();
        match outcome {
            Ok(value) => {
                self.cache.invalidate(keys);
                debug!(op, "mutation confirmed");
                Ok(value)
            }
            Err(e) => {
                if let Some(snapshot) = snapshot {
                    self.cache.rollback(snapshot);
                }
                warn!(op, error = %e, "mutation rolled back");
                Err(self.escalate(e, goal_id))
            }
        }
    }

    fn escalate(&self, err: SyncError, goal_id: Option<Uuid>) -> SyncError {
        match &err {
            SyncError::NotFound => {
                if let Some(id) = goal_id {
                    self.cache.drop_goal(id);
                }
            }
            SyncError::Unauthenticated => {
                warn!("api rejected the session");
                self.session.reset();
            }
            SyncError::InvalidInput(_) | SyncError::TransientFailure(_) => {}
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::client::session::signed_in;
    use crate::goals::{compute_progress, fixtures::goal};

    type Observed = HashMap<CacheKey, Vec<Goal>>;

    /// In-memory API that records what the cache looked like when each
    /// mutation was dispatched.
    #[derive(Default)]
    struct FakeGoalsApi {
        goals: Mutex<Vec<Goal>>,
        fail_next: Mutex<Option<SyncError>>,
        observer: Mutex<Option<Arc<GoalCache>>>,
        seen: Mutex<Vec<Observed>>,
        pending_at_dispatch: Mutex<Vec<bool>>,
        amounts: Mutex<Vec<f64>>,
        list_calls: AtomicUsize,
        mutation_calls: AtomicUsize,
        stall_deletes: AtomicBool,
    }

    impl FakeGoalsApi {
        fn fail_next(&self, err: SyncError) {
            *self.fail_next.lock().unwrap() = Some(err);
        }

        fn seen(&self) -> Vec<Observed> {
            self.seen.lock().unwrap().clone()
        }

        fn list_calls(&self) -> usize {
            self.list_calls.load(Ordering::SeqCst)
        }

        fn mutation_calls(&self) -> usize {
            self.mutation_calls.load(Ordering::SeqCst)
        }

        fn dispatched(&self) -> Result<(), SyncError> {
            self.mutation_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(cache) = self.observer.lock().unwrap().as_ref() {
                let observed = cache
                    .keys()
                    .into_iter()
                    .filter_map(|k| cache.get(k).map(|goals| (k, goals)))
                    .collect();
                self.seen.lock().unwrap().push(observed);
                self.pending_at_dispatch
                    .lock()
                    .unwrap()
                    .push(cache.is_pending(CacheKey::All));
            }
            match self.fail_next.lock().unwrap().take() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl GoalsApi for FakeGoalsApi {
        async fn list(&self, category: Option<GoalCategory>) -> Result<Vec<Goal>, SyncError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .goals
                .lock()
                .unwrap()
                .iter()
                .filter(|g| category.map_or(true, |c| g.category == c))
                .cloned()
                .collect())
        }

        async fn summary(&self) -> Result<GoalSummary, SyncError> {
            Ok(summarize(&self.goals.lock().unwrap())?)
        }

        async fn create(&self, data: &GoalCreate) -> Result<Goal, SyncError> {
            self.dispatched()?;
            let goal = Goal::provisional(data, Uuid::nil());
            self.goals.lock().unwrap().insert(0, goal.clone());
            Ok(goal)
        }

        async fn update(&self, id: Uuid, data: &GoalUpdate) -> Result<Goal, SyncError> {
            self.dispatched()?;
            let mut goals = self.goals.lock().unwrap();
            let goal = goals.iter_mut().find(|g| g.id == id).ok_or(SyncError::NotFound)?;
            data.apply_to(goal);
            Ok(goal.clone())
        }

        async fn update_saved(&self, id: Uuid, amount: f64) -> Result<Goal, SyncError> {
            self.amounts.lock().unwrap().push(amount);
            self.dispatched()?;
            let mut goals = self.goals.lock().unwrap();
            let goal = goals.iter_mut().find(|g| g.id == id).ok_or(SyncError::NotFound)?;
            goal.saved = goal.clamp_saved_amount(amount);
            Ok(goal.clone())
        }

        async fn delete(&self, id: Uuid) -> Result<(), SyncError> {
            if self.stall_deletes.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            self.dispatched()?;
            let mut goals = self.goals.lock().unwrap();
            let before = goals.len();
            goals.retain(|g| g.id != id);
            if goals.len() == before {
                return Err(SyncError::NotFound);
            }
            Ok(())
        }
    }

    fn setup(goals: Vec<Goal>) -> (GoalSync, Arc<FakeGoalsApi>) {
        let api = Arc::new(FakeGoalsApi::default());
        *api.goals.lock().unwrap() = goals;
        let cache = Arc::new(GoalCache::new());
        *api.observer.lock().unwrap() = Some(cache.clone());
        let session = Arc::new(signed_in("ann@example.com"));
        let sync = GoalSync::with_cache(api.clone(), cache, session);
        (sync, api)
    }

    #[tokio::test]
    async fn create_shows_provisional_goal_then_refetches() {
        let (sync, api) = setup(vec![]);
        assert!(sync.goals(None).await.unwrap().is_empty());

        let created = sync
            .create_goal(GoalCreate::new("Emergency fund", 1000.0))
            .await
            .unwrap();
        assert_eq!(compute_progress(created.saved, created.target).unwrap(), 0);

        let seen = api.seen();
        let optimistic = &seen[0][&CacheKey::All];
        assert_eq!(optimistic.len(), 1);
        assert_eq!(optimistic[0].title, "Emergency fund");
        assert_eq!(optimistic[0].user_id, sync.session().user().unwrap().id);
        assert_ne!(optimistic[0].id, created.id);
        assert_eq!(*api.pending_at_dispatch.lock().unwrap(), vec![true]);

        assert!(sync.cache().is_stale(CacheKey::All));
        assert!(!sync.cache().is_pending(CacheKey::All));
        assert_eq!(sync.goals(None).await.unwrap(), vec![created]);
        assert_eq!(api.list_calls(), 2);
    }

    #[tokio::test]
    async fn update_saved_is_clamped_to_target() {
        let g = goal(GoalCategory::Financial, 1000.0, 1000.0);
        let (sync, api) = setup(vec![g.clone()]);
        sync.goals(None).await.unwrap();
        assert_eq!(g.progress().unwrap(), 100);

        let updated = sync.update_saved(g.id, 1500.0).await.unwrap();
        assert_eq!(updated.saved, 1000.0);
        assert_eq!(updated.progress().unwrap(), 100);
        assert_eq!(*api.amounts.lock().unwrap(), vec![1000.0]);
        assert_eq!(api.seen()[0][&CacheKey::All][0].saved, 1000.0);
    }

    #[tokio::test]
    async fn negative_saved_amount_is_sent_as_zero() {
        let g = goal(GoalCategory::Career, 500.0, 100.0);
        let (sync, api) = setup(vec![g.clone()]);
        sync.goals(None).await.unwrap();

        let updated = sync.update_saved(g.id, -20.0).await.unwrap();
        assert_eq!(updated.saved, 0.0);
        assert_eq!(*api.amounts.lock().unwrap(), vec![0.0]);
    }

    #[tokio::test]
    async fn summary_over_cached_goals() {
        let (sync, api) = setup(vec![
            goal(GoalCategory::Financial, 100.0, 50.0),
            goal(GoalCategory::Financial, 200.0, 200.0),
        ]);

        let summary = sync.summary().await.unwrap();
        assert_eq!(summary.by_category.len(), 1);
        let financial = &summary.by_category[0];
        assert_eq!(financial.category, GoalCategory::Financial);
        assert_eq!(financial.total_saved, 250.0);
        assert_eq!(financial.total_target, 300.0);
        assert_eq!(financial.count, 2);
        assert_eq!(financial.achieved, 1);
        assert_eq!(financial.progress, 83);
        assert_eq!(summary, api.summary().await.unwrap());

        sync.summary().await.unwrap();
        assert_eq!(api.list_calls(), 1);
    }

    #[tokio::test]
    async fn failed_delete_restores_the_goal() {
        let x = goal(GoalCategory::Financial, 100.0, 10.0);
        let y = goal(GoalCategory::Career, 50.0, 5.0);
        let (sync, api) = setup(vec![x.clone(), y]);
        sync.goals(None).await.unwrap();
        sync.goals(Some(GoalCategory::Financial)).await.unwrap();
        let before = sync.cache().snapshot(&CacheKey::every());

        api.fail_next(SyncError::TransientFailure("connection reset".into()));
        let err = sync.delete_goal(x.id).await.unwrap_err();
        assert!(matches!(err, SyncError::TransientFailure(_)));

        let seen = api.seen();
        assert!(seen[0][&CacheKey::All].iter().all(|g| g.id != x.id));
        assert!(seen[0][&CacheKey::Category(GoalCategory::Financial)].is_empty());

        assert_eq!(sync.cache().snapshot(&CacheKey::every()), before);
        assert_eq!(sync.cache().find(x.id), Some(x));
        assert!(!sync.cache().is_pending(CacheKey::All));
        assert!(sync.session().is_authenticated());
    }

    #[tokio::test]
    async fn failed_create_leaves_cache_untouched() {
        let (sync, api) = setup(vec![]);
        sync.goals(None).await.unwrap();

        api.fail_next(SyncError::TransientFailure("502 Bad Gateway".into()));
        let result = sync.create_goal(GoalCreate::new("Bike", 300.0)).await;
        assert!(result.is_err());

        assert_eq!(api.seen()[0][&CacheKey::All].len(), 1);
        assert_eq!(sync.cache().fresh(CacheKey::All), Some(vec![]));
    }

    #[tokio::test]
    async fn category_change_moves_goal_between_lists() {
        let g = goal(GoalCategory::Financial, 100.0, 10.0);
        let (sync, api) = setup(vec![g.clone()]);
        sync.goals(None).await.unwrap();
        sync.goals(Some(GoalCategory::Financial)).await.unwrap();
        sync.goals(Some(GoalCategory::Career)).await.unwrap();

        let update = GoalUpdate {
            category: Some(GoalCategory::Career),
            ..Default::default()
        };
        let updated = sync.update_goal(g.id, update).await.unwrap();
        assert_eq!(updated.category, GoalCategory::Career);

        let seen = api.seen();
        let seen = &seen[0];
        assert!(seen[&CacheKey::Category(GoalCategory::Financial)].is_empty());
        assert_eq!(seen[&CacheKey::Category(GoalCategory::Career)][0].id, g.id);
        assert_eq!(seen[&CacheKey::All][0].category, GoalCategory::Career);

        for key in [
            CacheKey::All,
            CacheKey::Category(GoalCategory::Financial),
            CacheKey::Category(GoalCategory::Career),
        ] {
            assert!(sync.cache().is_stale(key));
        }
        assert_eq!(sync.goals(Some(GoalCategory::Career)).await.unwrap(), vec![updated]);
    }

    #[tokio::test]
    async fn failed_category_change_restores_all_three_lists() {
        let g = goal(GoalCategory::Financial, 100.0, 10.0);
        let other = goal(GoalCategory::Career, 40.0, 4.0);
        let (sync, api) = setup(vec![g.clone(), other]);
        sync.goals(None).await.unwrap();
        sync.goals(Some(GoalCategory::Financial)).await.unwrap();
        sync.goals(Some(GoalCategory::Career)).await.unwrap();
        let before = sync.cache().snapshot(&CacheKey::every());

        api.fail_next(SyncError::TransientFailure("504 Gateway Timeout".into()));
        let update = GoalUpdate {
            category: Some(GoalCategory::Career),
            title: Some("Promotion fund".into()),
            ..Default::default()
        };
        let err = sync.update_goal(g.id, update).await.unwrap_err();
        assert!(matches!(err, SyncError::TransientFailure(_)));

        let seen = api.seen();
        let seen = &seen[0];
        assert!(seen[&CacheKey::Category(GoalCategory::Financial)].is_empty());
        assert_eq!(seen[&CacheKey::Category(GoalCategory::Career)].len(), 2);
        assert_eq!(seen[&CacheKey::All][0].title, "Promotion fund");

        assert_eq!(sync.cache().snapshot(&CacheKey::every()), before);
        assert_eq!(sync.cache().find(g.id), Some(g));
        assert!(!sync.cache().is_pending(CacheKey::Category(GoalCategory::Career)));
    }

    #[tokio::test]
    async fn failed_saved_update_restores_the_amount() {
        let g = goal(GoalCategory::PersonalHealth, 300.0, 120.0);
        let (sync, api) = setup(vec![g.clone()]);
        sync.goals(None).await.unwrap();
        sync.goals(Some(GoalCategory::PersonalHealth)).await.unwrap();
        let before = sync.cache().snapshot(&CacheKey::every());

        api.fail_next(SyncError::TransientFailure("connection refused".into()));
        let err = sync.update_saved(g.id, 250.0).await.unwrap_err();
        assert!(matches!(err, SyncError::TransientFailure(_)));

        assert_eq!(api.seen()[0][&CacheKey::All][0].saved, 250.0);
        assert_eq!(sync.cache().snapshot(&CacheKey::every()), before);
        assert_eq!(sync.cache().find(g.id).map(|g| g.saved), Some(120.0));
    }

    #[tokio::test]
    async fn abandoned_mutation_is_rolled_back_and_refetched() {
        let g = goal(GoalCategory::Financial, 100.0, 10.0);
        let (sync, api) = setup(vec![g.clone()]);
        sync.goals(None).await.unwrap();
        api.stall_deletes.store(true, Ordering::SeqCst);

        let abandoned = tokio::time::timeout(Duration::from_millis(50), sync.delete_goal(g.id)).await;
        assert!(abandoned.is_err());

        assert_eq!(sync.cache().get(CacheKey::All), Some(vec![g.clone()]));
        assert!(sync.cache().is_stale(CacheKey::All));
        assert_eq!(sync.cache().fresh(CacheKey::All), None);
        assert!(!sync.cache().is_pending(CacheKey::All));

        assert_eq!(sync.goals(None).await.unwrap(), vec![g]);
        assert_eq!(api.list_calls(), 2);
    }

    #[tokio::test]
    async fn unloaded_lists_are_not_created() {
        let (sync, _api) = setup(vec![]);
        sync.create_goal(GoalCreate::new("Marathon", 42.0)).await.unwrap();
        assert!(sync.cache().keys().is_empty());
    }

    #[tokio::test]
    async fn not_found_drops_the_goal() {
        let g = goal(GoalCategory::Financial, 100.0, 10.0);
        let (sync, api) = setup(vec![g.clone()]);
        sync.goals(None).await.unwrap();
        api.goals.lock().unwrap().clear();

        let err = sync.update_saved(g.id, 20.0).await.unwrap_err();
        assert_eq!(err, SyncError::NotFound);
        assert_eq!(sync.cache().find(g.id), None);

        assert_eq!(sync.delete_goal(g.id).await.unwrap_err(), SyncError::NotFound);
    }

    #[tokio::test]
    async fn unauthenticated_resets_the_session() {
        let g = goal(GoalCategory::Financial, 100.0, 10.0);
        let (sync, api) = setup(vec![g.clone()]);
        sync.goals(None).await.unwrap();

        api.fail_next(SyncError::Unauthenticated);
        let err = sync.delete_goal(g.id).await.unwrap_err();
        assert_eq!(err, SyncError::Unauthenticated);
        assert!(!sync.session().is_authenticated());
        assert_eq!(sync.cache().find(g.id), Some(g));
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_the_api() {
        let g = goal(GoalCategory::Financial, 100.0, 10.0);
        let (sync, api) = setup(vec![g.clone()]);
        sync.goals(None).await.unwrap();

        let err = sync.create_goal(GoalCreate::new("Zero", 0.0)).await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidInput(_)));
        let err = sync.create_goal(GoalCreate::new("   ", 10.0)).await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidInput(_)));
        let err = sync.update_saved(g.id, f64::NAN).await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidInput(_)));
        let bad_target = GoalUpdate {
            target: Some(-5.0),
            ..Default::default()
        };
        assert!(sync.update_goal(g.id, bad_target).await.is_err());

        assert_eq!(api.mutation_calls(), 0);
        assert_eq!(sync.cache().fresh(CacheKey::All), Some(vec![g]));
    }

    #[tokio::test]
    async fn mutation_cancels_fetch_in_flight() {
        let g = goal(GoalCategory::Financial, 100.0, 10.0);
        let (sync, _api) = setup(vec![g.clone()]);
        sync.goals(None).await.unwrap();

        let epoch = sync.cache().begin_fetch(CacheKey::All);
        sync.update_saved(g.id, 40.0).await.unwrap();
        assert!(!sync.cache().finish_fetch(CacheKey::All, epoch, vec![]));
        assert_eq!(sync.cache().get(CacheKey::All).unwrap()[0].saved, 40.0);
    }

    #[tokio::test]
    async fn reset_clears_cache_and_session() {
        let (sync, _api) = setup(vec![goal(GoalCategory::Career, 10.0, 1.0)]);
        sync.goals(None).await.unwrap();

        sync.reset();
        assert!(sync.cache().keys().is_empty());
        assert!(!sync.session().is_authenticated());
    }
}
