// src/services/review.rs

//! Review controller.
//!
//! Holds the session's submission cache and stats, and runs review actions
//! against the API. Local state changes only after the server acknowledged
//! an action. Only one action may be outstanding at a time across the whole
//! list; a reload occupies the same slot, so the two never overlap.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Local, TimeZone, Utc};
use tokio::task::JoinHandle;

use crate::api::ReviewDecision;
use crate::error::{AppError, Result};
use crate::models::{StatsSnapshot, Submission};
use crate::services::fetcher::DataFetcher;
use crate::services::filter::{self, SubmissionFilter};
use crate::services::prompt::ReviewPrompt;

/// What a review action ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Approved(Submission),
    Rejected(Submission),
    Deleted(Submission),
    /// The reviewer backed out; nothing was sent
    Abandoned,
}

#[derive(Debug, Default)]
struct DeskState {
    submissions: Vec<Submission>,
    stats: Option<StatsSnapshot>,
    /// Generation of the load that produced `stats`
    stats_generation: u64,
}

impl DeskState {
    /// Store `snapshot` unless a later load already stored its own.
    fn offer_stats(&mut self, generation: u64, snapshot: StatsSnapshot) -> bool {
        if generation < self.stats_generation {
            return false;
        }
        self.stats_generation = generation;
        self.stats = Some(snapshot);
        true
    }
}

type Shared<T> = Arc<RwLock<T>>;

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// What currently holds the in-flight slot.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Busy {
    Review(String),
    Reload,
}

impl Busy {
    fn refusal(&self) -> AppError {
        match self {
            Busy::Review(id) => AppError::ActionInProgress { id: id.clone() },
            Busy::Reload => AppError::RefreshInProgress,
        }
    }
}

/// Releases the in-flight slot when the holder finishes, however it ends.
struct InFlight {
    slot: Arc<Mutex<Option<Busy>>>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        lock(&self.slot).take();
    }
}

/// Session-scoped review controller.
pub struct ReviewController {
    fetcher: DataFetcher,
    prompt: Arc<dyn ReviewPrompt>,
    state: Shared<DeskState>,
    in_flight: Arc<Mutex<Option<Busy>>>,
    stats_task: Mutex<Option<JoinHandle<()>>>,
    generation: AtomicU64,
}

impl ReviewController {
    pub fn new(fetcher: DataFetcher, prompt: Arc<dyn ReviewPrompt>) -> Self {
        Self {
            fetcher,
            prompt,
            state: Arc::new(RwLock::new(DeskState::default())),
            in_flight: Arc::new(Mutex::new(None)),
            stats_task: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    // --- Loading ---

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Reload submissions and stats, replacing the cache.
    ///
    /// Refused with `ActionInProgress` while an action is outstanding; actions
    /// are refused with `RefreshInProgress` until the reload ends. On failure
    /// the previous cache is kept.
    pub async fn refresh(&self, limit: usize) -> Result<()> {
        let _slot = self.occupy(Busy::Reload)?;
        let generation = self.next_generation();
        let dashboard = self.fetcher.load_all(limit).await?;

        let mut state = write(&self.state);
        state.submissions = dashboard.submissions;
        state.offer_stats(generation, dashboard.stats);
        Ok(())
    }

    /// Refresh stats on a background task, superseding any earlier one.
    ///
    /// Failure never touches the submission cache; unavailable stats are
    /// derived from it instead.
    fn refresh_stats_in_background(&self) {
        let fetcher = self.fetcher.clone();
        let state = Arc::clone(&self.state);
        let generation = self.next_generation();

        let task = tokio::spawn(async move {
            let snapshot = match fetcher.load_stats().await {
                Ok(stats) => StatsSnapshot::remote(stats),
                Err(AppError::Unauthorized) => {
                    log::warn!("Stats refresh rejected: token no longer valid");
                    return;
                }
                Err(e) => {
                    log::warn!("{}; deriving stats locally", e);
                    let submissions = read(&state).submissions.clone();
                    StatsSnapshot::derived(&submissions, &Local::now())
                }
            };
            if !write(&state).offer_stats(generation, snapshot) {
                log::debug!("Dropping stats from superseded refresh {}", generation);
            }
        });

        if let Some(previous) = lock(&self.stats_task).replace(task) {
            previous.abort();
        }
    }

    /// Wait for the latest background stats refresh to finish.
    pub async fn settle(&self) {
        let task = lock(&self.stats_task).take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                log::warn!("Stats refresh task failed: {}", e);
            }
        }
    }

    // --- Views ---

    pub fn submissions(&self) -> Vec<Submission> {
        read(&self.state).submissions.clone()
    }

    pub fn stats(&self) -> Option<StatsSnapshot> {
        read(&self.state).stats.clone()
    }

    /// Filtered view of the cache.
    pub fn visible<Tz: TimeZone>(&self, criteria: &SubmissionFilter, now: &DateTime<Tz>) -> Vec<Submission> {
        filter::visible(&read(&self.state).submissions, criteria, now)
    }

    /// Look up a cached submission by id or slug.
    pub fn find(&self, key: &str) -> Option<Submission> {
        let state = read(&self.state);
        state
            .submissions
            .iter()
            .find(|s| s.id == key)
            .or_else(|| state.submissions.iter().find(|s| s.slug == key))
            .cloned()
    }

    /// Id of the submission whose action is outstanding, if any.
    pub fn in_flight(&self) -> Option<String> {
        match lock(&self.in_flight).as_ref() {
            Some(Busy::Review(id)) => Some(id.clone()),
            _ => None,
        }
    }

    // --- Actions ---

    fn occupy(&self, holder: Busy) -> Result<InFlight> {
        let mut slot = lock(&self.in_flight);
        if let Some(busy) = slot.as_ref() {
            return Err(busy.refusal());
        }
        *slot = Some(holder);
        Ok(InFlight {
            slot: Arc::clone(&self.in_flight),
        })
    }

    fn begin(&self, id: &str) -> Result<InFlight> {
        self.occupy(Busy::Review(id.to_string()))
    }

    fn cached(&self, id: &str) -> Result<Submission> {
        read(&self.state)
            .submissions
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(id.to_string()))
    }

    fn pending(&self, id: &str) -> Result<Submission> {
        let submission = self.cached(id)?;
        if !submission.is_pending() {
            return Err(AppError::transition(id, submission.status()));
        }
        Ok(submission)
    }

    /// Apply a transition the server acknowledged.
    ///
    /// `submission` is the pending copy the action started from. The server's
    /// answer wins over whatever the cache holds now.
    fn apply(
        &self,
        mut submission: Submission,
        update: impl FnOnce(&mut Submission) -> Result<()>,
    ) -> Result<Submission> {
        update(&mut submission)?;

        let mut state = write(&self.state);
        match state.submissions.iter_mut().find(|s| s.id == submission.id) {
            Some(cached) => {
                cached.review = submission.review.clone();
                Ok(cached.clone())
            }
            None => {
                log::debug!("{} left the cache before the server answered", submission.id);
                Ok(submission)
            }
        }
    }

    /// Approve a pending submission.
    pub async fn approve(&self, id: &str) -> Result<ActionOutcome> {
        let _slot = self.begin(id)?;
        let submission = self.pending(id)?;
        let token = self.fetcher.auth().resolve().await?;

        self.send_review(&token, id, &ReviewDecision::approve()).await?;

        let updated = self.apply(submission, |s| s.approve(Utc::now(), None))?;
        log::info!("Approved {} ({})", updated.name, updated.id);
        self.refresh_stats_in_background();
        Ok(ActionOutcome::Approved(updated))
    }

    /// Reject a pending submission after asking for a reason.
    pub async fn reject(&self, id: &str) -> Result<ActionOutcome> {
        let _slot = self.begin(id)?;
        let submission = self.pending(id)?;
        let token = self.fetcher.auth().resolve().await?;

        let note = match self.prompt.rejection_note(&submission).await {
            Some(note) if !note.trim().is_empty() => note.trim().to_string(),
            _ => {
                log::info!("Rejection of {} abandoned: no reason given", submission.name);
                return Ok(ActionOutcome::Abandoned);
            }
        };

        self.send_review(&token, id, &ReviewDecision::reject(note.clone())).await?;

        let updated = self.apply(submission, |s| s.reject(Utc::now(), &note))?;
        log::info!("Rejected {} ({})", updated.name, updated.id);
        self.refresh_stats_in_background();
        Ok(ActionOutcome::Rejected(updated))
    }

    /// Delete a submission after explicit confirmation.
    pub async fn remove(&self, id: &str) -> Result<ActionOutcome> {
        let _slot = self.begin(id)?;
        let submission = self.cached(id)?;
        let token = self.fetcher.auth().resolve().await?;

        if !self.prompt.confirm_delete(&submission.name).await {
            log::info!("Deletion of {} abandoned", submission.name);
            return Ok(ActionOutcome::Abandoned);
        }

        self.fetcher
            .api()
            .delete(&token, id)
            .await
            .inspect_err(|e| log::warn!("Delete of {} failed: {}", id, e))?;

        write(&self.state).submissions.retain(|s| s.id != id);
        log::info!("Deleted {} ({})", submission.name, submission.id);
        self.refresh_stats_in_background();
        Ok(ActionOutcome::Deleted(submission))
    }

    async fn send_review(&self, token: &str, id: &str, decision: &ReviewDecision) -> Result<()> {
        self.fetcher
            .api()
            .review(token, id, decision)
            .await
            .inspect_err(|e| log::warn!("Review of {} failed: {}", id, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthContext;
    use crate::models::{ReviewStatus, StatsSource};
    use crate::services::prompt::PresetPrompt;
    use crate::services::testing::{Call, FakeApi};
    use chrono::Duration;
    use std::time::Duration as StdDuration;

    fn sample() -> Vec<Submission> {
        let now = Utc::now();
        let mut decided = Submission::new("c", "Chile", "cl", now - Duration::days(4));
        decided.approve(now, None).unwrap();
        vec![
            Submission::new("a", "Ghana", "gh", now).with_submitter("Alice", "a@example.com"),
            Submission::new("b", "Honduras", "hn", now - Duration::days(1)),
            decided,
        ]
    }

    async fn controller(api: Arc<FakeApi>, prompt: PresetPrompt) -> ReviewController {
        let fetcher = DataFetcher::new(api, AuthContext::with_token("t"));
        let controller = ReviewController::new(fetcher, Arc::new(prompt));
        controller.refresh(500).await.unwrap();
        controller
    }

    #[tokio::test]
    async fn test_approve_updates_after_ack() {
        let api = Arc::new(FakeApi::new(sample()));
        let desk = controller(api.clone(), PresetPrompt::default()).await;

        let outcome = desk.approve("a").await.unwrap();
        assert!(matches!(outcome, ActionOutcome::Approved(ref s) if s.status() == ReviewStatus::Approved));
        assert_eq!(desk.find("a").unwrap().status(), ReviewStatus::Approved);
        assert!(desk.find("a").unwrap().reviewed_at().is_some());
        assert_eq!(
            api.action_calls(),
            vec![Call::Review("a".into(), ReviewStatus::Approved, None)]
        );

        desk.settle().await;
        let stats = desk.stats().unwrap();
        assert_eq!(stats.source, StatsSource::Remote);
        assert!(desk.in_flight().is_none());
    }

    #[tokio::test]
    async fn test_approve_survives_stats_refresh_failure() {
        let api = Arc::new(FakeApi::new(sample()));
        let desk = controller(api.clone(), PresetPrompt::default()).await;
        api.fail_stats(true);

        desk.approve("b").await.unwrap();
        desk.settle().await;

        assert_eq!(desk.find("b").unwrap().status(), ReviewStatus::Approved);
        let stats = desk.stats().unwrap();
        assert_eq!(stats.source, StatsSource::Derived);
        assert_eq!(stats.stats.approved_submissions, 2);
    }

    #[tokio::test]
    async fn test_failed_action_leaves_state_untouched() {
        let api = Arc::new(FakeApi::new(sample()));
        let desk = controller(api.clone(), PresetPrompt::new(Some("dup".into()), true)).await;
        api.fail_actions(Some("Review service offline"));
        let before = desk.submissions();

        let err = desk.approve("a").await.unwrap_err();
        assert_eq!(err.to_string(), "Review service offline");
        assert!(desk.reject("a").await.is_err());
        assert!(desk.remove("b").await.is_err());

        assert_eq!(desk.submissions(), before);
        assert!(desk.in_flight().is_none());
    }

    #[tokio::test]
    async fn test_reject_without_note_makes_no_call() {
        let api = Arc::new(FakeApi::new(sample()));
        let desk = controller(api.clone(), PresetPrompt::new(None, false)).await;
        let before = desk.submissions();

        assert_eq!(desk.reject("a").await.unwrap(), ActionOutcome::Abandoned);

        let blank = controller(api.clone(), PresetPrompt::new(Some("   ".into()), false)).await;
        assert_eq!(blank.reject("a").await.unwrap(), ActionOutcome::Abandoned);

        assert!(api.action_calls().is_empty());
        assert_eq!(desk.submissions(), before);
    }

    #[tokio::test]
    async fn test_reject_sends_note() {
        let api = Arc::new(FakeApi::new(sample()));
        let desk = controller(api.clone(), PresetPrompt::new(Some(" Figures outdated ".into()), false)).await;

        desk.reject("b").await.unwrap();
        assert_eq!(desk.find("hn").unwrap().rejection_note(), Some("Figures outdated"));
        assert_eq!(
            api.action_calls(),
            vec![Call::Review(
                "b".into(),
                ReviewStatus::Rejected,
                Some("Figures outdated".into())
            )]
        );
    }

    #[tokio::test]
    async fn test_remove_requires_confirmation() {
        let api = Arc::new(FakeApi::new(sample()));
        let declined = controller(api.clone(), PresetPrompt::new(None, false)).await;
        assert_eq!(declined.remove("c").await.unwrap(), ActionOutcome::Abandoned);
        assert!(api.action_calls().is_empty());
        assert_eq!(declined.submissions().len(), 3);

        let confirmed = controller(api.clone(), PresetPrompt::new(None, true)).await;
        let outcome = confirmed.remove("c").await.unwrap();
        assert!(matches!(outcome, ActionOutcome::Deleted(ref s) if s.id == "c"));
        assert!(confirmed.find("c").is_none());
        assert_eq!(api.action_calls(), vec![Call::Delete("c".into())]);
    }

    #[tokio::test]
    async fn test_decided_submission_is_refused() {
        let api = Arc::new(FakeApi::new(sample()));
        let desk = controller(api.clone(), PresetPrompt::new(Some("late".into()), true)).await;

        assert!(matches!(desk.approve("c").await, Err(AppError::InvalidTransition { .. })));
        assert!(matches!(desk.reject("c").await, Err(AppError::InvalidTransition { .. })));
        assert!(matches!(desk.approve("zz").await, Err(AppError::NotFound(_))));
        assert!(api.action_calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_token_makes_no_calls() {
        let api = Arc::new(FakeApi::new(sample()));
        let seeded = controller(api.clone(), PresetPrompt::new(Some("x".into()), true)).await;
        let snapshot = seeded.submissions();

        // Same cache, no token.
        let desk = ReviewController::new(
            DataFetcher::new(api.clone(), AuthContext::default()),
            Arc::new(PresetPrompt::new(Some("x".into()), true)),
        );
        write(&desk.state).submissions = snapshot;
        let calls_before = api.calls().len();

        assert!(desk.approve("a").await.unwrap_err().is_unauthorized());
        assert!(desk.reject("a").await.unwrap_err().is_unauthorized());
        assert!(desk.remove("a").await.unwrap_err().is_unauthorized());
        assert!(desk.refresh(500).await.unwrap_err().is_unauthorized());
        assert_eq!(api.calls().len(), calls_before);
    }

    #[tokio::test]
    async fn test_second_action_is_refused_while_first_pending() {
        let api = Arc::new(FakeApi::new(sample()));
        let desk = Arc::new(controller(api.clone(), PresetPrompt::new(Some("dup".into()), true)).await);
        let release = api.hold_actions();

        let first = tokio::spawn({
            let desk = Arc::clone(&desk);
            async move { desk.approve("b").await }
        });

        while api.action_calls().is_empty() {
            tokio::task::yield_now().await;
        }
        assert_eq!(desk.in_flight().as_deref(), Some("b"));

        let err = desk.reject("a").await.unwrap_err();
        assert!(matches!(err, AppError::ActionInProgress { ref id } if id == "b"));
        assert_eq!(api.action_calls().len(), 1);

        release.notify_one();
        first.await.unwrap().unwrap();
        assert!(desk.in_flight().is_none());

        // the gate stays up; hand the next call its permit up front
        release.notify_one();
        desk.reject("a").await.unwrap();
        assert_eq!(desk.find("a").unwrap().status(), ReviewStatus::Rejected);
    }
    fn stats_calls(api: &FakeApi) -> usize {
        api.calls().iter().filter(|c| **c == Call::Stats).count()
    }

    fn list_calls(api: &FakeApi) -> usize {
        api.calls().iter().filter(|c| matches!(c, Call::List(_))).count()
    }

    #[test]
    fn test_older_stats_generation_is_dropped() {
        let mut state = DeskState::default();
        let fresh = StatsSnapshot::derived(&sample(), &Utc::now());
        let stale = StatsSnapshot::derived(&[], &Utc::now());

        assert!(state.offer_stats(2, fresh.clone()));
        assert!(!state.offer_stats(1, stale));
        assert_eq!(state.stats, Some(fresh));
    }

    #[tokio::test]
    async fn test_slow_stats_refresh_cannot_overwrite_newer_one() {
        let api = Arc::new(FakeApi::new(sample()));
        let desk = controller(api.clone(), PresetPrompt::default()).await;
        api.script_stats(StdDuration::from_millis(300), 100);
        api.script_stats(StdDuration::ZERO, 200);

        desk.approve("a").await.unwrap();
        // let the first refresh pick up the slow reply before superseding it
        while stats_calls(&api) < 2 {
            tokio::task::yield_now().await;
        }
        desk.approve("b").await.unwrap();
        desk.settle().await;
        assert_eq!(desk.stats().unwrap().stats.total_users, 200);

        tokio::time::sleep(StdDuration::from_millis(450)).await;
        assert_eq!(desk.stats().unwrap().stats.total_users, 200);
    }

    #[tokio::test]
    async fn test_refresh_refused_while_action_outstanding() {
        let api = Arc::new(FakeApi::new(sample()));
        let desk = Arc::new(controller(api.clone(), PresetPrompt::default()).await);
        let release = api.hold_actions();

        let first = tokio::spawn({
            let desk = Arc::clone(&desk);
            async move { desk.approve("a").await }
        });
        while api.action_calls().is_empty() {
            tokio::task::yield_now().await;
        }

        let err = desk.refresh(500).await.unwrap_err();
        assert!(matches!(err, AppError::ActionInProgress { ref id } if id == "a"));
        assert_eq!(list_calls(&api), 1);

        release.notify_one();
        let outcome = first.await.unwrap().unwrap();
        assert!(matches!(outcome, ActionOutcome::Approved(ref s) if s.id == "a"));
        assert_eq!(desk.find("a").unwrap().status(), ReviewStatus::Approved);

        desk.settle().await;
        assert_eq!(desk.stats().unwrap().source, StatsSource::Remote);
    }

    #[tokio::test]
    async fn test_action_refused_while_reloading() {
        let api = Arc::new(FakeApi::new(sample()));
        let desk = Arc::new(controller(api.clone(), PresetPrompt::default()).await);
        let hold = api.hold_listing();

        let reload = tokio::spawn({
            let desk = Arc::clone(&desk);
            async move { desk.refresh(500).await }
        });
        while list_calls(&api) < 2 {
            tokio::task::yield_now().await;
        }

        assert!(matches!(desk.approve("a").await, Err(AppError::RefreshInProgress)));
        assert!(desk.in_flight().is_none());
        assert!(api.action_calls().is_empty());

        hold.notify_one();
        reload.await.unwrap().unwrap();
        desk.approve("a").await.unwrap();
        assert_eq!(desk.find("a").unwrap().status(), ReviewStatus::Approved);
    }

    #[tokio::test]
    async fn test_acknowledged_action_survives_cache_change() {
        let api = Arc::new(FakeApi::new(sample()));
        let desk = Arc::new(controller(api.clone(), PresetPrompt::default()).await);
        let release = api.hold_actions();

        let first = tokio::spawn({
            let desk = Arc::clone(&desk);
            async move { desk.approve("a").await }
        });
        while api.action_calls().is_empty() {
            tokio::task::yield_now().await;
        }
        write(&desk.state).submissions.retain(|s| s.id != "a");

        release.notify_one();
        let outcome = first.await.unwrap().unwrap();
        assert!(matches!(
            outcome,
            ActionOutcome::Approved(ref s) if s.id == "a" && s.status() == ReviewStatus::Approved
        ));
        assert!(desk.find("a").is_none());

        desk.settle().await;
        assert_eq!(stats_calls(&api), 2);
    }
}
