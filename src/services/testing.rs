//! In-memory `ReviewApi` double for service tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use crate::api::{ReviewApi, ReviewDecision};
use crate::error::{AppError, Result};
use crate::models::{AdminStats, ReviewStatus, Submission};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Stats,
    List(usize),
    Review(String, ReviewStatus, Option<String>),
    Delete(String),
}

#[derive(Default)]
struct Switches {
    fail_stats: bool,
    fail_list: bool,
    reject_token: bool,
    fail_actions: Option<String>,
    gate: Option<Arc<Notify>>,
    list_gate: Option<Arc<Notify>>,
    stats_script: VecDeque<(Duration, u64)>,
}

pub struct FakeApi {
    submissions: Vec<Submission>,
    calls: Mutex<Vec<Call>>,
    switches: Mutex<Switches>,
}

impl FakeApi {
    pub fn new(submissions: Vec<Submission>) -> Self {
        Self {
            submissions,
            calls: Mutex::new(Vec::new()),
            switches: Mutex::new(Switches::default()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn action_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Review(..) | Call::Delete(_)))
            .collect()
    }

    pub fn fail_stats(&self, on: bool) {
        self.switches.lock().unwrap().fail_stats = on;
    }

    pub fn fail_list(&self, on: bool) {
        self.switches.lock().unwrap().fail_list = on;
    }

    pub fn reject_token(&self, on: bool) {
        self.switches.lock().unwrap().reject_token = on;
    }

    pub fn fail_actions(&self, message: Option<&str>) {
        self.switches.lock().unwrap().fail_actions = message.map(str::to_string);
    }

    /// Park every review/delete call until the returned handle is notified.
    pub fn hold_actions(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.switches.lock().unwrap().gate = Some(Arc::clone(&gate));
        gate
    }

    /// Park every listing call until the returned handle is notified.
    pub fn hold_listing(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.switches.lock().unwrap().list_gate = Some(Arc::clone(&gate));
        gate
    }

    /// Queue a reply for the next unscripted stats call: answer after
    /// `delay` with `total_users` set to the given marker.
    pub fn script_stats(&self, delay: Duration, total_users: u64) {
        self.switches
            .lock()
            .unwrap()
            .stats_script
            .push_back((delay, total_users));
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check_token(&self) -> Result<()> {
        if self.switches.lock().unwrap().reject_token {
            Err(AppError::Unauthorized)
        } else {
            Ok(())
        }
    }

    async fn finish_action(&self) -> Result<()> {
        let gate = self.switches.lock().unwrap().gate.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.check_token()?;
        match self.switches.lock().unwrap().fail_actions.clone() {
            Some(message) => Err(AppError::action(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ReviewApi for FakeApi {
    async fn admin_stats(&self, _token: &str) -> Result<AdminStats> {
        self.record(Call::Stats);
        self.check_token()?;
        if self.switches.lock().unwrap().fail_stats {
            return Err(AppError::stats("API returned 500 Internal Server Error"));
        }
        let scripted = self.switches.lock().unwrap().stats_script.pop_front();
        let mut stats = AdminStats::derive(&self.submissions, &Utc::now());
        stats.total_users = 7;
        if let Some((delay, total_users)) = scripted {
            tokio::time::sleep(delay).await;
            stats.total_users = total_users;
        }
        Ok(stats)
    }

    async fn submissions(&self, _token: &str, limit: usize) -> Result<Vec<Submission>> {
        self.record(Call::List(limit));
        let gate = self.switches.lock().unwrap().list_gate.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.check_token()?;
        if self.switches.lock().unwrap().fail_list {
            return Err(AppError::submissions("API returned 500 Internal Server Error"));
        }
        Ok(self.submissions.iter().take(limit).cloned().collect())
    }

    async fn review(&self, _token: &str, id: &str, decision: &ReviewDecision) -> Result<()> {
        self.record(Call::Review(
            id.to_string(),
            decision.status,
            decision.rejection_note.clone(),
        ));
        self.finish_action().await
    }

    async fn delete(&self, _token: &str, id: &str) -> Result<()> {
        self.record(Call::Delete(id.to_string()));
        self.finish_action().await
    }
}
