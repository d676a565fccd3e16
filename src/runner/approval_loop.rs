//! Approval loop - propose, evaluate, execute, re-observe.
//!
//! Each round asks the proposer for one action, asks the evaluator to judge
//! it, and only then hands an approved action to the executor. Whatever
//! happens is folded into the rolling context the proposer sees next round.
//! The loop stops when an approved COMPLETED arrives or the round budget is
//! spent.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use crate::agent::{Evaluator, Proposer};
use crate::config::Config;
use crate::domain::{ActionType, GateDecision, LoopEvent, LoopOutcome, LoopState, RoundRecord, Session};
use crate::error::{GatewayError, Result};
use crate::gateway::SandboxedExecutor;
use crate::snapshot::{Snapshotter, TreeSnapshot};

/// Knobs for one approval loop.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Deadline around each proposer and evaluator call
    pub call_timeout: Option<Duration>,
    /// Cap on OPEN_FILE content folded into the rolling context
    pub context_content_bytes: usize,
    pub snapshot_max_bytes: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for LoopConfig {
    fn from(config: &Config) -> Self {
        Self {
            call_timeout: config.session.call_timeout(),
            context_content_bytes: config.session.context_content_bytes,
            snapshot_max_bytes: config.snapshot.max_bytes,
        }
    }
}

/// What a finished session looked like.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: String,
    pub outcome: LoopOutcome,
    /// Propose/evaluate cycles run
    pub rounds: u32,
    /// Successful WRITE_FILE, EDIT_FILE and DELETE_FILE executions
    pub mutations: u32,
    pub transcript: Vec<RoundRecord>,
    pub rolling_context: String,
}

impl SessionReport {
    /// Exhausted sessions need a human to decide what happens next
    pub fn requires_review(&self) -> bool {
        self.outcome.requires_review()
    }
}

/// Sequences proposer, evaluator and executor for one goal at a time.
///
/// The loop assumes it is the only writer under `repo_root` for the whole
/// session and takes no locks. Modifying the tree from elsewhere while a
/// session runs is undefined behaviour: proposals, snapshots and patches may
/// describe a tree that no longer exists.
pub struct ApprovalLoop {
    proposer: Arc<dyn Proposer>,
    evaluator: Arc<dyn Evaluator>,
    executor: SandboxedExecutor,
    snapshotter: Arc<dyn Snapshotter>,
    config: LoopConfig,
    events: Option<UnboundedSender<LoopEvent>>,
}

impl ApprovalLoop {
    pub fn new(proposer: Arc<dyn Proposer>, evaluator: Arc<dyn Evaluator>) -> Self {
        Self {
            proposer,
            evaluator,
            executor: SandboxedExecutor::default(),
            snapshotter: Arc::new(TreeSnapshot::default()),
            config: LoopConfig::default(),
            events: None,
        }
    }

    pub fn with_executor(mut self, executor: SandboxedExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_snapshotter(mut self, snapshotter: Arc<dyn Snapshotter>) -> Self {
        self.snapshotter = snapshotter;
        self
    }

    pub fn with_config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    /// Stream every round's events to `events` as they happen
    pub fn with_events(mut self, events: UnboundedSender<LoopEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Work `goal` against `repo_root` for at most `max_rounds` rounds.
    ///
    /// Only an unusable setup is an error. Failed proposals, declines and
    /// failed executions all end up in the report.
    pub async fn run(&self, goal: &str, repo_root: &Path, max_rounds: u32) -> Result<SessionReport> {
        if max_rounds == 0 {
            return Err(GatewayError::InvalidConfig("max_rounds must be at least 1".to_string()));
        }
        let root = repo_root.canonicalize().map_err(|e| {
            GatewayError::InvalidConfig(format!("repository root {} is not accessible: {}", repo_root.display(), e))
        })?;
        if !root.is_dir() {
            return Err(GatewayError::InvalidConfig(format!(
                "repository root {} is not a directory",
                root.display()
            )));
        }

        let mut session = Session::new(goal, root, max_rounds);
        tracing::info!(
            session_id = %session.id,
            repo_root = %session.repo_root.display(),
            max_rounds,
            "Session started: {}",
            goal
        );

        let mut snapshot = self.snapshot(&session.repo_root).await;
        let mut transcript = Vec::new();
        let mut mutations = 0;

        let outcome = loop {
            session.round += 1;
            let round = session.round;
            self.emit(LoopEvent::RoundStarted {
                session_id: session.id.clone(),
                round,
            });
            let mut record = RoundRecord::new(round);

            let proposed = self
                .bounded(
                    "proposer",
                    self.proposer.propose(&session.goal, &session.rolling_context, &snapshot),
                )
                .await
                .and_then(|p| p.validate().map(|_| p));

            match proposed {
                Err(e) => {
                    tracing::warn!(session_id = %session.id, round, error = %e, "Proposal failed");
                    session.note(format!("Proposal failed: {}; try again", e));
                    record.failure = Some(e.to_string());
                    self.emit(LoopEvent::ProposalFailed {
                        round,
                        error: e.to_string(),
                    });
                    session.transition(LoopState::Skipped);
                }
                Ok(proposal) => {
                    tracing::info!(
                        session_id = %session.id,
                        round,
                        action = %proposal.action_type,
                        target = %proposal.target,
                        "Proposed: {}",
                        proposal.rationale
                    );
                    self.emit(LoopEvent::Proposed {
                        round,
                        proposal: proposal.clone(),
                    });
                    record.proposal = Some(proposal.clone());
                    session.transition(LoopState::AwaitingDecision);

                    let decision = match self
                        .bounded("evaluator", self.evaluator.evaluate(&session.goal, &snapshot, &proposal))
                        .await
                    {
                        Ok(decision) => decision,
                        Err(e) => {
                            tracing::warn!(session_id = %session.id, round, error = %e, "Evaluator failed, declining");
                            record.failure = Some(e.to_string());
                            GateDecision::decline(format!("evaluator unavailable ({})", e))
                        }
                    };
                    tracing::info!(
                        session_id = %session.id,
                        round,
                        decision = %decision.decision,
                        "Decided: {}",
                        decision.rationale
                    );
                    self.emit(LoopEvent::Decided {
                        round,
                        decision: decision.clone(),
                    });
                    record.decision = Some(decision.clone());

                    if !decision.is_approved() {
                        session.note(format!(
                            "{} declined: {}; try again",
                            proposal.action_type, decision.rationale
                        ));
                        session.transition(LoopState::Skipped);
                    } else if proposal.action_type == ActionType::Completed {
                        session.transition(LoopState::Completed);
                        transcript.push(record);
                        break LoopOutcome::Completed;
                    } else {
                        session.transition(LoopState::Executing);
                        let result = self
                            .executor
                            .execute(
                                proposal.action_type,
                                &proposal.target,
                                &session.repo_root,
                                &proposal.payload,
                            )
                            .await;
                        if result.ok && proposal.action_type.is_mutation() {
                            mutations += 1;
                        }
                        tracing::info!(
                            session_id = %session.id,
                            round,
                            ok = result.ok,
                            error = result.error.as_deref().unwrap_or(""),
                            "Executed {}",
                            proposal
                        );
                        session.note(result.summary(self.config.context_content_bytes));
                        self.emit(LoopEvent::Executed {
                            round,
                            result: result.clone(),
                        });
                        record.result = Some(result);
                        snapshot = self.snapshot(&session.repo_root).await;
                    }
                }
            }

            transcript.push(record);
            if session.budget_spent() {
                session.transition(LoopState::Exhausted);
                break LoopOutcome::Exhausted;
            }
            session.transition(LoopState::AwaitingProposal);
        };

        match outcome {
            LoopOutcome::Completed => {
                tracing::info!(session_id = %session.id, rounds = session.round, mutations, "Session completed");
            }
            LoopOutcome::Exhausted => {
                tracing::warn!(
                    session_id = %session.id,
                    rounds = session.round,
                    mutations,
                    "Round budget exhausted; further action requires human review"
                );
            }
        }
        self.emit(LoopEvent::Finished {
            session_id: session.id.clone(),
            outcome,
            rounds: session.round,
            mutations,
        });

        Ok(SessionReport {
            session_id: session.id,
            outcome,
            rounds: session.round,
            mutations,
            transcript,
            rolling_context: session.rolling_context,
        })
    }

    async fn bounded<T>(&self, call: &'static str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match self.config.call_timeout {
            Some(timeout) => tokio::time::timeout(timeout, fut)
                .await
                .map_err(|_| GatewayError::Timeout { call, timeout })?,
            None => fut.await,
        }
    }

    async fn snapshot(&self, root: &Path) -> String {
        let snapshotter = self.snapshotter.clone();
        let root = root.to_path_buf();
        let max_bytes = self.config.snapshot_max_bytes;

        tokio::task::spawn_blocking(move || snapshotter.summarize(&root, max_bytes))
            .await
            .unwrap_or_else(|e| {
                log::error!("Snapshot task failed: {}", e);
                String::new()
            })
    }

    fn emit(&self, event: LoopEvent) {
        if let Some(events) = &self.events {
            // Nobody listening is fine
            let _ = events.send(event);
        }
    }
}
