//! The improve → share → publish workflow of one editing session.
//!
//! Every user action is split into a `begin_*` call, which validates the
//! request and moves into an in-flight stage, and a `complete_*` call that
//! consumes the backend result. A failed action rolls back to the stage it
//! started from and records the message in the error slot; nothing here
//! performs I/O.
//!
//! ```text
//! Idle ─improve→ Improving ─ok→ Improved ─share→ Sharing ─ok→ Shared ─publish→ Publishing ─ok→ Published
//!  ↑                 │err           ↑                │err        ↑                   │err
//!  └─────────────────┘              └────────────────┘           └───────────────────┘
//! ```

use std::fmt;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::diff::{self, DiffSegment};
use crate::view::Route;

/// How long a share/publish notice stays visible.
pub const NOTICE_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Improving,
    Improved,
    Sharing,
    Shared,
    Publishing,
    Published,
}

impl Stage {
    /// True while a backend request issued by this workflow is outstanding.
    pub fn is_in_flight(self) -> bool {
        matches!(self, Stage::Improving | Stage::Sharing | Stage::Publishing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Improving => "improving",
            Stage::Improved => "improved",
            Stage::Sharing => "sharing",
            Stage::Shared => "shared",
            Stage::Publishing => "publishing",
            Stage::Published => "published",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-triggered actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Improve,
    Share,
    Publish,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Improve => "improve",
            Action::Share => "share",
            Action::Publish => "publish",
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Please enter your OpenAI API key.")]
    MissingCredential,
    #[error("Please enter a prompt to improve.")]
    MissingPrompt,
    #[error("You must have an original and an improved prompt to share.")]
    NothingToShare,
    /// Backend or transport failure, carrying the user-facing message.
    #[error("{0}")]
    Remote(String),
    /// The action's control is disabled in this stage. Never recorded.
    #[error("cannot {action} while {stage}")]
    InvalidTransition { action: Action, stage: Stage },
    /// Another request is still in flight. Never recorded.
    #[error("a request is already in flight ({0})")]
    Busy(Stage),
}

impl WorkflowError {
    /// Errors caught before any network call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            WorkflowError::MissingCredential
                | WorkflowError::MissingPrompt
                | WorkflowError::NothingToShare
        )
    }
}

/// A created share record and its public link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub id: String,
    pub url: String,
}

/// A transient confirmation; purely cosmetic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub raised_at: Instant,
}

impl Notice {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.raised_at) >= NOTICE_TTL
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImproveRequest {
    pub ticket: u64,
    pub prompt: String,
    pub credential: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareRequest {
    pub ticket: u64,
    pub original: String,
    pub improved: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub ticket: u64,
    pub share_id: String,
}

/// Client-local state of one editing session.
#[derive(Debug, Clone)]
pub struct Workflow {
    origin: String,
    prompt: String,
    improved: Option<String>,
    share: Option<ShareLink>,
    published: bool,
    stage: Stage,
    error: Option<WorkflowError>,
    notice: Option<Notice>,
    next_ticket: u64,
    in_flight: Option<u64>,
}

impl Workflow {
    /// `origin` is the public base URL share links are derived from.
    pub fn new(origin: impl Into<String>) -> Self {
        let origin: String = origin.into();
        Self {
            origin: origin.trim_end_matches('/').to_string(),
            prompt: String::new(),
            improved: None,
            share: None,
            published: false,
            stage: Stage::Idle,
            error: None,
            notice: None,
            next_ticket: 1,
            in_flight: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Edit the original prompt. Does not invalidate an existing improvement.
    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn improved(&self) -> Option<&str> {
        self.improved.as_deref()
    }

    pub fn share_link(&self) -> Option<&ShareLink> {
        self.share.as_ref()
    }

    pub fn is_published(&self) -> bool {
        self.published
    }

    pub fn error(&self) -> Option<&WorkflowError> {
        self.error.as_ref()
    }

    /// Diff of the current prompt against the improvement, once there is one.
    pub fn diff(&self) -> Option<Vec<DiffSegment>> {
        self.improved
            .as_deref()
            .map(|improved| diff::render(&self.prompt, improved))
    }

    /// The notice, unless it has outlived [`NOTICE_TTL`].
    pub fn active_notice(&self, now: Instant) -> Option<&Notice> {
        self.notice.as_ref().filter(|n| !n.is_expired(now))
    }

    pub fn dismiss_expired(&mut self, now: Instant) {
        if self.notice.as_ref().is_some_and(|n| n.is_expired(now)) {
            self.notice = None;
        }
    }

    // ── Improve ──

    pub fn begin_improve(&mut self, credential: &str) -> Result<ImproveRequest, WorkflowError> {
        self.ensure_idle_controls()?;
        if credential.is_empty() {
            return self.reject(WorkflowError::MissingCredential);
        }
        if self.prompt.is_empty() {
            return self.reject(WorkflowError::MissingPrompt);
        }

        // A new improvement invalidates any previous share.
        self.improved = None;
        self.clear_share();
        let ticket = self.enter(Stage::Improving);
        Ok(ImproveRequest {
            ticket,
            prompt: self.prompt.clone(),
            credential: credential.to_string(),
        })
    }

    /// Returns false when the completion is stale and was ignored.
    pub fn complete_improve<E: fmt::Display>(
        &mut self,
        ticket: u64,
        outcome: Result<String, E>,
    ) -> bool {
        if !self.accept(ticket, Stage::Improving) {
            return false;
        }
        match outcome {
            Ok(text) => {
                self.improved = Some(text);
                self.transition(Stage::Improved);
            }
            Err(e) => {
                self.improved = None;
                self.clear_share();
                self.fail(Stage::Idle, e);
            }
        }
        true
    }

    // ── Share ──

    pub fn begin_share(&mut self) -> Result<ShareRequest, WorkflowError> {
        self.ensure_idle_controls()?;
        if self.stage != Stage::Improved {
            return Err(WorkflowError::InvalidTransition {
                action: Action::Share,
                stage: self.stage,
            });
        }
        let improved = self.improved.clone().unwrap_or_default();
        if self.prompt.is_empty() || improved.is_empty() {
            return self.reject(WorkflowError::NothingToShare);
        }

        let ticket = self.enter(Stage::Sharing);
        Ok(ShareRequest {
            ticket,
            original: self.prompt.clone(),
            improved,
        })
    }

    pub fn complete_share<E: fmt::Display>(
        &mut self,
        ticket: u64,
        outcome: Result<String, E>,
    ) -> bool {
        if !self.accept(ticket, Stage::Sharing) {
            return false;
        }
        match outcome {
            Ok(id) => {
                let url = Route::Prompt(id.clone()).url(&self.origin);
                info!(share_id = %id, url = %url, "share link created");
                self.share = Some(ShareLink { id, url });
                self.transition(Stage::Shared);
                self.raise_notice("Share link created!");
            }
            Err(e) => self.fail(Stage::Improved, e),
        }
        true
    }

    // ── Publish ──

    pub fn begin_publish(&mut self) -> Result<PublishRequest, WorkflowError> {
        self.ensure_idle_controls()?;
        let share_id = match (&self.stage, &self.share) {
            (Stage::Shared, Some(link)) => link.id.clone(),
            _ => {
                return Err(WorkflowError::InvalidTransition {
                    action: Action::Publish,
                    stage: self.stage,
                });
            }
        };
        let ticket = self.enter(Stage::Publishing);
        Ok(PublishRequest { ticket, share_id })
    }

    pub fn complete_publish<E: fmt::Display>(
        &mut self,
        ticket: u64,
        outcome: Result<(), E>,
    ) -> bool {
        if !self.accept(ticket, Stage::Publishing) {
            return false;
        }
        match outcome {
            Ok(()) => {
                self.published = true;
                self.transition(Stage::Published);
                self.raise_notice("Published to the gallery!");
            }
            Err(e) => self.fail(Stage::Shared, e),
        }
        true
    }

    // ── Internals ──

    fn ensure_idle_controls(&self) -> Result<(), WorkflowError> {
        if self.stage.is_in_flight() {
            return Err(WorkflowError::Busy(self.stage));
        }
        Ok(())
    }

    fn reject<T>(&mut self, err: WorkflowError) -> Result<T, WorkflowError> {
        debug!(error = %err, stage = %self.stage, "action rejected");
        self.error = Some(err.clone());
        Err(err)
    }

    /// Start an action: clear the error slot, move in flight, issue a ticket.
    fn enter(&mut self, stage: Stage) -> u64 {
        self.error = None;
        self.transition(stage);
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight = Some(ticket);
        ticket
    }

    fn accept(&mut self, ticket: u64, expected: Stage) -> bool {
        if self.in_flight != Some(ticket) || self.stage != expected {
            debug!(ticket, stage = %self.stage, "ignoring stale completion");
            return false;
        }
        self.in_flight = None;
        true
    }

    fn fail<E: fmt::Display>(&mut self, rollback: Stage, err: E) {
        let message = err.to_string();
        warn!(from = %self.stage, to = %rollback, error = %message, "action failed");
        self.error = Some(WorkflowError::Remote(message));
        self.transition(rollback);
    }

    fn transition(&mut self, to: Stage) {
        debug!(from = %self.stage, to = %to, "workflow transition");
        self.stage = to;
    }

    fn clear_share(&mut self) {
        self.share = None;
        self.published = false;
    }

    fn raise_notice(&mut self, message: &str) {
        self.notice = Some(Notice {
            message: message.to_string(),
            raised_at: Instant::now(),
        });
    }
}
