//! The identity session and the process-wide session channel.
//!
//! The identity provider owns the session; the application only holds a
//! read-only, live-updating view of it. That view is a single typed channel
//! with exactly one writer ([`SessionWriter`], held by the bootstrap
//! controller) and any number of readers ([`SessionReader`]).

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

use crate::routing::{Guard, RoutingDecision, decide};

// ─── Identity session ────────────────────────────────────────────────────────

/// A provider-issued session, anonymous or tied to real credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySession {
  pub subject_id:   Uuid,
  pub is_anonymous: bool,
  /// Present for credential-backed sessions only.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email:        Option<String>,
}

impl IdentitySession {
  pub fn anonymous(subject_id: Uuid) -> Self {
    Self { subject_id, is_anonymous: true, email: None }
  }

  pub fn authenticated(subject_id: Uuid, email: impl Into<String>) -> Self {
    Self { subject_id, is_anonymous: false, email: Some(email.into()) }
  }
}

// ─── Phase ───────────────────────────────────────────────────────────────────

/// The four states of the session bootstrap state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
  /// The provider has not reported yet.
  Resolving,
  NoSession,
  Anonymous,
  Authenticated,
}

impl SessionPhase {
  /// Classify a provider report.
  pub fn of(report: Option<&IdentitySession>) -> Self {
    match report {
      None => Self::NoSession,
      Some(s) if s.is_anonymous => Self::Anonymous,
      Some(_) => Self::Authenticated,
    }
  }
}

/// A snapshot of the application's view of the identity session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
  phase:   SessionPhase,
  session: Option<IdentitySession>,
}

impl SessionState {
  /// The state every application instance starts in.
  pub fn resolving() -> Self {
    Self { phase: SessionPhase::Resolving, session: None }
  }

  /// The state after a provider report. Never yields `Resolving`.
  pub fn resolved(report: Option<IdentitySession>) -> Self {
    Self { phase: SessionPhase::of(report.as_ref()), session: report }
  }

  pub fn phase(&self) -> SessionPhase { self.phase }

  pub fn session(&self) -> Option<&IdentitySession> { self.session.as_ref() }

  pub fn is_loading(&self) -> bool { self.phase == SessionPhase::Resolving }

  pub fn subject_id(&self) -> Option<Uuid> {
    self.session.as_ref().map(|s| s.subject_id)
  }

  pub fn is_anonymous(&self) -> bool {
    self.session.as_ref().is_some_and(|s| s.is_anonymous)
  }
}

/// One observed move of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
  pub from: SessionPhase,
  pub to:   SessionPhase,
}

// ─── Channel ─────────────────────────────────────────────────────────────────

const TRANSITION_BUFFER: usize = 32;

/// Create the session channel. The writer starts in
/// [`SessionPhase::Resolving`].
pub fn channel() -> (SessionWriter, SessionReader) {
  let (state, rx) = watch::channel(SessionState::resolving());
  let (transitions, _) = broadcast::channel(TRANSITION_BUFFER);
  let reader = SessionReader { rx, transitions: transitions.clone() };
  (SessionWriter { state, transitions }, reader)
}

/// The single writer of the session channel. Not `Clone`.
#[derive(Debug)]
pub struct SessionWriter {
  state:       watch::Sender<SessionState>,
  transitions: broadcast::Sender<Transition>,
}

impl SessionWriter {
  /// Apply a provider report and return the resulting state.
  ///
  /// Reports only ever produce resolved phases, so once the first report has
  /// been applied `is_loading` stays false for the rest of the channel's life.
  pub fn apply(&self, report: Option<IdentitySession>) -> SessionState {
    let next = SessionState::resolved(report);
    let from = self.state.borrow().phase;
    self.state.send_replace(next.clone());

    let transition = Transition { from, to: next.phase };
    tracing::debug!(?transition.from, ?transition.to, "session transition");
    // No subscribers is fine.
    let _ = self.transitions.send(transition);
    next
  }

  pub fn current(&self) -> SessionState { self.state.borrow().clone() }
}

/// A cheap, cloneable read handle on the session channel.
#[derive(Debug, Clone)]
pub struct SessionReader {
  rx:          watch::Receiver<SessionState>,
  transitions: broadcast::Sender<Transition>,
}

impl SessionReader {
  pub fn current(&self) -> SessionState { self.rx.borrow().clone() }

  /// Routing decision for the current state under `guard`.
  pub fn decision(&self, guard: Guard) -> RoutingDecision {
    decide(guard, self.rx.borrow().phase)
  }

  /// Wait for the next state change. Returns `None` once the writer is gone.
  pub async fn changed(&mut self) -> Option<SessionState> {
    self.rx.changed().await.ok()?;
    Some(self.rx.borrow_and_update().clone())
  }

  /// Wait until the first provider report has been applied.
  pub async fn resolved(&mut self) -> Option<SessionState> {
    self.wait_for(|s| !s.is_loading()).await
  }

  /// Wait until `predicate` holds for the current state.
  pub async fn wait_for(
    &mut self,
    predicate: impl FnMut(&SessionState) -> bool,
  ) -> Option<SessionState> {
    let state = self.rx.wait_for(predicate).await.ok()?;
    Some(state.clone())
  }

  /// Receive every transition from now on, in order.
  pub fn transitions(&self) -> broadcast::Receiver<Transition> {
    self.transitions.subscribe()
  }
}
