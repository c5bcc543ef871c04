//! The session bootstrap controller.
//!
//! Mounted once per screen guard. It is the only writer of the session
//! channel: it turns identity-provider reports into session states, and under
//! the authenticated-area guard it requests an anonymous session whenever it
//! observes that there is none.
//!
//! ```text
//!            provider report
//! Resolving ─────────────────┬──► NoSession ──(anonymous sign-in)──► Anonymous
//!                            ├──► Anonymous ──(email sign-in)──────► Authenticated
//!                            └──► Authenticated ──(sign-out)───────► NoSession
//! ```

use tokio::task::JoinHandle;

use crate::{
  dispatch::initiate_anonymous_sign_in,
  provider::{IdentityProvider, IdentitySubscription},
  routing::{Guard, RoutingDecision, decide},
  session::{self, IdentitySession, SessionReader, SessionWriter},
};

pub struct BootstrapController<P> {
  provider:          P,
  guard:             Guard,
  subscription:      IdentitySubscription,
  writer:            SessionWriter,
  anonymous_request: Option<JoinHandle<()>>,
}

impl<P> BootstrapController<P>
where
  P: IdentityProvider + Clone + 'static,
{
  /// Mount a controller: subscribe to the provider and open the session
  /// channel in `Resolving`.
  pub fn new(provider: P, guard: Guard) -> (Self, SessionReader) {
    let subscription = provider.subscribe();
    let (writer, reader) = session::channel();
    let controller = Self {
      provider,
      guard,
      subscription,
      writer,
      anonymous_request: None,
    };
    (controller, reader)
  }

  /// Mount a controller and run it on the tokio runtime.
  pub fn spawn(provider: P, guard: Guard) -> (SessionReader, JoinHandle<()>) {
    let (controller, reader) = Self::new(provider, guard);
    (reader, tokio::spawn(controller.run()))
  }

  /// Consume provider reports until the provider goes away.
  pub async fn run(mut self) {
    while let Some(report) = self.subscription.next().await {
      self.observe(report);
    }
    tracing::debug!(guard = ?self.guard, "identity subscription closed");
  }

  /// Apply one report and act on the resulting routing decision.
  pub fn observe(&mut self, report: Option<IdentitySession>) -> RoutingDecision {
    let state    = self.writer.apply(report);
    let decision = decide(self.guard, state.phase());
    if decision.bootstrap_anonymous {
      self.bootstrap_anonymous();
    }
    decision
  }

  fn bootstrap_anonymous(&mut self) {
    let outstanding = self
      .anonymous_request
      .as_ref()
      .is_some_and(|request| !request.is_finished());
    if outstanding {
      tracing::debug!("anonymous sign-in already outstanding");
      return;
    }
    tracing::debug!("no session; requesting an anonymous one");
    self.anonymous_request = Some(initiate_anonymous_sign_in(&self.provider));
  }
}
