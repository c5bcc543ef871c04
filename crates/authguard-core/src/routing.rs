//! Routes and the routing policy applied to the session state.
//!
//! Every screen that reacts to the identity state goes through [`decide`];
//! nothing else inspects the session phase to navigate.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, session::SessionPhase};

// ─── Routes ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Route {
  Root,
  Login,
  Dashboard,
  Users,
  Architecture,
  Database,
  Functions,
  SecurityRules,
  MfaFlow,
  Integration,
  ThreatModel,
}

impl Route {
  pub const ALL: [Route; 11] = [
    Route::Root,
    Route::Login,
    Route::Dashboard,
    Route::Users,
    Route::Architecture,
    Route::Database,
    Route::Functions,
    Route::SecurityRules,
    Route::MfaFlow,
    Route::Integration,
    Route::ThreatModel,
  ];

  pub fn path(self) -> &'static str {
    match self {
      Route::Root => "/",
      Route::Login => "/login",
      Route::Dashboard => "/dashboard",
      Route::Users => "/users",
      Route::Architecture => "/architecture",
      Route::Database => "/database",
      Route::Functions => "/functions",
      Route::SecurityRules => "/security-rules",
      Route::MfaFlow => "/mfa-flow",
      Route::Integration => "/integration",
      Route::ThreatModel => "/threat-model",
    }
  }

  /// Whether this route lives inside the authenticated area.
  pub fn in_app_area(self) -> bool { !matches!(self, Route::Root | Route::Login) }

  /// The guard protecting this route.
  pub fn guard(self) -> Guard {
    match self {
      Route::Root => Guard::Root,
      Route::Login => Guard::LoginPage,
      _ => Guard::AppArea,
    }
  }
}

impl fmt::Display for Route {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.path()) }
}

impl FromStr for Route {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let normalised = match s.trim_end_matches('/') {
      "" => "/",
      other => other,
    };
    Route::ALL
      .into_iter()
      .find(|r| r.path() == normalised)
      .ok_or_else(|| Error::UnknownRoute(s.to_owned()))
  }
}

// ─── Policy ──────────────────────────────────────────────────────────────────

/// The call sites that apply the routing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
  /// The application's entry point.
  Root,
  /// The layout wrapping every authenticated-area screen.
  AppArea,
  /// The login screen itself.
  LoginPage,
}

/// The single navigation outcome for a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAction {
  RenderLoading,
  /// Show the screen the guard protects.
  RenderPage,
  Redirect(Route),
}

/// A navigation action plus the anonymous-bootstrap side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingDecision {
  pub action:              RouteAction,
  /// Dispatch a fire-and-forget anonymous sign-in.
  pub bootstrap_anonymous: bool,
}

impl RoutingDecision {
  const fn navigate(action: RouteAction) -> Self {
    Self { action, bootstrap_anonymous: false }
  }
}

/// Decide what `guard` does in `phase`.
pub fn decide(guard: Guard, phase: SessionPhase) -> RoutingDecision {
  use RouteAction::*;
  use SessionPhase::*;

  match (guard, phase) {
    (_, Resolving) => RoutingDecision::navigate(RenderLoading),
    (_, Authenticated) => RoutingDecision::navigate(Redirect(Route::Dashboard)),
    (Guard::LoginPage, Anonymous | NoSession) => RoutingDecision::navigate(RenderPage),
    (Guard::Root, Anonymous | NoSession) | (Guard::AppArea, Anonymous) => {
      RoutingDecision::navigate(Redirect(Route::Login))
    }
    (Guard::AppArea, NoSession) => RoutingDecision {
      action:              Redirect(Route::Login),
      bootstrap_anonymous: true,
    },
  }
}

/// Where the user ends up after `action` while `current` is displayed.
///
/// A redirect to the dashboard is already satisfied by any screen inside the
/// authenticated area.
pub fn destination(current: Route, action: RouteAction) -> Option<Route> {
  match action {
    RouteAction::RenderLoading => None,
    RouteAction::RenderPage => Some(current),
    RouteAction::Redirect(Route::Dashboard) if current.in_app_area() => Some(current),
    RouteAction::Redirect(target) => Some(target),
  }
}
