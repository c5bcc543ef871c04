//! Document-store records: users, authentication events, security policies.
//!
//! These records carry no behaviour; they are read and displayed verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

// ─── Users ───────────────────────────────────────────────────────────────────

/// A row in the `users` collection, keyed by the account's subject id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
  pub id:              Uuid,
  pub email:           String,
  pub mfa_enabled:     bool,
  pub last_login:      Option<DateTime<Utc>>,
  /// Consecutive failed sign-ins. Displayed only; nothing enforces a limit.
  pub failed_attempts: u32,
}

impl UserRecord {
  pub fn new(id: Uuid, email: impl Into<String>) -> Self {
    Self {
      id,
      email: email.into(),
      mfa_enabled: false,
      last_login: None,
      failed_attempts: 0,
    }
  }

  /// The part of the email before `@`, used as a display name.
  pub fn display_name(&self) -> &str {
    self.email.split_once('@').map_or(self.email.as_str(), |(local, _)| local)
  }
}

/// The outcome of a sign-in attempt, as applied to a [`UserRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
  Succeeded,
  Failed,
}

// ─── Auth logs ───────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuthLogStatus {
  Success,
  Failure,
  ThreatDetected,
}

/// An append-only authentication event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthLogRecord {
  pub id:              Uuid,
  /// `None` when the attempt named an unknown account.
  pub user_id:         Option<Uuid>,
  pub timestamp:       DateTime<Utc>,
  pub method_used:     String,
  pub ip:              String,
  pub status:          AuthLogStatus,
  pub threat_detected: bool,
}

/// Input for appending an auth-log event. The store assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAuthLog {
  pub user_id:         Option<Uuid>,
  /// Defaults to the time the store receives the event.
  #[serde(default)]
  pub timestamp:       Option<DateTime<Utc>>,
  pub method_used:     String,
  pub ip:              String,
  pub status:          AuthLogStatus,
  #[serde(default)]
  pub threat_detected: bool,
}

// ─── Policies ────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
  Low,
  Medium,
  High,
  Critical,
}

/// A security-policy document, e.g. `RATE_LIMIT_LOGIN = 5`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityPolicy {
  pub id:          Uuid,
  pub rule:        String,
  pub severity:    Severity,
  pub value:       serde_json::Value,
  pub description: String,
}

/// Input for storing a policy. The store assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPolicy {
  pub rule:        String,
  pub severity:    Severity,
  pub value:       serde_json::Value,
  pub description: String,
}

// ─── Dashboard ───────────────────────────────────────────────────────────────

/// How many events the dashboard's activity feed shows.
pub const RECENT_EVENT_COUNT: usize = 5;

/// The headline numbers on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
  pub total_users:         usize,
  /// Share of users with MFA enabled, rounded to a whole percent.
  pub mfa_enabled_percent: u32,
  pub logins_24h:          usize,
  pub failed_24h:          usize,
  pub threats_24h:         usize,
  pub recent_events:       Vec<AuthLogRecord>,
}

impl DashboardSummary {
  /// Summarise `users` and `logs`. `logs` must be newest first.
  pub fn from_records(users: &[UserRecord], logs: &[AuthLogRecord], now: DateTime<Utc>) -> Self {
    let mfa_enabled = users.iter().filter(|u| u.mfa_enabled).count();
    let mfa_enabled_percent = if users.is_empty() {
      0
    } else {
      (mfa_enabled as f64 * 100.0 / users.len() as f64).round() as u32
    };

    let since = now - chrono::Duration::hours(24);
    let window: Vec<_> = logs.iter().filter(|l| l.timestamp > since).collect();

    Self {
      total_users: users.len(),
      mfa_enabled_percent,
      logins_24h: window.len(),
      failed_24h: window.iter().filter(|l| l.status == AuthLogStatus::Failure).count(),
      threats_24h: window
        .iter()
        .filter(|l| l.threat_detected || l.status == AuthLogStatus::ThreatDetected)
        .count(),
      recent_events: logs.iter().take(RECENT_EVENT_COUNT).cloned().collect(),
    }
  }
}
