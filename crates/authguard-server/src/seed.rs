//! Demo data: accounts, their user documents, sample auth events and the
//! default security policies.

use authguard_core::{
  auth_error::AuthErrorCode,
  record::{AuthLogStatus, NewAuthLog, NewPolicy, Severity},
  store::AccountStore,
};
use chrono::{Duration, Utc};
use rand_core::{OsRng, RngCore as _};
use serde_json::json;

use crate::{error::Error, identity};

pub const DEMO_PASSWORD: &str = "password123";

/// `(email, mfa_enabled)` for each demo account.
pub const DEMO_USERS: [(&str, bool); 5] = [
  ("olivia.martin@email.com", true),
  ("liam.johnson@email.com", true),
  ("noah.williams@email.com", false),
  ("emma.brown@email.com", true),
  ("svc-runner@os.local", false),
];

struct LogTemplate {
  status:          AuthLogStatus,
  method_used:     &'static str,
  ip:              &'static str,
  threat_detected: bool,
}

const LOG_TEMPLATES: [LogTemplate; 7] = [
  LogTemplate { status: AuthLogStatus::Success, method_used: "Password + OTP", ip: "192.168.1.10", threat_detected: false },
  LogTemplate { status: AuthLogStatus::Success, method_used: "Device Key",     ip: "10.0.0.5",     threat_detected: false },
  LogTemplate { status: AuthLogStatus::Failure, method_used: "Password",       ip: "203.0.113.45", threat_detected: false },
  LogTemplate { status: AuthLogStatus::Failure, method_used: "Password",       ip: "172.16.0.21",  threat_detected: true },
  LogTemplate { status: AuthLogStatus::Success, method_used: "API Token",      ip: "127.0.0.1",    threat_detected: false },
  LogTemplate { status: AuthLogStatus::Success, method_used: "Password",       ip: "192.168.1.12", threat_detected: false },
  LogTemplate { status: AuthLogStatus::Failure, method_used: "Device Key",     ip: "10.0.0.8",     threat_detected: false },
];

const MAX_EVENTS_PER_USER: u32 = 5;
const EVENT_WINDOW_SECS: u32 = 7 * 24 * 60 * 60;

pub fn default_policies() -> Vec<NewPolicy> {
  vec![
    NewPolicy {
      rule:        "RATE_LIMIT_LOGIN".into(),
      severity:    Severity::High,
      value:       json!(5),
      description: "Maximum failed sign-in attempts per minute before lockout.".into(),
    },
    NewPolicy {
      rule:        "REQUIRE_MFA_ADMIN".into(),
      severity:    Severity::Critical,
      value:       json!(true),
      description: "Administrative accounts must enrol a second factor.".into(),
    },
    NewPolicy {
      rule:        "SESSION_MAX_AGE".into(),
      severity:    Severity::Medium,
      value:       json!(3600),
      description: "Seconds before an idle session must re-authenticate.".into(),
    },
    NewPolicy {
      rule:        "PAYLOAD_MAX_BYTES".into(),
      severity:    Severity::Low,
      value:       json!(1_048_576),
      description: "Largest request body accepted by cloud functions.".into(),
    },
  ]
}

/// What a seeding run did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
  pub created:  usize,
  pub skipped:  usize,
  pub events:   usize,
  pub policies: usize,
}

/// Seed `store`. Demo accounts whose email is already registered are skipped.
pub async fn seed<S: AccountStore>(store: &S) -> Result<SeedReport, Error> {
  let mut report = SeedReport::default();
  let now = Utc::now();

  for (email, mfa_enabled) in DEMO_USERS {
    let grant = match identity::sign_up(store, email, DEMO_PASSWORD).await {
      Ok(grant) => grant,
      Err(Error::Auth(e)) if e.code == AuthErrorCode::EmailAlreadyInUse => {
        tracing::info!(%email, "demo user already exists, skipping");
        report.skipped += 1;
        continue;
      }
      Err(e) => return Err(e),
    };
    report.created += 1;
    let uid = grant.session.subject_id;

    if let Some(mut user) = store.get_user(uid).await.map_err(Error::store)? {
      user.mfa_enabled = mfa_enabled;
      user.last_login = Some(now);
      store.upsert_user(user).await.map_err(Error::store)?;
    }

    let count = 1 + OsRng.next_u32() % MAX_EVENTS_PER_USER;
    for _ in 0..count {
      let template = &LOG_TEMPLATES[OsRng.next_u32() as usize % LOG_TEMPLATES.len()];
      let age = Duration::seconds(i64::from(OsRng.next_u32() % EVENT_WINDOW_SECS));
      store
        .append_auth_log(NewAuthLog {
          user_id:         Some(uid),
          timestamp:       Some(now - age),
          method_used:     template.method_used.to_owned(),
          ip:              template.ip.to_owned(),
          status:          template.status,
          threat_detected: template.threat_detected,
        })
        .await
        .map_err(Error::store)?;
      report.events += 1;
    }
    tracing::info!(%email, %uid, events = count, "demo user created");
  }

  for policy in default_policies() {
    store.put_policy(policy).await.map_err(Error::store)?;
    report.policies += 1;
  }

  Ok(report)
}
