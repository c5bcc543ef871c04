//! Integration tests for `SqliteStore` against an in-memory database.

use authguard_core::{
  record::{AuthLogStatus, LoginOutcome, NewAuthLog, NewPolicy, Severity, UserRecord},
  store::{AccountStore, AuthLogQuery, DocumentStore, NewAccount},
};
use chrono::{Duration, TimeZone as _, Utc};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

// ─── Accounts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_find_password_account() {
  let s = store().await;

  let account = s
    .create_account(NewAccount::with_password("olivia.martin@email.com", "$argon2id$stub"))
    .await
    .unwrap()
    .unwrap();
  assert!(!account.is_anonymous);

  let by_email = s
    .find_account_by_email("olivia.martin@email.com")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(by_email.uid, account.uid);
  assert_eq!(by_email.password_hash.as_deref(), Some("$argon2id$stub"));

  let by_uid = s.get_account(account.uid).await.unwrap().unwrap();
  assert_eq!(by_uid, by_email);
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
  let s = store().await;
  let first = s
    .create_account(NewAccount::with_password("a@b.c", "h1"))
    .await
    .unwrap()
    .unwrap();

  let second = s
    .create_account(NewAccount::with_password("a@b.c", "h2"))
    .await
    .unwrap();
  assert!(second.is_none());

  let stored = s.find_account_by_email("a@b.c").await.unwrap().unwrap();
  assert_eq!(stored.uid, first.uid);
  assert_eq!(stored.password_hash.as_deref(), Some("h1"));
}

#[tokio::test]
async fn account_with_user_writes_both_rows() {
  let s = store().await;
  let (account, user) = s
    .create_account_with_user(NewAccount::with_password("liam.johnson@email.com", "h"))
    .await
    .unwrap()
    .unwrap();
  assert_eq!(user, UserRecord::new(account.uid, "liam.johnson@email.com"));
  assert_eq!(s.get_user(account.uid).await.unwrap(), Some(user));

  let again = s
    .create_account_with_user(NewAccount::with_password("liam.johnson@email.com", "h"))
    .await
    .unwrap();
  assert!(again.is_none());
  assert_eq!(s.list_users(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn failed_user_insert_leaves_no_account() {
  let s = store().await;
  s.execute_batch(
    "CREATE TRIGGER users_reject BEFORE INSERT ON users
     BEGIN SELECT RAISE(ABORT, 'users unavailable'); END;",
  )
  .await
  .unwrap();

  let err = s
    .create_account_with_user(NewAccount::with_password("noah.williams@email.com", "h"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Database(_)));

  assert!(
    s.find_account_by_email("noah.williams@email.com")
      .await
      .unwrap()
      .is_none()
  );
  assert!(s.list_users(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn anonymous_accounts_do_not_collide() {
  let s = store().await;
  let a = s.create_account(NewAccount::anonymous()).await.unwrap().unwrap();
  let b = s.create_account(NewAccount::anonymous()).await.unwrap().unwrap();

  assert_ne!(a.uid, b.uid);
  assert!(a.session().is_anonymous);
  assert_eq!(a.session().email, None);
}

#[tokio::test]
async fn missing_account_returns_none() {
  let s = store().await;
  assert!(s.get_account(Uuid::new_v4()).await.unwrap().is_none());
  assert!(s.find_account_by_email("nobody@x.y").await.unwrap().is_none());
}

// ─── Session tokens ──────────────────────────────────────────────────────────

#[tokio::test]
async fn issued_session_resolves_until_revoked() {
  let s = store().await;
  let account = s.create_account(NewAccount::anonymous()).await.unwrap().unwrap();

  s.issue_session(account.uid, "digest-1").await.unwrap();
  let resolved = s.resolve_session("digest-1").await.unwrap().unwrap();
  assert_eq!(resolved.uid, account.uid);

  assert!(s.revoke_session("digest-1").await.unwrap());
  assert!(s.resolve_session("digest-1").await.unwrap().is_none());
  assert!(!s.revoke_session("digest-1").await.unwrap());
}

#[tokio::test]
async fn unknown_token_does_not_resolve() {
  let s = store().await;
  assert!(s.resolve_session("never-issued").await.unwrap().is_none());
  assert!(!s.revoke_session("never-issued").await.unwrap());
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_and_get_user() {
  let s = store().await;
  let mut user = UserRecord::new(Uuid::new_v4(), "liam.johnson@email.com");
  user.mfa_enabled = true;
  s.upsert_user(user.clone()).await.unwrap();

  let fetched = s.get_user(user.id).await.unwrap().unwrap();
  assert_eq!(fetched, user);

  user.failed_attempts = 3;
  s.upsert_user(user.clone()).await.unwrap();
  assert_eq!(s.get_user(user.id).await.unwrap().unwrap().failed_attempts, 3);
  assert_eq!(s.list_users(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn list_users_orders_by_last_login() {
  let s = store().await;
  let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

  let mut early = UserRecord::new(Uuid::new_v4(), "early@x.y");
  early.last_login = Some(base);
  let mut late = UserRecord::new(Uuid::new_v4(), "late@x.y");
  late.last_login = Some(base + Duration::hours(2));
  let never = UserRecord::new(Uuid::new_v4(), "never@x.y");

  for u in [never.clone(), early.clone(), late.clone()] {
    s.upsert_user(u).await.unwrap();
  }

  let all = s.list_users(None).await.unwrap();
  let emails: Vec<_> = all.iter().map(|u| u.email.as_str()).collect();
  assert_eq!(emails, ["late@x.y", "early@x.y", "never@x.y"]);

  let top = s.list_users(Some(1)).await.unwrap();
  assert_eq!(top.len(), 1);
  assert_eq!(top[0].id, late.id);
}

#[tokio::test]
async fn record_login_tracks_failures_and_resets_on_success() {
  let s = store().await;
  let user = UserRecord::new(Uuid::new_v4(), "noah.williams@email.com");
  s.upsert_user(user.clone()).await.unwrap();
  let at = Utc.with_ymd_and_hms(2024, 5, 2, 9, 30, 0).unwrap();

  s.record_login(user.id, LoginOutcome::Failed, at).await.unwrap();
  let after = s
    .record_login(user.id, LoginOutcome::Failed, at)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(after.failed_attempts, 2);
  assert_eq!(after.last_login, None);

  let after = s
    .record_login(user.id, LoginOutcome::Succeeded, at)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(after.failed_attempts, 0);
  assert_eq!(after.last_login, Some(at));
}

#[tokio::test]
async fn record_login_for_unknown_user_is_none() {
  let s = store().await;
  let result = s
    .record_login(Uuid::new_v4(), LoginOutcome::Succeeded, Utc::now())
    .await
    .unwrap();
  assert!(result.is_none());
}

// ─── Auth logs ───────────────────────────────────────────────────────────────

fn log(user_id: Option<Uuid>, minutes_ago: i64, status: AuthLogStatus) -> NewAuthLog {
  NewAuthLog {
    user_id,
    timestamp: Some(Utc::now() - Duration::minutes(minutes_ago)),
    method_used: "email_password".into(),
    ip: "203.0.113.7".into(),
    status,
    threat_detected: status == AuthLogStatus::ThreatDetected,
  }
}

#[tokio::test]
async fn auth_logs_newest_first() {
  let s = store().await;
  let uid = Uuid::new_v4();

  s.append_auth_log(log(Some(uid), 30, AuthLogStatus::Success)).await.unwrap();
  s.append_auth_log(log(Some(uid), 10, AuthLogStatus::Failure)).await.unwrap();
  s.append_auth_log(log(Some(uid), 20, AuthLogStatus::ThreatDetected)).await.unwrap();

  let logs = s.list_auth_logs(&AuthLogQuery::default()).await.unwrap();
  let statuses: Vec<_> = logs.iter().map(|l| l.status).collect();
  assert_eq!(statuses, [
    AuthLogStatus::Failure,
    AuthLogStatus::ThreatDetected,
    AuthLogStatus::Success,
  ]);
  assert!(logs[1].threat_detected);
}

#[tokio::test]
async fn auth_logs_filter_by_user_and_limit() {
  let s = store().await;
  let alice = Uuid::new_v4();
  let bob = Uuid::new_v4();

  for m in 0..4 {
    s.append_auth_log(log(Some(alice), m, AuthLogStatus::Success)).await.unwrap();
  }
  s.append_auth_log(log(Some(bob), 1, AuthLogStatus::Failure)).await.unwrap();
  s.append_auth_log(log(None, 2, AuthLogStatus::Failure)).await.unwrap();

  let query = AuthLogQuery { user_id: Some(alice), limit: Some(2) };
  let logs = s.list_auth_logs(&query).await.unwrap();
  assert_eq!(logs.len(), 2);
  assert!(logs.iter().all(|l| l.user_id == Some(alice)));

  let everyone = s.list_auth_logs(&AuthLogQuery::default()).await.unwrap();
  assert_eq!(everyone.len(), 6);
  assert!(everyone.iter().any(|l| l.user_id.is_none()));
}

#[tokio::test]
async fn append_defaults_timestamp_to_now() {
  let s = store().await;
  let before = Utc::now();
  let mut input = log(None, 0, AuthLogStatus::Success);
  input.timestamp = None;

  let record = s.append_auth_log(input).await.unwrap();
  assert!(record.timestamp >= before);
}

// ─── Policies ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn put_policy_upserts_by_rule() {
  let s = store().await;

  let first = s
    .put_policy(NewPolicy {
      rule:        "RATE_LIMIT_LOGIN".into(),
      severity:    Severity::High,
      value:       serde_json::json!(5),
      description: "Max login attempts per minute".into(),
    })
    .await
    .unwrap();

  let second = s
    .put_policy(NewPolicy {
      rule:        "RATE_LIMIT_LOGIN".into(),
      severity:    Severity::Critical,
      value:       serde_json::json!(3),
      description: "Max login attempts per minute".into(),
    })
    .await
    .unwrap();
  assert_eq!(first.id, second.id);

  let policies = s.list_policies().await.unwrap();
  assert_eq!(policies.len(), 1);
  assert_eq!(policies[0].severity, Severity::Critical);
  assert_eq!(policies[0].value, serde_json::json!(3));
}

#[tokio::test]
async fn policies_listed_by_rule() {
  let s = store().await;
  for (rule, value) in [
    ("SESSION_MAX_AGE", serde_json::json!(3600)),
    ("REQUIRE_MFA_ADMIN", serde_json::json!(true)),
  ] {
    s.put_policy(NewPolicy {
      rule: rule.into(),
      severity: Severity::Medium,
      value,
      description: String::new(),
    })
    .await
    .unwrap();
  }

  let rules: Vec<_> = s
    .list_policies()
    .await
    .unwrap()
    .into_iter()
    .map(|p| p.rule)
    .collect();
  assert_eq!(rules, ["REQUIRE_MFA_ADMIN", "SESSION_MAX_AGE"]);
}
