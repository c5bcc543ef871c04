//! [`SqliteStore`]: the SQLite implementation of [`DocumentStore`] and
//! [`AccountStore`].

use std::path::Path;

use authguard_core::{
  record::{AuthLogRecord, LoginOutcome, NewAuthLog, NewPolicy, SecurityPolicy, UserRecord},
  store::{Account, AccountStore, AuthLogQuery, DocumentStore, NewAccount},
};
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    RawAccount, RawAuthLog, RawPolicy, RawUser, encode_dt, encode_severity, encode_status,
    encode_uuid, stored_dt,
  },
  schema::SCHEMA,
};

/// `LIMIT -1` means "no limit" in SQLite.
fn sql_limit(limit: Option<usize>) -> i64 {
  limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX))
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An AuthGuard store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Insert `account`, and `user` with it, in one transaction. Returns
  /// `false` without writing anything if the email is taken.
  async fn insert_account(&self, account: &Account, user: Option<&UserRecord>) -> Result<bool> {
    let uid_str   = encode_uuid(account.uid);
    let email     = account.email.clone();
    let hash      = account.password_hash.clone();
    let anonymous = account.is_anonymous;
    let at_str    = encode_dt(account.created_at);
    let user_row  = user.map(|u| (encode_uuid(u.id), u.email.clone()));

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if let Some(email) = &email {
          let taken = tx
            .query_row(
              "SELECT 1 FROM accounts WHERE email = ?1",
              rusqlite::params![email],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
          if taken {
            return Ok(false);
          }
        }
        tx.execute(
          "INSERT INTO accounts (uid, email, password_hash, is_anonymous, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![uid_str, email, hash, anonymous, at_str],
        )?;
        if let Some((id, user_email)) = &user_row {
          tx.execute(
            "INSERT INTO users (id, email) VALUES (?1, ?2)",
            rusqlite::params![id, user_email],
          )?;
        }
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !inserted {
      tracing::debug!(email = ?account.email, "account email already taken");
    }
    Ok(inserted)
  }

  #[cfg(test)]
  pub(crate) async fn execute_batch(&self, sql: &'static str) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_account(&self, sql: &'static str, key: String) -> Result<Option<Account>> {
    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(sql, rusqlite::params![key], RawAccount::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAccount::into_account).transpose()
  }
}

// ─── DocumentStore impl ──────────────────────────────────────────────────────

impl DocumentStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn upsert_user(&self, mut user: UserRecord) -> Result<UserRecord> {
    user.last_login = user.last_login.map(stored_dt);

    let id_str     = encode_uuid(user.id);
    let email      = user.email.clone();
    let mfa        = user.mfa_enabled;
    let last_login = user.last_login.map(encode_dt);
    let failed     = user.failed_attempts;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (id, email, mfa_enabled, last_login, failed_attempts)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT(id) DO UPDATE SET
             email           = excluded.email,
             mfa_enabled     = excluded.mfa_enabled,
             last_login      = excluded.last_login,
             failed_attempts = excluded.failed_attempts",
          rusqlite::params![id_str, email, mfa, last_login, failed],
        )?;
        Ok(())
      })
      .await?;

    Ok(user)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<UserRecord>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {} FROM users WHERE id = ?1", RawUser::COLUMNS);
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawUser::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn list_users(&self, limit: Option<usize>) -> Result<Vec<UserRecord>> {
    let limit_val = sql_limit(limit);

    let raws: Vec<RawUser> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM users
           ORDER BY last_login IS NULL, last_login DESC, email
           LIMIT ?1",
          RawUser::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![limit_val], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  async fn record_login(
    &self,
    id:      Uuid,
    outcome: LoginOutcome,
    at:      DateTime<Utc>,
  ) -> Result<Option<UserRecord>> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(at);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        let updated = match outcome {
          LoginOutcome::Succeeded => conn.execute(
            "UPDATE users SET last_login = ?2, failed_attempts = 0 WHERE id = ?1",
            rusqlite::params![id_str, at_str],
          )?,
          LoginOutcome::Failed => conn.execute(
            "UPDATE users SET failed_attempts = failed_attempts + 1 WHERE id = ?1",
            rusqlite::params![id_str],
          )?,
        };
        if updated == 0 {
          return Ok(None);
        }

        let sql = format!("SELECT {} FROM users WHERE id = ?1", RawUser::COLUMNS);
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawUser::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  // ── Auth logs ─────────────────────────────────────────────────────────────

  async fn append_auth_log(&self, input: NewAuthLog) -> Result<AuthLogRecord> {
    let record = AuthLogRecord {
      id:              Uuid::new_v4(),
      user_id:         input.user_id,
      timestamp:       stored_dt(input.timestamp.unwrap_or_else(Utc::now)),
      method_used:     input.method_used,
      ip:              input.ip,
      status:          input.status,
      threat_detected: input.threat_detected,
    };

    let id_str      = encode_uuid(record.id);
    let user_id_str = record.user_id.map(encode_uuid);
    let at_str      = encode_dt(record.timestamp);
    let method      = record.method_used.clone();
    let ip          = record.ip.clone();
    let status_str  = encode_status(record.status);
    let threat      = record.threat_detected;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO auth_logs (id, user_id, timestamp, method_used, ip, status, threat_detected)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![id_str, user_id_str, at_str, method, ip, status_str, threat],
        )?;
        Ok(())
      })
      .await?;

    Ok(record)
  }

  async fn list_auth_logs(&self, query: &AuthLogQuery) -> Result<Vec<AuthLogRecord>> {
    let user_id_str = query.user_id.map(encode_uuid);
    let limit_val   = sql_limit(query.limit);

    let raws: Vec<RawAuthLog> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM auth_logs
           WHERE (?1 IS NULL OR user_id = ?1)
           ORDER BY timestamp DESC
           LIMIT ?2",
          RawAuthLog::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![user_id_str, limit_val], RawAuthLog::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAuthLog::into_record).collect()
  }

  // ── Policies ──────────────────────────────────────────────────────────────

  async fn put_policy(&self, input: NewPolicy) -> Result<SecurityPolicy> {
    let candidate_id = encode_uuid(Uuid::new_v4());
    let rule         = input.rule.clone();
    let severity_str = encode_severity(input.severity);
    let value_json   = serde_json::to_string(&input.value)?;
    let description  = input.description.clone();

    // Policies are keyed by rule; re-putting a rule keeps its id.
    let id_str: String = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO security_policies (id, rule, severity, value_json, description)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT(rule) DO UPDATE SET
             severity    = excluded.severity,
             value_json  = excluded.value_json,
             description = excluded.description",
          rusqlite::params![candidate_id, rule, severity_str, value_json, description],
        )?;
        let id = conn.query_row(
          "SELECT id FROM security_policies WHERE rule = ?1",
          rusqlite::params![rule],
          |r| r.get(0),
        )?;
        Ok(id)
      })
      .await?;

    Ok(SecurityPolicy {
      id:          Uuid::parse_str(&id_str)?,
      rule:        input.rule,
      severity:    input.severity,
      value:       input.value,
      description: input.description,
    })
  }

  async fn list_policies(&self) -> Result<Vec<SecurityPolicy>> {
    let raws: Vec<RawPolicy> = self
      .conn
      .call(|conn| {
        let sql = format!(
          "SELECT {} FROM security_policies ORDER BY rule",
          RawPolicy::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], RawPolicy::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPolicy::into_policy).collect()
  }
}

fn new_account(input: NewAccount) -> Account {
  Account {
    uid:           Uuid::new_v4(),
    email:         input.email,
    password_hash: input.password_hash,
    is_anonymous:  input.is_anonymous,
    created_at:    stored_dt(Utc::now()),
  }
}

// ─── AccountStore impl ───────────────────────────────────────────────────────

impl AccountStore for SqliteStore {
  async fn create_account(&self, input: NewAccount) -> Result<Option<Account>> {
    let account = new_account(input);
    let inserted = self.insert_account(&account, None).await?;
    Ok(inserted.then_some(account))
  }

  async fn create_account_with_user(
    &self,
    input: NewAccount,
  ) -> Result<Option<(Account, UserRecord)>> {
    let account = new_account(input);
    let user = UserRecord::new(account.uid, account.email.clone().unwrap_or_default());
    let inserted = self.insert_account(&account, Some(&user)).await?;
    Ok(inserted.then_some((account, user)))
  }

  async fn get_account(&self, uid: Uuid) -> Result<Option<Account>> {
    const SQL: &str =
      "SELECT uid, email, password_hash, is_anonymous, created_at FROM accounts WHERE uid = ?1";
    self.query_account(SQL, encode_uuid(uid)).await
  }

  async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
    const SQL: &str =
      "SELECT uid, email, password_hash, is_anonymous, created_at FROM accounts WHERE email = ?1";
    self.query_account(SQL, email.to_owned()).await
  }

  async fn issue_session(&self, uid: Uuid, token_hash: &str) -> Result<()> {
    let hash    = token_hash.to_owned();
    let uid_str = encode_uuid(uid);
    let at_str  = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO session_tokens (token_hash, uid, issued_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![hash, uid_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn resolve_session(&self, token_hash: &str) -> Result<Option<Account>> {
    const SQL: &str = "SELECT a.uid, a.email, a.password_hash, a.is_anonymous, a.created_at
       FROM session_tokens t
       JOIN accounts a ON a.uid = t.uid
       WHERE t.token_hash = ?1 AND t.revoked_at IS NULL";
    self.query_account(SQL, token_hash.to_owned()).await
  }

  async fn revoke_session(&self, token_hash: &str) -> Result<bool> {
    let hash   = token_hash.to_owned();
    let at_str = encode_dt(Utc::now());

    let revoked = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE session_tokens SET revoked_at = ?2
           WHERE token_hash = ?1 AND revoked_at IS NULL",
          rusqlite::params![hash, at_str],
        )?)
      })
      .await?;

    Ok(revoked > 0)
  }
}
