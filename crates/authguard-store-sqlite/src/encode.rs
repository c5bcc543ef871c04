//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings so that lexical
//! order is chronological order. UUIDs are stored as hyphenated lowercase
//! strings. Policy values are stored as compact JSON.

use authguard_core::{
  record::{AuthLogRecord, AuthLogStatus, SecurityPolicy, Severity, UserRecord},
  store::Account,
};
use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `dt` at the precision it survives a round-trip through a column with.
pub fn stored_dt(dt: DateTime<Utc>) -> DateTime<Utc> { dt.trunc_subsecs(6) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn encode_status(status: AuthLogStatus) -> String { status.to_string() }

pub fn decode_status(s: &str) -> Result<AuthLogStatus> {
  s.parse()
    .map_err(|_| authguard_core::Error::UnknownLogStatus(s.to_owned()).into())
}

pub fn encode_severity(severity: Severity) -> String { severity.to_string() }

pub fn decode_severity(s: &str) -> Result<Severity> {
  s.parse()
    .map_err(|_| authguard_core::Error::UnknownSeverity(s.to_owned()).into())
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from an `accounts` row.
pub struct RawAccount {
  pub uid:           String,
  pub email:         Option<String>,
  pub password_hash: Option<String>,
  pub is_anonymous:  bool,
  pub created_at:    String,
}

impl RawAccount {
  pub const COLUMNS: &'static str = "uid, email, password_hash, is_anonymous, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      uid:           row.get(0)?,
      email:         row.get(1)?,
      password_hash: row.get(2)?,
      is_anonymous:  row.get(3)?,
      created_at:    row.get(4)?,
    })
  }

  pub fn into_account(self) -> Result<Account> {
    Ok(Account {
      uid:           decode_uuid(&self.uid)?,
      email:         self.email,
      password_hash: self.password_hash,
      is_anonymous:  self.is_anonymous,
      created_at:    decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub id:              String,
  pub email:           String,
  pub mfa_enabled:     bool,
  pub last_login:      Option<String>,
  pub failed_attempts: u32,
}

impl RawUser {
  pub const COLUMNS: &'static str = "id, email, mfa_enabled, last_login, failed_attempts";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      email:           row.get(1)?,
      mfa_enabled:     row.get(2)?,
      last_login:      row.get(3)?,
      failed_attempts: row.get(4)?,
    })
  }

  pub fn into_user(self) -> Result<UserRecord> {
    Ok(UserRecord {
      id:              decode_uuid(&self.id)?,
      email:           self.email,
      mfa_enabled:     self.mfa_enabled,
      last_login:      self.last_login.as_deref().map(decode_dt).transpose()?,
      failed_attempts: self.failed_attempts,
    })
  }
}

/// Raw values read directly from an `auth_logs` row.
pub struct RawAuthLog {
  pub id:              String,
  pub user_id:         Option<String>,
  pub timestamp:       String,
  pub method_used:     String,
  pub ip:              String,
  pub status:          String,
  pub threat_detected: bool,
}

impl RawAuthLog {
  pub const COLUMNS: &'static str =
    "id, user_id, timestamp, method_used, ip, status, threat_detected";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      user_id:         row.get(1)?,
      timestamp:       row.get(2)?,
      method_used:     row.get(3)?,
      ip:              row.get(4)?,
      status:          row.get(5)?,
      threat_detected: row.get(6)?,
    })
  }

  pub fn into_record(self) -> Result<AuthLogRecord> {
    Ok(AuthLogRecord {
      id:              decode_uuid(&self.id)?,
      user_id:         self.user_id.as_deref().map(decode_uuid).transpose()?,
      timestamp:       decode_dt(&self.timestamp)?,
      method_used:     self.method_used,
      ip:              self.ip,
      status:          decode_status(&self.status)?,
      threat_detected: self.threat_detected,
    })
  }
}

/// Raw values read directly from a `security_policies` row.
pub struct RawPolicy {
  pub id:          String,
  pub rule:        String,
  pub severity:    String,
  pub value_json:  String,
  pub description: String,
}

impl RawPolicy {
  pub const COLUMNS: &'static str = "id, rule, severity, value_json, description";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      rule:        row.get(1)?,
      severity:    row.get(2)?,
      value_json:  row.get(3)?,
      description: row.get(4)?,
    })
  }

  pub fn into_policy(self) -> Result<SecurityPolicy> {
    Ok(SecurityPolicy {
      id:          decode_uuid(&self.id)?,
      rule:        self.rule,
      severity:    decode_severity(&self.severity)?,
      value:       serde_json::from_str(&self.value_json)?,
      description: self.description,
    })
  }
}
