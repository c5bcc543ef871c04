//! SQL schema for the AuthGuard SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Identity provider: credentials.
CREATE TABLE IF NOT EXISTS accounts (
    uid           TEXT PRIMARY KEY,
    email         TEXT UNIQUE,         -- NULL for anonymous accounts
    password_hash TEXT,                -- argon2 PHC string
    is_anonymous  INTEGER NOT NULL,
    created_at    TEXT NOT NULL
);

-- Identity provider: issued session tokens, stored by SHA-256 digest only.
CREATE TABLE IF NOT EXISTS session_tokens (
    token_hash TEXT PRIMARY KEY,
    uid        TEXT NOT NULL REFERENCES accounts(uid),
    issued_at  TEXT NOT NULL,
    revoked_at TEXT
);

-- Documents: one row per registered user, keyed by account uid.
CREATE TABLE IF NOT EXISTS users (
    id              TEXT PRIMARY KEY,
    email           TEXT NOT NULL,
    mfa_enabled     INTEGER NOT NULL DEFAULT 0,
    last_login      TEXT,
    failed_attempts INTEGER NOT NULL DEFAULT 0
);

-- Documents: authentication events. Append-only.
CREATE TABLE IF NOT EXISTS auth_logs (
    id              TEXT PRIMARY KEY,
    user_id         TEXT,
    timestamp       TEXT NOT NULL,
    method_used     TEXT NOT NULL,
    ip              TEXT NOT NULL,
    status          TEXT NOT NULL,   -- 'success' | 'failure' | 'threat_detected'
    threat_detected INTEGER NOT NULL DEFAULT 0
);

-- Documents: security policy configuration.
CREATE TABLE IF NOT EXISTS security_policies (
    id          TEXT PRIMARY KEY,
    rule        TEXT NOT NULL UNIQUE,
    severity    TEXT NOT NULL,       -- 'low' | 'medium' | 'high' | 'critical'
    value_json  TEXT NOT NULL,
    description TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS tokens_uid_idx       ON session_tokens(uid);
CREATE INDEX IF NOT EXISTS users_last_login_idx ON users(last_login);
CREATE INDEX IF NOT EXISTS auth_logs_time_idx   ON auth_logs(timestamp);
CREATE INDEX IF NOT EXISTS auth_logs_user_idx   ON auth_logs(user_id);

PRAGMA user_version = 1;
";
