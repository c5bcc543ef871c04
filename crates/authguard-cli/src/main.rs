//! `authguard`: command-line client for the AuthGuard server.
//!
//! # Usage
//!
//! ```
//! authguard status
//! authguard login liam.johnson@email.com --password password123
//! authguard --url http://localhost:8400 dashboard
//! authguard --config ~/.config/authguard/config.toml users --limit 10
//! ```

mod app;
mod client;
mod provider;

use std::{
  io::{self, BufRead as _},
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::{Context, Result, bail};
use app::App;
use authguard_core::routing::Route;
use clap::{Parser, Subcommand};
use client::ApiClient;
use provider::HttpIdentityProvider;
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "authguard", about = "Command-line client for the AuthGuard server")]
struct Args {
  /// Path to a TOML config file (url, session_file).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the AuthGuard server (default: http://localhost:8400).
  #[arg(long, env = "AUTHGUARD_URL")]
  url: Option<String>,

  /// Where the current session is persisted between invocations.
  #[arg(long, env = "AUTHGUARD_SESSION_FILE", value_name = "FILE")]
  session_file: Option<PathBuf>,

  /// Seconds to wait on the server before giving up.
  #[arg(long, default_value_t = 10)]
  timeout: u64,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Show the current session and where the entry point would send you.
  Status,
  /// Sign in with email and password.
  Login {
    email:    String,
    /// Password; read from stdin when omitted.
    #[arg(long, env = "AUTHGUARD_PASSWORD", hide_env_values = true)]
    password: Option<String>,
  },
  /// Create an email/password account and sign in as it.
  Signup {
    email:    String,
    #[arg(long, env = "AUTHGUARD_PASSWORD", hide_env_values = true)]
    password: Option<String>,
  },
  /// End the current session.
  Logout,
  /// List user records.
  Users {
    #[arg(long)]
    limit: Option<usize>,
  },
  /// List authentication events, newest first.
  Logs {
    #[arg(long)]
    limit: Option<usize>,
    /// Only events for this user id.
    #[arg(long)]
    user:  Option<Uuid>,
  },
  /// Show the dashboard summary.
  Dashboard,
  /// List security policies.
  Policies,
  /// Print the navigation menu with the entry for ROUTE highlighted.
  Nav {
    #[arg(default_value = "/dashboard")]
    route: Route,
  },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:          String,
  #[serde(default)]
  session_file: Option<PathBuf>,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  // The menu needs no server.
  if let Command::Nav { route } = args.command {
    app::nav(route);
    return Ok(());
  }

  // Load config file if provided.
  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let base_url = args
    .url
    .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
    .unwrap_or_else(|| "http://localhost:8400".to_string());
  let session_file = args
    .session_file
    .or(file_cfg.session_file)
    .unwrap_or_else(|| PathBuf::from("~/.config/authguard/session.json"));

  let api = ApiClient::new(base_url)?;
  let provider = HttpIdentityProvider::new(api.clone(), expand_tilde(&session_file));
  let app = App::new(provider, api, Duration::from_secs(args.timeout));

  match args.command {
    Command::Status => app.status().await,
    Command::Login { email, password } => app.login(email, password_or_stdin(password)?).await,
    Command::Signup { email, password } => app.signup(email, password_or_stdin(password)?).await,
    Command::Logout => app.logout().await,
    Command::Users { limit } => app.users(limit).await,
    Command::Logs { limit, user } => app.logs(limit, user).await,
    Command::Dashboard => app.dashboard().await,
    Command::Policies => app.policies().await,
    Command::Nav { .. } => Ok(()),
  }
}

/// Use the given password, or read the first line of stdin.
fn password_or_stdin(password: Option<String>) -> Result<String> {
  if let Some(password) = password {
    return Ok(password);
  }
  let mut line = String::new();
  io::stdin()
    .lock()
    .read_line(&mut line)
    .context("reading password from stdin")?;
  let password = line.trim_end_matches(['\r', '\n']).to_string();
  if password.is_empty() {
    bail!("no password given; pass --password or pipe it on stdin");
  }
  Ok(password)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
