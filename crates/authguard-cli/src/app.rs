//! Command implementations.
//!
//! Every command mounts a bootstrap controller under the guard of the screen
//! it stands for, waits for the provider's first report and then follows the
//! routing decision exactly as a screen would: render, or print where the
//! user is being sent.

use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use authguard_core::{
  controller::BootstrapController,
  dispatch::initiate_email_sign_up,
  login::{LoginForm, LoginValues, Notice, NoticeVariant},
  nav::{NAV_ITEMS, active_item},
  provider::IdentityProvider,
  record::{AuthLogRecord, AuthLogStatus},
  routing::{Guard, Route, RouteAction, destination},
  session::{SessionPhase, SessionReader},
  store::AuthLogQuery,
};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{client::ApiClient, provider::HttpIdentityProvider};

pub struct App {
  provider: HttpIdentityProvider,
  api:      ApiClient,
  /// How long to wait on the provider before giving up.
  timeout:  Duration,
}

impl App {
  pub fn new(provider: HttpIdentityProvider, api: ApiClient, timeout: Duration) -> Self {
    Self { provider, api, timeout }
  }

  // ── Mounting ──────────────────────────────────────────────────────────────

  /// Mount a controller for `guard` and restore the persisted session.
  /// Returns once the first report has been applied.
  async fn mount(&self, guard: Guard) -> Result<SessionReader> {
    let (mut session, _controller) = BootstrapController::spawn(self.provider.clone(), guard);
    self.provider.restore().await;
    session.resolved().await.context("session channel closed")?;
    Ok(session)
  }

  /// Enter a screen of the authenticated area. Returns the bearer token to
  /// render it with, or fails after reporting the redirect.
  async fn enter(&self, route: Route) -> Result<String> {
    let mut session = self.mount(route.guard()).await?;
    let decision = session.decision(route.guard());

    match destination(route, decision.action) {
      Some(to) if to == route => self
        .provider
        .token()
        .ok_or_else(|| anyhow!("signed in but no token is held")),
      Some(to) => {
        if decision.bootstrap_anonymous {
          // Let the anonymous sign-in land before the process exits.
          let settled = tokio::time::timeout(
            self.timeout,
            session.wait_for(|s| s.phase() != SessionPhase::NoSession),
          )
          .await;
          if settled.is_err() {
            tracing::warn!("anonymous sign-in did not complete in time");
          }
        }
        println!("Redirecting to {to}");
        bail!("{route} requires a signed-in user; run `authguard login`")
      }
      None => bail!("session is still loading"),
    }
  }

  // ── Commands ──────────────────────────────────────────────────────────────

  /// `status`: the entry point's view of the session.
  pub async fn status(&self) -> Result<()> {
    let session = self.mount(Guard::Root).await?;
    let state = session.current();

    match state.session() {
      None => println!("No session"),
      Some(s) if s.is_anonymous => println!("Anonymous session {}", s.subject_id),
      Some(s) => println!(
        "Signed in as {} ({})",
        s.email.as_deref().unwrap_or("<no email>"),
        s.subject_id
      ),
    }
    if let Some(to) = destination(Route::Root, session.decision(Guard::Root).action) {
      println!("Redirecting to {to}");
    }
    Ok(())
  }

  /// `login`: the login screen and its form.
  pub async fn login(&self, email: String, password: String) -> Result<()> {
    let mut session = self.mount(Guard::LoginPage).await?;
    if let RouteAction::Redirect(to) = session.decision(Guard::LoginPage).action {
      println!("Already signed in; redirecting to {to}");
      return Ok(());
    }

    let (notices_tx, mut notices) = mpsc::unbounded_channel();
    let form = LoginForm::new(self.provider.clone(), notices_tx);
    form.submit(LoginValues { email, password })?;

    let redirected = async {
      let _ = session
        .wait_for(|s| s.phase() == SessionPhase::Authenticated)
        .await;
      session.decision(Guard::LoginPage).action
    };
    tokio::pin!(redirected);

    let outcome = tokio::time::timeout(self.timeout, async {
      let mut succeeded = false;
      loop {
        tokio::select! {
          Some(notice) = notices.recv() => {
            print_notice(&notice);
            match notice.variant {
              NoticeVariant::Destructive => return Err(anyhow!("login failed")),
              NoticeVariant::Default => succeeded = true,
            }
          }
          action = &mut redirected => {
            if let RouteAction::Redirect(to) = action {
              println!("Redirecting to {to}");
            }
            // The success notice may still be in flight.
            if !succeeded && let Ok(notice) = notices.try_recv() {
              print_notice(&notice);
            }
            return Ok(());
          }
        }
      }
    })
    .await;

    outcome.map_err(|_| anyhow!("timed out waiting for the identity provider"))?
  }

  /// `signup`: register and sign in as a new email/password account.
  pub async fn signup(&self, email: String, password: String) -> Result<()> {
    let values = LoginValues { email, password };
    values.validate()?;
    let mut session = self.mount(Guard::LoginPage).await?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let error_tx = tx.clone();
    let _ = initiate_email_sign_up(
      &self.provider,
      values.email,
      values.password,
      move |credential| {
        let _ = tx.send(Ok(credential));
      },
      move |err| {
        let _ = error_tx.send(Err(err));
      },
    );

    let result = tokio::time::timeout(self.timeout, rx.recv())
      .await
      .map_err(|_| anyhow!("timed out waiting for the identity provider"))?
      .context("sign-up task ended without reporting")?;

    match result {
      Ok(credential) => {
        println!("Account created for {}", credential.session.email.as_deref().unwrap_or(""));
        let state = session
          .wait_for(|s| s.phase() == SessionPhase::Authenticated)
          .await
          .context("session channel closed")?;
        if let RouteAction::Redirect(to) = session.decision(Guard::LoginPage).action {
          println!("Redirecting to {to}");
        }
        tracing::debug!(subject = ?state.subject_id(), "signed up");
        Ok(())
      }
      Err(err) => {
        println!("Sign-up failed: {}", err.user_message());
        Err(anyhow!("sign-up failed ({})", err.code))
      }
    }
  }

  /// `logout`
  pub async fn logout(&self) -> Result<()> {
    self.provider.restore().await;
    self.provider.sign_out().await?;
    println!("Signed out");
    Ok(())
  }

  /// `users`: the user directory.
  pub async fn users(&self, limit: Option<usize>) -> Result<()> {
    let token = self.enter(Route::Users).await?;
    let users = self.api.list_users(&token, limit).await?;

    println!("{:<32} {:<5} {:<20} {:>6}", "EMAIL", "MFA", "LAST LOGIN", "FAILED");
    for user in users {
      let last_login = user
        .last_login
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "never".into());
      println!(
        "{:<32} {:<5} {:<20} {:>6}",
        user.email,
        if user.mfa_enabled { "on" } else { "off" },
        last_login,
        user.failed_attempts
      );
    }
    Ok(())
  }

  /// `logs`: recent authentication events.
  pub async fn logs(&self, limit: Option<usize>, user_id: Option<Uuid>) -> Result<()> {
    let token = self.enter(Route::Dashboard).await?;
    let logs = self
      .api
      .list_auth_logs(&token, &AuthLogQuery { user_id, limit })
      .await?;
    print_logs(&logs);
    Ok(())
  }

  /// `dashboard`: headline numbers and the activity feed.
  pub async fn dashboard(&self) -> Result<()> {
    let token = self.enter(Route::Dashboard).await?;
    let summary = self.api.dashboard(&token).await?;

    println!("Total users        {}", summary.total_users);
    println!("MFA enabled        {}%", summary.mfa_enabled_percent);
    println!("Logins (24h)       {}", summary.logins_24h);
    println!("Failed (24h)       {}", summary.failed_24h);
    println!("Threats (24h)      {}", summary.threats_24h);
    println!();
    println!("Recent activity");
    print_logs(&summary.recent_events);
    Ok(())
  }

  /// `policies`: configured security rules.
  pub async fn policies(&self) -> Result<()> {
    let token = self.enter(Route::SecurityRules).await?;
    for policy in self.api.list_policies(&token).await? {
      println!(
        "{:<20} {:<9} {:<10} {}",
        policy.rule, policy.severity, policy.value, policy.description
      );
    }
    Ok(())
  }
}

/// `nav`: the sidebar, with the entry for `current` marked.
pub fn nav(current: Route) {
  let active = active_item(current);
  for item in NAV_ITEMS.iter() {
    let marker = if active == Some(item) { '*' } else { ' ' };
    println!("{marker} {:<18} {}", item.title, item.route);
  }
}

fn print_notice(notice: &Notice) {
  match notice.variant {
    NoticeVariant::Default => println!("{}: {}", notice.title, notice.description),
    NoticeVariant::Destructive => eprintln!("{}: {}", notice.title, notice.description),
  }
}

fn print_logs(logs: &[AuthLogRecord]) {
  println!("{:<20} {:<16} {:<16} {:<16} {}", "TIME", "STATUS", "METHOD", "IP", "THREAT");
  for log in logs {
    let status = match log.status {
      AuthLogStatus::Success => "success",
      AuthLogStatus::Failure => "failure",
      AuthLogStatus::ThreatDetected => "threat detected",
    };
    println!(
      "{:<20} {:<16} {:<16} {:<16} {}",
      log.timestamp.format("%Y-%m-%d %H:%M:%S"),
      status,
      log.method_used,
      log.ip,
      if log.threat_detected { "yes" } else { "" }
    );
  }
}
