//! Sidebar navigation for the authenticated area.

use serde::Serialize;

use crate::routing::Route;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavItem {
  pub title: &'static str,
  pub route: Route,
}

pub static NAV_ITEMS: [NavItem; 8] = [
  NavItem { title: "Dashboard",       route: Route::Dashboard },
  NavItem { title: "Architecture",    route: Route::Architecture },
  NavItem { title: "Database Schema", route: Route::Database },
  NavItem { title: "Cloud Functions", route: Route::Functions },
  NavItem { title: "Security Rules",  route: Route::SecurityRules },
  NavItem { title: "MFA Flow",        route: Route::MfaFlow },
  NavItem { title: "OS Integration",  route: Route::Integration },
  NavItem { title: "Threat Model",    route: Route::ThreatModel },
];

/// The nav item highlighted while `current` is displayed, if any.
pub fn active_item(current: Route) -> Option<&'static NavItem> {
  NAV_ITEMS.iter().find(|item| item.route == current)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn every_item_is_inside_the_app_area() {
    assert!(NAV_ITEMS.iter().all(|item| item.route.in_app_area()));
  }

  #[test]
  fn users_screen_has_no_sidebar_entry() {
    assert_eq!(active_item(Route::Dashboard).map(|i| i.title), Some("Dashboard"));
    assert!(active_item(Route::Users).is_none());
  }
}
