use std::fmt;

/// A navigable screen, addressed by a web-style path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
  Landing,
  About,
  Register,
  Login,
  Dashboard,
  /// `/s/:shortCode`
  Redirect(String),
  Error,
  NotFound(String),
}

impl Route {
  /// Parse a path such as `/dashboard` or `/s/abc123`. Unknown paths map to
  /// `NotFound`.
  pub fn parse(path: &str) -> Route {
    let trimmed = path.trim();
    let trimmed = trimmed.split(['?', '#']).next().unwrap_or_default();
    let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();

    match segments.as_slice() {
      [] => Route::Landing,
      ["about"] => Route::About,
      ["register"] => Route::Register,
      ["login"] => Route::Login,
      ["dashboard"] => Route::Dashboard,
      ["s", code] => Route::Redirect(code.to_string()),
      ["error"] => Route::Error,
      _ => Route::NotFound(path.trim().to_string()),
    }
  }

  pub fn path(&self) -> String {
    match self {
      Route::Landing => "/".to_string(),
      Route::About => "/about".to_string(),
      Route::Register => "/register".to_string(),
      Route::Login => "/login".to_string(),
      Route::Dashboard => "/dashboard".to_string(),
      Route::Redirect(code) => format!("/s/{}", code),
      Route::Error => "/error".to_string(),
      Route::NotFound(path) => path.clone(),
    }
  }

  /// Requires a token
  pub fn is_private(&self) -> bool {
    matches!(self, Route::Dashboard)
  }

  /// Only makes sense while logged out
  pub fn is_public_only(&self) -> bool {
    matches!(self, Route::Login | Route::Register)
  }

  /// Rendered without header and footer
  pub fn hides_chrome(&self) -> bool {
    matches!(self, Route::Redirect(_))
  }

  /// Where navigating to `self` actually lands.
  pub fn guard(self, logged_in: bool) -> Route {
    if self.is_private() && !logged_in {
      Route::Login
    } else if self.is_public_only() && logged_in {
      Route::Dashboard
    } else {
      self
    }
  }
}

impl fmt::Display for Route {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.path())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_known_paths() {
    assert_eq!(Route::parse("/"), Route::Landing);
    assert_eq!(Route::parse(""), Route::Landing);
    assert_eq!(Route::parse("/about"), Route::About);
    assert_eq!(Route::parse("/dashboard/"), Route::Dashboard);
    assert_eq!(Route::parse("/s/abc123"), Route::Redirect("abc123".to_string()));
    assert_eq!(Route::parse("/login?next=/dashboard"), Route::Login);
  }

  #[test]
  fn test_unknown_path_is_not_found() {
    assert_eq!(
      Route::parse("/nope/deeper"),
      Route::NotFound("/nope/deeper".to_string())
    );
    assert_eq!(Route::parse("/s"), Route::NotFound("/s".to_string()));
  }

  #[test]
  fn test_path_roundtrip() {
    for route in [
      Route::Landing,
      Route::About,
      Route::Register,
      Route::Login,
      Route::Dashboard,
      Route::Redirect("x1".to_string()),
      Route::Error,
    ] {
      assert_eq!(Route::parse(&route.path()), route);
    }
  }

  #[test]
  fn test_guards() {
    assert_eq!(Route::Dashboard.guard(false), Route::Login);
    assert_eq!(Route::Dashboard.guard(true), Route::Dashboard);
    assert_eq!(Route::Login.guard(true), Route::Dashboard);
    assert_eq!(Route::Register.guard(true), Route::Dashboard);
    assert_eq!(Route::Register.guard(false), Route::Register);
    assert_eq!(Route::About.guard(false), Route::About);
  }

  #[test]
  fn test_only_redirect_hides_chrome() {
    assert!(Route::Redirect("a".to_string()).hides_chrome());
    assert!(!Route::Dashboard.hides_chrome());
  }
}
