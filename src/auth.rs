//! Bearer token state and its on-disk copy.

use base64::Engine;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// Shared holder of the current JWT.
///
/// Reads are cheap and lock-free for callers; `set_token` is the only writer.
#[derive(Debug, Clone)]
pub struct AuthContext {
  token: Arc<watch::Sender<Option<String>>>,
}

impl AuthContext {
  pub fn new(token: Option<String>) -> Self {
    let (tx, _) = watch::channel(token.filter(|t| !t.is_empty()));
    Self { token: Arc::new(tx) }
  }

  /// Current token, or an empty string when logged out.
  pub fn token(&self) -> String {
    self.token.borrow().clone().unwrap_or_default()
  }

  pub fn is_logged_in(&self) -> bool {
    self.token.borrow().is_some()
  }

  pub fn set_token(&self, token: Option<String>) {
    let token = token.filter(|t| !t.is_empty());
    debug!(logged_in = token.is_some(), "auth token changed");
    self.token.send_replace(token);
  }

  pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
    self.token.subscribe()
  }
}

/// Short, stable identifier for a token, safe to put in cache keys and logs.
pub fn token_fingerprint(token: &str) -> String {
  let digest = Sha256::digest(token.as_bytes());
  hex::encode(&digest[..8])
}

#[derive(Deserialize)]
struct Claims {
  sub: Option<String>,
}

/// The `sub` claim of a JWT, for display only. The signature is not checked.
pub fn token_subject(token: &str) -> Option<String> {
  let payload = token.split('.').nth(1)?;
  let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
    .decode(payload.trim_end_matches('='))
    .ok()?;
  serde_json::from_slice::<Claims>(&bytes).ok()?.sub
}

/// Persists the JWT between runs.
#[derive(Debug, Clone)]
pub struct TokenStore {
  path: PathBuf,
}

impl TokenStore {
  pub fn new(dir: &Path) -> Self {
    Self {
      path: dir.join("token"),
    }
  }

  pub fn load(&self) -> Option<String> {
    let token = std::fs::read_to_string(&self.path).ok()?;
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
  }

  pub fn save(&self, token: &str) -> Result<()> {
    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create {}: {}", parent.display(), e))?;
    }
    std::fs::write(&self.path, token)
      .map_err(|e| eyre!("Failed to save token to {}: {}", self.path.display(), e))?;
    info!(path = %self.path.display(), "saved auth token");
    Ok(())
  }

  pub fn clear(&self) -> Result<()> {
    match std::fs::remove_file(&self.path) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(eyre!("Failed to remove {}: {}", self.path.display(), e)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_context_set_and_clear() {
    let auth = AuthContext::new(None);
    assert!(!auth.is_logged_in());
    assert_eq!(auth.token(), "");

    let mut rx = auth.subscribe();
    auth.set_token(Some("jwt".to_string()));
    assert!(rx.has_changed().unwrap());
    assert_eq!(auth.token(), "jwt");

    auth.set_token(Some(String::new()));
    assert!(!auth.is_logged_in());
  }

  #[test]
  fn test_fingerprint_is_stable_and_distinct() {
    assert_eq!(token_fingerprint("a"), token_fingerprint("a"));
    assert_ne!(token_fingerprint("a"), token_fingerprint("b"));
    assert_eq!(token_fingerprint("").len(), 16);
  }

  #[test]
  fn test_token_subject() {
    // {"sub":"ann","iat":1}
    let token = "eyJhbGciOiJIUzI1NiJ9.eyJzdWIiOiJhbm4iLCJpYXQiOjF9.sig";
    assert_eq!(token_subject(token), Some("ann".to_string()));
    assert_eq!(token_subject("not-a-jwt"), None);
    assert_eq!(token_subject("a.!!!.c"), None);
  }

  #[test]
  fn test_store_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let store = TokenStore::new(&dir.path().join("nested"));
    assert_eq!(store.load(), None);

    store.save("jwt-123\n").unwrap();
    assert_eq!(store.load(), Some("jwt-123".to_string()));

    store.clear().unwrap();
    assert_eq!(store.load(), None);
    // Clearing twice is fine
    store.clear().unwrap();
  }
}
