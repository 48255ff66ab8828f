use std::{fmt, time::Duration};

use axum::headers::Cookie;
use rand::{distributions::Alphanumeric, Rng};
use tracing::debug;

use crate::{record_store::RecordStoreRef, Result};

const TOKEN_LEN: usize = 32;

/// Opaque per-client token, used only as the record store key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
  /// 32 alphanumeric characters from the thread-local CSPRNG.
  pub fn generate() -> Self {
    let token = rand::thread_rng()
      .sample_iter(&Alphanumeric)
      .take(TOKEN_LEN)
      .map(char::from)
      .collect();
    Self(token)
  }

  // only tokens shaped like ours are worth a store lookup
  pub fn parse(token: &str) -> Option<Self> {
    let well_formed = token.len() == TOKEN_LEN
      && token.chars().all(|c| c.is_ascii_alphanumeric());
    well_formed.then(|| Self(token.to_string()))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn from_cookie(cookie: Option<&Cookie>, name: &str) -> Option<Self> {
    cookie.and_then(|c| c.get(name)).and_then(Self::parse)
  }

  pub fn set_cookie(&self, name: &str, max_age: Duration) -> String {
    format!(
      "{name}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
      self.as_str(),
      max_age.as_secs()
    )
  }
}

impl fmt::Display for SessionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Reuses the caller's token only when the store still knows it, otherwise
/// mints a fresh one. Nothing is persisted here.
pub async fn issue(
  existing: Option<SessionId>,
  store: &RecordStoreRef,
) -> Result<SessionId> {
  if let Some(id) = existing {
    if store.contains(&id).await? {
      return Ok(id);
    }
    debug!("discarding unknown session token");
  }

  Ok(SessionId::generate())
}
