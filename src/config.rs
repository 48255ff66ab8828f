use std::{net::SocketAddr, str::FromStr, time::Duration};

use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolverKind {
  Ytdlp,
  Piped,
}

impl FromStr for ResolverKind {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "ytdlp" | "yt-dlp" => Ok(ResolverKind::Ytdlp),
      "piped" => Ok(ResolverKind::Piped),
      other => Err(format!("unknown resolver {other:?}")),
    }
  }
}

#[derive(Clone, Debug)]
pub struct Config {
  pub bind_addr: SocketAddr,
  pub resolver: ResolverKind,
  pub piped_instance: String,
  pub ytdlp_path: String,
  pub ytdlp_proxy: Option<String>,
  pub ytdlp_concurrency: usize,
  pub session_cookie: String,
  pub record_capacity: usize,
  pub record_ttl: Duration,
  // None disables the idle check
  pub stream_idle_timeout: Option<Duration>,
}

impl Config {
  pub fn from_env() -> Self {
    Self::from_lookup(|key| std::env::var(key).ok())
  }

  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
    let text = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let bind_addr =
      parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)));
    let resolver = parse_or(&lookup, "RESOLVER", ResolverKind::Ytdlp);
    let piped_instance = text("PIPED_INSTANCE")
      .unwrap_or_else(|| "pipedapi.kavin.rocks".to_string());
    let ytdlp_path =
      text("YTDLP_PATH").unwrap_or_else(|| "yt-dlp".to_string());
    let ytdlp_proxy = text("YTDLP_PROXY");
    let ytdlp_concurrency =
      parse_or(&lookup, "YTDLP_CONCURRENCY", 1usize).max(1);
    let session_cookie =
      text("SESSION_COOKIE").unwrap_or_else(|| "session".to_string());
    let record_capacity = parse_or(&lookup, "RECORD_CAPACITY", 1024usize);
    let record_ttl =
      Duration::from_secs(parse_or(&lookup, "RECORD_TTL_SECS", 3600u64));
    let stream_idle_timeout =
      match parse_or(&lookup, "STREAM_IDLE_TIMEOUT_SECS", 0u64) {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
      };

    Self {
      bind_addr,
      resolver,
      piped_instance,
      ytdlp_path,
      ytdlp_proxy,
      ytdlp_concurrency,
      session_cookie,
      record_capacity,
      record_ttl,
      stream_idle_timeout,
    }
  }
}

impl Default for Config {
  fn default() -> Self {
    Self::from_lookup(|_| None)
  }
}

fn parse_or<T>(
  lookup: &impl Fn(&str) -> Option<String>,
  key: &str,
  default: T,
) -> T
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) else {
    return default;
  };

  match value.trim().parse() {
    Ok(parsed) => parsed,
    Err(e) => {
      warn!("ignoring invalid {key}={value:?}: {e}");
      default
    }
  }
}

#[cfg(test)]
mod test {
  use std::collections::HashMap;

  use super::*;

  fn config_with(vars: &[(&str, &str)]) -> Config {
    let vars: HashMap<String, String> = vars
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect();
    Config::from_lookup(|key| vars.get(key).cloned())
  }

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().unwrap());
    assert_eq!(config.resolver, ResolverKind::Ytdlp);
    assert_eq!(config.session_cookie, "session");
    assert_eq!(config.ytdlp_concurrency, 1);
    assert_eq!(config.record_capacity, 1024);
    assert_eq!(config.record_ttl, Duration::from_secs(3600));
    assert_eq!(config.stream_idle_timeout, None);
    assert_eq!(config.ytdlp_path, "yt-dlp");
    assert!(config.ytdlp_proxy.is_none());
  }

  #[test]
  fn test_overrides() {
    let config = config_with(&[
      ("BIND_ADDR", "127.0.0.1:3000"),
      ("RESOLVER", "Piped"),
      ("PIPED_INSTANCE", "piped.example.org"),
      ("YTDLP_PATH", "/opt/bin/yt-dlp"),
      ("YTDLP_PROXY", "socks5://127.0.0.1:1080"),
      ("SESSION_COOKIE", "user"),
      ("RECORD_CAPACITY", "16"),
      ("STREAM_IDLE_TIMEOUT_SECS", "30"),
    ]);

    assert_eq!(config.bind_addr, "127.0.0.1:3000".parse().unwrap());
    assert_eq!(config.resolver, ResolverKind::Piped);
    assert_eq!(config.piped_instance, "piped.example.org");
    assert_eq!(config.ytdlp_path, "/opt/bin/yt-dlp");
    assert_eq!(
      config.ytdlp_proxy.as_deref(),
      Some("socks5://127.0.0.1:1080")
    );
    assert_eq!(config.session_cookie, "user");
    assert_eq!(config.record_capacity, 16);
    assert_eq!(config.stream_idle_timeout, Some(Duration::from_secs(30)));
  }

  #[test]
  fn test_invalid_values_fall_back() {
    let config = config_with(&[
      ("RESOLVER", "youtube-dl"),
      ("YTDLP_CONCURRENCY", "0"),
      ("RECORD_TTL_SECS", "soon"),
    ]);

    assert_eq!(config.resolver, ResolverKind::Ytdlp);
    assert_eq!(config.ytdlp_concurrency, 1);
    assert_eq!(config.record_ttl, Duration::from_secs(3600));
  }
}
