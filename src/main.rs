use std::sync::Arc;

use axum::{response::IntoResponse, routing::get, Router};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod catalogue;
mod config;
mod download;
mod error;
mod page;
mod record_store;
mod relay;
mod resolver;
mod search;
mod session;
mod util;

pub use error::{Error, Result};

use config::{Config, ResolverKind};
use record_store::{RecordStore, RecordStoreRef};
use resolver::{Piped, PipedInstance, Resolver, Ytdlp};

#[derive(Clone)]
pub struct AppState {
  pub config: Arc<Config>,
  pub resolver: Arc<dyn Resolver>,
  pub records: RecordStoreRef,
}

impl AppState {
  pub fn new(config: Config, resolver: Arc<dyn Resolver>) -> Self {
    let records =
      RecordStore::new(config.record_capacity, config.record_ttl).spawn();

    Self {
      config: Arc::new(config),
      resolver,
      records,
    }
  }
}

fn make_resolver(config: &Config) -> Arc<dyn Resolver> {
  match config.resolver {
    ResolverKind::Ytdlp => Arc::new(
      Ytdlp::new(config.ytdlp_proxy.clone(), config.ytdlp_concurrency)
        .program(&config.ytdlp_path),
    ),
    ResolverKind::Piped => {
      Arc::new(Piped::new(PipedInstance::new(&config.piped_instance)))
    }
  }
}

pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/", get(page::homepage))
    .route("/health", get(health))
    .route("/search", get(search::search).post(search::search))
    .route("/download", get(download::download).post(download::download))
    .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info")),
    )
    .init();

  let config = Config::from_env();
  let bind_addr = config.bind_addr;
  info!("using {:?} resolver", config.resolver);

  let state = AppState::new(config.clone(), make_resolver(&config));
  let app = router(state);

  info!("Listening on {}", bind_addr);

  axum::Server::try_bind(&bind_addr)
    .map_err(|e| Error::Server(e.to_string()))?
    .serve(app.into_make_service())
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| Error::Server(e.to_string()))?;

  info!("server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::warn!("failed to listen for ctrl-c: {e}");
    // keep serving rather than stopping immediately
    std::future::pending::<()>().await;
  }
  info!("shutting down");
}

async fn health() -> impl IntoResponse {
  "ok".to_owned()
}

#[cfg(test)]
mod test {
  use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
  };
  use tower::ServiceExt;

  use super::*;
  use crate::search::test::{body_text, session_of, state};

  const SEARCH_QUERY: &str =
    "url=https%3A%2F%2Fwww.youtube.com%2Fwatch%3Fv%3DdQw4w9WgXcQ";

  fn request(
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    form: Option<&str>,
  ) -> Request<Body> {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
      req = req.header(header::COOKIE, cookie);
    }
    match form {
      Some(form) => req
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap(),
      None => req.body(Body::empty()).unwrap(),
    }
  }

  #[tokio::test]
  async fn test_health_and_homepage() {
    let app = router(state());

    let resp = app
      .clone()
      .oneshot(request(Method::GET, "/health", None, None))
      .await
      .unwrap();
    assert_eq!(body_text(resp).await, "ok");

    let resp = app
      .oneshot(request(Method::GET, "/", None, None))
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("action=\"/search\""));
  }

  #[tokio::test]
  async fn test_search_then_download_over_http() {
    let app = router(state());

    // search via query string
    let uri = format!("/search?{SEARCH_QUERY}");
    let resp = app
      .clone()
      .oneshot(request(Method::GET, &uri, None, None))
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = format!("theme=dark; session={}", session_of(&resp));

    // download via form body, the session cookie among others
    let resp = app
      .clone()
      .oneshot(request(
        Method::POST,
        "/download",
        Some(&cookie),
        Some("Quality=720p+%2810.00M%29"),
      ))
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(body_text(resp).await, "rick video");

    // and via query string
    let resp = app
      .oneshot(request(
        Method::GET,
        "/download?Quality=128kbps%20%283.66M%29",
        Some(&cookie),
        None,
      ))
      .await
      .unwrap();
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(body_text(resp).await, "rick audio");
  }

  #[tokio::test]
  async fn test_search_by_form_body() {
    let app = router(state());

    let resp = app
      .oneshot(request(Method::POST, "/search", None, Some(SEARCH_QUERY)))
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key(header::SET_COOKIE));
    assert!(body_text(resp).await.contains("Never Gonna Give You Up"));
  }

  #[tokio::test]
  async fn test_download_without_session_over_http() {
    let app = router(state());

    let resp = app
      .clone()
      .oneshot(request(
        Method::POST,
        "/download",
        None,
        Some("Quality=720p+%2810.00M%29"),
      ))
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app
      .oneshot(request(
        Method::POST,
        "/download",
        Some("session=not-a-token"),
        Some("Quality=720p+%2810.00M%29"),
      ))
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }
}
