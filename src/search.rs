use std::sync::Arc;

use axum::{
  extract::{Form, State},
  headers::Cookie,
  http::header,
  response::{Html, IntoResponse},
  TypedHeader,
};
use serde::Deserialize;
use tracing::info;

use crate::{
  catalogue::VideoRecord,
  page,
  session::{self, SessionId},
  AppState, Error, Result,
};

#[derive(Deserialize)]
pub struct SearchReq {
  url: Option<String>,
}

pub async fn search(
  State(state): State<AppState>,
  cookie: Option<TypedHeader<Cookie>>,
  Form(req): Form<SearchReq>,
) -> Result<impl IntoResponse> {
  let url = req
    .url
    .filter(|url| !url.trim().is_empty())
    .ok_or(Error::MissingParameter("URL"))?;

  let video = state
    .resolver
    .resolve(url.trim())
    .await
    .map_err(|e| Error::Resolution(e.to_string()))?;
  let record = Arc::new(VideoRecord::new(video));

  let cookie_name = &state.config.session_cookie;
  let existing =
    SessionId::from_cookie(cookie.as_ref().map(|c| &c.0), cookie_name);
  let id = session::issue(existing, &state.records).await?;
  state.records.put(&id, record.clone()).await?;

  info!(
    "resolved {:?}: {} video and {} audio qualities",
    record.title,
    record.quality_video.len(),
    record.quality_audio.len()
  );

  let set_cookie = id.set_cookie(cookie_name, state.config.record_ttl);
  Ok((
    [(header::SET_COOKIE, set_cookie)],
    Html(page::catalogue(&record)),
  ))
}
