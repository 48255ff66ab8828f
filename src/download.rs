use axum::{
  extract::{Form, State},
  headers::Cookie,
  TypedHeader,
};
use serde::Deserialize;
use tracing::info;

use crate::{
  relay::{relay, Relay},
  session::SessionId,
  AppState, Error, Result,
};

#[derive(Deserialize)]
pub struct DownloadReq {
  #[serde(rename = "Quality")]
  quality: Option<String>,
}

pub async fn download(
  State(state): State<AppState>,
  cookie: Option<TypedHeader<Cookie>>,
  Form(req): Form<DownloadReq>,
) -> Result<Relay> {
  let id = SessionId::from_cookie(
    cookie.as_ref().map(|c| &c.0),
    &state.config.session_cookie,
  )
  .ok_or(Error::UnknownSession)?;

  // the store is only consulted here, never while bytes are flowing
  let record = state
    .records
    .get(&id)
    .await?
    .ok_or(Error::UnknownSession)?;

  let quality = req
    .quality
    .filter(|q| !q.is_empty())
    .ok_or(Error::MissingParameter("Quality"))?;

  let relay = relay(state.resolver.as_ref(), &record, &quality).await?;
  info!(
    "relaying {quality:?} of {:?} as {:?}",
    record.title,
    relay.delivery()
  );

  Ok(relay.idle_timeout(state.config.stream_idle_timeout))
}
