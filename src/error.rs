use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
};
use tracing::{debug, error};

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("{0} parameter is required")]
  MissingParameter(&'static str),
  #[error("Failed to fetch video: {0}")]
  Resolution(String),
  #[error("Unauthorized")]
  UnknownSession,
  #[error("Unsupported format: {0:?}")]
  UnsupportedFormat(String),
  #[error("Failed to get video stream: {0}")]
  StreamOpen(String),
  #[error("Failed to write video stream to response: {0}")]
  StreamCopy(String),
  #[error("extraction failed: {0}")]
  Extraction(String),
  #[error("unsupported url {0}: {1}")]
  UnsupportedURL(String, &'static str),
  #[error("record store unavailable: {0}")]
  Store(String),
  #[error("server error: {0}")]
  Server(String),
  #[error(transparent)]
  IO(#[from] std::io::Error),
  #[error(transparent)]
  Http(#[from] reqwest::Error),
  #[error(transparent)]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  pub fn status(&self) -> StatusCode {
    match self {
      Error::MissingParameter(_) | Error::UnsupportedFormat(_) => {
        StatusCode::BAD_REQUEST
      }
      Error::UnknownSession => StatusCode::UNAUTHORIZED,
      Error::Resolution(_) => StatusCode::BAD_GATEWAY,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      error!("{self}");
    } else {
      debug!("rejected request: {self}");
    }

    (status, self.to_string()).into_response()
  }
}
