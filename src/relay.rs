use std::time::Duration;

use axum::{
  body::StreamBody,
  http::header,
  response::{IntoResponse, Response},
};

use crate::{
  catalogue::VideoRecord,
  resolver::{ByteStream, Resolver},
  util::RelayStream,
  Error, Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
  Video,
  Audio,
}

impl Delivery {
  pub fn extension(self) -> &'static str {
    match self {
      Delivery::Video => ".mp4",
      Delivery::Audio => ".mp3",
    }
  }

  pub fn content_type(self) -> &'static str {
    match self {
      Delivery::Video => "video/mp4",
      Delivery::Audio => "audio/mpeg",
    }
  }

  pub fn file_name(self) -> String {
    format!("download{}", self.extension())
  }
}

/// Decides how a quality label is delivered from its text alone: "kbps"
/// means audio, otherwise any "p" means video. The format's own mime type
/// is not consulted.
pub fn classify(quality: &str) -> Result<Delivery> {
  if quality.contains("kbps") {
    Ok(Delivery::Audio)
  } else if quality.contains('p') {
    Ok(Delivery::Video)
  } else {
    Err(Error::UnsupportedFormat(quality.to_string()))
  }
}

/// An opened upstream stream ready to become a download response.
pub struct Relay {
  delivery: Delivery,
  stream: RelayStream<ByteStream>,
}

impl Relay {
  pub fn delivery(&self) -> Delivery {
    self.delivery
  }

  pub fn idle_timeout(self, timeout: Option<Duration>) -> Self {
    Relay {
      stream: self.stream.idle_timeout(timeout),
      ..self
    }
  }

  pub fn into_stream(self) -> RelayStream<ByteStream> {
    self.stream
  }
}

pub async fn relay(
  resolver: &dyn Resolver,
  record: &VideoRecord,
  quality: &str,
) -> Result<Relay> {
  let format = record
    .format(quality)
    .ok_or_else(|| Error::UnsupportedFormat(quality.to_string()))?;
  let delivery = classify(quality)?;

  let stream = resolver
    .open_stream(&record.video, format)
    .await
    .map_err(|e| match e {
      Error::StreamOpen(_) => e,
      other => Error::StreamOpen(other.to_string()),
    })?;

  Ok(Relay {
    delivery,
    stream: RelayStream::new(stream),
  })
}

impl IntoResponse for Relay {
  fn into_response(self) -> Response {
    let delivery = self.delivery();
    let headers = [
      (
        header::CONTENT_DISPOSITION,
        format!("attachment; filename={}", delivery.file_name()),
      ),
      (header::CONTENT_TYPE, delivery.content_type().to_string()),
    ];

    (headers, StreamBody::new(self.into_stream())).into_response()
  }
}
