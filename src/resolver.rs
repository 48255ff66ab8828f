mod piped;
mod ytdlp;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use http_types::Url;

use crate::{Error, Result};

pub use piped::{Piped, PipedInstance};
pub use ytdlp::Ytdlp;

pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// One encoding of a video as reported by a resolver.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Format {
  /// Resolver-specific identifier (yt-dlp format id, itag).
  pub id: String,
  pub url: String,
  pub mime_type: String,
  pub quality_label: String,
  /// bits per second
  pub bitrate: u64,
  /// bits per second
  pub average_bitrate: u64,
  /// 0 when unknown
  pub content_length: u64,
  pub audio_channels: u32,
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedVideo {
  pub id: String,
  /// The url the video was resolved from.
  pub source_url: String,
  pub title: String,
  pub thumbnail: String,
  /// seconds
  pub duration: u64,
  pub formats: Vec<Format>,
}

#[async_trait]
pub trait Resolver: Send + Sync {
  async fn resolve(&self, url: &str) -> Result<ResolvedVideo>;

  async fn open_stream(
    &self,
    video: &ResolvedVideo,
    format: &Format,
  ) -> Result<ByteStream>;
}

// the id youtube uses in watch urls, e.g. dQw4w9WgXcQ
pub fn youtube_video_id(url_str: &str) -> Result<String> {
  let url_str = url_str.trim();
  if is_video_id(url_str) {
    return Ok(url_str.to_string());
  }

  let url: Url = url_str
    .parse()
    .map_err(|_| Error::UnsupportedURL(url_str.into(), "malformed url"))?;

  let id = match url.host_str() {
    Some("youtu.be") => url
      .path_segments()
      .and_then(|mut segs| segs.next())
      .map(str::to_string),
    Some(
      "www.youtube.com" | "youtube.com" | "m.youtube.com"
      | "music.youtube.com",
    ) => {
      let from_query = url
        .query_pairs()
        .find_map(|(k, v)| (k == "v").then(|| v.into_owned()));

      from_query.or_else(|| {
        let segs: Vec<_> = url.path_segments()?.take(2).collect();
        match segs.as_slice() {
          ["shorts" | "embed" | "live" | "v", id] => Some(id.to_string()),
          _ => None,
        }
      })
    }
    _ => return Err(Error::UnsupportedURL(url.into(), "not youtube")),
  };

  match id {
    Some(id) if is_video_id(&id) => Ok(id),
    _ => Err(Error::UnsupportedURL(url.into(), "video id not found")),
  }
}

fn is_video_id(s: &str) -> bool {
  s.len() == 11
    && s
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
