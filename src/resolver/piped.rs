use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tracing::debug;

use crate::{Error, Result};

use super::{youtube_video_id, ByteStream, Format, ResolvedVideo, Resolver};

#[derive(Clone, Debug)]
pub struct PipedInstance {
  domain: String,
}

impl PipedInstance {
  pub fn new(domain: impl Into<String>) -> Self {
    let domain = domain.into();
    let domain = domain
      .trim_start_matches("https://")
      .trim_start_matches("http://")
      .trim_end_matches('/')
      .to_string();
    Self { domain }
  }

  pub fn stream_url(&self, video_id: &str) -> String {
    format!("https://{}/streams/{}", self.domain, video_id)
  }
}

// resolves through the api of a piped instance and proxies the
// googlevideo urls it hands out.
pub struct Piped {
  instance: PipedInstance,
  client: reqwest::Client,
}

impl Piped {
  pub fn new(instance: PipedInstance) -> Self {
    Self {
      instance,
      client: reqwest::Client::new(),
    }
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PipedStreams {
  #[serde(default)]
  title: String,
  #[serde(default)]
  thumbnail_url: String,
  #[serde(default)]
  duration: i64,
  #[serde(default)]
  video_streams: Vec<PipedStream>,
  #[serde(default)]
  audio_streams: Vec<PipedStream>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PipedStream {
  url: String,
  #[serde(default)]
  mime_type: String,
  #[serde(default)]
  quality: String,
  #[serde(default)]
  bitrate: i64,
  // -1 when piped doesn't know
  #[serde(default)]
  content_length: i64,
  #[serde(default)]
  video_only: bool,
  itag: Option<i64>,
}

impl PipedStream {
  fn into_format(self, index: usize, is_audio: bool) -> Format {
    let bitrate = self.bitrate.max(0) as u64;
    let audio_channels = if is_audio || !self.video_only { 2 } else { 0 };

    Format {
      id: self
        .itag
        .map_or_else(|| index.to_string(), |itag| itag.to_string()),
      url: self.url,
      mime_type: self.mime_type,
      quality_label: self.quality,
      bitrate,
      average_bitrate: bitrate,
      content_length: self.content_length.max(0) as u64,
      audio_channels,
    }
  }
}

fn into_resolved(
  streams: PipedStreams,
  video_id: &str,
  source_url: &str,
) -> ResolvedVideo {
  let video = streams
    .video_streams
    .into_iter()
    .map(|s| (s, false));
  let audio = streams
    .audio_streams
    .into_iter()
    .map(|s| (s, true));
  let formats = video
    .chain(audio)
    .enumerate()
    .map(|(i, (s, is_audio))| s.into_format(i, is_audio))
    .collect();

  ResolvedVideo {
    id: video_id.to_string(),
    source_url: source_url.to_string(),
    title: streams.title,
    thumbnail: streams.thumbnail_url,
    duration: streams.duration.max(0) as u64,
    formats,
  }
}

#[async_trait]
impl Resolver for Piped {
  async fn resolve(&self, url: &str) -> Result<ResolvedVideo> {
    let video_id = youtube_video_id(url)?;
    let piped_url = self.instance.stream_url(&video_id);
    debug!("querying {piped_url}");

    let streams = self
      .client
      .get(piped_url)
      .header("User-Agent", "Mozilla/5.0")
      .send()
      .await?
      .error_for_status()?
      .json::<PipedStreams>()
      .await?;

    Ok(into_resolved(streams, &video_id, url))
  }

  async fn open_stream(
    &self,
    _video: &ResolvedVideo,
    format: &Format,
  ) -> Result<ByteStream> {
    if format.url.is_empty() {
      return Err(Error::Extraction(format!("format {} has no url", format.id)));
    }

    let resp = self
      .client
      .get(&format.url)
      .header("User-Agent", "Mozilla/5.0")
      .send()
      .await?
      .error_for_status()?;

    Ok(resp.bytes_stream().map(|res| res.map_err(Error::from)).boxed())
  }
}

#[cfg(test)]
mod test {
  use super::*;

  const SAMPLE: &str = r#"{
    "title": "Never Gonna Give You Up",
    "thumbnailUrl": "https://pipedproxy.example/vi/dQw4w9WgXcQ/maxresdefault.jpg",
    "duration": 212,
    "videoStreams": [
      {"url": "https://pipedproxy.example/v1", "mimeType": "video/mp4",
       "quality": "1080p", "bitrate": 4400000, "contentLength": 80000000,
       "videoOnly": true, "itag": 137},
      {"url": "https://pipedproxy.example/v2", "mimeType": "video/mp4",
       "quality": "360p", "bitrate": 503000, "contentLength": -1,
       "videoOnly": false, "itag": 18}
    ],
    "audioStreams": [
      {"url": "https://pipedproxy.example/a1", "mimeType": "audio/mp4",
       "quality": "128 kbps", "bitrate": 129500, "contentLength": 3433514,
       "videoOnly": false, "itag": 140}
    ]
  }"#;

  #[test]
  fn test_instance_urls() {
    let instance = PipedInstance::new("https://pipedapi.example.org/");
    assert_eq!(
      instance.stream_url("dQw4w9WgXcQ"),
      "https://pipedapi.example.org/streams/dQw4w9WgXcQ"
    );
  }

  #[test]
  fn test_parse_streams() {
    let streams: PipedStreams = serde_json::from_str(SAMPLE).unwrap();
    let video = into_resolved(
      streams,
      "dQw4w9WgXcQ",
      "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
    );

    assert_eq!(video.title, "Never Gonna Give You Up");
    assert_eq!(video.duration, 212);

    let ids: Vec<_> = video.formats.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, ["137", "18", "140"]);

    assert_eq!(video.formats[0].audio_channels, 0);
    assert_eq!(video.formats[1].audio_channels, 2);
    assert_eq!(video.formats[1].content_length, 0);
    assert_eq!(video.formats[2].mime_type, "audio/mp4");
    assert_eq!(video.formats[2].average_bitrate, 129500);
  }
}
