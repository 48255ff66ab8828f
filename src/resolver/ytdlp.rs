use std::{path::PathBuf, process::Stdio, sync::LazyLock};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use regex::Regex;
use serde::Deserialize;
use tokio::{process::Command, sync::Semaphore};
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::{Error, Result};

use super::{ByteStream, Format, ResolvedVideo, Resolver};

// run yt-dlp command line to get video formats and to pipe the chosen
// format's bytes. requires yt-dlp executable to be in PATH unless a path
// is given.
pub struct Ytdlp {
  program: PathBuf,
  proxy: Option<String>,
  // limit concurrent metadata runs
  permits: Semaphore,
}

impl Ytdlp {
  pub fn new(proxy: Option<String>, concurrency: usize) -> Self {
    Self {
      program: PathBuf::from("yt-dlp"),
      proxy,
      permits: Semaphore::new(concurrency.max(1)),
    }
  }

  pub fn program(self, program: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
      ..self
    }
  }

  // children die with the future or stream that owns them
  fn command(&self) -> Command {
    let mut cmd = Command::new(&self.program);
    if let Some(proxy) = &self.proxy {
      debug!("using proxy: {}", redact_proxy(proxy));
      cmd.arg("--proxy").arg(proxy);
    }
    cmd.kill_on_drop(true);
    cmd
  }
}

#[derive(Deserialize, Debug)]
struct YtdlpOutput {
  id: String,
  #[serde(default)]
  title: String,
  #[serde(default)]
  thumbnail: Option<String>,
  #[serde(default)]
  duration: Option<f64>,
  #[serde(default)]
  formats: Vec<YtdlpFormat>,
}

#[derive(Deserialize, Debug)]
struct YtdlpFormat {
  format_id: String,
  #[serde(default)]
  url: String,
  #[serde(default)]
  ext: String,
  vcodec: Option<String>,
  acodec: Option<String>,
  audio_channels: Option<u32>,
  height: Option<u32>,
  format_note: Option<String>,
  // kbps
  tbr: Option<f64>,
  // kbps
  abr: Option<f64>,
  filesize: Option<u64>,
}

fn has_codec(codec: &Option<String>) -> bool {
  codec.as_deref().is_some_and(|c| !c.is_empty() && c != "none")
}

impl From<YtdlpFormat> for Format {
  fn from(f: YtdlpFormat) -> Self {
    let has_video = has_codec(&f.vcodec);
    let has_audio = has_codec(&f.acodec);

    let mime_type = match (has_video, has_audio) {
      (true, _) => format!("video/{}", f.ext),
      (false, true) => format!("audio/{}", f.ext),
      // storyboards and the like
      (false, false) => String::new(),
    };

    let quality_label = f
      .height
      .map(|h| format!("{h}p"))
      .or(f.format_note)
      .unwrap_or_default();

    let audio_channels = match f.audio_channels {
      Some(channels) => channels,
      None if has_audio => 2,
      None => 0,
    };

    let bitrate = kbps_to_bps(f.tbr);
    let average_bitrate = f.abr.map_or(bitrate, |abr| kbps_to_bps(Some(abr)));

    Self {
      id: f.format_id,
      url: f.url,
      mime_type,
      quality_label,
      bitrate,
      average_bitrate,
      content_length: f.filesize.unwrap_or(0),
      audio_channels,
    }
  }
}

fn kbps_to_bps(kbps: Option<f64>) -> u64 {
  kbps.map_or(0, |v| (v * 1000.0).round().max(0.0) as u64)
}

fn into_resolved(output: YtdlpOutput, source_url: &str) -> ResolvedVideo {
  ResolvedVideo {
    id: output.id,
    source_url: source_url.to_string(),
    title: output.title,
    thumbnail: output.thumbnail.unwrap_or_default(),
    duration: output.duration.map_or(0, |d| d.max(0.0) as u64),
    formats: output.formats.into_iter().map(Format::from).collect(),
  }
}

#[async_trait]
impl Resolver for Ytdlp {
  async fn resolve(&self, url: &str) -> Result<ResolvedVideo> {
    let guard = self
      .permits
      .acquire()
      .await
      .map_err(|e| Error::Extraction(e.to_string()))?;
    let output = self
      .command()
      .arg("-j")
      .arg("--no-playlist")
      .arg("--")
      .arg(url)
      .stdin(Stdio::null())
      .output()
      .await?;
    drop(guard);

    if !output.status.success() {
      return Err(Error::Extraction(error_message(&output.stderr)));
    }

    let output: YtdlpOutput = serde_json::from_slice(&output.stdout)?;
    Ok(into_resolved(output, url))
  }

  async fn open_stream(
    &self,
    video: &ResolvedVideo,
    format: &Format,
  ) -> Result<ByteStream> {
    // yt-dlp -f 251 -o - -- 'https://youtube.com/watch?v=XXXXXXX'
    let mut child = self
      .command()
      .arg("-f")
      .arg(&format.id)
      .arg("--no-progress")
      .arg("-o")
      .arg("-")
      .arg("--")
      .arg(&video.source_url)
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()?;

    let (Some(stdout), Some(stderr)) =
      (child.stdout.take(), child.stderr.take())
    else {
      return Err(Error::Extraction("yt-dlp pipes not captured".into()));
    };

    let stdout_stream = ReaderStream::new(stdout)
      .map(|res| res.map_err(Error::from))
      .boxed();
    let stderr_stream = ReaderStream::new(stderr)
      .filter_map(|res| futures::future::ready(detect_error(res).transpose()))
      .boxed();
    let merged = futures::stream::select(stdout_stream, stderr_stream);

    // the child lives as long as the stream and is killed when it drops.
    // once both pipes close, a failed exit means the bytes were cut short.
    let mut stream = futures::stream::unfold(
      Some((child, merged)),
      |state| async move {
        let (mut child, mut merged) = state?;
        if let Some(item) = merged.next().await {
          return Some((item, Some((child, merged))));
        }

        match child.wait().await {
          Ok(status) if status.success() => None,
          Ok(status) => {
            let e = Error::StreamCopy(format!("yt-dlp exited with {status}"));
            Some((Err(e), None))
          }
          Err(e) => Some((Err(Error::StreamCopy(e.to_string())), None)),
        }
      },
    )
    .boxed();

    // wait for the first chunk so that an immediate failure surfaces
    // before any response header is committed
    match stream.next().await {
      Some(Ok(first)) => {
        let first = futures::future::ready(Ok(first));
        Ok(futures::stream::once(first).chain(stream).boxed())
      }
      Some(Err(e)) => Err(e),
      None => Err(Error::Extraction("yt-dlp produced no output".into())),
    }
  }
}

// stderr chunks are dropped unless they report an error
fn detect_error(chunk: std::io::Result<Bytes>) -> Result<Option<Bytes>> {
  let chunk = chunk?;
  let s = String::from_utf8_lossy(&chunk);
  if s.contains("ERROR:") {
    Err(Error::Extraction(s.trim().to_string()))
  } else {
    Ok(None)
  }
}

fn error_message(stderr: &[u8]) -> String {
  let s = String::from_utf8_lossy(stderr);
  s.lines()
    .find(|line| line.contains("ERROR:"))
    .unwrap_or_else(|| s.trim())
    .to_string()
}

// used to remove cred info from proxy url before printing
fn redact_proxy(proxy: &str) -> String {
  static AUTH_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"//[^:/@]+(:[^@]+)?@").unwrap());
  AUTH_REGEX.replace(proxy, "//<REDACTED>@").into_owned()
}
