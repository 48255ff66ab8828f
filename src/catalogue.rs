use std::{collections::HashMap, sync::Arc};

use crate::resolver::{Format, ResolvedVideo};

const MIB: f64 = 1048576.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
  Video,
  Audio,
}

/// Quality lists offered to the user plus the lookup from each label back
/// to its format.
#[derive(Clone, Debug, Default)]
pub struct Catalogue {
  pub video: Vec<String>,
  pub audio: Vec<String>,
  pub formats: HashMap<String, Format>,
}

impl Catalogue {
  pub fn build(formats: &[Format], duration: u64) -> Self {
    let mut catalogue = Catalogue::default();

    // formats without an audio track are never offered
    for format in formats.iter().filter(|f| f.audio_channels > 0) {
      let Some((kind, descriptor)) = describe(format, duration) else {
        continue;
      };

      match kind {
        Kind::Video => catalogue.video.push(descriptor.clone()),
        Kind::Audio => catalogue.audio.push(descriptor.clone()),
      }

      // a repeated descriptor replaces the earlier format
      catalogue.formats.insert(descriptor, format.clone());
    }

    catalogue
  }
}

pub fn describe(format: &Format, duration: u64) -> Option<(Kind, String)> {
  let size = size_mb(format, duration);

  if format.mime_type.contains("video") {
    let descriptor = format!("{} ({size:.2}M)", format.quality_label);
    Some((Kind::Video, descriptor))
  } else if format.mime_type.contains("audio") {
    let kbps = format.average_bitrate / 1000;
    Some((Kind::Audio, format!("{kbps}kbps ({size:.2}M)")))
  } else {
    None
  }
}

fn size_mb(format: &Format, duration: u64) -> f64 {
  if format.content_length > 0 {
    return format.content_length as f64 / MIB;
  }

  format.bitrate as f64 / 8.0 * duration as f64 / MIB
}

/// Everything a session remembers about its last search.
#[derive(Debug)]
pub struct VideoRecord {
  pub title: String,
  pub thumbnail: String,
  pub quality_video: Vec<String>,
  pub quality_audio: Vec<String>,
  pub formats: HashMap<String, Format>,
  pub video: Arc<ResolvedVideo>,
}

impl VideoRecord {
  pub fn new(video: ResolvedVideo) -> Self {
    let catalogue = Catalogue::build(&video.formats, video.duration);

    Self {
      title: video.title.clone(),
      thumbnail: video.thumbnail.clone(),
      quality_video: catalogue.video,
      quality_audio: catalogue.audio,
      formats: catalogue.formats,
      video: Arc::new(video),
    }
  }

  pub fn format(&self, descriptor: &str) -> Option<&Format> {
    self.formats.get(descriptor)
  }
}
