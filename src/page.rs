use std::sync::LazyLock;

use axum::response::{Html, IntoResponse};
use itertools::Itertools;
use regex::{Captures, Regex};

use crate::{catalogue::VideoRecord, util::html_escape};

pub const HOMEPAGE_HTML: &str = include_str!("../html/homepage.html");
const CATALOGUE_HTML: &str = include_str!("../html/catalogue.html");

pub async fn homepage() -> impl IntoResponse {
  Html(HOMEPAGE_HTML)
}

static PLACEHOLDER: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").unwrap());

// single pass over the template: substituted text is never rescanned
pub fn catalogue(record: &VideoRecord) -> String {
  PLACEHOLDER
    .replace_all(CATALOGUE_HTML, |caps: &Captures| match &caps[1] {
      "title" => html_escape(&record.title),
      "thumbnail" => html_escape(&record.thumbnail),
      "video" => options(&record.quality_video, "video"),
      "audio" => options(&record.quality_audio, "audio"),
      _ => caps[0].to_string(),
    })
    .into_owned()
}

fn options(qualities: &[String], group: &str) -> String {
  if qualities.is_empty() {
    return "      <p>none available</p>".to_string();
  }

  qualities
    .iter()
    .enumerate()
    .map(|(i, quality)| {
      let quality = html_escape(quality);
      format!(
        "      <label><input type=\"radio\" name=\"Quality\" \
         id=\"{group}-{i}\" value=\"{quality}\"> {quality}</label><br>"
      )
    })
    .join("\n")
}
