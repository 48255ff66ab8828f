mod relay_stream;

pub use relay_stream::RelayStream;

pub fn html_escape(s: &str) -> String {
  s.replace('&', "&amp;")
    .replace('<', "&lt;")
    .replace('>', "&gt;")
    .replace('"', "&quot;")
    .replace('\'', "&#39;")
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn test_html_escape() {
    assert_eq!(
      html_escape(r#"<a href="x">Tom & Jerry's</a>"#),
      "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
    );
    assert_eq!(html_escape("720p (10.00M)"), "720p (10.00M)");
  }
}
