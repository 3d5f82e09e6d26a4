//! Canonical keys for bookmark subjects.
//!
//! Subjects are stored exactly as written, so two bookmarks of the same page
//! can differ by tracking parameters or a trailing slash. These helpers map
//! both forms onto one key. They never fail: anything that does not parse as
//! an `http(s)` URL is returned untouched.

use url::Url;

/// Query parameters that carry attribution only and never change the page.
pub const TRACKING_PARAMS: &[&str] = &[
  "utm_source",
  "utm_medium",
  "utm_campaign",
  "utm_term",
  "utm_content",
  "utm_id",
  "utm_name",
  "utm_source_platform",
  "utm_creative_format",
  "utm_marketing_tactic",
  "gclid",
  "fbclid",
  "msclkid",
  "mc_cid",
  "mc_eid",
  "pk_campaign",
  "pk_kwd",
  "ref",
  "affiliate_id",
  "sub_rt",
  "si",
  "igshid",
  "twclid",
  "yclid",
  "ttclid",
  "li_fat_id",
  "srsltid",
  "_hsenc",
  "_hsmi",
];

pub fn is_tracking_param(name: &str) -> bool { TRACKING_PARAMS.contains(&name) }

/// Remove tracking parameters from an `http(s)` URL.
///
/// The remaining query is re-serialised as `application/x-www-form-urlencoded`
/// and dropped entirely when empty, so the result is stable under repeated
/// application. Other schemes (including `at://`) and unparsable input are
/// returned as-is.
pub fn canonicalize(input: &str) -> String {
  let Ok(mut url) = Url::parse(input) else {
    return input.to_owned();
  };
  if !matches!(url.scheme(), "http" | "https") {
    return input.to_owned();
  }

  let kept: Vec<(String, String)> = url
    .query_pairs()
    .filter(|(key, _)| !is_tracking_param(key))
    .map(|(k, v)| (k.into_owned(), v.into_owned()))
    .collect();

  if kept.is_empty() {
    url.set_query(None);
  } else {
    url.query_pairs_mut().clear().extend_pairs(kept.iter());
  }

  url.to_string()
}

/// The key two subjects must share to count as the same resource:
/// [`canonicalize`] followed by removing one trailing `/`. Non-`http`
/// subjects such as AT-URIs are used as-is.
pub fn dedupe_key(input: &str) -> String {
  let canonical = canonicalize(input);
  if !is_http_url(&canonical) {
    return canonical;
  }
  match canonical.strip_suffix('/') {
    Some(stripped) => stripped.to_owned(),
    None => canonical,
  }
}

/// `[input, input with its trailing slash toggled]`.
pub fn trailing_slash_variants(input: &str) -> [String; 2] {
  let toggled = match input.strip_suffix('/') {
    Some(stripped) => stripped.to_owned(),
    None => format!("{input}/"),
  };
  [input.to_owned(), toggled]
}

/// Likes and bookmarks point either at a web URL or at an AT-URI.
pub fn is_http_url(subject: &str) -> bool { subject.starts_with("http") }

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn strips_tracking_params_and_keeps_the_rest() {
    assert_eq!(
      canonicalize(
        "https://example.com/a?utm_source=x&id=7&fbclid=abc&utm_medium=social"
      ),
      "https://example.com/a?id=7"
    );
  }

  #[test]
  fn drops_query_when_only_tracking_params() {
    assert_eq!(
      canonicalize("https://example.com/a/?utm_source=x&si=1"),
      "https://example.com/a/"
    );
  }

  #[test]
  fn keeps_fragment() {
    assert_eq!(
      canonicalize("https://example.com/a?ref=home#part"),
      "https://example.com/a#part"
    );
  }

  #[test]
  fn at_uris_and_garbage_pass_through() {
    let at = "at://did:plc:abc/blue.rito.feed.bookmark/3kx";
    assert_eq!(canonicalize(at), at);
    assert_eq!(canonicalize("not a url"), "not a url");
    assert_eq!(canonicalize(""), "");
  }

  #[test]
  fn canonicalize_is_idempotent() {
    let inputs = [
      "https://example.com/search?q=a%20b&utm_campaign=x",
      "https://EXAMPLE.com",
      "http://example.com/a/?gclid=1&x=%2F",
      "at://did:plc:abc/app.bsky.feed.post/1",
      "mailto:someone@example.com",
      "::::",
    ];
    for input in inputs {
      let once = canonicalize(input);
      assert_eq!(canonicalize(&once), once, "input: {input}");
    }
  }

  #[test]
  fn dedupe_key_strips_one_trailing_slash() {
    assert_eq!(
      dedupe_key("https://example.com/article/"),
      "https://example.com/article"
    );
    assert_eq!(
      dedupe_key("https://example.com/article?utm_source=x"),
      "https://example.com/article"
    );
    // Bare origins serialise with a root slash.
    assert_eq!(dedupe_key("https://example.com"), "https://example.com");
  }

  #[test]
  fn dedupe_key_leaves_at_uris_alone() {
    let at = "at://did:plc:abc/app.bsky.feed.post/1";
    assert_eq!(dedupe_key(at), at);
    let slashed = "at://did:plc:abc/";
    assert_eq!(dedupe_key(slashed), slashed);
  }

  #[test]
  fn variants_always_contain_input() {
    for input in ["https://a.example/x", "https://a.example/x/", "", "/"] {
      let variants = trailing_slash_variants(input);
      assert_eq!(variants.len(), 2);
      assert!(variants.contains(&input.to_owned()));
    }
    assert_eq!(
      trailing_slash_variants("https://a.example/x"),
      ["https://a.example/x".to_owned(), "https://a.example/x/".to_owned()]
    );
    assert_eq!(
      trailing_slash_variants("https://a.example/x/"),
      ["https://a.example/x/".to_owned(), "https://a.example/x".to_owned()]
    );
  }
}
