//! Response shape sniffing.
//!
//! Model services answer in a handful of shapes. [`normalize_output`] turns
//! the recognized ones into a uniform `{url, type, raw}` media value and
//! leaves everything else untouched.

use serde_json::{Value, json};

/// Media type of a normalized output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
  Image,
  Video,
  Audio,
}

impl MediaKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      MediaKind::Image => "image",
      MediaKind::Video => "video",
      MediaKind::Audio => "audio",
    }
  }

  /// Parse an `outputType` hint. Unknown hints yield `None`.
  pub fn from_hint(hint: &str) -> Option<Self> {
    match hint.to_ascii_lowercase().as_str() {
      "image" | "images" => Some(MediaKind::Image),
      "video" | "videos" => Some(MediaKind::Video),
      "audio" => Some(MediaKind::Audio),
      _ => None,
    }
  }
}

/// Shapes tried in order: the first one that yields a string URL wins.
const SHAPES: &[(&str, bool, MediaKind)] = &[
  ("images", true, MediaKind::Image),
  ("image", false, MediaKind::Image),
  ("video", false, MediaKind::Video),
  ("videos", true, MediaKind::Video),
  ("audio", false, MediaKind::Audio),
  ("audio_file", false, MediaKind::Audio),
];

/// Normalize a raw model response.
///
/// A bare top-level `url` is typed by `output_type`, defaulting to image.
pub fn normalize_output(raw: Value, output_type: Option<&str>) -> Value {
  let found = SHAPES.iter().find_map(|(key, is_list, kind)| {
    let holder = raw.get(*key)?;
    let holder = if *is_list { holder.get(0)? } else { holder };
    let url = holder.get("url")?.as_str()?;
    Some((url.to_string(), *kind))
  });

  let found = found.or_else(|| {
    let url = raw.get("url")?.as_str()?;
    let kind = output_type
      .and_then(MediaKind::from_hint)
      .unwrap_or(MediaKind::Image);
    Some((url.to_string(), kind))
  });

  match found {
    Some((url, kind)) => json!({ "url": url, "type": kind.as_str(), "raw": raw }),
    None => raw,
  }
}

/// What an edge forwards from a result: its `url` when it has one, otherwise
/// the whole value.
pub fn primary_payload(value: &Value) -> Value {
  match value.get("url") {
    Some(url) if !url.is_null() => url.clone(),
    _ => value.clone(),
  }
}
