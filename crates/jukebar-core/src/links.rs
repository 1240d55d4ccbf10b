//! Link and thumbnail conventions for externally hosted videos.
//!
//! Pure functions: a media id maps to its thumbnail and watch URLs through
//! fixed templates, no network round-trip involved.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

pub const THUMBNAIL_HOST: &str = "https://img.youtube.com/vi";
pub const WATCH_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// Length of a media identifier.
pub const MEDIA_ID_LEN: usize = 11;

// ---------------------------------------------------------------------------
// Thumbnails
// ---------------------------------------------------------------------------

/// Which pre-rendered thumbnail to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThumbnailQuality {
    Default,
    MqDefault,
    #[default]
    HqDefault,
    SdDefault,
    MaxResDefault,
}

impl ThumbnailQuality {
    pub fn file_stem(self) -> &'static str {
        match self {
            ThumbnailQuality::Default => "default",
            ThumbnailQuality::MqDefault => "mqdefault",
            ThumbnailQuality::HqDefault => "hqdefault",
            ThumbnailQuality::SdDefault => "sddefault",
            ThumbnailQuality::MaxResDefault => "maxresdefault",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Some(ThumbnailQuality::Default),
            "mqdefault" | "mq" => Some(ThumbnailQuality::MqDefault),
            "hqdefault" | "hq" => Some(ThumbnailQuality::HqDefault),
            "sddefault" | "sd" => Some(ThumbnailQuality::SdDefault),
            "maxresdefault" | "maxres" => Some(ThumbnailQuality::MaxResDefault),
            _ => None,
        }
    }
}

pub fn thumbnail_url(media_id: &str, quality: ThumbnailQuality) -> String {
    format!("{}/{}/{}.jpg", THUMBNAIL_HOST, media_id, quality.file_stem())
}

pub fn watch_url(media_id: &str) -> String {
    format!("{}{}", WATCH_PREFIX, media_id)
}

// ---------------------------------------------------------------------------
// Link parsing
// ---------------------------------------------------------------------------

/// Extract the media id from a submitted link or a bare id.
///
/// Accepts `watch?v=`, `youtu.be/`, `/embed/`, `/shorts/` and `/live/`
/// forms, with or without scheme, plus trailing query/fragment noise.
pub fn parse_media_id(link: &str) -> Option<String> {
    let link = link.trim();
    if is_media_id(link) {
        return Some(link.to_string());
    }

    let without_scheme = link
        .strip_prefix("https://")
        .or_else(|| link.strip_prefix("http://"))
        .unwrap_or(link);
    let (host, rest) = without_scheme.split_once('/')?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    let host = host.strip_prefix("m.").unwrap_or(host);
    let host = host.strip_prefix("music.").unwrap_or(host);

    let candidate = match host {
        "youtu.be" => rest.split(['?', '#', '/']).next(),
        "youtube.com" | "youtube-nocookie.com" => {
            if let Some(query) = rest.strip_prefix("watch?") {
                query_param(query, "v")
            } else {
                ["embed/", "shorts/", "live/", "v/"]
                    .iter()
                    .find_map(|prefix| rest.strip_prefix(prefix))
                    .and_then(|tail| tail.split(['?', '#', '/']).next())
            }
        }
        _ => None,
    }?;

    is_media_id(candidate).then(|| candidate.to_string())
}

pub fn is_media_id(s: &str) -> bool {
    s.len() == MEDIA_ID_LEN
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn query_param<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    let query = query.split('#').next().unwrap_or(query);
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then_some(v)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thumbnail_template() {
        assert_eq!(
            thumbnail_url("dQw4w9WgXcQ", ThumbnailQuality::HqDefault),
            "https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg"
        );
        assert_eq!(
            thumbnail_url("dQw4w9WgXcQ", ThumbnailQuality::MaxResDefault),
            "https://img.youtube.com/vi/dQw4w9WgXcQ/maxresdefault.jpg"
        );
    }

    #[test]
    fn parses_common_link_shapes() {
        let id = Some("dQw4w9WgXcQ".to_string());
        assert_eq!(parse_media_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), id);
        assert_eq!(parse_media_id("https://youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=42"), id);
        assert_eq!(parse_media_id("https://youtu.be/dQw4w9WgXcQ?si=abc"), id);
        assert_eq!(parse_media_id("youtu.be/dQw4w9WgXcQ"), id);
        assert_eq!(parse_media_id("https://www.youtube.com/embed/dQw4w9WgXcQ"), id);
        assert_eq!(parse_media_id("https://m.youtube.com/shorts/dQw4w9WgXcQ"), id);
        assert_eq!(parse_media_id("https://music.youtube.com/watch?v=dQw4w9WgXcQ#x"), id);
        assert_eq!(parse_media_id("  dQw4w9WgXcQ "), id);
    }

    #[test]
    fn rejects_foreign_or_malformed_links() {
        assert_eq!(parse_media_id("https://vimeo.com/123456789"), None);
        assert_eq!(parse_media_id("https://www.youtube.com/watch?v=short"), None);
        assert_eq!(parse_media_id("https://www.youtube.com/feed/trending"), None);
        assert_eq!(parse_media_id(""), None);
    }

    #[test]
    fn quality_names_roundtrip_through_parse() {
        for q in [
            ThumbnailQuality::Default,
            ThumbnailQuality::MqDefault,
            ThumbnailQuality::HqDefault,
            ThumbnailQuality::SdDefault,
            ThumbnailQuality::MaxResDefault,
        ] {
            assert_eq!(ThumbnailQuality::parse(q.file_stem()), Some(q));
        }
        assert_eq!(ThumbnailQuality::parse("hq"), Some(ThumbnailQuality::HqDefault));
        assert_eq!(ThumbnailQuality::parse("huge"), None);
    }
}
