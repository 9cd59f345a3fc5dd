/// Text processing utilities
pub mod text {
    /// Collapse every whitespace run into a single space and trim.
    pub fn collapse_whitespace(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Remove markup tags and decode the handful of entities feeds commonly emit.
    pub fn strip_html(html: &str) -> String {
        let stripped = html
            .chars()
            .fold((String::new(), false), |(mut text, in_tag), c| match c {
                '<' => (text, true),
                '>' => {
                    text.push(' ');
                    (text, false)
                }
                _ if !in_tag => {
                    text.push(c);
                    (text, in_tag)
                }
                _ => (text, in_tag),
            })
            .0;

        let decoded = stripped
            .replace("&nbsp;", " ")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&apos;", "'")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&amp;", "&");

        collapse_whitespace(&decoded)
    }

    /// Keep at most `max_chars` characters, never splitting a code point.
    pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
        match text.char_indices().nth(max_chars) {
            Some((idx, _)) => &text[..idx],
            None => text,
        }
    }

    pub fn char_len(text: &str) -> usize {
        text.chars().count()
    }
}

/// URL utilities
pub mod url {
    use url::Url;

    const YOUTUBE_ID_PREFIX: &str = "yt:video:";

    /// Video id of a channel-feed entry, from its Atom id or its watch link.
    pub fn extract_video_id(entry_id: Option<&str>, link: Option<&str>) -> Option<String> {
        if let Some(id) = entry_id.and_then(|id| id.strip_prefix(YOUTUBE_ID_PREFIX)) {
            if !id.is_empty() {
                return Some(id.to_string());
            }
        }

        let parsed = Url::parse(link?).ok()?;
        parsed
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())
            .filter(|v| !v.is_empty())
    }

    /// Validate feed URL format
    pub fn is_valid_feed_url(url_str: &str) -> bool {
        match Url::parse(url_str) {
            Ok(url) => url.scheme() == "http" || url.scheme() == "https",
            Err(_) => false,
        }
    }
}

/// Time utilities
pub mod time {
    use chrono::{DateTime, FixedOffset, Offset, Utc};

    /// Calendar date of `now` as seen from a fixed UTC offset, `YYYY-MM-DD`.
    pub fn local_date(now: DateTime<Utc>, utc_offset_hours: i32) -> String {
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix());
        now.with_timezone(&offset).format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn strip_html_removes_tags_and_entities() {
        let out = text::strip_html("<p>Rates&nbsp;hold</p><br/>steady &amp; calm");
        assert_eq!(out, "Rates hold steady & calm");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(text::truncate_chars("가나다라", 2), "가나");
        assert_eq!(text::truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn video_id_from_atom_id_or_link() {
        assert_eq!(
            url::extract_video_id(Some("yt:video:abc123"), None).as_deref(),
            Some("abc123")
        );
        assert_eq!(
            url::extract_video_id(Some("urn:x"), Some("https://www.youtube.com/watch?v=zz9")).as_deref(),
            Some("zz9")
        );
        assert_eq!(url::extract_video_id(None, Some("not a url")), None);
    }

    #[test]
    fn local_date_applies_offset() {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 22, 30, 0).unwrap();
        assert_eq!(time::local_date(now, 0), "2026-10-17");
        assert_eq!(time::local_date(now, 9), "2026-10-18");
    }
}
