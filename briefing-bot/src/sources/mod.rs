pub mod rss_feed;
pub mod transcript;
pub mod video_channel;

pub use rss_feed::RssFeedSource;
pub use transcript::{HttpTranscriptService, NoTranscripts};
pub use video_channel::VideoChannelSource;

use crate::types::{ParsedEntry, SourceWindow, UndatedPolicy};

/// Keep entries inside `window`, newest first, and cap the result.
///
/// Filtering happens before the cap. The sort is stable so undated entries
/// (when included) keep their feed order behind the dated ones.
pub fn select_recent(
    entries: Vec<ParsedEntry>,
    window: &SourceWindow,
    undated: UndatedPolicy,
    max_items: usize,
) -> Vec<ParsedEntry> {
    let mut kept: Vec<ParsedEntry> = entries
        .into_iter()
        .filter(|entry| match entry.published_at {
            Some(ts) => window.contains(ts),
            None => undated == UndatedPolicy::Include,
        })
        .collect();

    kept.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    kept.truncate(max_items);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn entry(title: &str, hours_ago: Option<i64>) -> ParsedEntry {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 7, 0, 0).unwrap();
        ParsedEntry {
            id: None,
            url: None,
            title: title.to_string(),
            description: None,
            published_at: hours_ago.map(|h| now - Duration::hours(h)),
        }
    }

    fn window() -> SourceWindow {
        SourceWindow::ending_at(Utc.with_ymd_and_hms(2026, 10, 18, 7, 0, 0).unwrap(), 24)
    }

    #[test]
    fn cap_applies_after_window_filter() {
        let entries = vec![entry("stale", Some(30)), entry("b", Some(5)), entry("a", Some(1))];
        let kept = select_recent(entries, &window(), UndatedPolicy::Exclude, 1);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "a");
    }

    #[test]
    fn undated_policy_is_honoured() {
        let entries = vec![entry("undated", None), entry("dated", Some(2))];
        let included = select_recent(entries.clone(), &window(), UndatedPolicy::Include, 5);
        assert_eq!(
            included.iter().map(|e| e.title.as_str()).collect::<Vec<_>>(),
            vec!["dated", "undated"]
        );

        let excluded = select_recent(entries, &window(), UndatedPolicy::Exclude, 5);
        assert_eq!(excluded.len(), 1);
    }
}
