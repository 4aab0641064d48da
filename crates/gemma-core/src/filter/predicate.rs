//! Client-side replay of the transcript store's filter predicate
//!
//! Used only when the store cannot answer. Results are an approximation of the
//! primary path: the recent window is bounded, so older matches are never seen.

use super::{DateRange, Emotion, FilterSpec, MatchMode, SortBy, SortOrder};
use crate::transcript::ResultItem;
use std::cmp::Ordering;

impl FilterSpec {
    /// Whether `item` satisfies every constraint
    pub fn matches(&self, item: &ResultItem) -> bool {
        self.matches_speaker(item)
            && self.matches_emotion(item)
            && self.matches_date(item)
            && self.matches_keywords(item)
    }

    /// Count items satisfying the predicate
    pub fn count_matches<'a>(&self, items: impl IntoIterator<Item = &'a ResultItem>) -> u64 {
        items.into_iter().filter(|item| self.matches(item)).count() as u64
    }

    fn matches_speaker(&self, item: &ResultItem) -> bool {
        self.speakers.is_empty() || self.speakers.contains(&item.speaker)
    }

    fn matches_emotion(&self, item: &ResultItem) -> bool {
        self.all_emotions()
            || item
                .emotion
                .parse::<Emotion>()
                .map(|e| self.emotions.contains(&e))
                .unwrap_or(false)
    }

    fn matches_date(&self, item: &ResultItem) -> bool {
        if self.date_range == DateRange::AllTime {
            return true;
        }
        item.created_at()
            .map(|ts| self.date_range.contains(ts.date_naive()))
            .unwrap_or(false)
    }

    fn matches_keywords(&self, item: &ResultItem) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let text = item.text.to_lowercase();
        match self.match_mode {
            MatchMode::Any => self.keywords.iter().any(|k| text.contains(k.as_str())),
            MatchMode::All => self.keywords.iter().all(|k| text.contains(k.as_str())),
        }
    }
}

/// Sort items in place the way the store orders a browse page
pub fn sort_items(items: &mut [ResultItem], sort_by: SortBy, order: SortOrder) {
    items.sort_by(|a, b| {
        let ordering = match sort_by {
            SortBy::CreatedAt => a.created_at().cmp(&b.created_at()),
            SortBy::Speaker => a.speaker.cmp(&b.speaker),
            SortBy::Emotion => a.emotion.cmp(&b.emotion),
            SortBy::JobId => a.job_id.cmp(&b.job_id),
            SortBy::StartTime => a
                .start_time
                .partial_cmp(&b.start_time)
                .unwrap_or(Ordering::Equal),
        };
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn item(speaker: &str, emotion: &str, text: &str, created_at: &str) -> ResultItem {
        ResultItem {
            speaker: speaker.to_string(),
            emotion: emotion.to_string(),
            text: text.to_string(),
            created_at: created_at.to_string(),
            context_before: vec![],
            job_id: None,
            start_time: None,
        }
    }

    #[test]
    fn test_empty_spec_matches_everything() {
        let spec = FilterSpec::default();
        assert!(spec.matches(&item("x", "", "", "")));
    }

    #[test]
    fn test_speaker_equality_is_exact() {
        let mut spec = FilterSpec::default();
        spec.speakers.insert("agent".to_string());
        assert!(spec.matches(&item("agent", "joy", "hi", "")));
        assert!(!spec.matches(&item("Agent", "joy", "hi", "")));
    }

    #[test]
    fn test_emotion_membership() {
        let mut spec = FilterSpec::default();
        spec.emotions.insert(Emotion::Anger);
        spec.emotions.insert(Emotion::Fear);
        assert!(spec.matches(&item("a", "ANGER", "", "")));
        assert!(!spec.matches(&item("a", "joy", "", "")));
        assert!(!spec.matches(&item("a", "", "", "")));
    }

    #[test]
    fn test_date_window_excludes_undated_items() {
        let spec = FilterSpec {
            date_range: DateRange::window(NaiveDate::from_ymd_opt(2024, 6, 1), None),
            ..FilterSpec::default()
        };
        assert!(spec.matches(&item("a", "", "", "2024-06-01T00:00:00Z")));
        assert!(!spec.matches(&item("a", "", "", "2024-05-31T23:59:59Z")));
        assert!(!spec.matches(&item("a", "", "", "")));
    }

    #[test]
    fn test_keywords_any_and_all() {
        let mut spec = FilterSpec {
            keywords: vec!["refund".to_string(), "late fee".to_string()],
            ..FilterSpec::default()
        };
        let one = item("a", "", "I want a REFUND now", "");
        let both = item("a", "", "Refund the late fee please", "");

        assert!(spec.matches(&one));
        assert!(spec.matches(&both));

        spec.match_mode = MatchMode::All;
        assert!(!spec.matches(&one));
        assert!(spec.matches(&both));
    }

    #[test]
    fn test_sort_by_speaker_desc() {
        let mut items = vec![
            item("bob", "", "", ""),
            item("alice", "", "", ""),
            item("carol", "", "", ""),
        ];
        sort_items(&mut items, SortBy::Speaker, SortOrder::Desc);
        let speakers: Vec<_> = items.iter().map(|i| i.speaker.as_str()).collect();
        assert_eq!(speakers, vec!["carol", "bob", "alice"]);
    }
}
