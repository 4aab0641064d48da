//! Raw control values and `gather_filters`
//!
//! Controls hold exactly what the user typed. Nothing is validated until a
//! snapshot is taken, so a half-typed number never blocks editing.

use super::{
    DEFAULT_PAGE_SIZE, DateRange, Emotion, FilterSpec, MAX_CONTEXT_LINES, MAX_PAGE_SIZE,
    MatchMode, SortBy, SortOrder,
};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::warn;

/// Current state of the filter controls
#[derive(Debug, Clone, PartialEq)]
pub struct FilterControls {
    pub all_time: bool,
    pub start_date: String,
    pub end_date: String,
    /// Comma-separated speaker names
    pub speakers: String,
    pub emotions: BTreeSet<Emotion>,
    /// Comma-separated keywords
    pub keywords: String,
    pub match_mode: MatchMode,
    pub context_lines: String,
    pub page_size: String,
    pub sort_by: SortBy,
    pub order: SortOrder,
}

impl Default for FilterControls {
    fn default() -> Self {
        Self {
            all_time: true,
            start_date: String::new(),
            end_date: String::new(),
            speakers: String::new(),
            emotions: BTreeSet::new(),
            keywords: String::new(),
            match_mode: MatchMode::Any,
            context_lines: "0".to_string(),
            page_size: DEFAULT_PAGE_SIZE.to_string(),
            sort_by: SortBy::CreatedAt,
            order: SortOrder::Desc,
        }
    }
}

impl FilterControls {
    /// Controls seeded with a configured page size
    pub fn with_page_size(page_size: u32) -> Self {
        Self {
            page_size: page_size.to_string(),
            ..Self::default()
        }
    }

    /// Take a read-only snapshot, clamping numeric fields into range
    pub fn gather_filters(&self) -> FilterSpec {
        let date_range = if self.all_time {
            DateRange::AllTime
        } else {
            DateRange::window(
                parse_date(&self.start_date, "start_date"),
                parse_date(&self.end_date, "end_date"),
            )
        };

        FilterSpec {
            date_range,
            speakers: split_list(&self.speakers).collect(),
            emotions: self.emotions.clone(),
            keywords: dedup_keywords(&self.keywords),
            match_mode: self.match_mode,
            context_lines: clamp_number(&self.context_lines, 0, 0, MAX_CONTEXT_LINES as i64)
                as u8,
            page_size: clamp_number(
                &self.page_size,
                DEFAULT_PAGE_SIZE as i64,
                1,
                MAX_PAGE_SIZE as i64,
            ) as u32,
            sort_by: self.sort_by,
            order: self.order,
        }
    }

    /// Flip an emotion checkbox
    pub fn toggle_emotion(&mut self, emotion: Emotion) {
        if !self.emotions.remove(&emotion) {
            self.emotions.insert(emotion);
        }
    }

    /// Flip the sort direction
    pub fn toggle_order(&mut self) -> SortOrder {
        self.order = self.order.toggled();
        self.order
    }

    /// Advance to the next sort column
    pub fn cycle_sort(&mut self) -> SortBy {
        self.sort_by = self.sort_by.next();
        self.sort_by
    }

    /// Restrict to a date window; empty strings leave that bound open
    pub fn set_date_window(&mut self, start: impl Into<String>, end: impl Into<String>) {
        self.start_date = start.into();
        self.end_date = end.into();
        self.all_time = self.start_date.trim().is_empty() && self.end_date.trim().is_empty();
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn dedup_keywords(raw: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    split_list(raw)
        .map(|k| k.to_lowercase())
        .filter(|k| seen.insert(k.clone()))
        .collect()
}

fn parse_date(raw: &str, field: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(e) => {
            warn!(field, value = raw, error = %e, "Ignoring unparseable date bound");
            None
        }
    }
}

/// Parse an integer control; unparseable input falls back to `default`, then clamps
fn clamp_number(raw: &str, default: i64, min: i64, max: i64) -> i64 {
    let trimmed = raw.trim();
    let value = trimmed
        .parse::<i64>()
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().map(|f| f.trunc() as i64))
        .unwrap_or(default);
    value.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controls_with(page_size: &str, context_lines: &str) -> FilterControls {
        FilterControls {
            page_size: page_size.to_string(),
            context_lines: context_lines.to_string(),
            ..FilterControls::default()
        }
    }

    #[test]
    fn test_negative_numbers_clamp_to_lower_bounds() {
        let spec = controls_with("-5", "-5").gather_filters();
        assert_eq!(spec.page_size, 1);
        assert_eq!(spec.context_lines, 0);
    }

    #[test]
    fn test_large_numbers_clamp_to_upper_bounds() {
        let spec = controls_with("9999", "9999").gather_filters();
        assert_eq!(spec.page_size, 200);
        assert_eq!(spec.context_lines, 10);
    }

    #[test]
    fn test_bounds_hold_for_arbitrary_input() {
        for raw in ["", "abc", "0", "1", "200", "201", "3.7", "-0", "1e9", "  42  "] {
            let spec = controls_with(raw, raw).gather_filters();
            assert!((1..=200).contains(&spec.page_size), "page_size for {raw:?}");
            assert!(spec.context_lines <= 10, "context_lines for {raw:?}");
        }
    }

    #[test]
    fn test_unparseable_page_size_uses_default() {
        assert_eq!(controls_with("lots", "0").gather_filters().page_size, 50);
        assert_eq!(controls_with("3.7", "2.9").gather_filters().context_lines, 2);
    }

    #[test]
    fn test_speakers_and_keywords_are_normalized() {
        let controls = FilterControls {
            speakers: " agent , customer,,agent ".to_string(),
            keywords: "Refund, refund , CHARGEBACK,".to_string(),
            ..FilterControls::default()
        };
        let spec = controls.gather_filters();
        assert_eq!(
            spec.speakers.into_iter().collect::<Vec<_>>(),
            vec!["agent".to_string(), "customer".to_string()]
        );
        assert_eq!(spec.keywords, vec!["refund", "chargeback"]);
    }

    #[test]
    fn test_date_window_and_all_time() {
        let mut controls = FilterControls::default();
        assert_eq!(controls.gather_filters().date_range, DateRange::AllTime);

        controls.set_date_window("2024-01-01", "not-a-date");
        assert!(!controls.all_time);
        assert_eq!(
            controls.gather_filters().date_range,
            DateRange::Window {
                start: NaiveDate::from_ymd_opt(2024, 1, 1),
                end: None
            }
        );

        controls.set_date_window("", "");
        assert!(controls.all_time);
    }

    #[test]
    fn test_toggles() {
        let mut controls = FilterControls::default();
        controls.toggle_emotion(Emotion::Anger);
        assert!(controls.emotions.contains(&Emotion::Anger));
        controls.toggle_emotion(Emotion::Anger);
        assert!(controls.gather_filters().all_emotions());

        assert_eq!(controls.toggle_order(), SortOrder::Asc);
        assert_eq!(controls.cycle_sort(), SortBy::Speaker);
    }
}
